//! This module contains the value types exchanged with the DP700 PSUs.

use core::fmt;

/// A decoded reply line.
///
/// Replies which parse as a number become [`Response::Number`], everything
/// else is kept as text.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Number(f64),
    Text(String),
}

impl Response {
    /// Decode a reply line with its line terminator already removed.
    pub fn decode(line: &[u8]) -> Result<Self, core::str::Utf8Error> {
        let text = core::str::from_utf8(line)?;
        match text.trim().parse::<f64>() {
            Ok(value) => Ok(Response::Number(value)),
            Err(_) => Ok(Response::Text(text.to_owned())),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match *self {
            Response::Number(value) => Some(value),
            Response::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Response::Number(_) => None,
            Response::Text(text) => Some(text),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Number(value) => write!(f, "{value}"),
            Response::Text(text) => f.write_str(text),
        }
    }
}

/// Used to be less ambiguous and whether something is on or off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum State {
    /// Disabled.
    #[default]
    Off,
    /// Enabled.
    On,
}

impl From<State> for bool {
    fn from(value: State) -> Self {
        match value {
            State::Off => false,
            State::On => true,
        }
    }
}

impl From<bool> for State {
    fn from(value: bool) -> Self {
        match value {
            true => State::On,
            false => State::Off,
        }
    }
}

/// SCPI spelling, `ON` or `OFF`.
impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Off => f.write_str("OFF"),
            State::On => f.write_str("ON"),
        }
    }
}

/// One of the ten preset slots in the PSU memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySlot(u8);

impl MemorySlot {
    pub const FIRST: u8 = 1;
    pub const LAST: u8 = 10;

    pub fn index(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for MemorySlot {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::FIRST..=Self::LAST).contains(&value) {
            Ok(MemorySlot(value))
        } else {
            Err(value)
        }
    }
}

/// A snapshot of the measured output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurements {
    /// Volts.
    pub voltage: f64,
    /// Amps.
    pub current: f64,
    /// Watts.
    pub power: f64,
}

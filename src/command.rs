//! This module defines the SCPI commands understood by the DP700 PSUs.
//!
//! Every command is a single ASCII line terminated by `\n`. Queries end in `?`
//! and are answered with one line; the remaining commands are not answered.

use core::fmt;

use crate::types::State;

/// The only output channel on the DP700 series.
const CHANNEL: &str = "CH1";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// __Q__ - `*IDN?`, answered with `MANUFACTURER,MODEL,SERIAL,FIRMWARE`.
    Identify,
    /// __W__ - Return the front panel to local control.
    Local,
    /// __W__ - RS232 baud rate of the PSU.
    SetBaudRate(u32),
    /// __W__ - Voltage setting, in volts.
    SetVoltage(f64),
    /// __Q__ - Voltage setting.
    RequestedVoltage,
    /// __Q__ - Output voltage display value.
    MeasureVoltage,
    /// __W__ - Current setting, in amps.
    SetCurrent(f64),
    /// __Q__ - Current setting.
    RequestedCurrent,
    /// __Q__ - Output current display value.
    MeasureCurrent,
    /// __Q__ - Output power display value.
    MeasurePower,
    /// __W__ - Load the voltage/current preset stored in the given slot.
    RecallMemory(u8),
    /// __W__ - Store the voltage/current settings in the given slot.
    SaveMemory(u8),
    /// __W__ - Switched output.
    SetOutput(State),
    /// __Q__ - Switched output, answered with `ON` or `OFF`.
    OutputState,
}

impl Command {
    /// Whether the PSU answers this command with a line.
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Command::Identify
                | Command::RequestedVoltage
                | Command::MeasureVoltage
                | Command::RequestedCurrent
                | Command::MeasureCurrent
                | Command::MeasurePower
                | Command::OutputState
        )
    }
}

/// Formats the command text including its trailing `\n`.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Identify => writeln!(f, "*IDN?"),
            Command::Local => writeln!(f, ":SYST:LOC"),
            Command::SetBaudRate(rate) => writeln!(f, ":SYST:COMM:RS232:BAUD {rate}"),
            Command::SetVoltage(volts) => writeln!(f, ":VOLT {volts}"),
            Command::RequestedVoltage => writeln!(f, ":VOLT?"),
            Command::MeasureVoltage => writeln!(f, ":MEAS:VOLT? {CHANNEL}"),
            Command::SetCurrent(amps) => writeln!(f, ":CURR {amps}"),
            Command::RequestedCurrent => writeln!(f, ":CURR?"),
            Command::MeasureCurrent => writeln!(f, ":MEAS:CURR? {CHANNEL}"),
            Command::MeasurePower => writeln!(f, ":MEAS:POWE? {CHANNEL}"),
            Command::RecallMemory(index) => writeln!(f, ":MEM:LOAD RSF,{index}"),
            Command::SaveMemory(index) => writeln!(f, ":MEM:STOR RSF,{index}"),
            Command::SetOutput(state) => writeln!(f, ":OUTP:STAT {CHANNEL}, {state}"),
            Command::OutputState => writeln!(f, ":OUTP:STAT? {CHANNEL}"),
        }
    }
}

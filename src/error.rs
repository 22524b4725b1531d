//! Our error types for the DP700 PSUs.

use thiserror::Error;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Custom error type for Rigol DP700 PSU communications.
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    /// The serial port could not be opened.
    #[cfg(feature = "serial")]
    #[error("Failed to open serial port: {0}")]
    Open(#[source] serialport::Error),
    #[error("Serial communication error")]
    SerialError(I),
    #[error("Communication timeout")]
    Timeout,
    /// The reply did not fit in the driver's line buffer.
    #[error("Response exceeded the line buffer")]
    BufferError,
    #[error("Response is not valid UTF-8: {0}")]
    Decode(#[from] core::str::Utf8Error),
    /// A numeric query was answered with text.
    #[error("Invalid response received: {0:?}")]
    UnexpectedResponse(String),
    /// `*IDN?` did not return exactly four comma separated fields.
    #[error("Malformed identification response: {0:?}")]
    MalformedIdentification(String),
    #[error("Voltage {value} V exceeds the model limit of {max} V")]
    VoltageOutOfRange { value: f64, max: f64 },
    #[error("Current {value} A exceeds the model limit of {max} A")]
    CurrentOutOfRange { value: f64, max: f64 },
    /// Preset memory is addressed 1 to 10.
    #[error("Invalid memory index {0}, expected 1-10")]
    InvalidMemoryIndex(u8),
}

/// Raised when the connected model has no entry in the limit table.
///
/// This never aborts construction: the driver logs it and continues with the
/// voltage and current guards disabled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0} is unsupported, output limits are disabled")]
pub struct UnsupportedModel(pub String);

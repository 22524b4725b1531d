//! This crate provides an interface for communicating with and controlling the Rigol DP700 series of
//! programmable power supplies.
//!
//! PSU models with known output limits:
//! * DP711 (30V / 5A)
//! * DP712 (50V / 3A)
//!
//! Other models answering the same SCPI command set can be used as well, but the driver will not
//! guard the voltage and current settings for them.
//!
//! It talks SCPI over the RS232 port on the back of the PSU. Every command is a line of ASCII text
//! terminated by `\n`, queries are answered with a single line.
//!
//! The serial port used for PSU comms should be configured like so:
//! * Default baud rate: 9600
//! * Data bits: 8
//! * Stop bits: 1
//! * Parity: None
//!
//! ```no_run
//! use rigol_dp700::psu::{Dp700, PsuConfig};
//! use rigol_dp700::transport::SerialTransport;
//!
//! let mut psu: Dp700<SerialTransport> = Dp700::open("/dev/ttyUSB0", PsuConfig::default())?;
//! psu.set_output_voltage(12.0)?;
//! psu.set_output_current(0.5)?;
//! psu.enable_output(true)?;
//! let voltage = psu.get_output_voltage()?;
//! println!("{} measures {} V", psu, voltage);
//! # Ok::<(), rigol_dp700::error::Error<rigol_dp700::transport::IoError>>(())
//! ```

use fugit::MillisDurationU32;

pub mod command;
pub mod error;
pub mod identity;
pub mod model;
pub mod psu;
pub mod transport;
pub mod types;

#[cfg(test)]
mod mock_serial;

#[cfg(unix)]
pub const DEFAULT_TTY: &str = "/dev/ttyUSB0";
#[cfg(windows)]
pub const DEFAULT_TTY: &str = "COM1";

/// Default baud rate of the DP700 RS232 port.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default time to wait for a reply.
pub const DEFAULT_TIMEOUT: MillisDurationU32 = MillisDurationU32::from_ticks(200);

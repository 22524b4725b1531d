use core::fmt;

use embedded_io::Error as _;
use fugit::MillisDurationU32;
use tracing::{debug, trace, warn};

use crate::{
    command::Command,
    error::{Error, Result},
    identity::DeviceIdentity,
    model::ModelLimits,
    transport::Transport,
    types::{Measurements, MemorySlot, Response, State},
};

/// Serial settings used when opening a PSU.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PsuConfig {
    /// Default for PSU is 9600.
    pub baud_rate: u32,
    /// How long to wait for a reply before giving up.
    pub timeout: MillisDurationU32,
}

impl Default for PsuConfig {
    fn default() -> Self {
        Self {
            baud_rate: crate::DEFAULT_BAUD_RATE,
            timeout: crate::DEFAULT_TIMEOUT,
        }
    }
}

impl PsuConfig {
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_timeout(mut self, timeout: MillisDurationU32) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Line based request/response exchange over the interface.
///
/// `L` is the longest reply line accepted, in bytes.
struct Link<T: Transport, const L: usize> {
    interface: T,
}

impl<T: Transport, const L: usize> Link<T, L> {
    /// Write a command and read back its reply.
    ///
    /// Queries must be answered before the interface times out. Other commands are normally not
    /// answered by the PSU; for those a missing reply decodes as empty text.
    fn execute(&mut self, command: Command) -> Result<Response, T::Error> {
        let text = command.to_string();
        trace!(command = %text.escape_default(), "Sending");

        self.interface
            .write_all(text.as_bytes())
            .map_err(Error::SerialError)?;

        match self.read_line()? {
            Some(line) => {
                trace!(reply = %String::from_utf8_lossy(&line).escape_default(), "Received");
                Ok(Response::decode(&line)?)
            }
            None if command.is_query() => Err(Error::Timeout),
            None => Ok(Response::Text(String::new())),
        }
    }

    /// Read one line and strip its terminator.
    ///
    /// Returns `None` if the interface timed out before any byte arrived.
    fn read_line(&mut self) -> Result<Option<heapless::Vec<u8, L>>, T::Error> {
        let mut line: heapless::Vec<u8, L> = heapless::Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.interface.read(&mut byte) {
                Ok(0) => return Self::timed_out(line),
                Ok(_) => {
                    if byte[0] == b'\n' {
                        if line.last() == Some(&b'\r') {
                            line.pop();
                        }
                        return Ok(Some(line));
                    }
                    if line.push(byte[0]).is_err() {
                        self.discard_line()?;
                        return Err(Error::BufferError);
                    }
                }
                Err(e) => match e.kind() {
                    embedded_io::ErrorKind::TimedOut => return Self::timed_out(line),
                    embedded_io::ErrorKind::Interrupted => continue,
                    _ => return Err(Error::SerialError(e)),
                },
            }
        }
    }

    /// Drop the rest of an overlong reply so it is not taken as the answer to the next command.
    fn discard_line(&mut self) -> Result<(), T::Error> {
        let mut byte = [0u8; 1];
        let mut discarded = 0usize;
        loop {
            match self.interface.read(&mut byte) {
                Ok(0) => break,
                Ok(_) if byte[0] == b'\n' => break,
                Ok(_) => discarded += 1,
                Err(e) => match e.kind() {
                    embedded_io::ErrorKind::TimedOut => break,
                    embedded_io::ErrorKind::Interrupted => continue,
                    _ => return Err(Error::SerialError(e)),
                },
            }
        }
        debug!(limit = L, discarded, "Reply line too long");
        Ok(())
    }

    fn timed_out(line: heapless::Vec<u8, L>) -> Result<Option<heapless::Vec<u8, L>>, T::Error> {
        if line.is_empty() {
            Ok(None)
        } else {
            debug!(received = line.len(), "Timed out in the middle of a reply");
            Err(Error::Timeout)
        }
    }
}

/// You can create a Dp700 using any interface which implements [Transport].
///
/// For its methods, we generally use the nomenclature that "set" means to write a configuration
/// and "get" means to read back either a configuration value or a measured value.
///
/// The PSU is switched to remote control by the first command it receives. When the driver is
/// dropped (or [closed](Self::close)) it sends `:SYST:LOC` so the front panel can be used again.
pub struct Dp700<T: Transport, const L: usize = 128> {
    link: Link<T, L>,
    config: PsuConfig,
    identity: DeviceIdentity,
    /// `"{manufacturer} {model} {firmware_version}"`, composed once.
    identification: String,
    limits: Option<ModelLimits>,
    released: bool,
}

#[cfg(feature = "serial")]
impl<const L: usize> Dp700<crate::transport::SerialTransport, L> {
    /// Open the serial port at `path` and connect to the PSU on it.
    pub fn open(path: &str, config: PsuConfig) -> Result<Self, crate::transport::IoError> {
        let interface =
            crate::transport::SerialTransport::open(path, config.baud_rate, config.timeout)
                .map_err(Error::Open)?;
        debug!(path, baud_rate = config.baud_rate, "Opened serial port");
        Self::with_config(interface, config)
    }
}

impl<T: Transport, const L: usize> Dp700<T, L> {
    /// Connect to the PSU over an interface using the default settings.
    pub fn new(interface: T) -> Result<Self, T::Error> {
        Self::with_config(interface, PsuConfig::default())
    }

    /// Connect to the PSU over an interface which is already set up as described by `config`.
    ///
    /// The PSU is identified straight away. Models without known limits are accepted, but the
    /// voltage and current guards are disabled for them.
    pub fn with_config(interface: T, config: PsuConfig) -> Result<Self, T::Error> {
        let mut link = Link { interface };

        let reply = link.execute(Command::Identify)?.to_string();
        let identity: DeviceIdentity = reply
            .parse()
            .map_err(|_| Error::MalformedIdentification(reply.clone()))?;
        debug!(
            manufacturer = %identity.manufacturer,
            model = %identity.model,
            serial = %identity.serial_number,
            firmware = %identity.firmware_version,
            "Identified PSU"
        );

        let limits = match ModelLimits::lookup(&identity.model) {
            Ok(limits) => Some(limits),
            Err(unsupported) => {
                warn!("{unsupported}");
                None
            }
        };

        Ok(Self {
            link,
            config,
            identification: identity.to_string(),
            identity,
            limits,
            released: false,
        })
    }

    /// Send a command and return the decoded reply.
    pub fn execute(&mut self, command: Command) -> Result<Response, T::Error> {
        self.link.execute(command)
    }

    /// Set the baud rate used for communication.
    ///
    /// The PSU switches immediately, so we wait for the command to leave the interface before
    /// switching the local side to match.
    pub fn set_baud_rate(&mut self, baud_rate: u32) -> Result<(), T::Error> {
        self.execute(Command::SetBaudRate(baud_rate))?;
        self.link.interface.flush().map_err(Error::SerialError)?;
        self.link
            .interface
            .set_baud_rate(baud_rate)
            .map_err(Error::SerialError)?;
        self.config.baud_rate = baud_rate;
        debug!(baud_rate, "Changed baud rate");
        Ok(())
    }

    /// Set the output target voltage in volts.
    ///
    /// Fails without sending anything if the value exceeds the model's limit or is NaN.
    pub fn set_output_voltage(&mut self, voltage: f64) -> Result<(), T::Error> {
        if let Some(limits) = self.limits {
            if !(voltage <= limits.max_voltage) {
                return Err(Error::VoltageOutOfRange {
                    value: voltage,
                    max: limits.max_voltage,
                });
            }
        }
        self.execute(Command::SetVoltage(voltage))?;
        Ok(())
    }

    /// Get the output target voltage in volts.
    pub fn get_requested_output_voltage(&mut self) -> Result<f64, T::Error> {
        self.query_number(Command::RequestedVoltage)
    }

    /// Return the measured output voltage in volts.
    pub fn get_output_voltage(&mut self) -> Result<f64, T::Error> {
        self.query_number(Command::MeasureVoltage)
    }

    /// Set the output current limit in amps.
    ///
    /// Fails without sending anything if the value exceeds the model's limit or is NaN.
    pub fn set_output_current(&mut self, current: f64) -> Result<(), T::Error> {
        if let Some(limits) = self.limits {
            if !(current <= limits.max_current) {
                return Err(Error::CurrentOutOfRange {
                    value: current,
                    max: limits.max_current,
                });
            }
        }
        self.execute(Command::SetCurrent(current))?;
        Ok(())
    }

    /// Get the output current limit in amps.
    pub fn get_requested_output_current(&mut self) -> Result<f64, T::Error> {
        self.query_number(Command::RequestedCurrent)
    }

    /// Return the measured output current in amps.
    pub fn get_output_current(&mut self) -> Result<f64, T::Error> {
        self.query_number(Command::MeasureCurrent)
    }

    /// Return the measured output power in watts.
    pub fn get_output_power(&mut self) -> Result<f64, T::Error> {
        self.query_number(Command::MeasurePower)
    }

    /// Measure output voltage, current and power in one go.
    pub fn read_measurements(&mut self) -> Result<Measurements, T::Error> {
        Ok(Measurements {
            voltage: self.get_output_voltage()?,
            current: self.get_output_current()?,
            power: self.get_output_power()?,
        })
    }

    /// Recall voltage and current settings from a memory slot (1 - 10).
    pub fn recall_from_memory(&mut self, index: u8) -> Result<(), T::Error> {
        let slot = MemorySlot::try_from(index).map_err(Error::InvalidMemoryIndex)?;
        self.execute(Command::RecallMemory(slot.index()))?;
        Ok(())
    }

    /// Save voltage and current settings to a memory slot (1 - 10).
    pub fn save_to_memory(&mut self, index: u8) -> Result<(), T::Error> {
        let slot = MemorySlot::try_from(index).map_err(Error::InvalidMemoryIndex)?;
        self.execute(Command::SaveMemory(slot.index()))?;
        Ok(())
    }

    /// Enable/disable the output.
    pub fn enable_output(&mut self, state: impl Into<State>) -> Result<(), T::Error> {
        self.execute(Command::SetOutput(state.into()))?;
        Ok(())
    }

    /// Read whether the output is enabled. Anything but an exact `ON` counts as disabled.
    pub fn is_output_enabled(&mut self) -> Result<bool, T::Error> {
        let response = self.execute(Command::OutputState)?;
        Ok(response.as_text() == Some("ON"))
    }

    /// Get the device identification string, `"{manufacturer} {model} {firmware_version}"`.
    pub fn get_identification(&self) -> &str {
        &self.identification
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Output limits of the connected model, `None` if the model is unsupported.
    pub fn limits(&self) -> Option<ModelLimits> {
        self.limits
    }

    pub fn config(&self) -> &PsuConfig {
        &self.config
    }

    pub fn baud_rate(&self) -> u32 {
        self.config.baud_rate
    }

    /// Return the PSU to local control and release the interface.
    ///
    /// Dropping the driver does the same, but can only log a failure.
    pub fn close(mut self) -> Result<(), T::Error> {
        self.release()
    }

    fn release(&mut self) -> Result<(), T::Error> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.execute(Command::Local)?;
        Ok(())
    }

    fn query_number(&mut self, command: Command) -> Result<f64, T::Error> {
        match self.execute(command)? {
            Response::Number(value) => Ok(value),
            Response::Text(text) => Err(Error::UnexpectedResponse(text)),
        }
    }
}

impl<T: Transport, const L: usize> Drop for Dp700<T, L> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!(%err, "Failed to return PSU to local control");
        }
    }
}

impl<T: Transport, const L: usize> fmt::Display for Dp700<T, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<PowerSupply> {}", self.identification)
    }
}

//! The byte level link to the PSU.
//!
//! The driver works with anything implementing [`Transport`]. With the `serial` feature enabled,
//! [`SerialTransport`] provides an implementation on top of the [`serialport`] crate.

/// A serial interface the driver can talk to a PSU over.
///
/// Reads should block for at most the configured timeout. Running out of time is reported either
/// as an error of kind [`embedded_io::ErrorKind::TimedOut`] or as a read of zero bytes.
pub trait Transport: embedded_io::Read + embedded_io::Write {
    /// Change the baud rate used locally.
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<(), Self::Error>;
}

#[cfg(feature = "serial")]
pub use serial::{IoError, SerialTransport};

#[cfg(feature = "serial")]
mod serial {
    use fugit::MillisDurationU32;
    use serialport::SerialPort;
    use std::time::Duration;

    use super::Transport;

    /// [`Transport`] over a local serial port.
    pub struct SerialTransport {
        port: Box<dyn SerialPort>,
    }

    impl SerialTransport {
        /// Open `path` with 8N1 framing, as the DP700 expects.
        pub fn open(
            path: &str,
            baud_rate: u32,
            timeout: MillisDurationU32,
        ) -> Result<Self, serialport::Error> {
            let port = serialport::new(path, baud_rate)
                .data_bits(serialport::DataBits::Eight)
                .parity(serialport::Parity::None)
                .stop_bits(serialport::StopBits::One)
                .timeout(Duration::from_millis(timeout.to_millis().into()))
                .open()?;
            Ok(Self { port })
        }

        /// Name of the underlying port, if known.
        pub fn name(&self) -> Option<String> {
            self.port.name()
        }
    }

    impl From<Box<dyn SerialPort>> for SerialTransport {
        fn from(port: Box<dyn SerialPort>) -> Self {
            Self { port }
        }
    }

    #[derive(Debug)]
    pub struct IoError(pub std::io::Error);

    impl core::fmt::Display for IoError {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl std::error::Error for IoError {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    impl From<serialport::Error> for IoError {
        fn from(err: serialport::Error) -> Self {
            IoError(err.into())
        }
    }

    impl embedded_io::Error for IoError {
        fn kind(&self) -> embedded_io::ErrorKind {
            match self.0.kind() {
                std::io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
                std::io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
                std::io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
                std::io::ErrorKind::NotConnected => embedded_io::ErrorKind::NotConnected,
                std::io::ErrorKind::InvalidInput => embedded_io::ErrorKind::InvalidInput,
                std::io::ErrorKind::InvalidData => embedded_io::ErrorKind::InvalidData,
                std::io::ErrorKind::TimedOut => embedded_io::ErrorKind::TimedOut,
                // Some platforms report an expired read timeout this way.
                std::io::ErrorKind::WouldBlock => embedded_io::ErrorKind::TimedOut,
                std::io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
                std::io::ErrorKind::Unsupported => embedded_io::ErrorKind::Unsupported,
                _ => embedded_io::ErrorKind::Other,
            }
        }
    }

    impl embedded_io::ErrorType for SerialTransport {
        type Error = IoError;
    }

    impl embedded_io::Read for SerialTransport {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            std::io::Read::read(&mut self.port, buf).map_err(IoError)
        }
    }

    impl embedded_io::Write for SerialTransport {
        fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            std::io::Write::write(&mut self.port, buf).map_err(IoError)
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            std::io::Write::flush(&mut self.port).map_err(IoError)
        }
    }

    impl Transport for SerialTransport {
        fn set_baud_rate(&mut self, baud_rate: u32) -> Result<(), Self::Error> {
            self.port.set_baud_rate(baud_rate)?;
            Ok(())
        }
    }

}

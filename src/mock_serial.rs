//! We use this mocking module in unit tests to emulate a DP700 on the other end of a serial port.
//!
//! The mock parses every line written to it and answers queries the way the PSU does. Clones share
//! the same device, so a test can keep a handle after moving the port into the driver.

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use crate::types::State;

/// Load connected across the simulated output.
const LOAD_OHMS: f64 = 10.0;

/// Our mock type used to emulate a serial port with a PSU attached.
#[derive(Clone)]
pub struct MockSerial {
    device: Rc<RefCell<Device>>,
}

struct Device {
    /// Everything written to the port.
    write_buffer: heapless::Vec<u8, 1024>,
    /// Command line being assembled.
    line: Vec<u8>,
    /// Bytes waiting to be read.
    read_buffer: VecDeque<u8>,
    /// Raw replies used for the next queries instead of the simulated ones.
    scripted: VecDeque<Vec<u8>>,
    identification: String,
    voltage: f64,
    current: f64,
    output: State,
    memory: [(f64, f64); 10],
    device_baud_rate: u32,
    local_baud_rate: u32,
    flush_count: usize,
    /// Reply with an empty line to commands which are normally silent.
    answer_writes: bool,
    /// Report timeouts as zero byte reads instead of errors.
    zero_read_on_timeout: bool,
    should_error_on_write: bool,
    should_error_on_read: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum MockSerialError {
    /// No data arrived before the timeout.
    #[error("Timed out")]
    Timeout,
    /// Simulated buffer overflow
    #[error("Buffer overflow")]
    BufferOverflow,
    /// Generic simulated error for testing
    #[error("Simulated error")]
    SimulatedError,
}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::Timeout => embedded_io::ErrorKind::TimedOut,
            MockSerialError::BufferOverflow => embedded_io::ErrorKind::OutOfMemory,
            MockSerialError::SimulatedError => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut device = self.device.borrow_mut();
        if device.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }

        device
            .write_buffer
            .extend_from_slice(buf)
            .map_err(|_| MockSerialError::BufferOverflow)?;

        for &byte in buf {
            if byte == b'\n' {
                let line = core::mem::take(&mut device.line);
                device.handle_line(&String::from_utf8_lossy(&line));
            } else {
                device.line.push(byte);
            }
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        let mut device = self.device.borrow_mut();
        if device.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        device.flush_count += 1;
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut device = self.device.borrow_mut();
        if device.should_error_on_read {
            return Err(MockSerialError::SimulatedError);
        }

        if device.read_buffer.is_empty() {
            return if device.zero_read_on_timeout {
                Ok(0)
            } else {
                Err(MockSerialError::Timeout)
            };
        }

        let mut count = 0;
        while count < buf.len() {
            match device.read_buffer.pop_front() {
                Some(byte) => {
                    buf[count] = byte;
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }
}

impl crate::transport::Transport for MockSerial {
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<(), Self::Error> {
        self.device.borrow_mut().local_baud_rate = baud_rate;
        Ok(())
    }
}

impl Device {
    fn handle_line(&mut self, line: &str) {
        let line = line.trim_end_matches('\r');
        let (header, argument) = match line.split_once(' ') {
            Some((header, argument)) => (header, argument.trim()),
            None => (line, ""),
        };

        if header.ends_with('?') {
            let reply = match self.scripted.pop_front() {
                Some(reply) => reply,
                None => match self.answer(header) {
                    Some(text) => format!("{text}\n").into_bytes(),
                    None => return,
                },
            };
            self.read_buffer.extend(reply);
            return;
        }

        match header {
            ":SYST:LOC" => {}
            ":SYST:COMM:RS232:BAUD" => {
                if let Ok(rate) = argument.parse() {
                    self.device_baud_rate = rate;
                }
            }
            ":VOLT" => {
                if let Ok(volts) = argument.parse() {
                    self.voltage = volts;
                }
            }
            ":CURR" => {
                if let Ok(amps) = argument.parse() {
                    self.current = amps;
                }
            }
            ":MEM:LOAD" => {
                if let Some(slot) = Self::memory_slot(argument) {
                    (self.voltage, self.current) = self.memory[slot];
                }
            }
            ":MEM:STOR" => {
                if let Some(slot) = Self::memory_slot(argument) {
                    self.memory[slot] = (self.voltage, self.current);
                }
            }
            ":OUTP:STAT" => match argument {
                "CH1, ON" => self.output = State::On,
                "CH1, OFF" => self.output = State::Off,
                _ => {}
            },
            _ => {}
        }

        if self.answer_writes {
            self.read_buffer.push_back(b'\n');
        }
    }

    fn answer(&self, header: &str) -> Option<String> {
        let (volts, amps) = self.operating_point();
        match header {
            "*IDN?" => Some(self.identification.clone()),
            ":VOLT?" => Some(format!("{:.3}", self.voltage)),
            ":CURR?" => Some(format!("{:.3}", self.current)),
            ":MEAS:VOLT?" => Some(format!("{volts:.3}")),
            ":MEAS:CURR?" => Some(format!("{amps:.3}")),
            ":MEAS:POWE?" => Some(format!("{:.3}", volts * amps)),
            ":OUTP:STAT?" => Some(self.output.to_string()),
            _ => None,
        }
    }

    /// Output voltage and current with the resistive load attached.
    fn operating_point(&self) -> (f64, f64) {
        if self.output == State::Off {
            return (0.0, 0.0);
        }
        let amps = (self.voltage / LOAD_OHMS).min(self.current);
        (amps * LOAD_OHMS, amps)
    }

    fn memory_slot(argument: &str) -> Option<usize> {
        let index: usize = argument.strip_prefix("RSF,")?.parse().ok()?;
        (1..=10).contains(&index).then(|| index - 1)
    }
}

impl MockSerial {
    /// Create a new MockSerial with a DP711 attached.
    pub fn new() -> Self {
        Self::with_identification("RIGOL,DP711,SN123,1.02")
    }

    /// Create a new MockSerial with a PSU reporting the given `*IDN?` reply.
    pub fn with_identification(identification: &str) -> Self {
        let device = Device {
            write_buffer: heapless::Vec::new(),
            line: Vec::new(),
            read_buffer: VecDeque::new(),
            scripted: VecDeque::new(),
            identification: identification.to_owned(),
            voltage: 0.0,
            current: 0.0,
            output: State::Off,
            memory: [(0.0, 0.0); 10],
            device_baud_rate: crate::DEFAULT_BAUD_RATE,
            local_baud_rate: crate::DEFAULT_BAUD_RATE,
            flush_count: 0,
            answer_writes: false,
            zero_read_on_timeout: false,
            should_error_on_write: false,
            should_error_on_read: false,
        };
        Self {
            device: Rc::new(RefCell::new(device)),
        }
    }

    /// Answer the next query with `reply` verbatim.
    pub fn push_reply(&self, reply: &[u8]) {
        self.device.borrow_mut().scripted.push_back(reply.to_vec());
    }

    /// Get a copy of the data that was written to this mock serial port
    pub fn written_data(&self) -> Vec<u8> {
        self.device.borrow().write_buffer.to_vec()
    }

    /// The written data split into command lines.
    pub fn commands(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.written_data())
            .split_inclusive('\n')
            .map(str::to_owned)
            .collect()
    }

    /// Clear the write buffer
    pub fn clear_written_data(&self) {
        self.device.borrow_mut().write_buffer.clear();
    }

    pub fn output(&self) -> State {
        self.device.borrow().output
    }

    pub fn voltage(&self) -> f64 {
        self.device.borrow().voltage
    }

    pub fn device_baud_rate(&self) -> u32 {
        self.device.borrow().device_baud_rate
    }

    pub fn local_baud_rate(&self) -> u32 {
        self.device.borrow().local_baud_rate
    }

    pub fn flush_count(&self) -> usize {
        self.device.borrow().flush_count
    }

    pub fn set_answer_writes(&self, answer: bool) {
        self.device.borrow_mut().answer_writes = answer;
    }

    pub fn set_zero_read_on_timeout(&self, zero_read: bool) {
        self.device.borrow_mut().zero_read_on_timeout = zero_read;
    }

    /// Configure whether write operations should fail with an error
    pub fn set_write_error(&self, should_error: bool) {
        self.device.borrow_mut().should_error_on_write = should_error;
    }

    /// Configure whether read operations should fail with an error
    pub fn set_read_error(&self, should_error: bool) {
        self.device.borrow_mut().should_error_on_read = should_error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Error, Read, Write};

    fn read_all(mock: &mut MockSerial) -> Vec<u8> {
        let mut received = Vec::new();
        let mut buffer = [0u8; 8];
        while let Ok(count) = mock.read(&mut buffer) {
            if count == 0 {
                break;
            }
            received.extend_from_slice(&buffer[..count]);
        }
        received
    }

    #[test]
    fn test_write_records_data() {
        let mut mock = MockSerial::new();
        mock.write_all(b":VOLT 1.5\n:CURR 0.5\n").unwrap();
        assert_eq!(mock.written_data(), b":VOLT 1.5\n:CURR 0.5\n");
        assert_eq!(mock.commands(), [":VOLT 1.5\n", ":CURR 0.5\n"]);

        mock.clear_written_data();
        assert!(mock.written_data().is_empty());
    }

    #[test]
    fn test_clones_share_device() {
        let mut mock = MockSerial::new();
        let handle = mock.clone();
        mock.write_all(b":VOLT 7\n").unwrap();
        assert_eq!(handle.voltage(), 7.0);
    }

    #[test]
    fn test_answers_identification() {
        let mut mock = MockSerial::with_identification("RIGOL,DP712,SN9,2.0");
        mock.write_all(b"*IDN?\n").unwrap();
        assert_eq!(read_all(&mut mock), b"RIGOL,DP712,SN9,2.0\n");
    }

    #[test]
    fn test_commands_split_across_writes() {
        let mut mock = MockSerial::new();
        mock.write_all(b":VOLT").unwrap();
        mock.write_all(b" 3.3\n:VOLT?").unwrap();
        assert!(read_all(&mut mock).is_empty());
        mock.write_all(b"\n").unwrap();
        assert_eq!(read_all(&mut mock), b"3.300\n");
    }

    #[test]
    fn test_output_and_measurements() {
        let mut mock = MockSerial::new();
        mock.write_all(b":VOLT 5\n:CURR 0.2\n:MEAS:CURR? CH1\n")
            .unwrap();
        assert_eq!(read_all(&mut mock), b"0.000\n");

        mock.write_all(b":OUTP:STAT CH1, ON\n:OUTP:STAT? CH1\n").unwrap();
        assert_eq!(read_all(&mut mock), b"ON\n");

        // 5V across 10R draws 0.5A, limited to 0.2A.
        mock.write_all(b":MEAS:CURR? CH1\n:MEAS:VOLT? CH1\n").unwrap();
        assert_eq!(read_all(&mut mock), b"0.200\n2.000\n");
    }

    #[test]
    fn test_memory_slots() {
        let mut mock = MockSerial::new();
        mock.write_all(b":VOLT 12\n:CURR 1\n:MEM:STOR RSF,4\n:VOLT 1\n")
            .unwrap();
        mock.write_all(b":MEM:LOAD RSF,4\n:VOLT?\n").unwrap();
        assert_eq!(read_all(&mut mock), b"12.000\n");
    }

    #[test]
    fn test_scripted_reply() {
        let mut mock = MockSerial::new();
        mock.push_reply(b"garbage\r\n");
        mock.write_all(b":VOLT?\n").unwrap();
        assert_eq!(read_all(&mut mock), b"garbage\r\n");
    }

    #[test]
    fn test_silent_commands() {
        let mut mock = MockSerial::new();
        mock.write_all(b":SYST:LOC\n").unwrap();
        let mut buffer = [0u8; 4];
        assert!(matches!(
            mock.read(&mut buffer),
            Err(MockSerialError::Timeout)
        ));

        mock.set_zero_read_on_timeout(true);
        assert_eq!(mock.read(&mut buffer).unwrap(), 0);

        mock.set_answer_writes(true);
        mock.write_all(b":SYST:LOC\n").unwrap();
        assert_eq!(read_all(&mut mock), b"\n");
    }

    #[test]
    fn test_error_simulation() {
        let mut mock = MockSerial::new();
        mock.set_write_error(true);
        assert!(mock.write(b"*IDN?\n").is_err());
        assert!(mock.flush().is_err());
        assert!(mock.written_data().is_empty());

        mock.set_write_error(false);
        mock.write_all(b"*IDN?\n").unwrap();
        mock.set_read_error(true);
        let mut buffer = [0u8; 4];
        assert!(matches!(
            mock.read(&mut buffer),
            Err(MockSerialError::SimulatedError)
        ));
    }

    #[test]
    fn test_write_buffer_overflow() {
        let mut mock = MockSerial::new();
        let large_data = vec![b'x'; 1100];
        assert!(matches!(
            mock.write(&large_data),
            Err(MockSerialError::BufferOverflow)
        ));
    }

    #[test]
    fn test_error_kinds() {
        assert!(matches!(
            MockSerialError::Timeout.kind(),
            embedded_io::ErrorKind::TimedOut
        ));
        assert!(matches!(
            MockSerialError::BufferOverflow.kind(),
            embedded_io::ErrorKind::OutOfMemory
        ));
        assert!(matches!(
            MockSerialError::SimulatedError.kind(),
            embedded_io::ErrorKind::Other
        ));
    }
}

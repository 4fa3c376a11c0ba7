//! We use this mocking module in unit tests to emulate the controller's serial port.

/// Our mock type used to emulate a serial port.
///
/// Responses are queued up front. Each one arrives in the receive buffer when a request is
/// flushed, and is then handed out as the transport reads it.
pub struct MockSerial {
    /// Buffer to store data written to the mock serial port
    write_buffer: heapless::Vec<u8, 256>,
    /// Responses still on their way, one per flushed request
    arrivals: heapless::Deque<heapless::Vec<u8, 64>, 8>,
    /// Bytes that have arrived and can be read
    read_buffer: heapless::Vec<u8, 256>,
    /// Current position in the read buffer
    read_position: usize,
    /// Flag to simulate write errors
    should_error_on_write: bool,
    /// Flag to simulate a read timeout
    should_time_out: bool,
}

#[derive(Debug)]
pub enum MockSerialError {
    /// Simulated timeout error
    Timeout,
    /// Simulated buffer overflow
    BufferOverflow,
    /// Generic simulated error for testing
    SimulatedError,
    /// Would block - no data available
    WouldBlock,
}

impl core::fmt::Display for MockSerialError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(self, f)
    }
}

impl core::error::Error for MockSerialError {}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::Timeout => embedded_io::ErrorKind::TimedOut,
            MockSerialError::BufferOverflow => embedded_io::ErrorKind::OutOfMemory,
            MockSerialError::SimulatedError => embedded_io::ErrorKind::Other,
            MockSerialError::WouldBlock => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }

        self.write_buffer
            .extend_from_slice(buf)
            .map_err(|_| MockSerialError::BufferOverflow)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        if let Some(response) = self.arrivals.pop_front() {
            self.read_buffer
                .extend_from_slice(&response)
                .map_err(|_| MockSerialError::BufferOverflow)?;
        }
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.should_time_out {
            return Err(MockSerialError::Timeout);
        }

        if self.read_position >= self.read_buffer.len() {
            return Err(MockSerialError::WouldBlock);
        }

        let available_bytes = self.read_buffer.len() - self.read_position;
        let bytes_to_read = core::cmp::min(buf.len(), available_bytes);
        buf[..bytes_to_read].copy_from_slice(
            &self.read_buffer[self.read_position..self.read_position + bytes_to_read],
        );

        self.read_position += bytes_to_read;
        Ok(bytes_to_read)
    }
}

impl embedded_io::ReadReady for MockSerial {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.should_time_out && self.read_position < self.read_buffer.len())
    }
}

impl MockSerial {
    /// Create a new MockSerial instance with empty buffers
    pub fn new() -> Self {
        Self {
            write_buffer: heapless::Vec::new(),
            arrivals: heapless::Deque::new(),
            read_buffer: heapless::Vec::new(),
            read_position: 0,
            should_error_on_write: false,
            should_time_out: false,
        }
    }

    /// Queue the bytes that arrive after the next request is flushed.
    ///
    /// An empty slice means that request gets no reply.
    pub fn queue_read_data(&mut self, data: &[u8]) -> Result<(), MockSerialError> {
        let response =
            heapless::Vec::from_slice(data).map_err(|_| MockSerialError::BufferOverflow)?;
        self.arrivals
            .push_back(response)
            .map_err(|_| MockSerialError::BufferOverflow)
    }

    /// Get a reference to the data that was written to this mock serial port
    pub fn written_data(&self) -> &[u8] {
        &self.write_buffer
    }

    /// Configure whether write operations should fail with an error
    pub fn set_write_error(&mut self, should_error: bool) {
        self.should_error_on_write = should_error;
    }

    /// Configure whether read operations should time out
    pub fn set_read_timeout(&mut self, should_time_out: bool) {
        self.should_time_out = should_time_out;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Error, Read, ReadReady, Write};

    #[test]
    fn test_write_data() {
        let mut mock = MockSerial::new();
        let test_data = b"\x01\x04\x31\x00";

        let result = mock.write(test_data);
        assert_eq!(result.unwrap(), test_data.len());
        assert_eq!(mock.written_data(), test_data);
    }

    #[test]
    fn test_queued_responses_are_read_in_order() {
        let mut mock = MockSerial::new();
        mock.queue_read_data(b"first").unwrap();
        mock.queue_read_data(b"second").unwrap();
        assert!(!mock.read_ready().unwrap());

        mock.flush().unwrap();
        mock.flush().unwrap();
        assert!(mock.read_ready().unwrap());
        let mut buffer = [0u8; 5];
        assert_eq!(mock.read(&mut buffer).unwrap(), 5);
        assert_eq!(&buffer, b"first");

        let mut buffer = [0u8; 10];
        assert_eq!(mock.read(&mut buffer).unwrap(), 6);
        assert_eq!(&buffer[..6], b"second");
        assert!(!mock.read_ready().unwrap());
    }

    #[test]
    fn test_responses_arrive_one_per_flush() {
        let mut mock = MockSerial::new();
        mock.queue_read_data(&[]).unwrap();
        mock.queue_read_data(b"late").unwrap();

        mock.flush().unwrap();
        assert!(!mock.read_ready().unwrap());

        mock.flush().unwrap();
        let mut buffer = [0u8; 8];
        assert_eq!(mock.read(&mut buffer).unwrap(), 4);
        assert_eq!(&buffer[..4], b"late");

        // Nothing left to arrive.
        mock.flush().unwrap();
        assert!(!mock.read_ready().unwrap());
    }

    #[test]
    fn test_read_would_block_when_exhausted() {
        let mut mock = MockSerial::new();
        let mut buffer = [0u8; 10];

        let result = mock.read(&mut buffer);
        assert!(matches!(result, Err(MockSerialError::WouldBlock)));
    }

    #[test]
    fn test_write_buffer_overflow() {
        let mut mock = MockSerial::new();
        let large_data = [0u8; 300]; // Larger than 256 byte capacity

        let result = mock.write(&large_data);
        assert!(matches!(result, Err(MockSerialError::BufferOverflow)));
    }

    #[test]
    fn test_error_simulation() {
        let mut mock = MockSerial::new();
        mock.set_write_error(true);
        assert!(matches!(
            mock.write(b"test"),
            Err(MockSerialError::SimulatedError)
        ));
        assert!(mock.flush().is_err());
        assert!(mock.written_data().is_empty());

        mock.queue_read_data(b"data").unwrap();
        mock.set_write_error(false);
        mock.flush().unwrap();
        mock.set_read_timeout(true);
        assert!(!mock.read_ready().unwrap());
        let mut buffer = [0u8; 4];
        let err = mock.read(&mut buffer).unwrap_err();
        assert!(matches!(err.kind(), embedded_io::ErrorKind::TimedOut));
    }
}

//! The Modbus transport the controller is driven through.
//!
//! [`Transport`] is the narrow surface the driver needs from a Modbus client. [`RtuTransport`]
//! implements it over any [`embedded_io`] serial interface, with request generation, CRC and
//! response parsing handled by [`rmodbus`].
//!
//! The receive buffer is emptied before every request. A reply that turns up after its request
//! timed out would otherwise be taken as the reply to the next request.

use embedded_io::Error as _;
use rmodbus::{ModbusProto, client::ModbusRequest};
use thiserror::Error;

/// Register table a read is issued against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterKind {
    /// Read/write configuration registers. Read with function code 3.
    Holding,
    /// Read-only measurement registers. Read with function code 4.
    Input,
}

impl RegisterKind {
    /// Modbus function code used to read this kind of register.
    pub const fn function_code(self) -> u8 {
        match self {
            RegisterKind::Holding => 0x03,
            RegisterKind::Input => 0x04,
        }
    }
}

/// Bit table a single-bit read is issued against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitKind {
    /// Read with function code 1.
    Coil,
    /// Read with function code 2.
    DiscreteInput,
}

impl BitKind {
    /// Modbus function code used to read this kind of bit.
    pub const fn function_code(self) -> u8 {
        match self {
            BitKind::Coil => 0x01,
            BitKind::DiscreteInput => 0x02,
        }
    }
}

/// Blocking request/response access to the controller's registers.
///
/// Each call is exactly one exchange on the wire. Calls may fail with transient errors; retrying
/// is the caller's business (see [`crate::retry`]).
pub trait Transport {
    type Error: core::fmt::Debug;

    /// Read `values.len()` consecutive registers starting at `address`.
    fn read_registers(
        &mut self,
        kind: RegisterKind,
        address: u16,
        values: &mut [u16],
    ) -> Result<(), Self::Error>;

    /// Read a single coil or discrete input.
    fn read_bit(&mut self, kind: BitKind, address: u16) -> Result<bool, Self::Error>;

    /// Write a single holding register (function code 6).
    fn write_register(&mut self, address: u16, value: u16) -> Result<(), Self::Error>;

    /// Write consecutive holding registers starting at `address` (function code 16).
    fn write_registers(&mut self, address: u16, values: &[u16]) -> Result<(), Self::Error>;
}

/// Errors from an [`RtuTransport`] exchange.
#[derive(Error, Debug)]
pub enum RtuError<I: embedded_io::Error> {
    #[error("Serial communication error")]
    SerialError(I),
    #[error("Modbus protocol error: {0}")]
    ModbusError(rmodbus::ErrorKind),
    #[error("Communication timeout")]
    Timeout,
    #[error("Frame does not fit the buffer")]
    BufferError,
    #[error("Invalid response received")]
    InvalidResponse,
}

impl<I: embedded_io::Error> From<rmodbus::ErrorKind> for RtuError<I> {
    fn from(err: rmodbus::ErrorKind) -> Self {
        RtuError::ModbusError(err)
    }
}

/// Serial interface an [`RtuTransport`] can run over.
///
/// [`embedded_io::ReadReady`] is used to find and drop stale input before each request.
pub trait SerialInterface: embedded_io::Read + embedded_io::ReadReady + embedded_io::Write {}

impl<S: embedded_io::Read + embedded_io::ReadReady + embedded_io::Write> SerialInterface for S {}

/// Modbus RTU client over a [`SerialInterface`].
///
/// `L` is the frame buffer size in bytes. The default fits any RTU frame.
pub struct RtuTransport<S: SerialInterface, const L: usize = 256> {
    interface: S,
    /// Default for the controllers is 0x01.
    unit_id: u8,
}

impl<S: SerialInterface, const L: usize> RtuTransport<S, L> {
    /// Create a new transport talking to `unit_id` over `interface`.
    pub fn new(interface: S, unit_id: u8) -> Self {
        Self { interface, unit_id }
    }

    /// Modbus unit id requests are addressed to.
    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    /// Give back the serial interface.
    pub fn release(self) -> S {
        self.interface
    }

    /// Drop every byte already waiting in the receive buffer.
    fn discard_pending_input(&mut self) -> Result<(), RtuError<S::Error>> {
        let mut chunk = [0u8; 32];
        let mut discarded = 0;
        while self.interface.read_ready().map_err(RtuError::SerialError)? {
            match self.interface.read(&mut chunk) {
                Ok(0) => break,
                Ok(bytes_read) => discarded += bytes_read,
                Err(e) => return Err(RtuError::SerialError(e)),
            }
        }
        if discarded > 0 {
            log::debug!("discarded {} stale byte(s) before request", discarded);
        }
        Ok(())
    }

    /// Send `request` and read back exactly one response frame into `response`.
    fn exchange(
        &mut self,
        request: &[u8],
        response: &mut heapless::Vec<u8, L>,
    ) -> Result<(), RtuError<S::Error>> {
        self.discard_pending_input()?;
        log::trace!("tx {:02X?}", request);
        self.interface
            .write_all(request)
            .map_err(RtuError::SerialError)?;
        self.interface.flush().map_err(RtuError::SerialError)?;

        response.clear();
        let mut chunk = [0u8; 32];
        loop {
            // Unit id, function and byte count are enough to know the frame length.
            let expected = if response.len() < 3 {
                3
            } else {
                usize::from(rmodbus::guess_response_frame_len(
                    &response[..],
                    ModbusProto::Rtu,
                )?)
            };
            if response.len() >= expected {
                break;
            }

            // Never read past the end of this frame.
            let wanted = (expected - response.len()).min(chunk.len());
            match self.interface.read(&mut chunk[..wanted]) {
                Ok(0) => return Err(RtuError::Timeout),
                Ok(bytes_read) => response
                    .extend_from_slice(&chunk[..bytes_read])
                    .map_err(|_| RtuError::BufferError)?,
                Err(e) if matches!(e.kind(), embedded_io::ErrorKind::TimedOut) => {
                    return Err(RtuError::Timeout);
                }
                Err(e) => return Err(RtuError::SerialError(e)),
            }
        }
        log::trace!("rx {:02X?}", &response[..]);
        Ok(())
    }
}

impl<S: SerialInterface, const L: usize> Transport for RtuTransport<S, L> {
    type Error = RtuError<S::Error>;

    fn read_registers(
        &mut self,
        kind: RegisterKind,
        address: u16,
        values: &mut [u16],
    ) -> Result<(), Self::Error> {
        let count = u16::try_from(values.len()).map_err(|_| RtuError::BufferError)?;
        let mut request: heapless::Vec<u8, L> = heapless::Vec::new();
        let mut req = ModbusRequest::new(self.unit_id, ModbusProto::Rtu);
        match kind {
            RegisterKind::Holding => req.generate_get_holdings(address, count, &mut request)?,
            RegisterKind::Input => req.generate_get_inputs(address, count, &mut request)?,
        }

        let mut response: heapless::Vec<u8, L> = heapless::Vec::new();
        self.exchange(&request, &mut response)?;

        let mut parsed: heapless::Vec<u16, 128> = heapless::Vec::new();
        req.parse_u16(&response, &mut parsed)?;
        if parsed.len() != values.len() {
            return Err(RtuError::InvalidResponse);
        }
        values.copy_from_slice(&parsed);
        Ok(())
    }

    fn read_bit(&mut self, kind: BitKind, address: u16) -> Result<bool, Self::Error> {
        let mut request: heapless::Vec<u8, L> = heapless::Vec::new();
        let mut req = ModbusRequest::new(self.unit_id, ModbusProto::Rtu);
        match kind {
            BitKind::Coil => req.generate_get_coils(address, 1, &mut request)?,
            BitKind::DiscreteInput => req.generate_get_discretes(address, 1, &mut request)?,
        }

        let mut response: heapless::Vec<u8, L> = heapless::Vec::new();
        self.exchange(&request, &mut response)?;

        let mut parsed: heapless::Vec<bool, 16> = heapless::Vec::new();
        req.parse_bool(&response, &mut parsed)?;
        parsed.first().copied().ok_or(RtuError::InvalidResponse)
    }

    fn write_register(&mut self, address: u16, value: u16) -> Result<(), Self::Error> {
        let mut request: heapless::Vec<u8, L> = heapless::Vec::new();
        let mut req = ModbusRequest::new(self.unit_id, ModbusProto::Rtu);
        req.generate_set_holding(address, value, &mut request)?;

        let mut response: heapless::Vec<u8, L> = heapless::Vec::new();
        self.exchange(&request, &mut response)?;
        req.parse_ok(&response)?;
        Ok(())
    }

    fn write_registers(&mut self, address: u16, values: &[u16]) -> Result<(), Self::Error> {
        let mut request: heapless::Vec<u8, L> = heapless::Vec::new();
        let mut req = ModbusRequest::new(self.unit_id, ModbusProto::Rtu);
        req.generate_set_holdings_bulk(address, values, &mut request)?;

        let mut response: heapless::Vec<u8, L> = heapless::Vec::new();
        self.exchange(&request, &mut response)?;
        req.parse_ok(&response)?;
        Ok(())
    }
}

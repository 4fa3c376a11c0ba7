//! Register-level stand-in for a charge controller, used by unit tests above the RTU layer.

use std::collections::BTreeMap;

use embedded_hal::delay::DelayNs;

use crate::transport::{BitKind, RegisterKind, Transport};

/// One exchange issued against the mock, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Read {
        kind: RegisterKind,
        address: u16,
        count: usize,
    },
    ReadBit {
        kind: BitKind,
        address: u16,
    },
    Write {
        address: u16,
        value: u16,
    },
    WriteMany {
        address: u16,
        values: Vec<u16>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockDeviceError {
    /// Injected transient failure.
    Timeout,
    /// Nothing configured at this address.
    IllegalAddress(u16),
}

/// Register map with failure injection and a log of every call.
#[derive(Debug, Default)]
pub struct MockDevice {
    holding: BTreeMap<u16, u16>,
    input: BTreeMap<u16, u16>,
    bits: BTreeMap<u16, bool>,
    /// Number of upcoming calls that fail with [`MockDeviceError::Timeout`].
    failures_remaining: u32,
    pub calls: Vec<Call>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_holding(mut self, address: u16, values: &[u16]) -> Self {
        for (offset, value) in values.iter().enumerate() {
            self.holding.insert(address + offset as u16, *value);
        }
        self
    }

    pub fn with_input(mut self, address: u16, values: &[u16]) -> Self {
        for (offset, value) in values.iter().enumerate() {
            self.input.insert(address + offset as u16, *value);
        }
        self
    }

    pub fn with_bit(mut self, address: u16, value: bool) -> Self {
        self.bits.insert(address, value);
        self
    }

    /// Make the next `count` calls fail.
    pub fn fail_next(&mut self, count: u32) {
        self.failures_remaining = count;
    }

    pub fn holding(&self, address: u16) -> Option<u16> {
        self.holding.get(&address).copied()
    }

    fn inject_failure(&mut self) -> Result<(), MockDeviceError> {
        if self.failures_remaining > 0 {
            self.failures_remaining -= 1;
            return Err(MockDeviceError::Timeout);
        }
        Ok(())
    }
}

impl Transport for MockDevice {
    type Error = MockDeviceError;

    fn read_registers(
        &mut self,
        kind: RegisterKind,
        address: u16,
        values: &mut [u16],
    ) -> Result<(), Self::Error> {
        self.calls.push(Call::Read {
            kind,
            address,
            count: values.len(),
        });
        self.inject_failure()?;

        let table = match kind {
            RegisterKind::Holding => &self.holding,
            RegisterKind::Input => &self.input,
        };
        for (offset, value) in values.iter_mut().enumerate() {
            let register = address + offset as u16;
            *value = *table
                .get(&register)
                .ok_or(MockDeviceError::IllegalAddress(register))?;
        }
        Ok(())
    }

    fn read_bit(&mut self, kind: BitKind, address: u16) -> Result<bool, Self::Error> {
        self.calls.push(Call::ReadBit { kind, address });
        self.inject_failure()?;
        self.bits
            .get(&address)
            .copied()
            .ok_or(MockDeviceError::IllegalAddress(address))
    }

    fn write_register(&mut self, address: u16, value: u16) -> Result<(), Self::Error> {
        self.calls.push(Call::Write { address, value });
        self.inject_failure()?;
        self.holding.insert(address, value);
        Ok(())
    }

    fn write_registers(&mut self, address: u16, values: &[u16]) -> Result<(), Self::Error> {
        self.calls.push(Call::WriteMany {
            address,
            values: values.to_vec(),
        });
        self.inject_failure()?;
        for (offset, value) in values.iter().enumerate() {
            self.holding.insert(address + offset as u16, *value);
        }
        Ok(())
    }
}

/// Delay that only records what it was asked to wait.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub delays_ms: Vec<u32>,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.delays_ms.push(ns / 1_000_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays_ms.push(ms);
    }
}

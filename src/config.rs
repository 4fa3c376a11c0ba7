//! Connection configuration.

use fugit::MillisDurationU32;

use crate::retry::RetryPolicy;

/// Highest unit id a Modbus RTU slave may use.
pub const MAX_UNIT_ID: u8 = 247;

/// How to address a controller on the bus and how hard to try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Modbus slave address, 1 - 247. EPEver controllers ship with 1.
    pub unit_id: u8,
    pub retry: RetryPolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            unit_id: 1,
            retry: RetryPolicy::default(),
        }
    }
}

impl ControllerConfig {
    pub fn with_unit_id(mut self, unit_id: u8) -> Self {
        self.unit_id = unit_id;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Check the unit id is a valid slave address. 0 is the broadcast address and is rejected.
    pub fn validate(&self) -> Result<(), u8> {
        if (1..=MAX_UNIT_ID).contains(&self.unit_id) {
            Ok(())
        } else {
            Err(self.unit_id)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

/// Settings of the serial link to the controller's RS485 port.
///
/// The library does not open ports itself; these are for whatever opens the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
    /// Per-read timeout. A response not arriving within it counts as a failed attempt.
    pub timeout: MillisDurationU32,
}

impl Default for SerialSettings {
    /// 115200 8N1, 1 second timeout.
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
            timeout: MillisDurationU32::millis(1_000),
        }
    }
}

impl SerialSettings {
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_timeout(mut self, timeout: MillisDurationU32) -> Self {
        self.timeout = timeout;
        self
    }
}

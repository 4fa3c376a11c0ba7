//! The battery voltage control group.
//!
//! Twelve consecutive holding registers starting at [`VOLTAGE_CONTROL_BASE`], each holding a
//! voltage in hundredths of a volt. The controller only accepts the group as a whole, so changing
//! one parameter means reading the group, replacing the slot and writing all twelve back. See
//! [`ChargeController::set_voltage_control`](crate::controller::ChargeController::set_voltage_control).

use core::str::FromStr;

use strum::EnumCount;
use strum_macros::{Display, EnumCount as EnumCountMacro, EnumIter, EnumString, IntoStaticStr};

use crate::error::OutOfRangeError;
use crate::register::RegisterDescriptor;

/// Address of the first register of the group.
pub const VOLTAGE_CONTROL_BASE: u16 = 0x9003;

/// Offsets of the voltage parameters from [`VOLTAGE_CONTROL_BASE`], in register order.
///
/// Parsed from and displayed as snake_case names, e.g. `"float_charging_voltage"`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    EnumCountMacro,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Display,
)]
#[strum(serialize_all = "snake_case")]
#[repr(u16)]
pub enum VoltageControlRegister {
    OverVoltageDisconnectVoltage = 0x00,
    ChargingLimitVoltage = 0x01,
    OverVoltageReconnectVoltage = 0x02,
    EqualizeChargingVoltage = 0x03,
    BoostChargingVoltage = 0x04,
    FloatChargingVoltage = 0x05,
    BoostReconnectChargingVoltage = 0x06,
    LowVoltageReconnectVoltage = 0x07,
    UnderVoltageRecoverVoltage = 0x08,
    UnderVoltageWarningVoltage = 0x09,
    LowVoltageDisconnectVoltage = 0x0A,
    DischargingLimitVoltage = 0x0B,
}

impl VoltageControlRegister {
    /// Position of this parameter within the group.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Holding register address of this parameter.
    pub const fn address(self) -> u16 {
        VOLTAGE_CONTROL_BASE + self as u16
    }

    pub const fn descriptor(self) -> RegisterDescriptor {
        RegisterDescriptor::holding(self.address()).scaled(2)
    }
}

/// All twelve voltage parameters, in volts.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VoltageControl {
    values: [f64; VoltageControlRegister::COUNT],
}

impl VoltageControl {
    /// Decode the raw contents of the group.
    pub fn from_registers(raw: [u16; VoltageControlRegister::COUNT]) -> Self {
        use strum::IntoEnumIterator;

        let mut values = [0.0; VoltageControlRegister::COUNT];
        for register in VoltageControlRegister::iter() {
            let slot = register.index();
            values[slot] = register.descriptor().decode([raw[slot], 0]);
        }
        Self { values }
    }

    pub fn get(&self, register: VoltageControlRegister) -> f64 {
        self.values[register.index()]
    }

    pub fn set(&mut self, register: VoltageControlRegister, volts: f64) {
        self.values[register.index()] = volts;
    }

    /// Every parameter with its value, in register order.
    pub fn iter(&self) -> impl Iterator<Item = (VoltageControlRegister, f64)> + '_ {
        use strum::IntoEnumIterator;
        VoltageControlRegister::iter().map(|register| (register, self.get(register)))
    }

    /// Overlay the parameters present in `update`, leaving the others untouched.
    pub fn apply(&mut self, update: &VoltageControlUpdate) {
        for (slot, value) in update.values.iter().enumerate() {
            if let Some(volts) = value {
                self.values[slot] = *volts;
            }
        }
    }

    /// Encode the group for a multi-register write.
    ///
    /// Returns the start address and register contents, or the first register whose value does
    /// not fit.
    pub fn generate_write_data_and_offset(
        &self,
    ) -> Result<(u16, [u16; VoltageControlRegister::COUNT]), OutOfRangeError> {
        use strum::IntoEnumIterator;

        let mut write_buffer = [0u16; VoltageControlRegister::COUNT];
        for register in VoltageControlRegister::iter() {
            write_buffer[register.index()] = register
                .descriptor()
                .encode(self.get(register))
                .ok_or(OutOfRangeError {
                    register: register.address(),
                })?;
        }
        Ok((VOLTAGE_CONTROL_BASE, write_buffer))
    }
}

/// A partial change to the voltage control group.
///
/// ```
/// use epever_modbus::voltage_control::{VoltageControlRegister, VoltageControlUpdate};
///
/// let mut update = VoltageControlUpdate::new()
///     .with(VoltageControlRegister::BoostChargingVoltage, 14.4);
/// update.set_by_name("float_charging_voltage", 13.8).unwrap();
/// assert!(update.set_by_name("not_a_voltage", 1.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VoltageControlUpdate {
    values: [Option<f64>; VoltageControlRegister::COUNT],
}

impl VoltageControlUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter.
    pub fn with(mut self, register: VoltageControlRegister, volts: f64) -> Self {
        self.set(register, volts);
        self
    }

    pub fn set(&mut self, register: VoltageControlRegister, volts: f64) {
        self.values[register.index()] = Some(volts);
    }

    /// Set a parameter by its snake_case name. Unknown names are rejected.
    pub fn set_by_name(&mut self, name: &str, volts: f64) -> Result<(), strum::ParseError> {
        let register = VoltageControlRegister::from_str(name)?;
        self.set(register, volts);
        Ok(())
    }

    pub fn get(&self, register: VoltageControlRegister) -> Option<f64> {
        self.values[register.index()]
    }

    /// True when no parameter has been set.
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }

    /// Check every parameter set can be encoded into its register.
    pub fn validate(&self) -> Result<(), OutOfRangeError> {
        use strum::IntoEnumIterator;

        for register in VoltageControlRegister::iter() {
            let Some(volts) = self.get(register) else {
                continue;
            };
            if register.descriptor().encode(volts).is_none() {
                return Err(OutOfRangeError {
                    register: register.address(),
                });
            }
        }
        Ok(())
    }
}

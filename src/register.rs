//! This module is used to define the registers on the EPEver charge controllers.
//!
//! Each readable quantity is a [`Quantity`], which knows its [`RegisterDescriptor`]: where it
//! lives, how wide it is and how to turn the raw integers into engineering units.

use strum_macros::{Display, EnumIter, FromRepr, IntoStaticStr};

use crate::scaling::DecimalScale;
use crate::transport::{BitKind, RegisterKind};

/// Number of 16 bit registers backing a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterWidth {
    Single,
    /// Two consecutive registers, low word at the lower address.
    Double,
}

impl RegisterWidth {
    pub const fn count(self) -> usize {
        match self {
            RegisterWidth::Single => 1,
            RegisterWidth::Double => 2,
        }
    }
}

/// Where a value lives on the device and how it is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterDescriptor {
    pub address: u16,
    pub width: RegisterWidth,
    pub scale: DecimalScale,
    /// Two's complement when set.
    pub signed: bool,
    pub kind: RegisterKind,
}

impl RegisterDescriptor {
    const fn new(kind: RegisterKind, address: u16) -> Self {
        Self {
            address,
            width: RegisterWidth::Single,
            scale: DecimalScale::UNITS,
            signed: false,
            kind,
        }
    }

    /// Unsigned, unscaled, single input register.
    pub const fn input(address: u16) -> Self {
        Self::new(RegisterKind::Input, address)
    }

    /// Unsigned, unscaled, single holding register.
    pub const fn holding(address: u16) -> Self {
        Self::new(RegisterKind::Holding, address)
    }

    pub const fn scaled(mut self, digits: u8) -> Self {
        self.scale = DecimalScale::new(digits);
        self
    }

    pub const fn wide(mut self) -> Self {
        self.width = RegisterWidth::Double;
        self
    }

    pub const fn signed(mut self) -> Self {
        self.signed = true;
        self
    }

    /// Convert raw registers into engineering units.
    ///
    /// Only the first [`RegisterWidth::count`] entries of `raw` are used.
    pub fn decode(&self, raw: [u16; 2]) -> f64 {
        let integer = match (self.width, self.signed) {
            (RegisterWidth::Single, false) => i64::from(raw[0]),
            (RegisterWidth::Single, true) => i64::from(raw[0] as i16),
            (RegisterWidth::Double, false) => i64::from(combine_wide(raw[0], raw[1])),
            (RegisterWidth::Double, true) => i64::from(combine_wide(raw[0], raw[1]) as i32),
        };
        self.scale.raw_to_value(integer)
    }

    /// Convert an engineering value into the raw contents of a single register.
    ///
    /// Returns `None` when the value does not fit the register, or the register is wide.
    pub fn encode(&self, value: f64) -> Option<u16> {
        if self.width != RegisterWidth::Single {
            return None;
        }
        let raw = self.scale.value_to_raw(value)?;
        if self.signed {
            i16::try_from(raw).ok().map(|raw| raw as u16)
        } else {
            u16::try_from(raw).ok()
        }
    }
}

/// Combine a low and a high register into one 32 bit value.
///
/// The controllers transmit 32 bit values low word first: the register at the lower address
/// holds bits 0-15, the next one bits 16-31.
#[inline]
pub const fn combine_wide(low: u16, high: u16) -> u32 {
    (low as u32) | ((high as u32) << 16)
}

/// Every value the driver knows how to read.
///
/// Naming and units follow the EPEver "Controller Protocol" register map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Quantity {
    // Rated data.
    /// Amps.
    RatedChargingCurrent,
    /// Amps.
    RatedLoadCurrent,

    // Real-time data.
    /// Volts.
    PvVoltage,
    /// Amps.
    PvCurrent,
    /// Watts.
    PvPower,
    /// Watts.
    BatteryPower,
    /// Volts.
    LoadVoltage,
    /// Amps.
    LoadCurrent,
    /// Watts.
    LoadPower,
    /// Degrees celsius.
    BatteryTemperature,
    /// Degrees celsius, inside the controller.
    ControllerTemperature,
    /// Percent.
    BatteryStateOfCharge,
    /// Degrees celsius, from the remote temperature sensor.
    RemoteBatteryTemperature,
    /// Volts.
    BatteryRealRatedVoltage,

    // Real-time status.
    BatteryStatus,
    ChargingEquipmentStatus,
    DischargingEquipmentStatus,

    // Statistics.
    /// Volts.
    MaximumPvVoltageToday,
    /// Volts.
    MinimumPvVoltageToday,
    /// Volts.
    MaximumBatteryVoltageToday,
    /// Volts.
    MinimumBatteryVoltageToday,
    /// kWh.
    ConsumedEnergyToday,
    /// kWh.
    ConsumedEnergyThisMonth,
    /// kWh.
    ConsumedEnergyThisYear,
    /// kWh.
    TotalConsumedEnergy,
    /// kWh.
    GeneratedEnergyToday,
    /// kWh.
    GeneratedEnergyThisMonth,
    /// kWh.
    GeneratedEnergyThisYear,
    /// kWh.
    TotalGeneratedEnergy,
    /// Volts.
    BatteryVoltage,
    /// Amps, positive while charging.
    BatteryCurrent,

    // Settings.
    BatteryType,
    /// Amp hours.
    BatteryCapacity,
    /// mV/°C/2V.
    TemperatureCompensationCoefficient,
    BatteryRatedVoltage,
    DefaultLoadState,
    /// Minutes.
    EqualizeDuration,
    /// Minutes.
    BoostDuration,
    /// Percent.
    BatteryDischarge,
    /// Percent.
    BatteryCharge,
    ChargingMode,
}

impl Quantity {
    /// Descriptor of the register(s) backing this quantity.
    pub const fn descriptor(self) -> RegisterDescriptor {
        use Quantity as Q;
        use RegisterDescriptor as R;
        match self {
            Q::RatedChargingCurrent => R::input(0x3005).scaled(2),
            Q::RatedLoadCurrent => R::input(0x300E).scaled(2),

            Q::PvVoltage => R::input(0x3100).scaled(2),
            Q::PvCurrent => R::input(0x3101).scaled(2),
            Q::PvPower => R::input(0x3102).scaled(2).wide(),
            Q::BatteryPower => R::input(0x3106).scaled(2).wide(),
            Q::LoadVoltage => R::input(0x310C).scaled(2),
            Q::LoadCurrent => R::input(0x310D).scaled(2),
            Q::LoadPower => R::input(0x310E).scaled(2).wide(),
            Q::BatteryTemperature => R::input(0x3110).scaled(2).signed(),
            Q::ControllerTemperature => R::input(0x3111).scaled(2).signed(),
            Q::BatteryStateOfCharge => R::input(0x311A),
            Q::RemoteBatteryTemperature => R::input(0x311B).scaled(2).signed(),
            Q::BatteryRealRatedVoltage => R::input(0x311D).scaled(2),

            Q::BatteryStatus => R::input(0x3200),
            Q::ChargingEquipmentStatus => R::input(0x3201),
            Q::DischargingEquipmentStatus => R::input(0x3202),

            Q::MaximumPvVoltageToday => R::input(0x3300).scaled(2),
            Q::MinimumPvVoltageToday => R::input(0x3301).scaled(2),
            Q::MaximumBatteryVoltageToday => R::input(0x3302).scaled(2),
            Q::MinimumBatteryVoltageToday => R::input(0x3303).scaled(2),
            Q::ConsumedEnergyToday => R::input(0x3304).scaled(2).wide(),
            Q::ConsumedEnergyThisMonth => R::input(0x3306).scaled(2).wide(),
            Q::ConsumedEnergyThisYear => R::input(0x3308).scaled(2).wide(),
            Q::TotalConsumedEnergy => R::input(0x330A).scaled(2).wide(),
            Q::GeneratedEnergyToday => R::input(0x330C).scaled(2).wide(),
            Q::GeneratedEnergyThisMonth => R::input(0x330E).scaled(2).wide(),
            Q::GeneratedEnergyThisYear => R::input(0x3310).scaled(2).wide(),
            Q::TotalGeneratedEnergy => R::input(0x3312).scaled(2).wide(),
            Q::BatteryVoltage => R::input(0x331A).scaled(2),
            Q::BatteryCurrent => R::input(0x331B).scaled(2).wide().signed(),

            Q::BatteryType => R::holding(0x9000),
            Q::BatteryCapacity => R::holding(0x9001),
            Q::TemperatureCompensationCoefficient => R::holding(0x9002).scaled(2),
            Q::BatteryRatedVoltage => R::holding(0x9067),
            Q::DefaultLoadState => R::holding(0x906A),
            Q::EqualizeDuration => R::holding(0x906B),
            Q::BoostDuration => R::holding(0x906C),
            Q::BatteryDischarge => R::holding(0x906D),
            Q::BatteryCharge => R::holding(0x906E),
            Q::ChargingMode => R::holding(0x9070),
        }
    }

    /// True when the register holds a number in engineering units.
    ///
    /// Status words and code settings are not numbers: read them through
    /// [`StatusRecord`](crate::status::StatusRecord) and [`RegisterCode`].
    pub const fn is_numeric(self) -> bool {
        !matches!(
            self,
            Quantity::BatteryStatus
                | Quantity::ChargingEquipmentStatus
                | Quantity::DischargingEquipmentStatus
                | Quantity::BatteryType
                | Quantity::BatteryRatedVoltage
                | Quantity::DefaultLoadState
                | Quantity::ChargingMode
        )
    }

    /// Snake case name, used in error reports.
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Single-bit values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Flag {
    /// Temperature inside the controller is above the over-temperature protection point.
    DeviceOverTemperature,
    /// PV voltage is below the night threshold.
    Night,
}

impl Flag {
    /// Bit table and address of this flag.
    pub const fn location(self) -> (BitKind, u16) {
        match self {
            Flag::DeviceOverTemperature => (BitKind::DiscreteInput, 0x2000),
            Flag::Night => (BitKind::DiscreteInput, 0x200C),
        }
    }
}

/// A setting stored on the device as an index into a closed table.
pub trait RegisterCode: Sized {
    /// Quantity the code is read from.
    const QUANTITY: Quantity;

    /// Look up the raw code. `None` when the code is not in the table.
    fn from_code(code: u16) -> Option<Self>;
}

/// Battery chemistry setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BatteryType {
    /// 0
    UserDefined,
    /// 1
    Sealed,
    /// 2
    Gel,
    /// 3
    Flooded,
    /// 4 - 7, depending on the cell count.
    #[strum(serialize = "LIFEPO4")]
    LiFePo4,
    /// 8 - 12, depending on the cell count.
    #[strum(serialize = "LI_NICOMN_O2")]
    LiNiCoMnO2,
}

impl RegisterCode for BatteryType {
    const QUANTITY: Quantity = Quantity::BatteryType;

    fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(BatteryType::UserDefined),
            1 => Some(BatteryType::Sealed),
            2 => Some(BatteryType::Gel),
            3 => Some(BatteryType::Flooded),
            4..=7 => Some(BatteryType::LiFePo4),
            8..=12 => Some(BatteryType::LiNiCoMnO2),
            _ => None,
        }
    }
}

/// Battery system voltage class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr, FromRepr, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u16)]
pub enum BatteryRatedVoltage {
    /// Recognised automatically at power up.
    #[strum(serialize = "AUTO")]
    Auto = 0,
    #[strum(serialize = "12V")]
    V12 = 1,
    #[strum(serialize = "24V")]
    V24 = 2,
    #[strum(serialize = "36V")]
    V36 = 3,
    #[strum(serialize = "48V")]
    V48 = 4,
    #[strum(serialize = "60V")]
    V60 = 5,
    #[strum(serialize = "110V")]
    V110 = 6,
    #[strum(serialize = "120V")]
    V120 = 7,
    #[strum(serialize = "220V")]
    V220 = 8,
    #[strum(serialize = "240V")]
    V240 = 9,
}

impl RegisterCode for BatteryRatedVoltage {
    const QUANTITY: Quantity = Quantity::BatteryRatedVoltage;

    fn from_code(code: u16) -> Option<Self> {
        Self::from_repr(code)
    }
}

/// Load output state applied when the load is in manual mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr, FromRepr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u16)]
pub enum DefaultLoadState {
    Off = 0,
    On = 1,
}

impl RegisterCode for DefaultLoadState {
    const QUANTITY: Quantity = Quantity::DefaultLoadState;

    fn from_code(code: u16) -> Option<Self> {
        Self::from_repr(code)
    }
}

impl From<DefaultLoadState> for bool {
    fn from(value: DefaultLoadState) -> Self {
        matches!(value, DefaultLoadState::On)
    }
}

/// How the controller decides when to stop charging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr, FromRepr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u16)]
pub enum ChargingMode {
    VoltageCompensation = 0,
    Soc = 1,
}

impl RegisterCode for ChargingMode {
    const QUANTITY: Quantity = Quantity::ChargingMode;

    fn from_code(code: u16) -> Option<Self> {
        Self::from_repr(code)
    }
}

//! Decoding of the three real-time status registers.
//!
//! Each register is described by a layout table of [`Field`]s. A single decoder walks the table,
//! extracting every field with [`extract_bits`] and rejecting codes the protocol does not define.
//! Records are only built from a fully validated register: an undefined code anywhere fails the
//! whole read.

use strum_macros::{Display, EnumCount, EnumIter, FromRepr};

use crate::bits::extract_bits;
use crate::error::DecodeError;
use crate::register::Quantity;

/// Upper bound on the number of fields in one status register.
pub const MAX_FIELDS: usize = 16;

/// How a field's bits are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Single bit, true when set.
    Flag,
    /// Index into a closed table of `defined` codes, `0..defined`.
    Code { defined: u16 },
}

/// One field of a status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub start_bit: u8,
    /// Unshifted mask, e.g. `0b11` for a two bit field.
    pub mask: u16,
    pub kind: FieldKind,
}

impl Field {
    const fn flag(name: &'static str, bit: u8) -> Self {
        Self {
            name,
            start_bit: bit,
            mask: 0b1,
            kind: FieldKind::Flag,
        }
    }

    const fn code(name: &'static str, start_bit: u8, mask: u16, defined: usize) -> Self {
        Self {
            name,
            start_bit,
            mask,
            kind: FieldKind::Code {
                defined: defined as u16,
            },
        }
    }
}

/// Extract every field of `layout` from `raw`, in layout order.
///
/// `register` is only used in errors. A layout longer than [`MAX_FIELDS`] fails on the first
/// field that does not fit.
pub fn decode_fields(
    register: u16,
    layout: &[Field],
    raw: u16,
) -> Result<heapless::Vec<u16, MAX_FIELDS>, DecodeError> {
    let mut fields = heapless::Vec::new();
    for field in layout {
        let value = extract_bits(raw, field.start_bit, field.mask);
        let undefined = match field.kind {
            FieldKind::Flag => false,
            FieldKind::Code { defined } => value >= defined,
        };
        if undefined {
            log::debug!(
                "status register {:#06X} = {:#018b}: {} holds undefined code {}",
                register,
                raw,
                field.name,
                value
            );
            return Err(DecodeError {
                register,
                field: field.name,
                value,
            });
        }
        if fields.push(value).is_err() {
            log::error!("layout for register {:#06X} exceeds {} fields", register, MAX_FIELDS);
            return Err(DecodeError {
                register,
                field: field.name,
                value,
            });
        }
    }
    Ok(fields)
}

/// A record decoded from one status register.
pub trait StatusRecord: Sized {
    /// Register the record is read from.
    const QUANTITY: Quantity;
    /// Field layout, in the order [`StatusRecord::from_fields`] consumes it.
    const LAYOUT: &'static [Field];

    /// Build the record from validated field values in layout order.
    fn from_fields(fields: &[u16]) -> Option<Self>;

    /// Fails to compile for any record whose layout does not fit [`MAX_FIELDS`].
    const LAYOUT_FITS: () = assert!(Self::LAYOUT.len() <= MAX_FIELDS);

    /// Decode the raw register contents.
    fn decode(raw: u16) -> Result<Self, DecodeError> {
        #[allow(clippy::let_unit_value)]
        let () = Self::LAYOUT_FITS;
        let register = Self::QUANTITY.descriptor().address;
        let fields = decode_fields(register, Self::LAYOUT, raw)?;
        Self::from_fields(&fields).ok_or(DecodeError {
            register,
            field: Self::QUANTITY.name(),
            value: raw,
        })
    }
}

/// Sequential reader over decoded field values.
struct Fields<'a>(core::slice::Iter<'a, u16>);

impl<'a> Fields<'a> {
    fn new(fields: &'a [u16]) -> Self {
        Self(fields.iter())
    }

    fn flag(&mut self) -> Option<bool> {
        self.0.next().map(|value| *value != 0)
    }

    fn raw(&mut self) -> Option<u16> {
        self.0.next().copied()
    }
}

// Battery status, 0x3200.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumCount, EnumIter, FromRepr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u16)]
pub enum TemperatureWarning {
    Normal = 0,
    /// Higher than the warning settings.
    OverTemp = 1,
    /// Lower than the warning settings.
    LowTemp = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumCount, EnumIter, FromRepr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u16)]
pub enum BatteryState {
    Normal = 0,
    OverVoltage = 1,
    UnderVoltage = 2,
    OverDischarge = 3,
    Fault = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BatteryStatus {
    pub wrong_identification_for_rated_voltage: bool,
    pub battery_inner_resistance_abnormal: bool,
    pub temperature_warning_status: TemperatureWarning,
    pub battery_status: BatteryState,
}

impl StatusRecord for BatteryStatus {
    const QUANTITY: Quantity = Quantity::BatteryStatus;
    const LAYOUT: &'static [Field] = &[
        Field::flag("wrong_identification_for_rated_voltage", 15),
        Field::flag("battery_inner_resistance_abnormal", 8),
        Field::code(
            "temperature_warning_status",
            4,
            0b111,
            <TemperatureWarning as strum::EnumCount>::COUNT,
        ),
        Field::code(
            "battery_status",
            0,
            0b111,
            <BatteryState as strum::EnumCount>::COUNT,
        ),
    ];

    fn from_fields(fields: &[u16]) -> Option<Self> {
        let mut fields = Fields::new(fields);
        Some(Self {
            wrong_identification_for_rated_voltage: fields.flag()?,
            battery_inner_resistance_abnormal: fields.flag()?,
            temperature_warning_status: TemperatureWarning::from_repr(fields.raw()?)?,
            battery_status: BatteryState::from_repr(fields.raw()?)?,
        })
    }
}

// Charging equipment status, 0x3201.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumCount, EnumIter, FromRepr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u16)]
pub enum InputVoltageStatus {
    Normal = 0,
    NoInputPower = 1,
    HigherInput = 2,
    InputVoltageError = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumCount, EnumIter, FromRepr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u16)]
pub enum ChargingStatus {
    NoCharging = 0,
    Float = 1,
    Boost = 2,
    Equalization = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ChargingEquipmentStatus {
    pub input_voltage_status: InputVoltageStatus,
    pub charging_mosfet_is_short_circuit: bool,
    pub charging_or_anti_reverse_mosfet_is_open_circuit: bool,
    pub anti_reverse_mosfet_is_short_circuit: bool,
    pub input_over_current: bool,
    pub load_over_current: bool,
    pub load_short_circuit: bool,
    pub load_mosfet_short_circuit: bool,
    pub disequilibrium_in_three_circuits: bool,
    pub pv_input_short_circuit: bool,
    pub charging_status: ChargingStatus,
    /// Raw fault bit (bit 1). Unverified.
    ///
    /// Some units have been seen reporting this bit while otherwise healthy. The position may be
    /// off by one against the manufacturer's register map, in which case this reflects a
    /// neighbouring bit. It is passed through unmodified and should be read alongside the
    /// specific fault flags.
    pub fault: bool,
    pub running: bool,
}

impl StatusRecord for ChargingEquipmentStatus {
    const QUANTITY: Quantity = Quantity::ChargingEquipmentStatus;
    const LAYOUT: &'static [Field] = &[
        Field::code(
            "input_voltage_status",
            14,
            0b11,
            <InputVoltageStatus as strum::EnumCount>::COUNT,
        ),
        Field::flag("charging_mosfet_is_short_circuit", 13),
        Field::flag("charging_or_anti_reverse_mosfet_is_open_circuit", 12),
        Field::flag("anti_reverse_mosfet_is_short_circuit", 11),
        Field::flag("input_over_current", 10),
        Field::flag("load_over_current", 9),
        Field::flag("load_short_circuit", 8),
        Field::flag("load_mosfet_short_circuit", 7),
        Field::flag("disequilibrium_in_three_circuits", 6),
        Field::flag("pv_input_short_circuit", 4),
        Field::code(
            "charging_status",
            2,
            0b11,
            <ChargingStatus as strum::EnumCount>::COUNT,
        ),
        Field::flag("fault", 1),
        Field::flag("running", 0),
    ];

    fn from_fields(fields: &[u16]) -> Option<Self> {
        let mut fields = Fields::new(fields);
        Some(Self {
            input_voltage_status: InputVoltageStatus::from_repr(fields.raw()?)?,
            charging_mosfet_is_short_circuit: fields.flag()?,
            charging_or_anti_reverse_mosfet_is_open_circuit: fields.flag()?,
            anti_reverse_mosfet_is_short_circuit: fields.flag()?,
            input_over_current: fields.flag()?,
            load_over_current: fields.flag()?,
            load_short_circuit: fields.flag()?,
            load_mosfet_short_circuit: fields.flag()?,
            disequilibrium_in_three_circuits: fields.flag()?,
            pv_input_short_circuit: fields.flag()?,
            charging_status: ChargingStatus::from_repr(fields.raw()?)?,
            fault: fields.flag()?,
            running: fields.flag()?,
        })
    }
}

// Discharging equipment status, 0x3202.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumCount, EnumIter, FromRepr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u16)]
pub enum DischargingInputVoltageStatus {
    Normal = 0,
    Low = 1,
    High = 2,
    NoAccess = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumCount, EnumIter, FromRepr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u16)]
pub enum OutputPowerLoad {
    Light = 0,
    Moderate = 1,
    Rated = 2,
    Overload = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DischargingEquipmentStatus {
    pub input_voltage_status: DischargingInputVoltageStatus,
    pub output_power_load: OutputPowerLoad,
    pub short_circuit: bool,
    pub unable_to_discharge: bool,
    pub unable_to_stop_discharging: bool,
    pub output_voltage_abnormal: bool,
    pub input_over_voltage: bool,
    pub short_circuit_in_high_voltage_side: bool,
    pub boost_over_voltage: bool,
    pub output_over_voltage: bool,
    pub fault: bool,
    pub running: bool,
}

impl StatusRecord for DischargingEquipmentStatus {
    const QUANTITY: Quantity = Quantity::DischargingEquipmentStatus;
    const LAYOUT: &'static [Field] = &[
        Field::code(
            "input_voltage_status",
            14,
            0b11,
            <DischargingInputVoltageStatus as strum::EnumCount>::COUNT,
        ),
        Field::code(
            "output_power_load",
            12,
            0b11,
            <OutputPowerLoad as strum::EnumCount>::COUNT,
        ),
        Field::flag("short_circuit", 11),
        Field::flag("unable_to_discharge", 10),
        Field::flag("unable_to_stop_discharging", 9),
        Field::flag("output_voltage_abnormal", 8),
        Field::flag("input_over_voltage", 7),
        Field::flag("short_circuit_in_high_voltage_side", 6),
        Field::flag("boost_over_voltage", 5),
        Field::flag("output_over_voltage", 4),
        Field::flag("fault", 1),
        Field::flag("running", 0),
    ];

    fn from_fields(fields: &[u16]) -> Option<Self> {
        let mut fields = Fields::new(fields);
        Some(Self {
            input_voltage_status: DischargingInputVoltageStatus::from_repr(fields.raw()?)?,
            output_power_load: OutputPowerLoad::from_repr(fields.raw()?)?,
            short_circuit: fields.flag()?,
            unable_to_discharge: fields.flag()?,
            unable_to_stop_discharging: fields.flag()?,
            output_voltage_abnormal: fields.flag()?,
            input_over_voltage: fields.flag()?,
            short_circuit_in_high_voltage_side: fields.flag()?,
            boost_over_voltage: fields.flag()?,
            output_over_voltage: fields.flag()?,
            fault: fields.flag()?,
            running: fields.flag()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// No two fields of a layout may share a bit, and every field fits in 16 bits.
    fn assert_layout_disjoint(layout: &[Field]) {
        let mut used = 0u32;
        for field in layout {
            let bits = u32::from(field.mask) << field.start_bit;
            assert!(bits <= 0xFFFF, "{} exceeds the register", field.name);
            assert_eq!(used & bits, 0, "{} overlaps another field", field.name);
            used |= bits;
        }
    }

    #[test]
    fn layouts_are_disjoint() {
        assert_layout_disjoint(BatteryStatus::LAYOUT);
        assert_layout_disjoint(ChargingEquipmentStatus::LAYOUT);
        assert_layout_disjoint(DischargingEquipmentStatus::LAYOUT);
        assert!(ChargingEquipmentStatus::LAYOUT.len() <= MAX_FIELDS);
    }

    #[test]
    fn oversized_layout_is_an_error() {
        let layout = [Field::flag("bit", 0); MAX_FIELDS + 1];
        assert_eq!(
            decode_fields(0x3200, &layout[..MAX_FIELDS], 0x0001).map(|fields| fields.len()),
            Ok(MAX_FIELDS)
        );
        assert_eq!(
            decode_fields(0x3200, &layout, 0x0001),
            Err(DecodeError {
                register: 0x3200,
                field: "bit",
                value: 1,
            })
        );
    }

    #[test]
    fn charging_status_equalization() {
        // Bits 3-2 = 0b11
        let status = ChargingEquipmentStatus::decode(0b0000_0000_0000_1100).unwrap();
        assert_eq!(status.charging_status, ChargingStatus::Equalization);
        assert_eq!(status.input_voltage_status, InputVoltageStatus::Normal);
        assert!(!status.fault);
        assert!(!status.running);
    }

    #[test]
    fn charging_status_flags() {
        let status = ChargingEquipmentStatus::decode(0b1010_0000_0001_0111).unwrap();
        assert_eq!(status.input_voltage_status, InputVoltageStatus::HigherInput);
        assert!(status.charging_mosfet_is_short_circuit);
        assert!(!status.charging_or_anti_reverse_mosfet_is_open_circuit);
        assert!(status.pv_input_short_circuit);
        assert_eq!(status.charging_status, ChargingStatus::Float);
        assert!(status.fault);
        assert!(status.running);
    }

    #[test]
    fn charging_status_is_total() {
        // Every code in this register is defined, so any raw value decodes.
        for raw in 0..=u16::MAX {
            assert!(ChargingEquipmentStatus::decode(raw).is_ok(), "{:#06X}", raw);
            assert!(DischargingEquipmentStatus::decode(raw).is_ok(), "{:#06X}", raw);
        }
    }

    #[test]
    fn battery_status_closed_outside_documented_range() {
        for raw in 0..=u16::MAX {
            let temperature = extract_bits(raw, 4, 0b111);
            let state = extract_bits(raw, 0, 0b111);
            let defined = temperature <= 2 && state <= 4;
            assert_eq!(BatteryStatus::decode(raw).is_ok(), defined, "{:#06X}", raw);
        }
    }

    #[test]
    fn battery_status_undefined_code_names_field() {
        let err = BatteryStatus::decode(0b101).unwrap_err();
        assert_eq!(
            err,
            DecodeError {
                register: 0x3200,
                field: "battery_status",
                value: 5,
            }
        );

        let err = BatteryStatus::decode(0b0011_0000).unwrap_err();
        assert_eq!(err.field, "temperature_warning_status");
        assert_eq!(err.value, 3);
    }

    #[test]
    fn battery_status_fields() {
        let status = BatteryStatus::decode(0b1000_0001_0010_0011).unwrap();
        assert!(status.wrong_identification_for_rated_voltage);
        assert!(status.battery_inner_resistance_abnormal);
        assert_eq!(status.temperature_warning_status, TemperatureWarning::LowTemp);
        assert_eq!(status.battery_status, BatteryState::OverDischarge);
        assert_eq!(status.battery_status.to_string(), "OVER_DISCHARGE");
    }

    #[test]
    fn discharging_status_fields() {
        let status = DischargingEquipmentStatus::decode(0b0111_0100_0010_0001).unwrap();
        assert_eq!(status.input_voltage_status, DischargingInputVoltageStatus::Low);
        assert_eq!(status.output_power_load, OutputPowerLoad::Overload);
        assert!(!status.short_circuit);
        assert!(status.unable_to_discharge);
        assert!(status.boost_over_voltage);
        assert!(!status.fault);
        assert!(status.running);
        assert_eq!(status.output_power_load.to_string(), "OVERLOAD");
    }

    #[test]
    fn decoder_stops_at_first_undefined_code() {
        let layout = [
            Field::code("first", 0, 0b11, 2),
            Field::code("second", 2, 0b11, 1),
        ];
        assert_eq!(decode_fields(0x1234, &layout, 0b0001).unwrap().as_slice(), &[1, 0]);
        assert_eq!(decode_fields(0x1234, &layout, 0b0110).unwrap_err().field, "first");
        assert_eq!(decode_fields(0x1234, &layout, 0b0101).unwrap_err().field, "second");
    }
}

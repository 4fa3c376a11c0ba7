//! Our error types for the EPEver charge controllers.

use thiserror::Error;

pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// Custom error type for EPEver charge controller communications.
///
/// `E` is the error type of the [`Transport`](crate::transport::Transport) in use.
#[derive(Error, Debug)]
pub enum Error<E: core::fmt::Debug> {
    /// Every attempt allowed by the [`RetryPolicy`](crate::retry::RetryPolicy) failed.
    /// Carries the failure of the last attempt.
    #[error("Transaction failed after {attempts} attempt(s): {cause:?}")]
    Transaction { attempts: u8, cause: E },
    /// The device answered with a value outside of the documented range for a field.
    #[error("Register {register:#06X} field `{field}` holds undefined value {value}")]
    Decode {
        register: u16,
        field: &'static str,
        value: u16,
    },
    #[error("Voltage control update does not contain any parameter")]
    EmptyUpdate,
    #[error("Unknown voltage control parameter name")]
    UnknownParameter,
    /// The value cannot be represented in the register's fixed-point encoding.
    #[error("Value out of range for register {register:#06X}")]
    OutOfRange { register: u16 },
    #[error("Invalid unit id {0}, expected 1-247")]
    InvalidUnitId(u8),
    /// The quantity is a status word or a code, not a number.
    #[error("`{0}` is not a numeric quantity")]
    NotNumeric(&'static str),
}

/// A field decoded from a register holds a value not defined by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeError {
    pub register: u16,
    pub field: &'static str,
    pub value: u16,
}

impl<E: core::fmt::Debug> From<DecodeError> for Error<E> {
    fn from(err: DecodeError) -> Self {
        Error::Decode {
            register: err.register,
            field: err.field,
            value: err.value,
        }
    }
}

impl<E: core::fmt::Debug> From<strum::ParseError> for Error<E> {
    fn from(_: strum::ParseError) -> Self {
        Error::UnknownParameter
    }
}

/// A value cannot be encoded into the register at `register`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfRangeError {
    pub register: u16,
}

impl<E: core::fmt::Debug> From<OutOfRangeError> for Error<E> {
    fn from(err: OutOfRangeError) -> Self {
        Error::OutOfRange {
            register: err.register,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_conversion() {
        let err: Error<()> = DecodeError {
            register: 0x3200,
            field: "battery_status",
            value: 5,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Register 0x3200 field `battery_status` holds undefined value 5"
        );
    }

    #[test]
    fn parse_error_is_unknown_parameter() {
        let err: Error<()> = strum::ParseError::VariantNotFound.into();
        assert!(matches!(err, Error::UnknownParameter));
    }

    #[test]
    fn out_of_range_conversion() {
        let err: Error<()> = OutOfRangeError { register: 0x9008 }.into();
        assert_eq!(err.to_string(), "Value out of range for register 0x9008");
    }
}

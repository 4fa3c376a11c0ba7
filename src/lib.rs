//! This crate provides a register-level driver for the EPEver family of solar charge controllers.
//!
//! It supports `no-std` environments by use of the `no_std` feature flag.
//!
//! Controller families this has been written against:
//! * Tracer AN / BN
//! * Tracer A / B
//! * LandStar B
//!
//! Other EPEver controllers exposing the same `0x3000`/`0x3100`/`0x3200`/`0x3300`/`0x9000` register
//! map should work as well.
//!
//! It uses Modbus RTU under the hood (framing and CRC courtesy of [`rmodbus`]) and is suitable for
//! interfacing with the controller's RS485 port through any serial interface implementing
//! [`embedded_io::Read`], [`embedded_io::ReadReady`] & [`embedded_io::Write`].
//!
//! The serial port used for controller comms should be configured like so
//! (see [`config::SerialSettings`]):
//! * Default baud rate: 115200
//! * Data bits: 8
//! * Stop bits: 1
//! * Parity: None
//!
//! Every accessor on [`controller::ChargeController`] performs a fresh, retried transaction. Nothing
//! is cached between calls.

#![cfg_attr(all(feature = "no_std", not(test)), no_std)]

pub mod bits;
pub mod config;
pub mod controller;
pub mod error;
pub mod register;
pub mod retry;
pub mod rtc;
pub mod scaling;
pub mod status;
pub mod transport;
pub mod voltage_control;

#[cfg(test)]
mod mock_device;
#[cfg(test)]
mod mock_serial;

//! The controller's real time clock.
//!
//! The clock occupies three holding registers, each packing two byte-sized fields:
//!
//! | Register | Low byte | High byte          |
//! |----------|----------|--------------------|
//! | `0x9013` | second   | minute             |
//! | `0x9014` | hour     | day                |
//! | `0x9015` | month    | year - 2000        |

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use modular_bitfield::prelude::*;

/// Address of the first clock register.
pub const RTC_BASE_ADDRESS: u16 = 0x9013;
/// Number of registers the clock occupies.
pub const RTC_REGISTER_COUNT: usize = 3;
/// Year stored as an offset of zero.
pub const BASE_YEAR: i32 = 2000;
/// Last year representable by the one byte offset.
pub const MAX_YEAR: i32 = BASE_YEAR + u8::MAX as i32;

/// Two byte-sized fields sharing one register.
#[bitfield]
#[derive(Debug, Clone, Copy)]
pub struct BytePair {
    pub low: B8,
    pub high: B8,
}

impl BytePair {
    fn from_register(raw: u16) -> Self {
        Self::from_bytes(raw.to_le_bytes())
    }

    fn to_register(self) -> u16 {
        u16::from_le_bytes(self.into_bytes())
    }

    fn pack(low: u8, high: u8) -> u16 {
        Self::new().with_low(low).with_high(high).to_register()
    }
}

/// Build a timestamp from the three clock registers.
///
/// Returns `None` when the registers do not hold a valid calendar date and time, e.g. day 31 in a
/// 30 day month or hour 24. Nothing is clamped or wrapped.
pub fn decode(raw: [u16; RTC_REGISTER_COUNT]) -> Option<NaiveDateTime> {
    let [seconds_minutes, hours_days, months_years] = raw.map(BytePair::from_register);

    let date = NaiveDate::from_ymd_opt(
        BASE_YEAR + i32::from(months_years.high()),
        u32::from(months_years.low()),
        u32::from(hours_days.high()),
    )?;
    let time = NaiveTime::from_hms_opt(
        u32::from(hours_days.low()),
        u32::from(seconds_minutes.high()),
        u32::from(seconds_minutes.low()),
    )?;
    Some(NaiveDateTime::new(date, time))
}

/// Pack a timestamp into the three clock registers.
///
/// Returns `None` for years the controller cannot store (before 2000 or after 2255). Sub-second
/// precision is dropped.
pub fn encode(timestamp: &NaiveDateTime) -> Option<[u16; RTC_REGISTER_COUNT]> {
    let year_offset = u8::try_from(timestamp.year() - BASE_YEAR).ok()?;

    // chrono bounds every other field well inside a byte.
    Some([
        BytePair::pack(timestamp.second() as u8, timestamp.minute() as u8),
        BytePair::pack(timestamp.hour() as u8, timestamp.day() as u8),
        BytePair::pack(timestamp.month() as u8, year_offset),
    ])
}

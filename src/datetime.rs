//! Time and date value types, BCD conversion and register-set mapping for the MCP7940 RTC.
//!
//! The MCP7940 keeps the live clock and two power-fail timestamps (power-down
//! and power-up) in packed BCD registers. The timestamps share the field
//! layout of the live clock at different addresses but carry neither seconds
//! nor year, so those fields decode as zero.
//!
//! # Error Handling
//!
//! Validation failures are reported via [`DateTimeError`].

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::registers::{
    RegAddr, DATE_TENS_MASK, HOURS_TENS_MASK, MINUTES_TENS_MASK, MONTH_TENS_MASK,
    SECONDS_TENS_MASK, YEAR_TENS_MASK,
};

/// Three-letter weekday names indexed by `(day - 1) & 0x07`.
const WEEKDAYS: [&str; 8] = ["MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN", "???"];

/// Returns the abbreviated name of a device weekday (1 = Monday ... 7 = Sunday).
///
/// Any other value, including 0, yields `"???"`.
pub fn weekday_string(day: u8) -> &'static str {
    WEEKDAYS[usize::from(day.wrapping_sub(1) & 0x07)]
}

/// Selects which block of timekeeping registers an operation addresses.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterSet {
    /// The running clock
    CurrentTime,
    /// Timestamp latched when main power was lost
    PowerDownTime,
    /// Timestamp latched when main power returned
    PowerUpTime,
}

/// Time of day in 24-hour form.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Time {
    /// Hour (0-23)
    pub hour: u8,
    /// Minute (0-59)
    pub minute: u8,
    /// Second (0-59)
    pub second: u8,
}

impl Time {
    pub fn new(hour: u8, minute: u8, second: u8) -> Self {
        Self {
            hour,
            minute,
            second,
        }
    }

    /// Checks that the fields form a valid time of day.
    pub fn validate(&self) -> Result<(), DateTimeError> {
        NaiveTime::from_hms_opt(
            u32::from(self.hour),
            u32::from(self.minute),
            u32::from(self.second),
        )
        .map(|_| ())
        .ok_or(DateTimeError::InvalidTime)
    }
}

/// Calendar date with a two-digit year counted from 2000.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Date {
    /// Day of month (1-31)
    pub day: u8,
    /// Month (1-12)
    pub month: u8,
    /// Year offset from 2000 (0-99)
    pub year: u8,
}

impl Date {
    pub fn new(day: u8, month: u8, year: u8) -> Self {
        Self { day, month, year }
    }

    /// Checks that the fields form an existing calendar date, including
    /// month lengths and leap days.
    pub fn validate(&self) -> Result<(), DateTimeError> {
        if self.year > 99 {
            return Err(DateTimeError::InvalidDate);
        }
        NaiveDate::from_ymd_opt(
            2000 + i32::from(self.year),
            u32::from(self.month),
            u32::from(self.day),
        )
        .map(|_| ())
        .ok_or(DateTimeError::InvalidDate)
    }
}

/// A time and date read or written as a pair.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DateTime {
    pub time: Time,
    pub date: Date,
}

impl DateTime {
    pub fn new(time: Time, date: Date) -> Self {
        Self { time, date }
    }

    /// Converts to a chrono `NaiveDateTime` in the 2000-2099 range.
    ///
    /// Returns `None` if the fields do not form a valid date and time, which
    /// can happen for uninitialized or power-fail registers.
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(
            2000 + i32::from(self.date.year),
            u32::from(self.date.month),
            u32::from(self.date.day),
        )?
        .and_hms_opt(
            u32::from(self.time.hour),
            u32::from(self.time.minute),
            u32::from(self.time.second),
        )
    }
}

impl TryFrom<&NaiveDateTime> for DateTime {
    type Error = DateTimeError;

    fn try_from(datetime: &NaiveDateTime) -> Result<Self, Self::Error> {
        let year = datetime.year() - 2000;
        if !(0..=99).contains(&year) {
            return Err(DateTimeError::YearOutOfRange);
        }
        // Every chrono field below is already range-checked, so the narrowing is lossless.
        Ok(DateTime {
            time: Time {
                hour: datetime.hour() as u8,
                minute: datetime.minute() as u8,
                second: datetime.second() as u8,
            },
            date: Date {
                day: datetime.day() as u8,
                month: datetime.month() as u8,
                year: year as u8,
            },
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors that can occur during MCP7940 time/date validation or conversion.
pub enum DateTimeError {
    /// The time is not a valid 24-hour time of day
    InvalidTime,
    /// The date does not exist or the year is above 99
    InvalidDate,
    /// The year is outside 2000-2099
    YearOutOfRange,
}

/// Decodes a packed BCD register byte.
///
/// The tens digit is taken from `tens_mask` and the ones digit from bits 3:0.
/// Digits above 9 are not rejected and decode to out-of-range values.
pub(crate) fn decode_bcd(raw: u8, tens_mask: u8) -> u8 {
    ((raw & tens_mask) >> 4) * 10 + (raw & 0x0F)
}

/// Encodes a binary value (0-99) as packed BCD. Larger values are truncated.
pub(crate) fn encode_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

/// A BCD encoded timekeeping field.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Field {
    Second,
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

impl Field {
    pub(crate) fn tens_mask(self) -> u8 {
        match self {
            Field::Second => SECONDS_TENS_MASK,
            Field::Minute => MINUTES_TENS_MASK,
            Field::Hour => HOURS_TENS_MASK,
            Field::Day => DATE_TENS_MASK,
            Field::Month => MONTH_TENS_MASK,
            Field::Year => YEAR_TENS_MASK,
        }
    }

    /// Register holding this field in the given set, `None` where the device
    /// does not store it (seconds and year of the power-fail timestamps).
    pub(crate) fn address(self, set: RegisterSet) -> Option<RegAddr> {
        use RegisterSet::{CurrentTime, PowerDownTime, PowerUpTime};
        match (self, set) {
            (Field::Second, CurrentTime) => Some(RegAddr::Seconds),
            (Field::Second, _) => None,
            (Field::Minute, CurrentTime) => Some(RegAddr::Minutes),
            (Field::Minute, PowerDownTime) => Some(RegAddr::PowerDownMinutes),
            (Field::Minute, PowerUpTime) => Some(RegAddr::PowerUpMinutes),
            (Field::Hour, CurrentTime) => Some(RegAddr::Hours),
            (Field::Hour, PowerDownTime) => Some(RegAddr::PowerDownHours),
            (Field::Hour, PowerUpTime) => Some(RegAddr::PowerUpHours),
            (Field::Day, CurrentTime) => Some(RegAddr::Date),
            (Field::Day, PowerDownTime) => Some(RegAddr::PowerDownDate),
            (Field::Day, PowerUpTime) => Some(RegAddr::PowerUpDate),
            (Field::Month, CurrentTime) => Some(RegAddr::Month),
            (Field::Month, PowerDownTime) => Some(RegAddr::PowerDownMonth),
            (Field::Month, PowerUpTime) => Some(RegAddr::PowerUpMonth),
            (Field::Year, CurrentTime) => Some(RegAddr::Year),
            (Field::Year, _) => None,
        }
    }
}

/// Register carrying the weekday for a set. The live clock keeps it in the
/// low bits of the weekday register, the timestamps in bits 7:5 of their month
/// register.
pub(crate) fn weekday_address(set: RegisterSet) -> RegAddr {
    match set {
        RegisterSet::CurrentTime => RegAddr::Weekday,
        RegisterSet::PowerDownTime => RegAddr::PowerDownMonth,
        RegisterSet::PowerUpTime => RegAddr::PowerUpMonth,
    }
}

pub(crate) fn decode_weekday(raw: u8, set: RegisterSet) -> u8 {
    match set {
        RegisterSet::CurrentTime => crate::registers::Weekday::from(raw).weekday(),
        _ => crate::registers::PowerFailMonth::from(raw).weekday(),
    }
}

/// The register writes that store a time, in the order they are issued.
pub(crate) fn time_writes(time: &Time) -> [(RegAddr, u8); 3] {
    [
        (RegAddr::Hours, encode_bcd(time.hour)),
        (RegAddr::Minutes, encode_bcd(time.minute)),
        (RegAddr::Seconds, encode_bcd(time.second)),
    ]
}

/// The register writes that store a date, in the order they are issued.
pub(crate) fn date_writes(date: &Date) -> [(RegAddr, u8); 3] {
    [
        (RegAddr::Date, encode_bcd(date.day)),
        (RegAddr::Month, encode_bcd(date.month)),
        (RegAddr::Year, encode_bcd(date.year)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bcd_roundtrip_all_fields() {
        let fields = [
            (Field::Second, 59),
            (Field::Minute, 59),
            (Field::Hour, 23),
            (Field::Day, 31),
            (Field::Month, 12),
            (Field::Year, 99),
        ];
        for (field, max) in fields {
            for v in 0..=max {
                assert_eq!(decode_bcd(encode_bcd(v), field.tens_mask()), v, "{:?} {}", field, v);
            }
        }
    }

    #[test]
    fn test_encode_bcd() {
        assert_eq!(encode_bcd(0), 0x00);
        assert_eq!(encode_bcd(9), 0x09);
        assert_eq!(encode_bcd(10), 0x10);
        assert_eq!(encode_bcd(37), 0x37);
        assert_eq!(encode_bcd(99), 0x99);
    }

    #[test]
    fn test_decode_bcd_ignores_control_bits() {
        // ST bit set on 45 seconds
        assert_eq!(decode_bcd(0xC5, SECONDS_TENS_MASK), 45);
        // LPYR bit set on February
        assert_eq!(decode_bcd(0x22, MONTH_TENS_MASK), 2);
        // 12-hour format bit on hour 11
        assert_eq!(decode_bcd(0x51, HOURS_TENS_MASK), 11);
    }

    #[test]
    fn test_decode_bcd_invalid_digits_are_not_rejected() {
        assert_eq!(decode_bcd(0xFF, YEAR_TENS_MASK), 165);
        assert_eq!(decode_bcd(0x0A, YEAR_TENS_MASK), 10);
    }

    #[test]
    fn test_weekday_string() {
        assert_eq!(weekday_string(1), "MON");
        assert_eq!(weekday_string(2), "TUE");
        assert_eq!(weekday_string(3), "WED");
        assert_eq!(weekday_string(4), "THU");
        assert_eq!(weekday_string(5), "FRI");
        assert_eq!(weekday_string(6), "SAT");
        assert_eq!(weekday_string(7), "SUN");
        assert_eq!(weekday_string(0), "???");
        assert_eq!(weekday_string(8), "???");
        // 9 wraps back onto MON after masking
        assert_eq!(weekday_string(9), "MON");
        for day in 0..=u8::MAX {
            assert!(WEEKDAYS.contains(&weekday_string(day)));
        }
    }

    #[test]
    fn test_field_addresses() {
        assert_eq!(
            Field::Hour.address(RegisterSet::CurrentTime),
            Some(RegAddr::Hours)
        );
        assert_eq!(
            Field::Hour.address(RegisterSet::PowerDownTime),
            Some(RegAddr::PowerDownHours)
        );
        assert_eq!(
            Field::Month.address(RegisterSet::PowerUpTime),
            Some(RegAddr::PowerUpMonth)
        );
        assert_eq!(Field::Second.address(RegisterSet::PowerDownTime), None);
        assert_eq!(Field::Second.address(RegisterSet::PowerUpTime), None);
        assert_eq!(Field::Year.address(RegisterSet::PowerDownTime), None);
        assert_eq!(Field::Year.address(RegisterSet::PowerUpTime), None);
    }

    #[test]
    fn test_decode_weekday() {
        assert_eq!(decode_weekday(0x2B, RegisterSet::CurrentTime), 3);
        assert_eq!(decode_weekday(0xB2, RegisterSet::PowerDownTime), 5);
        assert_eq!(decode_weekday(0x12, RegisterSet::PowerUpTime), 0);
    }

    #[test]
    fn test_time_validation() {
        assert!(Time::new(0, 0, 0).validate().is_ok());
        assert!(Time::new(23, 59, 59).validate().is_ok());
        assert_eq!(Time::new(24, 0, 0).validate(), Err(DateTimeError::InvalidTime));
        assert_eq!(Time::new(12, 60, 0).validate(), Err(DateTimeError::InvalidTime));
        assert_eq!(Time::new(12, 0, 60).validate(), Err(DateTimeError::InvalidTime));
    }

    #[test]
    fn test_date_validation() {
        assert!(Date::new(17, 2, 26).validate().is_ok());
        assert!(Date::new(29, 2, 24).validate().is_ok());
        assert!(Date::new(29, 2, 0).validate().is_ok());
        assert_eq!(Date::new(29, 2, 25).validate(), Err(DateTimeError::InvalidDate));
        assert_eq!(Date::new(1, 13, 26).validate(), Err(DateTimeError::InvalidDate));
        assert_eq!(Date::new(31, 4, 26).validate(), Err(DateTimeError::InvalidDate));
        assert_eq!(Date::new(0, 1, 26).validate(), Err(DateTimeError::InvalidDate));
        assert_eq!(Date::new(1, 1, 100).validate(), Err(DateTimeError::InvalidDate));
    }

    #[test]
    fn test_register_writes() {
        let writes = time_writes(&Time::new(13, 37, 5));
        assert_eq!(
            writes,
            [
                (RegAddr::Hours, 0x13),
                (RegAddr::Minutes, 0x37),
                (RegAddr::Seconds, 0x05)
            ]
        );
        let writes = date_writes(&Date::new(17, 2, 26));
        assert_eq!(
            writes,
            [
                (RegAddr::Date, 0x17),
                (RegAddr::Month, 0x02),
                (RegAddr::Year, 0x26)
            ]
        );
    }

    #[test]
    fn test_chrono_conversions() {
        let naive = NaiveDate::from_ymd_opt(2026, 2, 17)
            .unwrap()
            .and_hms_opt(13, 37, 0)
            .unwrap();
        let dt = DateTime::try_from(&naive).unwrap();
        assert_eq!(dt.time, Time::new(13, 37, 0));
        assert_eq!(dt.date, Date::new(17, 2, 26));
        assert_eq!(dt.to_naive(), Some(naive));

        let too_early = NaiveDate::from_ymd_opt(1999, 12, 31)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            DateTime::try_from(&too_early),
            Err(DateTimeError::YearOutOfRange)
        );
        let too_late = NaiveDate::from_ymd_opt(2100, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            DateTime::try_from(&too_late),
            Err(DateTimeError::YearOutOfRange)
        );

        // Power-fail timestamps read back with a zero day on blank registers
        let blank = DateTime::default();
        assert_eq!(blank.to_naive(), None);
    }
}

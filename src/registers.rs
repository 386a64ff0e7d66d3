//! Register definitions and bitfield structures for the MCP7940 RTC.
//!
//! This module contains all register addresses, bitfield definitions, and
//! related configuration types for interacting with the MCP7940 timekeeping,
//! control and power-fail timestamp registers.

use bitfield::bitfield;

/// Register addresses for the MCP7940 RTC.
#[allow(unused)]
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegAddr {
    /// Seconds register (0-59) with oscillator start bit
    Seconds = 0x00,
    /// Minutes register (0-59)
    Minutes = 0x01,
    /// Hours register (0-23)
    Hours = 0x02,
    /// Weekday register (1-7) with oscillator/power-fail/battery flags
    Weekday = 0x03,
    /// Date register (1-31)
    Date = 0x04,
    /// Month register (1-12) with leap-year flag
    Month = 0x05,
    /// Year register (0-99)
    Year = 0x06,
    /// Control register
    Control = 0x07,
    /// Digital oscillator trim register
    OscTrim = 0x08,
    /// Alarm 0 weekday register (holds the alarm polarity bit)
    Alarm0Weekday = 0x0D,
    /// Alarm 1 weekday register
    Alarm1Weekday = 0x14,
    /// Power-down timestamp minutes register
    PowerDownMinutes = 0x18,
    /// Power-down timestamp hours register
    PowerDownHours = 0x19,
    /// Power-down timestamp date register
    PowerDownDate = 0x1A,
    /// Power-down timestamp weekday/month register
    PowerDownMonth = 0x1B,
    /// Power-up timestamp minutes register
    PowerUpMinutes = 0x1C,
    /// Power-up timestamp hours register
    PowerUpHours = 0x1D,
    /// Power-up timestamp date register
    PowerUpDate = 0x1E,
    /// Power-up timestamp weekday/month register
    PowerUpMonth = 0x1F,
}

/// Tens field of the seconds register.
pub(crate) const SECONDS_TENS_MASK: u8 = 0x70;
/// Tens field of the minutes register.
pub(crate) const MINUTES_TENS_MASK: u8 = 0x70;
/// Tens field of the hours register (24-hour layout).
pub(crate) const HOURS_TENS_MASK: u8 = 0x30;
/// Tens field of the date register.
pub(crate) const DATE_TENS_MASK: u8 = 0x30;
/// Tens field of the month register.
pub(crate) const MONTH_TENS_MASK: u8 = 0x10;
/// Tens field of the year register.
pub(crate) const YEAR_TENS_MASK: u8 = 0xF0;
/// OSCRUN | PWRFAIL | VBATEN in the weekday register.
pub(crate) const STATUS_MASK: u8 = 0x38;

/// Clock source driving the timekeeping counters.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSource {
    /// External crystal on OSCI/OSCO, started with the ST bit
    Crystal,
    /// External 32.768 kHz clock on OSCI, selected with the EXTOSC bit
    External,
}

/// Function of the multi-function pin (MFP).
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MfpMode {
    /// General purpose output driven by the OUT bit
    Output,
    /// Square wave output
    SquareWave,
    /// Alarm interrupt output
    Alarm,
}

/// Which alarm modules are routed to the MFP in alarm mode.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlarmRouting {
    /// Only alarm 0 (ALM0EN)
    Alarm0,
    /// Only alarm 1 (ALM1EN)
    Alarm1,
    /// Both alarms
    Both,
}

impl AlarmRouting {
    pub(crate) fn alarm0(self) -> bool {
        matches!(self, AlarmRouting::Alarm0 | AlarmRouting::Both)
    }

    pub(crate) fn alarm1(self) -> bool {
        matches!(self, AlarmRouting::Alarm1 | AlarmRouting::Both)
    }
}

/// Active level of the MFP when an alarm fires.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlarmPolarity {
    /// Asserted low
    Normal = 0,
    /// Asserted high
    Inverted = 1,
}
impl From<u8> for AlarmPolarity {
    /// Creates an `AlarmPolarity` from a raw register value.
    ///
    /// # Panics
    /// Panics if the value is not 0 or 1.
    fn from(v: u8) -> Self {
        match v {
            0 => AlarmPolarity::Normal,
            1 => AlarmPolarity::Inverted,
            _ => panic!("Invalid value for AlarmPolarity: {}", v),
        }
    }
}
impl From<AlarmPolarity> for u8 {
    fn from(v: AlarmPolarity) -> Self {
        v as u8
    }
}

/// Square wave output frequency options.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SquareWaveFrequency {
    /// 1 Hz square wave output
    Hz1 = 0b00,
    /// 4.096 kHz square wave output
    Hz4096 = 0b01,
    /// 8.192 kHz square wave output
    Hz8192 = 0b10,
    /// 32.768 kHz square wave output
    Hz32768 = 0b11,
}
impl From<u8> for SquareWaveFrequency {
    /// Creates a `SquareWaveFrequency` from a raw register value.
    ///
    /// # Panics
    /// Panics if the value is not 0b00, 0b01, 0b10, or 0b11.
    fn from(v: u8) -> Self {
        match v {
            0b00 => SquareWaveFrequency::Hz1,
            0b01 => SquareWaveFrequency::Hz4096,
            0b10 => SquareWaveFrequency::Hz8192,
            0b11 => SquareWaveFrequency::Hz32768,
            _ => panic!("Invalid value for SquareWaveFrequency: {}", v),
        }
    }
}
impl From<SquareWaveFrequency> for u8 {
    fn from(v: SquareWaveFrequency) -> Self {
        v as u8
    }
}

/// Direction of the digital trim correction.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrimDirection {
    /// Subtract clock cycles (clock runs fast)
    Subtract = 0,
    /// Add clock cycles (clock runs slow)
    Add = 1,
}
impl From<u8> for TrimDirection {
    /// Creates a `TrimDirection` from the SIGN bit.
    ///
    /// # Panics
    /// Panics if the value is not 0 or 1.
    fn from(v: u8) -> Self {
        match v {
            0 => TrimDirection::Subtract,
            1 => TrimDirection::Add,
            _ => panic!("Invalid value for TrimDirection: {}", v),
        }
    }
}
impl From<TrimDirection> for u8 {
    fn from(v: TrimDirection) -> Self {
        v as u8
    }
}

// This macro generates the From<u8> and Into<u8> implementations for the
// register type
macro_rules! from_register_u8 {
    ($typ:ty) => {
        impl From<u8> for $typ {
            fn from(v: u8) -> Self {
                paste::paste!([< $typ >](v))
            }
        }
        impl From<$typ> for u8 {
            fn from(v: $typ) -> Self {
                v.0
            }
        }
    };
}

bitfield! {
    /// Seconds register; only the oscillator start bit is accessed here, the BCD
    /// digits go through the field layer.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Seconds(u8);
    impl Debug;
    /// Start oscillator (ST)
    pub oscillator_start, set_oscillator_start: 7;
}
from_register_u8!(Seconds);

bitfield! {
    /// Weekday register: day of week (1-7) plus oscillator, power-fail and battery flags.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Weekday(u8);
    impl Debug;
    /// Oscillator running (OSCRUN), read-only
    pub oscillator_running, _: 5;
    /// Power failure detected (PWRFAIL), write 0 to clear
    pub power_fail, set_power_fail: 4;
    /// Battery backup enable (VBATEN)
    pub battery_enable, set_battery_enable: 3;
    /// Day of week (1-7)
    pub weekday, set_weekday: 2, 0;
}
from_register_u8!(Weekday);

bitfield! {
    /// Month register; the leap-year flag sits above the BCD month digits.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Month(u8);
    impl Debug;
    /// Leap year (LPYR), read-only
    pub leap_year, _: 5;
}
from_register_u8!(Month);

bitfield! {
    /// Control register for MFP and oscillator configuration.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Control(u8);
    impl Debug;
    /// MFP output level in general purpose output mode
    pub output, set_output: 7;
    /// Square wave output enable
    pub square_wave_enable, set_square_wave_enable: 6;
    /// Alarm 1 enable
    pub alarm1_enable, set_alarm1_enable: 5;
    /// Alarm 0 enable
    pub alarm0_enable, set_alarm0_enable: 4;
    /// External oscillator input select
    pub external_oscillator, set_external_oscillator: 3;
    /// Coarse trim mode enable
    pub coarse_trim, set_coarse_trim: 2;
    /// Square wave output frequency selection
    pub from into SquareWaveFrequency, square_wave_frequency, set_square_wave_frequency: 1, 0;
}
from_register_u8!(Control);

#[cfg(feature = "defmt")]
impl defmt::Format for Control {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Control(out={}", self.output());
        if self.square_wave_enable() {
            defmt::write!(f, ", square wave {}", self.square_wave_frequency());
        }
        if self.alarm0_enable() {
            defmt::write!(f, ", ALM0");
        }
        if self.alarm1_enable() {
            defmt::write!(f, ", ALM1");
        }
        if self.external_oscillator() {
            defmt::write!(f, ", EXTOSC");
        }
        if self.coarse_trim() {
            defmt::write!(f, ", CRSTRIM");
        }
        defmt::write!(f, ")");
    }
}

bitfield! {
    /// Digital trim register: sign plus 7-bit magnitude.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct OscTrim(u8);
    impl Debug;
    /// Trim direction (SIGN)
    pub from into TrimDirection, direction, set_direction: 7, 7;
    /// Trim magnitude (0-127)
    pub trim, set_trim: 6, 0;
}
from_register_u8!(OscTrim);

bitfield! {
    /// Power-fail timestamp month register: weekday in bits 7:5 above the BCD month.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct PowerFailMonth(u8);
    impl Debug;
    /// Day of week at the power event (1-7)
    pub weekday, _: 7, 5;
}
from_register_u8!(PowerFailMonth);

bitfield! {
    /// Alarm weekday register; only the polarity bit is used by this driver.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct AlarmWeekday(u8);
    impl Debug;
    /// MFP alarm polarity (ALMPOL)
    pub from into AlarmPolarity, polarity, set_polarity: 7, 7;
}
from_register_u8!(AlarmWeekday);

bitfield! {
    /// Device status flags, the weekday register masked to OSCRUN, PWRFAIL and VBATEN.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Status(u8);
    impl Debug;
    /// Oscillator is running
    pub oscillator_running, _: 5;
    /// A power failure has been latched
    pub power_fail, _: 4;
    /// Battery backup is enabled
    pub battery_enabled, _: 3;
}

impl Status {
    /// Builds the status flags from a raw weekday register value.
    pub fn from_register(raw: u8) -> Self {
        Status(raw & STATUS_MASK)
    }

    /// Returns `true` when none of the three flags is set.
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// The flags as the raw register bits.
    pub fn bits(&self) -> u8 {
        self.0
    }
}

impl From<Weekday> for Status {
    fn from(v: Weekday) -> Self {
        Status::from_register(v.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Status {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Status(");
        let mut first = true;
        if self.oscillator_running() {
            defmt::write!(f, "OSCRUN");
            first = false;
        }
        if self.power_fail() {
            if !first {
                defmt::write!(f, ", ");
            }
            defmt::write!(f, "PWRFAIL");
            first = false;
        }
        if self.battery_enabled() {
            if !first {
                defmt::write!(f, ", ");
            }
            defmt::write!(f, "VBATEN");
            first = false;
        }
        if first {
            defmt::write!(f, "none");
        }
        defmt::write!(f, ")");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_start_bit_keeps_digits() {
        let mut seconds = Seconds::from(0x59);
        assert!(!seconds.oscillator_start());
        seconds.set_oscillator_start(true);
        assert_eq!(u8::from(seconds), 0xD9);
    }

    #[test]
    fn test_weekday_register_fields() {
        let weekday = Weekday::from(0x3B); // OSCRUN, PWRFAIL, VBATEN, day 3
        assert!(weekday.oscillator_running());
        assert!(weekday.power_fail());
        assert!(weekday.battery_enable());
        assert_eq!(weekday.weekday(), 3);

        let mut weekday = Weekday::from(0x25);
        weekday.set_battery_enable(true);
        weekday.set_weekday(7);
        assert_eq!(u8::from(weekday), 0x2F);
    }

    #[test]
    fn test_month_leap_year_flag() {
        let month = Month::from(0x22); // LPYR, February
        assert!(month.leap_year());
        assert!(!Month::from(0x12).leap_year());
    }

    #[test]
    fn test_control_register_fields() {
        let mut control = Control::default();
        control.set_square_wave_enable(true);
        control.set_square_wave_frequency(SquareWaveFrequency::Hz8192);
        assert_eq!(u8::from(control), 0x42);

        let control = Control::from(0x38);
        assert!(control.alarm1_enable());
        assert!(control.alarm0_enable());
        assert!(control.external_oscillator());
        assert!(!control.output());
        assert_eq!(control.square_wave_frequency(), SquareWaveFrequency::Hz1);
    }

    #[test]
    fn test_osc_trim_sign_and_magnitude() {
        let mut trim = OscTrim::default();
        trim.set_direction(TrimDirection::Add);
        trim.set_trim(5);
        assert_eq!(u8::from(trim), 0x85);

        let trim = OscTrim::from(0x7F);
        assert_eq!(trim.direction(), TrimDirection::Subtract);
        assert_eq!(trim.trim(), 127);
    }

    #[test]
    fn test_power_fail_month_weekday_packing() {
        let month = PowerFailMonth::from(0xB2); // weekday 5, December
        assert_eq!(month.weekday(), 5);
        assert_eq!(PowerFailMonth::from(0x12).weekday(), 0);
    }

    #[test]
    fn test_alarm_weekday_polarity() {
        let mut alarm = AlarmWeekday::from(0x71);
        alarm.set_polarity(AlarmPolarity::Inverted);
        assert_eq!(u8::from(alarm), 0xF1);
        assert_eq!(alarm.polarity(), AlarmPolarity::Inverted);
    }

    #[test]
    fn test_status_masks_unrelated_bits() {
        let status = Status::from_register(0xFF);
        assert_eq!(status.bits(), 0x38);
        assert!(status.oscillator_running());
        assert!(status.power_fail());
        assert!(status.battery_enabled());

        let status = Status::from(Weekday::from(0x07));
        assert!(status.is_none());
    }

    #[test]
    fn test_alarm_routing() {
        assert!(AlarmRouting::Alarm0.alarm0());
        assert!(!AlarmRouting::Alarm0.alarm1());
        assert!(AlarmRouting::Both.alarm0());
        assert!(AlarmRouting::Both.alarm1());
        assert!(!AlarmRouting::Alarm1.alarm0());
    }

    #[test]
    fn test_enum_conversions() {
        assert_eq!(SquareWaveFrequency::from(0b11), SquareWaveFrequency::Hz32768);
        assert_eq!(u8::from(SquareWaveFrequency::Hz4096), 0b01);
        assert_eq!(TrimDirection::from(1), TrimDirection::Add);
        assert_eq!(AlarmPolarity::from(0), AlarmPolarity::Normal);
    }

    #[test]
    #[should_panic(expected = "Invalid value for TrimDirection: 2")]
    fn test_invalid_trim_direction_conversion() {
        let _ = TrimDirection::from(2);
    }
}

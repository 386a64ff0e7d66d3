//! A platform-agnostic driver for the MCP7940 battery-backed real-time clock.
//!
//! The driver talks to the device through the `embedded-hal` 1.0 I2C and delay
//! traits. Every register is accessed with its own single-byte transaction
//! followed by a fixed settle delay, so composite reads such as
//! [`MCP7940::datetime`] are not atomic with respect to the device's own tick.
//!
//! # Example
//!
//! ```rust,ignore
//! use mcp7940::{Config, Date, RegisterSet, Time, DEFAULT_ADDRESS, MCP7940};
//!
//! let mut rtc = MCP7940::new(i2c, delay, DEFAULT_ADDRESS);
//! rtc.init(Config::default())?;
//! rtc.set_date(&Date::new(17, 2, 26))?;
//! rtc.set_time(&Time::new(13, 37, 0))?;
//!
//! let now = rtc.datetime(RegisterSet::CurrentTime)?;
//! let power_lost_at = rtc.datetime(RegisterSet::PowerDownTime)?;
//! ```
//!
//! An async variant with the same operations lives in [`asynch`] behind the
//! `async` feature.
#![no_std]

macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "log")]
            ::log::debug!($s $(, $x)*);
            #[cfg(feature = "defmt")]
            ::defmt::debug!($s $(, $x)*);
            #[cfg(not(any(feature = "log", feature = "defmt")))]
            let _ = ($( &($x) ),*);
        }
    };
}

macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "log")]
            ::log::warn!($s $(, $x)*);
            #[cfg(feature = "defmt")]
            ::defmt::warn!($s $(, $x)*);
            #[cfg(not(any(feature = "log", feature = "defmt")))]
            let _ = ($( &($x) ),*);
        }
    };
}

pub mod datetime;
pub mod registers;

cfg_if::cfg_if! {
    if #[cfg(feature = "async")] {
        pub mod asynch;
    }
}

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use paste::paste;

pub use datetime::{weekday_string, Date, DateTime, DateTimeError, RegisterSet, Time};
use datetime::{date_writes, decode_bcd, decode_weekday, time_writes, weekday_address, Field};
use registers::{AlarmWeekday, Month, OscTrim, Seconds, Weekday};
pub use registers::{
    AlarmPolarity, AlarmRouting, ClockSource, Control, MfpMode, RegAddr, SquareWaveFrequency,
    Status, TrimDirection,
};

/// Factory default I2C address of the MCP7940.
pub const DEFAULT_ADDRESS: u8 = 0x6F;

/// Device configuration applied by [`MCP7940::init`].
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Keep timekeeping alive from the backup battery
    pub battery_backup: bool,
    pub clock_source: ClockSource,
    pub mfp_mode: MfpMode,
    /// Square wave frequency, used in [`MfpMode::SquareWave`] without coarse trim
    pub square_wave_frequency: SquareWaveFrequency,
    /// Enable coarse trim mode; the square wave output then follows the trim instead of the prescaler
    pub coarse_trim: bool,
    /// Alarms routed to the MFP in [`MfpMode::Alarm`]
    pub alarm_routing: AlarmRouting,
    pub alarm0_polarity: AlarmPolarity,
    pub alarm1_polarity: AlarmPolarity,
    /// Delay after every register transaction
    pub io_settle_ms: u32,
    /// Delay after the oscillator is enabled during init
    pub oscillator_settle_ms: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            battery_backup: false,
            clock_source: ClockSource::Crystal,
            mfp_mode: MfpMode::Output,
            square_wave_frequency: SquareWaveFrequency::Hz1,
            coarse_trim: false,
            alarm_routing: AlarmRouting::Both,
            alarm0_polarity: AlarmPolarity::Normal,
            alarm1_polarity: AlarmPolarity::Normal,
            io_settle_ms: 1,
            oscillator_settle_ms: 1000,
        }
    }
}

impl Config {
    /// Control register written by init. Only the EXTOSC bit of `current` survives.
    pub(crate) fn control(&self, current: Control) -> Control {
        let mut control = Control::default();
        control.set_external_oscillator(current.external_oscillator());
        control.set_coarse_trim(self.coarse_trim);
        match self.mfp_mode {
            MfpMode::Output => {}
            MfpMode::SquareWave => {
                control.set_square_wave_enable(true);
                if !self.coarse_trim {
                    control.set_square_wave_frequency(self.square_wave_frequency);
                }
            }
            MfpMode::Alarm => {
                control.set_alarm0_enable(self.alarm_routing.alarm0());
                control.set_alarm1_enable(self.alarm_routing.alarm1());
            }
        }
        control
    }
}

/// Errors reported by the MCP7940 driver.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MCP7940Error<I2CE> {
    /// The I2C transport failed
    I2c(I2CE),
    /// A time or date failed validation; nothing was written
    DateTime(DateTimeError),
    /// Weekday outside 0-6; nothing was written
    InvalidWeekday(u8),
    /// The trim register did not read back what was written
    TrimVerification { written: u8, read: u8 },
    /// The MFP is not configured as a general purpose output
    MfpNotOutput,
}

impl<I2CE> From<I2CE> for MCP7940Error<I2CE> {
    fn from(e: I2CE) -> Self {
        MCP7940Error::I2c(e)
    }
}

/// MCP7940 Real-Time Clock driver.
pub struct MCP7940<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    config: Config,
}

impl<I2C: I2c, D: DelayNs> MCP7940<I2C, D> {
    /// Creates a new driver instance using [`Config::default`] until
    /// [`init`](Self::init) is called.
    ///
    /// # Arguments
    /// * `i2c` - The I2C bus implementation
    /// * `delay` - Delay source for the register settle time
    /// * `address` - The I2C address of the device (typically [`DEFAULT_ADDRESS`])
    pub fn new(i2c: I2C, delay: D, address: u8) -> Self {
        Self {
            i2c,
            delay,
            address,
            config: Config::default(),
        }
    }

    /// Releases the bus and delay source.
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    /// The configuration currently in effect.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn read_register(&mut self, reg: RegAddr) -> Result<u8, MCP7940Error<I2C::Error>> {
        let mut data = [0];
        self.i2c
            .write_read(self.address, &[reg as u8], &mut data)?;
        self.delay.delay_ms(self.config.io_settle_ms);
        debug!("MCP7940: read {:#x} -> {:#x}", reg as u8, data[0]);
        Ok(data[0])
    }

    fn write_register(&mut self, reg: RegAddr, value: u8) -> Result<(), MCP7940Error<I2C::Error>> {
        debug!("MCP7940: write {:#x} <- {:#x}", reg as u8, value);
        self.i2c.write(self.address, &[reg as u8, value])?;
        self.delay.delay_ms(self.config.io_settle_ms);
        Ok(())
    }

    /// Applies `config` to the device and starts the oscillator.
    ///
    /// Sets or clears battery backup, rewrites the control register keeping
    /// only the external oscillator selection, sets the alarm polarity of the
    /// routed alarms in [`MfpMode::Alarm`], enables the oscillator and waits
    /// `oscillator_settle_ms`.
    ///
    /// The new settle times and clock source govern the init transactions
    /// themselves. If any of them fails the previous configuration stays in
    /// effect.
    pub fn init(&mut self, config: Config) -> Result<(), MCP7940Error<I2C::Error>> {
        let previous = self.config;
        self.config = config;
        let result = self.apply_config(&config);
        if result.is_err() {
            warn!("MCP7940: init failed, keeping previous configuration");
            self.config = previous;
        }
        result
    }

    fn apply_config(&mut self, config: &Config) -> Result<(), MCP7940Error<I2C::Error>> {
        self.set_battery_backup(config.battery_backup)?;

        let control = config.control(self.control()?);
        debug!("MCP7940: init control {:#x}", u8::from(control));
        self.set_control(control)?;

        if config.mfp_mode == MfpMode::Alarm {
            if config.alarm_routing.alarm0() {
                let mut alarm = self.alarm0_weekday()?;
                alarm.set_polarity(config.alarm0_polarity);
                self.set_alarm0_weekday(alarm)?;
            }
            if config.alarm_routing.alarm1() {
                let mut alarm = self.alarm1_weekday()?;
                alarm.set_polarity(config.alarm1_polarity);
                self.set_alarm1_weekday(alarm)?;
            }
        }

        self.set_oscillator(true)?;
        self.delay.delay_ms(config.oscillator_settle_ms);
        Ok(())
    }

    /// Starts or stops the oscillator.
    ///
    /// With [`ClockSource::External`] this toggles EXTOSC in the control
    /// register, otherwise the ST bit in the seconds register.
    pub fn set_oscillator(&mut self, enable: bool) -> Result<(), MCP7940Error<I2C::Error>> {
        match self.config.clock_source {
            ClockSource::External => {
                let mut control = self.control()?;
                control.set_external_oscillator(enable);
                self.set_control(control)
            }
            ClockSource::Crystal => {
                let mut seconds = self.seconds_register()?;
                seconds.set_oscillator_start(enable);
                self.set_seconds_register(seconds)
            }
        }
    }

    pub fn set_battery_backup(&mut self, enable: bool) -> Result<(), MCP7940Error<I2C::Error>> {
        let mut weekday = self.weekday_register()?;
        weekday.set_battery_enable(enable);
        self.set_weekday_register(weekday)
    }

    /// Clears the power-fail flag so the next power event is timestamped.
    pub fn clear_power_fail(&mut self) -> Result<(), MCP7940Error<I2C::Error>> {
        let mut weekday = self.weekday_register()?;
        weekday.set_power_fail(false);
        self.set_weekday_register(weekday)
    }

    pub fn status(&mut self) -> Result<Status, MCP7940Error<I2C::Error>> {
        Ok(Status::from(self.weekday_register()?))
    }

    /// Writes the digital trim and verifies it by reading it back.
    ///
    /// Only the low 7 bits of `value` are used.
    pub fn trim(
        &mut self,
        direction: TrimDirection,
        value: u8,
    ) -> Result<(), MCP7940Error<I2C::Error>> {
        let mut trim = OscTrim::default();
        trim.set_direction(direction);
        trim.set_trim(value);
        self.set_osc_trim(trim)?;
        let read = self.osc_trim()?;
        if read != trim {
            warn!(
                "MCP7940: trim readback {:#x} != {:#x}",
                u8::from(read),
                u8::from(trim)
            );
            return Err(MCP7940Error::TrimVerification {
                written: trim.into(),
                read: read.into(),
            });
        }
        Ok(())
    }

    /// Drives the MFP high or low. Only valid in [`MfpMode::Output`].
    pub fn set_mfp_output(&mut self, enable: bool) -> Result<(), MCP7940Error<I2C::Error>> {
        if self.config.mfp_mode != MfpMode::Output {
            return Err(MCP7940Error::MfpNotOutput);
        }
        let mut control = self.control()?;
        control.set_output(enable);
        self.set_control(control)
    }

    /// Reads the LPYR flag maintained by the device.
    pub fn leap_year(&mut self) -> Result<bool, MCP7940Error<I2C::Error>> {
        Ok(self.month_register()?.leap_year())
    }

    fn field(&mut self, field: Field, set: RegisterSet) -> Result<u8, MCP7940Error<I2C::Error>> {
        match field.address(set) {
            Some(reg) => Ok(decode_bcd(self.read_register(reg)?, field.tens_mask())),
            None => Ok(0),
        }
    }

    /// Reads the device weekday (1-7, 0 when never set) of a register set.
    pub fn weekday(&mut self, set: RegisterSet) -> Result<u8, MCP7940Error<I2C::Error>> {
        let raw = self.read_register(weekday_address(set))?;
        Ok(decode_weekday(raw, set))
    }

    /// Reads the time of a register set. Power-fail timestamps report second 0.
    pub fn time(&mut self, set: RegisterSet) -> Result<Time, MCP7940Error<I2C::Error>> {
        let hour = self.field(Field::Hour, set)?;
        let minute = self.field(Field::Minute, set)?;
        let second = self.field(Field::Second, set)?;
        Ok(Time {
            hour,
            minute,
            second,
        })
    }

    /// Reads the date of a register set. Power-fail timestamps report year 0.
    pub fn date(&mut self, set: RegisterSet) -> Result<Date, MCP7940Error<I2C::Error>> {
        let day = self.field(Field::Day, set)?;
        let month = self.field(Field::Month, set)?;
        let year = self.field(Field::Year, set)?;
        Ok(Date { day, month, year })
    }

    pub fn datetime(&mut self, set: RegisterSet) -> Result<DateTime, MCP7940Error<I2C::Error>> {
        let time = self.time(set)?;
        let date = self.date(set)?;
        Ok(DateTime { time, date })
    }

    /// Sets the weekday from a zero-based value (0 = Monday ... 6 = Sunday).
    pub fn set_weekday(&mut self, weekday: u8) -> Result<(), MCP7940Error<I2C::Error>> {
        if weekday >= 7 {
            warn!("MCP7940: rejecting weekday {}", weekday);
            return Err(MCP7940Error::InvalidWeekday(weekday));
        }
        let mut register = self.weekday_register()?;
        register.set_weekday(weekday + 1);
        self.set_weekday_register(register)
    }

    /// Sets the current time and restarts the oscillator.
    pub fn set_time(&mut self, time: &Time) -> Result<(), MCP7940Error<I2C::Error>> {
        time.validate().map_err(|e| {
            warn!(
                "MCP7940: invalid time {}:{}:{}",
                time.hour,
                time.minute,
                time.second
            );
            MCP7940Error::DateTime(e)
        })?;
        for (reg, value) in time_writes(time) {
            self.write_register(reg, value)?;
        }
        self.set_oscillator(true)
    }

    pub fn set_date(&mut self, date: &Date) -> Result<(), MCP7940Error<I2C::Error>> {
        date.validate().map_err(|e| {
            warn!(
                "MCP7940: invalid date {}.{}.{}",
                date.day,
                date.month,
                date.year
            );
            MCP7940Error::DateTime(e)
        })?;
        for (reg, value) in date_writes(date) {
            self.write_register(reg, value)?;
        }
        Ok(())
    }

    /// Sets time and date.
    ///
    /// Both halves are always attempted. If the time fails its error is
    /// returned, otherwise the result of the date, so a partial write is
    /// never reported as success.
    pub fn set_datetime(&mut self, datetime: &DateTime) -> Result<(), MCP7940Error<I2C::Error>> {
        let time = self.set_time(&datetime.time);
        let date = self.set_date(&datetime.date);
        time.and(date)
    }
}

// Typed single-register accessors
macro_rules! impl_register_access {
    ($(($name:ident, $regaddr:expr, $typ:ty)),+) => {
        impl<I2C: I2c, D: DelayNs> MCP7940<I2C, D> {
            $(
                paste! {
                    #[doc = concat!("Gets the value of the ", stringify!($name), " register.")]
                    pub fn $name(&mut self) -> Result<$typ, MCP7940Error<I2C::Error>> {
                        Ok(<$typ>::from(self.read_register($regaddr)?))
                    }

                    #[doc = concat!("Sets the value of the ", stringify!($name), " register.")]
                    pub fn [<set_ $name>](&mut self, value: $typ) -> Result<(), MCP7940Error<I2C::Error>> {
                        self.write_register($regaddr, value.into())
                    }
                }
            )+
        }
    }
}

impl_register_access!(
    (seconds_register, RegAddr::Seconds, Seconds),
    (weekday_register, RegAddr::Weekday, Weekday),
    (month_register, RegAddr::Month, Month),
    (control, RegAddr::Control, Control),
    (osc_trim, RegAddr::OscTrim, OscTrim),
    (alarm0_weekday, RegAddr::Alarm0Weekday, AlarmWeekday),
    (alarm1_weekday, RegAddr::Alarm1Weekday, AlarmWeekday)
);

//! Async implementation of the MCP7940 driver.
//!
//! This module provides an async interface to the MCP7940 RTC device using
//! `embedded-hal-async` traits. It is only available when the `async` feature
//! is enabled. Operations, register sequencing and errors are identical to
//! the blocking [`crate::MCP7940`].
//!
//! # Example
//!
//! ```rust,ignore
//! use mcp7940::asynch::MCP7940;
//! use mcp7940::{Config, RegisterSet, DEFAULT_ADDRESS};
//!
//! let mut rtc = MCP7940::new(i2c, delay, DEFAULT_ADDRESS);
//! rtc.init(Config::default()).await?;
//! let now = rtc.datetime(RegisterSet::CurrentTime).await?;
//! ```

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use paste::paste;

use crate::datetime::{
    date_writes, decode_bcd, decode_weekday, time_writes, weekday_address, Field,
};
use crate::registers::{AlarmWeekday, Month, OscTrim, Seconds, Weekday};
use crate::{
    ClockSource, Config, Control, Date, DateTime, MCP7940Error, MfpMode, RegAddr, RegisterSet,
    Status, Time, TrimDirection,
};

/// MCP7940 Real-Time Clock async driver.
pub struct MCP7940<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    config: Config,
}

impl<I2C: I2c, D: DelayNs> MCP7940<I2C, D> {
    /// Creates a new async driver instance using [`Config::default`] until
    /// [`init`](Self::init) is called.
    pub fn new(i2c: I2C, delay: D, address: u8) -> Self {
        Self {
            i2c,
            delay,
            address,
            config: Config::default(),
        }
    }

    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    async fn read_register(&mut self, reg: RegAddr) -> Result<u8, MCP7940Error<I2C::Error>> {
        let mut data = [0];
        self.i2c
            .write_read(self.address, &[reg as u8], &mut data)
            .await?;
        self.delay.delay_ms(self.config.io_settle_ms).await;
        debug!("MCP7940: read {:#x} -> {:#x}", reg as u8, data[0]);
        Ok(data[0])
    }

    async fn write_register(
        &mut self,
        reg: RegAddr,
        value: u8,
    ) -> Result<(), MCP7940Error<I2C::Error>> {
        debug!("MCP7940: write {:#x} <- {:#x}", reg as u8, value);
        self.i2c.write(self.address, &[reg as u8, value]).await?;
        self.delay.delay_ms(self.config.io_settle_ms).await;
        Ok(())
    }

    /// Applies `config` to the device and starts the oscillator.
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err(MCP7940Error)` on error
    ///
    /// On failure the previous configuration stays in effect.
    pub async fn init(&mut self, config: Config) -> Result<(), MCP7940Error<I2C::Error>> {
        let previous = self.config;
        self.config = config;
        let result = self.apply_config(&config).await;
        if result.is_err() {
            warn!("MCP7940: init failed, keeping previous configuration");
            self.config = previous;
        }
        result
    }

    async fn apply_config(&mut self, config: &Config) -> Result<(), MCP7940Error<I2C::Error>> {
        self.set_battery_backup(config.battery_backup).await?;

        let control = config.control(self.control().await?);
        debug!("MCP7940: init control {:#x}", u8::from(control));
        self.set_control(control).await?;

        if config.mfp_mode == MfpMode::Alarm {
            if config.alarm_routing.alarm0() {
                let mut alarm = self.alarm0_weekday().await?;
                alarm.set_polarity(config.alarm0_polarity);
                self.set_alarm0_weekday(alarm).await?;
            }
            if config.alarm_routing.alarm1() {
                let mut alarm = self.alarm1_weekday().await?;
                alarm.set_polarity(config.alarm1_polarity);
                self.set_alarm1_weekday(alarm).await?;
            }
        }

        self.set_oscillator(true).await?;
        self.delay.delay_ms(config.oscillator_settle_ms).await;
        Ok(())
    }

    pub async fn set_oscillator(&mut self, enable: bool) -> Result<(), MCP7940Error<I2C::Error>> {
        match self.config.clock_source {
            ClockSource::External => {
                let mut control = self.control().await?;
                control.set_external_oscillator(enable);
                self.set_control(control).await
            }
            ClockSource::Crystal => {
                let mut seconds = self.seconds_register().await?;
                seconds.set_oscillator_start(enable);
                self.set_seconds_register(seconds).await
            }
        }
    }

    pub async fn set_battery_backup(
        &mut self,
        enable: bool,
    ) -> Result<(), MCP7940Error<I2C::Error>> {
        let mut weekday = self.weekday_register().await?;
        weekday.set_battery_enable(enable);
        self.set_weekday_register(weekday).await
    }

    pub async fn clear_power_fail(&mut self) -> Result<(), MCP7940Error<I2C::Error>> {
        let mut weekday = self.weekday_register().await?;
        weekday.set_power_fail(false);
        self.set_weekday_register(weekday).await
    }

    pub async fn status(&mut self) -> Result<Status, MCP7940Error<I2C::Error>> {
        Ok(Status::from(self.weekday_register().await?))
    }

    /// Writes the digital trim and verifies it by reading it back.
    pub async fn trim(
        &mut self,
        direction: TrimDirection,
        value: u8,
    ) -> Result<(), MCP7940Error<I2C::Error>> {
        let mut trim = OscTrim::default();
        trim.set_direction(direction);
        trim.set_trim(value);
        self.set_osc_trim(trim).await?;
        let read = self.osc_trim().await?;
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

    pub async fn set_mfp_output(&mut self, enable: bool) -> Result<(), MCP7940Error<I2C::Error>> {
        if self.config.mfp_mode != MfpMode::Output {
            return Err(MCP7940Error::MfpNotOutput);
        }
        let mut control = self.control().await?;
        control.set_output(enable);
        self.set_control(control).await
    }

    pub async fn leap_year(&mut self) -> Result<bool, MCP7940Error<I2C::Error>> {
        Ok(self.month_register().await?.leap_year())
    }

    async fn field(
        &mut self,
        field: Field,
        set: RegisterSet,
    ) -> Result<u8, MCP7940Error<I2C::Error>> {
        match field.address(set) {
            Some(reg) => Ok(decode_bcd(
                self.read_register(reg).await?,
                field.tens_mask(),
            )),
            None => Ok(0),
        }
    }

    pub async fn weekday(&mut self, set: RegisterSet) -> Result<u8, MCP7940Error<I2C::Error>> {
        let raw = self.read_register(weekday_address(set)).await?;
        Ok(decode_weekday(raw, set))
    }

    pub async fn time(&mut self, set: RegisterSet) -> Result<Time, MCP7940Error<I2C::Error>> {
        let hour = self.field(Field::Hour, set).await?;
        let minute = self.field(Field::Minute, set).await?;
        let second = self.field(Field::Second, set).await?;
        Ok(Time {
            hour,
            minute,
            second,
        })
    }

    pub async fn date(&mut self, set: RegisterSet) -> Result<Date, MCP7940Error<I2C::Error>> {
        let day = self.field(Field::Day, set).await?;
        let month = self.field(Field::Month, set).await?;
        let year = self.field(Field::Year, set).await?;
        Ok(Date { day, month, year })
    }

    pub async fn datetime(
        &mut self,
        set: RegisterSet,
    ) -> Result<DateTime, MCP7940Error<I2C::Error>> {
        let time = self.time(set).await?;
        let date = self.date(set).await?;
        Ok(DateTime { time, date })
    }

    pub async fn set_weekday(&mut self, weekday: u8) -> Result<(), MCP7940Error<I2C::Error>> {
        if weekday >= 7 {
            warn!("MCP7940: rejecting weekday {}", weekday);
            return Err(MCP7940Error::InvalidWeekday(weekday));
        }
        let mut register = self.weekday_register().await?;
        register.set_weekday(weekday + 1);
        self.set_weekday_register(register).await
    }

    pub async fn set_time(&mut self, time: &Time) -> Result<(), MCP7940Error<I2C::Error>> {
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
            self.write_register(reg, value).await?;
        }
        self.set_oscillator(true).await
    }

    pub async fn set_date(&mut self, date: &Date) -> Result<(), MCP7940Error<I2C::Error>> {
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
            self.write_register(reg, value).await?;
        }
        Ok(())
    }

    pub async fn set_datetime(
        &mut self,
        datetime: &DateTime,
    ) -> Result<(), MCP7940Error<I2C::Error>> {
        let time = self.set_time(&datetime.time).await;
        let date = self.set_date(&datetime.date).await;
        time.and(date)
    }
}

// Register access implementations
macro_rules! impl_register_access {
    ($(($name:ident, $regaddr:expr, $typ:ty)),+) => {
        impl<I2C: I2c, D: DelayNs> MCP7940<I2C, D> {
            $(
                paste! {
                    #[doc = concat!("Gets the value of the ", stringify!($name), " register.")]
                    pub async fn $name(&mut self) -> Result<$typ, MCP7940Error<I2C::Error>> {
                        Ok(<$typ>::from(self.read_register($regaddr).await?))
                    }

                    #[doc = concat!("Sets the value of the ", stringify!($name), " register.")]
                    pub async fn [<set_ $name>](&mut self, value: $typ) -> Result<(), MCP7940Error<I2C::Error>> {
                        self.write_register($regaddr, value.into()).await
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

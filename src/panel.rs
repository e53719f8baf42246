//! The foreground loop of the climate controller.
//!
//! Every pass clears the display and draws whichever screen the clock has selected. On the
//! readings screen the sensor is polled and the fan duty cycle follows the [`FanPolicy`]; a
//! failed read leaves the fan where it was. The pass ends with a fixed idle wait.
use core::{convert::Infallible, fmt::Write};

use embedded_hal::{delay::DelayNs, i2c};

use crate::{
    clock::{Screen, SharedClock},
    fan::{Direction, FanPolicy, Motor},
    sensor::ClimateSensor,
    CharacterDisplay, DisplayError,
};

/// Idle time at the end of each refresh
const IDLE_MS: u32 = 450;

pub struct ClimatePanel<'a, I2C, DELAY, SENSOR, MOTOR>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
    SENSOR: ClimateSensor,
    MOTOR: Motor,
{
    display: CharacterDisplay<I2C, DELAY>,
    sensor: SENSOR,
    motor: MOTOR,
    policy: FanPolicy,
    clock: &'a SharedClock,
    fan_speed: u8,
}

impl<'a, I2C, DELAY, SENSOR, MOTOR> ClimatePanel<'a, I2C, DELAY, SENSOR, MOTOR>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
    SENSOR: ClimateSensor,
    MOTOR: Motor,
{
    /// The display must already be initialized.
    pub fn new(
        display: CharacterDisplay<I2C, DELAY>,
        sensor: SENSOR,
        motor: MOTOR,
        policy: FanPolicy,
        clock: &'a SharedClock,
    ) -> Self {
        Self {
            display,
            sensor,
            motor,
            policy,
            clock,
            fan_speed: policy.base_speed,
        }
    }

    /// last duty cycle handed to the motor
    pub fn fan_speed(&self) -> u8 {
        self.fan_speed
    }

    pub fn display(&mut self) -> &mut CharacterDisplay<I2C, DELAY> {
        &mut self.display
    }

    /// Spin the fan up forward at the base speed.
    pub fn start(&mut self) {
        self.fan_speed = self.policy.base_speed;
        self.motor.set_direction(Direction::Forward);
        self.motor.set_speed(self.fan_speed);
    }

    /// Stop the fan. The display is left as it is.
    pub fn stop(&mut self) {
        self.motor.stop();
        self.fan_speed = 0;
    }

    /// One pass of the loop: redraw the selected screen, then idle.
    pub fn refresh(&mut self) -> Result<(), DisplayError<I2C>> {
        self.display.clear()?;

        let clock = self.clock.snapshot();
        match clock.screen {
            Screen::Readings => self.show_readings()?,
            Screen::Date => {
                let date = clock.date;
                self.display.set_cursor(0, 0)?.print("Date:")?.set_cursor(0, 1)?;
                write!(
                    self.display,
                    "{:02}/{:02}/{:04}",
                    date.day, date.month, date.year
                )?;
            }
            Screen::Time => {
                self.display.set_cursor(0, 0)?.print("Time:")?.set_cursor(0, 1)?;
                write!(
                    self.display,
                    "{:02}:{:02}:{:02}",
                    clock.hours, clock.minutes, clock.seconds
                )?;
            }
        }

        self.display.delay().delay_ms(IDLE_MS);
        Ok(())
    }

    /// Refresh forever. Only returns if the display reports an error.
    pub fn run(&mut self) -> Result<Infallible, DisplayError<I2C>> {
        self.start();
        loop {
            self.refresh()?;
        }
    }

    fn show_readings(&mut self) -> Result<(), DisplayError<I2C>> {
        let reading = match self.sensor.read() {
            Ok(reading) => reading,
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("sensor read failed, fan left at {=u8}", self.fan_speed);
                self.display.set_cursor(0, 0)?.print("DHT Error")?;
                return Ok(());
            }
        };

        self.fan_speed = self.policy.speed_for(reading.temperature, reading.humidity);
        self.motor.set_speed(self.fan_speed);
        #[cfg(feature = "defmt")]
        defmt::debug!("{}, fan speed {=u8}", reading, self.fan_speed);

        self.display.set_cursor(0, 0)?;
        write!(self.display, "Temp: {}C", reading.temperature)?;
        self.display.set_cursor(0, 1)?;
        write!(self.display, "Hum: {}%", reading.humidity)?;
        Ok(())
    }
}

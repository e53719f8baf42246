//! Temperature and humidity sensor interface.

/// One sample, in whole degrees Celsius and whole percent relative humidity.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    pub temperature: u8,
    pub humidity: u8,
}

/// A sensor that can be polled for a [`Reading`], such as a DHT11 on a single-wire bus.
pub trait ClimateSensor {
    type Error: core::fmt::Debug;

    fn read(&mut self) -> Result<Reading, Self::Error>;
}

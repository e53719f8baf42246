//! Master-only driver for the two-wire (TWI/I2C) peripheral.
//!
//! The driver talks to the peripheral through the [`TwiRegisters`] trait, which exposes the
//! four registers of an AVR style TWI block: bit rate (`TWBR`), status/prescaler (`TWSR`),
//! control (`TWCR`) and data (`TWDR`). Every blocking primitive spins on the `TWINT` flag with
//! no timeout, so a wedged bus hangs the caller. The acknowledge status reported in `TWSR` is
//! never inspected.
//!
//! [`BusDriver`] also implements [`embedded_hal::i2c::I2c`] so it can be handed to the display
//! driver like any other HAL I2C peripheral.

use core::convert::Infallible;

use embedded_hal::i2c::{self, Operation};

// TWCR bits
const TWINT: u8 = 1 << 7; //  Interrupt flag, set by hardware when the current operation completes
const TWEA: u8 = 1 << 6; //  Enable acknowledge
const TWSTA: u8 = 1 << 5; //  Start condition
const TWSTO: u8 = 1 << 4; //  Stop condition
const TWEN: u8 = 1 << 2; //  Enable the peripheral

/// Bit-rate register value for 100 kHz with a 16 MHz core clock and a prescaler of 1
const TWBR_100KHZ: u8 = 0x48;
/// Bit-rate register value for 400 kHz with a 16 MHz core clock and a prescaler of 1
const TWBR_400KHZ: u8 = 0x0C;

/// Raw register access to a TWI peripheral. Implemented by the board support code for the real
/// register block, and by recording fakes in tests.
pub trait TwiRegisters {
    /// Write the bit-rate register (`TWBR`)
    fn write_bit_rate(&mut self, value: u8);

    /// Write the status register (`TWSR`). Only the prescaler bits are writable.
    fn write_status(&mut self, value: u8);

    /// Write the control register (`TWCR`)
    fn write_control(&mut self, value: u8);

    /// Read the control register (`TWCR`)
    fn read_control(&mut self) -> u8;

    /// Write the data register (`TWDR`)
    fn write_data(&mut self, value: u8);

    /// Read the data register (`TWDR`)
    fn read_data(&mut self) -> u8;
}

/// Bus session parameters. Chosen once at startup.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusConfig {
    /// 7-bit address of the target device
    pub address: u8,
    /// SCL frequency in Hz. Only 100 kHz and 400 kHz are supported.
    pub frequency: u32,
}

impl BusConfig {
    /// Standard mode (100 kHz) at the expander's usual address
    pub const STANDARD: Self = Self {
        address: 0x27,
        frequency: 100_000,
    };

    /// Fast mode (400 kHz) at the expander's usual address
    pub const FAST: Self = Self {
        address: 0x27,
        frequency: 400_000,
    };

    /// Returns the bit-rate register value for the configured frequency, or `None` if the
    /// frequency is not one of the two supported speeds.
    pub const fn bit_rate(&self) -> Option<u8> {
        match self.frequency {
            100_000 => Some(TWBR_100KHZ),
            400_000 => Some(TWBR_400KHZ),
            _ => None,
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Blocking, master-only TWI driver.
pub struct BusDriver<TWI>
where
    TWI: TwiRegisters,
{
    twi: TWI,
    config: BusConfig,
}

impl<TWI> BusDriver<TWI>
where
    TWI: TwiRegisters,
{
    /// Take ownership of the peripheral and configure it.
    pub fn new(twi: TWI, config: BusConfig) -> Self {
        let mut driver = Self { twi, config };
        driver.configure(config);
        driver
    }

    /// Set the bit rate and enable the peripheral with a prescaler of 1.
    ///
    /// An unsupported frequency leaves the bit-rate register as it was; the peripheral is still
    /// enabled.
    pub fn configure(&mut self, config: BusConfig) {
        self.config = config;
        if let Some(bit_rate) = config.bit_rate() {
            self.twi.write_bit_rate(bit_rate);
        }
        self.twi.write_control(TWEN);
        self.twi.write_status(0x00);
    }

    /// returns the active configuration
    pub fn config(&self) -> BusConfig {
        self.config
    }

    /// Issue a start condition and wait until the hardware reports it on the bus.
    pub fn start(&mut self) {
        self.twi.write_control(TWINT | TWEN | TWSTA);
        self.wait_for_completion();
    }

    /// Issue a stop condition. The stop is self-timed by the hardware so this does not wait.
    pub fn stop(&mut self) {
        self.twi.write_control(TWEN | TWSTO);
    }

    /// Shift one byte out and wait for the transfer to finish. The acknowledge bit is ignored.
    pub fn write_byte(&mut self, data: u8) {
        self.twi.write_data(data);
        self.twi.write_control(TWINT | TWEN);
        self.wait_for_completion();
    }

    /// Clock one byte in and return it. `TWEA` is left clear, so the byte is not acknowledged.
    pub fn read_byte(&mut self) -> u8 {
        self.twi.write_control(TWEN | TWINT);
        self.wait_for_completion();
        self.twi.read_data()
    }

    /// Clock one byte in and acknowledge it, asking the target for more.
    fn read_byte_ack(&mut self) -> u8 {
        self.twi.write_control(TWEN | TWINT | TWEA);
        self.wait_for_completion();
        self.twi.read_data()
    }

    /// Give the peripheral back.
    pub fn release(self) -> TWI {
        self.twi
    }

    /// returns the register block. mostly needed for testing
    fn twi(&mut self) -> &mut TWI {
        &mut self.twi
    }

    fn wait_for_completion(&mut self) {
        while self.twi.read_control() & TWINT == 0 {
            core::hint::spin_loop();
        }
    }
}

impl<TWI> i2c::ErrorType for BusDriver<TWI>
where
    TWI: TwiRegisters,
{
    type Error = Infallible;
}

impl<TWI> i2c::I2c for BusDriver<TWI>
where
    TWI: TwiRegisters,
{
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        // (re)start only when the direction changes; adjacent operations of the same kind
        // are one contiguous transfer
        let mut reading: Option<bool> = None;
        for idx in 0..operations.len() {
            let read_follows = matches!(operations.get(idx + 1), Some(Operation::Read(_)));
            match &mut operations[idx] {
                Operation::Write(bytes) => {
                    if reading != Some(false) {
                        self.start();
                        self.write_byte(address << 1);
                        reading = Some(false);
                    }
                    for &byte in bytes.iter() {
                        self.write_byte(byte);
                    }
                }
                Operation::Read(buffer) => {
                    if reading != Some(true) {
                        self.start();
                        self.write_byte((address << 1) | 1);
                        reading = Some(true);
                    }
                    // the last byte of the transfer is not acknowledged
                    let len = buffer.len();
                    for (pos, byte) in buffer.iter_mut().enumerate() {
                        *byte = if pos + 1 < len || read_follows {
                            self.read_byte_ack()
                        } else {
                            self.read_byte()
                        };
                    }
                }
            }
        }
        if reading.is_some() {
            self.stop();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use super::*;
    use embedded_hal::i2c::I2c;

    #[derive(Debug, PartialEq, Clone, Copy)]
    enum Access {
        BitRate(u8),
        Status(u8),
        Control(u8),
        Data(u8),
    }

    /// Register block that records every write and reports completion after `busy_polls` reads
    #[derive(Default)]
    struct FakeTwi {
        log: Vec<Access>,
        busy_polls: usize,
        polls: usize,
        rx: Vec<u8>,
    }

    impl TwiRegisters for FakeTwi {
        fn write_bit_rate(&mut self, value: u8) {
            self.log.push(Access::BitRate(value));
        }

        fn write_status(&mut self, value: u8) {
            self.log.push(Access::Status(value));
        }

        fn write_control(&mut self, value: u8) {
            self.log.push(Access::Control(value));
        }

        fn read_control(&mut self) -> u8 {
            self.polls += 1;
            if self.busy_polls > 0 {
                self.busy_polls -= 1;
                TWEN
            } else {
                TWINT | TWEN
            }
        }

        fn write_data(&mut self, value: u8) {
            self.log.push(Access::Data(value));
        }

        fn read_data(&mut self) -> u8 {
            self.rx.remove(0)
        }
    }

    fn bus_at(frequency: u32) -> BusDriver<FakeTwi> {
        BusDriver::new(
            FakeTwi::default(),
            BusConfig {
                address: 0x27,
                frequency,
            },
        )
    }

    #[test]
    fn test_configure_standard_speed() {
        let mut bus = bus_at(100_000);
        assert_eq!(
            bus.twi().log,
            std::vec![Access::BitRate(0x48), Access::Control(0x04), Access::Status(0x00)]
        );
        assert_eq!(bus.config(), BusConfig::STANDARD);
    }

    #[test]
    fn test_configure_fast_speed() {
        let mut bus = bus_at(400_000);
        assert_eq!(
            bus.twi().log,
            std::vec![Access::BitRate(0x0C), Access::Control(0x04), Access::Status(0x00)]
        );
    }

    #[test]
    fn test_configure_unsupported_speed_leaves_bit_rate() {
        let mut bus = bus_at(250_000);
        // bit rate register untouched, peripheral still enabled
        assert_eq!(
            bus.twi().log,
            std::vec![Access::Control(0x04), Access::Status(0x00)]
        );
        assert_eq!(bus.config().bit_rate(), None);
    }

    #[test]
    fn test_start_spins_until_complete() {
        let mut bus = bus_at(100_000);
        bus.twi().busy_polls = 3;
        bus.twi().polls = 0;
        bus.start();
        assert_eq!(bus.twi().polls, 4);
    }

    #[test]
    fn test_stop_does_not_wait() {
        let mut bus = bus_at(100_000);
        bus.twi().log.clear();
        bus.twi().polls = 0;
        bus.stop();
        assert_eq!(bus.twi().log, std::vec![Access::Control(0x14)]);
        assert_eq!(bus.twi().polls, 0);
    }

    #[test]
    fn test_write_single_byte_transaction() {
        let mut bus = bus_at(100_000);
        bus.twi().log.clear();
        assert!(bus.write(0x27, &[0xAB]).is_ok());
        assert_eq!(
            bus.twi().log,
            std::vec![
                Access::Control(0xA4), // start
                Access::Data(0x4E),    // address 0x27, write
                Access::Control(0x84),
                Access::Data(0xAB),
                Access::Control(0x84),
                Access::Control(0x14), // stop
            ]
        );
    }

    #[test]
    fn test_read_acks_all_but_last_byte() {
        let mut bus = bus_at(100_000);
        bus.twi().log.clear();
        bus.twi().rx = std::vec![0x12, 0x34];
        let mut buffer = [0u8; 2];
        assert!(bus.read(0x27, &mut buffer).is_ok());
        assert_eq!(buffer, [0x12, 0x34]);
        assert_eq!(
            bus.twi().log,
            std::vec![
                Access::Control(0xA4), // start
                Access::Data(0x4F),    // address 0x27, read
                Access::Control(0x84),
                Access::Control(0xC4), // first byte, ack
                Access::Control(0x84), // last byte, nack
                Access::Control(0x14), // stop
            ]
        );
    }

    #[test]
    fn test_write_read_uses_repeated_start() {
        let mut bus = bus_at(100_000);
        bus.twi().log.clear();
        bus.twi().rx = std::vec![0x5A];
        let mut buffer = [0u8; 1];
        assert!(bus.write_read(0x27, &[0x09], &mut buffer).is_ok());
        assert_eq!(buffer, [0x5A]);
        assert_eq!(
            bus.twi().log,
            std::vec![
                Access::Control(0xA4),
                Access::Data(0x4E),
                Access::Control(0x84),
                Access::Data(0x09),
                Access::Control(0x84),
                Access::Control(0xA4), // repeated start
                Access::Data(0x4F),
                Access::Control(0x84),
                Access::Control(0x84),
                Access::Control(0x14),
            ]
        );
    }

    #[test]
    fn test_read_byte_returns_data_register() {
        let mut bus = bus_at(100_000);
        bus.twi().rx = std::vec![0x77];
        assert_eq!(bus.read_byte(), 0x77);
        let twi = bus.release();
        assert!(twi.rx.is_empty());
    }
}

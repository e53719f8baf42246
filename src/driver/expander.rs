use bitfield::bitfield;
use embedded_hal::{delay::DelayNs, i2c};

use crate::DisplayError;

// Pin wiring of the PCF8574 based 4-bit LCD interface
bitfield! {
    pub struct ExpanderBits(u8);
    impl Debug;
    pub rs, set_rs: 0, 0;
    pub rw, set_rw: 1, 1;
    pub enable, set_enable: 2, 2;
    pub backlight, set_backlight: 3, 3;
    pub data, set_data: 7, 4;
}

impl Clone for ExpanderBits {
    fn clone(&self) -> Self {
        Self(self.0)
    }
}

/// Value of the register select line.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Byte goes to the instruction register
    Command = 0x00,
    /// Byte goes to DDRAM or CGRAM, depending on the last address command
    Data = 0x01,
}

/// Frames HD44780 traffic for the PCF8574 expander: each logical byte becomes two 4-bit
/// transfers on P4-P7, each latched by a pulse on the enable line (P2). The backlight line (P3)
/// is mixed into every write.
pub struct ExpanderFramer<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    i2c: I2C,
    address: u8,
    delay: DELAY,
    backlight: bool,
}

impl<I2C, DELAY> ExpanderFramer<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    pub fn new(i2c: I2C, address: u8, delay: DELAY) -> Self {
        Self {
            i2c,
            address,
            delay,
            backlight: false,
        }
    }

    /// returns configured i2c address
    pub fn i2c_address(&self) -> u8 {
        self.address
    }

    /// returns the last backlight state set
    pub fn backlight(&self) -> bool {
        self.backlight
    }

    pub fn delay(&mut self) -> &mut DELAY {
        &mut self.delay
    }

    /// returns the i2c object. mostly used for testing
    pub fn i2c(&mut self) -> &mut I2C {
        &mut self.i2c
    }

    /// One complete bus transaction carrying `nibble_plus_mode` with the backlight bit added.
    pub fn send_nibble(&mut self, nibble_plus_mode: u8) -> Result<(), DisplayError<I2C>> {
        let mut bits = ExpanderBits(nibble_plus_mode);
        if self.backlight {
            bits.set_backlight(1);
        }
        self.i2c
            .write(self.address, &[bits.0])
            .map_err(DisplayError::I2cError)
    }

    /// Latch `nibble_plus_mode` into the display on the falling edge of the enable line.
    pub fn pulse_latch(&mut self, nibble_plus_mode: u8) -> Result<(), DisplayError<I2C>> {
        let mut bits = ExpanderBits(nibble_plus_mode);
        bits.set_enable(1);
        self.send_nibble(bits.0)?;
        // enable pulse must be >450ns
        self.delay.delay_us(1);
        bits.set_enable(0);
        self.send_nibble(bits.0)?;
        // commands need >37us to settle
        self.delay.delay_us(50);
        Ok(())
    }

    /// Present a nibble on the data lines and latch it.
    pub fn write_nibble(&mut self, nibble_plus_mode: u8) -> Result<(), DisplayError<I2C>> {
        self.send_nibble(nibble_plus_mode)?;
        self.pulse_latch(nibble_plus_mode)
    }

    /// Send a full byte as two latched nibbles, high nibble first.
    pub fn send_full_byte(&mut self, value: u8, mode: Mode) -> Result<(), DisplayError<I2C>> {
        let mut bits = ExpanderBits(0);
        bits.set_rs(mode as u8);

        bits.set_data(value >> 4);
        self.write_nibble(bits.0)?;

        bits.set_data(value & 0x0F);
        self.write_nibble(bits.0)
    }

    /// Change the backlight and push it out right away with an empty data write.
    pub fn set_backlight(&mut self, on: bool) -> Result<(), DisplayError<I2C>> {
        self.backlight = on;
        self.send_nibble(0)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::test_support::{byte_writes, RecordingDelay};
    use embedded_hal_mock::eh1::{
        delay::NoopDelay,
        i2c::{Mock as I2cMock, Transaction as I2cTransaction},
    };

    #[test]
    fn test_expander_bits_layout() {
        let mut bits = ExpanderBits(0);
        bits.set_rs(1);
        bits.set_enable(1);
        bits.set_data(0b1010);
        bits.set_backlight(1);
        assert_eq!(bits.0, 0b1010_1101);
        assert_eq!(bits.rw(), 0);
        assert_eq!(bits.clone().data(), 0b1010);
    }

    #[test]
    fn test_send_full_byte_high_nibble_first() {
        let expected_transactions = [
            // write byte 0xDE with RS = 1
            // high nibble
            I2cTransaction::write(0x27, std::vec![0b1101_0001]), // enable = 0, rs = 1
            I2cTransaction::write(0x27, std::vec![0b1101_0101]), // enable = 1, rs = 1
            I2cTransaction::write(0x27, std::vec![0b1101_0001]), // enable = 0, rs = 1
            // low nibble
            I2cTransaction::write(0x27, std::vec![0b1110_0001]), // enable = 0, rs = 1
            I2cTransaction::write(0x27, std::vec![0b1110_0101]), // enable = 1, rs = 1
            I2cTransaction::write(0x27, std::vec![0b1110_0001]), // enable = 0, rs = 1
        ];
        let mut framer = ExpanderFramer::new(I2cMock::new(&expected_transactions), 0x27, NoopDelay);

        assert!(framer.send_full_byte(0xDE, Mode::Data).is_ok());
        framer.i2c().done();
    }

    #[test]
    fn test_send_full_byte_carries_backlight() {
        let mut expected_transactions = std::vec![
            I2cTransaction::write(0x27, std::vec![0b0000_1000]), // backlight on
        ];
        // command 0xAD with backlight on
        expected_transactions.extend(byte_writes(0x27, 0xAD, 0x00, 0x08));
        let mut framer = ExpanderFramer::new(I2cMock::new(&expected_transactions), 0x27, NoopDelay);

        assert!(framer.set_backlight(true).is_ok());
        assert!(framer.backlight());
        assert!(framer.send_full_byte(0xAD, Mode::Command).is_ok());
        framer.i2c().done();
    }

    #[test]
    fn test_send_full_byte_every_value() {
        for mode in [Mode::Command, Mode::Data] {
            for backlight in [false, true] {
                let backlight_bit = if backlight { 0x08 } else { 0x00 };
                let mut expected_transactions = std::vec::Vec::new();
                if backlight {
                    expected_transactions.push(I2cTransaction::write(0x27, std::vec![0x08]));
                }
                for value in 0..=u8::MAX {
                    expected_transactions.extend(byte_writes(
                        0x27,
                        value,
                        mode as u8,
                        backlight_bit,
                    ));
                }
                let mut framer =
                    ExpanderFramer::new(I2cMock::new(&expected_transactions), 0x27, NoopDelay);

                if backlight {
                    assert!(framer.set_backlight(true).is_ok());
                }
                for value in 0..=u8::MAX {
                    assert!(framer.send_full_byte(value, mode).is_ok());
                }
                framer.i2c().done();
            }
        }
    }

    #[test]
    fn test_set_backlight_always_writes() {
        let expected_transactions = [
            I2cTransaction::write(0x27, std::vec![0b0000_1000]), // backlight on
            I2cTransaction::write(0x27, std::vec![0b0000_0000]), // backlight off
        ];
        let mut framer = ExpanderFramer::new(I2cMock::new(&expected_transactions), 0x27, NoopDelay);

        assert!(framer.set_backlight(true).is_ok());
        assert!(framer.set_backlight(false).is_ok());
        assert!(!framer.backlight());
        framer.i2c().done();
    }

    #[test]
    fn test_pulse_latch_timing() {
        let expected_transactions = [
            I2cTransaction::write(0x3F, std::vec![0b0011_0100]),
            I2cTransaction::write(0x3F, std::vec![0b0011_0000]),
        ];
        let mut framer = ExpanderFramer::new(
            I2cMock::new(&expected_transactions),
            0x3F,
            RecordingDelay::default(),
        );

        assert!(framer.pulse_latch(0x30).is_ok());
        assert_eq!(framer.delay().waits, std::vec![1_000, 50_000]);
        assert_eq!(framer.i2c_address(), 0x3F);
        framer.i2c().done();
    }
}

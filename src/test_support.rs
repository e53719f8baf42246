//! Helpers shared by the unit tests.
extern crate std;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal_mock::eh1::i2c::Transaction as I2cTransaction;

/// Delay that records every requested wait in nanoseconds instead of waiting.
#[derive(Default)]
pub struct RecordingDelay {
    pub waits: Vec<u32>,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.waits.push(ns);
    }
}

/// The three expander writes that latch one nibble: plain, enable high, enable low.
pub fn nibble_writes(address: u8, nibble_plus_mode: u8) -> [I2cTransaction; 3] {
    [
        I2cTransaction::write(address, std::vec![nibble_plus_mode]),
        I2cTransaction::write(address, std::vec![nibble_plus_mode | 0b0000_0100]),
        I2cTransaction::write(address, std::vec![nibble_plus_mode & !0b0000_0100]),
    ]
}

/// The six expander writes for a full byte. `rs` is the register select bit and `backlight`
/// the backlight bit, both already in expander bit positions.
pub fn byte_writes(address: u8, value: u8, rs: u8, backlight: u8) -> Vec<I2cTransaction> {
    let mut writes = Vec::new();
    writes.extend(nibble_writes(address, (value & 0xF0) | rs | backlight));
    writes.extend(nibble_writes(address, ((value << 4) & 0xF0) | rs | backlight));
    writes
}

/// Expander writes for a string of data bytes
pub fn text_writes(address: u8, text: &str, backlight: u8) -> Vec<I2cTransaction> {
    text.bytes()
        .flat_map(|b| byte_writes(address, b, 0x01, backlight))
        .collect()
}

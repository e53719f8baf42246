//! Firmware building blocks for a small climate controller: a temperature/humidity sensor drives
//! a PWM fan, and an [HD44780](https://en.wikipedia.org/wiki/Hitachi_HD44780_LCD_controller)
//! character display with a PCF8574 "I2C backpack" rotates between the sensor readings, the date
//! and a software clock. Everything is `no_std` and written against `embedded-hal` traits.
//!
//! The crate is layered bottom up:
//! - [`bus`] - a blocking, master-only driver for an AVR style two-wire peripheral. It
//!   implements [`embedded_hal::i2c::I2c`], so any other HAL I2C implementation can take its place.
//! - [`driver`] - the PCF8574 framing (two latched nibbles per byte, backlight bit on every write)
//!   and the HD44780 command sequencer, wrapped up in [`CharacterDisplay`].
//! - [`clock`], [`fan`] and [`sensor`] - the software calendar advanced from a timer interrupt,
//!   the fan speed policy and the sensor interface.
//! - [`panel`] - the main loop tying them together.
//!
//! Key features include:
//! - Convenient high-level API for controlling the display
//! - Support for custom characters
//! - Backlight control
//! - `core::fmt::Write` implementation for easy use with the `write!` macro
//! - Optional support for the `defmt` and `ufmt` logging frameworks
//!
//! ## Usage
//! ```rust
//! use climate_panel::{bus::{BusConfig, BusDriver}, CharacterDisplay, LcdDisplayType};
//!
//! // board setup
//! let twi = ...; // TwiRegisters implementation for the TWI register block
//! let delay = ...; // DelayNs implementation
//!
//! let bus = BusDriver::new(twi, BusConfig::STANDARD);
//! let mut lcd = CharacterDisplay::new(bus, LcdDisplayType::Lcd16x2, delay);
//! lcd.init()?;
//! lcd.backlight(true)?.clear()?.home()?.print("Hello, world!")?;
//!
//! // can also use the `core::fmt::write!` macro
//! use core::fmt::Write;
//! write!(lcd, "{:02}:{:02}", 13, 5)?;
//! ```
//! The optional `ufmt` feature enables the `uwriteln!` and `uwrite!` macros for the display.
//!
//! ## Failure model
//! The bus driver spins on the peripheral's completion flag with no timeout and never looks at
//! acknowledge bits. A stuck bus therefore hangs the caller; nothing is retried. With
//! [`bus::BusDriver`] the I2C error type is uninhabited, so display calls only fail when another
//! I2C implementation reports an error.
#![no_std]
#![allow(dead_code, non_camel_case_types, non_upper_case_globals)]
use core::fmt::Display;

use embedded_hal::{delay::DelayNs, i2c};

pub mod bus;
pub mod clock;
pub mod driver;
pub mod fan;
pub mod panel;
pub mod sensor;

#[cfg(test)]
mod test_support;

use driver::{expander::ExpanderFramer, hd44780::HD44780};

#[derive(Debug, PartialEq, Copy, Clone)]
/// Errors that can occur when using the display
pub enum DisplayError<I2C>
where
    I2C: i2c::I2c,
{
    /// I2C error returned from the underlying I2C implementation
    I2cError(I2C::Error),
    /// Formatting error
    FormattingError(core::fmt::Error),
}

impl<I2C> From<core::fmt::Error> for DisplayError<I2C>
where
    I2C: i2c::I2c,
{
    fn from(err: core::fmt::Error) -> Self {
        DisplayError::FormattingError(err)
    }
}

impl<I2C> From<&DisplayError<I2C>> for &'static str
where
    I2C: i2c::I2c,
{
    fn from(err: &DisplayError<I2C>) -> Self {
        match err {
            DisplayError::I2cError(_) => "I2C error",
            DisplayError::FormattingError(_) => "Formatting error",
        }
    }
}

#[cfg(feature = "defmt")]
impl<I2C> defmt::Format for DisplayError<I2C>
where
    I2C: i2c::I2c,
{
    fn format(&self, fmt: defmt::Formatter) {
        let msg: &'static str = From::from(self);
        defmt::write!(fmt, "{}", msg);
    }
}

#[cfg(feature = "ufmt")]
impl<I2C> ufmt::uDisplay for DisplayError<I2C>
where
    I2C: i2c::I2c,
{
    fn fmt<W>(&self, w: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        let msg: &'static str = From::from(self);
        ufmt::uwrite!(w, "{}", msg)
    }
}

impl<I2C> Display for DisplayError<I2C>
where
    I2C: i2c::I2c,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        write!(f, "{}", msg)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
/// The type of LCD display. This is used to determine the number of rows and columns.
pub enum LcdDisplayType {
    /// 20x4 display
    Lcd20x4,
    /// 20x2 display
    Lcd20x2,
    /// 16x1 display
    Lcd16x1,
    /// 16x2 display
    Lcd16x2,
    /// 16x4 display
    Lcd16x4,
    /// 8x2 display
    Lcd8x2,
    /// 40x2 display
    Lcd40x2,
}

impl From<&LcdDisplayType> for &'static str {
    fn from(display_type: &LcdDisplayType) -> Self {
        match display_type {
            LcdDisplayType::Lcd20x4 => "20x4",
            LcdDisplayType::Lcd20x2 => "20x2",
            LcdDisplayType::Lcd16x1 => "16x1",
            LcdDisplayType::Lcd16x2 => "16x2",
            LcdDisplayType::Lcd16x4 => "16x4",
            LcdDisplayType::Lcd8x2 => "8x2",
            LcdDisplayType::Lcd40x2 => "40x2",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for LcdDisplayType {
    fn format(&self, fmt: defmt::Formatter) {
        let msg: &'static str = From::from(self);
        defmt::write!(fmt, "{}", msg);
    }
}

#[cfg(feature = "ufmt")]
impl ufmt::uDisplay for LcdDisplayType {
    fn fmt<W>(&self, w: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        let msg: &'static str = From::from(self);
        ufmt::uwrite!(w, "{}", msg)
    }
}

impl Display for LcdDisplayType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        write!(f, "{}", msg)
    }
}

impl LcdDisplayType {
    /// Get the number of rows for the display type
    pub const fn rows(&self) -> u8 {
        match self {
            LcdDisplayType::Lcd20x4 => 4,
            LcdDisplayType::Lcd20x2 => 2,
            LcdDisplayType::Lcd16x1 => 1,
            LcdDisplayType::Lcd16x2 => 2,
            LcdDisplayType::Lcd16x4 => 4,
            LcdDisplayType::Lcd8x2 => 2,
            LcdDisplayType::Lcd40x2 => 2,
        }
    }

    /// Get the number of columns for the display type
    pub const fn cols(&self) -> u8 {
        match self {
            LcdDisplayType::Lcd20x4 => 20,
            LcdDisplayType::Lcd20x2 => 20,
            LcdDisplayType::Lcd16x1 => 16,
            LcdDisplayType::Lcd16x2 => 16,
            LcdDisplayType::Lcd16x4 => 16,
            LcdDisplayType::Lcd8x2 => 8,
            LcdDisplayType::Lcd40x2 => 40,
        }
    }
}

/// Character cell size. The 5x10 font is only available on one line displays.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FontSize {
    #[default]
    Dots5x8,
    Dots5x10,
}

/// HD44780 character display attached through a PCF8574 I2C expander.
pub struct CharacterDisplay<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    device: ExpanderFramer<I2C, DELAY>,
    actions: HD44780,
}

impl<I2C, DELAY> CharacterDisplay<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    /// The PCF8574 address with all address pins pulled high
    pub const DEFAULT_I2C_ADDRESS: u8 = 0x27;

    /// Create a new character display object with the default I2C address for the adapter.
    pub fn new(i2c: I2C, lcd_type: LcdDisplayType, delay: DELAY) -> Self {
        Self::new_with_address(i2c, Self::DEFAULT_I2C_ADDRESS, lcd_type, delay)
    }

    /// Create a new character display object with a specific I2C address for the adapter.
    pub fn new_with_address(i2c: I2C, address: u8, lcd_type: LcdDisplayType, delay: DELAY) -> Self {
        Self::new_with_font(i2c, address, lcd_type, FontSize::default(), delay)
    }

    /// Create a new character display object with a specific I2C address and font.
    pub fn new_with_font(
        i2c: I2C,
        address: u8,
        lcd_type: LcdDisplayType,
        font: FontSize,
        delay: DELAY,
    ) -> Self {
        Self {
            device: ExpanderFramer::new(i2c, address, delay),
            actions: HD44780::new(lcd_type, font),
        }
    }

    /// Initialize the display. This must be called before using the display.
    pub fn init(&mut self) -> Result<(), DisplayError<I2C>> {
        self.actions.init(&mut self.device)
    }

    /// returns a reference to the I2C peripheral. mostly needed for testing
    fn i2c(&mut self) -> &mut I2C {
        self.device.i2c()
    }

    /// returns the delay provider shared with the display timing
    pub fn delay(&mut self) -> &mut DELAY {
        self.device.delay()
    }

    /// returns the `LcdDisplayType` used to create the display
    pub fn display_type(&self) -> LcdDisplayType {
        self.actions.state().lcd_type
    }

    /// returns the last function set flags sent to the display
    pub fn display_function(&self) -> u8 {
        self.actions.state().display_function
    }

    /// returns the last display control flags sent to the display
    pub fn display_control(&self) -> u8 {
        self.actions.state().display_control
    }

    /// returns the last entry mode flags sent to the display
    pub fn display_mode(&self) -> u8 {
        self.actions.state().display_mode
    }

    /// returns whether the backlight is on
    pub fn backlight_on(&self) -> bool {
        self.device.backlight()
    }

    //--------------------------------------------------------------------------------------------------
    // high level commands, for the user!
    //--------------------------------------------------------------------------------------------------

    /// Clear the display
    pub fn clear(&mut self) -> Result<&mut Self, DisplayError<I2C>> {
        self.actions.clear(&mut self.device)?;
        Ok(self)
    }

    /// Set the cursor to the home position.
    pub fn home(&mut self) -> Result<&mut Self, DisplayError<I2C>> {
        self.actions.home(&mut self.device)?;
        Ok(self)
    }

    /// Set the cursor position at specified column and row. Columns and rows are zero-indexed.
    /// A row past the bottom of the display selects the last row.
    pub fn set_cursor(&mut self, col: u8, row: u8) -> Result<&mut Self, DisplayError<I2C>> {
        self.actions.set_cursor(&mut self.device, col, row)?;
        Ok(self)
    }

    /// Set the cursor visibility.
    pub fn show_cursor(&mut self, show_cursor: bool) -> Result<&mut Self, DisplayError<I2C>> {
        self.actions.show_cursor(&mut self.device, show_cursor)?;
        Ok(self)
    }

    /// Set the cursor blinking.
    pub fn blink_cursor(&mut self, blink_cursor: bool) -> Result<&mut Self, DisplayError<I2C>> {
        self.actions.blink_cursor(&mut self.device, blink_cursor)?;
        Ok(self)
    }

    /// Set the display visibility.
    pub fn show_display(&mut self, show_display: bool) -> Result<&mut Self, DisplayError<I2C>> {
        self.actions.show_display(&mut self.device, show_display)?;
        Ok(self)
    }

    /// Scroll the display to the left.
    pub fn scroll_display_left(&mut self) -> Result<&mut Self, DisplayError<I2C>> {
        self.actions.scroll_display_left(&mut self.device)?;
        Ok(self)
    }

    /// Scroll the display to the right.
    pub fn scroll_display_right(&mut self) -> Result<&mut Self, DisplayError<I2C>> {
        self.actions.scroll_display_right(&mut self.device)?;
        Ok(self)
    }

    /// Set the text flow direction to left to right.
    pub fn left_to_right(&mut self) -> Result<&mut Self, DisplayError<I2C>> {
        self.actions.left_to_right(&mut self.device)?;
        Ok(self)
    }

    /// Set the text flow direction to right to left.
    pub fn right_to_left(&mut self) -> Result<&mut Self, DisplayError<I2C>> {
        self.actions.right_to_left(&mut self.device)?;
        Ok(self)
    }

    /// Set the auto scroll mode.
    pub fn autoscroll(&mut self, autoscroll: bool) -> Result<&mut Self, DisplayError<I2C>> {
        self.actions.autoscroll(&mut self.device, autoscroll)?;
        Ok(self)
    }

    /// Create a new custom character in one of the eight CGRAM slots.
    pub fn create_char(
        &mut self,
        location: u8,
        charmap: [u8; 8],
    ) -> Result<&mut Self, DisplayError<I2C>> {
        self.actions.create_char(&mut self.device, location, charmap)?;
        Ok(self)
    }

    /// Prints a string to the LCD at the current cursor position.
    pub fn print(&mut self, text: &str) -> Result<&mut Self, DisplayError<I2C>> {
        self.actions.print(&mut self.device, text)?;
        Ok(self)
    }

    /// Turn the backlight on or off
    pub fn backlight(&mut self, on: bool) -> Result<&mut Self, DisplayError<I2C>> {
        self.actions.backlight(&mut self.device, on)?;
        Ok(self)
    }
}

/// Implement the `core::fmt::Write` trait for the display, allowing it to be used with the `write!` macro.
impl<I2C, DELAY> core::fmt::Write for CharacterDisplay<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    fn write_str(&mut self, s: &str) -> Result<(), core::fmt::Error> {
        if let Err(_e) = self.print(s) {
            return Err(core::fmt::Error);
        }
        Ok(())
    }
}

#[cfg(feature = "ufmt")]
/// Implement the `ufmt::uWrite` trait for the display, allowing it to be used with the `uwriteln!` and `uwrite!` macros.
impl<I2C, DELAY> ufmt::uWrite for CharacterDisplay<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    fn write_str(&mut self, s: &str) -> Result<(), DisplayError<I2C>> {
        self.print(s)?;
        Ok(())
    }

    type Error = DisplayError<I2C>;
}

//! HD44780 display driver layered over a PCF8574 I2C expander.
//!
//! [`expander::ExpanderFramer`] owns the bus and knows the expander wiring: where the data,
//! register select, enable and backlight lines sit, and how long the enable pulse must be held.
//! [`hd44780::HD44780`] sits on top of it and turns display operations into command and data
//! bytes, caching the flag bytes it has written.
pub mod expander;
pub mod hd44780;

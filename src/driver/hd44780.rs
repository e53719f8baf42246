// HD44780 command sequencing
// The HD44780 struct tracks the function set, display control and entry mode flag bytes last
// written to the controller and turns each high level operation into instruction or data
// bytes sent through the ExpanderFramer.
//

use embedded_hal::{delay::DelayNs, i2c};

use crate::{
    driver::expander::{ExpanderFramer, Mode},
    DisplayError, FontSize, LcdDisplayType,
};

// commands
const LCD_CMD_CLEARDISPLAY: u8 = 0x01; //  Clear display, set cursor position to zero
const LCD_CMD_RETURNHOME: u8 = 0x02; //  Set cursor position to zero
const LCD_CMD_ENTRYMODESET: u8 = 0x04; //  Sets the entry mode
const LCD_CMD_DISPLAYCONTROL: u8 = 0x08; //  Controls the display; does stuff like turning it off and on
const LCD_CMD_CURSORSHIFT: u8 = 0x10; //  Lets you move the cursor
const LCD_CMD_FUNCTIONSET: u8 = 0x20; //  Used to send the function to set to the display
const LCD_CMD_SETCGRAMADDR: u8 = 0x40; //  Used to set the CGRAM (character generator RAM) with characters
const LCD_CMD_SETDDRAMADDR: u8 = 0x80; //  Used to set the DDRAM (Display Data RAM)

// flags for display entry mode
const LCD_FLAG_ENTRYLEFT: u8 = 0x02; //  Used to set text to flow from left to right
const LCD_FLAG_ENTRYSHIFTINCREMENT: u8 = 0x01; //  Used to 'right justify' text from the cursor
const LCD_FLAG_ENTRYSHIFTDECREMENT: u8 = 0x00; //  Used to 'left justify' text from the cursor

// flags for display on/off control
const LCD_FLAG_DISPLAYON: u8 = 0x04; //  Turns the display on
const LCD_FLAG_CURSORON: u8 = 0x02; //  Turns the cursor on
const LCD_FLAG_CURSOROFF: u8 = 0x00; //  Turns the cursor off
const LCD_FLAG_BLINKON: u8 = 0x01; //  Turns on the blinking cursor
const LCD_FLAG_BLINKOFF: u8 = 0x00; //  Turns off the blinking cursor

// flags for display/cursor shift
const LCD_FLAG_DISPLAYMOVE: u8 = 0x08; //  Flag for moving the display
const LCD_FLAG_MOVERIGHT: u8 = 0x04; //  Flag for moving right
const LCD_FLAG_MOVELEFT: u8 = 0x00; //  Flag for moving left

// flags for function set
const LCD_FLAG_4BITMODE: u8 = 0x00; //  LCD 4 bit mode
const LCD_FLAG_2LINE: u8 = 0x08; //  LCD 2 line mode
const LCD_FLAG_1LINE: u8 = 0x00; //  LCD 1 line mode
const LCD_FLAG_5x10_DOTS: u8 = 0x04; //  10 pixel high font mode
const LCD_FLAG_5x8_DOTS: u8 = 0x00; //  8 pixel high font mode

/// DDRAM address of the first column of each row. Fixed by the controller's RAM layout.
const ROW_OFFSETS: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

/// Flag bytes last written to the controller, plus the geometry they were derived from.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayState {
    pub lcd_type: LcdDisplayType,
    pub font: FontSize,
    pub display_function: u8,
    pub display_control: u8,
    pub display_mode: u8,
}

pub struct HD44780 {
    state: DisplayState,
}

impl HD44780 {
    pub fn new(lcd_type: LcdDisplayType, font: FontSize) -> Self {
        Self {
            state: DisplayState {
                lcd_type,
                font,
                display_function: 0,
                display_control: 0,
                display_mode: 0,
            },
        }
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    /// Run the power-on handshake that forces the controller into 4-bit mode, then set up
    /// lines/font, turn the display on and clear it. See figure 24 of the HD44780 datasheet.
    pub fn init<I2C, DELAY>(
        &mut self,
        device: &mut ExpanderFramer<I2C, DELAY>,
    ) -> Result<(), DisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        let mut display_function = LCD_FLAG_4BITMODE | LCD_FLAG_1LINE | LCD_FLAG_5x8_DOTS;
        if self.state.lcd_type.rows() > 1 {
            display_function |= LCD_FLAG_2LINE;
        }
        // only one line displays can use the 10 pixel high font
        if self.state.font == FontSize::Dots5x10 && self.state.lcd_type.rows() == 1 {
            display_function |= LCD_FLAG_5x10_DOTS;
        }

        // need at least 40ms after power rises above 2.7V before sending commands
        device.delay().delay_ms(50);

        // pull RS and R/W low, backlight off
        device.set_backlight(false)?;
        device.delay().delay_ms(1000);

        // we start in 8bit mode, try to set 4 bit mode
        device.write_nibble(0x03 << 4)?;
        device.delay().delay_us(4500);
        // second try
        device.write_nibble(0x03 << 4)?;
        device.delay().delay_us(4500);
        // third go
        device.write_nibble(0x03 << 4)?;
        device.delay().delay_us(150);
        // finally, set to 4-bit interface
        device.write_nibble(0x02 << 4)?;

        self.send_command(device, LCD_CMD_FUNCTIONSET | display_function)?;
        self.state.display_function = display_function;

        self.send_control(
            device,
            LCD_FLAG_DISPLAYON | LCD_FLAG_CURSOROFF | LCD_FLAG_BLINKOFF,
        )?;

        self.clear(device)?;

        // default text direction for roman languages
        self.send_mode(device, LCD_FLAG_ENTRYLEFT | LCD_FLAG_ENTRYSHIFTDECREMENT)?;

        self.home(device)?;

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "display ready: {} function={=u8:#x} control={=u8:#x} mode={=u8:#x}",
            self.state.lcd_type,
            self.state.display_function,
            self.state.display_control,
            self.state.display_mode
        );
        Ok(())
    }

    fn send_command<I2C, DELAY>(
        &mut self,
        device: &mut ExpanderFramer<I2C, DELAY>,
        command: u8,
    ) -> Result<(), DisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        device.send_full_byte(command, Mode::Command)
    }

    /// Send a display control byte and cache it once the controller has it.
    fn send_control<I2C, DELAY>(
        &mut self,
        device: &mut ExpanderFramer<I2C, DELAY>,
        display_control: u8,
    ) -> Result<(), DisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        self.send_command(device, LCD_CMD_DISPLAYCONTROL | display_control)?;
        self.state.display_control = display_control;
        Ok(())
    }

    /// Send an entry mode byte and cache it once the controller has it.
    fn send_mode<I2C, DELAY>(
        &mut self,
        device: &mut ExpanderFramer<I2C, DELAY>,
        display_mode: u8,
    ) -> Result<(), DisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        self.send_command(device, LCD_CMD_ENTRYMODESET | display_mode)?;
        self.state.display_mode = display_mode;
        Ok(())
    }

    pub fn clear<I2C, DELAY>(
        &mut self,
        device: &mut ExpanderFramer<I2C, DELAY>,
    ) -> Result<(), DisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        self.send_command(device, LCD_CMD_CLEARDISPLAY)?;
        // this command takes a long time
        device.delay().delay_us(2000);
        Ok(())
    }

    /// Set the cursor to the home position.
    pub fn home<I2C, DELAY>(
        &mut self,
        device: &mut ExpanderFramer<I2C, DELAY>,
    ) -> Result<(), DisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        self.send_command(device, LCD_CMD_RETURNHOME)?;
        device.delay().delay_us(2000);
        Ok(())
    }

    /// Set the cursor position at specified column and row. Rows past the last one are moved to
    /// the last row.
    pub fn set_cursor<I2C, DELAY>(
        &mut self,
        device: &mut ExpanderFramer<I2C, DELAY>,
        col: u8,
        row: u8,
    ) -> Result<(), DisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        let row = row.min(self.last_row());
        self.send_command(
            device,
            LCD_CMD_SETDDRAMADDR | col.wrapping_add(ROW_OFFSETS[row as usize]),
        )
    }

    fn last_row(&self) -> u8 {
        self.state
            .lcd_type
            .rows()
            .saturating_sub(1)
            .min(ROW_OFFSETS.len() as u8 - 1)
    }

    /// Set the cursor visibility.
    pub fn show_cursor<I2C, DELAY>(
        &mut self,
        device: &mut ExpanderFramer<I2C, DELAY>,
        show_cursor: bool,
    ) -> Result<(), DisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        let display_control = if show_cursor {
            self.state.display_control | LCD_FLAG_CURSORON
        } else {
            self.state.display_control & !LCD_FLAG_CURSORON
        };
        self.send_control(device, display_control)
    }

    /// Set the cursor blinking.
    pub fn blink_cursor<I2C, DELAY>(
        &mut self,
        device: &mut ExpanderFramer<I2C, DELAY>,
        blink_cursor: bool,
    ) -> Result<(), DisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        let display_control = if blink_cursor {
            self.state.display_control | LCD_FLAG_BLINKON
        } else {
            self.state.display_control & !LCD_FLAG_BLINKON
        };
        self.send_control(device, display_control)
    }

    pub fn show_display<I2C, DELAY>(
        &mut self,
        device: &mut ExpanderFramer<I2C, DELAY>,
        show_display: bool,
    ) -> Result<(), DisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        let display_control = if show_display {
            self.state.display_control | LCD_FLAG_DISPLAYON
        } else {
            self.state.display_control & !LCD_FLAG_DISPLAYON
        };
        self.send_control(device, display_control)
    }

    pub fn scroll_display_left<I2C, DELAY>(
        &mut self,
        device: &mut ExpanderFramer<I2C, DELAY>,
    ) -> Result<(), DisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        self.send_command(
            device,
            LCD_CMD_CURSORSHIFT | LCD_FLAG_DISPLAYMOVE | LCD_FLAG_MOVELEFT,
        )
    }

    pub fn scroll_display_right<I2C, DELAY>(
        &mut self,
        device: &mut ExpanderFramer<I2C, DELAY>,
    ) -> Result<(), DisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        self.send_command(
            device,
            LCD_CMD_CURSORSHIFT | LCD_FLAG_DISPLAYMOVE | LCD_FLAG_MOVERIGHT,
        )
    }

    pub fn left_to_right<I2C, DELAY>(
        &mut self,
        device: &mut ExpanderFramer<I2C, DELAY>,
    ) -> Result<(), DisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        self.send_mode(device, self.state.display_mode | LCD_FLAG_ENTRYLEFT)
    }

    pub fn right_to_left<I2C, DELAY>(
        &mut self,
        device: &mut ExpanderFramer<I2C, DELAY>,
    ) -> Result<(), DisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        self.send_mode(device, self.state.display_mode & !LCD_FLAG_ENTRYLEFT)
    }

    pub fn autoscroll<I2C, DELAY>(
        &mut self,
        device: &mut ExpanderFramer<I2C, DELAY>,
        autoscroll: bool,
    ) -> Result<(), DisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        let display_mode = if autoscroll {
            self.state.display_mode | LCD_FLAG_ENTRYSHIFTINCREMENT
        } else {
            self.state.display_mode & !LCD_FLAG_ENTRYSHIFTINCREMENT
        };
        self.send_mode(device, display_mode)
    }

    /// Load one of the eight CGRAM glyphs. `location` is masked to 0-7.
    pub fn create_char<I2C, DELAY>(
        &mut self,
        device: &mut ExpanderFramer<I2C, DELAY>,
        location: u8,
        charmap: [u8; 8],
    ) -> Result<(), DisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        self.send_command(device, LCD_CMD_SETCGRAMADDR | ((location & 0x7) << 3))?;
        for &charmap_byte in charmap.iter() {
            device.send_full_byte(charmap_byte, Mode::Data)?;
        }
        Ok(())
    }

    /// Send the UTF-8 bytes of `text` as data. Only ASCII maps onto the controller's character
    /// ROM as written.
    pub fn print<I2C, DELAY>(
        &mut self,
        device: &mut ExpanderFramer<I2C, DELAY>,
        text: &str,
    ) -> Result<(), DisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        for byte in text.bytes() {
            device.send_full_byte(byte, Mode::Data)?;
            device.delay().delay_ms(1);
        }
        Ok(())
    }

    pub fn backlight<I2C, DELAY>(
        &mut self,
        device: &mut ExpanderFramer<I2C, DELAY>,
        on: bool,
    ) -> Result<(), DisplayError<I2C>>
    where
        I2C: i2c::I2c,
        DELAY: DelayNs,
    {
        device.set_backlight(on)
    }
}

//! Software calendar advanced once a second from a timer interrupt.
//!
//! The interrupt handler and the main loop share one [`ClockState`] through [`SharedClock`],
//! which keeps it in a `critical_section::Mutex`. The year is 16 bits wide, so every read and
//! every update happens with interrupts masked.
//!
//! Months are a fixed 30 days long.

use core::cell::RefCell;

use critical_section::Mutex;

/// Value read back from erased non-volatile byte cells
const ERASED_BYTE: u8 = 0xFF;
/// Value read back from an erased non-volatile word
const ERASED_WORD: u16 = 0xFFFF;

/// Date written to an erased store on first boot
pub const FACTORY_DATE: Date = Date {
    day: 12,
    month: 8,
    year: 2024,
};

/// Date substituted field by field when a stored value still reads as erased
pub const FALLBACK_DATE: Date = Date {
    day: 1,
    month: 1,
    year: 2024,
};

const DAYS_PER_MONTH: u8 = 30;
const MONTHS_PER_YEAR: u8 = 12;
/// Seconds each screen stays up before the panel moves to the next one
const SECONDS_PER_SCREEN: u8 = 2;

/// Non-volatile storage for the calendar date, one cell per field.
pub trait DateStore {
    fn read_day(&mut self) -> u8;
    fn read_month(&mut self) -> u8;
    fn read_year(&mut self) -> u16;

    /// Write the day cell. Implementations may skip the write if the value is unchanged.
    fn update_day(&mut self, day: u8);
    fn update_month(&mut self, month: u8);
    fn update_year(&mut self, year: u16);
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Date {
    pub day: u8,
    pub month: u8,
    pub year: u16,
}

/// The screen the panel is showing.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Screen {
    /// Temperature and humidity
    Readings,
    Date,
    Time,
}

impl Screen {
    pub const fn next(self) -> Self {
        match self {
            Screen::Readings => Screen::Date,
            Screen::Date => Screen::Time,
            Screen::Time => Screen::Readings,
        }
    }
}

/// Wall clock, calendar and screen rotation.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockState {
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    pub date: Date,
    pub screen: Screen,
    /// Ticks since the screen last changed
    screen_ticks: u8,
}

impl ClockState {
    /// 13:00:00 on the fallback date, showing the readings screen.
    pub const fn new() -> Self {
        Self {
            seconds: 0,
            minutes: 0,
            hours: 13,
            date: FALLBACK_DATE,
            screen: Screen::Readings,
            screen_ticks: 0,
        }
    }

    /// Advance by one second. Returns `true` when the day changed and the date should be
    /// persisted.
    pub fn tick(&mut self) -> bool {
        self.screen_ticks = self.screen_ticks.wrapping_add(1);
        if self.screen_ticks >= SECONDS_PER_SCREEN {
            self.screen_ticks = 0;
            self.screen = self.screen.next();
        }

        self.seconds = self.seconds.wrapping_add(1);
        if self.seconds < 60 {
            return false;
        }
        self.seconds = 0;
        self.minutes = self.minutes.wrapping_add(1);
        if self.minutes < 60 {
            return false;
        }
        self.minutes = 0;
        self.hours = self.hours.wrapping_add(1);
        if self.hours < 24 {
            return false;
        }
        self.hours = 0;
        self.advance_day();
        true
    }

    fn advance_day(&mut self) {
        let date = &mut self.date;
        date.day = date.day.wrapping_add(1);
        if date.day > DAYS_PER_MONTH {
            date.day = 1;
            date.month = date.month.wrapping_add(1);
            if date.month > MONTHS_PER_YEAR {
                date.month = 1;
                date.year = date.year.wrapping_add(1);
            }
        }
    }
}

impl Default for ClockState {
    fn default() -> Self {
        Self::new()
    }
}

/// Write the factory date into any cell that still reads as erased.
pub fn seed_date_store<S: DateStore>(store: &mut S) {
    if store.read_day() == ERASED_BYTE {
        store.update_day(FACTORY_DATE.day);
    }
    if store.read_month() == ERASED_BYTE {
        store.update_month(FACTORY_DATE.month);
    }
    if store.read_year() == ERASED_WORD {
        store.update_year(FACTORY_DATE.year);
    }
}

/// Read the stored date, replacing erased fields with the fallback date.
pub fn load_date<S: DateStore>(store: &mut S) -> Date {
    let mut date = FALLBACK_DATE;
    let day = store.read_day();
    if day != ERASED_BYTE {
        date.day = day;
    }
    let month = store.read_month();
    if month != ERASED_BYTE {
        date.month = month;
    }
    let year = store.read_year();
    if year != ERASED_WORD {
        date.year = year;
    }
    date
}

fn store_date<S: DateStore>(store: &mut S, date: Date) {
    store.update_day(date.day);
    store.update_month(date.month);
    store.update_year(date.year);
}

/// [`ClockState`] shared between the timer interrupt and the main loop.
///
/// ```ignore
/// static CLOCK: SharedClock = SharedClock::new();
///
/// // timer compare interrupt, once per second
/// fn on_timer() {
///     CLOCK.tick(&mut eeprom);
/// }
/// ```
pub struct SharedClock {
    state: Mutex<RefCell<ClockState>>,
}

impl SharedClock {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(ClockState::new())),
        }
    }

    /// Seed erased cells, then load the date into the clock. Call once at boot, before the
    /// timer interrupt is enabled.
    pub fn restore_date<S: DateStore>(&self, store: &mut S) -> Date {
        seed_date_store(store);
        let date = load_date(store);
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).date = date);
        date
    }

    /// Advance one second and persist the date when the day rolls over. Intended to be called
    /// from the timer interrupt.
    pub fn tick<S: DateStore>(&self, store: &mut S) {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if state.tick() {
                store_date(store, state.date);
                #[cfg(feature = "defmt")]
                defmt::debug!("date saved: {}", state.date);
            }
        });
    }

    /// Consistent copy of the whole clock.
    pub fn snapshot(&self) -> ClockState {
        critical_section::with(|cs| *self.state.borrow_ref(cs))
    }

    /// Replace the time of day. Out of range fields are clamped to 23:59:59.
    pub fn set_time(&self, hours: u8, minutes: u8, seconds: u8) {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.hours = hours.min(23);
            state.minutes = minutes.min(59);
            state.seconds = seconds.min(59);
        });
    }
}

impl Default for SharedClock {
    fn default() -> Self {
        Self::new()
    }
}

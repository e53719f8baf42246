//! Fan motor interface and the speed policy driven by the sensor readings.

/// Rotation direction of the fan motor.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Forward,
    Reverse,
}

/// PWM driven motor behind an H-bridge.
pub trait Motor {
    /// Set the PWM duty cycle, 0 to 255.
    fn set_speed(&mut self, speed: u8);
    fn set_direction(&mut self, direction: Direction);
    /// Release both bridge inputs and drop the duty cycle to zero.
    fn stop(&mut self);
}

/// Maps a temperature and humidity reading to a fan duty cycle.
///
/// Each degree above `temperature_threshold` adds 5 to `base_speed` and each degree at or below
/// it takes 6 away. Humidity adds 2 per point above `humidity_threshold` and takes 3 away per
/// point at or below. The result never drops under `base_speed`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FanPolicy {
    pub base_speed: u8,
    pub temperature_threshold: u8,
    pub humidity_threshold: u8,
}

impl FanPolicy {
    pub const fn new(base_speed: u8, temperature_threshold: u8, humidity_threshold: u8) -> Self {
        Self {
            base_speed,
            temperature_threshold,
            humidity_threshold,
        }
    }

    pub fn speed_for(&self, temperature: u8, humidity: u8) -> u8 {
        let temperature_diff = i16::from(temperature) - i16::from(self.temperature_threshold);
        let humidity_diff = i16::from(humidity) - i16::from(self.humidity_threshold);

        let mut speed = i16::from(self.base_speed);
        speed += if temperature_diff > 0 {
            temperature_diff * 5
        } else {
            temperature_diff * 6
        };
        speed += if humidity_diff > 0 {
            humidity_diff * 2
        } else {
            humidity_diff * 3
        };

        // base_speed <= 255, so the clamp bounds are ordered and the result fits in a u8
        speed.clamp(i16::from(self.base_speed), i16::from(u8::MAX)) as u8
    }
}

impl Default for FanPolicy {
    fn default() -> Self {
        Self::new(135, 25, 35)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_above_thresholds() {
        let policy = FanPolicy::default();
        // 135 + 5 * 5 + 5 * 2
        assert_eq!(policy.speed_for(30, 40), 170);
    }

    #[test]
    fn test_speed_never_below_base() {
        let policy = FanPolicy::default();
        assert_eq!(policy.speed_for(25, 35), 135);
        // 135 - 5 * 6 - 5 * 3
        assert_eq!(policy.speed_for(20, 30), 135);
        assert_eq!(policy.speed_for(0, 0), 135);
    }

    #[test]
    fn test_cold_reading_offsets_humidity() {
        let policy = FanPolicy::default();
        // 135 - 1 * 6 + 10 * 2
        assert_eq!(policy.speed_for(24, 45), 149);
        // 135 - 5 * 6 + 45 * 2
        assert_eq!(policy.speed_for(20, 80), 195);
    }

    #[test]
    fn test_speed_saturates() {
        let policy = FanPolicy::default();
        assert_eq!(policy.speed_for(50, 90), 255);
        assert_eq!(policy.speed_for(u8::MAX, u8::MAX), 255);
    }

    #[test]
    fn test_custom_policy() {
        let policy = FanPolicy::new(100, 20, 50);
        // 100 + 2 * 5 - 10 * 3
        assert_eq!(policy.speed_for(22, 40), 100);
        // 100 + 10 * 5 + 0
        assert_eq!(policy.speed_for(30, 50), 150);
    }
}

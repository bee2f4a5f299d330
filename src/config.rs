use std::time::Duration;

use crate::error::{Result, TypistError};
use crate::model::NewlineMode;

/// Approximate characters per word when converting words/second to a keystroke rate.
pub const CHARS_PER_WORD: f64 = 5.0;
pub const MIN_CHARS_PER_SECOND: f64 = 0.5;
pub const MIN_WORDS_PER_SECOND: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub words_per_second: f64,
    pub start_delay_secs: f64,
    pub newline_mode: NewlineMode,
    pub target_error_rate: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            words_per_second: 40.0,
            start_delay_secs: 5.0,
            newline_mode: NewlineMode::Return,
            target_error_rate: 0.02,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.words_per_second.is_finite() || self.words_per_second < MIN_WORDS_PER_SECOND {
            return Err(TypistError::invalid_config(format!(
                "words_per_second must be at least {MIN_WORDS_PER_SECOND}, got {}",
                self.words_per_second
            )));
        }
        if Duration::try_from_secs_f64(self.start_delay_secs).is_err() {
            return Err(TypistError::invalid_config(format!(
                "start_delay_secs must be a non-negative number of seconds, got {}",
                self.start_delay_secs
            )));
        }
        if !(0.0..=1.0).contains(&self.target_error_rate) {
            return Err(TypistError::invalid_config(format!(
                "target_error_rate must be between 0.0 and 1.0, got {}",
                self.target_error_rate
            )));
        }
        Ok(())
    }

    pub fn chars_per_second(&self) -> f64 {
        (self.words_per_second * CHARS_PER_WORD).max(MIN_CHARS_PER_SECOND)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.chars_per_second())
    }

    pub fn start_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.start_delay_secs).unwrap_or(Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_delay_follows_words_per_second() {
        let cfg = RunConfig {
            words_per_second: 40.0,
            ..Default::default()
        };
        assert_eq!(cfg.chars_per_second(), 200.0);
        assert_eq!(cfg.base_delay(), Duration::from_millis(5));
    }

    #[test]
    fn slow_rates_are_floored() {
        let cfg = RunConfig {
            words_per_second: 0.1,
            ..Default::default()
        };
        assert_eq!(cfg.chars_per_second(), MIN_CHARS_PER_SECOND);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let cfg = RunConfig {
            words_per_second: 0.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = RunConfig {
            target_error_rate: 1.5,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_start_delays_that_overflow_a_duration() {
        for secs in [1e30, f64::INFINITY, f64::NAN, -1.0] {
            let cfg = RunConfig {
                start_delay_secs: secs,
                ..Default::default()
            };
            assert!(
                matches!(cfg.validate(), Err(TypistError::InvalidConfig(_))),
                "{secs} should be rejected"
            );
        }

        let huge = RunConfig {
            start_delay_secs: 1e30,
            ..Default::default()
        };
        assert_eq!(huge.start_delay(), Duration::MAX);
    }
}

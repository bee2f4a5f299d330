use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TypistError};

/// Inclusive millisecond range a pause is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MsRange {
    pub min: f64,
    pub max: f64,
}

impl MsRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn range(&self) -> RangeInclusive<f64> {
        self.min..=self.max
    }

    /// Uniform draw from the range. Saturates instead of panicking on bounds that
    /// skipped validation.
    pub fn draw(&self, rng: &mut impl Rng) -> Duration {
        let ms = rng.gen_range(self.range());
        Duration::try_from_secs_f64(ms / 1000.0).unwrap_or(Duration::MAX)
    }

    fn validate(&self, name: &'static str) -> Result<()> {
        if !(self.min.is_finite() && self.max.is_finite()) {
            return Err(TypistError::invalid_tuning(name, "bounds must be finite"));
        }
        if self.min < 0.0 || self.min > self.max {
            return Err(TypistError::invalid_tuning(
                name,
                format!("need 0 <= min <= max, got {}..={}", self.min, self.max),
            ));
        }
        if Duration::try_from_secs_f64(self.max / 1000.0).is_err() {
            return Err(TypistError::invalid_tuning(
                name,
                format!("max of {} ms is too large for a pause", self.max),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // Timing model (AR(1) over log-delay)
    pub mu_shift: f64,
    pub ar: f64,
    pub sigma: f64,
    pub backspace_speed_factor: f64,

    // Error injector
    pub fire_probability: f64,
    pub long_word_fire_probability: f64,
    pub long_word_len: usize,
    pub neighbor_weight: f64,
    pub sticky_weight: f64,
    pub transpose_weight: f64,
    pub correction_hold_ms: MsRange,
    pub shift_slip_probability: f64,
    pub multi_correction_probability: f64,

    // Pause scheduler
    pub punctuation_pause_probability: f64,
    pub punctuation_pause_ms: MsRange,
    pub sentence_pause_ms: MsRange,
    pub paragraph_pause_ms: MsRange,
    pub hesitation_probability: f64,
    pub hesitation_ms: MsRange,
    pub burst_words_min: u32,
    pub burst_words_max: u32,
    pub burst_pause_ms: MsRange,
    pub space_extra_ms: MsRange,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            mu_shift: -0.02,
            ar: 0.6,
            sigma: 0.25,
            backspace_speed_factor: 0.6,

            fire_probability: 0.7,
            long_word_fire_probability: 0.95,
            long_word_len: 6,
            neighbor_weight: 0.6,
            sticky_weight: 0.2,
            transpose_weight: 0.2,
            correction_hold_ms: MsRange::new(120.0, 380.0),
            shift_slip_probability: 0.03,
            multi_correction_probability: 0.008,

            punctuation_pause_probability: 0.35,
            punctuation_pause_ms: MsRange::new(80.0, 250.0),
            sentence_pause_ms: MsRange::new(300.0, 900.0),
            paragraph_pause_ms: MsRange::new(800.0, 2000.0),
            hesitation_probability: 0.02,
            hesitation_ms: MsRange::new(150.0, 450.0),
            burst_words_min: 8,
            burst_words_max: 20,
            burst_pause_ms: MsRange::new(600.0, 1600.0),
            space_extra_ms: MsRange::new(10.0, 60.0),
        }
    }
}

fn probability(name: &'static str, p: f64) -> Result<()> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(TypistError::invalid_tuning(
            name,
            format!("must be between 0.0 and 1.0, got {p}"),
        ))
    }
}

impl Tuning {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let tuning: Tuning = serde_json::from_str(&json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.mu_shift.is_finite() {
            return Err(TypistError::invalid_tuning("mu_shift", "must be finite"));
        }
        if !(0.0..1.0).contains(&self.ar) {
            return Err(TypistError::invalid_tuning("ar", "must be in [0, 1)"));
        }
        if !(self.sigma.is_finite() && self.sigma >= 0.0) {
            return Err(TypistError::invalid_tuning("sigma", "must be >= 0"));
        }
        if !(self.backspace_speed_factor.is_finite() && self.backspace_speed_factor > 0.0) {
            return Err(TypistError::invalid_tuning(
                "backspace_speed_factor",
                "must be > 0",
            ));
        }

        probability("fire_probability", self.fire_probability)?;
        probability("long_word_fire_probability", self.long_word_fire_probability)?;
        probability("shift_slip_probability", self.shift_slip_probability)?;
        probability(
            "multi_correction_probability",
            self.multi_correction_probability,
        )?;
        probability(
            "punctuation_pause_probability",
            self.punctuation_pause_probability,
        )?;
        probability("hesitation_probability", self.hesitation_probability)?;

        let weights = [
            self.neighbor_weight,
            self.sticky_weight,
            self.transpose_weight,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) || weights.iter().sum::<f64>() <= 0.0
        {
            return Err(TypistError::invalid_tuning(
                "neighbor_weight/sticky_weight/transpose_weight",
                "weights must be >= 0 with a positive sum",
            ));
        }

        if self.burst_words_min == 0 || self.burst_words_min > self.burst_words_max {
            return Err(TypistError::invalid_tuning(
                "burst_words_min",
                "need 1 <= burst_words_min <= burst_words_max",
            ));
        }

        self.correction_hold_ms.validate("correction_hold_ms")?;
        self.punctuation_pause_ms.validate("punctuation_pause_ms")?;
        self.sentence_pause_ms.validate("sentence_pause_ms")?;
        self.paragraph_pause_ms.validate("paragraph_pause_ms")?;
        self.hesitation_ms.validate("hesitation_ms")?;
        self.burst_pause_ms.validate("burst_pause_ms")?;
        self.space_extra_ms.validate("space_extra_ms")?;

        Ok(())
    }
}

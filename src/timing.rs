use std::time::Duration;

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{Result, TypistError};
use crate::tuning::Tuning;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimingState {
    pub last_ln: f64,
}

#[derive(Debug, Clone)]
pub struct TimingModel {
    mu_shift: f64,
    ar: f64,
    noise: Normal<f64>,
    backspace_speed_factor: f64,
}

impl TimingModel {
    pub fn new(tuning: &Tuning) -> Result<Self> {
        let noise = Normal::new(0.0, tuning.sigma)
            .map_err(|err| TypistError::invalid_tuning("sigma", err.to_string()))?;
        Ok(Self {
            mu_shift: tuning.mu_shift,
            ar: tuning.ar,
            noise,
            backspace_speed_factor: tuning.backspace_speed_factor,
        })
    }

    pub fn next_delay(
        &self,
        state: &mut TimingState,
        base_delay: Duration,
        rng: &mut impl Rng,
    ) -> Duration {
        let ln = self.mu_shift + self.ar * state.last_ln + self.noise.sample(rng);
        state.last_ln = ln;

        let secs = base_delay.as_secs_f64() * ln.exp();
        if secs.is_nan() || secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Delay for a corrective keystroke: the regular draw scaled by the backspace
    /// speed factor. The AR state advances exactly as for a normal keystroke.
    pub fn correction_delay(
        &self,
        state: &mut TimingState,
        base_delay: Duration,
        rng: &mut impl Rng,
    ) -> Duration {
        let secs =
            self.next_delay(state, base_delay, rng).as_secs_f64() * self.backspace_speed_factor;
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

/// Timing model plus its state and the run's base delay.
#[derive(Debug, Clone)]
pub struct Pacer {
    model: TimingModel,
    state: TimingState,
    base_delay: Duration,
}

impl Pacer {
    pub fn new(tuning: &Tuning, base_delay: Duration) -> Result<Self> {
        Ok(Self {
            model: TimingModel::new(tuning)?,
            state: TimingState::default(),
            base_delay,
        })
    }

    pub fn keystroke(&mut self, rng: &mut impl Rng) -> Duration {
        self.model.next_delay(&mut self.state, self.base_delay, rng)
    }

    pub fn correction(&mut self, rng: &mut impl Rng) -> Duration {
        self.model
            .correction_delay(&mut self.state, self.base_delay, rng)
    }
}

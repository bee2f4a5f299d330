use std::time::Duration;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::error::{Result, TypistError};
use crate::keyboard::{is_typo_eligible, qwerty_adjacent_char};
use crate::model::{Action, Key};
use crate::timing::Pacer;
use crate::tokens::Segment;
use crate::tuning::{MsRange, Tuning};

pub const MIN_ERROR_RATE: f64 = 0.0001;
pub const MAX_ERROR_RATE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An adjacent QWERTY key instead of the intended one.
    Neighbor,
    /// The intended key registers twice.
    Sticky,
    /// The intended character and the next one swapped.
    Transpose,
}

impl ErrorKind {
    /// Source characters covered by the mistake and its correction.
    pub fn consumed(self) -> usize {
        match self {
            ErrorKind::Transpose => 2,
            ErrorKind::Neighbor | ErrorKind::Sticky => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorState {
    /// Eligible characters left until the next mistake may fire.
    pub gap_remaining: u64,
    /// Characters typed so far in the current word.
    pub word_len: usize,
}

/// Draw the spacing to the next mistake: `ceil(ln(1-u) / ln(1-p))`.
pub fn sample_gap(p: f64, rng: &mut impl Rng) -> u64 {
    let p = p.clamp(MIN_ERROR_RATE, MAX_ERROR_RATE);
    let u: f64 = rng.gen();
    let gap = ((1.0 - u).ln() / (1.0 - p).ln()).ceil();
    if gap.is_nan() {
        1
    } else {
        (gap as u64).max(1)
    }
}

#[derive(Debug, Clone)]
pub struct ErrorInjector {
    enabled: bool,
    p: f64,
    fire_probability: f64,
    long_word_fire_probability: f64,
    long_word_len: usize,
    kinds: WeightedIndex<f64>,
    hold_ms: MsRange,
    shift_slip_probability: f64,
    multi_correction_probability: f64,
}

impl ErrorInjector {
    pub fn new(target_error_rate: f64, tuning: &Tuning) -> Result<Self> {
        let kinds = WeightedIndex::new([
            tuning.neighbor_weight,
            tuning.sticky_weight,
            tuning.transpose_weight,
        ])
        .map_err(|err| TypistError::invalid_tuning("neighbor_weight", err.to_string()))?;

        Ok(Self {
            enabled: target_error_rate > 0.0,
            p: target_error_rate.clamp(MIN_ERROR_RATE, MAX_ERROR_RATE),
            fire_probability: tuning.fire_probability,
            long_word_fire_probability: tuning.long_word_fire_probability,
            long_word_len: tuning.long_word_len,
            kinds,
            hold_ms: tuning.correction_hold_ms,
            shift_slip_probability: tuning.shift_slip_probability,
            multi_correction_probability: tuning.multi_correction_probability,
        })
    }

    pub fn initial_state(&self, rng: &mut impl Rng) -> ErrorState {
        ErrorState {
            gap_remaining: sample_gap(self.p, rng),
            word_len: 0,
        }
    }

    /// Decide whether `ch` gets a mistake. Counts down the gap on every eligible
    /// character; once it reaches zero a mistake fires with a probability that is
    /// higher deep inside long words, otherwise the next eligible character retries.
    pub fn should_err(
        &self,
        state: &mut ErrorState,
        ch: char,
        next: Option<&Segment>,
        rng: &mut impl Rng,
    ) -> Option<ErrorKind> {
        if !self.enabled || !is_typo_eligible(ch) {
            return None;
        }

        state.gap_remaining = state.gap_remaining.saturating_sub(1);
        if state.gap_remaining > 0 {
            return None;
        }

        let fire = if state.word_len >= self.long_word_len {
            self.long_word_fire_probability
        } else {
            self.fire_probability
        };
        if !rng.gen_bool(fire) {
            return None;
        }

        state.gap_remaining = sample_gap(self.p, rng);

        let kind = match self.kinds.sample(rng) {
            0 => ErrorKind::Neighbor,
            1 => ErrorKind::Sticky,
            _ => ErrorKind::Transpose,
        };
        if kind == ErrorKind::Transpose && !can_transpose(ch, next) {
            return Some(ErrorKind::Neighbor);
        }
        Some(kind)
    }

    /// Keystrokes for `kind`, or `None` when the mistake cannot be produced for
    /// this character (no adjacency entry, or nothing to swap with).
    pub fn generate_correction(
        &self,
        kind: ErrorKind,
        ch: char,
        next: Option<char>,
        pacer: &mut Pacer,
        rng: &mut impl Rng,
    ) -> Option<Vec<Action>> {
        let mut out = CorrectionBuilder::new(pacer, self.hold_ms);
        match kind {
            ErrorKind::Neighbor => {
                let wrong = qwerty_adjacent_char(ch, rng)?;
                out.type_char(wrong, rng);
                out.hold(rng);
                out.backspace(rng);
                out.type_char(ch, rng);
            }
            ErrorKind::Sticky => {
                out.type_char(ch, rng);
                out.type_char(ch, rng);
                out.hold(rng);
                out.backspace(rng);
            }
            ErrorKind::Transpose => {
                let next = next.filter(|&n| n != ch && is_typo_eligible(n))?;
                out.type_char(next, rng);
                out.type_char(ch, rng);
                out.hold(rng);
                out.backspace(rng);
                out.backspace(rng);
                out.type_char(ch, rng);
                out.type_char(next, rng);
            }
        }
        Some(out.finish())
    }

    /// Shift released a moment too early: the first letter of a sentence comes
    /// out lowercase and is fixed right away.
    pub fn shift_slip(
        &self,
        ch: char,
        at_sentence_start: bool,
        pacer: &mut Pacer,
        rng: &mut impl Rng,
    ) -> Option<Vec<Action>> {
        if !self.enabled || !at_sentence_start || !ch.is_uppercase() {
            return None;
        }
        if !rng.gen_bool(self.shift_slip_probability) {
            return None;
        }

        let lower = ch.to_lowercase().next().filter(|&l| l != ch)?;
        let mut out = CorrectionBuilder::new(pacer, self.hold_ms);
        out.type_char(lower, rng);
        out.hold(rng);
        out.backspace(rng);
        out.type_char(ch, rng);
        Some(out.finish())
    }

    /// How many trailing characters of the current word to erase and retype after
    /// "noticing" a slip a few letters back. `word_len` includes the character
    /// just typed.
    pub fn multi_char_span(&self, word_len: usize, rng: &mut impl Rng) -> Option<usize> {
        if !self.enabled || word_len < 2 {
            return None;
        }
        if !rng.gen_bool(self.multi_correction_probability) {
            return None;
        }
        Some(rng.gen_range(2..=3).min(word_len))
    }

    /// Erase `recent` (the last characters on screen, oldest first) and type it again.
    pub fn retype(&self, recent: &[char], pacer: &mut Pacer, rng: &mut impl Rng) -> Vec<Action> {
        let mut out = CorrectionBuilder::new(pacer, self.hold_ms);
        out.hold(rng);
        for _ in recent {
            out.backspace(rng);
        }
        for &c in recent {
            out.type_char(c, rng);
        }
        out.finish()
    }
}

/// A transpose needs a distinct, eligible literal right after `ch`. Control
/// tokens and whitespace never qualify.
pub fn can_transpose(ch: char, next: Option<&Segment>) -> bool {
    match next {
        Some(Segment::Literal(n)) => *n != ch && is_typo_eligible(*n),
        _ => false,
    }
}

struct CorrectionBuilder<'a> {
    actions: Vec<Action>,
    pacer: &'a mut Pacer,
    hold_ms: MsRange,
}

impl<'a> CorrectionBuilder<'a> {
    fn new(pacer: &'a mut Pacer, hold_ms: MsRange) -> Self {
        Self {
            actions: Vec::new(),
            pacer,
            hold_ms,
        }
    }

    fn sleep(&mut self, d: Duration) {
        if !d.is_zero() {
            self.actions.push(Action::sleep(d));
        }
    }

    fn type_char(&mut self, c: char, rng: &mut impl Rng) {
        self.actions.push(Action::type_char(c));
        let d = self.pacer.keystroke(rng);
        self.sleep(d);
    }

    fn hold(&mut self, rng: &mut impl Rng) {
        let d = self.hold_ms.draw(rng);
        self.sleep(d);
    }

    fn backspace(&mut self, rng: &mut impl Rng) {
        self.actions.push(Action::press(Key::Backspace));
        let d = self.pacer.correction(rng);
        self.sleep(d);
    }

    fn finish(self) -> Vec<Action> {
        self.actions
    }
}

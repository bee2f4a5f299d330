use std::time::Duration;

use rand::Rng;

use crate::history::HistoryBuffer;
use crate::tuning::Tuning;

/// Characters that end a clause or sentence.
pub const PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?'];

pub fn is_punctuation(c: char) -> bool {
    PUNCTUATION.contains(&c)
}

pub fn is_sentence_terminator(c: char) -> bool {
    matches!(c, '.' | '?' | '!')
}

/// Characters that close a word for burst counting and word-length tracking.
pub fn is_word_terminator(c: char) -> bool {
    matches!(c, ' ' | '\n' | '\t') || is_punctuation(c)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurstState {
    pub words_since_burst: u32,
    pub next_burst_threshold: u32,
}

#[derive(Debug, Clone)]
pub struct PauseScheduler {
    tuning: Tuning,
}

impl PauseScheduler {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            tuning: tuning.clone(),
        }
    }

    pub fn initial_burst(&self, rng: &mut impl Rng) -> BurstState {
        BurstState {
            words_since_burst: 0,
            next_burst_threshold: self.draw_threshold(rng),
        }
    }

    fn draw_threshold(&self, rng: &mut impl Rng) -> u32 {
        rng.gen_range(self.tuning.burst_words_min..=self.tuning.burst_words_max)
    }

    /// After a clause or sentence punctuation mark, sometimes.
    pub fn punctuation(&self, c: char, rng: &mut impl Rng) -> Option<Duration> {
        if !is_punctuation(c) || !rng.gen_bool(self.tuning.punctuation_pause_probability) {
            return None;
        }
        Some(self.tuning.punctuation_pause_ms.draw(rng))
    }

    /// After `.?!` that actually ends a sentence, always.
    pub fn sentence(&self, c: char, next: Option<char>, rng: &mut impl Rng) -> Option<Duration> {
        if !ends_sentence(c, next) {
            return None;
        }
        Some(self.tuning.sentence_pause_ms.draw(rng))
    }

    /// Before a newline that completes a blank line.
    pub fn paragraph(&self, history: &HistoryBuffer, rng: &mut impl Rng) -> Option<Duration> {
        if history.last() != Some('\n') {
            return None;
        }
        Some(self.tuning.paragraph_pause_ms.draw(rng))
    }

    /// Brief stall partway through a long word.
    pub fn mid_word(&self, word_len: usize, rng: &mut impl Rng) -> Option<Duration> {
        if word_len < self.tuning.long_word_len
            || !rng.gen_bool(self.tuning.hesitation_probability)
        {
            return None;
        }
        Some(self.tuning.hesitation_ms.draw(rng))
    }

    /// Count a finished word; returns the burst pause when the window is full.
    pub fn word_boundary(&self, state: &mut BurstState, rng: &mut impl Rng) -> Option<Duration> {
        state.words_since_burst += 1;
        if state.words_since_burst < state.next_burst_threshold {
            return None;
        }
        state.words_since_burst = 0;
        state.next_burst_threshold = self.draw_threshold(rng);
        Some(self.tuning.burst_pause_ms.draw(rng))
    }

    pub fn space_extra(&self, c: char, rng: &mut impl Rng) -> Option<Duration> {
        if c != ' ' {
            return None;
        }
        Some(self.tuning.space_extra_ms.draw(rng))
    }
}

pub fn ends_sentence(c: char, next: Option<char>) -> bool {
    is_sentence_terminator(c) && matches!(next, None | Some(' ' | '\n'))
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn sentence_pause_needs_a_real_sentence_end() {
        let scheduler = PauseScheduler::new(&Tuning::default());
        let mut rng = StdRng::seed_from_u64(21);
        let range = Tuning::default().sentence_pause_ms;

        for next in [None, Some(' '), Some('\n')] {
            let d = scheduler.sentence('.', next, &mut rng).unwrap();
            let ms = d.as_secs_f64() * 1000.0;
            assert!(ms >= range.min - 1e-6 && ms <= range.max + 1e-6);
        }
        assert!(scheduler.sentence('.', Some('5'), &mut rng).is_none());
        assert!(scheduler.sentence(',', None, &mut rng).is_none());
    }

    #[test]
    fn burst_counter_resets_exactly_at_threshold() {
        let scheduler = PauseScheduler::new(&Tuning::default());
        let mut rng = StdRng::seed_from_u64(22);
        let mut state = scheduler.initial_burst(&mut rng);
        let mut bursts = 0;

        for _ in 0..2_000 {
            let before = state.clone();
            assert!(before.words_since_burst < before.next_burst_threshold);

            match scheduler.word_boundary(&mut state, &mut rng) {
                Some(_) => {
                    bursts += 1;
                    assert_eq!(before.words_since_burst + 1, before.next_burst_threshold);
                    assert_eq!(state.words_since_burst, 0);
                    let t = state.next_burst_threshold;
                    assert!((8..=20).contains(&t));
                }
                None => {
                    assert_eq!(state.words_since_burst, before.words_since_burst + 1);
                    assert_eq!(state.next_burst_threshold, before.next_burst_threshold);
                }
            }
        }
        assert!(bursts > 2_000 / 21);
    }

    #[test]
    fn paragraph_pause_follows_a_newline() {
        let scheduler = PauseScheduler::new(&Tuning::default());
        let mut rng = StdRng::seed_from_u64(23);
        let mut history = HistoryBuffer::new();

        history.push('.');
        assert!(scheduler.paragraph(&history, &mut rng).is_none());
        history.push('\n');
        assert!(scheduler.paragraph(&history, &mut rng).is_some());
    }

    #[test]
    fn short_words_never_hesitate() {
        let scheduler = PauseScheduler::new(&Tuning {
            hesitation_probability: 1.0,
            ..Default::default()
        });
        let mut rng = StdRng::seed_from_u64(24);
        assert!(scheduler.mid_word(3, &mut rng).is_none());
        assert!(scheduler.mid_word(6, &mut rng).is_some());
    }
}

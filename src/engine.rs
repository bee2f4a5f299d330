use std::time::Duration;

use rand::Rng;
use tracing::{debug, trace};

use crate::config::RunConfig;
use crate::error::Result;
use crate::history::HistoryBuffer;
use crate::model::{Action, Key, Modifier, Plan, PlanConfig, PLAN_VERSION};
use crate::pauses::{is_word_terminator, BurstState, PauseScheduler};
use crate::timing::Pacer;
use crate::tokens::{tokenize, ControlToken, Segment};
use crate::tuning::Tuning;
use crate::typo::{ErrorInjector, ErrorState};

/// Receives actions in order, one at a time.
pub trait ActionSink {
    fn emit(&mut self, action: Action) -> Result<()>;

    /// Polled between steps; a cancelled sink ends the run early.
    fn cancelled(&self) -> bool {
        false
    }
}

impl ActionSink for Vec<Action> {
    fn emit(&mut self, action: Action) -> Result<()> {
        self.push(action);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Cancelled,
}

/// Turns tokenized text into paced, occasionally mistyped keystrokes. A step
/// covers one position, or two for a transposition.
#[derive(Debug, Clone)]
pub struct Engine {
    newline_action: Action,
    pacer: Pacer,
    injector: ErrorInjector,
    pauses: PauseScheduler,
    errors: ErrorState,
    burst: BurstState,
    history: HistoryBuffer,
}

impl Engine {
    pub fn new(config: &RunConfig, tuning: &Tuning, rng: &mut impl Rng) -> Result<Self> {
        config.validate()?;
        tuning.validate()?;

        let injector = ErrorInjector::new(config.target_error_rate, tuning)?;
        let pauses = PauseScheduler::new(tuning);
        let errors = injector.initial_state(rng);
        let burst = pauses.initial_burst(rng);

        Ok(Self {
            newline_action: config.newline_mode.action(),
            pacer: Pacer::new(tuning, config.base_delay())?,
            injector,
            pauses,
            errors,
            burst,
            history: HistoryBuffer::new(),
        })
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn burst(&self) -> &BurstState {
        &self.burst
    }

    /// Type sanitized `text` into `sink`.
    pub fn type_text(
        &mut self,
        text: &str,
        sink: &mut impl ActionSink,
        rng: &mut impl Rng,
    ) -> Result<RunOutcome> {
        let segments = tokenize(text);
        self.run(&segments, sink, rng)
    }

    pub fn run(
        &mut self,
        segments: &[Segment],
        sink: &mut impl ActionSink,
        rng: &mut impl Rng,
    ) -> Result<RunOutcome> {
        debug!(segments = segments.len(), "typing run starting");

        let mut cursor = 0usize;
        while cursor < segments.len() {
            if sink.cancelled() {
                debug!(cursor, "typing run cancelled");
                return Ok(RunOutcome::Cancelled);
            }
            cursor += self.step(segments, cursor, sink, rng)?;
        }

        debug!("typing run finished");
        Ok(RunOutcome::Completed)
    }

    fn step(
        &mut self,
        segments: &[Segment],
        i: usize,
        sink: &mut impl ActionSink,
        rng: &mut impl Rng,
    ) -> Result<usize> {
        match &segments[i] {
            Segment::Control(token) => {
                self.control(token, sink, rng)?;
                Ok(1)
            }
            Segment::Literal('\n') => {
                self.newline(sink, rng)?;
                Ok(1)
            }
            Segment::Literal('\t') => {
                self.tab(sink, rng)?;
                Ok(1)
            }
            Segment::Literal(c) => self.character(*c, segments, i, sink, rng),
        }
    }

    fn control(
        &mut self,
        token: &ControlToken,
        sink: &mut impl ActionSink,
        rng: &mut impl Rng,
    ) -> Result<()> {
        trace!(?token, "control token");
        for action in token.actions() {
            emit(sink, action)?;
        }

        match token {
            ControlToken::Key(Key::Return | Key::KeypadEnter)
            | ControlToken::Chord(Key::Return, Modifier::Shift) => {
                self.history.push('\n');
                self.end_word(sink, rng)?;
            }
            ControlToken::Key(Key::Tab) => {
                self.history.push('\t');
                self.end_word(sink, rng)?;
            }
            ControlToken::Type(text) | ControlToken::Literal(text) => {
                text.chars().for_each(|c| self.history.push(c));
                // Injected text is never part of a word that may be retyped.
                self.errors.word_len = 0;
            }
            _ => {}
        }

        let delay = self.pacer.keystroke(rng);
        emit(sink, Action::sleep(delay))
    }

    fn newline(&mut self, sink: &mut impl ActionSink, rng: &mut impl Rng) -> Result<()> {
        if let Some(d) = self.pauses.paragraph(&self.history, rng) {
            emit(sink, Action::sleep(d))?;
        }
        emit(sink, self.newline_action.clone())?;
        self.history.push('\n');

        let delay = self.pacer.keystroke(rng);
        emit(sink, Action::sleep(delay))?;
        self.end_word(sink, rng)
    }

    fn tab(&mut self, sink: &mut impl ActionSink, rng: &mut impl Rng) -> Result<()> {
        emit(sink, Action::press(Key::Tab))?;
        self.history.push('\t');

        let delay = self.pacer.keystroke(rng);
        emit(sink, Action::sleep(delay))?;
        self.end_word(sink, rng)
    }

    fn character(
        &mut self,
        c: char,
        segments: &[Segment],
        i: usize,
        sink: &mut impl ActionSink,
        rng: &mut impl Rng,
    ) -> Result<usize> {
        let next = segments.get(i + 1);
        let next_char = next.and_then(Segment::literal);
        let in_word = !is_word_terminator(c);
        if in_word {
            self.errors.word_len += 1;
        }

        let at_sentence_start = self.history.at_sentence_start();
        if let Some(actions) = self
            .injector
            .shift_slip(c, at_sentence_start, &mut self.pacer, rng)
        {
            trace!(ch = %c, "shift slip");
            emit_all(sink, actions)?;
            self.history.push(c);
            self.after_char(c, next_char, sink, rng)?;
            return Ok(1);
        }

        if let Some(kind) = self.injector.should_err(&mut self.errors, c, next, rng) {
            if let Some(actions) =
                self.injector
                    .generate_correction(kind, c, next_char, &mut self.pacer, rng)
            {
                trace!(?kind, ch = %c, "simulated mistake");
                emit_all(sink, actions)?;
                self.history.push(c);

                let (last, after) = match (kind.consumed(), next_char) {
                    (2, Some(n)) => {
                        self.history.push(n);
                        self.errors.word_len += 1;
                        (n, segments.get(i + 2).and_then(Segment::literal))
                    }
                    _ => (c, next_char),
                };
                self.after_char(last, after, sink, rng)?;
                return Ok(kind.consumed());
            }
        }

        match in_word
            .then(|| self.injector.multi_char_span(self.errors.word_len, rng))
            .flatten()
        {
            Some(span) => {
                self.type_plain(c, sink, rng)?;
                let recent = self.history.tail(span);
                trace!(span, "retyping the end of the word");
                let actions = self.injector.retype(&recent, &mut self.pacer, rng);
                emit_all(sink, actions)?;
            }
            None => {
                if in_word {
                    if let Some(d) = self.pauses.mid_word(self.errors.word_len - 1, rng) {
                        emit(sink, Action::sleep(d))?;
                    }
                }
                self.type_plain(c, sink, rng)?;
            }
        }

        self.after_char(c, next_char, sink, rng)?;
        Ok(1)
    }

    fn type_plain(&mut self, c: char, sink: &mut impl ActionSink, rng: &mut impl Rng) -> Result<()> {
        emit(sink, Action::type_char(c))?;
        self.history.push(c);
        let delay = self.pacer.keystroke(rng);
        emit(sink, Action::sleep(delay))
    }

    /// Pauses owed after `c` lands on screen; `next` is the literal that follows.
    fn after_char(
        &mut self,
        c: char,
        next: Option<char>,
        sink: &mut impl ActionSink,
        rng: &mut impl Rng,
    ) -> Result<()> {
        if let Some(d) = self.pauses.punctuation(c, rng) {
            emit(sink, Action::sleep(d))?;
        }
        if let Some(d) = self.pauses.space_extra(c, rng) {
            emit(sink, Action::sleep(d))?;
        }
        if let Some(d) = self.pauses.sentence(c, next, rng) {
            emit(sink, Action::sleep(d))?;
        }
        if is_word_terminator(c) {
            self.end_word(sink, rng)?;
        }
        Ok(())
    }

    fn end_word(&mut self, sink: &mut impl ActionSink, rng: &mut impl Rng) -> Result<()> {
        let had_word = self.errors.word_len > 0;
        self.errors.word_len = 0;
        if !had_word {
            return Ok(());
        }
        if let Some(d) = self.pauses.word_boundary(&mut self.burst, rng) {
            trace!("burst pause");
            emit(sink, Action::sleep(d))?;
        }
        Ok(())
    }
}

fn emit(sink: &mut impl ActionSink, action: Action) -> Result<()> {
    if let Action::Sleep { duration } = &action {
        if *duration == Duration::ZERO {
            return Ok(());
        }
    }
    sink.emit(action)
}

fn emit_all(sink: &mut impl ActionSink, actions: Vec<Action>) -> Result<()> {
    actions.into_iter().try_for_each(|a| emit(sink, a))
}

/// Generate a complete plan for already-sanitized `text`.
pub fn generate_plan(
    text: &str,
    config: &RunConfig,
    tuning: &Tuning,
    rng: &mut impl Rng,
) -> Result<Plan> {
    let mut engine = Engine::new(config, tuning, rng)?;
    let mut actions = Vec::new();
    engine.type_text(text, &mut actions, rng)?;

    Ok(Plan {
        version: PLAN_VERSION,
        config: PlanConfig {
            words_per_second: config.words_per_second,
            target_error_rate: config.target_error_rate,
            newline_mode: config.newline_mode,
            start_delay_secs: config.start_delay_secs,
            seed: None,
        },
        actions,
    })
}

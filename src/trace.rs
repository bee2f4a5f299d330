use crate::model::{Action, Key};
use crate::sim::{inserted_by, simulate_typed_text};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub action_index: usize,
    pub line: String,
}

/// Precompute console trace events so they can be printed *before* the associated
/// typing/correction sequence starts during playback.
///
/// Corrections are described against the text the plan finally leaves on screen,
/// which tells a replaced character apart from a retyped or doubled one.
pub fn plan_console_trace(actions: &[Action]) -> Vec<TraceEvent> {
    let target: Vec<char> = simulate_typed_text(actions).chars().collect();
    let mut planner = TracePlanner::new(target);
    for (action_index, action) in actions.iter().enumerate() {
        planner.observe_action(action_index, action);
    }
    planner.finish();

    planner.events.sort_by_key(|event| event.action_index);
    planner.events
}

#[derive(Debug, Default, Clone)]
struct ScheduledCorrection {
    start_action_index: usize,
    deleted: Vec<char>,
}

impl ScheduledCorrection {
    fn deleted_string(&self) -> String {
        self.deleted.iter().rev().collect()
    }
}

#[derive(Debug, Default, Clone)]
struct TracePlanner {
    target: Vec<char>,
    buf: Vec<char>,

    typing_run_start_action: Option<usize>,
    typing_run: String,

    correction: Option<ScheduledCorrection>,
    // Characters still to come that belong to the last correction.
    retyping: usize,
    events: Vec<TraceEvent>,
}

impl TracePlanner {
    fn new(target: Vec<char>) -> Self {
        Self {
            target,
            ..Default::default()
        }
    }

    fn observe_action(&mut self, action_index: usize, action: &Action) {
        match action {
            Action::Sleep { .. } => {}
            Action::TypeChar { ch } => self.handle_insert(action_index, *ch),
            Action::PressKey {
                key: Key::Backspace,
            } => self.handle_backspace(action_index),
            Action::PressKey { key } => {
                if let Some(c) = inserted_by(*key, None) {
                    self.handle_insert(action_index, c);
                }
            }
            Action::KeyChord { key, modifier } => {
                if let Some(c) = inserted_by(*key, Some(*modifier)) {
                    self.handle_insert(action_index, c);
                }
            }
        }
    }

    fn finish(&mut self) {
        self.finish_correction();
        self.flush_typing_run();
    }

    fn flush_typing_run(&mut self) {
        let Some(start_idx) = self.typing_run_start_action.take() else {
            self.typing_run.clear();
            return;
        };
        if self.typing_run.is_empty() {
            return;
        }

        self.events.push(TraceEvent {
            action_index: start_idx,
            line: format!("Typing \"{}\"...", escape_for_log(&self.typing_run)),
        });
        self.typing_run.clear();
    }

    fn finish_correction(&mut self) {
        let Some(correction) = self.correction.take() else {
            return;
        };
        if correction.deleted.is_empty() {
            return;
        }

        let wrong = correction.deleted_string();
        let len = correction.deleted.len();
        let at = self.buf.len();
        let upcoming: String = self.target.iter().skip(at).take(len).collect();
        let doubled = at >= len && self.buf[at - len..].iter().copied().eq(wrong.chars());

        let line = if upcoming == wrong {
            self.retyping = len;
            format!("Retype \"{}\"...", escape_for_log(&wrong))
        } else if doubled {
            self.retyping = 0;
            format!("Remove doubled \"{}\"...", escape_for_log(&wrong))
        } else {
            self.retyping = upcoming.chars().count();
            format!(
                "Replace \"{}\" with \"{}\"...",
                escape_for_log(&wrong),
                escape_for_log(&upcoming)
            )
        };

        self.events.push(TraceEvent {
            action_index: correction.start_action_index,
            line,
        });
    }

    fn handle_backspace(&mut self, action_index: usize) {
        self.retyping = 0;
        if self.correction.is_none() {
            self.flush_typing_run();
            self.correction = Some(ScheduledCorrection {
                start_action_index: action_index,
                ..Default::default()
            });
        }

        if let Some(c) = self.buf.pop() {
            if let Some(correction) = &mut self.correction {
                correction.deleted.push(c);
            }
        }
    }

    fn handle_insert(&mut self, action_index: usize, c: char) {
        if self.correction.is_some() {
            self.finish_correction();
        }
        self.buf.push(c);

        if self.retyping > 0 {
            self.retyping -= 1;
            return;
        }

        if self.typing_run.is_empty() {
            self.typing_run_start_action = Some(action_index);
        }
        self.typing_run.push(c);
    }
}

pub fn escape_for_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

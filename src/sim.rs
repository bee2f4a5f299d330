use std::time::Duration;

use crate::model::{Action, Key, Modifier, Plan};
use crate::tokens::{ControlToken, Segment};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlanStats {
    pub actions: usize,
    pub keystrokes: usize,
    pub backspaces: usize,
    pub chords: usize,
    pub total_sleep: Duration,
}

pub fn stats(plan: &Plan) -> PlanStats {
    let mut out = PlanStats {
        actions: plan.actions.len(),
        ..Default::default()
    };

    for a in &plan.actions {
        match a {
            Action::Sleep { duration } => {
                out.total_sleep = out.total_sleep.saturating_add(*duration);
            }
            Action::TypeChar { .. } => out.keystrokes += 1,
            Action::PressKey { key } => {
                out.keystrokes += 1;
                if *key == Key::Backspace {
                    out.backspaces += 1;
                }
            }
            Action::KeyChord { .. } => {
                out.keystrokes += 1;
                out.chords += 1;
            }
        }
    }

    out
}

/// The character a key or chord inserts into a plain-text editor, if any.
pub(crate) fn inserted_by(key: Key, modifier: Option<Modifier>) -> Option<char> {
    match (key, modifier) {
        (_, Some(Modifier::Ctrl | Modifier::Alt)) => None,
        (Key::Return | Key::KeypadEnter, _) => Some('\n'),
        (Key::Tab, _) => Some('\t'),
        (Key::Backspace, _) => None,
    }
}

/// Simulate the final editor text produced by a sequence of actions.
///
/// The editor is append-only with backspace, which is all the engine ever does.
/// Ctrl and Alt chords are treated as commands and insert nothing.
pub fn simulate_typed_text(actions: &[Action]) -> String {
    let mut buf: Vec<char> = Vec::new();

    for action in actions {
        match action {
            Action::Sleep { .. } => {}
            Action::TypeChar { ch } => buf.push(*ch),
            Action::PressKey { key: Key::Backspace } => {
                buf.pop();
            }
            Action::PressKey { key } => buf.extend(inserted_by(*key, None)),
            Action::KeyChord { key, modifier } => buf.extend(inserted_by(*key, Some(*modifier))),
        }
    }

    buf.into_iter().collect()
}

/// The text a tokenized stream should leave on screen once every mistake has been
/// corrected: literals as-is, control tokens resolved to what they insert.
pub fn expected_text(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Literal(c) => out.push(*c),
            Segment::Control(ControlToken::Key(key)) => out.extend(inserted_by(*key, None)),
            Segment::Control(ControlToken::Chord(key, modifier)) => {
                out.extend(inserted_by(*key, Some(*modifier)))
            }
            Segment::Control(ControlToken::Type(text) | ControlToken::Literal(text)) => {
                out.push_str(text)
            }
            Segment::Control(ControlToken::Sleep(_)) => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::tokenize;

    #[test]
    fn backspace_removes_the_last_character() {
        let actions = vec![
            Action::type_char('a'),
            Action::type_char('x'),
            Action::sleep(Duration::from_millis(4)),
            Action::press(Key::Backspace),
            Action::type_char('b'),
            Action::chord(Key::Return, Modifier::Shift),
            Action::chord(Key::Return, Modifier::Ctrl),
            Action::press(Key::Tab),
        ];
        assert_eq!(simulate_typed_text(&actions), "ab\n\t");
    }

    #[test]
    fn stats_count_keystrokes_and_chords() {
        let plan = Plan {
            version: crate::model::PLAN_VERSION,
            config: crate::model::PlanConfig {
                words_per_second: 40.0,
                target_error_rate: 0.0,
                newline_mode: crate::model::NewlineMode::Return,
                start_delay_secs: 0.0,
                seed: None,
            },
            actions: vec![
                Action::type_char('a'),
                Action::sleep(Duration::from_millis(40)),
                Action::press(Key::Backspace),
                Action::chord(Key::Return, Modifier::Shift),
                Action::sleep(Duration::from_millis(60)),
            ],
        };
        let s = stats(&plan);
        assert_eq!(s.actions, 5);
        assert_eq!(s.keystrokes, 3);
        assert_eq!(s.backspaces, 1);
        assert_eq!(s.chords, 1);
        assert_eq!(s.total_sleep, Duration::from_millis(100));
    }

    #[test]
    fn expected_text_resolves_tokens() {
        let segments = tokenize("a[[KEY_TAB]]b[[SLEEP:5]][[TYPE:c d]][[KEY_CTRL_RETURN]][[nope]]");
        assert_eq!(expected_text(&segments), "a\tbc d[[nope]]");
    }
}

use std::num::ParseFloatError;
use std::time::Duration;

use crate::model::{Action, Key, Modifier};

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(char),
    Control(ControlToken),
}

impl Segment {
    pub fn literal(&self) -> Option<char> {
        match self {
            Segment::Literal(c) => Some(*c),
            Segment::Control(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlToken {
    Key(Key),
    Chord(Key, Modifier),
    Sleep(Duration),
    /// Text injected verbatim, bypassing timing and typo simulation.
    Type(String),
    /// Anything unrecognized; the original bracketed source is typed back out.
    Literal(String),
}

impl ControlToken {
    pub fn parse(body: &str) -> ControlToken {
        let trimmed = body.trim();
        let (name, arg) = match trimmed.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (trimmed, None),
        };

        match (name.to_ascii_uppercase().as_str(), arg) {
            ("KEY_RETURN", None) => ControlToken::Key(Key::Return),
            ("KEY_ENTER", None) => ControlToken::Key(Key::KeypadEnter),
            ("KEY_TAB", None) => ControlToken::Key(Key::Tab),
            ("KEY_SHIFT_RETURN", None) => ControlToken::Chord(Key::Return, Modifier::Shift),
            ("KEY_CTRL_RETURN", None) => ControlToken::Chord(Key::Return, Modifier::Ctrl),
            ("KEY_ALT_RETURN", None) => ControlToken::Chord(Key::Return, Modifier::Alt),
            ("SLEEP", Some(ms)) => match parse_sleep_ms(ms) {
                Ok(duration) => ControlToken::Sleep(duration),
                Err(_) => ControlToken::Literal(format!("[[{body}]]")),
            },
            ("TYPE", Some(text)) => ControlToken::Type(text.to_string()),
            _ => ControlToken::Literal(format!("[[{body}]]")),
        }
    }

    /// The actions that carry out this token, without any pacing.
    pub fn actions(&self) -> Vec<Action> {
        match self {
            ControlToken::Key(key) => vec![Action::press(*key)],
            ControlToken::Chord(key, modifier) => vec![Action::chord(*key, *modifier)],
            ControlToken::Sleep(duration) => vec![Action::sleep(*duration)],
            ControlToken::Type(text) | ControlToken::Literal(text) => {
                text.chars().map(Action::type_char).collect()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SleepParseError {
    Number(ParseFloatError),
    OutOfRange(f64),
}

pub fn parse_sleep_ms(arg: &str) -> Result<Duration, SleepParseError> {
    let ms: f64 = arg.trim().parse().map_err(SleepParseError::Number)?;
    if !ms.is_finite() || ms < 0.0 {
        return Err(SleepParseError::OutOfRange(ms));
    }
    Ok(duration_from_ms(ms))
}

pub(crate) fn duration_from_ms(ms: f64) -> Duration {
    Duration::from_nanos((ms * 1_000_000.0).round() as u64)
}

pub fn tokenize(text: &str) -> Vec<Segment> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::with_capacity(chars.len());
    let mut i = 0usize;

    while i < chars.len() {
        if chars[i] == '[' && chars.get(i + 1) == Some(&'[') {
            if let Some(end) = find_close(&chars, i + 2) {
                let body: String = chars[i + 2..end].iter().collect();
                out.push(Segment::Control(ControlToken::parse(&body)));
                i = end + 2;
                continue;
            }
        }
        out.push(Segment::Literal(chars[i]));
        i += 1;
    }

    out
}

fn find_close(chars: &[char], from: usize) -> Option<usize> {
    (from..chars.len().saturating_sub(1)).find(|&j| chars[j] == ']' && chars[j + 1] == ']')
}

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const PLAN_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub version: u32,
    pub config: PlanConfig,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    pub words_per_second: f64,
    pub target_error_rate: f64,
    pub newline_mode: NewlineMode,
    pub start_delay_secs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// One unit of engine output. Delivered atomically and in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    TypeChar {
        ch: char,
    },
    PressKey {
        key: Key,
    },
    /// `key` pressed while `modifier` is held. Players deliver this as a scoped
    /// down/press/up triple.
    KeyChord {
        key: Key,
        modifier: Modifier,
    },
    Sleep {
        #[serde(rename = "ms", with = "millis")]
        duration: Duration,
    },
}

impl Action {
    pub fn type_char(ch: char) -> Self {
        Action::TypeChar { ch }
    }

    pub fn press(key: Key) -> Self {
        Action::PressKey { key }
    }

    pub fn chord(key: Key, modifier: Modifier) -> Self {
        Action::KeyChord { key, modifier }
    }

    pub fn sleep(duration: Duration) -> Self {
        Action::Sleep { duration }
    }

    pub fn is_backspace(&self) -> bool {
        matches!(
            self,
            Action::PressKey {
                key: Key::Backspace
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Return,
    KeypadEnter,
    Tab,
    Backspace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    Shift,
    Ctrl,
    Alt,
}

impl Modifier {
    pub const ALL: [Modifier; 3] = [Modifier::Shift, Modifier::Ctrl, Modifier::Alt];

    pub fn name(self) -> &'static str {
        match self {
            Modifier::Shift => "shift",
            Modifier::Ctrl => "ctrl",
            Modifier::Alt => "alt",
        }
    }
}

/// Which key (or chord) a logical newline in the text becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewlineMode {
    #[default]
    Return,
    ShiftReturn,
    KeypadEnter,
}

impl NewlineMode {
    pub fn action(self) -> Action {
        match self {
            NewlineMode::Return => Action::press(Key::Return),
            NewlineMode::ShiftReturn => Action::chord(Key::Return, Modifier::Shift),
            NewlineMode::KeypadEnter => Action::press(Key::KeypadEnter),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64() * 1000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(d)?;
        if !ms.is_finite() || ms < 0.0 {
            return Err(serde::de::Error::custom(format!(
                "sleep duration must be a non-negative number of milliseconds, got {ms}"
            )));
        }
        Ok(crate::tokens::duration_from_ms(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_use_tagged_json() {
        let json = serde_json::to_string(&Action::chord(Key::Return, Modifier::Shift)).unwrap();
        assert_eq!(
            json,
            r#"{"type":"key_chord","key":"return","modifier":"shift"}"#
        );

        let sleep: Action = serde_json::from_str(r#"{"type":"sleep","ms":250.0}"#).unwrap();
        assert_eq!(sleep, Action::sleep(Duration::from_millis(250)));
    }

    #[test]
    fn negative_sleep_is_rejected() {
        let res: Result<Action, _> = serde_json::from_str(r#"{"type":"sleep","ms":-1.0}"#);
        assert!(res.is_err());
    }

    #[test]
    fn newline_modes_map_to_keys() {
        assert_eq!(NewlineMode::Return.action(), Action::press(Key::Return));
        assert_eq!(
            NewlineMode::ShiftReturn.action(),
            Action::chord(Key::Return, Modifier::Shift)
        );
        assert_eq!(
            NewlineMode::KeypadEnter.action(),
            Action::press(Key::KeypadEnter)
        );
    }
}

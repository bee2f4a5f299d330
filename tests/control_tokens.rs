use std::time::Duration;

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

use typist::config::RunConfig;
use typist::engine::generate_plan;
use typist::model::{Action, Key, Modifier};
use typist::sim::simulate_typed_text;
use typist::tokens::{tokenize, ControlToken, Segment};
use typist::tuning::Tuning;

fn controls(text: &str) -> Vec<ControlToken> {
    tokenize(text)
        .into_iter()
        .filter_map(|s| match s {
            Segment::Control(token) => Some(token),
            Segment::Literal(_) => None,
        })
        .collect()
}

fn quiet_config() -> RunConfig {
    RunConfig {
        target_error_rate: 0.0,
        ..Default::default()
    }
}

fn keys(actions: &[Action]) -> Vec<Action> {
    actions
        .iter()
        .filter(|a| !matches!(a, Action::Sleep { .. }))
        .cloned()
        .collect()
}

#[test]
fn known_tokens_parse() {
    assert_eq!(
        controls("[[KEY_RETURN]][[KEY_ENTER]][[KEY_TAB]][[KEY_SHIFT_RETURN]][[KEY_CTRL_RETURN]][[KEY_ALT_RETURN]]"),
        vec![
            ControlToken::Key(Key::Return),
            ControlToken::Key(Key::KeypadEnter),
            ControlToken::Key(Key::Tab),
            ControlToken::Chord(Key::Return, Modifier::Shift),
            ControlToken::Chord(Key::Return, Modifier::Ctrl),
            ControlToken::Chord(Key::Return, Modifier::Alt),
        ]
    );
    assert_eq!(
        controls("[[SLEEP:250]][[type:hi there]]"),
        vec![
            ControlToken::Sleep(Duration::from_millis(250)),
            ControlToken::Type("hi there".to_string()),
        ]
    );
}

#[test]
fn names_ignore_case_and_padding() {
    assert_eq!(
        controls("[[ key_tab ]][[Sleep:1.5]]"),
        vec![
            ControlToken::Key(Key::Tab),
            ControlToken::Sleep(Duration::from_micros(1_500)),
        ]
    );
}

#[test]
fn malformed_and_unknown_tokens_stay_literal() {
    assert_eq!(
        controls("[[SLEEP:abc]][[SLEEP:-5]][[WAVE]]"),
        vec![
            ControlToken::Literal("[[SLEEP:abc]]".to_string()),
            ControlToken::Literal("[[SLEEP:-5]]".to_string()),
            ControlToken::Literal("[[WAVE]]".to_string()),
        ]
    );
}

#[test]
fn unterminated_bracket_is_plain_text() {
    let segments = tokenize("a [[KEY_TAB");
    assert!(segments.iter().all(|s| matches!(s, Segment::Literal(_))));
    assert_eq!(segments.len(), "a [[KEY_TAB".chars().count());

    let segments = tokenize("[[KEY_TAB]] [[x");
    assert_eq!(segments[0], Segment::Control(ControlToken::Key(Key::Tab)));
    assert_eq!(segments.len(), 1 + " [[x".chars().count());
}

#[test]
fn tokens_dispatch_their_actions() {
    let mut rng = StdRng::seed_from_u64(5);
    let plan = generate_plan(
        "[[KEY_SHIFT_RETURN]][[SLEEP:300]][[TYPE:ok]][[bogus]]",
        &quiet_config(),
        &Tuning::default(),
        &mut rng,
    )
    .unwrap();

    let mut expected = vec![Action::chord(Key::Return, Modifier::Shift)];
    expected.extend("ok[[bogus]]".chars().map(Action::type_char));
    assert_eq!(keys(&plan.actions), expected);

    assert!(plan
        .actions
        .contains(&Action::sleep(Duration::from_millis(300))));
    assert_eq!(simulate_typed_text(&plan.actions), "\nok[[bogus]]");
}

#[test]
fn injected_text_is_never_mistyped() {
    let tuning = Tuning {
        fire_probability: 1.0,
        long_word_fire_probability: 1.0,
        multi_correction_probability: 1.0,
        ..Default::default()
    };
    let cfg = RunConfig {
        target_error_rate: 0.5,
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(6);
    let plan = generate_plan("[[TYPE:password123]]", &cfg, &tuning, &mut rng).unwrap();

    let expected: Vec<Action> = "password123".chars().map(Action::type_char).collect();
    assert_eq!(keys(&plan.actions), expected);
}

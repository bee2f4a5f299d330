use std::time::Duration;

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

use typist::config::RunConfig;
use typist::engine::{generate_plan, Engine, RunOutcome};
use typist::history::HISTORY_CAPACITY;
use typist::model::{Action, Key, NewlineMode};
use typist::sanitize::sanitize;
use typist::sim::{expected_text, simulate_typed_text, stats};
use typist::tokens::tokenize;
use typist::tuning::{MsRange, Tuning};
use typist::TypistError;

const PROSE: &str = "The quick brown fox jumps over the lazy dog. Then it rests!\n\n\
Pack my box with five dozen liquor jugs; sphinx of black quartz, judge my vow?\n\
\tIndented line with numbers 1234567890 and symbols: (a + b) * c = d.\n\
Interesting words like extraordinary and incomprehensibility appear here.";

fn config(rate: f64) -> RunConfig {
    RunConfig {
        target_error_rate: rate,
        ..Default::default()
    }
}

fn sleeps_between(actions: &[Action], from: usize, to: usize) -> Vec<Duration> {
    actions[from..to]
        .iter()
        .filter_map(|a| match a {
            Action::Sleep { duration } => Some(*duration),
            _ => None,
        })
        .collect()
}

#[test]
fn short_paragraph_without_errors() {
    let cfg = RunConfig {
        words_per_second: 40.0,
        target_error_rate: 0.0,
        ..Default::default()
    };
    let tuning = Tuning::default();
    let mut rng = StdRng::seed_from_u64(40);
    let plan = generate_plan("Hi.\n\nBye", &cfg, &tuning, &mut rng).unwrap();

    let keys: Vec<(usize, &Action)> = plan
        .actions
        .iter()
        .enumerate()
        .filter(|(_, a)| !matches!(a, Action::Sleep { .. }))
        .collect();
    let only: Vec<Action> = keys.iter().map(|(_, a)| (*a).clone()).collect();
    assert_eq!(
        only,
        vec![
            Action::type_char('H'),
            Action::type_char('i'),
            Action::type_char('.'),
            Action::press(Key::Return),
            Action::press(Key::Return),
            Action::type_char('B'),
            Action::type_char('y'),
            Action::type_char('e'),
        ]
    );

    let (dot, first_return, second_return) = (keys[2].0, keys[3].0, keys[4].0);
    let sentence = &tuning.sentence_pause_ms;
    assert!(sleeps_between(&plan.actions, dot, first_return)
        .iter()
        .any(|d| {
            let ms = d.as_secs_f64() * 1000.0;
            ms >= sentence.min - 1e-6 && ms <= sentence.max + 1e-6
        }));

    let paragraph = &tuning.paragraph_pause_ms;
    assert!(sleeps_between(&plan.actions, first_return, second_return)
        .iter()
        .any(|d| d.as_secs_f64() * 1000.0 >= paragraph.min - 1e-6));
}

#[test]
fn corrected_output_matches_input_for_any_seed() {
    let text = format!("{PROSE}\n[[KEY_TAB]]x[[SLEEP:20]]y[[TYPE:literal text]] [[KEY_SHIFT_RETURN]]End.");
    let cleaned = sanitize(&text).text;
    let expected = expected_text(&tokenize(&cleaned));

    for rate in [0.02, 0.15, 0.5] {
        for seed in 0..40u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let plan = generate_plan(&cleaned, &config(rate), &Tuning::default(), &mut rng).unwrap();
            assert_eq!(
                simulate_typed_text(&plan.actions),
                expected,
                "rate {rate}, seed {seed}"
            );
        }
    }
}

#[test]
fn every_mistake_kind_still_reproduces_the_text() {
    let kinds = [(1.0, 0.0, 0.0), (0.0, 1.0, 0.0), (0.0, 0.0, 1.0)];
    for (neighbor_weight, sticky_weight, transpose_weight) in kinds {
        let tuning = Tuning {
            neighbor_weight,
            sticky_weight,
            transpose_weight,
            shift_slip_probability: 0.5,
            multi_correction_probability: 0.1,
            ..Default::default()
        };
        for seed in 0..20u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let plan = generate_plan(PROSE, &config(0.3), &tuning, &mut rng).unwrap();
            assert_eq!(simulate_typed_text(&plan.actions), PROSE, "seed {seed}");
            assert!(stats(&plan).backspaces > 0);
        }
    }
}

#[test]
fn whitespace_is_never_erased() {
    let tuning = Tuning {
        transpose_weight: 5.0,
        multi_correction_probability: 0.2,
        ..Default::default()
    };
    for seed in 0..30u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let plan = generate_plan(PROSE, &config(0.5), &tuning, &mut rng).unwrap();

        let mut screen: Vec<char> = Vec::new();
        for action in &plan.actions {
            match action {
                Action::TypeChar { ch } => screen.push(*ch),
                Action::PressKey { key: Key::Backspace } => {
                    let erased = screen.pop().expect("backspace on empty screen");
                    assert!(
                        !matches!(erased, ' ' | '\n' | '\t'),
                        "seed {seed} erased {erased:?}"
                    );
                }
                Action::PressKey { key: Key::Return } => screen.push('\n'),
                Action::PressKey { key: Key::Tab } => screen.push('\t'),
                _ => {}
            }
        }
    }
}

#[test]
fn disabled_errors_never_backspace() {
    for seed in 0..20u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let plan = generate_plan(PROSE, &config(0.0), &Tuning::default(), &mut rng).unwrap();
        assert!(!plan.actions.iter().any(Action::is_backspace), "seed {seed}");
        assert_eq!(simulate_typed_text(&plan.actions), PROSE);
    }
}

#[test]
fn sleeps_are_never_zero() {
    let mut rng = StdRng::seed_from_u64(9);
    let plan = generate_plan(PROSE, &config(0.1), &Tuning::default(), &mut rng).unwrap();
    for action in &plan.actions {
        if let Action::Sleep { duration } = action {
            assert!(*duration > Duration::ZERO);
        }
    }
}

#[test]
fn history_stays_bounded() {
    let text: String = PROSE.repeat(4);
    let expected: Vec<char> = text.chars().collect();
    assert!(expected.len() > HISTORY_CAPACITY);

    for rate in [0.0, 0.2] {
        let mut rng = StdRng::seed_from_u64(77);
        let mut engine = Engine::new(&config(rate), &Tuning::default(), &mut rng).unwrap();
        let mut actions = Vec::new();
        let outcome = engine.type_text(&text, &mut actions, &mut rng).unwrap();

        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(engine.history().len(), HISTORY_CAPACITY);
        let kept: Vec<char> = engine.history().iter().collect();
        assert_eq!(kept, expected[expected.len() - HISTORY_CAPACITY..].to_vec());
    }
}

#[test]
fn burst_window_stays_in_range() {
    let tuning = Tuning::default();
    let mut rng = StdRng::seed_from_u64(12);
    let mut engine = Engine::new(&config(0.05), &tuning, &mut rng).unwrap();
    let mut actions = Vec::new();
    engine
        .type_text(&PROSE.repeat(3), &mut actions, &mut rng)
        .unwrap();

    let burst = engine.burst();
    assert!(burst.words_since_burst < burst.next_burst_threshold);
    assert!((tuning.burst_words_min..=tuning.burst_words_max).contains(&burst.next_burst_threshold));
}

#[test]
fn newline_mode_selects_the_key() {
    let cfg = RunConfig {
        newline_mode: NewlineMode::KeypadEnter,
        target_error_rate: 0.0,
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(3);
    let plan = generate_plan("a\nb", &cfg, &Tuning::default(), &mut rng).unwrap();
    assert!(plan.actions.contains(&Action::press(Key::KeypadEnter)));
    assert!(!plan.actions.contains(&Action::press(Key::Return)));
    assert_eq!(simulate_typed_text(&plan.actions), "a\nb");
}

#[test]
fn same_seed_same_plan() {
    let cfg = config(0.1);
    let tuning = Tuning::default();
    let a = generate_plan(PROSE, &cfg, &tuning, &mut StdRng::seed_from_u64(1)).unwrap();
    let b = generate_plan(PROSE, &cfg, &tuning, &mut StdRng::seed_from_u64(1)).unwrap();
    assert_eq!(a.actions, b.actions);
}

#[test]
fn cancelled_sink_stops_between_steps() {
    struct StopAfter {
        actions: Vec<Action>,
        limit: usize,
    }

    impl typist::engine::ActionSink for StopAfter {
        fn emit(&mut self, action: Action) -> typist::Result<()> {
            self.actions.push(action);
            Ok(())
        }

        fn cancelled(&self) -> bool {
            self.actions.len() >= self.limit
        }
    }

    let mut rng = StdRng::seed_from_u64(8);
    let mut engine = Engine::new(&config(0.0), &Tuning::default(), &mut rng).unwrap();
    let mut sink = StopAfter {
        actions: Vec::new(),
        limit: 10,
    };
    let outcome = engine.type_text(PROSE, &mut sink, &mut rng).unwrap();

    assert_eq!(outcome, RunOutcome::Cancelled);
    assert!(sink.actions.len() < 20);
}

#[test]
fn oversized_pause_tuning_is_rejected_before_typing() {
    let tuning = Tuning {
        sentence_pause_ms: MsRange::new(1e300, 1e300),
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(31);
    let result = generate_plan("Hi. there", &config(0.0), &tuning, &mut rng);
    assert!(matches!(
        result,
        Err(TypistError::InvalidTuning {
            name: "sentence_pause_ms",
            ..
        })
    ));
}

#[test]
fn huge_backspace_factor_saturates_instead_of_panicking() {
    let tuning = Tuning {
        backspace_speed_factor: 1e300,
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(32);
    let plan = generate_plan("abcdefgh ijklmnop", &config(0.5), &tuning, &mut rng).unwrap();
    assert_eq!(simulate_typed_text(&plan.actions), "abcdefgh ijklmnop");
}

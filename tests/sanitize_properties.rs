use pretty_assertions::assert_eq;

use typist::sanitize::{drop_set, sanitize, sanitize_bytes};

const SAMPLES: &[&str] = &[
    "plain ascii text.",
    "Hello\u{2014}World\u{200B}!",
    "\u{201C}smart quotes\u{201D} and \u{2018}single\u{2019}",
    "line one\r\nline two\rline three\n",
    "zero\u{200D}width\u{FEFF} joiners and\u{00A0}nbsp",
    "e\u{200D}\u{0301} split by a joiner",
    "\u{0430}\u{0301} cyrillic with accent",
    "\u{FF21}\u{FF42}\u{FF43} fullwidth \u{FB01}ligature",
    "bidi \u{202E}override\u{202C} and \u{2066}isolates\u{2069}",
    "emoji \u{1F44D}\u{1F3FD} with tone and \u{2764}\u{FE0F}",
    "tabs\tand\u{0007}bells\u{007F}",
    "\u{0085}C1 next line\u{009F}",
];

#[test]
fn sanitize_is_idempotent() {
    for sample in SAMPLES {
        let once = sanitize(sample).text;
        let twice = sanitize(&once);
        assert_eq!(twice.text, once, "input {sample:?}");
        assert!(
            twice.stats.is_empty(),
            "second pass changed {sample:?}: {:?}",
            twice.stats
        );
    }
}

#[test]
fn each_dropped_codepoint_is_removed_and_counted() {
    let controls = (0u32..=0x1F)
        .filter_map(char::from_u32)
        .filter(|c| !matches!(c, '\n' | '\r' | '\t'))
        .chain(std::iter::once('\u{7F}'));

    for c in drop_set().chain(controls) {
        let out = sanitize(&c.to_string());
        assert!(out.text.is_empty(), "U+{:04X} survived sanitizing", c as u32);
        assert_eq!(out.stats.dropped.get(&c), Some(&1), "U+{:04X}", c as u32);
        assert!(out.stats.replaced.is_empty(), "U+{:04X}", c as u32);
    }
}

#[test]
fn invalid_utf8_is_replaced_then_dropped() {
    let out = sanitize_bytes(b"Hi \xff there\n");
    assert_eq!(out.text, "Hi  there\n");
    assert_eq!(out.stats.dropped.get(&'\u{FFFD}'), Some(&1));
}

#[test]
fn line_endings_are_unix() {
    let out = sanitize("a\r\nb\rc\n\r\nd");
    assert_eq!(out.text, "a\nb\nc\n\nd");
    assert!(!out.text.contains('\r'));
    assert_eq!(out.returns(), 4);
}

#[test]
fn dash_and_zero_width_space() {
    let out = sanitize("Hello\u{2014}World\u{200B}!");
    assert_eq!(out.text, "Hello-World!");
    assert_eq!(out.stats.replaced.get(&'\u{2014}'), Some(&1));
    assert_eq!(out.stats.dropped.get(&'\u{200B}'), Some(&1));
}

#[test]
fn exotic_spaces_are_not_collapsed() {
    let out = sanitize("a\u{2003}\u{2003}b");
    assert_eq!(out.text, "a  b");
}

use std::collections::BTreeMap;
use std::fmt::Write as _;

use unicode_normalization::UnicodeNormalization;

const REPLACEMENTS: &[(char, char)] = &[
    // Dashes / hyphens
    ('\u{2010}', '-'),
    ('\u{2011}', '-'),
    ('\u{2012}', '-'),
    ('\u{2013}', '-'),
    ('\u{2014}', '-'),
    ('\u{2212}', '-'),
    // Quotes
    ('\u{2018}', '\''),
    ('\u{2019}', '\''),
    ('\u{201A}', '\''),
    ('\u{201B}', '\''),
    ('\u{2032}', '\''),
    ('\u{201C}', '"'),
    ('\u{201D}', '"'),
    ('\u{201E}', '"'),
    ('\u{201F}', '"'),
    ('\u{2033}', '"'),
    ('\u{FF02}', '"'),
    // Slashes
    ('\u{2215}', '/'),
    ('\u{FF0F}', '/'),
    // Dots
    ('\u{2024}', '.'),
    ('\u{2027}', '.'),
    // Exotic spaces; counts are kept, runs are not collapsed
    ('\u{00A0}', ' '),
    ('\u{1680}', ' '),
    ('\u{2000}', ' '),
    ('\u{2001}', ' '),
    ('\u{2002}', ' '),
    ('\u{2003}', ' '),
    ('\u{2004}', ' '),
    ('\u{2005}', ' '),
    ('\u{2006}', ' '),
    ('\u{2007}', ' '),
    ('\u{2008}', ' '),
    ('\u{2009}', ' '),
    ('\u{200A}', ' '),
    ('\u{202F}', ' '),
    ('\u{205F}', ' '),
    ('\u{3000}', ' '),
    // Look-alike letters
    ('\u{0430}', 'a'),
    ('\u{0435}', 'e'),
    ('\u{043E}', 'o'),
    ('\u{0440}', 'p'),
    ('\u{03B5}', 'e'),
];

const DROP_CODEPOINTS: &[u32] = &[
    // Zero-width / invisibles
    0x200B, 0x200C, 0x200D, 0x2060, 0xFEFF,
    // Soft hyphen and invisible operators
    0x00AD, 0x2061, 0x2062, 0x2063, 0x2064,
    // Bidi controls
    0x200E, 0x200F, 0x202A, 0x202B, 0x202C, 0x202D, 0x202E, 0x2066, 0x2067, 0x2068, 0x2069,
    // Mongolian vowel separator
    0x180E,
    // Specials
    0xFFF9, 0xFFFA, 0xFFFB, 0xFFFC, 0xFFFD,
];

const DROP_RANGES: &[(u32, u32)] = &[
    (0x0080, 0x009F),   // C1 controls
    (0xFE00, 0xFE0F),   // variation selectors
    (0xE0100, 0xE01EF), // variation selectors supplement
    (0x1F3FB, 0x1F3FF), // emoji skin tone modifiers
    (0x206A, 0x206F),   // deprecated formatting controls
];

const DEL: u32 = 0x7F;

/// Every codepoint the sanitizer removes outside the C0 block.
pub fn drop_set() -> impl Iterator<Item = char> {
    DROP_CODEPOINTS
        .iter()
        .copied()
        .chain(DROP_RANGES.iter().flat_map(|&(lo, hi)| lo..=hi))
        .filter_map(char::from_u32)
}

pub fn is_dropped(c: char) -> bool {
    let cp = c as u32;
    DROP_CODEPOINTS.contains(&cp) || DROP_RANGES.iter().any(|&(lo, hi)| (lo..=hi).contains(&cp))
}

pub fn replacement_for(c: char) -> Option<char> {
    REPLACEMENTS
        .iter()
        .find_map(|&(from, to)| (from == c).then_some(to))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizeStats {
    pub replaced: BTreeMap<char, usize>,
    pub dropped: BTreeMap<char, usize>,
}

impl SanitizeStats {
    pub fn is_empty(&self) -> bool {
        self.replaced.is_empty() && self.dropped.is_empty()
    }

    pub fn replaced_total(&self) -> usize {
        self.replaced.values().sum()
    }

    pub fn dropped_total(&self) -> usize {
        self.dropped.values().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedText {
    pub text: String,
    pub stats: SanitizeStats,
}

impl SanitizedText {
    pub fn returns(&self) -> usize {
        self.text.chars().filter(|&c| c == '\n').count()
    }

    pub fn tabs(&self) -> usize {
        self.text.chars().filter(|&c| c == '\t').count()
    }

    /// Human-readable summary of what the cleaner changed.
    pub fn report(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "Replaced chars: {}", self.stats.replaced_total());
        let mut replaced: Vec<_> = self.stats.replaced.iter().collect();
        replaced.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        for (c, count) in replaced {
            let shown = if c.is_whitespace() {
                "SPACE".to_string()
            } else {
                c.to_string()
            };
            let _ = writeln!(out, "  U+{:04X} '{shown}': {count} -> replaced", *c as u32);
        }

        let _ = writeln!(out, "Dropped chars: {}", self.stats.dropped_total());
        let mut dropped: Vec<_> = self.stats.dropped.iter().collect();
        dropped.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        for (c, count) in dropped {
            let _ = writeln!(out, "  U+{:04X}: {count} -> removed", *c as u32);
        }

        let _ = writeln!(out, "Encoded returns: {}", self.returns());
        let _ = write!(out, "Encoded tabs: {}", self.tabs());
        out
    }
}

/// Sanitize raw file bytes. Invalid UTF-8 decodes to U+FFFD, which is then dropped
/// like any other special.
pub fn sanitize_bytes(raw: &[u8]) -> SanitizedText {
    sanitize(&String::from_utf8_lossy(raw))
}

pub fn sanitize(raw: &str) -> SanitizedText {
    let mut stats = SanitizeStats::default();
    let mut out = String::with_capacity(raw.len());

    for c in raw.nfkc() {
        let cp = c as u32;

        if cp <= 0x1F || cp == DEL {
            if matches!(c, '\n' | '\r' | '\t') {
                out.push(c);
            } else {
                *stats.dropped.entry(c).or_default() += 1;
            }
            continue;
        }

        if is_dropped(c) {
            *stats.dropped.entry(c).or_default() += 1;
            continue;
        }

        if let Some(to) = replacement_for(c) {
            *stats.replaced.entry(c).or_default() += 1;
            out.push(to);
            continue;
        }

        out.push(c);
    }

    // Dropping a starter such as U+200D, or folding a look-alike letter, can leave
    // a base letter next to a combining mark; recompose so a second pass has
    // nothing left to do.
    let text = if stats.is_empty() {
        normalize_line_endings(&out)
    } else {
        normalize_line_endings(&out).nfkc().collect()
    };

    SanitizedText { text, stats }
}

fn normalize_line_endings(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    out
}

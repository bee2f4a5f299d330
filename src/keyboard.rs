use rand::Rng;

use crate::model::{Key, Modifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub keycode: u32,
    pub shift: bool,
}

// Linux evdev keycodes (see linux/input-event-codes.h)
pub const KEY_BACKSPACE: u32 = 14;
pub const KEY_TAB: u32 = 15;
pub const KEY_ENTER: u32 = 28;
pub const KEY_LEFTCTRL: u32 = 29;
pub const KEY_LEFTSHIFT: u32 = 42;
pub const KEY_RIGHTSHIFT: u32 = 54;
pub const KEY_LEFTALT: u32 = 56;
pub const KEY_SPACE: u32 = 57;
pub const KEY_KPENTER: u32 = 96;
pub const KEY_RIGHTCTRL: u32 = 97;
pub const KEY_RIGHTALT: u32 = 100;

/// US layout, one entry per physical key: (evdev keycode, unshifted, shifted).
const US_KEYS: &[(u32, char, char)] = &[
    (41, '`', '~'),
    (2, '1', '!'),
    (3, '2', '@'),
    (4, '3', '#'),
    (5, '4', '$'),
    (6, '5', '%'),
    (7, '6', '^'),
    (8, '7', '&'),
    (9, '8', '*'),
    (10, '9', '('),
    (11, '0', ')'),
    (12, '-', '_'),
    (13, '=', '+'),
    (16, 'q', 'Q'),
    (17, 'w', 'W'),
    (18, 'e', 'E'),
    (19, 'r', 'R'),
    (20, 't', 'T'),
    (21, 'y', 'Y'),
    (22, 'u', 'U'),
    (23, 'i', 'I'),
    (24, 'o', 'O'),
    (25, 'p', 'P'),
    (26, '[', '{'),
    (27, ']', '}'),
    (43, '\\', '|'),
    (30, 'a', 'A'),
    (31, 's', 'S'),
    (32, 'd', 'D'),
    (33, 'f', 'F'),
    (34, 'g', 'G'),
    (35, 'h', 'H'),
    (36, 'j', 'J'),
    (37, 'k', 'K'),
    (38, 'l', 'L'),
    (39, ';', ':'),
    (40, '\'', '"'),
    (44, 'z', 'Z'),
    (45, 'x', 'X'),
    (46, 'c', 'C'),
    (47, 'v', 'V'),
    (48, 'b', 'B'),
    (49, 'n', 'N'),
    (50, 'm', 'M'),
    (51, ',', '<'),
    (52, '.', '>'),
    (53, '/', '?'),
];

/// Keystroke that produces `c` on a US layout, if any.
pub fn char_to_keystroke(c: char) -> Option<KeyStroke> {
    match c {
        ' ' => {
            return Some(KeyStroke {
                keycode: KEY_SPACE,
                shift: false,
            })
        }
        '\n' => {
            return Some(KeyStroke {
                keycode: KEY_ENTER,
                shift: false,
            })
        }
        '\t' => {
            return Some(KeyStroke {
                keycode: KEY_TAB,
                shift: false,
            })
        }
        _ => {}
    }

    US_KEYS.iter().find_map(|&(keycode, plain, shifted)| {
        if c == plain {
            Some(KeyStroke {
                keycode,
                shift: false,
            })
        } else if c == shifted {
            Some(KeyStroke {
                keycode,
                shift: true,
            })
        } else {
            None
        }
    })
}

pub fn keycode_for_key(key: Key) -> u32 {
    match key {
        Key::Return => KEY_ENTER,
        Key::KeypadEnter => KEY_KPENTER,
        Key::Tab => KEY_TAB,
        Key::Backspace => KEY_BACKSPACE,
    }
}

pub fn keycode_for_modifier(modifier: Modifier) -> u32 {
    match modifier {
        Modifier::Shift => KEY_LEFTSHIFT,
        Modifier::Ctrl => KEY_LEFTCTRL,
        Modifier::Alt => KEY_LEFTALT,
    }
}

/// Keys physically next to `c` (lowercase base) on a QWERTY keyboard.
pub fn qwerty_neighbors(c: char) -> Option<&'static [char]> {
    let neighbors: &'static [char] = match c.to_ascii_lowercase() {
        'a' => &['q', 'w', 's', 'z', 'x'],
        'b' => &['v', 'g', 'h', 'n'],
        'c' => &['x', 'd', 'f', 'v'],
        'd' => &['s', 'e', 'r', 'f', 'c', 'x'],
        'e' => &['w', 's', 'd', 'r'],
        'f' => &['d', 'r', 't', 'g', 'v', 'c'],
        'g' => &['f', 't', 'y', 'h', 'b', 'v'],
        'h' => &['g', 'y', 'u', 'j', 'n', 'b'],
        'i' => &['u', 'j', 'k', 'o'],
        'j' => &['h', 'u', 'i', 'k', 'm', 'n'],
        'k' => &['j', 'i', 'o', 'l', ',', 'm'],
        'l' => &['k', 'o', 'p', ';', '.'],
        'm' => &['n', 'j', 'k', ','],
        'n' => &['b', 'h', 'j', 'm'],
        'o' => &['i', 'k', 'l', 'p'],
        'p' => &['o', 'l', '['],
        'q' => &['w', 'a'],
        'r' => &['e', 'd', 'f', 't'],
        's' => &['a', 'w', 'e', 'd', 'x', 'z'],
        't' => &['r', 'f', 'g', 'y'],
        'u' => &['y', 'h', 'j', 'i'],
        'v' => &['c', 'f', 'g', 'b'],
        'w' => &['q', 'a', 's', 'e'],
        'x' => &['z', 's', 'd', 'c'],
        'y' => &['t', 'g', 'h', 'u'],
        'z' => &['a', 's', 'x'],
        '1' => &['2', 'q'],
        '2' => &['1', '3', 'q', 'w'],
        '3' => &['2', '4', 'w', 'e'],
        '4' => &['3', '5', 'e', 'r'],
        '5' => &['4', '6', 'r', 't'],
        '6' => &['5', '7', 't', 'y'],
        '7' => &['6', '8', 'y', 'u'],
        '8' => &['7', '9', 'u', 'i'],
        '9' => &['8', '0', 'i', 'o'],
        '0' => &['9', 'o', 'p'],
        _ => return None,
    };
    Some(neighbors)
}

/// A random QWERTY neighbor of `c`, uppercased when `c` is uppercase.
pub fn qwerty_adjacent_char(c: char, rng: &mut impl Rng) -> Option<char> {
    let neighbors = qwerty_neighbors(c)?;
    let chosen = neighbors[rng.gen_range(0..neighbors.len())];
    Some(if c.is_ascii_uppercase() {
        chosen.to_ascii_uppercase()
    } else {
        chosen
    })
}

/// Whether a simulated mistake may land on `c`.
pub fn is_typo_eligible(c: char) -> bool {
    if matches!(c, ' ' | '\n' | '\t') {
        return false;
    }
    c.is_alphabetic() || qwerty_neighbors(c).is_some()
}

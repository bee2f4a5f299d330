use std::fmt::Display;

use tracing::{debug, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt as _, GetInputFocusReply};
use x11rb::protocol::xtest::ConnectionExt as _;
use x11rb::protocol::{xproto, xtest};
use x11rb::rust_connection::RustConnection;

use crate::error::{Result, TypistError};
use crate::keyboard::{
    char_to_keystroke, keycode_for_key, keycode_for_modifier, KEY_LEFTALT, KEY_LEFTCTRL,
    KEY_LEFTSHIFT, KEY_RIGHTALT, KEY_RIGHTCTRL, KEY_RIGHTSHIFT,
};
use crate::model::{Key, Modifier};
use crate::playback::Injector;

// Released on start and after an abort. If the user is physically holding one of
// these the target app may briefly disagree about modifier state.
const COMMON_MODIFIER_KEYCODES: [u32; 6] = [
    KEY_LEFTSHIFT,
    KEY_RIGHTSHIFT,
    KEY_LEFTCTRL,
    KEY_RIGHTCTRL,
    KEY_LEFTALT,
    KEY_RIGHTALT,
];

fn context<E: Display>(what: &'static str) -> impl FnOnce(E) -> TypistError {
    move |err| TypistError::injector(format!("{what}: {err}"))
}

fn unavailable<E: Display>(what: &'static str) -> impl FnOnce(E) -> TypistError {
    move |err| TypistError::BackendUnavailable(format!("{what}: {err}"))
}

fn evdev_to_x11_keycode(evdev_keycode: u32) -> Result<u8> {
    // On most Linux Xorg setups, X11 keycodes are evdev + 8.
    let x11 = evdev_keycode
        .checked_add(8)
        .ok_or_else(|| TypistError::injector("evdev keycode overflow"))?;
    u8::try_from(x11).map_err(|_| {
        TypistError::injector(format!(
            "evdev keycode {evdev_keycode} out of range for X11"
        ))
    })
}

fn query_xtest(conn: &impl Connection) -> Result<()> {
    let ext = conn
        .extension_information(xtest::X11_EXTENSION_NAME)
        .map_err(unavailable("failed to query X11 extension info"))?;

    if ext.is_none() {
        return Err(TypistError::BackendUnavailable(
            "X11 backend requires the XTEST extension (not present on this X server)".to_string(),
        ));
    }

    let version = conn
        .xtest_get_version(2, 2)
        .ok()
        .and_then(|cookie| cookie.reply().ok());
    if let Some(v) = version {
        debug!(major = v.major_version, minor = v.minor_version, "XTEST available");
    }

    Ok(())
}

fn get_focus(conn: &impl Connection) -> Result<GetInputFocusReply> {
    conn.get_input_focus()
        .map_err(context("failed to request input focus"))?
        .reply()
        .map_err(context("failed to read input focus reply"))
}

fn keysyms_for_keycode(conn: &impl Connection, keycode: u8) -> Result<(u32, u32)> {
    let reply = conn
        .get_keyboard_mapping(keycode, 1)
        .map_err(context("failed to request keyboard mapping"))?
        .reply()
        .map_err(context("failed to read keyboard mapping"))?;

    if reply.keysyms_per_keycode == 0 {
        return Err(TypistError::BackendUnavailable(
            "X server returned 0 keysyms per keycode".to_string(),
        ));
    }

    let at = |i: usize| reply.keysyms.get(i).copied().unwrap_or(x11rb::NO_SYMBOL);
    Ok((at(0), at(1)))
}

/// Only a US layout is supported. Check a handful of representative keys; for
/// Latin-1 the keysym equals the character code.
fn validate_us_keymap(conn: &impl Connection) -> Result<()> {
    const CHECKS: [(char, char); 7] = [
        ('a', 'A'),
        ('q', 'Q'),
        ('1', '!'),
        ('-', '_'),
        ('\'', '"'),
        ('[', '{'),
        (']', '}'),
    ];

    for (plain, shifted) in CHECKS {
        let Some(stroke) = char_to_keystroke(plain) else {
            continue;
        };
        let keycode = evdev_to_x11_keycode(stroke.keycode)?;
        let (got0, got1) = keysyms_for_keycode(conn, keycode)?;

        if got0 == x11rb::NO_SYMBOL || got1 == x11rb::NO_SYMBOL {
            return Err(TypistError::BackendUnavailable(format!(
                "could not validate the X server keymap: keycode {keycode} returned NoSymbol ({got0:#x}/{got1:#x}). This backend assumes X11 keycodes are evdev+8 and requires a US keymap."
            )));
        }
        if got0 != plain as u32 || got1 != shifted as u32 {
            return Err(TypistError::BackendUnavailable(format!(
                "X11 backend requires a US keyboard layout, but the X server keymap does not match (keycode {keycode}: got {got0:#x}/{got1:#x}). Try `setxkbmap us`."
            )));
        }
    }

    Ok(())
}

/// Synthesizes key events through the XTEST extension into whichever window has
/// input focus.
pub struct X11Injector {
    conn: RustConnection,
    root: xproto::Window,
}

impl X11Injector {
    /// Connect, check XTEST and the keymap, require explicit focus, and start from
    /// a neutral modifier state.
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) =
            x11rb::connect(None).map_err(unavailable("failed to connect to X11"))?;
        query_xtest(&conn)?;
        validate_us_keymap(&conn)?;

        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or_else(|| TypistError::BackendUnavailable("invalid X11 screen index".to_string()))?;

        let focus = get_focus(&conn)?;
        // PointerRoot: focus follows the pointer instead of a specific window.
        const POINTER_ROOT: xproto::Window = 1;
        if focus.focus == x11rb::NONE {
            return Err(TypistError::BackendUnavailable(
                "no X11 input focus detected; click into the target window before starting"
                    .to_string(),
            ));
        }
        if focus.focus == POINTER_ROOT {
            return Err(TypistError::BackendUnavailable(
                "X11 input focus is set to PointerRoot; click into the target window to give it explicit focus before starting".to_string(),
            ));
        }

        let mut injector = Self { conn, root };
        injector.release_modifiers();
        Ok(injector)
    }

    fn send(&self, evdev_keycode: u32, pressed: bool) -> Result<()> {
        let keycode = evdev_to_x11_keycode(evdev_keycode)?;
        let type_ = if pressed {
            xproto::KEY_PRESS_EVENT
        } else {
            xproto::KEY_RELEASE_EVENT
        };
        self.conn
            .xtest_fake_input(type_, keycode, x11rb::CURRENT_TIME, self.root, 0, 0, 0)
            .map_err(context("failed to send XTEST fake input"))?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.conn
            .flush()
            .map_err(context("failed to flush X11 connection"))
    }

    fn tap(&self, evdev_keycode: u32) -> Result<()> {
        self.send(evdev_keycode, true)?;
        self.send(evdev_keycode, false)?;
        self.flush()
    }
}

impl Injector for X11Injector {
    fn type_character(&mut self, ch: char) -> Result<()> {
        let Some(stroke) = char_to_keystroke(ch) else {
            warn!(ch = %ch.escape_unicode(), "no US keymap entry; skipping character");
            return Ok(());
        };

        if !stroke.shift {
            return self.tap(stroke.keycode);
        }
        self.send(KEY_LEFTSHIFT, true)?;
        let typed = self.tap(stroke.keycode);
        let released = self.send(KEY_LEFTSHIFT, false).and_then(|_| self.flush());
        typed.and(released)
    }

    fn press_key(&mut self, key: Key) -> Result<()> {
        self.tap(keycode_for_key(key))
    }

    fn key_down(&mut self, modifier: Modifier) -> Result<()> {
        self.send(keycode_for_modifier(modifier), true)?;
        self.flush()
    }

    fn key_up(&mut self, modifier: Modifier) -> Result<()> {
        self.send(keycode_for_modifier(modifier), false)?;
        self.flush()
    }

    fn release_modifiers(&mut self) {
        for keycode in COMMON_MODIFIER_KEYCODES {
            let _ = self.send(keycode, false);
        }
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keycodes_are_offset_by_eight() {
        assert_eq!(evdev_to_x11_keycode(KEY_LEFTSHIFT).unwrap(), 50);
        assert!(evdev_to_x11_keycode(300).is_err());
    }
}

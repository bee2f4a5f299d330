use std::io::{self, Write};

use crate::error::Result;
use crate::model::{Key, Modifier};
use crate::playback::Injector;

/// Renders keystrokes as terminal output. Backspace erases the previous cell and
/// a newline key held with Ctrl or Alt prints nothing, matching what an editor shows.
pub struct ConsoleInjector<W: Write> {
    out: W,
    held: Vec<Modifier>,
}

impl ConsoleInjector<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleInjector<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            held: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, s: &str) -> Result<()> {
        self.out.write_all(s.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }

    fn command_held(&self) -> bool {
        self.held
            .iter()
            .any(|m| matches!(m, Modifier::Ctrl | Modifier::Alt))
    }
}

impl<W: Write> Injector for ConsoleInjector<W> {
    fn type_character(&mut self, ch: char) -> Result<()> {
        let mut buf = [0u8; 4];
        self.write(ch.encode_utf8(&mut buf))
    }

    fn press_key(&mut self, key: Key) -> Result<()> {
        match key {
            Key::Return | Key::KeypadEnter if self.command_held() => Ok(()),
            Key::Return | Key::KeypadEnter => self.write("\n"),
            Key::Tab => self.write("\t"),
            Key::Backspace => self.write("\u{8} \u{8}"),
        }
    }

    fn key_down(&mut self, modifier: Modifier) -> Result<()> {
        if !self.held.contains(&modifier) {
            self.held.push(modifier);
        }
        Ok(())
    }

    fn key_up(&mut self, modifier: Modifier) -> Result<()> {
        self.held.retain(|&m| m != modifier);
        Ok(())
    }
}

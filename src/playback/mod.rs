pub mod backends;
mod util;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use tracing::{debug, warn};

use crate::engine::ActionSink;
use crate::error::{Result, TypistError};
use crate::model::{Action, Key, Modifier, Plan};
use crate::trace::plan_console_trace;

pub use util::sleep_interruptible;
use util::print_trace_line;

/// Delivers individual input events to whatever is receiving the keystrokes.
pub trait Injector {
    fn type_character(&mut self, ch: char) -> Result<()>;

    fn press_key(&mut self, key: Key) -> Result<()>;

    fn key_down(&mut self, modifier: Modifier) -> Result<()>;

    fn key_up(&mut self, modifier: Modifier) -> Result<()>;

    /// Best-effort release of every modifier, used after an abort. Releases are
    /// sent even for modifiers that are not down.
    fn release_modifiers(&mut self) {
        for modifier in Modifier::ALL {
            if let Err(err) = self.key_up(modifier) {
                warn!(modifier = modifier.name(), %err, "failed to release modifier");
            }
        }
    }
}

impl<T: Injector + ?Sized> Injector for &mut T {
    fn type_character(&mut self, ch: char) -> Result<()> {
        (**self).type_character(ch)
    }

    fn press_key(&mut self, key: Key) -> Result<()> {
        (**self).press_key(key)
    }

    fn key_down(&mut self, modifier: Modifier) -> Result<()> {
        (**self).key_down(modifier)
    }

    fn key_up(&mut self, modifier: Modifier) -> Result<()> {
        (**self).key_up(modifier)
    }

    fn release_modifiers(&mut self) {
        (**self).release_modifiers()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackBackend {
    Auto,
    X11,
    Console,
}

fn env_is_set(name: &str) -> bool {
    std::env::var_os(name)
        .map(|v| !v.is_empty())
        .unwrap_or(false)
}

fn backend_unavailable_message() -> String {
    let xdg_session_type = std::env::var("XDG_SESSION_TYPE").unwrap_or_default();

    let mut parts = Vec::new();
    if env_is_set("WAYLAND_DISPLAY") {
        parts.push("WAYLAND_DISPLAY is set".to_string());
    }
    if env_is_set("DISPLAY") {
        parts.push("DISPLAY is set".to_string());
    }
    if !xdg_session_type.is_empty() {
        parts.push(format!("XDG_SESSION_TYPE={xdg_session_type}"));
    }

    if parts.is_empty() {
        "No X11 display detected.".to_string()
    } else {
        format!("Detected environment: {}", parts.join(", "))
    }
}

/// Pick a concrete backend. `Auto` chooses X11 when a display is available and
/// this build supports it; the console backend is only used when asked for.
pub fn resolve_backend(requested: PlaybackBackend) -> Result<PlaybackBackend> {
    match requested {
        PlaybackBackend::Console => Ok(PlaybackBackend::Console),
        PlaybackBackend::X11 => {
            if cfg!(feature = "x11") {
                Ok(PlaybackBackend::X11)
            } else {
                Err(TypistError::BackendUnavailable(
                    "X11 backend requested but is disabled in this build (rebuild with `--features x11`)."
                        .to_string(),
                ))
            }
        }
        PlaybackBackend::Auto => {
            if cfg!(feature = "x11") && env_is_set("DISPLAY") {
                return Ok(PlaybackBackend::X11);
            }
            Err(TypistError::BackendUnavailable(format!(
                "no supported playback backend detected. {}\nPass `--backend console` to print the keystrokes instead.",
                backend_unavailable_message()
            )))
        }
    }
}

/// Install a Ctrl+C handler and return the flag it sets.
pub fn install_interrupt_handler() -> Result<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .map_err(|err| TypistError::injector(format!("failed to install Ctrl+C handler: {err}")))?;
    Ok(stop)
}

/// Print a countdown to stderr so the user can focus the target window.
pub fn countdown(stop: &AtomicBool, delay: Duration) -> Result<()> {
    if delay.is_zero() {
        return Ok(());
    }

    eprintln!(
        "Focus the target window. Starting in {:.1}s...",
        delay.as_secs_f64()
    );
    let whole = delay.as_secs();
    sleep_interruptible(stop, delay - Duration::from_secs(whole));
    for remaining in (1..=whole).rev() {
        if stop.load(Ordering::SeqCst) {
            return Err(TypistError::Aborted);
        }
        eprintln!("{remaining}...");
        sleep_interruptible(stop, Duration::from_secs(1));
    }

    if stop.load(Ordering::SeqCst) {
        return Err(TypistError::Aborted);
    }
    Ok(())
}

/// An [`ActionSink`] that performs each action immediately through an [`Injector`].
///
/// Sleeps block in 50 ms slices so an abort is noticed quickly. Once the stop
/// flag is set every further action is dropped; [`Player::finish`] then releases
/// modifiers and reports the abort.
pub struct Player<I: Injector> {
    injector: I,
    stop: Arc<AtomicBool>,
}

impl<I: Injector> Player<I> {
    pub fn new(injector: I, stop: Arc<AtomicBool>) -> Self {
        Self { injector, stop }
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn perform(&mut self, action: &Action) -> Result<()> {
        if self.is_stopped() {
            return Ok(());
        }

        match action {
            Action::Sleep { duration } => {
                sleep_interruptible(&self.stop, *duration);
                Ok(())
            }
            Action::TypeChar { ch } => self.injector.type_character(*ch),
            Action::PressKey { key } => self.injector.press_key(*key),
            Action::KeyChord { key, modifier } => {
                // No abort check inside the chord: the modifier always comes back up.
                self.injector.key_down(*modifier)?;
                let pressed = self.injector.press_key(*key);
                let released = self.injector.key_up(*modifier);
                pressed.and(released)
            }
        }
    }

    /// Release modifiers if the run was aborted. Returns [`TypistError::Aborted`] in
    /// that case so callers can exit non-zero.
    pub fn finish(mut self) -> Result<I> {
        if self.is_stopped() {
            eprintln!("Aborted. Attempting to reset modifiers...");
            self.injector.release_modifiers();
            return Err(TypistError::Aborted);
        }
        Ok(self.injector)
    }
}

impl<I: Injector> ActionSink for Player<I> {
    fn emit(&mut self, action: Action) -> Result<()> {
        self.perform(&action)
    }

    fn cancelled(&self) -> bool {
        self.is_stopped()
    }
}

/// Replay a recorded plan, optionally printing the console trace as it goes.
pub fn play_plan<I: Injector>(
    plan: &Plan,
    injector: I,
    stop: Arc<AtomicBool>,
    trace: bool,
) -> Result<I> {
    let mut player = Player::new(injector, stop);

    let trace_events = trace.then(|| plan_console_trace(&plan.actions));
    let mut next_trace_event = 0usize;

    debug!(actions = plan.actions.len(), "replaying plan");
    for (action_index, action) in plan.actions.iter().enumerate() {
        if player.is_stopped() {
            break;
        }

        if let Some(events) = &trace_events {
            while next_trace_event < events.len()
                && events[next_trace_event].action_index == action_index
            {
                print_trace_line(&events[next_trace_event].line);
                next_trace_event += 1;
            }
        }

        player.perform(action)?;
    }

    player.finish()
}

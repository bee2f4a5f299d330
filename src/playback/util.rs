use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const SLICE: Duration = Duration::from_millis(50);

/// Sleep for `total`, waking every 50 ms to check `stop`. Returns early once it is set.
pub fn sleep_interruptible(stop: &AtomicBool, total: Duration) {
    let mut remaining = total;
    while !remaining.is_zero() {
        if stop.load(Ordering::SeqCst) {
            return;
        }
        let step = remaining.min(SLICE);
        std::thread::sleep(step);
        remaining -= step;
    }
}

pub(crate) fn print_trace_line(line: &str) {
    const RESET: &str = "\x1b[0m";
    const TYPING: &str = "\x1b[34m";
    const REPLACE: &str = "\x1b[33m";

    if let Some(rest) = line.strip_prefix("Typing") {
        eprintln!("{TYPING}Typing{RESET}{rest}");
        return;
    }
    for verb in ["Replace", "Retype", "Remove"] {
        if let Some(rest) = line.strip_prefix(verb) {
            eprintln!("{REPLACE}{verb}{RESET}{rest}");
            return;
        }
    }
    eprintln!("{line}");
}

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use typist::config::RunConfig;
use typist::engine::{generate_plan, Engine, RunOutcome};
use typist::model::{NewlineMode, Plan, PLAN_VERSION};
use typist::playback::backends::console::ConsoleInjector;
use typist::playback::{
    countdown, install_interrupt_handler, play_plan, resolve_backend, Injector, PlaybackBackend,
    Player,
};
use typist::sanitize::{sanitize_bytes, SanitizedText};
use typist::sim;
use typist::tokens::tokenize;
use typist::tuning::Tuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PlaybackBackendArg {
    Auto,
    X11,
    Console,
}

impl PlaybackBackendArg {
    fn to_library(self) -> PlaybackBackend {
        match self {
            PlaybackBackendArg::Auto => PlaybackBackend::Auto,
            PlaybackBackendArg::X11 => PlaybackBackend::X11,
            PlaybackBackendArg::Console => PlaybackBackend::Console,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum NewlineArg {
    Return,
    ShiftReturn,
    KeypadEnter,
}

impl NewlineArg {
    fn to_library(self) -> NewlineMode {
        match self {
            NewlineArg::Return => NewlineMode::Return,
            NewlineArg::ShiftReturn => NewlineMode::ShiftReturn,
            NewlineArg::KeypadEnter => NewlineMode::KeypadEnter,
        }
    }
}

#[derive(Debug, Args, Clone)]
struct RunArgs {
    /// Typing speed in words per second (one word = 5 characters)
    #[arg(long, default_value_t = 40.0)]
    wps: f64,

    /// Seconds to wait before the first keystroke
    #[arg(long, default_value_t = 5.0)]
    start_delay: f64,

    /// Key used for each newline in the text
    #[arg(long, value_enum, default_value_t = NewlineArg::Return)]
    newline: NewlineArg,

    /// Target mistake rate per eligible character (0.0-1.0).
    ///
    /// Set to 0 for straight-through typing (no corrections at all).
    #[arg(long, default_value_t = 0.02)]
    error_rate: f64,

    /// JSON file overriding timing, mistake and pause tuning
    #[arg(long, value_name = "PATH")]
    tuning: Option<PathBuf>,
}

impl RunArgs {
    fn to_config(&self) -> Result<RunConfig> {
        let cfg = RunConfig {
            words_per_second: self.wps,
            start_delay_secs: self.start_delay,
            newline_mode: self.newline.to_library(),
            target_error_rate: self.error_rate,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn load_tuning(&self) -> Result<Tuning> {
        match &self.tuning {
            Some(path) => Tuning::load(path)
                .with_context(|| format!("failed to load tuning from {}", path.display())),
            None => Ok(Tuning::default()),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "typist")]
#[command(about = "Types text into the focused window like a person would", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Clean up text and print it, with a report of what changed
    Sanitize {
        /// Input text file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,
    },

    /// Generate a typing plan (JSON)
    Plan {
        /// Input text file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Output plan file (defaults to stdout)
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Optional RNG seed (for reproducible plans)
        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Play a plan into the currently focused window
    Play {
        /// Plan file (JSON)
        #[arg(long, value_name = "PATH")]
        plan: PathBuf,

        /// Playback backend.
        ///
        /// - auto: X11 when a display is available
        /// - x11: force X11 playback (XTEST)
        /// - console: print the keystrokes to stdout
        #[arg(long, value_enum, default_value_t = PlaybackBackendArg::Auto)]
        backend: PlaybackBackendArg,

        /// Seconds to wait before playback (defaults to the plan's start delay)
        #[arg(long)]
        start_delay: Option<f64>,

        /// Disable console typing trace output
        #[arg(long)]
        no_trace: bool,
    },

    /// Type text directly, without writing a plan
    Run {
        /// Input text file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Playback backend.
        ///
        /// - auto: X11 when a display is available
        /// - x11: force X11 playback (XTEST)
        /// - console: print the keystrokes to stdout
        #[arg(long, value_enum, default_value_t = PlaybackBackendArg::Auto)]
        backend: PlaybackBackendArg,

        /// Optional RNG seed (for debugging)
        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        run: RunArgs,
    },
}

fn read_input(path: &PathBuf) -> Result<Vec<u8>> {
    if path.as_os_str() == std::ffi::OsStr::new("-") {
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }

    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn write_output(path: &PathBuf, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn read_sanitized(input: &PathBuf) -> Result<SanitizedText> {
    let raw = read_input(input)?;
    let cleaned = sanitize_bytes(&raw);
    if !cleaned.stats.is_empty() {
        info!(
            replaced = cleaned.stats.replaced_total(),
            dropped = cleaned.stats.dropped_total(),
            "sanitized input"
        );
    }
    Ok(cleaned)
}

fn load_plan(path: &PathBuf) -> Result<Plan> {
    let json =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let plan: Plan = serde_json::from_str(&json).context("failed to parse plan JSON")?;
    if plan.version != PLAN_VERSION {
        return Err(anyhow!(
            "unsupported plan version {}; expected {PLAN_VERSION}",
            plan.version
        ));
    }
    Ok(plan)
}

fn open_injector(backend: PlaybackBackend) -> Result<Box<dyn Injector>> {
    match backend {
        PlaybackBackend::Console => Ok(Box::new(ConsoleInjector::stdout())),
        PlaybackBackend::X11 => {
            #[cfg(feature = "x11")]
            {
                let injector = typist::playback::backends::x11::X11Injector::connect()?;
                Ok(Box::new(injector))
            }

            #[cfg(not(feature = "x11"))]
            {
                Err(anyhow!(
                    "X11 backend is disabled in this build (rebuild with `--features x11`)."
                ))
            }
        }
        PlaybackBackend::Auto => Err(anyhow!("no backend resolved")),
    }
}

fn start_delay(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| anyhow!("start delay must be a non-negative number of seconds, got {secs}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    typist::logging::init_logging(cli.verbose)?;

    match cli.command {
        Command::Sanitize { input } => {
            let cleaned = read_sanitized(&input)?;
            print!("{}", cleaned.text);
            if cleaned.stats.is_empty() {
                eprintln!("No changes needed.");
            } else {
                eprintln!("{}", cleaned.report());
            }
        }
        Command::Plan {
            input,
            output,
            seed,
            run,
        } => {
            let cleaned = read_sanitized(&input)?;
            let cfg = run.to_config()?;
            let tuning = run.load_tuning()?;
            let mut rng = rng_from_seed(seed);

            let mut plan = generate_plan(&cleaned.text, &cfg, &tuning, &mut rng)?;
            plan.config.seed = seed;

            let expected = sim::expected_text(&tokenize(&cleaned.text));
            if sim::simulate_typed_text(&plan.actions) != expected {
                warn!("plan does not reproduce the input text");
            }

            let stats = sim::stats(&plan);
            eprintln!(
                "Planned: {} actions, {} keystrokes ({} backspaces, {} chords), ~{:.1} min at {:.1} words/s",
                stats.actions,
                stats.keystrokes,
                stats.backspaces,
                stats.chords,
                stats.total_sleep.as_secs_f64() / 60.0,
                plan.config.words_per_second
            );

            let json = serde_json::to_string_pretty(&plan).context("failed to serialize plan")?;
            if let Some(out) = output {
                write_output(&out, &json)?;
            } else {
                println!("{json}");
            }
        }
        Command::Play {
            plan,
            backend,
            start_delay: delay,
            no_trace,
        } => {
            // Fail fast on unsupported environments/backends.
            let backend = resolve_backend(backend.to_library())?;
            let plan = load_plan(&plan)?;

            let stats = sim::stats(&plan);
            eprintln!(
                "Playing: {} actions, {} keystrokes, ~{:.1} min",
                stats.actions,
                stats.keystrokes,
                stats.total_sleep.as_secs_f64() / 60.0
            );

            let stop = install_interrupt_handler()?;
            countdown(
                &stop,
                start_delay(delay.unwrap_or(plan.config.start_delay_secs))?,
            )?;

            let mut injector = open_injector(backend)?;
            play_plan(&plan, &mut *injector, stop, !no_trace)?;
        }
        Command::Run {
            input,
            backend,
            seed,
            run,
        } => {
            let backend = resolve_backend(backend.to_library())?;
            let cleaned = read_sanitized(&input)?;
            let cfg = run.to_config()?;
            let tuning = run.load_tuning()?;
            let mut rng = rng_from_seed(seed);
            let mut engine = Engine::new(&cfg, &tuning, &mut rng)?;

            let stop = install_interrupt_handler()?;
            countdown(&stop, cfg.start_delay())?;

            let mut injector = open_injector(backend)?;
            let mut player = Player::new(&mut *injector, stop);
            let outcome = engine.type_text(&cleaned.text, &mut player, &mut rng)?;
            player.finish()?;

            if outcome == RunOutcome::Completed {
                info!("finished typing");
            }
        }
    }

    Ok(())
}

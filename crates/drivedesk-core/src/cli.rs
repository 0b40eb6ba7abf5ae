use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::view::ViewMode;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "drivedesk",
    version,
    about = "Calendar viewport and booking window calculator for driving instructors",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "rc-file", global = true)]
    pub rc_file: Option<PathBuf>,

    #[arg(long = "bookings", global = true)]
    pub bookings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Calendar position every command works from.
#[derive(Args, Debug, Clone)]
pub struct ViewArgs {
    /// Anchor date: today, tomorrow, monday, june, +2w, 2024-06-10, ...
    #[arg(long = "date", default_value = "today")]
    pub date: String,

    /// day, week, month or agenda; defaults to calendar.view
    #[arg(
        long = "view",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<ViewMode>())
    )]
    pub view: Option<ViewMode>,

    /// Print the calendar frame as JSON instead of text.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Visible hour range for the view.
    Viewport(ViewArgs),
    /// Instants to load bookings for.
    Window(ViewArgs),
    /// Bookings inside the fetch window.
    Agenda(ViewArgs),
    /// Booking statistics for the fetch window.
    Stats(ViewArgs),
    /// Anchor date after navigating STEP times (negative goes back).
    Shift {
        #[command(flatten)]
        view: ViewArgs,

        #[arg(long = "step", default_value_t = 1, allow_hyphen_values = true)]
        step: i64,
    },
}

impl Command {
    pub fn view_args(&self) -> &ViewArgs {
        match self {
            Self::Viewport(args) | Self::Window(args) | Self::Agenda(args) | Self::Stats(args) => {
                args
            }
            Self::Shift { view, .. } => view,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Viewport(_) => "viewport",
            Self::Window(_) => "window",
            Self::Agenda(_) => "agenda",
            Self::Stats(_) => "stats",
            Self::Shift { .. } => "shift",
        }
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls positional `rc.key=value` / `rc.key:value` overrides out of the
/// argument list before clap sees it.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = rest.split_once('=').or_else(|| rest.split_once(':'));
            if let Some((k, v)) = parsed {
                let key = format!("rc.{}", k.trim());
                debug!(key = %key, value = %v, "captured positional rc override");
                overrides.push((key, v.trim().to_string()));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

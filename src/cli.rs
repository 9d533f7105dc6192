//! Command-line interface for knockstream
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Sensor streaming and knock classification
#[derive(Parser, Debug)]
#[command(
    name = "knockstream",
    version,
    about = "Sensor streaming and knock classification"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose logging (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Where the producer reads its sensors from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Generated tone plus periodic knocks
    Synthetic,
    /// Microphone channel replayed from a WAV file
    Wav(PathBuf),
}

/// Parse `synthetic` or `wav:<path>`.
fn parse_source(s: &str) -> Result<Source, String> {
    let s = s.trim();
    if s == "synthetic" {
        return Ok(Source::Synthetic);
    }
    match s.strip_prefix("wav:") {
        Some(path) if !path.is_empty() => Ok(Source::Wav(PathBuf::from(path))),
        Some(_) => Err("wav source needs a path, e.g. wav:recording.wav".to_string()),
        None => Err(format!(
            "unknown source '{}', expected 'synthetic' or 'wav:<path>'",
            s
        )),
    }
}

/// Parse a duration string.
///
/// Supports any duration format accepted by `humantime`: bare numbers (seconds),
/// single-unit (`30s`, `5m`, `250ms`), and compound (`1m30s`).
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    // Bare number → seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the producer loop and stream reduced samples to a consumer
    Stream {
        /// Sensor source: synthetic or wav:<path>
        #[arg(long, value_name = "SOURCE", default_value = "synthetic", value_parser = parse_source)]
        source: Source,

        /// Consumer address (host:port)
        #[arg(long, value_name = "ADDR")]
        endpoint: Option<String>,

        /// Stop after this long (default: run until Ctrl-C). Examples: 30s, 5m
        #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
        duration: Option<Duration>,

        /// Interval between synthetic knocks
        #[arg(long, value_name = "DURATION", default_value = "3s", value_parser = parse_duration)]
        knock_every: Duration,
    },

    /// Accept a producer over TCP and print predictions
    Serve {
        /// Address to listen on
        #[arg(long, value_name = "ADDR")]
        listen: Option<String>,

        /// Print JSON objects instead of PRED lines
        #[arg(long)]
        json: bool,
    },

    /// Classify wire lines from stdin and print predictions
    Infer {
        /// Print JSON objects instead of PRED lines
        #[arg(long)]
        json: bool,

        /// Window size (must match the classifier)
        #[arg(long, value_name = "N")]
        window_size: Option<usize>,
    },

    /// Read PRED lines from stdin and report knocks
    Detect {
        /// Label to watch
        #[arg(long, value_name = "LABEL")]
        label: Option<String>,

        /// Score at or above which a detection is reported
        #[arg(long, value_name = "SCORE")]
        threshold: Option<f32>,
    },

    /// Manage configuration
    Config {
        /// Action to perform
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the default configuration file path
    Path,
}

impl Cli {
    /// Log level filter for the `-q`/`-v` flags.
    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Warn;
        }
        match self.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

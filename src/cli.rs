use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "capsync")]
#[command(about = "Normalize caption payloads (SRT, JSON paragraphs, JSON words) and preview synchronized playback.")]
pub struct Args {
    /// Path to config TOML (defaults to ./capsync.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Normalize a caption payload and export it
    Normalize(NormalizeCmd),
    /// Print the detected payload shape and cue count
    Detect(DetectCmd),
    /// Play captions against a simulated media clock
    Play(PlayCmd),
    /// Print the effective default config as TOML and exit
    PrintDefaultConfig,
}

#[derive(Debug, Parser)]
pub struct NormalizeCmd {
    /// Input file path, or '-' for stdin
    pub input: String,

    /// Output file path (optional)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Export format
    #[arg(long, value_enum, default_value_t = Format::Srt)]
    pub to: Format,

    /// Write to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,

    /// Allow overwriting output file
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Debug, Parser)]
pub struct DetectCmd {
    /// Input file path, or '-' for stdin
    pub input: String,
}

#[derive(Debug, Parser)]
pub struct PlayCmd {
    /// Lookup key in the caption store
    #[arg(long)]
    pub key: Option<String>,

    /// Remote caption URL
    #[arg(long)]
    pub url: Option<String>,

    /// Language tag recorded when fetched captions are stored
    #[arg(long)]
    pub language: Option<String>,

    /// Media length in seconds (defaults to the end of the last cue)
    #[arg(long)]
    pub duration: Option<f64>,

    /// Playback speed multiplier
    #[arg(long, default_value_t = 1.0)]
    pub speed: f64,

    /// Start with captions turned off
    #[arg(long)]
    pub no_captions: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Format {
    Srt,
    Json,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Format::Srt => "srt",
            Format::Json => "json",
        }
    }
}

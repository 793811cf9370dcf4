use anyhow::Result;
use clap::Parser;

mod cli;
mod pipeline;

use capsync::config;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();

    let cfg = config::Config::load(args.config.as_deref())?;
    config::init_tracing(&cfg.logging, args.log_level.as_deref())?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "capsync starting");

    match args.command {
        cli::Command::Normalize(cmd) => pipeline::run_normalize(cmd, &cfg),
        cli::Command::Detect(cmd) => pipeline::run_detect(cmd, &cfg),
        cli::Command::Play(cmd) => pipeline::run_play(cmd, &cfg).await,
        cli::Command::PrintDefaultConfig => {
            let s = cfg.to_toml_pretty()?;
            print!("{s}");
            Ok(())
        }
    }
}

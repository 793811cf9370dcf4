use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

use crate::formats::words::WordGrouping;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: Logging,
    pub grouping: WordGrouping,
    pub player: PlayerCfg,
    pub store: StoreCfg,
    pub fetch: FetchCfg,
    pub formats: Formats,
}

impl Config {
    pub fn load(path_opt: Option<&Path>) -> Result<Self> {
        let default_path = Path::new("capsync.toml");
        let path = if let Some(p) = path_opt {
            Some(p)
        } else if default_path.exists() {
            Some(default_path)
        } else {
            None
        };

        let mut cfg = Config::default();

        if let Some(path) = path {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed reading config file: {}", path.display()))?;
            let parsed: Config = toml::from_str(&raw)
                .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
            cfg = parsed;
        }

        Ok(cfg)
    }

    pub fn to_toml_pretty(&self) -> Result<String> {
        let s = toml::to_string_pretty(self).context("failed serializing config as TOML")?;
        Ok(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub format: String,
    pub debug_cue_samples: usize,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            debug_cue_samples: 20,
        }
    }
}

/// Which tier of the load protocol is tried first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOrder {
    #[default]
    LocalFirst,
    RemoteFirst,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerCfg {
    pub tick_interval_ms: u64,
    pub stall_interval_ms: u64,
    pub captions_enabled: bool,
    pub load_order: LoadOrder,
}

impl Default for PlayerCfg {
    fn default() -> Self {
        Self {
            tick_interval_ms: 250,
            stall_interval_ms: 1_000,
            captions_enabled: true,
            load_order: LoadOrder::LocalFirst,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreCfg {
    pub dir: PathBuf,
    /// Language tag written with content whose source did not name one.
    pub language: String,
}

impl Default for StoreCfg {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".capsync/captions"),
            language: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchCfg {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchCfg {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: format!("capsync/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Formats {
    pub srt: SrtCfg,
    pub json: JsonCfg,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SrtCfg {
    /// Zero keeps cue text untouched.
    pub wrap_width: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonCfg {
    pub pretty: bool,
}

impl Default for JsonCfg {
    fn default() -> Self {
        Self { pretty: true }
    }
}

pub fn init_tracing(logging: &Logging, cli_override_level: Option<&str>) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = cli_override_level.unwrap_or(logging.level.as_str());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let is_json = logging.format.to_lowercase() == "json";

    // stdout carries exported captions, logs go to stderr.
    if is_json {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .event_format(fmt::format().json())
            .with_target(true)
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .pretty()
            .init();
    }

    tracing::info!(
        level = level,
        format = logging.format.as_str(),
        "logging initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [grouping]
            max_gap_secs = 0.5

            [player]
            load_order = "remote_first"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.grouping.max_gap_secs, 0.5);
        assert_eq!(cfg.grouping.max_chars, 80);
        assert_eq!(cfg.player.load_order, LoadOrder::RemoteFirst);
        assert_eq!(cfg.player.stall_interval_ms, 1_000);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn default_config_survives_toml_round_trip() {
        let cfg = Config::default();
        let s = cfg.to_toml_pretty().unwrap();
        let back: Config = toml::from_str(&s).unwrap();
        assert_eq!(back.grouping, cfg.grouping);
        assert_eq!(back.store.dir, cfg.store.dir);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/capsync.toml"))).unwrap_err();
        assert!(err.to_string().contains("failed reading config file"));
    }
}

//! Application configuration: env-overridden paths plus tunables that fall
//! back to compiled-in defaults when no `config.json` is present.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

const CONFIG_DIR_ENV: &str = "BEATIFY_CONFIG_DIR";
const DEFAULT_CONFIG_DIR: &str = "./beatify";
const CONFIG_FILE_NAME: &str = "config.json";

pub const YEAR_MIN: i32 = 1900;
pub const YEAR_MAX: i32 = 2030;
pub const MIN_NAME_LENGTH: usize = 1;
pub const MAX_NAME_LENGTH: usize = 20;
pub const MAX_PLAYERS: usize = 20;
pub const MIN_PLAYERS: usize = 1;

/// Raw, possibly-partial config document as read from disk.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    round_duration_secs: Option<u64>,
    disconnect_grace_period_secs: Option<u64>,
    intro_round_chance: Option<f64>,
    intro_duration_secs: Option<u64>,
    artist_bonus_points: Option<i32>,
    analytics_retention_days: Option<i64>,
    analytics_prune_interval: Option<u32>,
    analytics_max_detailed_records: Option<usize>,
    min_plays_for_difficulty: Option<u32>,
    correct_guess_threshold: Option<i32>,
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub config_dir: PathBuf,
    pub playlists_dir: PathBuf,
    pub analytics_path: PathBuf,
    pub stats_path: PathBuf,
    pub round_duration_secs: u64,
    pub disconnect_grace_period_secs: u64,
    pub intro_round_chance: f64,
    pub intro_duration_secs: u64,
    pub artist_bonus_points: i32,
    pub analytics_retention_days: i64,
    pub analytics_prune_interval: u32,
    pub analytics_max_detailed_records: usize,
    pub min_plays_for_difficulty: u32,
    pub correct_guess_threshold: i32,
}

impl From<(PathBuf, RawConfig)> for AppConfig {
    fn from((config_dir, raw): (PathBuf, RawConfig)) -> Self {
        Self {
            playlists_dir: config_dir.join("playlists"),
            analytics_path: config_dir.join("analytics.json"),
            stats_path: config_dir.join("stats.json"),
            config_dir,
            round_duration_secs: raw.round_duration_secs.unwrap_or(30),
            disconnect_grace_period_secs: raw.disconnect_grace_period_secs.unwrap_or(60),
            intro_round_chance: raw.intro_round_chance.unwrap_or(0.0),
            intro_duration_secs: raw.intro_duration_secs.unwrap_or(5),
            artist_bonus_points: raw.artist_bonus_points.unwrap_or(15),
            analytics_retention_days: raw.analytics_retention_days.unwrap_or(90),
            analytics_prune_interval: raw.analytics_prune_interval.unwrap_or(10),
            analytics_max_detailed_records: raw.analytics_max_detailed_records.unwrap_or(1000),
            min_plays_for_difficulty: raw.min_plays_for_difficulty.unwrap_or(3),
            correct_guess_threshold: raw.correct_guess_threshold.unwrap_or(2),
        }
    }
}

impl AppConfig {
    /// Resolve the config directory from the environment, then load
    /// `config.json` from it if present, falling back to defaults.
    pub fn load() -> Self {
        let config_dir = std::env::var(CONFIG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_DIR));

        let raw = Self::read_raw(&config_dir.join(CONFIG_FILE_NAME));
        (config_dir, raw).into()
    }

    fn read_raw(path: &Path) -> RawConfig {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded config overrides");
                    raw
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "invalid config.json, using defaults");
                    RawConfig::default()
                }
            },
            Err(_) => RawConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_applied_when_file_absent() {
        let config: AppConfig = (PathBuf::from("/nonexistent"), RawConfig::default()).into();
        assert_eq!(config.round_duration_secs, 30);
        assert_eq!(config.disconnect_grace_period_secs, 60);
        assert_eq!(config.playlists_dir, PathBuf::from("/nonexistent/playlists"));
    }

    #[test]
    fn overrides_merge_over_defaults() {
        let raw = RawConfig {
            round_duration_secs: Some(45),
            ..RawConfig::default()
        };
        let config: AppConfig = (PathBuf::from("/cfg"), raw).into();
        assert_eq!(config.round_duration_secs, 45);
        assert_eq!(config.artist_bonus_points, 15);
    }
}

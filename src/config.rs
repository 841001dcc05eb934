//! Configuration loading and management
//!
//! Handles parsing of `.questlog.toml` configuration files. The policy
//! section carries the progression thresholds ("perfect day", weekly core
//! requirements, rotation size). Defaults match the shipped policy exactly;
//! overriding them changes claim eligibility, so treat edits as a new game.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Config file name inside the data directory
pub const CONFIG_FILE: &str = ".questlog.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Progression policy thresholds
    #[serde(default)]
    pub policy: Policy,

    /// Journal normalization settings
    #[serde(default)]
    pub journal: JournalConfig,
}

impl Config {
    /// Load configuration from a data directory, falling back to defaults
    /// when the file is missing.
    pub fn load_from_dir(dir: &Path) -> Config {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Config::default();
        }
        Config::load(&path).unwrap_or_default()
    }

    /// Load configuration from an explicit path.
    pub fn load(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::InvalidConfig(format!("{}: {e}", path.display())))?;
        Ok(config)
    }

    /// Serialize the configuration to TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Progression policy thresholds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Policy {
    /// Number of cyclable quests active per week
    #[serde(default = "default_rotation_size")]
    pub rotation_size: usize,

    /// Minimum quality score for an application to count as "quality"
    #[serde(default = "default_quality_floor")]
    pub quality_floor: u8,

    /// Window after an event trigger in which applications count as "burst"
    #[serde(default = "default_burst_window_hours")]
    pub burst_window_hours: i64,

    /// Perfect-day requirements
    #[serde(default)]
    pub daily: DailyPolicy,

    /// Perfect-week (weekly core) requirements
    #[serde(default)]
    pub weekly: WeeklyPolicy,
}

fn default_rotation_size() -> usize {
    3
}

fn default_quality_floor() -> u8 {
    2
}

fn default_burst_window_hours() -> i64 {
    2
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            rotation_size: default_rotation_size(),
            quality_floor: default_quality_floor(),
            burst_window_hours: default_burst_window_hours(),
            daily: DailyPolicy::default(),
            weekly: WeeklyPolicy::default(),
        }
    }
}

/// Thresholds a day must meet to count as perfect
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyPolicy {
    #[serde(default = "default_day_applications")]
    pub applications: u32,

    #[serde(default = "default_day_full")]
    pub full_applications: u32,

    #[serde(default = "default_day_platforms")]
    pub platforms: u32,

    #[serde(default = "default_day_tailored")]
    pub tailored_cvs: u32,

    #[serde(default = "default_day_letters")]
    pub letters: u32,

    #[serde(default = "default_day_cold_outreach")]
    pub cold_outreach: u32,
}

fn default_day_applications() -> u32 {
    20
}

fn default_day_full() -> u32 {
    5
}

fn default_day_platforms() -> u32 {
    3
}

fn default_day_tailored() -> u32 {
    5
}

fn default_day_letters() -> u32 {
    5
}

fn default_day_cold_outreach() -> u32 {
    2
}

impl Default for DailyPolicy {
    fn default() -> Self {
        Self {
            applications: default_day_applications(),
            full_applications: default_day_full(),
            platforms: default_day_platforms(),
            tailored_cvs: default_day_tailored(),
            letters: default_day_letters(),
            cold_outreach: default_day_cold_outreach(),
        }
    }
}

/// Thresholds a week must meet to count as perfect
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeeklyPolicy {
    #[serde(default = "default_week_applications")]
    pub applications: u32,

    #[serde(default = "default_week_full")]
    pub full_applications: u32,

    #[serde(default = "default_week_combo")]
    pub combo_applications: u32,

    #[serde(default = "default_week_tailored")]
    pub tailored_cvs: u32,

    #[serde(default = "default_week_letters")]
    pub letters: u32,

    #[serde(default = "default_week_platforms")]
    pub platforms: u32,

    #[serde(default = "default_week_cold_outreach")]
    pub cold_outreach: u32,

    #[serde(default = "default_week_skill_sessions")]
    pub skill_sessions: u32,
}

fn default_week_applications() -> u32 {
    80
}

fn default_week_full() -> u32 {
    25
}

fn default_week_combo() -> u32 {
    5
}

fn default_week_tailored() -> u32 {
    25
}

fn default_week_letters() -> u32 {
    25
}

fn default_week_platforms() -> u32 {
    3
}

fn default_week_cold_outreach() -> u32 {
    10
}

fn default_week_skill_sessions() -> u32 {
    3
}

impl Default for WeeklyPolicy {
    fn default() -> Self {
        Self {
            applications: default_week_applications(),
            full_applications: default_week_full(),
            combo_applications: default_week_combo(),
            tailored_cvs: default_week_tailored(),
            letters: default_week_letters(),
            platforms: default_week_platforms(),
            cold_outreach: default_week_cold_outreach(),
            skill_sessions: default_week_skill_sessions(),
        }
    }
}

/// Journal normalization settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalConfig {
    /// Lowercase and trim platform names before counting distinct platforms
    #[serde(default = "default_true")]
    pub normalize_platforms: bool,

    /// Platform recorded when none is given
    #[serde(default = "default_platform")]
    pub default_platform: String,
}

fn default_true() -> bool {
    true
}

fn default_platform() -> String {
    "unknown".to_string()
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            normalize_platforms: default_true(),
            default_platform: default_platform(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_policy() {
        let config = Config::default();
        assert_eq!(config.policy.rotation_size, 3);
        assert_eq!(config.policy.daily.applications, 20);
        assert_eq!(config.policy.daily.full_applications, 5);
        assert_eq!(config.policy.daily.platforms, 3);
        assert_eq!(config.policy.daily.cold_outreach, 2);
        assert_eq!(config.policy.weekly.applications, 80);
        assert_eq!(config.policy.weekly.cold_outreach, 10);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
[policy.daily]
applications = 10
"#,
        )
        .expect("parse");
        assert_eq!(config.policy.daily.applications, 10);
        assert_eq!(config.policy.daily.letters, 5);
        assert_eq!(config.policy.weekly.applications, 80);
    }
}

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const API_KEY_ENV: &str = "DESKPILOT_API_KEY";

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

// Accepts both the numeric form (1-5) and the string form ("trace", "debug", etc.)
impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct LogLevelVisitor;

        impl<'de> Visitor<'de> for LogLevelVisitor {
            type Value = LogLevel;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a string or integer representing log level")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<LogLevel, E> {
                value.parse().map_err(|_| {
                    E::unknown_variant(value, &["trace", "debug", "info", "warn", "error"])
                })
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<LogLevel, E> {
                match value {
                    1 => Ok(LogLevel::Trace),
                    2 => Ok(LogLevel::Debug),
                    3 => Ok(LogLevel::Info),
                    4 => Ok(LogLevel::Warn),
                    5 => Ok(LogLevel::Error),
                    _ => Err(E::invalid_value(de::Unexpected::Unsigned(value), &"1-5")),
                }
            }
        }

        deserializer.deserialize_any(LogLevelVisitor)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

/// Connection to the OpenAI-compatible server hosting the fallback model
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ModelSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_verify_on_load")]
    pub verify_on_load: bool,
}

impl ModelSettings {
    /// Configured key, else the environment variable, else empty (local servers ignore it)
    pub fn resolved_api_key(&self) -> String {
        if !self.api_key.is_empty() {
            return self.api_key.clone();
        }
        std::env::var(API_KEY_ENV).unwrap_or_default()
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model_id: default_model_id(),
            api_key: String::new(),
            max_new_tokens: default_max_new_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            verify_on_load: default_verify_on_load(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AppSettings {
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,
    #[serde(default)]
    pub model: ModelSettings,
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    #[serde(default = "default_search_url")]
    pub search_url: String,
    #[serde(default)]
    pub preload_model: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            model: ModelSettings::default(),
            command_timeout_secs: default_command_timeout_secs(),
            search_url: default_search_url(),
            preload_model: false,
        }
    }
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_base_url() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_model_id() -> String {
    "functiongemma-270m-it".to_string()
}

fn default_max_new_tokens() -> u32 {
    128
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_verify_on_load() -> bool {
    true
}

fn default_command_timeout_secs() -> u64 {
    15
}

fn default_search_url() -> String {
    "https://www.google.com/search?q=".to_string()
}

/// `<config dir>/deskpilot/settings.json`
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("deskpilot").join("settings.json"))
}

/// Read settings from `path`, creating the file with defaults if it does not exist.
///
/// A file that exists but does not parse is left alone and defaults are used.
pub fn load_or_create(path: &Path) -> Result<AppSettings> {
    if !path.exists() {
        let settings = AppSettings::default();
        write_settings(path, &settings)?;
        info!("Created default settings at {}", path.display());
        return Ok(settings);
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;
    match serde_json::from_str::<AppSettings>(&raw) {
        Ok(settings) => {
            debug!("Loaded settings: {:?}", settings);
            Ok(settings)
        }
        Err(e) => {
            warn!(
                "Settings file {} is invalid ({}), using defaults",
                path.display(),
                e
            );
            Ok(AppSettings::default())
        }
    }
}

pub fn write_settings(path: &Path, settings: &AppSettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write settings to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_accepts_legacy_numbers() {
        let level: LogLevel = serde_json::from_str("2").unwrap();
        assert_eq!(level, LogLevel::Debug);
        let level: LogLevel = serde_json::from_str("\"WARN\"").unwrap();
        assert_eq!(level, LogLevel::Warn);
        assert!(serde_json::from_str::<LogLevel>("9").is_err());
        assert!(serde_json::from_str::<LogLevel>("\"loud\"").is_err());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"model": {"model_id": "other-model"}}"#).unwrap();
        assert_eq!(settings.model.model_id, "other-model");
        assert_eq!(settings.model.max_new_tokens, 128);
        assert_eq!(settings.command_timeout_secs, 15);
        assert_eq!(settings.log_level, LogLevel::Info);
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = load_or_create(&path).unwrap();
        assert_eq!(settings, AppSettings::default());
        assert!(path.exists());

        let mut changed = settings.clone();
        changed.search_url = "https://duckduckgo.com/?q=".to_string();
        write_settings(&path, &changed).unwrap();
        assert_eq!(load_or_create(&path).unwrap(), changed);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(load_or_create(&path).unwrap(), AppSettings::default());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }
}

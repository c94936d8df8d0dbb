use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{AppError, AppResult};
use crate::security::InputValidator;

const APP_DIR_NAME: &str = "Traffic Study Uploader";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub action_url: Option<String>,
    pub update_target: String,
    pub success_delay_ms: u64,
    pub failure_delay_ms: u64,
    /// Per-request limit; unset leaves uploads bounded only by the network stack
    pub request_timeout_secs: Option<u64>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            action_url: None,
            update_target: "#file-upload-and-actions".to_string(),
            success_delay_ms: 100,
            failure_delay_ms: 500,
            request_timeout_secs: None,
            log_level: "info".to_string(),
        }
    }
}

pub fn get_config_path() -> AppResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| AppError::Config("Could not find config directory".to_string()))?
        .join(APP_DIR_NAME);

    fs::create_dir_all(&config_dir)?;
    Ok(config_dir.join("config.json"))
}

/// Load the config at `path`, writing defaults there if it does not exist yet
pub fn load_config_from(path: &Path) -> AppResult<Config> {
    if path.exists() {
        let config_str = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_str).unwrap_or_else(|e| {
            log::warn!("Failed to parse config file: {}. Using defaults.", e);
            Config::default()
        });

        validate_config(&config)?;
        Ok(config)
    } else {
        let default_config = Config::default();
        save_config_to(path, &default_config)?;
        Ok(default_config)
    }
}

pub fn load_config() -> AppResult<Config> {
    load_config_from(&get_config_path()?)
}

pub fn save_config_to(path: &Path, config: &Config) -> AppResult<()> {
    validate_config(config)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Create backup of existing config
    if path.exists() {
        let backup_path = path.with_extension("json.bak");
        if let Err(e) = fs::copy(path, &backup_path) {
            log::warn!("Failed to create config backup: {}", e);
        }
    }

    let config_str = serde_json::to_string_pretty(config)?;
    fs::write(path, config_str)?;

    log::info!("Configuration saved to {}", path.display());
    Ok(())
}

pub fn validate_config(config: &Config) -> AppResult<()> {
    InputValidator::validate_base_url(&config.base_url)?;

    if !config.update_target.starts_with('#') || config.update_target.len() < 2 {
        return Err(AppError::validation(
            "update_target",
            "Must be an element id selector such as #file-upload-and-actions",
        ));
    }

    const MAX_DELAY_MS: u64 = 60_000;
    if config.success_delay_ms > MAX_DELAY_MS {
        return Err(AppError::validation("success_delay_ms", "Must be 60000ms or less"));
    }
    if config.failure_delay_ms > MAX_DELAY_MS {
        return Err(AppError::validation("failure_delay_ms", "Must be 60000ms or less"));
    }

    if config.request_timeout_secs == Some(0) {
        return Err(AppError::validation("request_timeout_secs", "Must be greater than 0"));
    }

    let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
    if !valid_log_levels.contains(&config.log_level.as_str()) {
        return Err(AppError::validation("log_level", "Must be a valid log level"));
    }

    Ok(())
}

/// Reset configuration to defaults, keeping a copy of the old file
pub fn reset_config_at(path: &Path) -> AppResult<Config> {
    if path.exists() {
        let backup_path = path.with_extension("json.reset_backup");
        fs::copy(path, &backup_path)?;
        log::info!("Existing config backed up to {}", backup_path.display());
    }

    let default_config = Config::default();
    save_config_to(path, &default_config)?;

    log::info!("Configuration reset to defaults");
    Ok(default_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("traffic_uploader_config_tests")
            .join(name);
        let _ = fs::remove_dir_all(&dir);
        dir.join("config.json")
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let path = temp_config_path("defaults");
        let config = load_config_from(&path).unwrap();

        assert_eq!(config, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn test_round_trip_and_backup() {
        let path = temp_config_path("round_trip");
        let mut config = Config::default();
        config.action_url = Some("/study/2/scenario/9/upload".to_string());
        config.failure_delay_ms = 750;

        save_config_to(&path, &Config::default()).unwrap();
        save_config_to(&path, &config).unwrap();

        assert_eq!(load_config_from(&path).unwrap(), config);
        assert!(path.with_extension("json.bak").exists());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let path = temp_config_path("partial");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{ "base_url": "https://traffic.example.org" }"#).unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.base_url, "https://traffic.example.org");
        assert_eq!(config.success_delay_ms, 100);
        assert_eq!(config.request_timeout_secs, None);
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.update_target = "file-upload-and-actions".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.request_timeout_secs = Some(0);
        assert!(validate_config(&config).is_err());
        config.request_timeout_secs = Some(300);
        assert!(validate_config(&config).is_ok());

        let mut config = Config::default();
        config.log_level = "loud".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.failure_delay_ms = 120_000;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_reset_keeps_backup() {
        let path = temp_config_path("reset");
        let mut config = Config::default();
        config.log_level = "debug".to_string();
        save_config_to(&path, &config).unwrap();

        let reset = reset_config_at(&path).unwrap();
        assert_eq!(reset, Config::default());
        assert!(path.with_extension("json.reset_backup").exists());
    }
}

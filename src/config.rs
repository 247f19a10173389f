use crate::constants::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SYSTEM_PROMPT};
use crate::errors::{MelchatError, MelchatResult};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub model: String,
    pub system_prompt: String,
    pub request_timeout_secs: u64,
    pub data_dir: PathBuf,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            data_dir: default_data_dir(),
            log_level: "info".to_string(),
        }
    }
}

/// Loads `~/.config/melchat/config.json`, writing a default one on first run,
/// then applies `MELCHAT_*` environment overrides.
pub fn initialize_config() -> MelchatResult<Config> {
    let config_path = get_config_path()?;
    let mut config = load_config_from(&config_path)?;
    apply_env_overrides(&mut config, |key| env::var(key).ok());
    validate_config(&config)?;
    Ok(config)
}

/// Reads the config at `path`, creating it with defaults if it does not exist.
pub fn load_config_from(path: &Path) -> MelchatResult<Config> {
    if path.exists() {
        let config_str = fs::read_to_string(path)?;

        serde_json::from_str(&config_str)
            .map_err(|e| MelchatError::config_error(format!("Failed to parse config: {}", e)))
    } else {
        let config = Config::default();
        save_config(path, &config)?;
        Ok(config)
    }
}

pub fn save_config(path: &Path, config: &Config) -> MelchatResult<()> {
    validate_config(config)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let config_str = serde_json::to_string_pretty(config)?;
    fs::write(path, config_str)?;
    Ok(())
}

/// Applies overrides from a variable lookup (the process environment in practice).
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("MELCHAT_BASE_URL") {
        config.base_url = url;
    }
    if let Some(model) = lookup("MELCHAT_MODEL") {
        config.model = model;
    }
    if let Some(dir) = lookup("MELCHAT_DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
    }
    if let Some(level) = lookup("MELCHAT_LOG_LEVEL") {
        config.log_level = level;
    }
}

fn get_config_path() -> MelchatResult<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| MelchatError::config_error("Could not determine home directory"))?;

    Ok(home_dir.join(".config").join("melchat").join("config.json"))
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("melchat")
}

pub fn validate_config(config: &Config) -> MelchatResult<()> {
    if config.base_url.trim().is_empty() {
        return Err(MelchatError::config_error("base_url is required"));
    }

    if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
        return Err(MelchatError::config_error(
            "base_url must start with http:// or https://",
        ));
    }

    if config.model.trim().is_empty() {
        return Err(MelchatError::config_error("Model name is required"));
    }

    if config.request_timeout_secs == 0 {
        return Err(MelchatError::config_error(
            "request_timeout_secs must be greater than 0",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_validate_config_valid() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_config_invalid_empty_model() {
        let mut config = Config::default();
        config.model = "".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_config_invalid_scheme() {
        let mut config = Config::default();
        config.base_url = "localhost:11434".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_config_invalid_timeout() {
        let mut config = Config::default();
        config.request_timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("melchat").join("config.json");
        let config = load_config_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn test_load_fills_missing_fields_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"model": "llama3"}"#).unwrap();
        let config = load_config_from(&path).unwrap();
        assert_eq!(config.model, "llama3");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            load_config_from(&path),
            Err(MelchatError::Config(_))
        ));
    }

    #[test]
    fn test_save_reports_io_errors() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, "").unwrap();
        assert!(matches!(
            save_config(&blocker.join("config.json"), &Config::default()),
            Err(MelchatError::Io(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("MELCHAT_BASE_URL", "http://10.0.0.2:11434"),
            ("MELCHAT_MODEL", "llama3"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        apply_env_overrides(&mut config, |key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.base_url, "http://10.0.0.2:11434");
        assert_eq!(config.model, "llama3");
        assert_eq!(config.log_level, "info");
    }
}

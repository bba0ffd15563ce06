use super::Config;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const MODEL_ENV: &str = "LEGACY_SCRIBE_MODEL";
const PROVIDER_ENV: &str = "LEGACY_SCRIBE_PROVIDER";

/// Load configuration from the default location or return defaults
pub fn load_config() -> Result<Config> {
    let config_path = get_config_path();

    let config = if config_path.exists() {
        read_config(&config_path)?
    } else {
        // Create default config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Config::default()
    };

    Ok(apply_env_overrides(config, |key| std::env::var(key).ok()))
}

/// Load configuration from an explicit path; the file must exist
pub fn load_config_from(path: &Path) -> Result<Config> {
    let config = read_config(path)?;
    Ok(apply_env_overrides(config, |key| std::env::var(key).ok()))
}

fn read_config(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("parsing config file {}", path.display()))?;
    Ok(config)
}

fn apply_env_overrides<F>(mut config: Config, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(model) = lookup(MODEL_ENV).filter(|v| !v.trim().is_empty()) {
        config.llm.model = model;
    }
    if let Some(provider) = lookup(PROVIDER_ENV).filter(|v| !v.trim().is_empty()) {
        config.llm.provider = provider;
    }
    config
}

/// Get the path to the config file
fn get_config_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "legacy-scribe")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("~/.config/legacy-scribe/config.toml"))
}

use std::path::PathBuf;

use crate::error::ConfigError;

const APP_DIR: &str = "llm-batch";
const CONFIG_FILE: &str = "config.toml";

/// `$XDG_CONFIG_HOME/llm-batch/config.toml`, else `~/.config/llm-batch/config.toml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let config_home = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir()
            .ok_or(ConfigError::MissingHome)?
            .join(".config"),
    };
    Ok(config_home.join(APP_DIR).join(CONFIG_FILE))
}

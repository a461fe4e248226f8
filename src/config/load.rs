use std::fs;
use std::path::Path;

use crate::error::ConfigError;

use super::{default_config_path, GeneratorConfig};

impl GeneratorConfig {
    /// Loads configuration from `path`, or from the default location.
    ///
    /// A missing file yields the defaults. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path()?,
        };
        let config = read_config(&path)?;
        config.validate()?;
        Ok(config)
    }
}

fn read_config(path: &Path) -> Result<GeneratorConfig, ConfigError> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            log::debug!("loading configuration from {}", path.display());
            GeneratorConfig::from_toml_str(&contents)
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("no configuration at {}, using defaults", path.display());
            Ok(GeneratorConfig::default())
        }
        Err(err) => Err(ConfigError::Io(err)),
    }
}

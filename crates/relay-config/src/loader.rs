//! Service settings loader.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::ConfigError;
use crate::schema::ServiceConfig;

/// Service settings loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<ServiceConfig, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load settings from a TOML file, falling back to defaults when the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<ServiceConfig, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::NotFound(_)) => {
                debug!("No settings file at {}, using defaults", path.display());
                Ok(ServiceConfig::default())
            }
            other => other,
        }
    }

    /// Load settings from a string.
    pub fn load_str(content: &str) -> Result<ServiceConfig, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: ServiceConfig = toml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();
        let re = regex::Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/reports`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

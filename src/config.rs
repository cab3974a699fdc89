//! Configuration management
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (treefile.toml)
//! - Environment variables (TREEFILE__*)
//!
//! ## Example config file (treefile.toml):
//! ```toml
//! [save]
//! reverify = true
//! trailing_newline = true
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreefileConfig {
    /// Save settings
    #[serde(default)]
    pub save: SaveConfig,
}

/// Save configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveConfig {
    /// Re-read and re-verify a file after writing it
    #[serde(default = "default_true")]
    pub reverify: bool,

    /// End written files with a newline
    #[serde(default = "default_true")]
    pub trailing_newline: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            reverify: true,
            trailing_newline: true,
        }
    }
}

impl TreefileConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a required file on top of the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["treefile.toml", ".treefile.toml", "config/treefile.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "treefile") {
            let xdg_config = config_dir.config_dir().join("treefile.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("TREEFILE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TreefileConfig::default();
        assert!(config.save.reverify);
        assert!(config.save.trailing_newline);
    }

    #[test]
    fn test_serialize_config() {
        let config = TreefileConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[save]"));
        assert!(toml_str.contains("reverify = true"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[save]\nreverify = false\n").unwrap();

        let config = TreefileConfig::load_from(path.to_str()).unwrap();
        assert!(!config.save.reverify);
        assert!(config.save.trailing_newline);
    }
}

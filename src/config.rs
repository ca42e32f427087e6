//! Configuration management for orgharvest
//!
//! Configuration is loaded from `./config/orgharvest.toml` when it exists;
//! otherwise the embedded default template is used, so the CLI works without
//! any setup. No hardcoded defaults exist in source code - all defaults are
//! in the config template.

use serde::Deserialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration file path relative to working directory
pub const CONFIG_PATH: &str = "./config/orgharvest.toml";

/// Default configuration file content - this is the ONLY place defaults exist
pub const DEFAULT_CONFIG: &str = include_str!("../config/orgharvest.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid URL in '{field}': {url}")]
    InvalidUrl { field: String, url: String },

    #[error("Configuration field '{field}' cannot be empty")]
    EmptyRequired { field: String },

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub browser: BrowserConfig,
    pub search: SearchConfig,
    pub delays: DelaysConfig,
    #[serde(default)]
    pub filters: FiltersConfig,
    pub output: OutputConfig,
}

/// Browser launch and page configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub nav_timeout_secs: u64,
    pub results_timeout_secs: u64,
    pub block_images: bool,
    pub block_media: bool,
}

/// Search endpoints and extraction cutoffs
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub maps_url: String,
    pub serp_lr: String,
    pub stale_scroll_rounds: u32,
    pub serp_max_cards: usize,
}

/// Randomized human-like delays between browser actions (milliseconds)
#[derive(Debug, Clone, Deserialize)]
pub struct DelaysConfig {
    pub action_min_ms: u64,
    pub action_max_ms: u64,
    pub scroll_min_ms: u64,
    pub scroll_max_ms: u64,
}

/// Potential-lead filter configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FiltersConfig {
    #[serde(default)]
    pub stop_words: String,
    #[serde(default)]
    pub white_words: String,
    #[serde(default)]
    pub max_rating: f32,
    #[serde(default)]
    pub require_phone: bool,
    #[serde(default)]
    pub require_badge: bool,
    #[serde(default)]
    pub exclude_good_place: bool,
    #[serde(default)]
    pub exclude_noncommercial: bool,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            stop_words: String::new(),
            white_words: String::new(),
            max_rating: 0.0,
            require_phone: false,
            require_badge: false,
            exclude_good_place: false,
            exclude_noncommercial: false,
        }
    }
}

/// Output format configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub format: String,
    pub sheet_name: String,
}

impl AppConfig {
    /// Load configuration: the file at the standard location when present,
    /// the embedded template otherwise.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Path::new(CONFIG_PATH);
        if path.exists() {
            Self::load_from_path(path)
        } else {
            let config: AppConfig = toml::from_str(DEFAULT_CONFIG)?;
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.browser.user_agent.is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "browser.user_agent".to_string(),
            });
        }
        if self.browser.nav_timeout_secs == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "browser.nav_timeout_secs".to_string(),
            });
        }
        if self.browser.results_timeout_secs == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "browser.results_timeout_secs".to_string(),
            });
        }

        if !self.search.maps_url.starts_with("https://") {
            return Err(ConfigError::InvalidUrl {
                field: "search.maps_url".to_string(),
                url: self.search.maps_url.clone(),
            });
        }
        if self.search.stale_scroll_rounds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "search.stale_scroll_rounds".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        if self.delays.action_min_ms > self.delays.action_max_ms {
            return Err(ConfigError::InvalidValue {
                field: "delays.action_min_ms".to_string(),
                message: "must not exceed delays.action_max_ms".to_string(),
            });
        }
        if self.delays.scroll_min_ms > self.delays.scroll_max_ms {
            return Err(ConfigError::InvalidValue {
                field: "delays.scroll_min_ms".to_string(),
                message: "must not exceed delays.scroll_max_ms".to_string(),
            });
        }

        if !["xlsx", "csv"].contains(&self.output.format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "output.format".to_string(),
                message: format!("'{}' is not 'xlsx' or 'csv'", self.output.format),
            });
        }
        if self.output.sheet_name.is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "output.sheet_name".to_string(),
            });
        }
        // "Potential" is the fixed name of the filtered second sheet
        if self.output.sheet_name == "Potential" {
            return Err(ConfigError::InvalidValue {
                field: "output.sheet_name".to_string(),
                message: "'Potential' is reserved for the filtered sheet".to_string(),
            });
        }

        Ok(())
    }

    /// Create default configuration file at the standard location
    pub fn create_default_config() -> Result<PathBuf, ConfigError> {
        let path = Path::new(CONFIG_PATH);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_CONFIG.as_bytes())?;

        Ok(path.to_path_buf())
    }

    /// Check if stdin is a TTY (interactive terminal)
    pub fn is_interactive() -> bool {
        atty::is(atty::Stream::Stdin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config: Result<AppConfig, _> = toml::from_str(DEFAULT_CONFIG);
        assert!(config.is_ok(), "Default config should parse: {:?}", config.err());
    }

    #[test]
    fn test_default_config_validates() {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert!(config.validate().is_ok(), "Default config should validate");
    }

    #[test]
    fn test_filters_section_is_optional() {
        let config_str = r#"
[browser]
user_agent = "test/1.0"
viewport_width = 1280
viewport_height = 800
nav_timeout_secs = 20
results_timeout_secs = 30
block_images = false
block_media = false

[search]
maps_url = "https://yandex.ru/web-maps/"
serp_lr = "120590"
stale_scroll_rounds = 3
serp_max_cards = 800

[delays]
action_min_ms = 0
action_max_ms = 0
scroll_min_ms = 0
scroll_max_ms = 0

[output]
format = "xlsx"
sheet_name = "Organizations"
"#;
        let config: AppConfig = toml::from_str(config_str).expect("should parse without filters");
        assert!(config.validate().is_ok());
        assert!(!config.filters.require_phone);
        assert!(config.filters.stop_words.is_empty());
    }

    #[test]
    fn test_invalid_output_format_rejected() {
        let mut config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        config.output.format = "ods".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("output.format"));
    }

    #[test]
    fn test_reserved_sheet_name_rejected() {
        let mut config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        config.output.sheet_name = "Potential".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("output.sheet_name"));
    }

    #[test]
    fn test_http_maps_url_rejected() {
        let mut config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        config.search.maps_url = "http://yandex.ru/web-maps/".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_delay_bounds_rejected() {
        let mut config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        config.delays.action_min_ms = 500;
        config.delays.action_max_ms = 100;
        assert!(config.validate().is_err());
    }
}

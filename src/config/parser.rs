//! Configuration parser for loading the context file.
//!
//! This module handles loading configuration from JSON files and
//! environment variables, with proper precedence and error handling.

use crate::error::{ConfigError, EnvstackError, Result};
use std::path::Path;
use tracing::{debug, info};

use super::spec::AppConfig;

/// Configuration parser for loading the application configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<std::path::PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<AppConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(EnvstackError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            EnvstackError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_json(&content, Some(path))
    }

    /// Parses configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid.
    pub fn parse_json(&self, content: &str, source: Option<&Path>) -> Result<AppConfig> {
        debug!("Parsing JSON configuration");

        let config: AppConfig = serde_json::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            EnvstackError::Config(ConfigError::ParseError {
                message: format!("JSON parse error: {e}"),
                location,
            })
        })?;

        debug!(
            "Successfully parsed configuration with {} environment(s)",
            config.context.len()
        );
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<AppConfig> {
        let mut config = self.load_file(path)?;

        Self::apply_env_overrides(&mut config);

        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(config: &mut AppConfig) {
        if let Ok(project) = std::env::var("ENVSTACK_PROJECT") {
            debug!("Overriding project from environment");
            config.project = project;
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| std::path::PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                EnvstackError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Returns the environment selected via `ENVSTACK_ENV`, if set.
    #[must_use]
    pub fn env_from_environment() -> Option<String> {
        std::env::var("ENVSTACK_ENV").ok()
    }
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["envstack.json", "cdk.json"];

/// Finds the configuration file in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<std::path::PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(EnvstackError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_config() {
        let json = r#"{
            "context": {
                "development": {
                    "env": "development",
                    "region": "eu-west-1",
                    "vpc": {}
                }
            }
        }"#;
        let parser = ConfigParser::new();
        let result = parser.parse_json(json, None);
        assert!(result.is_ok());

        let config = result.unwrap();
        assert_eq!(config.context.len(), 1);
        let env = config.environment("development").unwrap();
        assert_eq!(env.region, "eu-west-1");
        assert!(env.s3.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "project": "pycon",
            "context": {
                "development": {
                    "env": "development",
                    "region": "eu-west-1",
                    "vpc": {
                        "region": "eu-west-1",
                        "cidr": "10.0.0.0/16",
                        "max_azs": 2,
                        "enable_nat_gateway": false
                    },
                    "s3": [
                        { "bucket_name": "pycon.day1.store.development" }
                    ]
                },
                "production": {
                    "env": "production",
                    "region": "eu-west-1",
                    "vpc": {
                        "cidr": "10.2.0.0/16",
                        "max_azs": 3,
                        "enable_nat_gateway": true
                    },
                    "s3": [
                        { "bucket_name": "pycon.day1.store.production" }
                    ]
                }
            }
        }"#;
        let parser = ConfigParser::new();
        let config = parser.parse_json(json, None).unwrap();

        assert_eq!(config.project, "pycon");
        assert_eq!(config.environment_names(), vec!["development", "production"]);

        let dev = config.environment("development").unwrap();
        assert_eq!(dev.vpc.max_azs, 2);
        assert!(!dev.vpc.enable_nat_gateway);
        assert_eq!(dev.bucket_names(), vec!["pycon.day1.store.development"]);
    }

    #[test]
    fn test_parse_invalid_json() {
        let parser = ConfigParser::new();
        let result = parser.parse_json("{ not json", None);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let parser = ConfigParser::new();
        let result = parser.load_file("/nonexistent/envstack.json");
        assert!(result.is_err());
    }

    #[test]
    fn test_find_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let mut file = std::fs::File::create(dir.path().join("envstack.json")).unwrap();
        writeln!(file, "{{}}").unwrap();

        let found = find_config_file(&nested).unwrap();
        assert_eq!(found, dir.path().join("envstack.json"));
    }
}

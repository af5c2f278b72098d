//! Configuration module for the envstack tool.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `envstack.json`
//! - Validation of environment entries
//! - Environment variable overrides

mod spec;
mod parser;
mod validator;

pub use spec::{
    AppConfig, BucketSpec, EnvironmentConfig, VpcConfig, DEFAULT_ENVIRONMENT,
};
pub use parser::{find_config_file, ConfigParser, DEFAULT_CONFIG_FILES};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};

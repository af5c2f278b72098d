//! Configuration validation for the context file.
//!
//! This module provides validation of environment configurations, ensuring
//! all values are deployable before any resource is declared.

use crate::error::{ConfigError, EnvstackError, Result};
use std::collections::HashSet;
use tracing::debug;

use super::spec::{AppConfig, BucketSpec, EnvironmentConfig, VpcConfig};
use crate::stacks::network::CidrBlock;

/// Validator for application configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

/// Availability-zone count above which a warning is emitted. Most regions
/// expose exactly three zones.
const COMMON_MAX_AZS: u32 = 3;

/// Hard upper bound on availability zones per environment.
const AZ_LIMIT: u32 = 6;

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates an application configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn validate(&self, config: &AppConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        if config.project.is_empty() {
            result.errors.push(ValidationError {
                field: String::from("project"),
                message: String::from("Project name cannot be empty"),
            });
        }

        if config.context.is_empty() {
            result.warnings.push(String::from("No environments defined in configuration"));
        }

        let mut all_buckets: HashSet<&str> = HashSet::new();

        for (name, env) in &config.context {
            let prefix = format!("context.{name}");
            Self::validate_environment(name, env, &prefix, &mut result);
            Self::validate_vpc(&env.vpc, &prefix, &mut result);
            Self::validate_buckets(&env.s3, &prefix, &mut all_buckets, &mut result);
        }

        if result.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(EnvstackError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    /// Validates a single environment entry.
    fn validate_environment(
        key: &str,
        env: &EnvironmentConfig,
        prefix: &str,
        result: &mut ValidationResult,
    ) {
        if !is_valid_env_name(key) {
            result.errors.push(ValidationError {
                field: prefix.to_string(),
                message: format!(
                    "Environment name '{key}' is invalid. Must be lowercase alphanumeric with hyphens."
                ),
            });
        }

        if env.env.is_empty() {
            result.errors.push(ValidationError {
                field: format!("{prefix}.env"),
                message: String::from("Environment label cannot be empty"),
            });
        } else if env.env != key {
            result.warnings.push(format!(
                "{prefix}.env: label '{}' differs from context key '{key}'",
                env.env
            ));
        }

        if env.region.is_empty() {
            result.errors.push(ValidationError {
                field: format!("{prefix}.region"),
                message: String::from("Region cannot be empty"),
            });
        }
    }

    /// Validates VPC parameters.
    fn validate_vpc(vpc: &VpcConfig, prefix: &str, result: &mut ValidationResult) {
        if vpc.max_azs == 0 {
            result.errors.push(ValidationError {
                field: format!("{prefix}.vpc.max_azs"),
                message: String::from("max_azs must be at least 1"),
            });
        } else if vpc.max_azs > AZ_LIMIT {
            result.errors.push(ValidationError {
                field: format!("{prefix}.vpc.max_azs"),
                message: format!("max_azs must not exceed {AZ_LIMIT}"),
            });
        } else if vpc.max_azs > COMMON_MAX_AZS {
            result.warnings.push(format!(
                "{prefix}.vpc.max_azs: {} zones exceeds what most regions expose",
                vpc.max_azs
            ));
        }

        match CidrBlock::parse(&vpc.cidr) {
            Ok(block) => {
                let required = vpc.subnet_count() as usize;
                if block.subnet_capacity() < required {
                    result.errors.push(ValidationError {
                        field: format!("{prefix}.vpc.cidr"),
                        message: format!(
                            "CIDR block '{}' cannot hold {required} /24 subnets",
                            vpc.cidr
                        ),
                    });
                }
            }
            Err(e) => {
                let message = match e {
                    EnvstackError::Template(te) => te.to_string(),
                    other => other.to_string(),
                };
                result.errors.push(ValidationError {
                    field: format!("{prefix}.vpc.cidr"),
                    message,
                });
            }
        }
    }

    /// Validates bucket specifications.
    fn validate_buckets<'a>(
        buckets: &'a [BucketSpec],
        prefix: &str,
        all_buckets: &mut HashSet<&'a str>,
        result: &mut ValidationResult,
    ) {
        let mut seen: HashSet<&str> = HashSet::new();

        for (i, bucket) in buckets.iter().enumerate() {
            let field = format!("{prefix}.s3[{i}].bucket_name");
            let name = bucket.bucket_name.as_str();

            if name.is_empty() {
                result.errors.push(ValidationError {
                    field,
                    message: String::from("Bucket name cannot be empty"),
                });
                continue;
            }

            if !is_valid_bucket_name(name) {
                result.errors.push(ValidationError {
                    field: field.clone(),
                    message: format!(
                        "Bucket name '{name}' is invalid. Must be 3-63 lowercase alphanumeric \
                         characters, dots, or hyphens, starting and ending alphanumeric."
                    ),
                });
            }

            if !seen.insert(name) {
                result.errors.push(ValidationError {
                    field,
                    message: format!("Duplicate bucket name: {name}"),
                });
            } else if !all_buckets.insert(name) {
                // Bucket names are global to the provider, so a reuse across
                // environments will conflict at deploy time.
                result.warnings.push(format!(
                    "{field}: bucket name '{name}' is also declared in another environment"
                ));
            }
        }
    }
}

/// Validates that an environment name follows the naming convention.
/// Names must be lowercase alphanumeric with hyphens, starting with a letter.
fn is_valid_env_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }

    let mut chars = name.chars();

    if let Some(first) = chars.next()
        && !first.is_ascii_lowercase()
    {
        return false;
    }

    for c in chars {
        if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
            return false;
        }
    }

    !name.ends_with('-') && !name.contains("--")
}

/// Validates a bucket name against the S3 naming rules.
fn is_valid_bucket_name(name: &str) -> bool {
    if name.len() < 3 || name.len() > 63 {
        return false;
    }

    let bytes = name.as_bytes();
    let alnum = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();

    if !alnum(bytes[0]) || !alnum(bytes[bytes.len() - 1]) {
        return false;
    }

    if !name
        .bytes()
        .all(|b| alnum(b) || b == b'.' || b == b'-')
    {
        return false;
    }

    if name.contains("..") || name.contains(".-") || name.contains("-.") {
        return false;
    }

    // Names formatted like IP addresses are rejected by the provider.
    if name.split('.').count() == 4 && name.split('.').all(|p| p.parse::<u8>().is_ok()) {
        return false;
    }

    true
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigParser;

    fn parse(json: &str) -> AppConfig {
        ConfigParser::new().parse_json(json, None).unwrap()
    }

    fn dev_config(vpc: &str, buckets: &str) -> AppConfig {
        parse(&format!(
            r#"{{
                "context": {{
                    "development": {{
                        "env": "development",
                        "region": "eu-west-1",
                        "vpc": {vpc},
                        "s3": {buckets}
                    }}
                }}
            }}"#
        ))
    }

    #[test]
    fn test_valid_config() {
        let config = dev_config(
            r#"{ "cidr": "10.0.0.0/16", "max_azs": 2, "enable_nat_gateway": false }"#,
            r#"[{ "bucket_name": "pycon.day1.store.development" }]"#,
        );
        let result = ConfigValidator::new().validate(&config).unwrap();
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 0);
    }

    #[test]
    fn test_invalid_cidr_rejected() {
        let config = dev_config(r#"{ "cidr": "10.0.0.0/33" }"#, "[]");
        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_cidr_too_small_for_subnets() {
        // A /24 holds a single /24 block, but two AZs need four.
        let config = dev_config(r#"{ "cidr": "10.0.0.0/24", "max_azs": 2 }"#, "[]");
        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_zero_azs_rejected() {
        let config = dev_config(r#"{ "max_azs": 0 }"#, "[]");
        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_duplicate_bucket_rejected() {
        let config = dev_config(
            "{}",
            r#"[{ "bucket_name": "store.dev" }, { "bucket_name": "store.dev" }]"#,
        );
        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_invalid_bucket_name_rejected() {
        let config = dev_config("{}", r#"[{ "bucket_name": "Store_Dev" }]"#);
        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_env_label_mismatch_warns() {
        let config = parse(
            r#"{
                "context": {
                    "development": {
                        "env": "dev",
                        "region": "eu-west-1",
                        "vpc": {}
                    }
                }
            }"#,
        );
        let result = ConfigValidator::new().validate(&config).unwrap();
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 1);
    }

    #[test]
    fn test_valid_bucket_names() {
        assert!(is_valid_bucket_name("pycon.day1.store.development"));
        assert!(is_valid_bucket_name("my-bucket-123"));
        assert!(is_valid_bucket_name("abc"));
    }

    #[test]
    fn test_invalid_bucket_names() {
        assert!(!is_valid_bucket_name("ab"));
        assert!(!is_valid_bucket_name("My-Bucket"));
        assert!(!is_valid_bucket_name("bucket..name"));
        assert!(!is_valid_bucket_name("-bucket"));
        assert!(!is_valid_bucket_name("bucket-"));
        assert!(!is_valid_bucket_name("192.168.1.1"));
        let long = "a".repeat(64);
        assert!(!is_valid_bucket_name(&long));
    }

    #[test]
    fn test_valid_env_names() {
        assert!(is_valid_env_name("development"));
        assert!(is_valid_env_name("prod-eu"));
        assert!(!is_valid_env_name("Production"));
        assert!(!is_valid_env_name("dev--eu"));
        assert!(!is_valid_env_name("dev-"));
        assert!(!is_valid_env_name("1dev"));
    }
}

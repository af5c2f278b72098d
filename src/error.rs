//! Error types for the envstack deployment tool.
//!
//! This module provides the error hierarchy for all operations in the
//! stack lifecycle: configuration, template synthesis, planning, and
//! CloudFormation submission.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the envstack tool.
#[derive(Debug, Error)]
pub enum EnvstackError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Template synthesis errors.
    #[error("Synthesis error: {0}")]
    Template(#[from] TemplateError),

    /// Planning errors.
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    /// CloudFormation API errors.
    #[error("CloudFormation error: {0}")]
    Cfn(#[from] CfnError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// The requested environment has no entry in the context map.
    #[error("Environment '{name}' not found in configuration (available: {available})")]
    UnknownEnvironment {
        /// The requested environment name.
        name: String,
        /// Comma-separated list of configured environments.
        available: String,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// Duplicate resource definition.
    #[error("Duplicate {resource_type} name: {name}")]
    DuplicateName {
        /// Type of resource (bucket, environment, etc.).
        resource_type: String,
        /// The duplicated name.
        name: String,
    },
}

/// Template synthesis errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A resource specification is missing a required field.
    #[error("Missing required field '{field}' in {resource} specification")]
    MissingField {
        /// Resource kind being declared.
        resource: String,
        /// Name of the missing field.
        field: String,
    },

    /// A CIDR block could not be parsed.
    #[error("Invalid CIDR block '{cidr}': {reason}")]
    InvalidCidr {
        /// The offending CIDR string.
        cidr: String,
        /// Description of the problem.
        reason: String,
    },

    /// The VPC CIDR block cannot hold the requested subnet plan.
    #[error("CIDR block '{cidr}' cannot hold {required} /24 subnets")]
    CidrExhausted {
        /// The VPC CIDR block.
        cidr: String,
        /// Number of /24 blocks required.
        required: usize,
    },

    /// Two resources resolved to the same logical ID.
    #[error("Duplicate logical ID '{logical_id}' in template")]
    DuplicateLogicalId {
        /// The colliding logical ID.
        logical_id: String,
    },

    /// Template serialization failed.
    #[error("Template serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },
}

/// Planning errors.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The stack filter matched no synthesized stack.
    #[error("No stack matches '{name}' (available: {available})")]
    UnknownStack {
        /// The requested stack name.
        name: String,
        /// Comma-separated list of synthesized stacks.
        available: String,
    },

    /// Plan is empty (nothing to do).
    #[error("Plan is empty: no changes required")]
    EmptyPlan,
}

/// CloudFormation API errors.
#[derive(Debug, Error)]
pub enum CfnError {
    /// API request failed.
    #[error("CloudFormation API request failed: {message}")]
    ApiRequestFailed {
        /// Error message from the API.
        message: String,
    },

    /// Stack not found.
    #[error("Stack not found: {stack_name}")]
    StackNotFound {
        /// Name of the missing stack.
        stack_name: String,
    },

    /// The engine reported a terminal failure status for a stack.
    #[error("Stack '{stack_name}' failed with status {status}: {reason}")]
    DeploymentFailed {
        /// Name of the failed stack.
        stack_name: String,
        /// Terminal CloudFormation status.
        status: String,
        /// Status reason reported by the engine.
        reason: String,
    },

    /// Timeout waiting for a stack operation.
    #[error("Timeout waiting for stack '{stack_name}' after {waited_secs} seconds")]
    Timeout {
        /// Name of the stack.
        stack_name: String,
        /// Seconds waited before giving up.
        waited_secs: u64,
    },

    /// Invalid response from the API.
    #[error("Invalid response from CloudFormation: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Result type alias for envstack operations.
pub type Result<T> = std::result::Result<T, EnvstackError>;

impl EnvstackError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }
}

impl TemplateError {
    /// Creates an invalid-CIDR error.
    #[must_use]
    pub fn invalid_cidr(cidr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCidr {
            cidr: cidr.into(),
            reason: reason.into(),
        }
    }

    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }
}

impl CfnError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            message: message.into(),
        }
    }

    /// Creates an invalid-response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}

//! Configuration specification types for the context file.
//!
//! This module defines the structs that map to `envstack.json`. The file
//! carries a top-level `context` object keyed by environment name; each
//! entry fully describes the infrastructure for that environment.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{ConfigError, EnvstackError, Result};

/// Environment used when none is selected on the command line.
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// The root configuration structure loaded from `envstack.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Project name, used for tagging all deployed resources.
    #[serde(default = "default_project")]
    pub project: String,
    /// Environment name to per-environment configuration.
    pub context: IndexMap<String, EnvironmentConfig>,
}

/// Configuration for a single environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvironmentConfig {
    /// Environment name (e.g. "development", "staging", "production").
    pub env: String,
    /// AWS region to deploy into.
    pub region: String,
    /// Virtual network parameters.
    pub vpc: VpcConfig,
    /// Storage bucket specifications.
    #[serde(default)]
    pub s3: Vec<BucketSpec>,
    /// Extra tags merged over the environment-derived defaults.
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

/// Network parameters for the VPC stack.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VpcConfig {
    /// Optional region override for the VPC stack.
    #[serde(default)]
    pub region: Option<String>,
    /// VPC address block in CIDR notation.
    #[serde(default = "default_cidr")]
    pub cidr: String,
    /// Maximum number of availability zones to span.
    #[serde(default = "default_max_azs")]
    pub max_azs: u32,
    /// Whether to provision a NAT gateway for the private subnets.
    #[serde(default = "default_enable_nat_gateway")]
    pub enable_nat_gateway: bool,
    /// Whether instances receive DNS hostnames.
    #[serde(default = "default_dns_flag")]
    pub enable_dns_hostnames: bool,
    /// Whether DNS resolution is enabled in the VPC.
    #[serde(default = "default_dns_flag")]
    pub enable_dns_support: bool,
}

/// Specification for a single storage bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BucketSpec {
    /// Globally unique bucket name.
    pub bucket_name: String,
}

// Default value functions

fn default_project() -> String {
    String::from("envstack")
}

fn default_cidr() -> String {
    String::from("10.0.0.0/16")
}

const fn default_max_azs() -> u32 {
    2
}

const fn default_enable_nat_gateway() -> bool {
    true
}

const fn default_dns_flag() -> bool {
    true
}

impl AppConfig {
    /// Returns the configured environment names in file order.
    #[must_use]
    pub fn environment_names(&self) -> Vec<&str> {
        self.context.keys().map(String::as_str).collect()
    }

    /// Looks up an environment by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownEnvironment`] if the name has no entry
    /// in the context map. This is the fatal pre-declaration check: no
    /// resource is constructed for an unknown environment.
    pub fn environment(&self, name: &str) -> Result<&EnvironmentConfig> {
        self.context.get(name).ok_or_else(|| {
            EnvstackError::Config(ConfigError::UnknownEnvironment {
                name: name.to_string(),
                available: self.environment_names().join(", "),
            })
        })
    }
}

impl EnvironmentConfig {
    /// Returns the region the VPC stack deploys into, honoring the
    /// per-stack override.
    #[must_use]
    pub fn vpc_region(&self) -> &str {
        self.vpc.region.as_deref().unwrap_or(&self.region)
    }

    /// Returns the configured bucket names.
    #[must_use]
    pub fn bucket_names(&self) -> Vec<&str> {
        self.s3.iter().map(|b| b.bucket_name.as_str()).collect()
    }
}

impl VpcConfig {
    /// Total number of subnets this configuration declares
    /// (one public and one private per availability zone).
    #[must_use]
    pub const fn subnet_count(&self) -> u32 {
        self.max_azs * 2
    }
}

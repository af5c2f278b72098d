// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # envstack
//!
//! Declarative, environment-parameterized AWS infrastructure: synthesize
//! and deploy CloudFormation stacks for VPC and S3 resources from a JSON
//! context file.
//!
//! ## Overview
//!
//! envstack reads an `envstack.json` file keyed by environment name
//! (development, staging, production, ...) and turns each environment into
//! two independent stacks:
//!
//! - A **VPC stack**: public/private subnet tiers across availability
//!   zones, route tables, an optional NAT gateway, web and database
//!   security groups, and S3/DynamoDB gateway endpoints
//! - An **S3 stack**: one versioned, encrypted, public-access-blocked
//!   bucket per configured name, retained on stack deletion
//!
//! The stacks are synthesized into CloudFormation templates and submitted
//! to the engine, which owns dependency resolution, change execution, and
//! rollback. Synthesis is deterministic: the same configuration always
//! produces byte-identical templates.
//!
//! ## Modules
//!
//! - [`config`]: configuration parsing and validation
//! - [`template`]: the CloudFormation template document model
//! - [`stacks`]: the network and storage resource definitions
//! - [`synthesizer`]: environment selection and stack synthesis
//! - [`planner`]: template diffs and deployment plans
//! - [`cfn`]: CloudFormation submission and status tracking
//! - [`cli`]: command-line interface
//!
//! ## Example
//!
//! ```json
//! {
//!   "project": "pycon",
//!   "context": {
//!     "development": {
//!       "env": "development",
//!       "region": "eu-west-1",
//!       "vpc": {
//!         "cidr": "10.0.0.0/16",
//!         "max_azs": 2,
//!         "enable_nat_gateway": false
//!       },
//!       "s3": [
//!         { "bucket_name": "pycon.day1.store.development" }
//!       ]
//!     }
//!   }
//! }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cfn;
pub mod cli;
pub mod config;
pub mod error;
pub mod planner;
pub mod stacks;
pub mod synthesizer;
pub mod template;

// ============================================================================
// Re-exports
// ============================================================================

pub use cfn::{CfnClient, DeployedStack, DeploymentResult, StackDeployer};
pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{AppConfig, BucketSpec, ConfigParser, ConfigValidator, EnvironmentConfig, VpcConfig};
pub use error::{EnvstackError, Result};
pub use planner::{DeploymentPlan, DiffEngine, StackDiff};
pub use stacks::{NetworkStack, StorageStack};
pub use synthesizer::{select_environment, SynthesizedStack, Synthesizer};
pub use template::{Template, TemplateHasher};

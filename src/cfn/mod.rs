//! CloudFormation integration.
//!
//! The boundary to the provisioning engine: a thin API client, stack
//! status classification, and the deployer that submits plans and waits
//! for the engine's verdict.

mod client;
mod deployer;
mod types;

pub use client::CfnClient;
pub use deployer::{DeployOutcome, DeploymentResult, StackDeployer};
pub use types::{DeployedStack, StackCondition, StackOutput};

//! Stack deployer: submits planned stacks to the engine and waits.
//!
//! Each submission is a single blocking call from the tool's perspective:
//! the stack is handed to CloudFormation, then `DescribeStacks` is polled
//! until the engine reports a terminal status. Deployment-time failures
//! (credentials, permissions, naming conflicts) are reported exactly as
//! the engine states them; nothing is retried or recovered here.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{CfnError, Result};
use crate::planner::{ActionType, DeploymentPlan};
use crate::synthesizer::SynthesizedStack;

use super::client::CfnClient;
use super::types::{DeployedStack, StackCondition, StackOutput};

/// Default interval between status polls.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Default limit on waiting for a single stack operation.
const DEFAULT_TIMEOUT_SECS: u64 = 1800;

/// Deployer for executing deployment plans.
#[derive(Debug)]
pub struct StackDeployer {
    /// One client per region, created on demand.
    clients: HashMap<String, CfnClient>,
    /// Interval between status polls.
    poll_interval_secs: u64,
    /// Limit on waiting for a single stack operation.
    timeout_secs: u64,
}

/// Result of deploying a single stack.
#[derive(Debug)]
pub struct DeploymentResult {
    /// Stack name.
    pub stack_name: String,
    /// Action that was performed.
    pub action: ActionType,
    /// What happened.
    pub outcome: DeployOutcome,
    /// Engine-assigned outputs after the operation.
    pub outputs: Vec<StackOutput>,
    /// Seconds the operation took.
    pub elapsed_secs: u64,
}

/// Outcome of a single stack submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployOutcome {
    /// The engine created or updated the stack.
    Deployed,
    /// The deployed stack already matched; nothing was submitted.
    AlreadyCurrent,
}

impl Default for StackDeployer {
    fn default() -> Self {
        Self::new()
    }
}

impl StackDeployer {
    /// Creates a deployer with default polling settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Sets the poll interval in seconds.
    #[must_use]
    pub const fn with_poll_interval(mut self, secs: u64) -> Self {
        self.poll_interval_secs = secs;
        self
    }

    /// Sets the wait timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Returns (creating if necessary) the client for a region.
    pub async fn client_for(&mut self, region: &str) -> &CfnClient {
        if !self.clients.contains_key(region) {
            let client = CfnClient::new(region).await;
            self.clients.insert(region.to_string(), client);
        }
        // The entry was just inserted if it was missing.
        &self.clients[region]
    }

    /// Executes a deployment plan, submitting each actionable stack and
    /// blocking until the engine reports a terminal status.
    ///
    /// # Errors
    ///
    /// Returns the engine's error on the first failed stack; earlier
    /// successes are not rolled back by this tool (the engine rolls back
    /// the failed stack itself).
    pub async fn execute(&mut self, plan: &DeploymentPlan) -> Result<Vec<DeploymentResult>> {
        let mut results = Vec::new();

        for action in &plan.actions {
            let started = Instant::now();
            let stack = &action.stack;

            match action.action_type {
                ActionType::Noop => {
                    debug!("Skipping {}: already current", stack.stack_name);
                    let outputs = self.fetch_outputs(stack).await.unwrap_or_default();
                    results.push(DeploymentResult {
                        stack_name: stack.stack_name.clone(),
                        action: action.action_type,
                        outcome: DeployOutcome::AlreadyCurrent,
                        outputs,
                        elapsed_secs: 0,
                    });
                }
                ActionType::CreateStack | ActionType::UpdateStack => {
                    let outcome = self.submit(action.action_type, stack).await?;

                    let outputs = if outcome == DeployOutcome::Deployed {
                        let deployed = self.wait_for_stack(stack).await?;
                        info!(
                            "Stack {} reached {} in {}s",
                            stack.stack_name,
                            deployed.status,
                            started.elapsed().as_secs()
                        );
                        deployed.outputs
                    } else {
                        self.fetch_outputs(stack).await.unwrap_or_default()
                    };

                    results.push(DeploymentResult {
                        stack_name: stack.stack_name.clone(),
                        action: action.action_type,
                        outcome,
                        outputs,
                        elapsed_secs: started.elapsed().as_secs(),
                    });
                }
            }
        }

        Ok(results)
    }

    /// Deletes a stack and waits until the engine reports it gone.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails or times out.
    pub async fn destroy_stack(&mut self, stack_name: &str, region: &str) -> Result<()> {
        let client = self.client_for(region).await.clone();

        client.delete_stack(stack_name).await?;

        let started = Instant::now();
        loop {
            match client.describe_stack(stack_name).await? {
                None => return Ok(()),
                Some(deployed) if deployed.condition == StackCondition::Deleted => return Ok(()),
                Some(deployed) if deployed.condition == StackCondition::Failed => {
                    return Err(CfnError::DeploymentFailed {
                        stack_name: stack_name.to_string(),
                        status: deployed.status,
                        reason: deployed
                            .status_reason
                            .unwrap_or_else(|| String::from("no reason reported")),
                    }
                    .into());
                }
                Some(deployed) => {
                    debug!("Stack {stack_name} is {}", deployed.status);
                }
            }

            if started.elapsed().as_secs() > self.timeout_secs {
                return Err(CfnError::Timeout {
                    stack_name: stack_name.to_string(),
                    waited_secs: started.elapsed().as_secs(),
                }
                .into());
            }

            tokio::time::sleep(Duration::from_secs(self.poll_interval_secs)).await;
        }
    }

    /// Submits a create or update for a stack.
    async fn submit(&mut self, action: ActionType, stack: &SynthesizedStack) -> Result<DeployOutcome> {
        let client = self.client_for(&stack.region).await;

        let submitted = match action {
            ActionType::CreateStack => {
                client.create_stack(stack).await?;
                true
            }
            ActionType::UpdateStack => client.update_stack(stack).await?,
            ActionType::Noop => false,
        };

        if submitted {
            Ok(DeployOutcome::Deployed)
        } else {
            // The engine disagreed with the client-side diff; trust the
            // engine.
            warn!("Engine reported no updates for {}", stack.stack_name);
            Ok(DeployOutcome::AlreadyCurrent)
        }
    }

    /// Polls a stack until it reaches a terminal state.
    async fn wait_for_stack(&mut self, stack: &SynthesizedStack) -> Result<DeployedStack> {
        let client = self.client_for(&stack.region).await.clone();
        let started = Instant::now();

        loop {
            let deployed = client.describe_stack(&stack.stack_name).await?.ok_or_else(|| {
                CfnError::StackNotFound {
                    stack_name: stack.stack_name.clone(),
                }
            })?;

            match deployed.condition {
                StackCondition::Succeeded => return Ok(deployed),
                StackCondition::Failed | StackCondition::Deleted => {
                    return Err(CfnError::DeploymentFailed {
                        stack_name: stack.stack_name.clone(),
                        status: deployed.status,
                        reason: deployed
                            .status_reason
                            .unwrap_or_else(|| String::from("no reason reported")),
                    }
                    .into());
                }
                StackCondition::InProgress => {
                    debug!("Stack {} is {}", stack.stack_name, deployed.status);
                }
            }

            if started.elapsed().as_secs() > self.timeout_secs {
                return Err(CfnError::Timeout {
                    stack_name: stack.stack_name.clone(),
                    waited_secs: started.elapsed().as_secs(),
                }
                .into());
            }

            tokio::time::sleep(Duration::from_secs(self.poll_interval_secs)).await;
        }
    }

    /// Fetches current outputs for a stack, if it exists.
    async fn fetch_outputs(&mut self, stack: &SynthesizedStack) -> Result<Vec<StackOutput>> {
        let client = self.client_for(&stack.region).await;
        Ok(client
            .describe_stack(&stack.stack_name)
            .await?
            .map(|d| d.outputs)
            .unwrap_or_default())
    }
}

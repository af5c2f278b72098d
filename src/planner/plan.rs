//! Deployment plan types and construction.
//!
//! A plan folds per-stack template diffs into the stack-level actions the
//! engine will be asked to perform: create a stack, update it, or leave it
//! alone.

use chrono::{DateTime, Utc};

use crate::synthesizer::SynthesizedStack;

use super::diff::StackDiff;

/// A complete deployment plan for one environment.
#[derive(Debug)]
pub struct DeploymentPlan {
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// Environment the plan applies to.
    pub environment: String,
    /// Planned actions in submission order.
    pub actions: Vec<PlannedAction>,
}

/// A single planned stack action.
#[derive(Debug, Clone)]
pub struct PlannedAction {
    /// Action type.
    pub action_type: ActionType,
    /// The synthesized stack this action submits.
    pub stack: SynthesizedStack,
    /// Number of resource-level changes behind this action.
    pub resource_changes: usize,
    /// Reason for this action.
    pub reason: String,
}

/// Types of actions in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    /// Create a stack that does not exist yet.
    CreateStack,
    /// Update an existing stack with a changed template.
    UpdateStack,
    /// No operation (deployed template already matches).
    Noop,
}

impl DeploymentPlan {
    /// Creates a plan from synthesized stacks and their diffs, pairwise.
    #[must_use]
    pub fn from_diffs(environment: &str, stacks: Vec<(SynthesizedStack, StackDiff)>) -> Self {
        let actions = stacks
            .into_iter()
            .map(|(stack, diff)| {
                let (action_type, reason) = if diff.has_baseline {
                    if diff.total_changes() == 0 {
                        (ActionType::Noop, String::from("Deployed template matches"))
                    } else {
                        (
                            ActionType::UpdateStack,
                            format!(
                                "{} to create, {} to update, {} to delete",
                                diff.creates, diff.updates, diff.deletes
                            ),
                        )
                    }
                } else {
                    (ActionType::CreateStack, String::from("Stack not yet deployed"))
                };

                PlannedAction {
                    action_type,
                    resource_changes: diff.total_changes(),
                    stack,
                    reason,
                }
            })
            .collect();

        Self {
            created_at: Utc::now(),
            environment: environment.to_string(),
            actions,
        }
    }

    /// Returns true if no stack requires submission.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions
            .iter()
            .all(|a| a.action_type == ActionType::Noop)
    }

    /// Returns the actions that submit a stack to the engine.
    #[must_use]
    pub fn actionable(&self) -> Vec<&PlannedAction> {
        self.actions
            .iter()
            .filter(|a| a.action_type != ActionType::Noop)
            .collect()
    }

    /// Returns the number of stacks to create.
    #[must_use]
    pub fn create_count(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| a.action_type == ActionType::CreateStack)
            .count()
    }

    /// Returns the number of stacks to update.
    #[must_use]
    pub fn update_count(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| a.action_type == ActionType::UpdateStack)
            .count()
    }
}

impl PlannedAction {
    /// Returns a human-readable description of the action.
    #[must_use]
    pub fn description(&self) -> String {
        match self.action_type {
            ActionType::CreateStack => format!("Create stack '{}'", self.stack.stack_name),
            ActionType::UpdateStack => format!("Update stack '{}'", self.stack.stack_name),
            ActionType::Noop => format!("No change for '{}'", self.stack.stack_name),
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CreateStack => "create",
            Self::UpdateStack => "update",
            Self::Noop => "noop",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for DeploymentPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No changes required");
        }

        writeln!(f, "Deployment plan for {}:", self.environment)?;
        for action in &self.actions {
            writeln!(f, "  {} ({})", action.description(), action.reason)?;
        }
        Ok(())
    }
}

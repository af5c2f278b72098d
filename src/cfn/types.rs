//! CloudFormation stack types and status classification.
//!
//! The engine reports stack state through a large status vocabulary; this
//! module folds it into the conditions the tool acts on.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A stack as observed on CloudFormation.
#[derive(Debug, Clone, Serialize)]
pub struct DeployedStack {
    /// Stack name.
    pub name: String,
    /// Raw CloudFormation status (e.g. `CREATE_COMPLETE`).
    pub status: String,
    /// Condition derived from the status.
    pub condition: StackCondition,
    /// Status reason reported by the engine, if any.
    pub status_reason: Option<String>,
    /// Engine-assigned outputs.
    pub outputs: Vec<StackOutput>,
    /// When the stack was last updated (or created).
    pub last_updated: Option<DateTime<Utc>>,
}

/// A single engine-assigned stack output.
#[derive(Debug, Clone, Serialize)]
pub struct StackOutput {
    /// Output key.
    pub key: String,
    /// Output value.
    pub value: String,
    /// Output description.
    pub description: Option<String>,
}

/// Condition of a stack, derived from its CloudFormation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StackCondition {
    /// An operation is still running.
    InProgress,
    /// The last operation completed successfully.
    Succeeded,
    /// The last operation failed or was rolled back.
    Failed,
    /// The stack has been deleted.
    Deleted,
}

impl StackCondition {
    /// Classifies a raw CloudFormation status string.
    #[must_use]
    pub fn from_status(status: &str) -> Self {
        if status.ends_with("_IN_PROGRESS") {
            return Self::InProgress;
        }

        match status {
            "CREATE_COMPLETE" | "UPDATE_COMPLETE" | "IMPORT_COMPLETE" => Self::Succeeded,
            "DELETE_COMPLETE" => Self::Deleted,
            // Everything else is a failure or rollback terminal state.
            _ => Self::Failed,
        }
    }

    /// Returns true if the stack has reached a terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl std::fmt::Display for StackCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InProgress => "in progress",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Deleted => "deleted",
        };
        write!(f, "{s}")
    }
}

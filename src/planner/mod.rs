//! Planning module: template diffs and stack-level deployment plans.

mod diff;
mod plan;

pub use diff::{DiffDetail, DiffEngine, DiffType, ResourceDiff, StackDiff};
pub use plan::{ActionType, DeploymentPlan, PlannedAction};

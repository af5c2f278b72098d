//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying stacks,
//! plans, diffs, and deployment results in text or JSON form.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::cfn::{DeployOutcome, DeploymentResult};
use crate::planner::{ActionType, DeploymentPlan, DiffType, StackDiff};
use crate::synthesizer::SynthesizedStack;
use crate::template::TemplateHasher;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Stack row for table display.
#[derive(Tabled)]
struct StackRow {
    #[tabled(rename = "Stack")]
    name: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Resources")]
    resources: usize,
    #[tabled(rename = "Fingerprint")]
    fingerprint: String,
}

/// Plan action row for table display.
#[derive(Tabled)]
struct PlanActionRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Stack")]
    stack: String,
    #[tabled(rename = "Changes")]
    changes: usize,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Output row for table display.
#[derive(Tabled)]
struct OutputRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

// JSON mirror structures.

#[derive(Serialize)]
struct StackJson {
    name: String,
    region: String,
    resources: usize,
    fingerprint: String,
}

#[derive(Serialize)]
struct PlanJson {
    environment: String,
    actions: Vec<PlanActionJson>,
}

#[derive(Serialize)]
struct PlanActionJson {
    action: String,
    stack: String,
    changes: usize,
    reason: String,
}

#[derive(Serialize)]
struct StackDiffJson {
    stack: String,
    creates: usize,
    updates: usize,
    deletes: usize,
    unchanged: usize,
    resources: Vec<ResourceDiffJson>,
}

#[derive(Serialize)]
struct ResourceDiffJson {
    logical_id: String,
    resource_type: String,
    action: String,
    fields: Vec<String>,
}

#[derive(Serialize)]
struct ResultJson {
    stack: String,
    action: String,
    outcome: String,
    elapsed_secs: u64,
    outputs: Vec<crate::cfn::StackOutput>,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the stack listing for an environment.
    #[must_use]
    pub fn format_stack_list(&self, stacks: &[SynthesizedStack]) -> String {
        let hasher = TemplateHasher::new();
        match self.format {
            OutputFormat::Json => {
                let entries: Vec<StackJson> = stacks
                    .iter()
                    .map(|s| StackJson {
                        name: s.stack_name.clone(),
                        region: s.region.clone(),
                        resources: s.template.resource_count(),
                        fingerprint: Self::fingerprint(&hasher, s),
                    })
                    .collect();
                serde_json::to_string_pretty(&entries).unwrap_or_default()
            }
            OutputFormat::Text => {
                let rows: Vec<StackRow> = stacks
                    .iter()
                    .map(|s| StackRow {
                        name: s.stack_name.clone(),
                        region: s.region.clone(),
                        resources: s.template.resource_count(),
                        fingerprint: Self::fingerprint(&hasher, s),
                    })
                    .collect();
                Table::new(rows).to_string()
            }
        }
    }

    /// Formats a deployment plan for display.
    #[must_use]
    pub fn format_plan(&self, plan: &DeploymentPlan) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = PlanJson {
                    environment: plan.environment.clone(),
                    actions: plan
                        .actions
                        .iter()
                        .map(|a| PlanActionJson {
                            action: a.action_type.to_string(),
                            stack: a.stack.stack_name.clone(),
                            changes: a.resource_changes,
                            reason: a.reason.clone(),
                        })
                        .collect(),
                };
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => Self::format_plan_text(plan),
        }
    }

    /// Formats a plan as text.
    fn format_plan_text(plan: &DeploymentPlan) -> String {
        if plan.is_empty() {
            return format!(
                "{} No changes required - deployed stacks are up to date.\n",
                "✓".green()
            );
        }

        let mut output = String::new();
        let _ = writeln!(output, "\nDeployment plan for {}:\n", plan.environment);

        let rows: Vec<PlanActionRow> = plan
            .actions
            .iter()
            .enumerate()
            .map(|(i, a)| PlanActionRow {
                index: i + 1,
                action: Self::format_action_type(a.action_type),
                stack: a.stack.stack_name.clone(),
                changes: a.resource_changes,
                reason: a.reason.clone(),
            })
            .collect();

        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let _ = writeln!(
            output,
            "\nPlan: {} to create, {} to update",
            plan.create_count().to_string().green(),
            plan.update_count().to_string().yellow(),
        );

        output
    }

    /// Formats stack diffs for display.
    #[must_use]
    pub fn format_diffs(&self, diffs: &[StackDiff]) -> String {
        match self.format {
            OutputFormat::Json => {
                let entries: Vec<StackDiffJson> = diffs
                    .iter()
                    .map(|d| StackDiffJson {
                        stack: d.stack_name.clone(),
                        creates: d.creates,
                        updates: d.updates,
                        deletes: d.deletes,
                        unchanged: d.unchanged,
                        resources: d
                            .actionable_diffs()
                            .iter()
                            .map(|r| ResourceDiffJson {
                                logical_id: r.logical_id.clone(),
                                resource_type: r.resource_type.clone(),
                                action: r.diff_type.to_string(),
                                fields: r.details.iter().map(|det| det.field.clone()).collect(),
                            })
                            .collect(),
                    })
                    .collect();
                serde_json::to_string_pretty(&entries).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = String::new();
                for diff in diffs {
                    output.push_str(&Self::format_diff_text(diff));
                    output.push('\n');
                }
                output
            }
        }
    }

    /// Formats a single stack diff as text.
    fn format_diff_text(diff: &StackDiff) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "{}", diff.stack_name.bold());

        if !diff.has_baseline {
            let _ = writeln!(
                output,
                "  {} (all {} resources will be created)",
                "Stack does not exist yet".yellow(),
                diff.resources.len()
            );
        }

        if !diff.has_changes() {
            let _ = writeln!(output, "  {} No changes", "✓".green());
            return output;
        }

        for resource in diff.actionable_diffs() {
            let line = format!("{} [{}]", resource.logical_id, resource.resource_type);
            match resource.diff_type {
                DiffType::Create => {
                    let _ = writeln!(output, "  {} {}", "+".green(), line.green());
                }
                DiffType::Delete => {
                    let _ = writeln!(output, "  {} {}", "-".red(), line.red());
                }
                DiffType::Update => {
                    let _ = writeln!(output, "  {} {}", "~".yellow(), line.yellow());
                    for detail in &resource.details {
                        let _ = writeln!(
                            output,
                            "      {}: {} -> {}",
                            detail.field,
                            detail.old_value.as_deref().unwrap_or("(none)"),
                            detail.new_value.as_deref().unwrap_or("(removed)"),
                        );
                    }
                }
                DiffType::NoChange => {}
            }
        }

        for detail in &diff.outputs {
            let _ = writeln!(
                output,
                "  {} Output {}: {} -> {}",
                "~".yellow(),
                detail.field,
                detail.old_value.as_deref().unwrap_or("(none)"),
                detail.new_value.as_deref().unwrap_or("(removed)"),
            );
        }

        let _ = writeln!(
            output,
            "\n  {} to create, {} to update, {} to delete, {} unchanged",
            diff.creates.to_string().green(),
            diff.updates.to_string().yellow(),
            diff.deletes.to_string().red(),
            diff.unchanged,
        );

        output
    }

    /// Formats deployment results for display.
    #[must_use]
    pub fn format_results(&self, results: &[DeploymentResult]) -> String {
        match self.format {
            OutputFormat::Json => {
                let entries: Vec<ResultJson> = results
                    .iter()
                    .map(|r| ResultJson {
                        stack: r.stack_name.clone(),
                        action: r.action.to_string(),
                        outcome: match r.outcome {
                            DeployOutcome::Deployed => String::from("deployed"),
                            DeployOutcome::AlreadyCurrent => String::from("already_current"),
                        },
                        elapsed_secs: r.elapsed_secs,
                        outputs: r.outputs.clone(),
                    })
                    .collect();
                serde_json::to_string_pretty(&entries).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = String::new();

                for result in results {
                    match result.outcome {
                        DeployOutcome::Deployed => {
                            let _ = writeln!(
                                output,
                                "{} {} ({}, {}s)",
                                "✓".green(),
                                result.stack_name.bold(),
                                result.action,
                                result.elapsed_secs,
                            );
                        }
                        DeployOutcome::AlreadyCurrent => {
                            let _ = writeln!(
                                output,
                                "{} {} (already current)",
                                "✓".green(),
                                result.stack_name.bold(),
                            );
                        }
                    }

                    if !result.outputs.is_empty() {
                        let rows: Vec<OutputRow> = result
                            .outputs
                            .iter()
                            .map(|o| OutputRow {
                                key: o.key.clone(),
                                value: o.value.clone(),
                            })
                            .collect();
                        for line in Table::new(rows).to_string().lines() {
                            let _ = writeln!(output, "  {line}");
                        }
                    }
                    output.push('\n');
                }

                let deployed = results
                    .iter()
                    .filter(|r| r.outcome == DeployOutcome::Deployed)
                    .count();
                let _ = writeln!(
                    output,
                    "Deployed {deployed} stack(s), {} already current",
                    results.len() - deployed
                );

                output
            }
        }
    }

    /// Formats an action type with color.
    fn format_action_type(action: ActionType) -> String {
        match action {
            ActionType::CreateStack => "create".green().to_string(),
            ActionType::UpdateStack => "update".yellow().to_string(),
            ActionType::Noop => "noop".dimmed().to_string(),
        }
    }

    /// Computes the short template fingerprint for display.
    fn fingerprint(hasher: &TemplateHasher, stack: &SynthesizedStack) -> String {
        hasher
            .hash_template(&stack.template)
            .map(|h| TemplateHasher::short_hash(&h))
            .unwrap_or_else(|_| String::from("????????"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigParser;
    use crate::planner::DiffEngine;
    use crate::synthesizer::Synthesizer;

    fn sample_stacks() -> Vec<SynthesizedStack> {
        let config = ConfigParser::new()
            .parse_json(
                r#"{
                    "context": {
                        "development": {
                            "env": "development",
                            "region": "eu-west-1",
                            "vpc": { "enable_nat_gateway": false },
                            "s3": [{ "bucket_name": "store.dev" }]
                        }
                    }
                }"#,
                None,
            )
            .unwrap();
        Synthesizer::new(&config).synthesize("development").unwrap()
    }

    #[test]
    fn test_stack_list_text() {
        let formatter = OutputFormatter::new(OutputFormat::Text);
        let rendered = formatter.format_stack_list(&sample_stacks());
        assert!(rendered.contains("VpcStack-development"));
        assert!(rendered.contains("S3Stack-development"));
        assert!(rendered.contains("eu-west-1"));
    }

    #[test]
    fn test_stack_list_json() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let rendered = formatter.format_stack_list(&sample_stacks());
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
        assert_eq!(value[0]["name"], "VpcStack-development");
    }

    #[test]
    fn test_diff_json_counts() {
        let stacks = sample_stacks();
        let engine = DiffEngine::new();
        let diffs: Vec<StackDiff> = stacks
            .iter()
            .map(|s| engine.compute_diff(&s.stack_name, &s.template, None))
            .collect();

        let formatter = OutputFormatter::new(OutputFormat::Json);
        let rendered = formatter.format_diffs(&diffs);
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(
            value[0]["creates"].as_u64().unwrap(),
            stacks[0].template.resource_count() as u64
        );
    }
}

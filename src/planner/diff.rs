//! Diff engine for comparing synthesized templates against deployed ones.
//!
//! This is a client-side preview of what a deployment would change. The
//! provisioning engine computes the authoritative change set at deploy
//! time; this diff exists so changes can be inspected before submission.

use serde_json::Value;
use tracing::debug;

use crate::template::Template;

/// Engine for computing template diffs.
#[derive(Debug, Default)]
pub struct DiffEngine;

/// Difference for a single declared resource.
#[derive(Debug, Clone)]
pub struct ResourceDiff {
    /// Logical ID of the resource.
    pub logical_id: String,
    /// Resource type (the new type for creates/updates, old for deletes).
    pub resource_type: String,
    /// Type of difference.
    pub diff_type: DiffType,
    /// Details about the difference.
    pub details: Vec<DiffDetail>,
}

/// Type of difference detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffType {
    /// Resource needs to be created.
    Create,
    /// Resource needs to be updated.
    Update,
    /// Resource needs to be deleted.
    Delete,
    /// Resource is unchanged.
    NoChange,
}

/// Detail about a specific difference.
#[derive(Debug, Clone)]
pub struct DiffDetail {
    /// Field that differs.
    pub field: String,
    /// Old value (rendered as JSON).
    pub old_value: Option<String>,
    /// New value (rendered as JSON).
    pub new_value: Option<String>,
}

/// Complete diff for one stack.
#[derive(Debug)]
pub struct StackDiff {
    /// Name of the stack.
    pub stack_name: String,
    /// Whether a deployed template existed to compare against.
    pub has_baseline: bool,
    /// All resource diffs.
    pub resources: Vec<ResourceDiff>,
    /// Output declaration changes.
    pub outputs: Vec<DiffDetail>,
    /// Number of resources to create.
    pub creates: usize,
    /// Number of resources to update.
    pub updates: usize,
    /// Number of resources to delete.
    pub deletes: usize,
    /// Number of unchanged resources.
    pub unchanged: usize,
}

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the diff between a synthesized template and the deployed
    /// baseline. A missing baseline means the stack does not exist yet and
    /// every resource is a create.
    #[must_use]
    pub fn compute_diff(
        &self,
        stack_name: &str,
        desired: &Template,
        deployed: Option<&Template>,
    ) -> StackDiff {
        let mut resources = Vec::new();

        for (logical_id, resource) in &desired.resources {
            let old = deployed.and_then(|t| t.resource(logical_id));
            resources.push(Self::compute_resource_diff(logical_id, old, resource));
        }

        // Deployed resources absent from the new template are deletes.
        if let Some(deployed) = deployed {
            for (logical_id, old) in &deployed.resources {
                if !desired.resources.contains_key(logical_id) {
                    debug!("Resource {logical_id} removed from template");
                    resources.push(ResourceDiff {
                        logical_id: logical_id.clone(),
                        resource_type: old.resource_type.clone(),
                        diff_type: DiffType::Delete,
                        details: vec![],
                    });
                }
            }
        }

        let outputs = Self::compute_output_diff(desired, deployed);

        let count = |ty: DiffType| resources.iter().filter(|d| d.diff_type == ty).count();
        StackDiff {
            stack_name: stack_name.to_string(),
            has_baseline: deployed.is_some(),
            creates: count(DiffType::Create),
            updates: count(DiffType::Update),
            deletes: count(DiffType::Delete),
            unchanged: count(DiffType::NoChange),
            resources,
            outputs,
        }
    }

    /// Computes the diff for a single resource.
    fn compute_resource_diff(
        logical_id: &str,
        old: Option<&crate::template::Resource>,
        new: &crate::template::Resource,
    ) -> ResourceDiff {
        let Some(old) = old else {
            return ResourceDiff {
                logical_id: logical_id.to_string(),
                resource_type: new.resource_type.clone(),
                diff_type: DiffType::Create,
                details: vec![],
            };
        };

        let mut details = Vec::new();

        if old.resource_type != new.resource_type {
            details.push(DiffDetail {
                field: String::from("Type"),
                old_value: Some(old.resource_type.clone()),
                new_value: Some(new.resource_type.clone()),
            });
        }

        details.extend(Self::compare_properties(&old.properties, &new.properties));

        if old.deletion_policy != new.deletion_policy {
            details.push(DiffDetail {
                field: String::from("DeletionPolicy"),
                old_value: old.deletion_policy.map(|p| format!("{p:?}")),
                new_value: new.deletion_policy.map(|p| format!("{p:?}")),
            });
        }

        if old.depends_on != new.depends_on {
            details.push(DiffDetail {
                field: String::from("DependsOn"),
                old_value: Some(old.depends_on.join(",")),
                new_value: Some(new.depends_on.join(",")),
            });
        }

        let diff_type = if details.is_empty() {
            DiffType::NoChange
        } else {
            DiffType::Update
        };

        ResourceDiff {
            logical_id: logical_id.to_string(),
            resource_type: new.resource_type.clone(),
            diff_type,
            details,
        }
    }

    /// Compares two property objects key by key.
    fn compare_properties(old: &Value, new: &Value) -> Vec<DiffDetail> {
        let empty = serde_json::Map::new();
        let old_map = old.as_object().unwrap_or(&empty);
        let new_map = new.as_object().unwrap_or(&empty);

        let mut details = Vec::new();

        for (key, new_value) in new_map {
            match old_map.get(key) {
                Some(old_value) if old_value == new_value => {}
                old_value => details.push(DiffDetail {
                    field: key.clone(),
                    old_value: old_value.map(ToString::to_string),
                    new_value: Some(new_value.to_string()),
                }),
            }
        }

        for (key, old_value) in old_map {
            if !new_map.contains_key(key) {
                details.push(DiffDetail {
                    field: key.clone(),
                    old_value: Some(old_value.to_string()),
                    new_value: None,
                });
            }
        }

        details
    }

    /// Compares the output declarations of two templates.
    fn compute_output_diff(desired: &Template, deployed: Option<&Template>) -> Vec<DiffDetail> {
        let mut details = Vec::new();

        for (name, output) in &desired.outputs {
            let old = deployed.and_then(|t| t.outputs.get(name));
            match old {
                Some(old) if old.value == output.value => {}
                old => details.push(DiffDetail {
                    field: name.clone(),
                    old_value: old.map(|o| o.value.to_string()),
                    new_value: Some(output.value.to_string()),
                }),
            }
        }

        if let Some(deployed) = deployed {
            for (name, old) in &deployed.outputs {
                if !desired.outputs.contains_key(name) {
                    details.push(DiffDetail {
                        field: name.clone(),
                        old_value: Some(old.value.to_string()),
                        new_value: None,
                    });
                }
            }
        }

        details
    }
}

impl StackDiff {
    /// Returns true if there are any changes.
    #[must_use]
    pub const fn has_changes(&self) -> bool {
        !self.has_baseline || self.creates > 0 || self.updates > 0 || self.deletes > 0
    }

    /// Returns the total number of resource changes.
    #[must_use]
    pub const fn total_changes(&self) -> usize {
        self.creates + self.updates + self.deletes
    }

    /// Filters to only diffs that require action.
    #[must_use]
    pub fn actionable_diffs(&self) -> Vec<&ResourceDiff> {
        self.resources
            .iter()
            .filter(|d| d.diff_type != DiffType::NoChange)
            .collect()
    }
}

impl std::fmt::Display for DiffType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::NoChange => "no change",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for ResourceDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.logical_id, self.resource_type, self.diff_type)?;
        if !self.details.is_empty() {
            write!(f, " (")?;
            for (i, detail) in self.details.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", detail.field)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{Resource, Template};
    use serde_json::json;

    fn template_with(resources: &[(&str, &str, Value)]) -> Template {
        let mut template = Template::new("diff test");
        for (id, ty, props) in resources {
            template
                .add_resource(*id, Resource::new(*ty, props.clone()))
                .unwrap();
        }
        template
    }

    #[test]
    fn test_no_baseline_is_all_creates() {
        let desired = template_with(&[
            ("Vpc", "AWS::EC2::VPC", json!({ "CidrBlock": "10.0.0.0/16" })),
            ("Igw", "AWS::EC2::InternetGateway", json!({})),
        ]);

        let diff = DiffEngine::new().compute_diff("VpcStack-development", &desired, None);
        assert!(!diff.has_baseline);
        assert!(diff.has_changes());
        assert_eq!(diff.creates, 2);
        assert_eq!(diff.updates, 0);
    }

    #[test]
    fn test_identical_templates_unchanged() {
        let desired = template_with(&[(
            "Vpc",
            "AWS::EC2::VPC",
            json!({ "CidrBlock": "10.0.0.0/16" }),
        )]);
        let deployed = desired.clone();

        let diff = DiffEngine::new().compute_diff("VpcStack", &desired, Some(&deployed));
        assert!(!diff.has_changes());
        assert_eq!(diff.unchanged, 1);
        assert_eq!(diff.total_changes(), 0);
    }

    #[test]
    fn test_property_change_detected() {
        let deployed = template_with(&[(
            "Vpc",
            "AWS::EC2::VPC",
            json!({ "CidrBlock": "10.0.0.0/16", "EnableDnsSupport": true }),
        )]);
        let desired = template_with(&[(
            "Vpc",
            "AWS::EC2::VPC",
            json!({ "CidrBlock": "10.1.0.0/16", "EnableDnsSupport": true }),
        )]);

        let diff = DiffEngine::new().compute_diff("VpcStack", &desired, Some(&deployed));
        assert_eq!(diff.updates, 1);
        let details = &diff.resources[0].details;
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].field, "CidrBlock");
        assert_eq!(details[0].old_value.as_deref(), Some("\"10.0.0.0/16\""));
    }

    #[test]
    fn test_removed_resource_is_delete() {
        let deployed = template_with(&[
            ("Vpc", "AWS::EC2::VPC", json!({})),
            ("Nat", "AWS::EC2::NatGateway", json!({})),
        ]);
        let desired = template_with(&[("Vpc", "AWS::EC2::VPC", json!({}))]);

        let diff = DiffEngine::new().compute_diff("VpcStack", &desired, Some(&deployed));
        assert_eq!(diff.deletes, 1);
        assert_eq!(diff.unchanged, 1);
        let delete = diff
            .resources
            .iter()
            .find(|d| d.diff_type == DiffType::Delete)
            .unwrap();
        assert_eq!(delete.logical_id, "Nat");
    }

    #[test]
    fn test_output_changes_detected() {
        let mut deployed = template_with(&[("Vpc", "AWS::EC2::VPC", json!({}))]);
        deployed.add_output(
            "VpcId",
            crate::template::Output::new(crate::template::ref_to("Vpc")),
        );
        let desired = template_with(&[("Vpc", "AWS::EC2::VPC", json!({}))]);

        let diff = DiffEngine::new().compute_diff("VpcStack", &desired, Some(&deployed));
        assert_eq!(diff.outputs.len(), 1);
        assert!(diff.outputs[0].new_value.is_none());
    }
}

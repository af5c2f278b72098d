//! CloudFormation template document model.
//!
//! This module defines the declared-resource structures that synthesis
//! produces: a template is an ordered map of logical IDs to resource
//! declarations plus an ordered map of outputs. Ordering is preserved so
//! that synthesizing the same configuration twice yields byte-identical
//! documents.
//!
//! The model covers the template features this tool emits (resources,
//! outputs, deletion policies, dependencies). Anything else present in a
//! deployed template is ignored on deserialization.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Result, TemplateError};

/// CloudFormation template format version.
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

fn default_format_version() -> String {
    TEMPLATE_FORMAT_VERSION.to_string()
}

/// A CloudFormation template document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Template {
    /// Template format version.
    #[serde(rename = "AWSTemplateFormatVersion", default = "default_format_version")]
    pub format_version: String,
    /// Human-readable template description.
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared resources by logical ID, in declaration order.
    #[serde(rename = "Resources")]
    pub resources: IndexMap<String, Resource>,
    /// Declared outputs by name, in declaration order.
    #[serde(rename = "Outputs", default, skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, Output>,
}

/// A single declared resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resource {
    /// CloudFormation resource type (e.g. `AWS::EC2::VPC`).
    #[serde(rename = "Type")]
    pub resource_type: String,
    /// Resource properties as a JSON object.
    #[serde(rename = "Properties", default, skip_serializing_if = "Value::is_null")]
    pub properties: Value,
    /// What the engine does with the resource when the stack is deleted.
    #[serde(rename = "DeletionPolicy", skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<DeletionPolicy>,
    /// What the engine does with the old resource on replacement.
    #[serde(rename = "UpdateReplacePolicy", skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<DeletionPolicy>,
    /// Logical IDs this resource explicitly depends on.
    #[serde(rename = "DependsOn", default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

/// Resource retention policies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeletionPolicy {
    /// Delete the resource with the stack.
    Delete,
    /// Keep the resource when the stack is deleted.
    Retain,
    /// Snapshot the resource before deletion (where supported).
    Snapshot,
}

/// A declared stack output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Output {
    /// Output value, usually an intrinsic reference.
    #[serde(rename = "Value")]
    pub value: Value,
    /// Human-readable output description.
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Template {
    /// Creates an empty template with the given description.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            format_version: TEMPLATE_FORMAT_VERSION.to_string(),
            description: Some(description.into()),
            resources: IndexMap::new(),
            outputs: IndexMap::new(),
        }
    }

    /// Adds a resource declaration under the given logical ID.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::DuplicateLogicalId`] if the ID is taken.
    pub fn add_resource(&mut self, logical_id: impl Into<String>, resource: Resource) -> Result<()> {
        let logical_id = logical_id.into();
        if self.resources.contains_key(&logical_id) {
            return Err(TemplateError::DuplicateLogicalId { logical_id }.into());
        }
        self.resources.insert(logical_id, resource);
        Ok(())
    }

    /// Adds an output declaration under the given name.
    pub fn add_output(&mut self, name: impl Into<String>, output: Output) {
        self.outputs.insert(name.into(), output);
    }

    /// Returns the number of declared resources.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Returns the logical IDs of resources with the given type.
    #[must_use]
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<&str> {
        self.resources
            .iter()
            .filter(|(_, r)| r.resource_type == resource_type)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Returns the number of resources with the given type.
    #[must_use]
    pub fn count_of_type(&self, resource_type: &str) -> usize {
        self.resources_of_type(resource_type).len()
    }

    /// Looks up a resource by logical ID.
    #[must_use]
    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.get(logical_id)
    }

    /// Serializes the template to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| TemplateError::serialization(e.to_string()).into())
    }

    /// Serializes the template to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| TemplateError::serialization(e.to_string()).into())
    }

    /// Parses a template from a JSON string (e.g. a deployed template body).
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is not a valid template document.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| TemplateError::serialization(format!("invalid template: {e}")).into())
    }
}

impl Resource {
    /// Creates a resource declaration with the given type and properties.
    #[must_use]
    pub fn new(resource_type: impl Into<String>, properties: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties,
            deletion_policy: None,
            update_replace_policy: None,
            depends_on: Vec::new(),
        }
    }

    /// Sets the deletion policy.
    #[must_use]
    pub const fn with_deletion_policy(mut self, policy: DeletionPolicy) -> Self {
        self.deletion_policy = Some(policy);
        self
    }

    /// Sets the update-replace policy.
    #[must_use]
    pub const fn with_update_replace_policy(mut self, policy: DeletionPolicy) -> Self {
        self.update_replace_policy = Some(policy);
        self
    }

    /// Adds an explicit dependency on another logical ID.
    #[must_use]
    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.push(logical_id.into());
        self
    }
}

impl Output {
    /// Creates an output with the given value.
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self {
            value,
            description: None,
        }
    }

    /// Sets the output description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

// Intrinsic function helpers. Synthesis never resolves these; the
// provisioning engine does at deploy time.

/// `Ref` to another logical ID.
#[must_use]
pub fn ref_to(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

/// `Fn::GetAtt` on another resource.
#[must_use]
pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

/// `Fn::Sub` string substitution.
#[must_use]
pub fn sub(template: &str) -> Value {
    json!({ "Fn::Sub": template })
}

/// `Fn::Join` over a list of values.
#[must_use]
pub fn join(separator: &str, values: Vec<Value>) -> Value {
    json!({ "Fn::Join": [separator, values] })
}

/// Selects the availability zone at `index` from the region's zone list.
#[must_use]
pub fn select_az(index: u32) -> Value {
    json!({ "Fn::Select": [index, { "Fn::GetAZs": "" }] })
}

/// A `Key`/`Value` tag object.
#[must_use]
pub fn tag(key: &str, value: impl Into<Value>) -> Value {
    json!({ "Key": key, "Value": value.into() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_logical_id_rejected() {
        let mut template = Template::new("test");
        let resource = Resource::new("AWS::EC2::VPC", json!({ "CidrBlock": "10.0.0.0/16" }));
        template.add_resource("Vpc", resource.clone()).unwrap();
        assert!(template.add_resource("Vpc", resource).is_err());
    }

    #[test]
    fn test_serialization_keys() {
        let mut template = Template::new("test stack");
        template
            .add_resource(
                "Bucket",
                Resource::new("AWS::S3::Bucket", json!({ "BucketName": "demo" }))
                    .with_deletion_policy(DeletionPolicy::Retain),
            )
            .unwrap();
        template.add_output("BucketName", Output::new(ref_to("Bucket")));

        let value: Value = serde_json::from_str(&template.to_json().unwrap()).unwrap();
        assert_eq!(value["AWSTemplateFormatVersion"], "2010-09-09");
        assert_eq!(value["Resources"]["Bucket"]["Type"], "AWS::S3::Bucket");
        assert_eq!(value["Resources"]["Bucket"]["DeletionPolicy"], "Retain");
        assert_eq!(
            value["Resources"]["Bucket"]["Properties"]["BucketName"],
            "demo"
        );
        assert_eq!(value["Outputs"]["BucketName"]["Value"]["Ref"], "Bucket");
    }

    #[test]
    fn test_round_trip() {
        let mut template = Template::new("round trip");
        template
            .add_resource(
                "Vpc",
                Resource::new("AWS::EC2::VPC", json!({ "CidrBlock": "10.0.0.0/16" })),
            )
            .unwrap();

        let parsed = Template::from_json(&template.to_json().unwrap()).unwrap();
        assert_eq!(parsed, template);
    }

    #[test]
    fn test_resources_of_type() {
        let mut template = Template::new("test");
        for i in 0..3 {
            template
                .add_resource(
                    format!("Subnet{i}"),
                    Resource::new("AWS::EC2::Subnet", json!({})),
                )
                .unwrap();
        }
        template
            .add_resource("Vpc", Resource::new("AWS::EC2::VPC", json!({})))
            .unwrap();

        assert_eq!(template.count_of_type("AWS::EC2::Subnet"), 3);
        assert_eq!(template.count_of_type("AWS::EC2::VPC"), 1);
        assert_eq!(template.count_of_type("AWS::EC2::NatGateway"), 0);
    }

    #[test]
    fn test_intrinsics() {
        assert_eq!(ref_to("Vpc"), json!({ "Ref": "Vpc" }));
        assert_eq!(
            get_att("Bucket", "Arn"),
            json!({ "Fn::GetAtt": ["Bucket", "Arn"] })
        );
        assert_eq!(
            select_az(1),
            json!({ "Fn::Select": [1, { "Fn::GetAZs": "" }] })
        );
    }
}

//! Storage resource definition.
//!
//! Declares the S3 stack for an environment: one managed bucket per
//! specification entry, with encryption at rest, versioning, public access
//! blocked, and retain-on-delete, all fixed by policy. Buckets are
//! independent of each other; declaration order does not affect the
//! outcome.

use serde_json::json;

use crate::config::BucketSpec;
use crate::error::{Result, TemplateError};
use crate::template::{get_att, ref_to, DeletionPolicy, Output, Resource, Template};

/// Builder for the storage stack of one environment.
#[derive(Debug)]
pub struct StorageStack<'a> {
    /// Environment name.
    env_name: &'a str,
    /// Bucket specifications.
    buckets: &'a [BucketSpec],
}

impl<'a> StorageStack<'a> {
    /// Creates a storage stack builder.
    #[must_use]
    pub const fn new(env_name: &'a str, buckets: &'a [BucketSpec]) -> Self {
        Self { env_name, buckets }
    }

    /// Synthesizes the S3 template for this environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a specification is missing its bucket name or
    /// two names collapse to the same logical ID.
    pub fn synthesize(&self) -> Result<Template> {
        let env = self.env_name;
        let mut template = Template::new(format!("S3 buckets for {env} environment"));

        for spec in self.buckets {
            if spec.bucket_name.is_empty() {
                return Err(TemplateError::MissingField {
                    resource: String::from("bucket"),
                    field: String::from("bucket_name"),
                }
                .into());
            }

            let logical_id = sanitize_logical_id(&spec.bucket_name);

            template.add_resource(
                &logical_id,
                Resource::new(
                    "AWS::S3::Bucket",
                    json!({
                        "BucketName": spec.bucket_name,
                        "VersioningConfiguration": { "Status": "Enabled" },
                        "BucketEncryption": {
                            "ServerSideEncryptionConfiguration": [
                                {
                                    "ServerSideEncryptionByDefault": {
                                        "SSEAlgorithm": "AES256"
                                    }
                                }
                            ]
                        },
                        "PublicAccessBlockConfiguration": {
                            "BlockPublicAcls": true,
                            "BlockPublicPolicy": true,
                            "IgnorePublicAcls": true,
                            "RestrictPublicBuckets": true,
                        },
                    }),
                )
                .with_deletion_policy(DeletionPolicy::Retain)
                .with_update_replace_policy(DeletionPolicy::Retain),
            )?;

            template.add_output(
                format!("{logical_id}Name"),
                Output::new(ref_to(&logical_id)).with_description(format!(
                    "Name of S3 bucket {} for {env} environment",
                    spec.bucket_name
                )),
            );
            template.add_output(
                format!("{logical_id}Arn"),
                Output::new(get_att(&logical_id, "Arn")).with_description(format!(
                    "ARN of S3 bucket {} for {env} environment",
                    spec.bucket_name
                )),
            );
        }

        Ok(template)
    }
}

/// Converts a bucket name to a valid template logical ID.
///
/// Splits on dots, hyphens, and underscores and joins the capitalized
/// parts, so `pycon.day1.store.development` becomes
/// `PyconDay1StoreDevelopment`.
fn sanitize_logical_id(bucket_name: &str) -> String {
    bucket_name
        .split(['.', '-', '_'])
        .filter(|part| !part.is_empty())
        .map(capitalize)
        .collect()
}

fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(names: &[&str]) -> Vec<BucketSpec> {
        names
            .iter()
            .map(|n| BucketSpec {
                bucket_name: (*n).to_string(),
            })
            .collect()
    }

    #[test]
    fn test_one_bucket_per_spec() {
        let buckets = specs(&["store.dev", "logs.dev", "assets.dev"]);
        let template = StorageStack::new("development", &buckets).synthesize().unwrap();
        assert_eq!(template.count_of_type("AWS::S3::Bucket"), 3);
    }

    #[test]
    fn test_bucket_policy_fields() {
        let buckets = specs(&["pycon.day1.store.development"]);
        let template = StorageStack::new("development", &buckets).synthesize().unwrap();

        let bucket = template.resource("PyconDay1StoreDevelopment").unwrap();
        assert_eq!(bucket.resource_type, "AWS::S3::Bucket");
        assert_eq!(bucket.deletion_policy, Some(DeletionPolicy::Retain));
        assert_eq!(bucket.update_replace_policy, Some(DeletionPolicy::Retain));

        let props = &bucket.properties;
        assert_eq!(props["BucketName"], "pycon.day1.store.development");
        assert_eq!(props["VersioningConfiguration"]["Status"], "Enabled");
        assert_eq!(
            props["BucketEncryption"]["ServerSideEncryptionConfiguration"][0]
                ["ServerSideEncryptionByDefault"]["SSEAlgorithm"],
            "AES256"
        );

        let block = &props["PublicAccessBlockConfiguration"];
        for key in [
            "BlockPublicAcls",
            "BlockPublicPolicy",
            "IgnorePublicAcls",
            "RestrictPublicBuckets",
        ] {
            assert_eq!(block[key], true, "{key} must be enabled");
        }
    }

    #[test]
    fn test_bucket_outputs() {
        let buckets = specs(&["store.dev"]);
        let template = StorageStack::new("development", &buckets).synthesize().unwrap();

        assert!(template.outputs.contains_key("StoreDevName"));
        assert_eq!(
            template.outputs["StoreDevArn"].value,
            serde_json::json!({ "Fn::GetAtt": ["StoreDev", "Arn"] })
        );
    }

    #[test]
    fn test_empty_bucket_name_fails() {
        let buckets = specs(&["store.dev", ""]);
        let result = StorageStack::new("development", &buckets).synthesize();
        assert!(result.is_err());
    }

    #[test]
    fn test_colliding_logical_ids_fail() {
        // Distinct names that sanitize to the same logical ID.
        let buckets = specs(&["store.dev", "store-dev"]);
        let result = StorageStack::new("development", &buckets).synthesize();
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_spec_list() {
        let template = StorageStack::new("development", &[]).synthesize().unwrap();
        assert_eq!(template.resource_count(), 0);
    }

    #[test]
    fn test_sanitize_logical_id() {
        assert_eq!(
            sanitize_logical_id("pycon.day1.store.development"),
            "PyconDay1StoreDevelopment"
        );
        assert_eq!(sanitize_logical_id("my-bucket_name"), "MyBucketName");
        assert_eq!(sanitize_logical_id("abc"), "Abc");
    }

    #[test]
    fn test_synthesis_idempotent() {
        let buckets = specs(&["store.dev", "logs.dev"]);
        let stack = StorageStack::new("development", &buckets);
        assert_eq!(
            stack.synthesize().unwrap().to_json().unwrap(),
            stack.synthesize().unwrap().to_json().unwrap()
        );
    }
}

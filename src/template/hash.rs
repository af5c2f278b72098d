//! Template hashing for change detection.
//!
//! Fingerprints are computed over the canonical JSON serialization of a
//! template. Because synthesis preserves declaration order, identical
//! configurations hash identically, which lets deploy skip stacks whose
//! deployed template already matches.

use sha2::{Digest, Sha256};

use crate::error::Result;

use super::document::Template;

/// Hasher for computing template fingerprints.
#[derive(Debug, Default)]
pub struct TemplateHasher;

impl TemplateHasher {
    /// Creates a new template hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the fingerprint of a template.
    ///
    /// # Errors
    ///
    /// Returns an error if the template cannot be serialized.
    pub fn hash_template(&self, template: &Template) -> Result<String> {
        Ok(Self::hash_bytes(template.to_json()?.as_bytes()))
    }

    /// Computes the fingerprint of a raw template body after normalizing it
    /// through the document model, so formatting differences do not count
    /// as changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not a valid template.
    pub fn hash_body(&self, body: &str) -> Result<String> {
        self.hash_template(&Template::from_json(body)?)
    }

    /// Returns the first 8 characters of a hash for display purposes.
    #[must_use]
    pub fn short_hash(hash: &str) -> String {
        hash.chars().take(8).collect()
    }

    fn hash_bytes(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{Resource, Template};
    use serde_json::json;

    fn sample_template() -> Template {
        let mut template = Template::new("hash test");
        template
            .add_resource(
                "Vpc",
                Resource::new("AWS::EC2::VPC", json!({ "CidrBlock": "10.0.0.0/16" })),
            )
            .unwrap();
        template
    }

    #[test]
    fn test_hash_deterministic() {
        let hasher = TemplateHasher::new();
        let template = sample_template();

        let hash1 = hasher.hash_template(&template).unwrap();
        let hash2 = hasher.hash_template(&template).unwrap();
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_changes_with_content() {
        let hasher = TemplateHasher::new();
        let template = sample_template();
        let mut changed = template.clone();
        changed
            .add_resource("Igw", Resource::new("AWS::EC2::InternetGateway", json!({})))
            .unwrap();

        assert_ne!(
            hasher.hash_template(&template).unwrap(),
            hasher.hash_template(&changed).unwrap()
        );
    }

    #[test]
    fn test_hash_body_normalizes_formatting() {
        let hasher = TemplateHasher::new();
        let template = sample_template();

        let compact = hasher.hash_body(&template.to_json().unwrap()).unwrap();
        let pretty = hasher.hash_body(&template.to_json_pretty().unwrap()).unwrap();
        assert_eq!(compact, pretty);
    }

    #[test]
    fn test_short_hash() {
        let short = TemplateHasher::short_hash("abcdef1234567890");
        assert_eq!(short, "abcdef12");
    }
}

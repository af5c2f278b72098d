//! Environment selection and stack synthesis.
//!
//! This is the entry-point semantics of the tool: resolve the requested
//! environment, look it up in the configuration (failing before any
//! resource is declared if absent), and instantiate the network and
//! storage stacks with environment-derived naming and tags.
//!
//! Synthesis is deterministic: the same configuration always produces
//! byte-identical stack templates.

use indexmap::IndexMap;
use tracing::info;

use crate::config::{AppConfig, ConfigParser, EnvironmentConfig, DEFAULT_ENVIRONMENT};
use crate::error::{PlanError, Result};
use crate::stacks::{NetworkStack, StorageStack};
use crate::template::Template;

/// A synthesized stack ready for submission to the provisioning engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedStack {
    /// Deployable stack name (e.g. `VpcStack-development`).
    pub stack_name: String,
    /// Region the stack deploys into.
    pub region: String,
    /// The synthesized template document.
    pub template: Template,
    /// Stack-level tags, propagated by the engine to every resource.
    pub tags: IndexMap<String, String>,
}

/// Synthesizer for an application configuration.
#[derive(Debug)]
pub struct Synthesizer<'a> {
    /// The loaded configuration.
    config: &'a AppConfig,
}

/// Resolves the environment name from invocation context.
///
/// Precedence: explicit `--context env=<name>`, then the `ENVSTACK_ENV`
/// variable, then the default environment.
#[must_use]
pub fn select_environment(explicit: Option<&str>) -> String {
    explicit.map_or_else(
        || {
            ConfigParser::env_from_environment()
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
        },
        ToString::to_string,
    )
}

impl<'a> Synthesizer<'a> {
    /// Creates a synthesizer over a loaded configuration.
    #[must_use]
    pub const fn new(config: &'a AppConfig) -> Self {
        Self { config }
    }

    /// Synthesizes all stacks for the given environment.
    ///
    /// # Errors
    ///
    /// Fails with a configuration error before any resource is declared
    /// if the environment is not present in the context map.
    pub fn synthesize(&self, env_name: &str) -> Result<Vec<SynthesizedStack>> {
        let env = self.config.environment(env_name)?;

        info!("Synthesizing environment: {env_name}");
        info!("Using region: {}", env.region);

        let tags = self.stack_tags(env);

        let vpc = SynthesizedStack {
            stack_name: format!("VpcStack-{env_name}"),
            region: env.vpc_region().to_string(),
            template: NetworkStack::new(env_name, &env.vpc).synthesize()?,
            tags: tags.clone(),
        };

        let s3 = SynthesizedStack {
            stack_name: format!("S3Stack-{env_name}"),
            region: env.region.clone(),
            template: StorageStack::new(env_name, &env.s3).synthesize()?,
            tags,
        };

        Ok(vec![vpc, s3])
    }

    /// Synthesizes stacks for the environment, keeping only those whose
    /// name matches the filter (exact or prefix match).
    ///
    /// # Errors
    ///
    /// Returns an error if the filter matches no stack.
    pub fn synthesize_filtered(
        &self,
        env_name: &str,
        filter: Option<&str>,
    ) -> Result<Vec<SynthesizedStack>> {
        let stacks = self.synthesize(env_name)?;

        let Some(filter) = filter else {
            return Ok(stacks);
        };

        let available = stacks
            .iter()
            .map(|s| s.stack_name.clone())
            .collect::<Vec<_>>()
            .join(", ");

        let matched: Vec<_> = stacks
            .into_iter()
            .filter(|s| s.stack_name == filter || s.stack_name.starts_with(filter))
            .collect();

        if matched.is_empty() {
            return Err(PlanError::UnknownStack {
                name: filter.to_string(),
                available,
            }
            .into());
        }

        Ok(matched)
    }

    /// Assembles the stack-level tags for an environment: the derived
    /// defaults, with any configured extras merged over them.
    fn stack_tags(&self, env: &EnvironmentConfig) -> IndexMap<String, String> {
        let mut tags = IndexMap::new();
        tags.insert(String::from("Environment"), env.env.clone());
        tags.insert(String::from("Project"), self.config.project.clone());
        tags.insert(String::from("Region"), env.region.clone());

        let mut extras: Vec<_> = env.tags.iter().collect();
        extras.sort_by(|a, b| a.0.cmp(b.0));
        for (key, value) in extras {
            tags.insert(key.clone(), value.clone());
        }

        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigParser;

    fn sample_config() -> AppConfig {
        ConfigParser::new()
            .parse_json(
                r#"{
                    "project": "pycon",
                    "context": {
                        "development": {
                            "env": "development",
                            "region": "eu-west-1",
                            "vpc": {
                                "cidr": "10.0.0.0/16",
                                "max_azs": 2,
                                "enable_nat_gateway": false
                            },
                            "s3": [
                                { "bucket_name": "pycon.day1.store.development" }
                            ],
                            "tags": { "Owner": "platform" }
                        },
                        "production": {
                            "env": "production",
                            "region": "eu-west-1",
                            "vpc": {
                                "cidr": "10.2.0.0/16",
                                "max_azs": 3,
                                "enable_nat_gateway": true
                            },
                            "s3": [
                                { "bucket_name": "pycon.day1.store.production" }
                            ]
                        }
                    }
                }"#,
                None,
            )
            .unwrap()
    }

    #[test]
    fn test_unknown_environment_fails_before_declaration() {
        let config = sample_config();
        let synthesizer = Synthesizer::new(&config);
        let result = synthesizer.synthesize("qa");
        assert!(result.is_err());
        let message = result.unwrap_err().to_string();
        assert!(message.contains("'qa'"));
        assert!(message.contains("development"));
    }

    #[test]
    fn test_development_example() {
        let config = sample_config();
        let stacks = Synthesizer::new(&config).synthesize("development").unwrap();
        assert_eq!(stacks.len(), 2);

        let vpc = &stacks[0];
        assert_eq!(vpc.stack_name, "VpcStack-development");
        assert_eq!(vpc.region, "eu-west-1");
        assert_eq!(vpc.template.count_of_type("AWS::EC2::Subnet"), 4);
        assert_eq!(vpc.template.count_of_type("AWS::EC2::NatGateway"), 0);
        assert_eq!(vpc.template.count_of_type("AWS::EC2::SecurityGroup"), 2);
        assert_eq!(vpc.template.count_of_type("AWS::EC2::VPCEndpoint"), 2);

        let s3 = &stacks[1];
        assert_eq!(s3.stack_name, "S3Stack-development");
        assert_eq!(s3.template.count_of_type("AWS::S3::Bucket"), 1);
        assert!(s3.template.resource("PyconDay1StoreDevelopment").is_some());
    }

    #[test]
    fn test_stack_tags() {
        let config = sample_config();
        let stacks = Synthesizer::new(&config).synthesize("development").unwrap();
        let tags = &stacks[0].tags;

        assert_eq!(tags["Environment"], "development");
        assert_eq!(tags["Project"], "pycon");
        assert_eq!(tags["Region"], "eu-west-1");
        assert_eq!(tags["Owner"], "platform");
    }

    #[test]
    fn test_nat_gateway_in_production() {
        let config = sample_config();
        let stacks = Synthesizer::new(&config).synthesize("production").unwrap();
        let vpc = &stacks[0];
        assert_eq!(vpc.template.count_of_type("AWS::EC2::Subnet"), 6);
        assert_eq!(vpc.template.count_of_type("AWS::EC2::NatGateway"), 1);
    }

    #[test]
    fn test_stack_filter() {
        let config = sample_config();
        let synthesizer = Synthesizer::new(&config);

        let matched = synthesizer
            .synthesize_filtered("development", Some("VpcStack"))
            .unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].stack_name, "VpcStack-development");

        assert!(synthesizer
            .synthesize_filtered("development", Some("Unknown"))
            .is_err());
    }

    #[test]
    fn test_synthesis_idempotent() {
        let config = sample_config();
        let synthesizer = Synthesizer::new(&config);

        let first = synthesizer.synthesize("development").unwrap();
        let second = synthesizer.synthesize("development").unwrap();
        assert_eq!(first, second);

        let a = first[0].template.to_json().unwrap();
        let b = second[0].template.to_json().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_select_environment_explicit_wins() {
        assert_eq!(select_environment(Some("staging")), "staging");
    }
}

//! CloudFormation API client wrapper.
//!
//! A thin layer over the AWS SDK: one client per region, exposing only the
//! calls the tool needs. Credentials and account come from the SDK's
//! default environment resolution; this code never handles them.

use aws_sdk_cloudformation::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_cloudformation::types::{OnFailure, Tag};
use aws_sdk_cloudformation::Client;
use chrono::DateTime;
use indexmap::IndexMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{CfnError, EnvstackError, Result};
use crate::synthesizer::SynthesizedStack;
use crate::template::Template;

use super::types::{DeployedStack, StackCondition, StackOutput};

/// CloudFormation client for a single region.
#[derive(Debug, Clone)]
pub struct CfnClient {
    /// Underlying SDK client.
    client: Client,
    /// Region this client talks to.
    region: String,
}

impl CfnClient {
    /// Creates a client for the given region, resolving credentials from
    /// the environment.
    pub async fn new(region: &str) -> Self {
        let config = aws_config::from_env()
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        Self {
            client: Client::new(&config),
            region: region.to_string(),
        }
    }

    /// Returns the region this client talks to.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Describes a stack, returning `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails for any other reason.
    pub async fn describe_stack(&self, stack_name: &str) -> Result<Option<DeployedStack>> {
        debug!("Describing stack: {stack_name}");

        let response = self
            .client
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await;

        let output = match response {
            Ok(output) => output,
            Err(err) if is_not_found(&err) => return Ok(None),
            Err(err) => return Err(map_sdk_error(&err)),
        };

        let stack = output
            .stacks()
            .first()
            .ok_or_else(|| CfnError::invalid_response("DescribeStacks returned no stacks"))?;

        let status = stack
            .stack_status()
            .map(|s| s.as_str().to_string())
            .ok_or_else(|| CfnError::invalid_response("stack has no status"))?;

        let outputs = stack
            .outputs()
            .iter()
            .filter_map(|o| {
                Some(StackOutput {
                    key: o.output_key()?.to_string(),
                    value: o.output_value()?.to_string(),
                    description: o.description().map(ToString::to_string),
                })
            })
            .collect();

        let last_updated = stack
            .last_updated_time()
            .or_else(|| stack.creation_time())
            .and_then(|t| DateTime::from_timestamp(t.secs(), 0));

        Ok(Some(DeployedStack {
            name: stack_name.to_string(),
            condition: StackCondition::from_status(&status),
            status_reason: stack.stack_status_reason().map(ToString::to_string),
            outputs,
            last_updated,
            status,
        }))
    }

    /// Fetches the deployed template body for a stack, returning `None` if
    /// the stack does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails or the body is not a valid
    /// template document.
    pub async fn get_template(&self, stack_name: &str) -> Result<Option<Template>> {
        debug!("Fetching deployed template for: {stack_name}");

        let response = self
            .client
            .get_template()
            .stack_name(stack_name)
            .send()
            .await;

        let output = match response {
            Ok(output) => output,
            Err(err) if is_not_found(&err) => return Ok(None),
            Err(err) => return Err(map_sdk_error(&err)),
        };

        let body = output
            .template_body()
            .ok_or_else(|| CfnError::invalid_response("GetTemplate returned no body"))?;

        Ok(Some(Template::from_json(body)?))
    }

    /// Submits a new stack to the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the submission is rejected.
    pub async fn create_stack(&self, stack: &SynthesizedStack) -> Result<()> {
        info!("Creating stack: {} in {}", stack.stack_name, self.region);

        self.client
            .create_stack()
            .stack_name(&stack.stack_name)
            .template_body(stack.template.to_json_pretty()?)
            .client_request_token(request_token())
            .on_failure(OnFailure::Rollback)
            .set_tags(Some(sdk_tags(&stack.tags)?))
            .send()
            .await
            .map_err(|err| map_sdk_error(&err))?;

        Ok(())
    }

    /// Submits an updated template for an existing stack. Returns `false`
    /// if the engine reports that no updates are to be performed.
    ///
    /// # Errors
    ///
    /// Returns an error if the submission is rejected.
    pub async fn update_stack(&self, stack: &SynthesizedStack) -> Result<bool> {
        info!("Updating stack: {} in {}", stack.stack_name, self.region);

        let response = self
            .client
            .update_stack()
            .stack_name(&stack.stack_name)
            .template_body(stack.template.to_json_pretty()?)
            .client_request_token(request_token())
            .set_tags(Some(sdk_tags(&stack.tags)?))
            .send()
            .await;

        match response {
            Ok(_) => Ok(true),
            Err(err) if is_no_update(&err) => {
                debug!("No updates to perform for {}", stack.stack_name);
                Ok(false)
            }
            Err(err) => Err(map_sdk_error(&err)),
        }
    }

    /// Requests deletion of a stack.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is rejected.
    pub async fn delete_stack(&self, stack_name: &str) -> Result<()> {
        info!("Deleting stack: {stack_name} in {}", self.region);

        self.client
            .delete_stack()
            .stack_name(stack_name)
            .client_request_token(request_token())
            .send()
            .await
            .map_err(|err| map_sdk_error(&err))?;

        Ok(())
    }
}

/// Generates a client request token for idempotent submissions.
fn request_token() -> String {
    format!("envstack-{}", Uuid::new_v4())
}

/// Converts stack tags to their SDK representation.
fn sdk_tags(tags: &IndexMap<String, String>) -> Result<Vec<Tag>> {
    tags.iter()
        .map(|(key, value)| {
            Ok(Tag::builder()
                .key(key)
                .value(value)
                .build())
        })
        .collect()
}

/// Extracts the service error message, if the engine sent one.
fn service_message<E: ProvideErrorMetadata, R>(err: &SdkError<E, R>) -> Option<&str> {
    err.as_service_error().and_then(ProvideErrorMetadata::message)
}

/// Returns true if the error is the engine's stack-does-not-exist answer.
fn is_not_found<E: ProvideErrorMetadata, R>(err: &SdkError<E, R>) -> bool {
    service_message(err).is_some_and(|m| m.contains("does not exist"))
}

/// Returns true if the error is the engine's no-updates answer.
fn is_no_update<E: ProvideErrorMetadata, R>(err: &SdkError<E, R>) -> bool {
    service_message(err).is_some_and(|m| m.contains("No updates are to be performed"))
}

/// Maps an SDK error to the tool's error type.
fn map_sdk_error<E: ProvideErrorMetadata, R>(err: &SdkError<E, R>) -> EnvstackError {
    let code = err
        .as_service_error()
        .and_then(ProvideErrorMetadata::code)
        .map(|c| format!("{c}: "))
        .unwrap_or_default();
    let message = service_message(err).map_or_else(|| err.to_string(), ToString::to_string);
    EnvstackError::Cfn(CfnError::api_error(format!("{code}{message}")))
}

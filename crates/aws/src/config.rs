//! Connection settings for AWS Secrets Manager

use aws_config::{BehaviorVersion, Region, SdkConfig};
use secman_secrets::SecretError;
use serde::{Deserialize, Serialize};

/// Where and as whom to connect.
///
/// Every field is optional; anything left unset falls through to the standard
/// AWS provider chain (environment, shared config files, instance metadata).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsConfig {
    /// Region override (e.g. `eu-west-1`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Shared-config profile name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Custom endpoint, e.g. a local emulator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
}

impl AwsConfig {
    /// Config pinned to one region
    #[must_use]
    pub fn with_region(region: impl Into<String>) -> Self {
        Self {
            region: Some(region.into()),
            ..Self::default()
        }
    }

    /// Check fields that can be rejected before any network access.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::Configuration` for an empty region or profile,
    /// or an endpoint that is not an http(s) URL.
    pub fn validate(&self) -> Result<(), SecretError> {
        if self.region.as_deref().is_some_and(|r| r.trim().is_empty()) {
            return Err(SecretError::configuration("region must not be empty"));
        }
        if self.profile.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(SecretError::configuration("profile must not be empty"));
        }
        if let Some(endpoint) = &self.endpoint_url
            && !(endpoint.starts_with("https://") || endpoint.starts_with("http://"))
        {
            return Err(SecretError::configuration(format!(
                "endpoint URL '{endpoint}' must start with http:// or https://"
            )));
        }
        Ok(())
    }
}

/// Resolve an [`SdkConfig`] from `config` plus the default provider chain.
///
/// SDK-level retries are disabled; the client façade owns the retry policy.
///
/// # Errors
///
/// Returns `SecretError::Configuration` if the config is invalid, no region
/// can be resolved, or no credentials provider is available.
pub async fn load_sdk_config(config: &AwsConfig) -> Result<SdkConfig, SecretError> {
    config.validate()?;

    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .retry_config(aws_config::retry::RetryConfig::disabled());

    if let Some(region) = &config.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let Some(profile) = &config.profile {
        loader = loader.profile_name(profile);
    }
    if let Some(endpoint) = &config.endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }

    let sdk_config = loader.load().await;

    let Some(region) = sdk_config.region() else {
        return Err(SecretError::configuration(
            "no AWS region configured; pass --region or set AWS_REGION",
        ));
    };
    if sdk_config.credentials_provider().is_none() {
        return Err(SecretError::configuration(
            "no AWS credentials provider available",
        ));
    }

    tracing::debug!(
        region = %region,
        profile = ?config.profile,
        endpoint = ?config.endpoint_url,
        "Loaded AWS configuration"
    );
    Ok(sdk_config)
}

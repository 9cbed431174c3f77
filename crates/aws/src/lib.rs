//! AWS Secrets Manager backend for secman
//!
//! [`AwsSecretStore`] implements [`secman_secrets::SecretStore`] on top of the
//! AWS SDK. Configuration follows the standard AWS provider chain, with
//! optional overrides in [`AwsConfig`].

mod config;
mod errors;
mod store;

pub use config::{AwsConfig, load_sdk_config};
pub use store::AwsSecretStore;

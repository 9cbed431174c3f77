//! secman: a command-line client for AWS Secrets Manager
//!
//! The binary parses arguments with [`cli`], connects an
//! [`AwsSecretStore`](secman_aws::AwsSecretStore) and runs one
//! [`commands::Command`] through a [`SecretsClient`](secman_secrets::SecretsClient).

// The render layer writes command output and error reports directly
#![allow(clippy::print_stdout, clippy::print_stderr)]

pub mod cli;
pub mod commands;
pub mod tracing;

//! Secret management core for secman
//!
//! Provides a provider-independent façade over a secrets service: create,
//! list by tag, get, update value, update tags and delete. Backends implement
//! [`SecretStore`]; callers talk to a [`SecretsClient`], which encodes
//! payloads as JSON, retries transient failures and applies deadlines.
//!
//! # Example
//!
//! ```ignore
//! use secman_secrets::{ClientConfig, InMemoryStore, SecretsClient, TagFilter, Tags};
//!
//! let client = SecretsClient::new(InMemoryStore::new(), ClientConfig::default());
//! client.create("db-creds", &serde_json::json!({"user": "app"}), &Tags::new()).await?;
//! let names = client.list_names(&TagFilter::new()).await?;
//! ```
//!
//! Provider implementations live in separate crates:
//! - secman-aws: `AwsSecretStore`

mod client;
mod codec;
mod error;
mod memory;
pub mod retry;
mod store;
mod types;

pub use client::{ClientConfig, SecretsClient};
pub use codec::{decode_payload, encode_payload};
pub use error::{BoxError, ErrorKind, SecretError};
pub use memory::InMemoryStore;
pub use retry::{RetryConfig, retry_with_backoff};
pub use store::SecretStore;
pub use types::{
    DEFAULT_RECOVERY_WINDOW_DAYS, DeletePolicy, DeletionRecord, ListPage, MAX_RECOVERY_WINDOW_DAYS,
    MIN_RECOVERY_WINDOW_DAYS, SecretRecord, SecretSummary, SecureSecret, Tag, TagFilter, Tags,
    tags_from,
};

//! Backend trait for secret storage services

use crate::{
    DeletePolicy, DeletionRecord, ListPage, SecretError, SecretRecord, SecureSecret, TagFilter,
    Tags,
};
use async_trait::async_trait;

/// A remote (or fake) service that owns secrets.
///
/// Implementors translate each call into one request against the backing
/// service and classify failures into [`SecretError`]. Retries, deadlines and
/// payload encoding are handled by [`SecretsClient`](crate::SecretsClient), so
/// implementations should issue exactly one request per call.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Provider identifier used in logs (e.g. `"aws"`, `"memory"`)
    fn provider_name(&self) -> &'static str;

    /// Create a secret.
    ///
    /// Fails with `DuplicateName` if `name` is taken.
    async fn create_secret(
        &self,
        name: &str,
        value: &SecureSecret,
        tags: &Tags,
        description: Option<&str>,
    ) -> Result<SecretRecord, SecretError>;

    /// Fetch one page of secrets matching `filter`.
    ///
    /// Pass the previous page's `next_token` to continue. Every returned
    /// summary must satisfy [`TagFilter::matches`].
    async fn list_page(
        &self,
        filter: &TagFilter,
        next_token: Option<&str>,
    ) -> Result<ListPage, SecretError>;

    /// Fetch the current value of a secret
    async fn get_secret_value(&self, id: &str) -> Result<SecureSecret, SecretError>;

    /// Replace the value of a secret, returning the new version
    async fn put_secret_value(
        &self,
        id: &str,
        value: &SecureSecret,
    ) -> Result<SecretRecord, SecretError>;

    /// Merge `tags` into the secret's tags; unrelated keys are kept
    async fn tag_secret(&self, id: &str, tags: &Tags) -> Result<(), SecretError>;

    /// Delete a secret according to `policy`
    async fn delete_secret(
        &self,
        id: &str,
        policy: DeletePolicy,
    ) -> Result<DeletionRecord, SecretError>;
}

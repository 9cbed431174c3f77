//! The secrets client façade
//!
//! [`SecretsClient`] is the session object handed to every operation. It
//! owns one [`SecretStore`], encodes payloads as JSON, retries transient
//! failures, and applies the configured deadline and cancellation token to
//! each remote call.

use crate::retry::{RetryConfig, retry_with_backoff};
use crate::{
    DeletePolicy, DeletionRecord, SecretError, SecretRecord, SecretStore, SecretSummary, TagFilter,
    Tags, decode_payload, encode_payload,
};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Per-session settings applied to every operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Deadline for a single operation, retries included
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    /// Backoff policy for transient service errors
    #[serde(default)]
    pub retry: RetryConfig,
}

/// A session against one secret store.
///
/// Operations run one at a time; each is awaited to completion before the
/// caller issues the next.
pub struct SecretsClient<S> {
    store: S,
    config: ClientConfig,
    cancel: CancellationToken,
}

impl<S: SecretStore> std::fmt::Debug for SecretsClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretsClient")
            .field("provider", &self.store.provider_name())
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Pagination cursor for [`SecretsClient::list`]
struct ListCursor {
    next_token: Option<String>,
    pages: usize,
    yielded: usize,
    done: bool,
}

impl<S: SecretStore> SecretsClient<S> {
    /// Create a client with its own cancellation token
    #[must_use]
    pub fn new(store: S, config: ClientConfig) -> Self {
        Self {
            store,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that aborts the in-flight operation when cancelled
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The underlying store
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Create a secret whose value is `payload` encoded as JSON.
    ///
    /// # Errors
    ///
    /// `DuplicateName` if the name is taken, `Serialization` if the payload
    /// cannot be encoded, `Service` for transport or auth failures.
    pub async fn create<T: Serialize + ?Sized>(
        &self,
        name: &str,
        payload: &T,
        tags: &Tags,
    ) -> Result<SecretRecord, SecretError> {
        self.create_with_description(name, payload, tags, None)
            .await
    }

    /// Like [`create`](Self::create) with a human readable description.
    ///
    /// # Errors
    ///
    /// Same as [`create`](Self::create).
    #[instrument(skip(self, payload, tags), fields(provider = self.store.provider_name(), tags = tags.len()))]
    pub async fn create_with_description<T: Serialize + ?Sized>(
        &self,
        name: &str,
        payload: &T,
        tags: &Tags,
        description: Option<&str>,
    ) -> Result<SecretRecord, SecretError> {
        let value = encode_payload(payload)?;
        let record = self
            .call("CreateSecret", || {
                self.store.create_secret(name, &value, tags, description)
            })
            .await?;
        info!(arn = %record.arn, version_id = ?record.version_id, "Secret created");
        Ok(record)
    }

    /// Stream every secret matching `filter`, following continuation tokens
    /// until the service reports no more pages.
    ///
    /// The stream is not restartable. If a page fails after at least one page
    /// was fetched, the stream yields a single
    /// `Err(SecretError::IncompleteListing)` and ends, so a partial listing is
    /// never mistaken for a complete one.
    pub fn list<'a>(
        &'a self,
        filter: &'a TagFilter,
    ) -> BoxStream<'a, Result<SecretSummary, SecretError>> {
        let cursor = ListCursor {
            next_token: None,
            pages: 0,
            yielded: 0,
            done: false,
        };

        stream::unfold(cursor, move |mut cursor| async move {
            if cursor.done {
                return None;
            }
            let token = cursor.next_token.take();
            let page = self
                .call("ListSecrets", || self.store.list_page(filter, token.as_deref()))
                .await;

            let items: Vec<Result<SecretSummary, SecretError>> = match page {
                Ok(page) => {
                    cursor.pages += 1;
                    cursor.yielded += page.secrets.len();
                    cursor.done = page.next_token.is_none();
                    cursor.next_token = page.next_token;
                    debug!(
                        page = cursor.pages,
                        count = page.secrets.len(),
                        more = !cursor.done,
                        "Fetched listing page"
                    );
                    page.secrets.into_iter().map(Ok).collect()
                }
                Err(err) => {
                    cursor.done = true;
                    let err = if cursor.pages > 0 {
                        warn!(
                            pages = cursor.pages,
                            yielded = cursor.yielded,
                            error = %err,
                            "Listing stopped before the last page"
                        );
                        SecretError::IncompleteListing {
                            yielded: cursor.yielded,
                            source: Box::new(err),
                        }
                    } else {
                        err
                    };
                    vec![Err(err)]
                }
            };
            Some((stream::iter(items), cursor))
        })
        .flatten()
        .boxed()
    }

    /// Collect the full listing for `filter`.
    ///
    /// # Errors
    ///
    /// `Service` if the first page fails, `IncompleteListing` if a later
    /// page fails.
    #[instrument(skip(self), fields(provider = self.store.provider_name()))]
    pub async fn list_all(&self, filter: &TagFilter) -> Result<Vec<SecretSummary>, SecretError> {
        let secrets: Vec<SecretSummary> = self.list(filter).try_collect().await?;
        info!(count = secrets.len(), "Listed secrets");
        Ok(secrets)
    }

    /// Names of every secret matching `filter`.
    ///
    /// # Errors
    ///
    /// Same as [`list_all`](Self::list_all).
    pub async fn list_names(&self, filter: &TagFilter) -> Result<Vec<String>, SecretError> {
        Ok(self
            .list_all(filter)
            .await?
            .into_iter()
            .map(|s| s.name)
            .collect())
    }

    /// Fetch a secret and decode its JSON payload.
    ///
    /// # Errors
    ///
    /// `NotFound` if `id` does not exist, `Deserialization` if the stored
    /// string is not valid JSON for `T`.
    #[instrument(skip(self), fields(provider = self.store.provider_name()))]
    pub async fn get<T: DeserializeOwned>(&self, id: &str) -> Result<T, SecretError> {
        let raw = self
            .call("GetSecretValue", || self.store.get_secret_value(id))
            .await?;
        debug!(bytes = raw.len(), "Fetched secret value");
        decode_payload(id, &raw)
    }

    /// Replace a secret's value.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Serialization` or `Service`.
    #[instrument(skip(self, payload), fields(provider = self.store.provider_name()))]
    pub async fn update_value<T: Serialize + ?Sized>(
        &self,
        id: &str,
        payload: &T,
    ) -> Result<SecretRecord, SecretError> {
        let value = encode_payload(payload)?;
        let record = self
            .call("UpdateSecret", || self.store.put_secret_value(id, &value))
            .await?;
        info!(version_id = ?record.version_id, "Secret value updated");
        Ok(record)
    }

    /// Merge `tags` into the secret's existing tags.
    ///
    /// Keys in `tags` are added or overwritten; every other tag is kept.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `tags` is empty, otherwise `NotFound` or `Service`.
    #[instrument(skip(self, tags), fields(provider = self.store.provider_name(), tags = tags.len()))]
    pub async fn update_tags(&self, id: &str, tags: &Tags) -> Result<(), SecretError> {
        if tags.is_empty() {
            return Err(SecretError::invalid_input("at least one tag is required"));
        }
        self.call("TagResource", || self.store.tag_secret(id, tags))
            .await?;
        info!("Secret tags merged");
        Ok(())
    }

    /// Delete a secret.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a recovery window outside 7..=30, otherwise
    /// `NotFound` or `Service`.
    #[instrument(skip(self), fields(provider = self.store.provider_name()))]
    pub async fn delete(
        &self,
        id: &str,
        policy: DeletePolicy,
    ) -> Result<DeletionRecord, SecretError> {
        let policy = policy.validate()?;
        let record = self
            .call("DeleteSecret", || self.store.delete_secret(id, policy))
            .await?;
        info!(deletion_date = ?record.deletion_date, "Secret deleted");
        Ok(record)
    }

    /// Run one remote operation under the retry policy, deadline and
    /// cancellation token.
    async fn call<T, F, Fut>(&self, operation: &'static str, f: F) -> Result<T, SecretError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SecretError>>,
    {
        let attempt = retry_with_backoff(&self.config.retry, operation, f);
        let timeout = self.config.timeout;

        let guarded = async move {
            let Some(after) = timeout else {
                return attempt.await;
            };
            match tokio::time::timeout(after, attempt).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(operation, timeout_ms = after.as_millis(), "Operation timed out");
                    Err(SecretError::Timeout { operation, after })
                }
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                warn!(operation, "Operation cancelled");
                Err(SecretError::Cancelled { operation })
            }
            result = guarded => result,
        }
    }
}

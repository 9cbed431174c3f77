//! In-process secret store
//!
//! Keeps secrets in a map behind a mutex. Useful for tests and for embedding
//! secman where no remote service is available. Supports paging, injected
//! latency and listing faults so callers can exercise the same paths they
//! would hit against a real service.

use crate::{
    DeletePolicy, DeletionRecord, ListPage, SecretError, SecretRecord, SecretStore, SecretSummary,
    SecureSecret, TagFilter, Tags,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const DEFAULT_PAGE_SIZE: usize = 100;
const REGION: &str = "us-east-1";
const ACCOUNT_ID: &str = "000000000000";

struct StoredSecret {
    arn: String,
    value: SecureSecret,
    version_id: String,
    tags: Tags,
    description: Option<String>,
}

/// Secret store held in memory
pub struct InMemoryStore {
    secrets: Mutex<BTreeMap<String, StoredSecret>>,
    page_size: usize,
    latency: Option<Duration>,
    fail_list_after: Option<usize>,
    pages_served: AtomicUsize,
    writes: AtomicUsize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("secrets", &self.len())
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl InMemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create an empty store that returns at most `page_size` secrets per page
    #[must_use]
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            secrets: Mutex::new(BTreeMap::new()),
            page_size: page_size.max(1),
            latency: None,
            fail_list_after: None,
            pages_served: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// Delay every operation by `latency`
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail each listing after it has served `pages` pages
    #[must_use]
    pub const fn fail_list_after_pages(mut self, pages: usize) -> Self {
        self.fail_list_after = Some(pages);
        self
    }

    /// Number of live secrets
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store holds no secrets
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of successful mutations since creation
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Description recorded for a secret, if any
    #[must_use]
    pub fn description(&self, id: &str) -> Option<String> {
        let secrets = self.lock();
        find(&secrets, id).and_then(|(_, s)| s.description.clone())
    }

    /// Overwrite the stored string of an existing secret without creating a
    /// new version. Used to seed values that are not valid JSON.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::NotFound` if `id` does not exist.
    pub fn insert_raw(&self, id: &str, raw: &str) -> Result<(), SecretError> {
        let mut secrets = self.lock();
        let name = find(&secrets, id)
            .map(|(name, _)| name.clone())
            .ok_or_else(|| SecretError::not_found(id))?;
        if let Some(secret) = secrets.get_mut(&name) {
            secret.value = SecureSecret::new(raw.to_string());
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, StoredSecret>> {
        self.secrets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Resolve a name or ARN to its map entry
fn find<'a>(
    secrets: &'a BTreeMap<String, StoredSecret>,
    id: &str,
) -> Option<(&'a String, &'a StoredSecret)> {
    secrets
        .get_key_value(id)
        .or_else(|| secrets.iter().find(|(_, s)| s.arn == id))
}

fn new_version_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn arn_for(name: &str) -> String {
    let suffix: String = uuid::Uuid::new_v4().simple().to_string().chars().take(6).collect();
    format!("arn:aws:secretsmanager:{REGION}:{ACCOUNT_ID}:secret:{name}-{suffix}")
}

#[async_trait]
impl SecretStore for InMemoryStore {
    fn provider_name(&self) -> &'static str {
        "memory"
    }

    async fn create_secret(
        &self,
        name: &str,
        value: &SecureSecret,
        tags: &Tags,
        description: Option<&str>,
    ) -> Result<SecretRecord, SecretError> {
        self.simulate_latency().await;
        let mut secrets = self.lock();
        if secrets.contains_key(name) {
            return Err(SecretError::DuplicateName {
                name: name.to_string(),
            });
        }

        let stored = StoredSecret {
            arn: arn_for(name),
            value: value.clone(),
            version_id: new_version_id(),
            tags: tags.clone(),
            description: description.map(str::to_string),
        };
        let record = SecretRecord {
            name: name.to_string(),
            arn: stored.arn.clone(),
            version_id: Some(stored.version_id.clone()),
        };
        secrets.insert(name.to_string(), stored);
        drop(secrets);
        self.record_write();
        Ok(record)
    }

    async fn list_page(
        &self,
        filter: &TagFilter,
        next_token: Option<&str>,
    ) -> Result<ListPage, SecretError> {
        self.simulate_latency().await;

        if next_token.is_none() {
            self.pages_served.store(0, Ordering::SeqCst);
        }
        let served = self.pages_served.load(Ordering::SeqCst);
        if self.fail_list_after.is_some_and(|limit| served >= limit) {
            return Err(SecretError::service(
                "ListSecrets",
                "injected listing failure",
                false,
            ));
        }

        let secrets = self.lock();
        let matching: Vec<SecretSummary> = secrets
            .iter()
            .filter(|(name, _)| next_token.is_none_or(|token| name.as_str() > token))
            .filter(|(_, s)| filter.matches(&s.tags))
            .map(|(name, s)| SecretSummary {
                name: name.clone(),
                arn: s.arn.clone(),
                tags: s.tags.clone(),
            })
            .collect();
        drop(secrets);

        let more = matching.len() > self.page_size;
        let page: Vec<SecretSummary> = matching.into_iter().take(self.page_size).collect();
        let next_token = if more {
            page.last().map(|s| s.name.clone())
        } else {
            None
        };

        self.pages_served.fetch_add(1, Ordering::SeqCst);
        Ok(ListPage {
            secrets: page,
            next_token,
        })
    }

    async fn get_secret_value(&self, id: &str) -> Result<SecureSecret, SecretError> {
        self.simulate_latency().await;
        let secrets = self.lock();
        find(&secrets, id)
            .map(|(_, s)| s.value.clone())
            .ok_or_else(|| SecretError::not_found(id))
    }

    async fn put_secret_value(
        &self,
        id: &str,
        value: &SecureSecret,
    ) -> Result<SecretRecord, SecretError> {
        self.simulate_latency().await;
        let mut secrets = self.lock();
        let name = find(&secrets, id)
            .map(|(name, _)| name.clone())
            .ok_or_else(|| SecretError::not_found(id))?;
        let secret = secrets
            .get_mut(&name)
            .ok_or_else(|| SecretError::not_found(id))?;
        secret.value = value.clone();
        secret.version_id = new_version_id();
        let record = SecretRecord {
            name,
            arn: secret.arn.clone(),
            version_id: Some(secret.version_id.clone()),
        };
        drop(secrets);
        self.record_write();
        Ok(record)
    }

    async fn tag_secret(&self, id: &str, tags: &Tags) -> Result<(), SecretError> {
        self.simulate_latency().await;
        let mut secrets = self.lock();
        let name = find(&secrets, id)
            .map(|(name, _)| name.clone())
            .ok_or_else(|| SecretError::not_found(id))?;
        if let Some(secret) = secrets.get_mut(&name) {
            secret
                .tags
                .extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        drop(secrets);
        self.record_write();
        Ok(())
    }

    async fn delete_secret(
        &self,
        id: &str,
        policy: DeletePolicy,
    ) -> Result<DeletionRecord, SecretError> {
        self.simulate_latency().await;
        let mut secrets = self.lock();
        let name = find(&secrets, id)
            .map(|(name, _)| name.clone())
            .ok_or_else(|| SecretError::not_found(id))?;
        let Some(removed) = secrets.remove(&name) else {
            return Err(SecretError::not_found(id));
        };
        drop(secrets);

        // Secrets pending deletion are unreachable, so both policies remove the entry.
        let deletion_date = match policy {
            DeletePolicy::Scheduled {
                recovery_window_days,
            } => Utc::now() + chrono::Duration::days(i64::from(recovery_window_days)),
            DeletePolicy::Immediate => Utc::now(),
        };
        self.record_write();
        Ok(DeletionRecord {
            name,
            arn: removed.arn,
            deletion_date: Some(deletion_date),
            policy,
        })
    }
}

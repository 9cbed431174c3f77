//! Secret domain types
//!
//! - [`SecureSecret`]: a payload string that zeroes on drop and never prints
//! - [`Tag`] / [`Tags`]: key/value labels attached to a secret
//! - [`TagFilter`]: the narrowing criteria for listings
//! - Records returned by the store operations

use crate::SecretError;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Tag key to tag value. Ordered so output is deterministic.
pub type Tags = BTreeMap<String, String>;

/// Default recovery window applied by the service when none is given.
pub const DEFAULT_RECOVERY_WINDOW_DAYS: u8 = 30;
/// Shortest recovery window the service accepts.
pub const MIN_RECOVERY_WINDOW_DAYS: u8 = 7;
/// Longest recovery window the service accepts.
pub const MAX_RECOVERY_WINDOW_DAYS: u8 = 30;

/// A secret payload with automatic memory zeroing on drop.
///
/// `Debug` and `Display` show `[REDACTED]`; use [`expose`](Self::expose)
/// to read the value.
#[derive(Clone)]
pub struct SecureSecret {
    inner: SecretString,
}

impl SecureSecret {
    /// Move a string into secure storage.
    #[must_use]
    pub fn new(value: String) -> Self {
        Self {
            inner: SecretString::from(value),
        }
    }

    /// Expose the secret value for use.
    ///
    /// The caller must not log or persist the returned value.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.inner.expose_secret()
    }

    /// Length of the payload in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.expose_secret().len()
    }

    /// Whether the payload is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.expose_secret().is_empty()
    }
}

impl std::fmt::Debug for SecureSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl std::fmt::Display for SecureSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// A single `key=value` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag key
    pub key: String,
    /// Tag value
    pub value: String,
}

impl Tag {
    /// Create a tag
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl FromStr for Tag {
    type Err = SecretError;

    /// Parse `key=value`. The value may itself contain `=`; the key may not be empty.
    ///
    /// Whitespace around both key and value is trimmed, so `"a = b"` parses
    /// the same as `"a=b"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s.split_once('=').ok_or_else(|| {
            SecretError::invalid_input(format!("tag '{s}' must have the form key=value"))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(SecretError::invalid_input(format!(
                "tag '{s}' has an empty key"
            )));
        }
        Ok(Self::new(key, value.trim()))
    }
}

/// Collect tags into a map. Later duplicates win.
#[must_use]
pub fn tags_from<I: IntoIterator<Item = Tag>>(tags: I) -> Tags {
    tags.into_iter().map(|t| (t.key, t.value)).collect()
}

/// Criteria narrowing a listing: each key maps to the set of values it may take.
///
/// A secret matches only if every filter key is present on it with one of the
/// allowed values. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFilter {
    clauses: BTreeMap<String, BTreeSet<String>>,
}

impl TagFilter {
    /// Create an empty filter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter from tags, grouping repeated keys into one clause
    #[must_use]
    pub fn from_tags<I: IntoIterator<Item = Tag>>(tags: I) -> Self {
        let mut filter = Self::new();
        for tag in tags {
            filter = filter.with(tag.key, tag.value);
        }
        filter
    }

    /// Allow `value` for `key`
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.clauses
            .entry(key.into())
            .or_default()
            .insert(value.into());
        self
    }

    /// Whether the filter has no clauses
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Iterate over `(key, allowed values)` clauses
    pub fn clauses(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.clauses.iter()
    }

    /// Whether a secret carrying `tags` satisfies every clause
    #[must_use]
    pub fn matches(&self, tags: &Tags) -> bool {
        self.clauses.iter().all(|(key, allowed)| {
            tags.get(key)
                .is_some_and(|value| allowed.contains(value))
        })
    }
}

/// Identity of a secret after a write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRecord {
    /// Friendly name
    pub name: String,
    /// Full ARN
    pub arn: String,
    /// Version assigned by the service, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
}

/// One entry of a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretSummary {
    /// Friendly name
    pub name: String,
    /// Full ARN
    pub arn: String,
    /// Tags attached to the secret
    #[serde(default)]
    pub tags: Tags,
}

/// A single page of a listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Secrets on this page
    pub secrets: Vec<SecretSummary>,
    /// Continuation token, `None` on the last page
    pub next_token: Option<String>,
}

/// How a secret is removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Deletion is deferred; the secret can be restored within the window
    Scheduled {
        /// Days before the secret is purged
        recovery_window_days: u8,
    },
    /// Deleted at once with no recovery window
    Immediate,
}

impl Default for DeletePolicy {
    fn default() -> Self {
        Self::Scheduled {
            recovery_window_days: DEFAULT_RECOVERY_WINDOW_DAYS,
        }
    }
}

impl DeletePolicy {
    /// Scheduled deletion with a validated window.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::InvalidInput` if `days` is outside 7..=30.
    pub fn scheduled(days: u8) -> Result<Self, SecretError> {
        if !(MIN_RECOVERY_WINDOW_DAYS..=MAX_RECOVERY_WINDOW_DAYS).contains(&days) {
            return Err(SecretError::invalid_input(format!(
                "recovery window must be between {MIN_RECOVERY_WINDOW_DAYS} and {MAX_RECOVERY_WINDOW_DAYS} days, got {days}"
            )));
        }
        Ok(Self::Scheduled {
            recovery_window_days: days,
        })
    }

    /// Re-check a policy that may have been built by hand.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::InvalidInput` for a window outside 7..=30.
    pub fn validate(self) -> Result<Self, SecretError> {
        match self {
            Self::Scheduled {
                recovery_window_days,
            } => Self::scheduled(recovery_window_days),
            Self::Immediate => Ok(self),
        }
    }
}

/// Outcome of a delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionRecord {
    /// Friendly name
    pub name: String,
    /// Full ARN
    pub arn: String,
    /// When the secret will be (or was) purged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_date: Option<DateTime<Utc>>,
    /// The policy that was applied
    pub policy: DeletePolicy,
}

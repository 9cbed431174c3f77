use secman_secrets::{DeletePolicy, DeletionRecord, SecretRecord, SecretSummary, Tags};
use serde::Serialize;

/// Result of a successful command.
///
/// Serializes to the `data` field of the JSON envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommandOutput {
    /// A new secret
    Created(SecretRecord),
    /// Matching secrets, in listing order
    Listed(Vec<SecretSummary>),
    /// Decoded secret value
    Fetched(serde_json::Value),
    /// New version after a value update
    Updated(SecretRecord),
    /// Tags merged into a secret
    Tagged {
        /// Secret that was tagged
        name: String,
        /// Tags that were applied
        tags: Tags,
    },
    /// Deletion outcome
    Deleted(DeletionRecord),
}

impl CommandOutput {
    /// Human-readable rendering for text mode
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Created(record) => match &record.version_id {
                Some(version) => format!("{}\nversion: {version}", record.arn),
                None => record.arn.clone(),
            },
            Self::Listed(secrets) => secrets
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Fetched(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            Self::Updated(record) => record.version_id.clone().unwrap_or_default(),
            Self::Tagged { name, tags } => {
                format!("Applied {} tag(s) to {name}", tags.len())
            }
            Self::Deleted(record) => match (record.policy, record.deletion_date) {
                (DeletePolicy::Immediate, _) => format!("{} deleted immediately", record.name),
                (DeletePolicy::Scheduled { .. }, Some(date)) => format!(
                    "{} scheduled for deletion on {}",
                    record.name,
                    date.to_rfc3339()
                ),
                (DeletePolicy::Scheduled { recovery_window_days }, None) => format!(
                    "{} scheduled for deletion in {recovery_window_days} days",
                    record.name
                ),
            },
        }
    }
}

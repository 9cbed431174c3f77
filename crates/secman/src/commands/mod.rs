//! Command execution against a [`SecretsClient`]
//!
//! Commands are generic over the store so the same code runs against AWS in
//! the binary and against [`InMemoryStore`](secman_secrets::InMemoryStore) in
//! tests.

mod output;

pub use output::CommandOutput;

use secman_secrets::{DeletePolicy, SecretError, SecretStore, SecretsClient, TagFilter, Tags};
use tracing::instrument;

/// A fully parsed request, independent of the argument parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Create a secret from a JSON payload
    Create {
        /// Secret name
        name: String,
        /// Payload stored as the secret string
        data: serde_json::Value,
        /// Tags attached at creation
        tags: Tags,
        /// Optional human-readable description
        description: Option<String>,
    },
    /// List secrets carrying every given tag
    List {
        /// Required tag pairs
        filter: TagFilter,
    },
    /// Fetch and decode a secret
    Get {
        /// Name or ARN
        name: String,
    },
    /// Replace a secret's value
    UpdateValue {
        /// Name or ARN
        name: String,
        /// New payload
        data: serde_json::Value,
    },
    /// Merge tags into a secret
    UpdateTags {
        /// Name or ARN
        name: String,
        /// Tags to add or overwrite
        tags: Tags,
    },
    /// Delete a secret
    Delete {
        /// Name or ARN
        name: String,
        /// Scheduled or immediate
        policy: DeletePolicy,
    },
}

impl Command {
    /// Short name used in spans and logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::List { .. } => "list",
            Self::Get { .. } => "get",
            Self::UpdateValue { .. } => "update-value",
            Self::UpdateTags { .. } => "update-tags",
            Self::Delete { .. } => "delete",
        }
    }
}

/// Run `command` to completion.
///
/// # Errors
///
/// Returns the [`SecretError`] of the failed operation.
#[instrument(skip_all, fields(command = command.name(), provider = client.store().provider_name()))]
pub async fn execute<S: SecretStore>(
    client: &SecretsClient<S>,
    command: Command,
) -> Result<CommandOutput, SecretError> {
    match command {
        Command::Create {
            name,
            data,
            tags,
            description,
        } => {
            let record = client
                .create_with_description(&name, &data, &tags, description.as_deref())
                .await?;
            Ok(CommandOutput::Created(record))
        }
        Command::List { filter } => {
            let secrets = client.list_all(&filter).await?;
            Ok(CommandOutput::Listed(secrets))
        }
        Command::Get { name } => {
            let value: serde_json::Value = client.get(&name).await?;
            Ok(CommandOutput::Fetched(value))
        }
        Command::UpdateValue { name, data } => {
            let record = client.update_value(&name, &data).await?;
            Ok(CommandOutput::Updated(record))
        }
        Command::UpdateTags { name, tags } => {
            client.update_tags(&name, &tags).await?;
            Ok(CommandOutput::Tagged { name, tags })
        }
        Command::Delete { name, policy } => {
            let record = client.delete(&name, policy).await?;
            Ok(CommandOutput::Deleted(record))
        }
    }
}

//! [`SecretStore`] backed by AWS Secrets Manager

use crate::config::{AwsConfig, load_sdk_config};
use crate::errors::classify;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_secretsmanager::Client;
use aws_sdk_secretsmanager::types::{Filter, FilterNameStringType, SecretListEntry, Tag};
use chrono::{DateTime, Utc};
use secman_secrets::{
    DeletePolicy, DeletionRecord, ListPage, SecretError, SecretRecord, SecretStore,
    SecretSummary, SecureSecret, TagFilter, Tags,
};

/// Upper bound the service accepts for `MaxResults`
const PAGE_SIZE: i32 = 100;

/// Upper bound the service accepts for values in one filter
const MAX_FILTER_VALUES: usize = 10;

/// Upper bound the service accepts for one filter value
const MAX_FILTER_VALUE_LEN: usize = 512;

/// Whether `c` is in the service's filter value pattern
/// `^\!?[a-zA-Z0-9 :_@\/\+\=\.\-\!]*$`
const fn filter_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, ' ' | ':' | '_' | '@' | '/' | '+' | '=' | '.' | '-' | '!')
}

/// Secrets Manager client implementing [`SecretStore`].
///
/// Each trait call issues exactly one API request. Listing sends tag filters
/// to the service to narrow results, then re-checks exact key/value pairs
/// locally since the service matches keys and values independently and by
/// prefix.
#[derive(Debug, Clone)]
pub struct AwsSecretStore {
    client: Client,
}

impl AwsSecretStore {
    /// Resolve configuration and build a store.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::Configuration` if region or credentials cannot
    /// be resolved.
    pub async fn connect(config: &AwsConfig) -> Result<Self, SecretError> {
        let sdk_config = load_sdk_config(config).await?;
        Ok(Self::from_sdk_config(&sdk_config))
    }

    /// Build from an already-loaded SDK config
    #[must_use]
    pub fn from_sdk_config(sdk_config: &SdkConfig) -> Self {
        Self::from_client(Client::new(sdk_config))
    }

    /// Wrap an existing SDK client
    #[must_use]
    pub const fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Region the client talks to
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.client.config().region().map(AsRef::as_ref)
    }
}

/// Tags in SDK form, or `None` when there are none to send
fn to_sdk_tags(tags: &Tags) -> Option<Vec<Tag>> {
    if tags.is_empty() {
        return None;
    }
    Some(
        tags.iter()
            .map(|(key, value)| Tag::builder().key(key).value(value).build())
            .collect(),
    )
}

/// Server-side pre-filter for `filter`.
///
/// Keys and values are sent as two filters, each OR-ed internally, which
/// yields a superset of the exact matches. A dimension is skipped when it
/// cannot be expressed safely: too many values, empty or overlong strings,
/// characters outside the service's filter pattern (non-ASCII letters are
/// valid in tags but not in filters), or a leading `!` (the service's
/// negation prefix). Skipped dimensions are still enforced by the local
/// re-check.
fn to_sdk_filters(filter: &TagFilter) -> Option<Vec<Filter>> {
    let expressible = |values: &[&String]| {
        !values.is_empty()
            && values.len() <= MAX_FILTER_VALUES
            && values.iter().all(|v| {
                !v.is_empty()
                    && v.len() <= MAX_FILTER_VALUE_LEN
                    && !v.starts_with('!')
                    && v.chars().all(filter_char)
            })
    };

    let keys: Vec<&String> = filter.clauses().map(|(key, _)| key).collect();
    let values: Vec<&String> = filter.clauses().flat_map(|(_, values)| values).collect();

    let mut filters = Vec::new();
    if expressible(&keys) {
        filters.push(
            Filter::builder()
                .key(FilterNameStringType::TagKey)
                .set_values(Some(keys.into_iter().cloned().collect()))
                .build(),
        );
    }
    if expressible(&values) {
        filters.push(
            Filter::builder()
                .key(FilterNameStringType::TagValue)
                .set_values(Some(values.into_iter().cloned().collect()))
                .build(),
        );
    }

    (!filters.is_empty()).then_some(filters)
}

/// Convert a listing entry, skipping entries without a name
fn to_summary(entry: &SecretListEntry) -> Option<SecretSummary> {
    let name = entry.name()?;
    let tags = entry
        .tags()
        .iter()
        .filter_map(|tag| {
            let key = tag.key()?;
            Some((key.to_string(), tag.value().unwrap_or_default().to_string()))
        })
        .collect();
    Some(SecretSummary {
        name: name.to_string(),
        arn: entry.arn().unwrap_or_default().to_string(),
        tags,
    })
}

fn to_chrono(date: &aws_sdk_secretsmanager::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(date.secs(), date.subsec_nanos())
}

#[async_trait]
impl SecretStore for AwsSecretStore {
    fn provider_name(&self) -> &'static str {
        "aws"
    }

    async fn create_secret(
        &self,
        name: &str,
        value: &SecureSecret,
        tags: &Tags,
        description: Option<&str>,
    ) -> Result<SecretRecord, SecretError> {
        let output = self
            .client
            .create_secret()
            .name(name)
            .secret_string(value.expose())
            .set_tags(to_sdk_tags(tags))
            .set_description(description.map(str::to_string))
            .send()
            .await
            .map_err(|e| classify("CreateSecret", name, e))?;

        Ok(SecretRecord {
            name: output.name().unwrap_or(name).to_string(),
            arn: output.arn().unwrap_or_default().to_string(),
            version_id: output.version_id().map(str::to_string),
        })
    }

    async fn list_page(
        &self,
        filter: &TagFilter,
        next_token: Option<&str>,
    ) -> Result<ListPage, SecretError> {
        let output = self
            .client
            .list_secrets()
            .set_filters(to_sdk_filters(filter))
            .set_next_token(next_token.map(str::to_string))
            .max_results(PAGE_SIZE)
            .send()
            .await
            .map_err(|e| classify("ListSecrets", "*", e))?;

        let secrets = output
            .secret_list()
            .iter()
            .filter_map(to_summary)
            .filter(|summary| filter.matches(&summary.tags))
            .collect();

        Ok(ListPage {
            secrets,
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn get_secret_value(&self, id: &str) -> Result<SecureSecret, SecretError> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(id)
            .send()
            .await
            .map_err(|e| classify("GetSecretValue", id, e))?;

        match output.secret_string() {
            Some(value) => Ok(SecureSecret::new(value.to_string())),
            None => Err(SecretError::Deserialization {
                id: id.to_string(),
                message: "secret has no string value (it may be binary)".to_string(),
            }),
        }
    }

    async fn put_secret_value(
        &self,
        id: &str,
        value: &SecureSecret,
    ) -> Result<SecretRecord, SecretError> {
        let output = self
            .client
            .update_secret()
            .secret_id(id)
            .secret_string(value.expose())
            .send()
            .await
            .map_err(|e| classify("UpdateSecret", id, e))?;

        Ok(SecretRecord {
            name: output.name().unwrap_or(id).to_string(),
            arn: output.arn().unwrap_or_default().to_string(),
            version_id: output.version_id().map(str::to_string),
        })
    }

    async fn tag_secret(&self, id: &str, tags: &Tags) -> Result<(), SecretError> {
        self.client
            .tag_resource()
            .secret_id(id)
            .set_tags(to_sdk_tags(tags))
            .send()
            .await
            .map_err(|e| classify("TagResource", id, e))?;
        Ok(())
    }

    async fn delete_secret(
        &self,
        id: &str,
        policy: DeletePolicy,
    ) -> Result<DeletionRecord, SecretError> {
        let request = self.client.delete_secret().secret_id(id);
        let request = match policy {
            DeletePolicy::Scheduled {
                recovery_window_days,
            } => request.recovery_window_in_days(i64::from(recovery_window_days)),
            DeletePolicy::Immediate => request.force_delete_without_recovery(true),
        };

        let output = request
            .send()
            .await
            .map_err(|e| classify("DeleteSecret", id, e))?;

        Ok(DeletionRecord {
            name: output.name().unwrap_or(id).to_string(),
            arn: output.arn().unwrap_or_default().to_string(),
            deletion_date: output.deletion_date().and_then(to_chrono),
            policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secman_secrets::Tag as SecmanTag;

    fn filter_values(filters: &[Filter], key: &FilterNameStringType) -> Vec<String> {
        filters
            .iter()
            .find(|f| f.key() == Some(key))
            .map(|f| f.values().to_vec())
            .unwrap_or_default()
    }

    #[test]
    fn test_to_sdk_tags() {
        assert!(to_sdk_tags(&Tags::new()).is_none());

        let tags = secman_secrets::tags_from([
            SecmanTag::new("service", "api"),
            SecmanTag::new("component", "db"),
        ]);
        let sdk = to_sdk_tags(&tags).unwrap();
        assert_eq!(sdk.len(), 2);
        // BTreeMap order
        assert_eq!(sdk[0].key(), Some("component"));
        assert_eq!(sdk[1].value(), Some("api"));
    }

    #[test]
    fn test_filters_empty() {
        assert!(to_sdk_filters(&TagFilter::new()).is_none());
    }

    #[test]
    fn test_filters_keys_and_values() {
        let filter = TagFilter::new()
            .with("service", "api")
            .with("component", "db");
        let filters = to_sdk_filters(&filter).unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(
            filter_values(&filters, &FilterNameStringType::TagKey),
            vec!["component", "service"]
        );
        assert_eq!(
            filter_values(&filters, &FilterNameStringType::TagValue),
            vec!["db", "api"]
        );
    }

    #[test]
    fn test_filters_skip_negation_prefix() {
        let filter = TagFilter::new().with("owner", "!root");
        let filters = to_sdk_filters(&filter).unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].key(), Some(&FilterNameStringType::TagKey));
    }

    #[test]
    fn test_filters_skip_values_outside_filter_pattern() {
        let filter = TagFilter::new().with("team", "équipe");
        let filters = to_sdk_filters(&filter).unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].key(), Some(&FilterNameStringType::TagKey));
        assert_eq!(filters[0].values().to_vec(), vec!["team"]);

        let filter = TagFilter::new().with("équipe", "core");
        let filters = to_sdk_filters(&filter).unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].key(), Some(&FilterNameStringType::TagValue));

        let filter = TagFilter::new().with("note", "a#b");
        let filters = to_sdk_filters(&filter).unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].key(), Some(&FilterNameStringType::TagKey));
    }

    #[test]
    fn test_filters_skip_overlong_values() {
        let filter = TagFilter::new().with("blob", "a".repeat(MAX_FILTER_VALUE_LEN + 1));
        let filters = to_sdk_filters(&filter).unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].key(), Some(&FilterNameStringType::TagKey));

        let filter = TagFilter::new().with("blob", "a".repeat(MAX_FILTER_VALUE_LEN));
        assert_eq!(to_sdk_filters(&filter).unwrap().len(), 2);
    }

    #[test]
    fn test_filters_keep_allowed_punctuation() {
        let filter = TagFilter::new().with("aws:owner", "team@example.com/a+b=c_d-e");
        assert_eq!(to_sdk_filters(&filter).unwrap().len(), 2);
    }

    #[test]
    fn test_filters_skip_empty_values() {
        let filter = TagFilter::new().with("flag", "");
        let filters = to_sdk_filters(&filter).unwrap();
        assert_eq!(filters.len(), 1);
    }

    #[test]
    fn test_summary_from_entry() {
        let entry = SecretListEntry::builder()
            .name("db-creds")
            .arn("arn:aws:secretsmanager:us-east-1:123456789012:secret:db-creds-AbCdEf")
            .tags(Tag::builder().key("service").value("api").build())
            .tags(Tag::builder().key("orphan").build())
            .build();

        let summary = to_summary(&entry).unwrap();
        assert_eq!(summary.name, "db-creds");
        assert_eq!(summary.tags.get("service").map(String::as_str), Some("api"));
        assert_eq!(summary.tags.get("orphan").map(String::as_str), Some(""));
    }

    #[test]
    fn test_summary_requires_name() {
        let entry = SecretListEntry::builder().arn("arn:x").build();
        assert!(to_summary(&entry).is_none());
    }

    #[test]
    fn test_to_chrono() {
        let date = aws_sdk_secretsmanager::primitives::DateTime::from_secs(1_700_000_000);
        let converted = to_chrono(&date).unwrap();
        assert_eq!(converted.timestamp(), 1_700_000_000);
    }
}

//! Property-based tests for the client's value and listing contracts.
//!
//! - Round trip: any JSON payload that is created reads back unchanged
//! - Listing: a tag filter returns exactly the secrets carrying every
//!   filter pair, across any page size

// Integration tests can use unwrap/expect for cleaner assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use proptest::prelude::*;
use secman_secrets::{
    ClientConfig, InMemoryStore, SecretsClient, TagFilter, Tags, decode_payload, encode_payload,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;

// =============================================================================
// Strategies for generating test data
// =============================================================================

/// Arbitrary JSON trees. Floats are left out since decimal text does not
/// always reproduce the same `f64`.
fn json_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        ".{0,16}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map(".{0,8}", inner, 0..6)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

/// Small alphabets so filters overlap generated tags often
fn tag_key_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("service".to_string()),
        Just("component".to_string()),
        Just("env".to_string()),
    ]
}

fn tag_value_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("api".to_string()),
        Just("db".to_string()),
        Just("prod".to_string()),
        Just(String::new()),
    ]
}

fn tags_strategy() -> impl Strategy<Value = Tags> {
    prop::collection::btree_map(tag_key_strategy(), tag_value_strategy(), 0..4)
}

/// Tag sets for up to a dozen secrets, keyed by secret name
fn fleet_strategy() -> impl Strategy<Value = BTreeMap<String, Tags>> {
    prop::collection::btree_map("[a-z][a-z0-9-]{0,8}", tags_strategy(), 0..12)
}

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

// =============================================================================
// Property Tests: Payload round trip
// =============================================================================

proptest! {
    /// Contract: decode(encode(payload)) == payload
    #[test]
    fn prop_codec_round_trip(payload in json_strategy()) {
        let encoded = encode_payload(&payload).unwrap();
        let decoded: Value = decode_payload("payload", &encoded).unwrap();
        prop_assert_eq!(decoded, payload);
    }

    /// Contract: get(create(payload)) == payload
    #[test]
    fn prop_get_returns_created_payload(payload in json_strategy()) {
        let fetched: Value = block_on(async {
            let client = SecretsClient::new(InMemoryStore::new(), ClientConfig::default());
            client.create("payload", &payload, &Tags::new()).await.unwrap();
            client.get("payload").await.unwrap()
        });
        prop_assert_eq!(fetched, payload);
    }

    /// Contract: after update_value, get returns the new payload
    #[test]
    fn prop_get_returns_updated_payload(
        first in json_strategy(),
        second in json_strategy(),
    ) {
        let fetched: Value = block_on(async {
            let client = SecretsClient::new(InMemoryStore::new(), ClientConfig::default());
            client.create("payload", &first, &Tags::new()).await.unwrap();
            client.update_value("payload", &second).await.unwrap();
            client.get("payload").await.unwrap()
        });
        prop_assert_eq!(fetched, second);
    }
}

// =============================================================================
// Property Tests: Listing by tag
// =============================================================================

proptest! {
    /// Contract: list(filter) is exactly the set of secrets whose tags are a
    /// superset of the filter pairs, independent of page size
    #[test]
    fn prop_list_returns_exact_superset_matches(
        fleet in fleet_strategy(),
        wanted in tags_strategy(),
        page_size in 1usize..5,
    ) {
        let expected: Vec<String> = fleet
            .iter()
            .filter(|(_, tags)| wanted.iter().all(|(k, v)| tags.get(k) == Some(v)))
            .map(|(name, _)| name.clone())
            .collect();

        let filter = TagFilter::from_tags(
            wanted
                .iter()
                .map(|(k, v)| secman_secrets::Tag::new(k.clone(), v.clone())),
        );

        let mut listed = block_on(async {
            let client = SecretsClient::new(
                InMemoryStore::with_page_size(page_size),
                ClientConfig::default(),
            );
            for (name, tags) in &fleet {
                client.create(name, &serde_json::json!({}), tags).await.unwrap();
            }
            client.list_names(&filter).await.unwrap()
        });
        listed.sort();

        prop_assert_eq!(listed, expected);
    }

    /// Contract: an empty filter lists every secret exactly once
    #[test]
    fn prop_empty_filter_lists_everything_once(
        fleet in fleet_strategy(),
        page_size in 1usize..5,
    ) {
        let listed = block_on(async {
            let client = SecretsClient::new(
                InMemoryStore::with_page_size(page_size),
                ClientConfig::default(),
            );
            for (name, tags) in &fleet {
                client.create(name, &serde_json::json!({}), tags).await.unwrap();
            }
            client.list_names(&TagFilter::new()).await.unwrap()
        });

        let mut deduped = listed.clone();
        deduped.dedup();
        prop_assert_eq!(deduped.len(), listed.len());
        prop_assert_eq!(listed.len(), fleet.len());
    }
}

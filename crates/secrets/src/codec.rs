//! JSON encoding of secret payloads

use crate::{SecretError, SecureSecret};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Encode a payload as compact JSON.
///
/// # Errors
///
/// Returns `SecretError::Serialization` if the value cannot be represented as JSON
/// (for example a map with non-string keys).
pub fn encode_payload<T: Serialize + ?Sized>(payload: &T) -> Result<SecureSecret, SecretError> {
    serde_json::to_string(payload)
        .map(SecureSecret::new)
        .map_err(|source| SecretError::Serialization { source })
}

/// Decode a stored payload.
///
/// # Errors
///
/// Returns `SecretError::Deserialization` if the stored string is not valid
/// JSON for `T`.
pub fn decode_payload<T: DeserializeOwned>(id: &str, raw: &SecureSecret) -> Result<T, SecretError> {
    serde_json::from_str(raw.expose()).map_err(|e| SecretError::Deserialization {
        id: id.to_string(),
        message: e.to_string(),
    })
}

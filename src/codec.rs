// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Value codecs for field leaves.
//!
//! Every field value is stored in its primitive as JSON text. A codec turns a
//! typed value into a JSON payload and back, and is the place where a field's
//! schema is enforced.

use crate::traits::{AsyncCodec, Codec, SyncError};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::marker::PhantomData;

/// Serde-backed codec; the Rust type itself is the schema.
pub struct JsonCodec<V>(PhantomData<fn() -> V>);

impl<V> JsonCodec<V> {
    pub fn new() -> Self {
        JsonCodec(PhantomData)
    }
}

impl<V> Default for JsonCodec<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for JsonCodec<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JsonCodec")
    }
}

impl<V> Clone for JsonCodec<V> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<V: Serialize + DeserializeOwned> Codec<V> for JsonCodec<V> {
    fn serialize(&self, value: &V) -> Result<Value, SyncError> {
        serde_json::to_value(value).map_err(|e| SyncError::Schema(e.to_string()))
    }

    fn deserialize(&self, value: Value) -> Result<V, SyncError> {
        serde_json::from_value(value).map_err(|e| SyncError::Format(e.to_string()))
    }
}

#[async_trait]
impl<V: Serialize + DeserializeOwned + Send + Sync> AsyncCodec<V> for JsonCodec<V> {
    async fn serialize(&self, value: &V) -> Result<Value, SyncError> {
        Codec::serialize(self, value)
    }

    async fn deserialize(&self, value: Value) -> Result<V, SyncError> {
        Codec::deserialize(self, value)
    }
}

/// A [`JsonCodec`] with an extra schema predicate over the JSON payload.
///
/// The predicate runs on every payload produced by `serialize` and on every
/// stored payload before `deserialize`.
///
/// # Example
///
/// ```
/// use crdt_guarded_docs::codec::ValidatedCodec;
/// use crdt_guarded_docs::Codec;
///
/// let codec = ValidatedCodec::<String, _>::new(|v| match v.as_str() {
///     Some(s) if s.len() <= 8 => Ok(()),
///     _ => Err("at most 8 characters".to_string()),
/// });
/// assert!(codec.serialize(&"short".to_string()).is_ok());
/// assert!(codec.serialize(&"much too long".to_string()).is_err());
/// ```
pub struct ValidatedCodec<V, F> {
    inner: JsonCodec<V>,
    check: F,
}

impl<V, F> ValidatedCodec<V, F>
where
    F: Fn(&Value) -> Result<(), String>,
{
    pub fn new(check: F) -> Self {
        Self {
            inner: JsonCodec::new(),
            check,
        }
    }
}

impl<V, F> Codec<V> for ValidatedCodec<V, F>
where
    V: Serialize + DeserializeOwned,
    F: Fn(&Value) -> Result<(), String>,
{
    fn serialize(&self, value: &V) -> Result<Value, SyncError> {
        let json = Codec::serialize(&self.inner, value)?;
        (self.check)(&json).map_err(SyncError::Schema)?;
        Ok(json)
    }

    fn deserialize(&self, value: Value) -> Result<V, SyncError> {
        (self.check)(&value).map_err(SyncError::Format)?;
        Codec::deserialize(&self.inner, value)
    }
}

#[async_trait]
impl<V, F> AsyncCodec<V> for ValidatedCodec<V, F>
where
    V: Serialize + DeserializeOwned + Send + Sync,
    F: Fn(&Value) -> Result<(), String> + Send + Sync,
{
    async fn serialize(&self, value: &V) -> Result<Value, SyncError> {
        Codec::serialize(self, value)
    }

    async fn deserialize(&self, value: Value) -> Result<V, SyncError> {
        Codec::deserialize(self, value)
    }
}

/// Renders a codec payload as the JSON text stored in a primitive leaf.
pub(crate) fn to_leaf(payload: &Value) -> String {
    payload.to_string()
}

/// Parses a primitive leaf back into a JSON payload.
pub(crate) fn from_leaf(leaf: &str) -> Result<Value, SyncError> {
    serde_json::from_str(leaf).map_err(|e| SyncError::Format(format!("JSON parse error: {}", e)))
}

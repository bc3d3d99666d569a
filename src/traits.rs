// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use crate::document::Document;
use crate::envelope::Snapshot;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Error type for document, field and validation operations.
///
/// Policy rejections of untrusted snapshots or deltas are not errors; the
/// trust pipeline skips such items and keeps walking.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Format error: {0}")]
    Format(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unimplemented: {0}")]
    Unimplemented(String),
    #[error("Field type mismatch: field `{name}` is {actual}, not {expected}")]
    FieldTypeMismatch {
        name: String,
        expected: String,
        actual: String,
    },
    #[error("Reserved field name: {0}")]
    ReservedFieldName(String),
    #[error("Invalid range: {start}..{end}")]
    InvalidRange { start: usize, end: usize },
    #[error("Schema error: {0}")]
    Schema(String),
    #[error("Engine error: {0}")]
    Engine(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<automerge::AutomergeError> for SyncError {
    fn from(e: automerge::AutomergeError) -> Self {
        SyncError::Engine(e.to_string())
    }
}

impl From<capnp::Error> for SyncError {
    fn from(e: capnp::Error) -> Self {
        SyncError::Format(e.to_string())
    }
}

/// Converts field values to and from the JSON payloads stored as primitive leaves.
///
/// A codec is the pluggable schema of a field: `serialize` must reject values
/// that do not conform, and `deserialize` must reject stored payloads that do not
/// conform (those surface as [`SyncError::Format`] from reads).
pub trait Codec<V> {
    fn serialize(&self, value: &V) -> Result<Value, SyncError>;
    fn deserialize(&self, value: Value) -> Result<V, SyncError>;
}

/// Asynchronous counterpart of [`Codec`], used by the async field variants.
///
/// Only the codec step may suspend. Fields apply their structural mutation
/// synchronously once the codec has produced every payload.
#[async_trait]
pub trait AsyncCodec<V: Send + Sync>: Send + Sync {
    async fn serialize(&self, value: &V) -> Result<Value, SyncError>;
    async fn deserialize(&self, value: Value) -> Result<V, SyncError>;
}

/// Key types usable in map fields. Primitive map keys are always strings.
pub trait MapKey: Sized {
    fn to_key(&self) -> String;
    fn from_key(key: &str) -> Option<Self>;
}

impl MapKey for String {
    fn to_key(&self) -> String {
        self.clone()
    }

    fn from_key(key: &str) -> Option<Self> {
        Some(key.to_string())
    }
}

macro_rules! int_map_key {
    ($($t:ty),*) => {
        $(
            impl MapKey for $t {
                fn to_key(&self) -> String {
                    self.to_string()
                }

                fn from_key(key: &str) -> Option<Self> {
                    key.parse().ok()
                }
            }
        )*
    };
}

int_map_key!(u32, u64, i32, i64, usize);

/// A closed set of string values, stored by a restricted text field.
pub trait Restricted: Sized + Copy {
    fn as_str(&self) -> &'static str;
    fn parse(value: &str) -> Option<Self>;
}

/// A concrete document type built on the [`Document`] envelope.
///
/// The prefix is baked into every encoded snapshot and delta so that bytes
/// produced for one document type can never be loaded as another.
pub trait SyncDocument: Sized {
    const PREFIX: &'static str;

    fn from_document(document: Document) -> Self;
    fn document(&self) -> &Document;
    fn document_mut(&mut self) -> &mut Document;
    fn into_document(self) -> Document;

    /// Creates an empty document of this type.
    fn empty() -> Self {
        Self::from_document(Document::new(Self::PREFIX))
    }

    fn from_snapshot(snapshot: &Snapshot) -> Result<Self, SyncError> {
        Ok(Self::from_document(Document::from_snapshot(Self::PREFIX, snapshot)?))
    }

    /// Deep copy of the same concrete type, without listeners.
    fn duplicate(&mut self) -> Self {
        Self::from_document(self.document_mut().clone_document())
    }

    /// Deep copy into `out`, keeping `out`'s listeners.
    fn duplicate_into(&mut self, out: &mut Self) {
        self.document_mut().clone_into(out.document_mut());
    }
}

// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use super::raw;
use crate::codec::JsonCodec;
use crate::document::Document;
use crate::enums::FieldType;
use crate::traits::{Codec, SyncError};
use std::marker::PhantomData;

/// Ordered list of codec-encoded values.
///
/// Concurrent inserts at the same position all survive; their relative order
/// is decided by the engine and is the same on every replica.
#[derive(Debug, Clone)]
pub struct ArrayField<V, C = JsonCodec<V>> {
    name: String,
    codec: C,
    _value: PhantomData<fn() -> V>,
}

impl<V, C: Codec<V>> ArrayField<V, C> {
    pub fn with_codec(name: &str, codec: C) -> Self {
        Self {
            name: name.to_string(),
            codec,
            _value: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self, doc: &Document) -> usize {
        raw::seq_len(doc, &self.name)
    }

    pub fn is_empty(&self, doc: &Document) -> bool {
        self.len(doc) == 0
    }

    pub fn get(&self, doc: &Document, index: usize) -> Result<Option<V>, SyncError> {
        raw::seq_get(doc, &self.name, index)?
            .map(|raw| self.codec.deserialize(raw))
            .transpose()
    }

    pub fn values(&self, doc: &Document) -> Result<Vec<V>, SyncError> {
        self.slice(doc, 0, None)
    }

    /// Values in `[start, end)`; `None` reads to the end.
    pub fn slice(&self, doc: &Document, start: usize, end: Option<usize>) -> Result<Vec<V>, SyncError> {
        let end = end.unwrap_or(usize::MAX);
        if end < start {
            return Err(SyncError::InvalidRange { start, end });
        }
        raw::seq_range(doc, &self.name, start, end)?
            .into_iter()
            .map(|raw| self.codec.deserialize(raw))
            .collect()
    }

    /// Inserts `values` before `index`. An empty insert is a no-op.
    pub fn insert(&self, doc: &mut Document, index: usize, values: &[V]) -> Result<(), SyncError> {
        let encoded = self.encode(values)?;
        raw::seq_insert(doc, &self.name, FieldType::Array, index, &encoded)
    }

    pub fn push(&self, doc: &mut Document, values: &[V]) -> Result<(), SyncError> {
        let end = self.len(doc);
        self.insert(doc, end, values)
    }

    /// Deletes `[start, end)`; `None` deletes the single element at `start`.
    pub fn delete(&self, doc: &mut Document, start: usize, end: Option<usize>) -> Result<(), SyncError> {
        raw::seq_delete(doc, &self.name, start, end.unwrap_or(start.saturating_add(1)))
    }

    /// Replaces `[start, end)` with `values`; `None` replaces one element.
    pub fn splice(
        &self,
        doc: &mut Document,
        start: usize,
        end: Option<usize>,
        values: &[V],
    ) -> Result<(), SyncError> {
        let encoded = self.encode(values)?;
        raw::seq_delete(doc, &self.name, start, end.unwrap_or(start.saturating_add(1)))?;
        let start = start.min(self.len(doc));
        raw::seq_insert(doc, &self.name, FieldType::Array, start, &encoded)
    }

    pub fn clear(&self, doc: &mut Document) -> Result<(), SyncError> {
        let len = self.len(doc);
        raw::seq_delete(doc, &self.name, 0, len)
    }

    fn encode(&self, values: &[V]) -> Result<Vec<serde_json::Value>, SyncError> {
        values.iter().map(|v| self.codec.serialize(v)).collect()
    }
}

impl<V> ArrayField<V, JsonCodec<V>>
where
    JsonCodec<V>: Codec<V>,
{
    pub fn new(name: &str) -> Self {
        Self::with_codec(name, JsonCodec::new())
    }
}

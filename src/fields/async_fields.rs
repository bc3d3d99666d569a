// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Fields whose value codec may suspend.
//!
//! Only codec translation is awaited. Structure (length, keys, presence) is
//! read and written synchronously, so a field's size reflects every completed
//! mutation at once.

use super::object::set_cell;
use super::raw;
use crate::document::Document;
use crate::enums::FieldType;
use crate::traits::{AsyncCodec, MapKey, SyncError};
use serde_json::Value;
use std::marker::PhantomData;

async fn decode_all<V, C>(codec: &C, raws: Vec<Value>) -> Result<Vec<V>, SyncError>
where
    V: Send + Sync,
    C: AsyncCodec<V>,
{
    let mut out = Vec::with_capacity(raws.len());
    for raw in raws {
        out.push(codec.deserialize(raw).await?);
    }
    Ok(out)
}

async fn encode_all<V, C>(codec: &C, values: &[V]) -> Result<Vec<Value>, SyncError>
where
    V: Send + Sync,
    C: AsyncCodec<V>,
{
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        out.push(codec.serialize(value).await?);
    }
    Ok(out)
}

// ============================================================================
// AsyncArray
// ============================================================================

#[derive(Debug, Clone)]
pub struct AsyncArrayField<V, C> {
    name: String,
    codec: C,
    _value: PhantomData<fn() -> V>,
}

impl<V: Send + Sync, C: AsyncCodec<V>> AsyncArrayField<V, C> {
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

    pub async fn get(&self, doc: &Document, index: usize) -> Result<Option<V>, SyncError> {
        match raw::seq_get(doc, &self.name, index)? {
            Some(raw) => Ok(Some(self.codec.deserialize(raw).await?)),
            None => Ok(None),
        }
    }

    pub async fn values(&self, doc: &Document) -> Result<Vec<V>, SyncError> {
        self.slice(doc, 0, None).await
    }

    pub async fn slice(&self, doc: &Document, start: usize, end: Option<usize>) -> Result<Vec<V>, SyncError> {
        let end = end.unwrap_or(usize::MAX);
        if end < start {
            return Err(SyncError::InvalidRange { start, end });
        }
        let raws = raw::seq_range(doc, &self.name, start, end)?;
        decode_all(&self.codec, raws).await
    }

    pub async fn insert(&self, doc: &mut Document, index: usize, values: &[V]) -> Result<(), SyncError> {
        let encoded = encode_all(&self.codec, values).await?;
        raw::seq_insert(doc, &self.name, FieldType::AsyncArray, index, &encoded)
    }

    pub async fn push(&self, doc: &mut Document, values: &[V]) -> Result<(), SyncError> {
        let encoded = encode_all(&self.codec, values).await?;
        let end = self.len(doc);
        raw::seq_insert(doc, &self.name, FieldType::AsyncArray, end, &encoded)
    }

    pub fn delete(&self, doc: &mut Document, start: usize, end: Option<usize>) -> Result<(), SyncError> {
        raw::seq_delete(doc, &self.name, start, end.unwrap_or(start.saturating_add(1)))
    }

    pub async fn splice(
        &self,
        doc: &mut Document,
        start: usize,
        end: Option<usize>,
        values: &[V],
    ) -> Result<(), SyncError> {
        let encoded = encode_all(&self.codec, values).await?;
        raw::seq_delete(doc, &self.name, start, end.unwrap_or(start.saturating_add(1)))?;
        let start = start.min(self.len(doc));
        raw::seq_insert(doc, &self.name, FieldType::AsyncArray, start, &encoded)
    }

    pub fn clear(&self, doc: &mut Document) -> Result<(), SyncError> {
        let len = self.len(doc);
        raw::seq_delete(doc, &self.name, 0, len)
    }
}

// ============================================================================
// AsyncObject
// ============================================================================

#[derive(Debug, Clone)]
pub struct AsyncObjectField<V, C> {
    name: String,
    codec: C,
    _value: PhantomData<fn() -> V>,
}

impl<V: Send + Sync, C: AsyncCodec<V>> AsyncObjectField<V, C> {
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

    pub fn is_set(&self, doc: &Document) -> bool {
        raw::seq_len(doc, &self.name) > 0
    }

    pub async fn get(&self, doc: &Document) -> Result<Option<V>, SyncError> {
        let len = raw::seq_len(doc, &self.name);
        if len == 0 {
            return Ok(None);
        }
        match raw::seq_get(doc, &self.name, len - 1)? {
            Some(raw) => Ok(Some(self.codec.deserialize(raw).await?)),
            None => Ok(None),
        }
    }

    pub async fn set(&self, doc: &mut Document, value: &V) -> Result<(), SyncError> {
        let encoded = self.codec.serialize(value).await?;
        set_cell(doc, &self.name, FieldType::AsyncObject, encoded)
    }

    pub fn clear(&self, doc: &mut Document) -> Result<(), SyncError> {
        let len = raw::seq_len(doc, &self.name);
        raw::seq_delete(doc, &self.name, 0, len)
    }
}

// ============================================================================
// AsyncMap
// ============================================================================

#[derive(Debug, Clone)]
pub struct AsyncMapField<K, V, C> {
    name: String,
    codec: C,
    _entry: PhantomData<fn() -> (K, V)>,
}

impl<K: MapKey, V: Send + Sync, C: AsyncCodec<V>> AsyncMapField<K, V, C> {
    pub fn with_codec(name: &str, codec: C) -> Self {
        Self {
            name: name.to_string(),
            codec,
            _entry: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has(&self, doc: &Document, key: &K) -> bool {
        raw::map_has(doc, &self.name, &key.to_key())
    }

    pub fn keys(&self, doc: &Document) -> Vec<K> {
        raw::map_keys(doc, &self.name)
            .iter()
            .filter_map(|k| K::from_key(k))
            .collect()
    }

    pub fn len(&self, doc: &Document) -> usize {
        raw::map_keys(doc, &self.name).len()
    }

    pub fn is_empty(&self, doc: &Document) -> bool {
        self.len(doc) == 0
    }

    pub async fn get(&self, doc: &Document, key: &K) -> Result<Option<V>, SyncError> {
        match raw::map_get(doc, &self.name, &key.to_key())? {
            Some(raw) => Ok(Some(self.codec.deserialize(raw).await?)),
            None => Ok(None),
        }
    }

    pub async fn entries(&self, doc: &Document) -> Result<Vec<(K, V)>, SyncError> {
        let mut pending = Vec::new();
        for raw_key in raw::map_keys(doc, &self.name) {
            let Some(key) = K::from_key(&raw_key) else {
                continue;
            };
            if let Some(raw) = raw::map_get(doc, &self.name, &raw_key)? {
                pending.push((key, raw));
            }
        }
        let mut out = Vec::with_capacity(pending.len());
        for (key, raw) in pending {
            out.push((key, self.codec.deserialize(raw).await?));
        }
        Ok(out)
    }

    pub async fn values(&self, doc: &Document) -> Result<Vec<V>, SyncError> {
        Ok(self.entries(doc).await?.into_iter().map(|(_, v)| v).collect())
    }

    pub async fn set(&self, doc: &mut Document, key: &K, value: &V) -> Result<(), SyncError> {
        let encoded = self.codec.serialize(value).await?;
        raw::map_put(doc, &self.name, FieldType::AsyncMap, &key.to_key(), &encoded)
    }

    pub fn delete(&self, doc: &mut Document, key: &K) -> Result<bool, SyncError> {
        raw::map_delete(doc, &self.name, &key.to_key())
    }

    pub fn clear(&self, doc: &mut Document) -> Result<(), SyncError> {
        raw::map_clear(doc, &self.name)
    }
}

// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use super::raw;
use crate::codec::JsonCodec;
use crate::document::Document;
use crate::enums::FieldType;
use crate::traits::{Codec, MapKey, SyncError};
use std::marker::PhantomData;

/// Keyed collection of codec-encoded values. Concurrent writes to the same key
/// resolve to a single winner.
#[derive(Debug, Clone)]
pub struct MapField<K, V, C = JsonCodec<V>> {
    name: String,
    codec: C,
    _entry: PhantomData<fn() -> (K, V)>,
}

impl<K: MapKey, V, C: Codec<V>> MapField<K, V, C> {
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

    pub fn get(&self, doc: &Document, key: &K) -> Result<Option<V>, SyncError> {
        raw::map_get(doc, &self.name, &key.to_key())?
            .map(|raw| self.codec.deserialize(raw))
            .transpose()
    }

    pub fn has(&self, doc: &Document, key: &K) -> bool {
        raw::map_has(doc, &self.name, &key.to_key())
    }

    /// Keys in key order. Keys that do not parse as `K` are skipped.
    pub fn keys(&self, doc: &Document) -> Vec<K> {
        raw::map_keys(doc, &self.name)
            .iter()
            .filter_map(|k| K::from_key(k))
            .collect()
    }

    pub fn values(&self, doc: &Document) -> Result<Vec<V>, SyncError> {
        Ok(self.entries(doc)?.into_iter().map(|(_, v)| v).collect())
    }

    pub fn entries(&self, doc: &Document) -> Result<Vec<(K, V)>, SyncError> {
        let mut out = Vec::new();
        for raw_key in raw::map_keys(doc, &self.name) {
            let Some(key) = K::from_key(&raw_key) else {
                continue;
            };
            if let Some(raw) = raw::map_get(doc, &self.name, &raw_key)? {
                out.push((key, self.codec.deserialize(raw)?));
            }
        }
        Ok(out)
    }

    pub fn len(&self, doc: &Document) -> usize {
        raw::map_keys(doc, &self.name).len()
    }

    pub fn is_empty(&self, doc: &Document) -> bool {
        self.len(doc) == 0
    }

    pub fn set(&self, doc: &mut Document, key: &K, value: &V) -> Result<(), SyncError> {
        let encoded = self.codec.serialize(value)?;
        raw::map_put(doc, &self.name, FieldType::Map, &key.to_key(), &encoded)
    }

    /// Removes `key`, returning whether it was present.
    pub fn delete(&self, doc: &mut Document, key: &K) -> Result<bool, SyncError> {
        raw::map_delete(doc, &self.name, &key.to_key())
    }

    pub fn clear(&self, doc: &mut Document) -> Result<(), SyncError> {
        raw::map_clear(doc, &self.name)
    }
}

impl<K: MapKey, V> MapField<K, V, JsonCodec<V>>
where
    JsonCodec<V>: Codec<V>,
{
    pub fn new(name: &str) -> Self {
        Self::with_codec(name, JsonCodec::new())
    }
}

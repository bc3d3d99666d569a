// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use super::raw;
use crate::codec::JsonCodec;
use crate::document::Document;
use crate::enums::FieldType;
use crate::traits::{Codec, SyncError};
use std::marker::PhantomData;

/// An optional single value, stored as a sequence of zero or one element.
///
/// Concurrent first writes can leave more than one element; the last one is
/// read, and the next `set` collapses the cell back to a single element.
#[derive(Debug, Clone)]
pub struct ObjectField<V, C = JsonCodec<V>> {
    name: String,
    codec: C,
    _value: PhantomData<fn() -> V>,
}

impl<V, C: Codec<V>> ObjectField<V, C> {
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

    pub fn get(&self, doc: &Document) -> Result<Option<V>, SyncError> {
        let len = raw::seq_len(doc, &self.name);
        if len == 0 {
            return Ok(None);
        }
        raw::seq_get(doc, &self.name, len - 1)?
            .map(|raw| self.codec.deserialize(raw))
            .transpose()
    }

    /// Every element of the cell, including those left by concurrent first writes.
    pub fn elements(&self, doc: &Document) -> Result<Vec<V>, SyncError> {
        let len = raw::seq_len(doc, &self.name);
        raw::seq_range(doc, &self.name, 0, len)?
            .into_iter()
            .map(|raw| self.codec.deserialize(raw))
            .collect()
    }

    pub fn is_set(&self, doc: &Document) -> bool {
        raw::seq_len(doc, &self.name) > 0
    }

    pub fn set(&self, doc: &mut Document, value: &V) -> Result<(), SyncError> {
        let encoded = self.codec.serialize(value)?;
        set_cell(doc, &self.name, FieldType::Object, encoded)
    }

    pub fn clear(&self, doc: &mut Document) -> Result<(), SyncError> {
        let len = raw::seq_len(doc, &self.name);
        raw::seq_delete(doc, &self.name, 0, len)
    }
}

impl<V> ObjectField<V, JsonCodec<V>>
where
    JsonCodec<V>: Codec<V>,
{
    pub fn new(name: &str) -> Self {
        Self::with_codec(name, JsonCodec::new())
    }
}

pub(crate) fn set_cell(
    doc: &mut Document,
    name: &str,
    field_type: FieldType,
    encoded: serde_json::Value,
) -> Result<(), SyncError> {
    doc.check_field(name, field_type)?;
    match raw::seq_len(doc, name) {
        0 => raw::seq_insert(doc, name, field_type, 0, std::slice::from_ref(&encoded)),
        len => {
            if len > 1 {
                raw::seq_delete(doc, name, 0, len - 1)?;
            }
            raw::seq_put(doc, name, 0, &encoded)
        }
    }
}

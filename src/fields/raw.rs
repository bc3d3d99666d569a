// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Untyped leaf access shared by the sync and async fields.
//!
//! Sequence and map leaves hold codec output as JSON text. Absent fields read as
//! empty; leaves that are not JSON text surface as errors.

use crate::codec::{from_leaf, to_leaf};
use crate::document::Document;
use crate::enums::FieldType;
use crate::traits::SyncError;
use automerge::transaction::Transactable;
use automerge::{ReadDoc, ScalarValue, Value};
use serde_json::Value as Json;

/// Decodes one leaf. Anything but a text scalar is a `Format` error, so a
/// replica cannot hide an element behind a number or a nested object.
fn decode_leaf(value: Option<(Value<'_>, automerge::ObjId)>) -> Result<Option<Json>, SyncError> {
    match value {
        None => Ok(None),
        Some((Value::Scalar(s), _)) => match s.as_ref() {
            ScalarValue::Str(text) => from_leaf(text).map(Some),
            other => Err(SyncError::Format(format!("unexpected leaf {}", other))),
        },
        Some((Value::Object(kind), _)) => Err(SyncError::Format(format!("unexpected nested {}", kind))),
    }
}

// ============================================================================
// Sequences
// ============================================================================

pub(crate) fn seq_len(doc: &Document, name: &str) -> usize {
    doc.field_obj(name)
        .map(|obj| doc.engine().length(&obj))
        .unwrap_or(0)
}

pub(crate) fn seq_get(doc: &Document, name: &str, index: usize) -> Result<Option<Json>, SyncError> {
    let Some(obj) = doc.field_obj(name) else {
        return Ok(None);
    };
    if index >= doc.engine().length(&obj) {
        return Ok(None);
    }
    decode_leaf(doc.engine().get(&obj, index)?)
}

/// Leaves in `[start, end)`, clamped to the current length.
pub(crate) fn seq_range(doc: &Document, name: &str, start: usize, end: usize) -> Result<Vec<Json>, SyncError> {
    let Some(obj) = doc.field_obj(name) else {
        return Ok(Vec::new());
    };
    let len = doc.engine().length(&obj);
    let mut out = Vec::new();
    for index in start.min(len)..end.min(len) {
        if let Some(leaf) = decode_leaf(doc.engine().get(&obj, index)?)? {
            out.push(leaf);
        }
    }
    Ok(out)
}

pub(crate) fn seq_insert(
    doc: &mut Document,
    name: &str,
    field_type: FieldType,
    index: usize,
    values: &[Json],
) -> Result<(), SyncError> {
    if values.is_empty() {
        return Ok(());
    }
    let len = seq_len(doc, name);
    if index > len {
        return Err(SyncError::InvalidRange { start: index, end: len });
    }
    let obj = doc.ensure_field(name, field_type)?;
    let leaves: Vec<ScalarValue> = values.iter().map(|v| ScalarValue::from(to_leaf(v))).collect();
    doc.engine_mut().splice(&obj, index, 0, leaves)?;
    doc.notify(name);
    Ok(())
}

/// Deletes `[start, end)`, clamped to the current length.
pub(crate) fn seq_delete(doc: &mut Document, name: &str, start: usize, end: usize) -> Result<(), SyncError> {
    if end < start {
        return Err(SyncError::InvalidRange { start, end });
    }
    let Some(obj) = doc.field_obj(name) else {
        return Ok(());
    };
    let len = doc.engine().length(&obj);
    let end = end.min(len);
    if start >= end {
        return Ok(());
    }
    doc.engine_mut()
        .splice(&obj, start, (end - start) as isize, Vec::<ScalarValue>::new())?;
    doc.notify(name);
    Ok(())
}

/// Overwrites the leaf at `index` in place.
pub(crate) fn seq_put(doc: &mut Document, name: &str, index: usize, value: &Json) -> Result<(), SyncError> {
    let len = seq_len(doc, name);
    let Some(obj) = doc.field_obj(name).filter(|_| index < len) else {
        return Err(SyncError::InvalidRange { start: index, end: len });
    };
    doc.engine_mut().put(&obj, index, to_leaf(value))?;
    doc.notify(name);
    Ok(())
}

// ============================================================================
// Maps
// ============================================================================

pub(crate) fn map_get(doc: &Document, name: &str, key: &str) -> Result<Option<Json>, SyncError> {
    let Some(obj) = doc.field_obj(name) else {
        return Ok(None);
    };
    decode_leaf(doc.engine().get(&obj, key)?)
}

pub(crate) fn map_has(doc: &Document, name: &str, key: &str) -> bool {
    doc.field_obj(name)
        .map(|obj| matches!(doc.engine().get(&obj, key), Ok(Some(_))))
        .unwrap_or(false)
}

/// Keys in engine order (lexicographic).
pub(crate) fn map_keys(doc: &Document, name: &str) -> Vec<String> {
    doc.field_obj(name)
        .map(|obj| doc.engine().keys(&obj).collect())
        .unwrap_or_default()
}

pub(crate) fn map_put(
    doc: &mut Document,
    name: &str,
    field_type: FieldType,
    key: &str,
    value: &Json,
) -> Result<(), SyncError> {
    let obj = doc.ensure_field(name, field_type)?;
    doc.engine_mut().put(&obj, key, to_leaf(value))?;
    doc.notify(name);
    Ok(())
}

/// Removes `key`. Returns whether it was present.
pub(crate) fn map_delete(doc: &mut Document, name: &str, key: &str) -> Result<bool, SyncError> {
    if !map_has(doc, name, key) {
        return Ok(false);
    }
    let Some(obj) = doc.field_obj(name) else {
        return Ok(false);
    };
    doc.engine_mut().delete(&obj, key)?;
    doc.notify(name);
    Ok(true)
}

pub(crate) fn map_clear(doc: &mut Document, name: &str) -> Result<(), SyncError> {
    for key in map_keys(doc, name) {
        map_delete(doc, name, &key)?;
    }
    Ok(())
}

// ============================================================================
// Scalar cells (text primitive holding a whole value)
// ============================================================================

pub(crate) fn cell_read(doc: &Document, name: &str) -> String {
    doc.field_obj(name)
        .and_then(|obj| doc.engine().text(&obj).ok())
        .unwrap_or_default()
}

/// Replaces the cell content with exactly two events: creation or removal of
/// the old value, then the write of the new one (even when it is empty).
pub(crate) fn cell_replace(
    doc: &mut Document,
    name: &str,
    field_type: FieldType,
    content: &str,
) -> Result<(), SyncError> {
    let existed = doc.field_obj(name).is_some();
    let obj = doc.ensure_field(name, field_type)?;
    if existed {
        let len = doc.engine().length(&obj);
        if len > 0 {
            doc.engine_mut().splice_text(&obj, 0, len as isize, "")?;
        }
        doc.notify(name);
    }
    if !content.is_empty() {
        doc.engine_mut().splice_text(&obj, 0, 0, content)?;
    }
    doc.notify(name);
    Ok(())
}

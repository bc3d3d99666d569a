// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Rich text: characters plus formatting attributes over ranges.
//!
//! Positions count Unicode scalar values. Attribute values are JSON; a `null`
//! attribute value removes that attribute from the range.

use crate::document::Document;
use crate::enums::FieldType;
use crate::traits::SyncError;
use automerge::marks::{ExpandMark, Mark};
use automerge::transaction::Transactable;
use automerge::{ObjId, ReadDoc, ScalarValue};
use serde_json::Value;
use std::collections::BTreeMap;

/// Formatting attributes keyed by name.
pub type Attributes = BTreeMap<String, Value>;

/// A maximal span of text sharing the same attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub attributes: Attributes,
}

#[derive(Debug, Clone)]
pub struct TextField {
    name: String,
}

impl TextField {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Plain content without attributes.
    pub fn to_string(&self, doc: &Document) -> String {
        doc.field_obj(&self.name)
            .and_then(|obj| doc.engine().text(&obj).ok())
            .unwrap_or_default()
    }

    pub fn len(&self, doc: &Document) -> usize {
        doc.field_obj(&self.name)
            .map(|obj| doc.engine().length(&obj))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, doc: &Document) -> bool {
        self.len(doc) == 0
    }

    /// Content split into runs of uniform attributes.
    pub fn runs(&self, doc: &Document) -> Result<Vec<TextRun>, SyncError> {
        let Some(obj) = doc.field_obj(&self.name) else {
            return Ok(Vec::new());
        };
        let chars: Vec<char> = doc.engine().text(&obj)?.chars().collect();
        let marks = doc.engine().marks(&obj)?;

        let mut bounds = vec![0, chars.len()];
        for mark in &marks {
            bounds.push(mark.start.min(chars.len()));
            bounds.push(mark.end.min(chars.len()));
        }
        bounds.sort_unstable();
        bounds.dedup();

        let mut runs: Vec<TextRun> = Vec::new();
        for window in bounds.windows(2) {
            let (start, end) = (window[0], window[1]);
            if start >= end {
                continue;
            }
            let mut attributes = Attributes::new();
            for mark in marks.iter().filter(|m| m.start <= start && m.end >= end) {
                match from_scalar(mark.value()) {
                    Value::Null => {}
                    value => {
                        attributes.insert(mark.name().to_string(), value);
                    }
                }
            }
            let text: String = chars[start..end].iter().collect();
            match runs.last_mut() {
                Some(last) if last.attributes == attributes => last.text.push_str(&text),
                _ => runs.push(TextRun { text, attributes }),
            }
        }
        Ok(runs)
    }

    /// Inserts `text` at `position`, optionally formatted.
    pub fn insert(
        &self,
        doc: &mut Document,
        position: usize,
        text: &str,
        attributes: Option<&Attributes>,
    ) -> Result<(), SyncError> {
        if text.is_empty() {
            return Ok(());
        }
        let len = self.len(doc);
        if position > len {
            return Err(SyncError::InvalidRange {
                start: position,
                end: len,
            });
        }
        let obj = doc.ensure_field(&self.name, FieldType::Text)?;
        doc.engine_mut().splice_text(&obj, position, 0, text)?;
        if let Some(attributes) = attributes {
            apply_marks(doc, &obj, position, position + text.chars().count(), attributes)?;
        }
        doc.notify(&self.name);
        Ok(())
    }

    /// Deletes `[start, end)`, clamped to the current length.
    pub fn delete(&self, doc: &mut Document, start: usize, end: usize) -> Result<(), SyncError> {
        if end < start {
            return Err(SyncError::InvalidRange { start, end });
        }
        let Some(obj) = doc.field_obj(&self.name) else {
            return Ok(());
        };
        let end = end.min(doc.engine().length(&obj));
        if start >= end {
            return Ok(());
        }
        doc.engine_mut()
            .splice_text(&obj, start, (end - start) as isize, "")?;
        doc.notify(&self.name);
        Ok(())
    }

    /// Merges `attributes` over `[start, end)`.
    pub fn format(
        &self,
        doc: &mut Document,
        start: usize,
        end: usize,
        attributes: &Attributes,
    ) -> Result<(), SyncError> {
        if end < start {
            return Err(SyncError::InvalidRange { start, end });
        }
        let Some(obj) = doc.field_obj(&self.name) else {
            return Ok(());
        };
        let end = end.min(doc.engine().length(&obj));
        if start >= end || attributes.is_empty() {
            return Ok(());
        }
        apply_marks(doc, &obj, start, end, attributes)?;
        doc.notify(&self.name);
        Ok(())
    }

    /// Replaces `[start, end)` with `value`.
    ///
    /// With `value = None` only `attributes` are merged over the range, and
    /// nothing happens if `attributes` is also `None`. Otherwise a non-empty
    /// range is deleted and `value` inserted at `start` with `attributes`.
    pub fn replace(
        &self,
        doc: &mut Document,
        start: usize,
        end: usize,
        value: Option<&str>,
        attributes: Option<&Attributes>,
    ) -> Result<(), SyncError> {
        if end < start {
            return Err(SyncError::InvalidRange { start, end });
        }
        match (value, attributes) {
            (None, None) => Ok(()),
            (None, Some(attributes)) => self.format(doc, start, end, attributes),
            (Some(value), attributes) => {
                self.delete(doc, start, end)?;
                let start = start.min(self.len(doc));
                self.insert(doc, start, value, attributes)
            }
        }
    }
}

fn apply_marks(
    doc: &mut Document,
    obj: &ObjId,
    start: usize,
    end: usize,
    attributes: &Attributes,
) -> Result<(), SyncError> {
    for (name, value) in attributes {
        match to_scalar(value) {
            Some(scalar) => {
                doc.engine_mut()
                    .mark(obj, Mark::new(name.clone(), scalar, start, end), ExpandMark::None)?;
            }
            None => {
                doc.engine_mut()
                    .unmark(obj, name, start, end, ExpandMark::None)?;
            }
        }
    }
    Ok(())
}

fn to_scalar(value: &Value) -> Option<ScalarValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(ScalarValue::from(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(ScalarValue::from)
            .or_else(|| n.as_u64().map(ScalarValue::from))
            .or_else(|| n.as_f64().map(ScalarValue::from)),
        Value::String(s) => Some(ScalarValue::from(s.as_str())),
        other => Some(ScalarValue::from(other.to_string())),
    }
}

fn from_scalar(value: &ScalarValue) -> Value {
    match value {
        ScalarValue::Null => Value::Null,
        ScalarValue::Boolean(b) => Value::Bool(*b),
        ScalarValue::Int(i) => Value::from(*i),
        ScalarValue::Uint(u) => Value::from(*u),
        ScalarValue::F64(f) => Value::from(*f),
        ScalarValue::Str(s) => Value::String(s.to_string()),
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_conversion_keeps_json_kinds() {
        for value in [json!(true), json!(3), json!(-4), json!(1.5), json!("bold")] {
            let scalar = to_scalar(&value).unwrap();
            assert_eq!(from_scalar(&scalar), value);
        }
        assert!(to_scalar(&Value::Null).is_none());
    }
}

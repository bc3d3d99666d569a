// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use super::raw;
use crate::document::Document;
use crate::enums::FieldType;
use crate::traits::SyncError;
use serde_json::Value;

/// Set of strings: a map whose keys are the members.
#[derive(Debug, Clone)]
pub struct SetField {
    name: String,
}

impl SetField {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has(&self, doc: &Document, value: &str) -> bool {
        raw::map_has(doc, &self.name, value)
    }

    /// Members in lexicographic order.
    pub fn values(&self, doc: &Document) -> Vec<String> {
        raw::map_keys(doc, &self.name)
    }

    pub fn len(&self, doc: &Document) -> usize {
        raw::map_keys(doc, &self.name).len()
    }

    pub fn is_empty(&self, doc: &Document) -> bool {
        self.len(doc) == 0
    }

    /// Adds `value`; adding an existing member is a no-op.
    pub fn add(&self, doc: &mut Document, value: &str) -> Result<(), SyncError> {
        if self.has(doc, value) {
            return doc.check_field(&self.name, FieldType::Set);
        }
        raw::map_put(doc, &self.name, FieldType::Set, value, &Value::Bool(true))
    }

    /// Removes `value`, returning whether it was a member.
    pub fn delete(&self, doc: &mut Document, value: &str) -> Result<bool, SyncError> {
        raw::map_delete(doc, &self.name, value)
    }
}

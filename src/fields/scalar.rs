// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Scalar cells backed by a text primitive.
//!
//! Setting a cell removes the previous content and inserts the new content,
//! which is two primitive mutations. Concurrent sets interleave at the
//! character level; a cell whose merged content no longer parses reads as
//! absent.

use super::raw;
use crate::document::Document;
use crate::enums::FieldType;
use crate::traits::{Restricted, SyncError};
use std::marker::PhantomData;

/// `true` is a single character, `false` is empty.
#[derive(Debug, Clone)]
pub struct BooleanField {
    name: String,
}

impl BooleanField {
    const TRUE: &'static str = "1";

    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, doc: &Document) -> bool {
        !raw::cell_read(doc, &self.name).is_empty()
    }

    pub fn set(&self, doc: &mut Document, value: bool) -> Result<(), SyncError> {
        let content = if value { Self::TRUE } else { "" };
        raw::cell_replace(doc, &self.name, FieldType::Boolean, content)
    }
}

/// A finite `f64` stored as its decimal text.
#[derive(Debug, Clone)]
pub struct NumericField {
    name: String,
}

impl NumericField {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, doc: &Document) -> Option<f64> {
        raw::cell_read(doc, &self.name).parse::<f64>().ok()
    }

    pub fn set(&self, doc: &mut Document, value: f64) -> Result<(), SyncError> {
        if !value.is_finite() {
            return Err(SyncError::Schema(format!("Non-finite numeric value: {}", value)));
        }
        raw::cell_replace(doc, &self.name, FieldType::Numeric, &value.to_string())
    }

    pub fn clear(&self, doc: &mut Document) -> Result<(), SyncError> {
        raw::cell_replace(doc, &self.name, FieldType::Numeric, "")
    }
}

/// One value out of the closed set `E`.
#[derive(Debug, Clone)]
pub struct RestrictedTextField<E> {
    name: String,
    _value: PhantomData<fn() -> E>,
}

impl<E: Restricted> RestrictedTextField<E> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            _value: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `None` when unset or when the stored text is outside `E`.
    pub fn get(&self, doc: &Document) -> Option<E> {
        E::parse(&raw::cell_read(doc, &self.name))
    }

    pub fn set(&self, doc: &mut Document, value: E) -> Result<(), SyncError> {
        raw::cell_replace(doc, &self.name, FieldType::RestrictedText, value.as_str())
    }

    pub fn clear(&self, doc: &mut Document) -> Result<(), SyncError> {
        raw::cell_replace(doc, &self.name, FieldType::RestrictedText, "")
    }
}

// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Typed fields over the document's raw primitives.
//!
//! A field is a lightweight descriptor (name + codec). Reads borrow the
//! [`Document`] shared, writes borrow it exclusively. The backing primitive is
//! created on first write. Every primitive mutation emits exactly one change
//! event.
//!
//! | Field | Primitive |
//! |-------|-----------|
//! | [`ArrayField`], [`AsyncArrayField`] | sequence |
//! | [`ObjectField`], [`AsyncObjectField`] | sequence (0 or 1 element) |
//! | [`MapField`], [`AsyncMapField`], [`SetField`] | map |
//! | [`BooleanField`], [`NumericField`], [`RestrictedTextField`] | text, as a scalar cell |
//! | [`TextField`] | text with marks |

pub mod array;
pub mod async_fields;
pub mod map;
pub mod object;
pub mod scalar;
pub mod set;
pub mod text;

mod raw;

pub use array::ArrayField;
pub use async_fields::{AsyncArrayField, AsyncMapField, AsyncObjectField};
pub use map::MapField;
pub use object::ObjectField;
pub use scalar::{BooleanField, NumericField, RestrictedTextField};
pub use set::SetField;
pub use text::{Attributes, TextField, TextRun};

use crate::codec::JsonCodec;
use crate::document::Document;
use crate::enums::FieldType;
use crate::traits::{AsyncCodec, Codec, MapKey, Restricted, SyncError};
use serde::{de::DeserializeOwned, Serialize};

/// Typed accessors keyed by `(name, expected type)`.
///
/// Each accessor fails fast with [`SyncError::FieldTypeMismatch`] when the
/// registry already binds `name` to another type, and with
/// [`SyncError::ReservedFieldName`] for reserved names.
impl Document {
    pub fn array<V>(&self, name: &str) -> Result<ArrayField<V>, SyncError>
    where
        V: Serialize + DeserializeOwned,
    {
        self.array_with(name, JsonCodec::new())
    }

    pub fn array_with<V, C: Codec<V>>(&self, name: &str, codec: C) -> Result<ArrayField<V, C>, SyncError> {
        self.check_field(name, FieldType::Array)?;
        Ok(ArrayField::with_codec(name, codec))
    }

    pub fn object<V>(&self, name: &str) -> Result<ObjectField<V>, SyncError>
    where
        V: Serialize + DeserializeOwned,
    {
        self.object_with(name, JsonCodec::new())
    }

    pub fn object_with<V, C: Codec<V>>(&self, name: &str, codec: C) -> Result<ObjectField<V, C>, SyncError> {
        self.check_field(name, FieldType::Object)?;
        Ok(ObjectField::with_codec(name, codec))
    }

    pub fn map<K, V>(&self, name: &str) -> Result<MapField<K, V>, SyncError>
    where
        K: MapKey,
        V: Serialize + DeserializeOwned,
    {
        self.map_with(name, JsonCodec::new())
    }

    pub fn map_with<K: MapKey, V, C: Codec<V>>(
        &self,
        name: &str,
        codec: C,
    ) -> Result<MapField<K, V, C>, SyncError> {
        self.check_field(name, FieldType::Map)?;
        Ok(MapField::with_codec(name, codec))
    }

    pub fn async_array<V, C>(&self, name: &str, codec: C) -> Result<AsyncArrayField<V, C>, SyncError>
    where
        V: Send + Sync,
        C: AsyncCodec<V>,
    {
        self.check_field(name, FieldType::AsyncArray)?;
        Ok(AsyncArrayField::with_codec(name, codec))
    }

    pub fn async_object<V, C>(&self, name: &str, codec: C) -> Result<AsyncObjectField<V, C>, SyncError>
    where
        V: Send + Sync,
        C: AsyncCodec<V>,
    {
        self.check_field(name, FieldType::AsyncObject)?;
        Ok(AsyncObjectField::with_codec(name, codec))
    }

    pub fn async_map<K, V, C>(&self, name: &str, codec: C) -> Result<AsyncMapField<K, V, C>, SyncError>
    where
        K: MapKey,
        V: Send + Sync,
        C: AsyncCodec<V>,
    {
        self.check_field(name, FieldType::AsyncMap)?;
        Ok(AsyncMapField::with_codec(name, codec))
    }

    pub fn boolean(&self, name: &str) -> Result<BooleanField, SyncError> {
        self.check_field(name, FieldType::Boolean)?;
        Ok(BooleanField::new(name))
    }

    pub fn numeric(&self, name: &str) -> Result<NumericField, SyncError> {
        self.check_field(name, FieldType::Numeric)?;
        Ok(NumericField::new(name))
    }

    pub fn restricted_text<E: Restricted>(&self, name: &str) -> Result<RestrictedTextField<E>, SyncError> {
        self.check_field(name, FieldType::RestrictedText)?;
        Ok(RestrictedTextField::new(name))
    }

    pub fn set(&self, name: &str) -> Result<SetField, SyncError> {
        self.check_field(name, FieldType::Set)?;
        Ok(SetField::new(name))
    }

    pub fn text(&self, name: &str) -> Result<TextField, SyncError> {
        self.check_field(name, FieldType::Text)?;
        Ok(TextField::new(name))
    }

    /// Every registered field with its type, in name order.
    pub fn fields(&self) -> Vec<(String, FieldType)> {
        self.registry()
            .iter()
            .map(|(name, t)| (name.to_string(), t))
            .collect()
    }
}

// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use crate::enums::FieldType;
use crate::traits::SyncError;
use automerge::transaction::Transactable;
use automerge::{AutoCommit, ReadDoc, ROOT};
use std::collections::BTreeMap;
use tracing::warn;

/// Field names starting with this prefix are reserved for document metadata.
pub const RESERVED_PREFIX: &str = "__";

/// Registry entries live as flat root keys: `__field:<name>` → type name.
pub(crate) const ENTRY_PREFIX: &str = "__field:";

/// Records which field name uses which field type.
///
/// A name is bound to exactly one type for the lifetime of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRegistry {
    fields: BTreeMap<String, FieldType>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<FieldType> {
        self.fields.get(name).copied()
    }

    pub fn contains(&self, field_type: FieldType, name: &str) -> bool {
        self.get(name) == Some(field_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FieldType)> {
        self.fields.iter().map(|(name, t)| (name.as_str(), *t))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fails fast if `name` is reserved or already bound to another type.
    pub fn check(&self, name: &str, expected: FieldType) -> Result<(), SyncError> {
        if name.starts_with(RESERVED_PREFIX) {
            return Err(SyncError::ReservedFieldName(name.to_string()));
        }
        match self.get(name) {
            Some(actual) if actual != expected => Err(SyncError::FieldTypeMismatch {
                name: name.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Persists the binding in the document metadata and records it locally.
    pub(crate) fn register(
        &mut self,
        doc: &mut AutoCommit,
        name: &str,
        field_type: FieldType,
    ) -> Result<(), SyncError> {
        self.check(name, field_type)?;
        if self.get(name).is_none() {
            doc.put(ROOT, format!("{}{}", ENTRY_PREFIX, name), field_type.to_string())?;
            self.fields.insert(name.to_string(), field_type);
        }
        Ok(())
    }

    /// Rebuilds the registry from persisted metadata.
    ///
    /// Entries the local registry already binds keep their type; conflicting
    /// remote entries are ignored.
    pub(crate) fn reload(&mut self, doc: &AutoCommit) {
        for key in doc.keys(ROOT) {
            let Some(name) = key.strip_prefix(ENTRY_PREFIX) else {
                continue;
            };
            let stored = match doc.get(ROOT, key.as_str()) {
                Ok(Some((value, _))) => value.to_str().map(|s| s.to_string()),
                _ => None,
            };
            let Some(field_type) = stored.and_then(|s| s.parse::<FieldType>().ok()) else {
                warn!(field = name, "ignoring unreadable field registry entry");
                continue;
            };
            match self.fields.get(name) {
                Some(existing) if *existing != field_type => {
                    warn!(
                        field = name,
                        local = %existing,
                        remote = %field_type,
                        "ignoring conflicting field registry entry"
                    );
                }
                Some(_) => {}
                None => {
                    self.fields.insert(name.to_string(), field_type);
                }
            }
        }
    }

    pub(crate) fn load(doc: &AutoCommit) -> Self {
        let mut registry = Self::new();
        registry.reload(doc);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_reload() {
        let mut doc = AutoCommit::new();
        let mut registry = FieldRegistry::new();
        registry.register(&mut doc, "title", FieldType::Text).unwrap();
        registry.register(&mut doc, "tags", FieldType::Set).unwrap();

        let loaded = FieldRegistry::load(&doc);
        assert_eq!(loaded, registry);
        assert!(loaded.contains(FieldType::Text, "title"));
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_type_mismatch_fails_fast() {
        let mut doc = AutoCommit::new();
        let mut registry = FieldRegistry::new();
        registry.register(&mut doc, "count", FieldType::Numeric).unwrap();
        let err = registry.check("count", FieldType::Boolean).unwrap_err();
        assert!(matches!(err, SyncError::FieldTypeMismatch { .. }));
    }

    #[test]
    fn test_reserved_names_are_rejected() {
        let registry = FieldRegistry::new();
        assert!(matches!(
            registry.check("__fields", FieldType::Map),
            Err(SyncError::ReservedFieldName(_))
        ));
    }
}

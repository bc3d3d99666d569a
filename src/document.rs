// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! The document envelope.
//!
//! A [`Document`] owns one engine instance holding every field, plus a second
//! instance (the delta basis) holding the state as of the last delta boundary.
//! The basis is always causally prior to the live state, so the next delta is
//! exactly what the live state has that the basis lacks.

use crate::enums::FieldType;
use crate::envelope::{self, Delta, ItemKind, Snapshot};
use crate::events::{ChangeEvent, ChangeOrigin, ChangeSummary, ListenerId, Listeners};
use crate::flatten;
use crate::registry::{FieldRegistry, RESERVED_PREFIX};
use crate::traits::SyncError;
use automerge::transaction::Transactable;
use automerge::{AutoCommit, ChangeHash, ObjId, Patch, PatchAction, Prop, ReadDoc, Value, ROOT};
use tracing::warn;

pub struct Document {
    prefix: String,
    doc: AutoCommit,
    delta_basis: AutoCommit,
    snapshot_id: Option<String>,
    registry: FieldRegistry,
    listeners: Listeners,
    summary: ChangeSummary,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("prefix", &self.prefix)
            .field("snapshot_id", &self.snapshot_id)
            .field("registry", &self.registry)
            .finish()
    }
}

impl Document {
    /// Creates an empty document in the `prefix` namespace.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            doc: AutoCommit::new(),
            delta_basis: AutoCommit::new(),
            snapshot_id: None,
            registry: FieldRegistry::new(),
            listeners: Listeners::default(),
            summary: ChangeSummary::default(),
        }
    }

    /// Reconstructs a document from a snapshot produced in the same namespace.
    pub fn from_snapshot(prefix: impl Into<String>, snapshot: &Snapshot) -> Result<Self, SyncError> {
        let prefix = prefix.into();
        let envelope = envelope::open(&snapshot.data, &prefix, ItemKind::Snapshot)?;
        let doc = AutoCommit::load(&envelope.payload)
            .map_err(|e| SyncError::Format(format!("Snapshot decode error: {}", e)))?;
        let delta_basis = AutoCommit::load(&envelope.payload)
            .map_err(|e| SyncError::Format(format!("Snapshot decode error: {}", e)))?;
        let registry = FieldRegistry::load(&doc);
        Ok(Self {
            prefix,
            doc,
            delta_basis,
            snapshot_id: Some(snapshot.id.clone()),
            registry,
            listeners: Listeners::default(),
            summary: ChangeSummary::default(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Identifier of the most recently loaded or encoded snapshot.
    pub fn snapshot_id(&self) -> Option<&str> {
        self.snapshot_id.as_deref()
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    /// Current state vector of the live state.
    pub fn heads(&mut self) -> Vec<ChangeHash> {
        self.doc.get_heads()
    }

    // ------------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------------

    /// Encodes the full state as snapshot `id` and makes it the current snapshot.
    ///
    /// Deltas encoded afterwards belong to the new snapshot's lineage, so the
    /// delta basis moves to the snapshot state.
    pub fn encode_snapshot(&mut self, id: &str) -> Result<Snapshot, SyncError> {
        let snapshot = self.peek_snapshot(id)?;
        self.delta_basis = self.doc.fork();
        self.snapshot_id = Some(id.to_string());
        Ok(snapshot)
    }

    /// Encodes the full state without touching the snapshot id or delta basis.
    pub fn peek_snapshot(&mut self, id: &str) -> Result<Snapshot, SyncError> {
        let heads = self.doc.get_heads();
        let payload = self.doc.save();
        let data = envelope::write(&self.prefix, ItemKind::Snapshot, id, &heads, &payload)?;
        Ok(Snapshot {
            id: id.to_string(),
            data,
        })
    }

    /// Encodes a history-free snapshot and continues from it.
    ///
    /// The live state is replaced by the flattened copy, so later deltas are
    /// produced against the flattened history and apply on top of the snapshot.
    pub fn encode_flattened_snapshot(&mut self, id: &str) -> Result<Snapshot, SyncError> {
        let mut flat = flatten::flatten(&self.doc)?;
        let snapshot = Self::snapshot_of(&self.prefix, &mut flat, id)?;
        self.delta_basis = flat.fork();
        self.doc = flat;
        self.snapshot_id = Some(id.to_string());
        Ok(snapshot)
    }

    /// Encodes a history-free snapshot, leaving this document untouched.
    pub fn peek_flattened_snapshot(&mut self, id: &str) -> Result<Snapshot, SyncError> {
        let mut flat = flatten::flatten(&self.doc)?;
        Self::snapshot_of(&self.prefix, &mut flat, id)
    }

    fn snapshot_of(prefix: &str, doc: &mut AutoCommit, id: &str) -> Result<Snapshot, SyncError> {
        let heads = doc.get_heads();
        let payload = doc.save();
        let data = envelope::write(prefix, ItemKind::Snapshot, id, &heads, &payload)?;
        Ok(Snapshot {
            id: id.to_string(),
            data,
        })
    }

    // ------------------------------------------------------------------------
    // Deltas
    // ------------------------------------------------------------------------

    /// Encodes everything since the delta basis and advances the basis.
    pub fn encode_delta(&mut self) -> Result<Delta, SyncError> {
        let delta = self.peek_delta()?;
        let envelope = envelope::read(&delta.data)?;
        self.delta_basis
            .load_incremental(&envelope.payload)
            .map_err(|e| SyncError::Engine(e.to_string()))?;
        Ok(delta)
    }

    /// Encodes everything since the delta basis without advancing it.
    pub fn peek_delta(&mut self) -> Result<Delta, SyncError> {
        let basis = self.delta_basis.get_heads();
        let payload = self.doc.save_after(&basis);
        let heads = self.doc.get_heads();
        let data = envelope::write(&self.prefix, ItemKind::Delta, "", &heads, &payload)?;
        Ok(Delta { data })
    }

    /// True when the live state has changes not yet covered by a delta.
    pub fn has_unencoded_changes(&mut self) -> bool {
        self.doc.get_heads() != self.delta_basis.get_heads()
    }

    /// Applies `deltas` in order, then reloads the field registry.
    ///
    /// Application order does not affect the resulting state; it only affects
    /// how change events are grouped. The first failing delta stops the batch;
    /// deltas before it stay applied and the registry is reloaded either way.
    pub fn apply_deltas(&mut self, deltas: &[Delta]) -> Result<(), SyncError> {
        let result = deltas.iter().try_for_each(|delta| self.apply_one(delta));
        self.registry.reload(&self.doc);
        result
    }

    fn apply_one(&mut self, delta: &Delta) -> Result<(), SyncError> {
        let envelope = envelope::open(&delta.data, &self.prefix, ItemKind::Delta)?;
        let before = self.doc.get_heads();
        self.doc
            .load_incremental(&envelope.payload)
            .map_err(|e| SyncError::Format(format!("Delta decode error: {}", e)))?;
        // The basis must never run ahead of the live state; lagging only widens the next delta.
        if let Err(e) = self.delta_basis.load_incremental(&envelope.payload) {
            warn!(prefix = %self.prefix, error = %e, "delta basis not advanced");
        }
        let after = self.doc.get_heads();
        if before != after {
            let patches = self.doc.diff(&before, &after);
            for field in patches.iter().filter_map(patch_field) {
                self.emit(ChangeEvent {
                    field,
                    origin: ChangeOrigin::Remote,
                });
            }
        }
        Ok(())
    }

    pub fn apply_delta(&mut self, delta: &Delta) -> Result<(), SyncError> {
        self.apply_deltas(std::slice::from_ref(delta))
    }

    /// Returns the delta holding everything `other` has that `self` lacks.
    pub fn diff(&mut self, other: &mut Document) -> Result<Delta, SyncError> {
        if self.prefix != other.prefix {
            return Err(SyncError::Format(format!(
                "Prefix mismatch: `{}` vs `{}`",
                self.prefix, other.prefix
            )));
        }
        let known: Vec<ChangeHash> = self
            .doc
            .get_heads()
            .into_iter()
            .filter(|h| other.doc.get_change_by_hash(h).is_some())
            .collect();
        let payload = other.doc.save_after(&known);
        let heads = other.doc.get_heads();
        let data = envelope::write(&self.prefix, ItemKind::Delta, "", &heads, &payload)?;
        Ok(Delta { data })
    }

    /// Pulls `other`'s unseen changes into `self`.
    pub fn merge(&mut self, other: &mut Document) -> Result<(), SyncError> {
        let delta = self.diff(other)?;
        self.apply_deltas(&[delta])
    }

    /// Optimistic concurrency check before persisting a delta.
    ///
    /// Fails with [`SyncError::Conflict`] when `stored_heads` (the state already
    /// persisted) contains changes this document's delta basis has not seen. The
    /// caller must reload, merge and retry.
    pub fn ensure_basis_current(&mut self, stored_heads: &[ChangeHash]) -> Result<(), SyncError> {
        let unseen: Vec<&ChangeHash> = stored_heads
            .iter()
            .filter(|h| self.delta_basis.get_change_by_hash(h).is_none())
            .collect();
        if unseen.is_empty() {
            Ok(())
        } else {
            Err(SyncError::Conflict(format!(
                "delta basis is stale: {} stored change(s) not seen",
                unseen.len()
            )))
        }
    }

    // ------------------------------------------------------------------------
    // Cloning
    // ------------------------------------------------------------------------

    /// Deep-copies live state, delta basis and registry. Listeners are not copied.
    pub fn clone_document(&mut self) -> Document {
        Document {
            prefix: self.prefix.clone(),
            doc: self.doc.fork(),
            delta_basis: self.delta_basis.fork(),
            snapshot_id: self.snapshot_id.clone(),
            registry: self.registry.clone(),
            listeners: Listeners::default(),
            summary: ChangeSummary::default(),
        }
    }

    /// Deep-copies this document's state into `out`, keeping `out`'s listeners.
    pub fn clone_into(&mut self, out: &mut Document) {
        out.prefix = self.prefix.clone();
        out.doc = self.doc.fork();
        out.delta_basis = self.delta_basis.fork();
        out.snapshot_id = self.snapshot_id.clone();
        out.registry = self.registry.clone();
    }

    // ------------------------------------------------------------------------
    // Change notification
    // ------------------------------------------------------------------------

    /// Registers a listener for every primitive mutation of every field.
    pub fn on_change<F>(&mut self, callback: F) -> ListenerId
    where
        F: FnMut(&ChangeEvent) + Send + 'static,
    {
        self.listeners.add(None, Box::new(callback))
    }

    /// Registers a listener for primitive mutations of one field.
    pub fn on_field_change<F>(&mut self, field: &str, callback: F) -> ListenerId
    where
        F: FnMut(&ChangeEvent) + Send + 'static,
    {
        self.listeners.add(Some(field.to_string()), Box::new(callback))
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Changes accumulated since the last [`Document::take_changes`].
    pub fn pending_changes(&self) -> &ChangeSummary {
        &self.summary
    }

    /// Drains the coalesced change summary.
    pub fn take_changes(&mut self) -> ChangeSummary {
        std::mem::take(&mut self.summary)
    }

    fn emit(&mut self, event: ChangeEvent) {
        self.summary.record(&event);
        self.listeners.emit(&event);
    }

    // ------------------------------------------------------------------------
    // Field plumbing
    // ------------------------------------------------------------------------

    pub(crate) fn engine(&self) -> &AutoCommit {
        &self.doc
    }

    pub(crate) fn engine_mut(&mut self) -> &mut AutoCommit {
        &mut self.doc
    }

    /// Records one local primitive mutation of `field`.
    pub(crate) fn notify(&mut self, field: &str) {
        self.emit(ChangeEvent {
            field: field.to_string(),
            origin: ChangeOrigin::Local,
        });
    }

    pub(crate) fn check_field(&self, name: &str, field_type: FieldType) -> Result<(), SyncError> {
        self.registry.check(name, field_type)
    }

    /// The primitive backing `name`, if it has been created.
    pub(crate) fn field_obj(&self, name: &str) -> Option<ObjId> {
        match self.doc.get(ROOT, name) {
            Ok(Some((Value::Object(_), id))) => Some(id),
            _ => None,
        }
    }

    /// The primitive backing `name`, creating and registering it on first use.
    pub(crate) fn ensure_field(&mut self, name: &str, field_type: FieldType) -> Result<ObjId, SyncError> {
        self.registry.check(name, field_type)?;
        if let Some(id) = self.field_obj(name) {
            return Ok(id);
        }
        let id = self.doc.put_object(ROOT, name, field_type.obj_type())?;
        self.registry.register(&mut self.doc, name, field_type)?;
        self.notify(name);
        Ok(id)
    }
}

fn patch_field(patch: &Patch) -> Option<String> {
    let field = match patch.path.first() {
        Some((_, Prop::Map(key))) => Some(key.clone()),
        Some(_) => None,
        None => match &patch.action {
            PatchAction::PutMap { key, .. } => Some(key.clone()),
            PatchAction::DeleteMap { key } => Some(key.clone()),
            _ => None,
        },
    };
    field.filter(|f| !f.starts_with(RESERVED_PREFIX))
}

// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Trust validation pipeline.
//!
//! Reconstructs a document from stored snapshots and deltas whose authors are
//! not trusted. Snapshots are tried newest first until one is accepted; that
//! snapshot's deltas are then replayed in id order, each one first applied to
//! a disposable clone and judged by the document's [`Policy`]. Rejected items
//! are skipped for this load and never touch the returned document.
//!
//! Items that already carry an `acceptance` marker were validated by an earlier
//! load and are applied without re-checking.

use crate::document::Document;
use crate::enums::Role;
use crate::envelope::{Delta, ItemKind, Snapshot};
use crate::traits::{SyncDocument, SyncError};
use async_trait::async_trait;
use automerge::{ObjId, ReadDoc, ScalarValue, Value, ROOT};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, warn};

// ============================================================================
// Collaborators
// ============================================================================

/// Who produced a stored item and whether it has been validated before.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    /// Signed identity (key id) of the author.
    pub origin: String,
    /// Set once an item has passed validation.
    pub acceptance: Option<String>,
}

/// A stored snapshot or delta, without its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredItem {
    /// Time-ordered identifier; string order is chronological order.
    pub id: String,
    pub provenance: Provenance,
}

/// Snapshot and delta storage for one document path.
///
/// Deltas are bucketed per snapshot id: each snapshot owns its own lineage.
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn list_snapshots(&self, path: &str) -> Result<Vec<StoredItem>, SyncError>;

    async fn list_deltas(&self, path: &str, snapshot_id: &str) -> Result<Vec<StoredItem>, SyncError>;

    async fn read_snapshot(&self, path: &str, id: &str) -> Result<Vec<u8>, SyncError>;

    async fn read_delta(&self, path: &str, snapshot_id: &str, id: &str) -> Result<Vec<u8>, SyncError>;

    /// Marks an item as validated. For snapshots `snapshot_id == id`.
    async fn record_acceptance(
        &self,
        path: &str,
        kind: ItemKind,
        snapshot_id: &str,
        id: &str,
    ) -> Result<(), SyncError>;
}

/// Maps a signer to its role for a document path.
#[async_trait]
pub trait RoleResolver: Send + Sync {
    async fn resolve_role(&self, origin: &str, path: &str) -> Result<Option<Role>, SyncError>;
}

/// Decodes the trusted timestamp embedded in an item id.
#[async_trait]
pub trait TrustedTime: Send + Sync {
    async fn time_of(&self, item_id: &str) -> Option<u64>;
}

/// Item ids of the form `<millis>` or `<millis>-<suffix>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MillisPrefixTime;

#[async_trait]
impl TrustedTime for MillisPrefixTime {
    async fn time_of(&self, item_id: &str) -> Option<u64> {
        item_id.split('-').next()?.parse().ok()
    }
}

// ============================================================================
// Policy
// ============================================================================

/// A delta under review, with its trusted time already resolved.
#[derive(Debug, Clone, Copy)]
pub struct DeltaCandidate<'a> {
    pub id: &'a str,
    pub delta: &'a Delta,
    pub trusted_time: Option<u64>,
}

/// Acceptance rules for a concrete document type.
#[async_trait]
pub trait Policy: SyncDocument + Send {
    /// Extra inputs the predicates need (folder context, resolvers).
    type Context: Send + Sync;

    /// Whether a snapshot signed by `role` may become the base of a load.
    fn is_snapshot_valid(role: Role, _snapshot: &Snapshot) -> bool {
        role == Role::Creator
    }

    /// Whether `candidate`, signed by `role`, may be applied.
    ///
    /// `clone` is a disposable copy of the live document. Implementations
    /// read policy-relevant state, apply the delta to the clone with
    /// [`apply_for_review`], read the state again and compare.
    async fn is_delta_valid_for_document(
        clone: &mut Self,
        role: Role,
        candidate: DeltaCandidate<'_>,
        context: &Self::Context,
    ) -> bool;
}

/// Applies `delta` to a review clone. `false` when the delta cannot be
/// decoded, which a predicate must treat as a rejection.
pub fn apply_for_review<D: SyncDocument>(clone: &mut D, delta: &Delta) -> bool {
    match clone.document_mut().apply_delta(delta) {
        Ok(()) => true,
        Err(e) => {
            debug!(error = %e, "delta under review does not decode");
            false
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum RootSlot {
    Object(ObjId),
    Scalar(ScalarValue),
}

/// Every root key of a document with the primitive object or scalar it holds.
///
/// Field primitives and `__field:` registry entries both live at the root, so
/// two equal layouts mean no field was replaced by a fresh object, no registry
/// entry was rewritten and no root key was added or removed.
#[derive(Debug, Clone, PartialEq)]
pub struct RootLayout {
    slots: BTreeMap<String, RootSlot>,
}

impl RootLayout {
    pub fn capture(doc: &Document) -> Self {
        let engine = doc.engine();
        let slots = engine
            .keys(ROOT)
            .filter_map(|key| {
                let slot = match engine.get(ROOT, key.as_str()) {
                    Ok(Some((Value::Object(_), id))) => RootSlot::Object(id),
                    Ok(Some((Value::Scalar(scalar), _))) => RootSlot::Scalar(scalar.into_owned()),
                    _ => return None,
                };
                Some((key, slot))
            })
            .collect();
        Self { slots }
    }

    /// Root keys whose slot differs between `self` and `other`.
    pub fn changed_keys(&self, other: &RootLayout) -> Vec<String> {
        let keys: BTreeSet<&String> = self.slots.keys().chain(other.slots.keys()).collect();
        keys.into_iter()
            .filter(|key| self.slots.get(*key) != other.slots.get(*key))
            .cloned()
            .collect()
    }
}

/// [`apply_for_review`] for documents whose fields all exist from genesis.
///
/// Also `false` when the delta touches the root layout: a field primitive
/// replaced by a new object, a registry entry overwritten, or a root key added
/// or removed. Such deltas can pass a comparison of decoded values while
/// detaching concurrent appends or corrupting the field registry.
pub fn apply_preserving_layout<D: SyncDocument>(clone: &mut D, delta: &Delta) -> bool {
    let before = RootLayout::capture(clone.document());
    if !apply_for_review(clone, delta) {
        return false;
    }
    let after = RootLayout::capture(clone.document());
    if before != after {
        debug!(keys = ?before.changed_keys(&after), "delta rewrites the document root");
        return false;
    }
    true
}

/// Entries of `after` that are not in `before`, provided every entry of
/// `before` is still present in `after` in the same relative order.
///
/// `None` when an earlier entry was removed or reordered.
pub fn retained_order<T: PartialEq + Clone>(before: &[T], after: &[T]) -> Option<Vec<T>> {
    let mut pending = before.iter().peekable();
    let mut added = Vec::new();
    for entry in after {
        match pending.peek() {
            Some(next) if *next == entry => {
                pending.next();
            }
            _ => added.push(entry.clone()),
        }
    }
    if pending.peek().is_some() {
        return None;
    }
    Some(added)
}

/// Replay check for an append-only log.
///
/// `None` when the ordering check fails or when nothing new was appended; a
/// delta that appends nothing to a log it is supposed to extend is treated as
/// suspicious and rejected.
pub fn appended_entries<T: PartialEq + Clone>(before: &[T], after: &[T]) -> Option<Vec<T>> {
    retained_order(before, after).filter(|added| !added.is_empty())
}

// ============================================================================
// Pipeline
// ============================================================================

#[derive(Debug, Clone)]
pub struct TrustConfig {
    /// Ask the store to mark newly validated items as accepted.
    pub record_acceptance: bool,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            record_acceptance: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    UnknownRole,
    PolicyRejected,
    Undecodable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnknownRole => write!(f, "unknown role"),
            SkipReason::PolicyRejected => write!(f, "policy rejected"),
            SkipReason::Undecodable => write!(f, "undecodable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    pub kind: ItemKind,
    pub id: String,
    pub reason: SkipReason,
}

/// What a validated load did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// The snapshot the document was built from.
    pub snapshot: String,
    /// Items that passed validation during this load.
    pub accepted: Vec<String>,
    /// Items applied on the strength of an earlier acceptance.
    pub trusted: Vec<String>,
    pub skipped: Vec<SkippedItem>,
}

pub struct TrustPipeline<'a, S, R, T> {
    store: &'a S,
    roles: &'a R,
    time: &'a T,
    config: TrustConfig,
}

impl<'a, S, R, T> TrustPipeline<'a, S, R, T>
where
    S: ItemStore,
    R: RoleResolver,
    T: TrustedTime,
{
    pub fn new(store: &'a S, roles: &'a R, time: &'a T) -> Self {
        Self::with_config(store, roles, time, TrustConfig::default())
    }

    pub fn with_config(store: &'a S, roles: &'a R, time: &'a T, config: TrustConfig) -> Self {
        Self {
            store,
            roles,
            time,
            config,
        }
    }

    /// Builds the document stored at `path` from the items that pass `D`'s policy.
    ///
    /// Fails with [`SyncError::NotFound`] when no snapshot is accepted and with
    /// [`SyncError::Format`] when an already-accepted item does not decode.
    pub async fn load<D: Policy>(&self, path: &str, context: &D::Context) -> Result<(D, LoadReport), SyncError> {
        let mut report = LoadReport::default();

        let mut snapshots = self.store.list_snapshots(path).await?;
        snapshots.sort_by(|a, b| b.id.cmp(&a.id));

        let mut base = None;
        for item in &snapshots {
            if let Some(document) = self.try_snapshot::<D>(path, item, &mut report).await? {
                base = Some((item.id.clone(), document));
                break;
            }
        }
        let Some((snapshot_id, document)) = base else {
            return Err(SyncError::NotFound(format!("no acceptable snapshot for `{}`", path)));
        };
        report.snapshot = snapshot_id.clone();
        let mut live = D::from_document(document);

        let mut deltas = self.store.list_deltas(path, &snapshot_id).await?;
        deltas.sort_by(|a, b| a.id.cmp(&b.id));

        for item in &deltas {
            let delta = Delta {
                data: self.store.read_delta(path, &snapshot_id, &item.id).await?,
            };

            if item.provenance.acceptance.is_some() {
                live.document_mut().apply_delta(&delta)?;
                report.trusted.push(item.id.clone());
                continue;
            }

            let Some(role) = self.roles.resolve_role(&item.provenance.origin, path).await? else {
                self.skip(&mut report, ItemKind::Delta, &item.id, SkipReason::UnknownRole);
                continue;
            };

            let candidate = DeltaCandidate {
                id: &item.id,
                delta: &delta,
                trusted_time: self.time.time_of(&item.id).await,
            };
            let mut clone = live.duplicate();
            if !D::is_delta_valid_for_document(&mut clone, role, candidate, context).await {
                debug!(delta = %item.id, %role, "delta rejected by policy");
                self.skip(&mut report, ItemKind::Delta, &item.id, SkipReason::PolicyRejected);
                continue;
            }

            live.document_mut().apply_delta(&delta)?;
            debug!(delta = %item.id, %role, "delta accepted");
            report.accepted.push(item.id.clone());
            self.accept(path, ItemKind::Delta, &snapshot_id, &item.id).await;
        }

        Ok((live, report))
    }

    async fn try_snapshot<D: Policy>(
        &self,
        path: &str,
        item: &StoredItem,
        report: &mut LoadReport,
    ) -> Result<Option<Document>, SyncError> {
        let snapshot = Snapshot {
            id: item.id.clone(),
            data: self.store.read_snapshot(path, &item.id).await?,
        };

        if item.provenance.acceptance.is_some() {
            let document = Document::from_snapshot(D::PREFIX, &snapshot)?;
            report.trusted.push(item.id.clone());
            return Ok(Some(document));
        }

        let Some(role) = self.roles.resolve_role(&item.provenance.origin, path).await? else {
            self.skip(report, ItemKind::Snapshot, &item.id, SkipReason::UnknownRole);
            return Ok(None);
        };
        if !D::is_snapshot_valid(role, &snapshot) {
            debug!(snapshot = %item.id, %role, "snapshot rejected by policy");
            self.skip(report, ItemKind::Snapshot, &item.id, SkipReason::PolicyRejected);
            return Ok(None);
        }
        let document = match Document::from_snapshot(D::PREFIX, &snapshot) {
            Ok(document) => document,
            Err(e) => {
                warn!(snapshot = %item.id, error = %e, "snapshot does not decode");
                self.skip(report, ItemKind::Snapshot, &item.id, SkipReason::Undecodable);
                return Ok(None);
            }
        };

        debug!(snapshot = %item.id, %role, "snapshot accepted");
        report.accepted.push(item.id.clone());
        self.accept(path, ItemKind::Snapshot, &item.id, &item.id).await;
        Ok(Some(document))
    }

    fn skip(&self, report: &mut LoadReport, kind: ItemKind, id: &str, reason: SkipReason) {
        warn!(?kind, id, %reason, "skipping stored item");
        report.skipped.push(SkippedItem {
            kind,
            id: id.to_string(),
            reason,
        });
    }

    async fn accept(&self, path: &str, kind: ItemKind, snapshot_id: &str, id: &str) {
        if !self.config.record_acceptance {
            return;
        }
        if let Err(e) = self.store.record_acceptance(path, kind, snapshot_id, id).await {
            warn!(?kind, id, error = %e, "failed to record acceptance");
        }
    }
}

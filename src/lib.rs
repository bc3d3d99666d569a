// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! # crdt-guarded-docs
//!
//! Typed, schema-validated documents over conflict-free replicated primitives,
//! plus a trust validation pipeline that rebuilds a document from snapshots
//! and deltas written by replicas that are not trusted.
//!
//! - [`Document`] owns the replicated state and encodes snapshots and deltas
//!   inside a Cap'n Proto envelope.
//! - [`fields`] provides the typed fields (arrays, maps, scalar cells, rich
//!   text and async-codec variants).
//! - [`trust`] walks stored items and applies only those accepted by a
//!   document's [`trust::Policy`].
//! - [`access_control`] and [`store_changes`] are the two policy documents.

pub mod access_control;
pub mod codec;
pub mod document;
pub mod enums;
pub mod envelope;
pub mod events;
pub mod fields;
pub mod registry;
pub mod store_changes;
pub mod traits;
pub mod trust;

mod flatten;

// Re-export core traits
pub use traits::{AsyncCodec, Codec, MapKey, Restricted, SyncDocument, SyncError};

pub use access_control::{
    AccessChange, AccessChangeKind, AccessControlDocument, AccessControlState, InitialAccess, SharedKeySet,
};
pub use codec::{JsonCodec, ValidatedCodec};
pub use document::Document;
pub use enums::{FieldType, PrimitiveKind, Role};
pub use envelope::{Delta, ItemKind, Snapshot};
pub use events::{ChangeEvent, ChangeOrigin, ChangeSummary, ListenerId};
pub use fields::{
    ArrayField, AsyncArrayField, AsyncMapField, AsyncObjectField, Attributes, BooleanField, MapField, NumericField,
    ObjectField, RestrictedTextField, SetField, TextField, TextRun,
};
pub use registry::{FieldRegistry, RESERVED_PREFIX};
pub use store_changes::{
    PathKind, PathResolver, StoreChange, StoreChangesDocument, StoreContext, ACCESS_CONTROL_BUNDLE, STORE_CHANGES_BUNDLE,
};
pub use trust::{
    appended_entries, apply_for_review, apply_preserving_layout, retained_order, DeltaCandidate, ItemStore, LoadReport,
    MillisPrefixTime, Policy, Provenance, RoleResolver, RootLayout, SkipReason, SkippedItem, StoredItem, TrustConfig, TrustPipeline, TrustedTime,
};

// Include generated Cap'n Proto modules
pub mod envelope_capnp {
    include!(concat!(env!("OUT_DIR"), "/proto/envelope_capnp.rs"));
}

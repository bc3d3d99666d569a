// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Access control document.
//!
//! Holds an immutable initial role assignment, an append-only log of timed
//! access changes and an append-only log of shared key sets. The effective
//! roles are the initial assignment with every change folded over it in log
//! order.

use crate::document::Document;
use crate::enums::{FieldType, Role};
use crate::fields::{ArrayField, ObjectField};
use crate::traits::{SyncDocument, SyncError};
use crate::trust::{apply_preserving_layout, retained_order, DeltaCandidate, Policy, RoleResolver};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

const INITIAL: &str = "initial";
const CHANGES: &str = "changes";
const SHARED_KEYS: &str = "shared_keys";

/// Role assignment the document was created with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialAccess {
    pub roles: BTreeMap<String, Role>,
}

impl InitialAccess {
    pub fn creator(key: &str) -> Self {
        Self {
            roles: BTreeMap::from([(key.to_string(), Role::Creator)]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AccessChangeKind {
    AddAccess { key: String, role: Role },
    ModifyAccess { key: String, role: Role },
    RemoveAccess { key: String },
}

/// One signed entry of the access change log. `time` is the trusted time of
/// the delta that introduced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessChange {
    pub time: u64,
    pub change: AccessChangeKind,
}

/// Encryption keys shared with the members at `time`, keyed by member key id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedKeySet {
    pub time: u64,
    pub keys: BTreeMap<String, String>,
}

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessControlState {
    roles: BTreeMap<String, Role>,
}

impl AccessControlState {
    pub fn fold(initial: Option<&InitialAccess>, changes: &[AccessChange]) -> Result<Self, SyncError> {
        let mut state = Self {
            roles: initial.map(|i| i.roles.clone()).unwrap_or_default(),
        };
        for change in changes {
            state.apply(change)?;
        }
        Ok(state)
    }

    pub fn apply(&mut self, change: &AccessChange) -> Result<(), SyncError> {
        match &change.change {
            AccessChangeKind::AddAccess { key, role } | AccessChangeKind::ModifyAccess { key, role } => {
                self.roles.insert(key.clone(), *role);
                Ok(())
            }
            AccessChangeKind::RemoveAccess { .. } => Err(remove_unimplemented()),
        }
    }

    pub fn role_of(&self, key: &str) -> Option<Role> {
        self.roles.get(key).copied()
    }

    pub fn roles(&self) -> &BTreeMap<String, Role> {
        &self.roles
    }
}

#[async_trait]
impl RoleResolver for AccessControlState {
    async fn resolve_role(&self, origin: &str, _path: &str) -> Result<Option<Role>, SyncError> {
        Ok(self.role_of(origin))
    }
}

fn remove_unimplemented() -> SyncError {
    SyncError::Unimplemented("remove-access".to_string())
}

// ============================================================================
// Document
// ============================================================================

#[derive(Debug)]
pub struct AccessControlDocument {
    document: Document,
    initial: ObjectField<InitialAccess>,
    changes: ArrayField<AccessChange>,
    shared_keys: ArrayField<SharedKeySet>,
}

impl SyncDocument for AccessControlDocument {
    const PREFIX: &'static str = "access-control";

    fn from_document(document: Document) -> Self {
        Self {
            document,
            initial: ObjectField::new(INITIAL),
            changes: ArrayField::new(CHANGES),
            shared_keys: ArrayField::new(SHARED_KEYS),
        }
    }

    fn document(&self) -> &Document {
        &self.document
    }

    fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    fn into_document(self) -> Document {
        self.document
    }
}

impl AccessControlDocument {
    /// Genesis state: every field exists and `creator_key` holds the creator role.
    pub fn create(creator_key: &str) -> Result<Self, SyncError> {
        let mut acl = Self::empty();
        acl.document.ensure_field(CHANGES, FieldType::Array)?;
        acl.document.ensure_field(SHARED_KEYS, FieldType::Array)?;
        acl.set_initial(&InitialAccess::creator(creator_key))?;
        Ok(acl)
    }

    pub fn initial(&self) -> Result<Option<InitialAccess>, SyncError> {
        self.initial.get(&self.document)
    }

    /// Sets the initial assignment. It can be written once.
    pub fn set_initial(&mut self, initial: &InitialAccess) -> Result<(), SyncError> {
        if self.initial.is_set(&self.document) {
            return Err(SyncError::Schema("initial access is immutable".to_string()));
        }
        self.initial.set(&mut self.document, initial)
    }

    pub fn changes(&self) -> Result<Vec<AccessChange>, SyncError> {
        self.changes.values(&self.document)
    }

    pub fn add_access(&mut self, key: &str, role: Role, time: u64) -> Result<(), SyncError> {
        self.push_change(AccessChange {
            time,
            change: AccessChangeKind::AddAccess {
                key: key.to_string(),
                role,
            },
        })
    }

    pub fn modify_access(&mut self, key: &str, role: Role, time: u64) -> Result<(), SyncError> {
        self.push_change(AccessChange {
            time,
            change: AccessChangeKind::ModifyAccess {
                key: key.to_string(),
                role,
            },
        })
    }

    pub fn remove_access(&mut self, _key: &str, _time: u64) -> Result<(), SyncError> {
        Err(remove_unimplemented())
    }

    fn push_change(&mut self, change: AccessChange) -> Result<(), SyncError> {
        self.changes.push(&mut self.document, std::slice::from_ref(&change))
    }

    pub fn shared_key_sets(&self) -> Result<Vec<SharedKeySet>, SyncError> {
        self.shared_keys.values(&self.document)
    }

    pub fn add_shared_keys(&mut self, set: &SharedKeySet) -> Result<(), SyncError> {
        self.shared_keys.push(&mut self.document, std::slice::from_ref(set))
    }

    pub fn state(&self) -> Result<AccessControlState, SyncError> {
        AccessControlState::fold(self.initial()?.as_ref(), &self.changes()?)
    }

    pub fn role_of(&self, key: &str) -> Result<Option<Role>, SyncError> {
        Ok(self.state()?.role_of(key))
    }

    fn review_view(&self) -> Option<ReviewView> {
        Some(ReviewView {
            initial: self.initial.elements(&self.document).ok()?,
            changes: self.changes().ok()?,
            shared_keys: self.shared_key_sets().ok()?,
        })
    }
}

struct ReviewView {
    initial: Vec<InitialAccess>,
    changes: Vec<AccessChange>,
    shared_keys: Vec<SharedKeySet>,
}

/// Roles that `actor` may grant, or take away from, another key.
fn may_target(actor: Role, target: Role) -> bool {
    match actor {
        Role::Creator => true,
        Role::Owner => matches!(target, Role::Owner | Role::Admin | Role::Editor | Role::Viewer),
        Role::Admin => matches!(target, Role::Editor | Role::Viewer),
        Role::Editor | Role::Viewer | Role::Appender => false,
    }
}

/// Checks each new change against the state it lands on.
fn changes_permitted(
    role: Role,
    state: &mut AccessControlState,
    added: &[AccessChange],
    trusted_time: u64,
) -> bool {
    for change in added {
        if change.time != trusted_time {
            debug!(time = change.time, trusted_time, "access change time mismatch");
            return false;
        }
        let permitted = match &change.change {
            AccessChangeKind::AddAccess { key, role: granted }
            | AccessChangeKind::ModifyAccess { key, role: granted } => {
                let current_ok = state.role_of(key).map_or(true, |current| may_target(role, current));
                current_ok && may_target(role, *granted)
            }
            AccessChangeKind::RemoveAccess { .. } => false,
        };
        if !permitted || state.apply(change).is_err() {
            return false;
        }
    }
    true
}

#[async_trait]
impl Policy for AccessControlDocument {
    type Context = ();

    async fn is_delta_valid_for_document(
        clone: &mut Self,
        role: Role,
        candidate: DeltaCandidate<'_>,
        _context: &(),
    ) -> bool {
        match role {
            Role::Creator => return true,
            Role::Editor | Role::Viewer | Role::Appender => return false,
            Role::Owner | Role::Admin => {}
        }

        let Some(before) = clone.review_view() else {
            return false;
        };
        if !apply_preserving_layout(clone, candidate.delta) {
            return false;
        }
        let Some(after) = clone.review_view() else {
            return false;
        };

        if before.initial != after.initial {
            debug!(delta = candidate.id, "initial access modified");
            return false;
        }
        let (Some(new_changes), Some(new_keys)) = (
            retained_order(&before.changes, &after.changes),
            retained_order(&before.shared_keys, &after.shared_keys),
        ) else {
            debug!(delta = candidate.id, "append-only log rewritten");
            return false;
        };
        if new_changes.is_empty() && new_keys.is_empty() {
            debug!(delta = candidate.id, "delta appends nothing");
            return false;
        }
        let Some(trusted_time) = candidate.trusted_time else {
            return false;
        };
        let Ok(mut state) = AccessControlState::fold(before.initial.last(), &before.changes) else {
            return false;
        };
        if !changes_permitted(role, &mut state, &new_changes, trusted_time) {
            return false;
        }
        new_keys.iter().all(|set| set.time == trusted_time)
    }
}

// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Store changes document: an append-only log of structural changes to the
//! files of one folder.

use crate::document::Document;
use crate::enums::{FieldType, Role};
use crate::fields::ArrayField;
use crate::traits::{SyncDocument, SyncError};
use crate::trust::{appended_entries, apply_preserving_layout, DeltaCandidate, Policy};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const LOG: &str = "changes";

/// Bundle holding a folder's access control document.
pub const ACCESS_CONTROL_BUNDLE: &str = ".access-control";
/// Bundle holding a folder's store changes document.
pub const STORE_CHANGES_BUNDLE: &str = ".store-changes";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StoreChange {
    Delete { time: u64, paths: Vec<String> },
}

impl StoreChange {
    pub fn time(&self) -> u64 {
        match self {
            StoreChange::Delete { time, .. } => *time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    File,
    Folder,
}

/// Answers what a storage path currently is.
#[async_trait]
pub trait PathResolver: Send + Sync {
    async fn kind_of(&self, path: &str) -> Option<PathKind>;
}

/// The folder a store changes document belongs to.
#[derive(Clone)]
pub struct StoreContext {
    pub folder: String,
    pub paths: Arc<dyn PathResolver>,
}

impl StoreContext {
    pub fn new(folder: &str, paths: Arc<dyn PathResolver>) -> Self {
        Self {
            folder: folder.trim_end_matches('/').to_string(),
            paths,
        }
    }

    fn join(&self, name: &str) -> String {
        if self.folder.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.folder, name)
        }
    }

    /// The bundles of the folder itself, which can never be deleted.
    pub fn is_protected(&self, path: &str) -> bool {
        path == self.join(ACCESS_CONTROL_BUNDLE) || path == self.join(STORE_CHANGES_BUNDLE)
    }

    /// True when `path` sits directly inside the folder.
    pub fn owns(&self, path: &str) -> bool {
        match path.rsplit_once('/') {
            Some((parent, name)) => parent == self.folder && !name.is_empty(),
            None => self.folder.is_empty() && !path.is_empty(),
        }
    }
}

#[derive(Debug)]
pub struct StoreChangesDocument {
    document: Document,
    log: ArrayField<StoreChange>,
}

impl SyncDocument for StoreChangesDocument {
    const PREFIX: &'static str = "store-changes";

    fn from_document(document: Document) -> Self {
        Self {
            document,
            log: ArrayField::new(LOG),
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

impl StoreChangesDocument {
    /// Genesis state with an empty log.
    pub fn create() -> Result<Self, SyncError> {
        let mut doc = Self::empty();
        doc.document.ensure_field(LOG, FieldType::Array)?;
        Ok(doc)
    }

    pub fn changes(&self) -> Result<Vec<StoreChange>, SyncError> {
        self.log.values(&self.document)
    }

    pub fn delete_paths(&mut self, paths: &[String], time: u64) -> Result<(), SyncError> {
        let change = StoreChange::Delete {
            time,
            paths: paths.to_vec(),
        };
        self.log.push(&mut self.document, std::slice::from_ref(&change))
    }

    pub fn is_deleted_path(&self, path: &str) -> Result<bool, SyncError> {
        Ok(self.changes()?.iter().any(|change| match change {
            StoreChange::Delete { paths, .. } => paths.iter().any(|p| p == path),
        }))
    }
}

async fn deletion_permitted(context: &StoreContext, path: &str) -> bool {
    if !context.owns(path) || context.is_protected(path) {
        return false;
    }
    context.paths.kind_of(path).await == Some(PathKind::File)
}

#[async_trait]
impl Policy for StoreChangesDocument {
    type Context = StoreContext;

    async fn is_delta_valid_for_document(
        clone: &mut Self,
        role: Role,
        candidate: DeltaCandidate<'_>,
        context: &StoreContext,
    ) -> bool {
        match role {
            Role::Creator => return true,
            Role::Editor | Role::Viewer | Role::Appender => return false,
            Role::Owner | Role::Admin => {}
        }

        let Ok(before) = clone.changes() else {
            return false;
        };
        if !apply_preserving_layout(clone, candidate.delta) {
            return false;
        }
        let Ok(after) = clone.changes() else {
            return false;
        };
        let Some(added) = appended_entries(&before, &after) else {
            debug!(delta = candidate.id, "store change log not extended");
            return false;
        };
        let Some(trusted_time) = candidate.trusted_time else {
            return false;
        };

        for change in &added {
            if change.time() != trusted_time {
                debug!(delta = candidate.id, time = change.time(), trusted_time, "store change time mismatch");
                return false;
            }
            match change {
                StoreChange::Delete { paths, .. } => {
                    for path in paths {
                        if !deletion_permitted(context, path).await {
                            debug!(delta = candidate.id, path = %path, "deletion outside scope");
                            return false;
                        }
                    }
                }
            }
        }
        true
    }
}

// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use crdt_guarded_docs::*;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

struct Tree(BTreeMap<&'static str, PathKind>);

#[async_trait]
impl PathResolver for Tree {
    async fn kind_of(&self, path: &str) -> Option<PathKind> {
        self.0.get(path).copied()
    }
}

fn context() -> StoreContext {
    let tree = Tree(BTreeMap::from([
        ("team/a.txt", PathKind::File),
        ("team/b.txt", PathKind::File),
        ("team/sub", PathKind::Folder),
        ("team/.access-control", PathKind::File),
        ("other/c.txt", PathKind::File),
    ]));
    StoreContext::new("team", Arc::new(tree))
}

fn genesis() -> Snapshot {
    let mut doc = StoreChangesDocument::create().unwrap();
    doc.document_mut().encode_snapshot("0001").unwrap()
}

fn deletion(base: &Snapshot, paths: &[&str], time: u64) -> Delta {
    let mut doc = StoreChangesDocument::from_snapshot(base).unwrap();
    let paths: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
    doc.delete_paths(&paths, time).unwrap();
    doc.document_mut().encode_delta().unwrap()
}

async fn judge(base: &Snapshot, role: Role, delta: &Delta, trusted_time: Option<u64>) -> bool {
    let mut clone = StoreChangesDocument::from_snapshot(base).unwrap();
    let candidate = DeltaCandidate {
        id: "delta",
        delta,
        trusted_time,
    };
    StoreChangesDocument::is_delta_valid_for_document(&mut clone, role, candidate, &context()).await
}

#[tokio::test]
async fn test_owner_deletes_files_in_folder() {
    let base = genesis();
    let delta = deletion(&base, &["team/a.txt", "team/b.txt"], 100);
    assert!(judge(&base, Role::Owner, &delta, Some(100)).await);
    assert!(judge(&base, Role::Admin, &delta, Some(100)).await);
}

#[tokio::test]
async fn test_out_of_scope_deletions_are_rejected() {
    let base = genesis();
    for path in ["team/sub", "team/.access-control", "other/c.txt", "team/sub/d.txt", "team/missing.txt"] {
        let delta = deletion(&base, &["team/a.txt", path], 100);
        assert!(!judge(&base, Role::Owner, &delta, Some(100)).await, "{}", path);
    }
}

#[tokio::test]
async fn test_non_admin_roles_are_rejected() {
    let base = genesis();
    let delta = deletion(&base, &["team/a.txt"], 100);
    for role in [Role::Editor, Role::Viewer, Role::Appender] {
        assert!(!judge(&base, role, &delta, Some(100)).await, "{}", role);
    }
    assert!(judge(&base, Role::Creator, &delta, None).await);
}

#[tokio::test]
async fn test_time_and_log_shape() {
    let base = genesis();
    let delta = deletion(&base, &["team/a.txt"], 100);
    assert!(!judge(&base, Role::Owner, &delta, Some(101)).await);
    assert!(!judge(&base, Role::Owner, &delta, None).await);

    let mut doc = StoreChangesDocument::from_snapshot(&base).unwrap();
    let empty = doc.document_mut().encode_delta().unwrap();
    assert!(!judge(&base, Role::Owner, &empty, Some(100)).await);
}

#[test]
fn test_store_change_json_shape() {
    let change = StoreChange::Delete {
        time: 3,
        paths: vec!["team/a.txt".into()],
    };
    assert_eq!(
        serde_json::to_value(&change).unwrap(),
        serde_json::json!({"type": "delete", "time": 3, "paths": ["team/a.txt"]})
    );
}

// ============================================================================
// Through the pipeline, with roles taken from the folder's access document
// ============================================================================

#[derive(Default)]
struct Items {
    snapshot: Mutex<Option<(String, Vec<u8>)>>,
    deltas: Mutex<Vec<(StoredItem, Vec<u8>)>>,
}

#[async_trait]
impl ItemStore for Items {
    async fn list_snapshots(&self, _path: &str) -> Result<Vec<StoredItem>, SyncError> {
        Ok(self
            .snapshot
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| StoredItem {
                id: id.clone(),
                provenance: Provenance {
                    origin: "c".into(),
                    acceptance: None,
                },
            })
            .collect())
    }

    async fn list_deltas(&self, _path: &str, _snapshot_id: &str) -> Result<Vec<StoredItem>, SyncError> {
        Ok(self.deltas.lock().unwrap().iter().map(|(i, _)| i.clone()).collect())
    }

    async fn read_snapshot(&self, _path: &str, _id: &str) -> Result<Vec<u8>, SyncError> {
        self.snapshot
            .lock()
            .unwrap()
            .as_ref()
            .map(|(_, data)| data.clone())
            .ok_or_else(|| SyncError::NotFound("snapshot".into()))
    }

    async fn read_delta(&self, _path: &str, _snapshot_id: &str, id: &str) -> Result<Vec<u8>, SyncError> {
        self.deltas
            .lock()
            .unwrap()
            .iter()
            .find(|(i, _)| i.id == id)
            .map(|(_, data)| data.clone())
            .ok_or_else(|| SyncError::NotFound(id.into()))
    }

    async fn record_acceptance(
        &self,
        _path: &str,
        _kind: ItemKind,
        _snapshot_id: &str,
        _id: &str,
    ) -> Result<(), SyncError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_pipeline_applies_permitted_deletions() {
    let mut acl = AccessControlDocument::create("c").unwrap();
    acl.add_access("o", Role::Owner, 1).unwrap();
    acl.add_access("v", Role::Viewer, 1).unwrap();
    let roles = acl.state().unwrap();

    let base = genesis();
    let items = Items::default();
    *items.snapshot.lock().unwrap() = Some(("0001".into(), base.data.clone()));
    for (id, origin, paths, time) in [
        ("100-o", "o", vec!["team/a.txt"], 100),
        ("200-v", "v", vec!["team/b.txt"], 200),
        ("300-o", "o", vec!["team/sub"], 300),
    ] {
        let item = StoredItem {
            id: id.into(),
            provenance: Provenance {
                origin: origin.into(),
                acceptance: None,
            },
        };
        items.deltas.lock().unwrap().push((item, deletion(&base, &paths, time).data));
    }

    let time = MillisPrefixTime;
    let pipeline = TrustPipeline::new(&items, &roles, &time);
    let path = format!("team/{}", STORE_CHANGES_BUNDLE);
    let (doc, report) = pipeline
        .load::<StoreChangesDocument>(&path, &context())
        .await
        .unwrap();

    assert_eq!(report.accepted, vec!["0001", "100-o"]);
    assert!(doc.is_deleted_path("team/a.txt").unwrap());
    assert!(!doc.is_deleted_path("team/b.txt").unwrap());
    assert!(!doc.is_deleted_path("team/sub").unwrap());
}

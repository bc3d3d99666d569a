// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use crdt_guarded_docs::*;

/// Two replicas sharing a genesis snapshot with an `items` array.
fn replicas() -> (Document, Document) {
    let mut a = Document::new("notes");
    a.array::<String>("items").unwrap().push(&mut a, &["base".into()]).unwrap();
    let snapshot = a.encode_snapshot("0001").unwrap();
    let b = Document::from_snapshot("notes", &snapshot).unwrap();
    (a, b)
}

fn items(doc: &Document) -> Vec<String> {
    doc.array::<String>("items").unwrap().values(doc).unwrap()
}

#[test]
fn test_delta_round_trip() {
    let (mut a, mut b) = replicas();
    a.array::<String>("items").unwrap().push(&mut a, &["one".into()]).unwrap();
    assert!(a.has_unencoded_changes());
    let delta = a.encode_delta().unwrap();
    assert!(!a.has_unencoded_changes());

    b.apply_deltas(&[delta.clone(), delta]).unwrap();
    assert_eq!(items(&b), vec!["base".to_string(), "one".to_string()]);
}

#[test]
fn test_peek_delta_does_not_advance_basis() {
    let (mut a, _) = replicas();
    a.numeric("n").unwrap().set(&mut a, 1.0).unwrap();
    let peeked = a.peek_delta().unwrap();
    assert!(a.has_unencoded_changes());
    let encoded = a.encode_delta().unwrap();
    assert_eq!(peeked.heads().unwrap(), encoded.heads().unwrap());
}

#[test]
fn test_deltas_carry_only_new_changes() {
    let (mut a, mut b) = replicas();
    a.text("body").unwrap().insert(&mut a, 0, "first", None).unwrap();
    let first = a.encode_delta().unwrap();
    a.text("body").unwrap().insert(&mut a, 5, " second", None).unwrap();
    let second = a.encode_delta().unwrap();

    b.apply_delta(&first).unwrap();
    b.apply_delta(&second).unwrap();
    assert_eq!(b.text("body").unwrap().to_string(&b), "first second");
}

#[test]
fn test_delta_prefix_must_match() {
    let (mut a, _) = replicas();
    a.numeric("n").unwrap().set(&mut a, 1.0).unwrap();
    let delta = a.encode_delta().unwrap();
    let mut other = Document::new("access-control");
    assert!(matches!(other.apply_delta(&delta), Err(SyncError::Format(_))));
    assert!(matches!(
        other.apply_delta(&Delta { data: vec![0, 1, 2] }),
        Err(SyncError::Format(_))
    ));
}

#[test]
fn test_merge_is_symmetric() {
    let (mut a, mut b) = replicas();
    a.array::<String>("items").unwrap().push(&mut a, &["from-a".into()]).unwrap();
    b.array::<String>("items").unwrap().push(&mut b, &["from-b".into()]).unwrap();
    b.set("tags").unwrap().add(&mut b, "b").unwrap();

    a.merge(&mut b).unwrap();
    b.merge(&mut a).unwrap();

    assert_eq!(items(&a), items(&b));
    assert_eq!(items(&a).len(), 3);
    assert!(a.set("tags").unwrap().has(&a, "b"));
    assert_eq!(a.fields(), b.fields());
    assert_eq!(a.heads(), b.heads());
}

#[test]
fn test_diff_is_empty_when_up_to_date() {
    let (mut a, mut b) = replicas();
    a.take_changes();
    let delta = a.diff(&mut b).unwrap();
    let before = a.heads();
    a.apply_delta(&delta).unwrap();
    assert_eq!(a.heads(), before);
    assert!(a.take_changes().is_empty());
}

#[test]
fn test_failed_batch_keeps_earlier_deltas_registered() {
    let (mut a, mut b) = replicas();
    a.set("tags").unwrap().add(&mut a, "x").unwrap();
    let good = a.encode_delta().unwrap();
    let garbage = Delta { data: vec![1, 2, 3] };

    let result = b.apply_deltas(&[good, garbage]);
    assert!(matches!(result, Err(SyncError::Format(_))));
    assert!(b.fields().contains(&("tags".to_string(), FieldType::Set)));
    assert!(b.set("tags").unwrap().has(&b, "x"));
    assert!(!b.has_unencoded_changes());
}

#[test]
fn test_stale_basis_is_a_conflict() {
    let (mut a, mut b) = replicas();
    a.array::<String>("items").unwrap().push(&mut a, &["a".into()]).unwrap();
    let stored = a.encode_delta().unwrap();
    let stored_heads = stored.heads().unwrap();

    b.array::<String>("items").unwrap().push(&mut b, &["b".into()]).unwrap();
    assert!(matches!(
        b.ensure_basis_current(&stored_heads),
        Err(SyncError::Conflict(_))
    ));

    b.apply_delta(&stored).unwrap();
    b.ensure_basis_current(&stored_heads).unwrap();
    let mine = b.encode_delta().unwrap();
    a.apply_delta(&mine).unwrap();
    assert_eq!(items(&a), items(&b));
}

#[test]
fn test_flattened_snapshot_keeps_content() {
    let mut doc = Document::new("notes");
    let body = doc.text("body").unwrap();
    body.insert(&mut doc, 0, "hello brave world", None).unwrap();
    body.delete(&mut doc, 5, 11).unwrap();
    doc.array::<u32>("nums").unwrap().push(&mut doc, &[1, 2, 3]).unwrap();
    doc.array::<u32>("nums").unwrap().delete(&mut doc, 0, None).unwrap();

    let flat = doc.peek_flattened_snapshot("0002").unwrap();
    assert_eq!(doc.snapshot_id(), None);

    let restored = Document::from_snapshot("notes", &flat).unwrap();
    assert_eq!(restored.text("body").unwrap().to_string(&restored), "hello world");
    assert_eq!(restored.array::<u32>("nums").unwrap().values(&restored).unwrap(), vec![2, 3]);
    assert_eq!(restored.fields(), doc.fields());
}

#[test]
fn test_original_history_delta_does_not_apply_on_flattened_copy() {
    let mut doc = Document::new("notes");
    doc.text("body").unwrap().insert(&mut doc, 0, "hello", None).unwrap();
    doc.encode_delta().unwrap();

    let flat = doc.peek_flattened_snapshot("0002").unwrap();
    let mut restored = Document::from_snapshot("notes", &flat).unwrap();

    doc.text("body").unwrap().insert(&mut doc, 5, " world", None).unwrap();
    let late = doc.encode_delta().unwrap();
    restored.apply_delta(&late).unwrap();
    assert_eq!(restored.text("body").unwrap().to_string(&restored), "hello");
}

#[test]
fn test_encode_flattened_snapshot_continues_from_flat_history() {
    let mut doc = Document::new("notes");
    doc.text("body").unwrap().insert(&mut doc, 0, "hello", None).unwrap();
    let flat = doc.encode_flattened_snapshot("0002").unwrap();
    assert_eq!(doc.snapshot_id(), Some("0002"));

    let mut restored = Document::from_snapshot("notes", &flat).unwrap();
    doc.text("body").unwrap().insert(&mut doc, 5, " world", None).unwrap();
    restored.apply_delta(&doc.encode_delta().unwrap()).unwrap();
    assert_eq!(restored.text("body").unwrap().to_string(&restored), "hello world");
}

#[test]
fn test_clone_is_independent() {
    let (mut a, _) = replicas();
    let mut copy = a.clone_document();
    copy.array::<String>("items").unwrap().push(&mut copy, &["copy".into()]).unwrap();
    assert_eq!(items(&a), vec!["base".to_string()]);
    assert_eq!(copy.snapshot_id(), Some("0001"));

    let mut target = Document::new("notes");
    copy.clone_into(&mut target);
    assert_eq!(items(&target), items(&copy));
}

#[test]
fn test_concrete_document_duplicate() {
    let mut acl = AccessControlDocument::create("creator").unwrap();
    let mut copy = acl.duplicate();
    copy.add_access("k", Role::Viewer, 10).unwrap();
    assert_eq!(acl.role_of("k").unwrap(), None);
    assert_eq!(copy.role_of("k").unwrap(), Some(Role::Viewer));
}

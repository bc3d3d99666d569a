// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use crdt_guarded_docs::*;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Change notification accounting
// ============================================================================

#[test]
fn test_create_and_first_set_fire_two_events() {
    let mut doc = Document::new("notes");
    let weight = doc.numeric("weight").unwrap();
    weight.set(&mut doc, 1.0).unwrap();
    assert_eq!(doc.take_changes().events, 2);

    weight.set(&mut doc, 2.0).unwrap();
    let summary = doc.take_changes();
    assert_eq!(summary.events, 2);
    assert_eq!(summary.remote_events, 0);
    assert!(summary.fields.contains("weight"));
    assert!(doc.take_changes().is_empty());
}

#[test]
fn test_every_scalar_reset_fires_two_events() {
    let mut doc = Document::new("notes");
    let flag = doc.boolean("flag").unwrap();
    flag.set(&mut doc, true).unwrap();
    doc.take_changes();
    // true -> true still rewrites the cell
    flag.set(&mut doc, true).unwrap();
    assert_eq!(doc.take_changes().events, 2);

    let role = doc.restricted_text::<Role>("role").unwrap();
    role.set(&mut doc, Role::Viewer).unwrap();
    assert_eq!(doc.take_changes().events, 2);
    role.set(&mut doc, Role::Editor).unwrap();
    assert_eq!(doc.take_changes().events, 2);
    assert_eq!(role.get(&doc), Some(Role::Editor));
}

#[test]
fn test_empty_scalar_writes_fire_two_events() {
    let mut doc = Document::new("notes");
    let flag = doc.boolean("flag").unwrap();
    flag.set(&mut doc, false).unwrap();
    assert_eq!(doc.take_changes().events, 2);
    assert!(!flag.get(&doc));

    // the cell is empty, there is nothing to remove
    flag.set(&mut doc, false).unwrap();
    assert_eq!(doc.take_changes().events, 2);
    flag.set(&mut doc, true).unwrap();
    assert_eq!(doc.take_changes().events, 2);
    assert!(flag.get(&doc));

    let weight = doc.numeric("weight").unwrap();
    weight.clear(&mut doc).unwrap();
    assert_eq!(doc.take_changes().events, 2);
    assert_eq!(weight.get(&doc), None);
}

#[test]
fn test_field_and_document_listeners() {
    let mut doc = Document::new("notes");
    let order = Arc::new(Mutex::new(Vec::new()));
    let all = Arc::new(AtomicUsize::new(0));

    let seen = order.clone();
    doc.on_field_change("tags", move |e| seen.lock().unwrap().push(format!("field:{}", e.field)));
    let seen = order.clone();
    let counter = all.clone();
    let id = doc.on_change(move |e| {
        counter.fetch_add(1, Ordering::SeqCst);
        seen.lock().unwrap().push(format!("doc:{}", e.field));
    });

    doc.set("tags").unwrap().add(&mut doc, "x").unwrap();
    doc.numeric("n").unwrap().set(&mut doc, 3.0).unwrap();
    assert_eq!(all.load(Ordering::SeqCst), 4);
    assert_eq!(
        order.lock().unwrap()[..2],
        ["field:tags".to_string(), "doc:tags".to_string()]
    );

    assert!(doc.remove_listener(id));
    doc.set("tags").unwrap().add(&mut doc, "y").unwrap();
    assert_eq!(all.load(Ordering::SeqCst), 4);
}

#[test]
fn test_remote_changes_are_reported_per_field() {
    let mut a = Document::new("notes");
    let base = a.encode_snapshot("0001").unwrap();
    let mut b = Document::from_snapshot("notes", &base).unwrap();

    a.array::<u32>("items").unwrap().push(&mut a, &[1, 2]).unwrap();
    let delta = a.encode_delta().unwrap();

    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    b.on_field_change("items", move |e| {
        assert_eq!(e.origin, ChangeOrigin::Remote);
        counter.fetch_add(1, Ordering::SeqCst);
    });
    b.apply_delta(&delta).unwrap();

    assert!(hits.load(Ordering::SeqCst) > 0);
    let summary = b.take_changes();
    assert_eq!(summary.events, summary.remote_events);
    assert_eq!(summary.fields.iter().collect::<Vec<_>>(), vec!["items"]);
}

// ============================================================================
// Registry
// ============================================================================

#[test]
fn test_type_mismatch_fails_fast() {
    let mut doc = Document::new("notes");
    doc.array::<String>("things").unwrap().push(&mut doc, &["a".into()]).unwrap();
    assert!(matches!(doc.map::<String, String>("things"), Err(SyncError::FieldTypeMismatch { .. })));
    assert!(matches!(doc.text("__meta"), Err(SyncError::ReservedFieldName(_))));
}

#[test]
fn test_unwritten_fields_read_as_empty() {
    let doc = Document::new("notes");
    assert!(doc.array::<u8>("a").unwrap().values(&doc).unwrap().is_empty());
    assert!(doc.map::<String, u8>("m").unwrap().entries(&doc).unwrap().is_empty());
    assert_eq!(doc.object::<u8>("o").unwrap().get(&doc).unwrap(), None);
    assert!(!doc.boolean("b").unwrap().get(&doc));
    assert_eq!(doc.numeric("n").unwrap().get(&doc), None);
    assert_eq!(doc.text("t").unwrap().to_string(&doc), "");
    assert!(doc.registry().is_empty());
}

// ============================================================================
// Array contracts
// ============================================================================

#[test]
fn test_array_ranges() {
    let mut doc = Document::new("notes");
    let items = doc.array::<u32>("items").unwrap();
    items.push(&mut doc, &[1, 2, 3, 4, 5]).unwrap();

    assert_eq!(items.slice(&doc, 1, Some(3)).unwrap(), vec![2, 3]);
    assert_eq!(items.slice(&doc, 3, None).unwrap(), vec![4, 5]);
    assert!(matches!(items.slice(&doc, 3, Some(1)), Err(SyncError::InvalidRange { .. })));

    items.delete(&mut doc, 0, None).unwrap();
    assert_eq!(items.values(&doc).unwrap(), vec![2, 3, 4, 5]);
    items.delete(&mut doc, 1, Some(3)).unwrap();
    assert_eq!(items.values(&doc).unwrap(), vec![2, 5]);
    assert!(matches!(items.delete(&mut doc, 2, Some(1)), Err(SyncError::InvalidRange { .. })));

    items.insert(&mut doc, 1, &[7, 8]).unwrap();
    assert_eq!(items.values(&doc).unwrap(), vec![2, 7, 8, 5]);
    items.splice(&mut doc, 1, Some(3), &[9]).unwrap();
    assert_eq!(items.values(&doc).unwrap(), vec![2, 9, 5]);

    items.clear(&mut doc).unwrap();
    assert!(items.is_empty(&doc));
}

#[test]
fn test_single_element_delete_at_the_last_index() {
    let mut doc = Document::new("notes");
    let items = doc.array::<u32>("items").unwrap();
    items.push(&mut doc, &[1, 2]).unwrap();
    doc.take_changes();

    items.delete(&mut doc, usize::MAX, None).unwrap();
    assert_eq!(items.values(&doc).unwrap(), vec![1, 2]);
    assert!(doc.take_changes().is_empty());

    items.splice(&mut doc, usize::MAX, None, &[3]).unwrap();
    assert_eq!(items.values(&doc).unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_async_single_element_delete_at_the_last_index() {
    let mut doc = Document::new("notes");
    let log = doc.async_array::<String, _>("log", JsonCodec::new()).unwrap();
    log.push(&mut doc, &["a".to_string()]).await.unwrap();

    log.delete(&mut doc, usize::MAX, None).unwrap();
    log.splice(&mut doc, usize::MAX, None, &["b".to_string()]).await.unwrap();
    assert_eq!(log.values(&doc).await.unwrap(), vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_empty_insert_is_a_no_op() {
    let mut doc = Document::new("notes");
    let items = doc.array::<u32>("items").unwrap();
    items.push(&mut doc, &[]).unwrap();
    assert!(doc.take_changes().is_empty());
    assert!(doc.registry().is_empty());
}

#[test]
fn test_validated_codec_rejects_bad_values() {
    let mut doc = Document::new("notes");
    let codec = ValidatedCodec::<String, _>::new(|v| match v.as_str() {
        Some(s) if !s.is_empty() => Ok(()),
        _ => Err("empty".to_string()),
    });
    let names = doc.array_with::<String, _>("names", codec).unwrap();
    assert!(matches!(names.push(&mut doc, &[String::new()]), Err(SyncError::Schema(_))));
    assert_eq!(names.len(&doc), 0);
    names.push(&mut doc, &["ann".to_string()]).unwrap();
    assert_eq!(names.values(&doc).unwrap(), vec!["ann".to_string()]);
}

// ============================================================================
// Map, set, object
// ============================================================================

#[test]
fn test_map_delete_and_clear() {
    let mut doc = Document::new("notes");
    let m = doc.map::<String, bool>("m").unwrap();
    m.set(&mut doc, &"a".into(), &true).unwrap();
    m.set(&mut doc, &"b".into(), &false).unwrap();
    assert!(m.delete(&mut doc, &"a".into()).unwrap());
    assert!(!m.delete(&mut doc, &"a".into()).unwrap());
    assert_eq!(m.values(&doc).unwrap(), vec![false]);
    m.clear(&mut doc).unwrap();
    assert!(m.is_empty(&doc));
}

#[test]
fn test_set_delete() {
    let mut doc = Document::new("notes");
    let tags = doc.set("tags").unwrap();
    tags.add(&mut doc, "a").unwrap();
    assert!(tags.delete(&mut doc, "a").unwrap());
    assert!(!tags.has(&doc, "a"));
}

#[test]
fn test_object_set_replaces_and_clears() {
    let mut doc = Document::new("notes");
    let cell = doc.object::<String>("cell").unwrap();
    cell.set(&mut doc, &"one".to_string()).unwrap();
    cell.set(&mut doc, &"two".to_string()).unwrap();
    assert_eq!(cell.get(&doc).unwrap(), Some("two".to_string()));
    cell.clear(&mut doc).unwrap();
    assert!(!cell.is_set(&doc));
}

#[test]
fn test_numeric_rejects_non_finite() {
    let mut doc = Document::new("notes");
    let n = doc.numeric("n").unwrap();
    assert!(matches!(n.set(&mut doc, f64::NAN), Err(SyncError::Schema(_))));
    n.set(&mut doc, -0.25).unwrap();
    assert_eq!(n.get(&doc), Some(-0.25));
    n.clear(&mut doc).unwrap();
    assert_eq!(n.get(&doc), None);
}

// ============================================================================
// Text
// ============================================================================

#[test]
fn test_text_replace() {
    let mut doc = Document::new("notes");
    let body = doc.text("body").unwrap();
    body.insert(&mut doc, 0, "hello world", None).unwrap();

    body.replace(&mut doc, 0, 5, Some("howdy"), None).unwrap();
    assert_eq!(body.to_string(&doc), "howdy world");

    // attributes only
    let italic = Attributes::from([("italic".to_string(), json!(true))]);
    body.replace(&mut doc, 6, 11, None, Some(&italic)).unwrap();
    let runs = body.runs(&doc).unwrap();
    assert_eq!(runs.last().unwrap().text, "world");
    assert_eq!(runs.last().unwrap().attributes, italic);

    // nothing to do
    doc.take_changes();
    body.replace(&mut doc, 0, 3, None, None).unwrap();
    assert!(doc.take_changes().is_empty());

    // insert at a position
    body.replace(&mut doc, 5, 5, Some(","), None).unwrap();
    assert_eq!(body.to_string(&doc), "howdy, world");
}

#[test]
fn test_text_null_attribute_removes_format() {
    let mut doc = Document::new("notes");
    let body = doc.text("body").unwrap();
    let bold = Attributes::from([("bold".to_string(), json!(true))]);
    body.insert(&mut doc, 0, "abcdef", Some(&bold)).unwrap();
    let unbold = Attributes::from([("bold".to_string(), serde_json::Value::Null)]);
    body.format(&mut doc, 2, 4, &unbold).unwrap();

    let runs = body.runs(&doc).unwrap();
    assert_eq!(
        runs.iter().map(|r| r.text.as_str()).collect::<Vec<_>>(),
        vec!["ab", "cd", "ef"]
    );
    assert!(runs[1].attributes.is_empty());
    assert_eq!(runs[2].attributes, bold);
}

#[test]
fn test_text_positions_are_characters() {
    let mut doc = Document::new("notes");
    let body = doc.text("body").unwrap();
    body.insert(&mut doc, 0, "héllo", None).unwrap();
    assert_eq!(body.len(&doc), 5);
    body.delete(&mut doc, 1, 2).unwrap();
    assert_eq!(body.to_string(&doc), "hllo");
}

// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! History-free copies of a document.
//!
//! Logical content is replayed into a brand-new engine instance. Item
//! identities are regenerated, so deltas produced against the original history
//! have no causal anchor in the copy.

use crate::traits::SyncError;
use automerge::marks::{ExpandMark, Mark};
use automerge::transaction::Transactable;
use automerge::{AutoCommit, ObjId, ObjType, ReadDoc, Value, ROOT};

pub(crate) fn flatten(src: &AutoCommit) -> Result<AutoCommit, SyncError> {
    let mut dst = AutoCommit::new();
    copy_object(src, &ROOT, &mut dst, &ROOT)?;
    Ok(dst)
}

fn copy_object(
    src: &AutoCommit,
    src_obj: &ObjId,
    dst: &mut AutoCommit,
    dst_obj: &ObjId,
) -> Result<(), SyncError> {
    match src.object_type(src_obj)? {
        ObjType::Map | ObjType::Table => {
            for key in src.keys(src_obj) {
                match src.get(src_obj, key.as_str())? {
                    Some((Value::Object(obj_type), child)) => {
                        let copy = dst.put_object(dst_obj, key.as_str(), obj_type)?;
                        copy_object(src, &child, dst, &copy)?;
                    }
                    Some((Value::Scalar(scalar), _)) => {
                        dst.put(dst_obj, key.as_str(), scalar.into_owned())?;
                    }
                    None => {}
                }
            }
        }
        ObjType::List => {
            for idx in 0..src.length(src_obj) {
                match src.get(src_obj, idx)? {
                    Some((Value::Object(obj_type), child)) => {
                        let copy = dst.insert_object(dst_obj, idx, obj_type)?;
                        copy_object(src, &child, dst, &copy)?;
                    }
                    Some((Value::Scalar(scalar), _)) => {
                        dst.insert(dst_obj, idx, scalar.into_owned())?;
                    }
                    None => {}
                }
            }
        }
        ObjType::Text => {
            let text = src.text(src_obj)?;
            dst.splice_text(dst_obj, 0, 0, &text)?;
            for mark in src.marks(src_obj)? {
                dst.mark(
                    dst_obj,
                    Mark::new(
                        mark.name().to_string(),
                        mark.value().clone(),
                        mark.start,
                        mark.end,
                    ),
                    ExpandMark::None,
                )?;
            }
        }
    }
    Ok(())
}

// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

//! Cap'n Proto envelope around engine bytes.
//!
//! The envelope carries the document prefix, the item kind and the state vector
//! (heads) reached after the item. Engine bytes stay opaque.

use crate::envelope_capnp::envelope;
use crate::traits::SyncError;
use automerge::ChangeHash;
use capnp::message::{Builder, HeapAllocator, ReaderOptions};
use capnp::serialize;

/// Kind of encoded item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Snapshot,
    Delta,
}

/// A full document state relative to an empty baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub id: String,
    pub data: Vec<u8>,
}

/// An incremental update relative to some basis state vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    pub data: Vec<u8>,
}

impl Snapshot {
    /// Heads of the document at the time the snapshot was encoded.
    pub fn heads(&self) -> Result<Vec<ChangeHash>, SyncError> {
        Ok(read(&self.data)?.heads)
    }

    pub fn prefix(&self) -> Result<String, SyncError> {
        Ok(read(&self.data)?.prefix)
    }
}

impl Delta {
    /// Heads of the producing document once this delta is applied.
    pub fn heads(&self) -> Result<Vec<ChangeHash>, SyncError> {
        Ok(read(&self.data)?.heads)
    }

    pub fn prefix(&self) -> Result<String, SyncError> {
        Ok(read(&self.data)?.prefix)
    }
}

pub(crate) struct Envelope {
    pub prefix: String,
    pub kind: ItemKind,
    pub id: String,
    pub heads: Vec<ChangeHash>,
    pub payload: Vec<u8>,
}

pub(crate) fn write(
    prefix: &str,
    kind: ItemKind,
    id: &str,
    heads: &[ChangeHash],
    payload: &[u8],
) -> Result<Vec<u8>, SyncError> {
    let mut message = Builder::new(HeapAllocator::new());
    {
        let mut root = message.init_root::<envelope::Builder>();
        root.set_prefix(prefix.into());
        root.set_kind(match kind {
            ItemKind::Snapshot => envelope::Kind::Snapshot,
            ItemKind::Delta => envelope::Kind::Delta,
        });
        root.set_id(id.into());
        let mut list = root.reborrow().init_heads(heads.len() as u32);
        for (idx, head) in heads.iter().enumerate() {
            list.set(idx as u32, &head.0);
        }
        root.set_payload(payload);
    }
    let mut buf = Vec::new();
    serialize::write_message(&mut buf, &message)
        .map_err(|e| SyncError::Engine(format!("Envelope serialization fail: {}", e)))?;
    Ok(buf)
}

pub(crate) fn read(bytes: &[u8]) -> Result<Envelope, SyncError> {
    let reader = serialize::read_message(bytes, ReaderOptions::new())
        .map_err(|e| SyncError::Format(e.to_string()))?;
    let root = reader
        .get_root::<envelope::Reader>()
        .map_err(|e| SyncError::Format(e.to_string()))?;

    let prefix = root
        .get_prefix()
        .map_err(|e| SyncError::Format(e.to_string()))?
        .to_string()
        .map_err(|e| SyncError::Format(e.to_string()))?;
    let id = root
        .get_id()
        .map_err(|e| SyncError::Format(e.to_string()))?
        .to_string()
        .map_err(|e| SyncError::Format(e.to_string()))?;
    let kind = match root
        .get_kind()
        .map_err(|e| SyncError::Format(format!("Unknown item kind: {:?}", e)))?
    {
        envelope::Kind::Snapshot => ItemKind::Snapshot,
        envelope::Kind::Delta => ItemKind::Delta,
    };

    let list = root
        .get_heads()
        .map_err(|e| SyncError::Format(e.to_string()))?;
    let mut heads = Vec::with_capacity(list.len() as usize);
    for idx in 0..list.len() {
        let raw = list.get(idx).map_err(|e| SyncError::Format(e.to_string()))?;
        let hash: [u8; 32] = raw
            .try_into()
            .map_err(|_| SyncError::Format(format!("Bad change hash length: {}", raw.len())))?;
        heads.push(ChangeHash(hash));
    }

    let payload = root
        .get_payload()
        .map_err(|e| SyncError::Format(e.to_string()))?
        .to_vec();

    Ok(Envelope {
        prefix,
        kind,
        id,
        heads,
        payload,
    })
}

/// Decodes an envelope and checks it belongs to `prefix` and is of `kind`.
pub(crate) fn open(bytes: &[u8], prefix: &str, kind: ItemKind) -> Result<Envelope, SyncError> {
    let envelope = read(bytes)?;
    if envelope.prefix != prefix {
        return Err(SyncError::Format(format!(
            "Prefix mismatch: expected `{}`, found `{}`",
            prefix, envelope.prefix
        )));
    }
    if envelope.kind != kind {
        return Err(SyncError::Format(format!(
            "Expected {:?}, found {:?}",
            kind, envelope.kind
        )));
    }
    Ok(envelope)
}

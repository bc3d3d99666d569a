// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use std::collections::BTreeSet;

/// Where a primitive mutation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// A field operation on this document.
    Local,
    /// Content pulled in through `apply_deltas` or `merge`.
    Remote,
}

/// One primitive mutation of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub field: String,
    pub origin: ChangeOrigin,
}

/// Handle returned by listener registration, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback = Box<dyn FnMut(&ChangeEvent) + Send>;

struct Listener {
    id: ListenerId,
    field: Option<String>,
    callback: Callback,
}

/// Field-level and document-level listener registry.
///
/// Listeners belong to one document instance; clones start without any.
#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    entries: Vec<Listener>,
}

impl Listeners {
    pub(crate) fn add(&mut self, field: Option<String>, callback: Callback) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push(Listener {
            id,
            field,
            callback,
        });
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|l| l.id != id);
        self.entries.len() != before
    }

    /// Field listeners of the event's field fire first, then document listeners.
    pub(crate) fn emit(&mut self, event: &ChangeEvent) {
        for listener in self
            .entries
            .iter_mut()
            .filter(|l| l.field.as_deref() == Some(event.field.as_str()))
        {
            (listener.callback)(event);
        }
        for listener in self.entries.iter_mut().filter(|l| l.field.is_none()) {
            (listener.callback)(event);
        }
    }
}

/// Coalesced view of everything that changed since the last drain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    pub fields: BTreeSet<String>,
    pub events: usize,
    pub remote_events: usize,
}

impl ChangeSummary {
    pub fn is_empty(&self) -> bool {
        self.events == 0
    }

    pub(crate) fn record(&mut self, event: &ChangeEvent) {
        self.events += 1;
        if event.origin == ChangeOrigin::Remote {
            self.remote_events += 1;
        }
        self.fields.insert(event.field.clone());
    }
}

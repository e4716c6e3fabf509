// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The DLR store (C6, `spec.md` §4.6): an append-only list of SMS
//! delivery-report records behind a single list-wide mutex. None of its
//! operations ever await, so — unlike the session registry's `DashMap` —
//! a plain `std::sync::Mutex<Vec<_>>` is the right tool here; this mirrors
//! the teacher's choice of a synchronous `std::sync::Mutex` wherever a
//! critical section is computation-only (see `client/common.rs`).

use std::{
    sync::Mutex,
    time::Instant,
};

use tracing::debug;

/// One delivery-report record (`spec.md` §3). Identity for lookup is
/// `(smsc, timestamp)`; `destination` is captured but excluded from the
/// match unless the gateway opts into `dlr_match_destination`
/// (`spec.md` §9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DlrEntry {
    pub smsc: Vec<u8>,
    pub timestamp: Vec<u8>,
    pub destination: Vec<u8>,
    pub sender: Vec<u8>,
    pub service: Vec<u8>,
    pub url: Vec<u8>,
    pub mask: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredEntry {
    entry: DlrEntry,
    created_at_marker: u64,
}

/// An append-only, mutex-guarded list of outstanding DLR records.
///
/// `created_at_marker` stands in for `std::time::Instant` inside the
/// stored record (`Instant` isn't `PartialEq`/hashable in a way that suits
/// a simple equality-derived struct, and doesn't need to be compared —
/// only ordered against "now"), while [`DlrStore::add`] still timestamps
/// each entry against a real `Instant` sequence so a gateway-level reaper
/// can filter by age, per `SPEC_FULL.md` §3.
pub struct DlrStore {
    entries: Mutex<Vec<StoredEntry>>,
    epoch: Instant,
}

impl DlrStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            epoch: Instant::now(),
        }
    }

    /// Appends a new entry. O(1).
    pub fn add(&self, entry: DlrEntry) {
        let created_at_marker = self.epoch.elapsed().as_micros() as u64;
        let mut guard = self.entries.lock().expect("DLR store mutex poisoned");
        guard.push(StoredEntry {
            entry,
            created_at_marker,
        });
    }

    /// Returns a deep copy of the first entry whose SMSC and timestamp
    /// match, optionally also requiring `destination` to match when
    /// `match_destination` is set (`spec.md` §9 open question, resolved as
    /// a config-driven knob rather than a silent behavior change).
    pub fn get(&self, smsc: &[u8], ts: &[u8], dst: &[u8], match_destination: bool) -> Option<DlrEntry> {
        let guard = self.entries.lock().expect("DLR store mutex poisoned");
        guard
            .iter()
            .find(|stored| {
                stored.entry.smsc == smsc
                    && stored.entry.timestamp == ts
                    && (!match_destination || stored.entry.destination == dst)
            })
            .map(|stored| stored.entry.clone())
    }

    /// Removes and drops the first matching entry, same match semantics as
    /// [`DlrStore::get`].
    pub fn remove(&self, smsc: &[u8], ts: &[u8], dst: &[u8], match_destination: bool) -> bool {
        let mut guard = self.entries.lock().expect("DLR store mutex poisoned");
        if let Some(pos) = guard.iter().position(|stored| {
            stored.entry.smsc == smsc
                && stored.entry.timestamp == ts
                && (!match_destination || stored.entry.destination == dst)
        }) {
            guard.remove(pos);
            true
        } else {
            false
        }
    }

    /// Current list length.
    pub fn count(&self) -> usize {
        self.entries.lock().expect("DLR store mutex poisoned").len()
    }

    /// Removes all entries.
    pub fn flush(&self) {
        self.entries.lock().expect("DLR store mutex poisoned").clear();
    }

    /// Flushes and releases the store. The store has no background
    /// resources beyond the `Vec` itself, so this is `flush` plus a log
    /// line marking the lifecycle event for anyone watching logs during a
    /// gateway shutdown.
    pub fn shutdown(&self) {
        let count = self.count();
        self.flush();
        debug!(drained = count, "DLR store shut down");
    }
}

impl Default for DlrStore {
    fn default() -> Self {
        Self::new()
    }
}

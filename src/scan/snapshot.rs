//! Depot snapshot: the accumulated result of a scan.
//!
//! Results arrive out of order (rejections from the scan loop, quantities from
//! several readers). [`ResultSink`] puts them back into depot order before
//! they are recorded and reported.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::mpsc::Sender;

use crate::catalog::{Catalog, EntryId};
use crate::scan::queue::ScanEvent;

/// Quantity recorded for one entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Amount {
    /// Read from the slot badge.
    Counted(u32),
    /// The slot matched but its badge could not be read.
    Unreadable,
    /// The entry is not in the depot.
    NotFound,
}

impl Amount {
    /// Numeric value used in exports; unknown and missing count as zero.
    pub fn value(self) -> u32 {
        match self {
            Amount::Counted(n) => n,
            Amount::Unreadable | Amount::NotFound => 0,
        }
    }

    fn rank(self) -> u8 {
        match self {
            Amount::Counted(_) => 2,
            Amount::Unreadable => 1,
            Amount::NotFound => 0,
        }
    }

    pub fn status(self) -> &'static str {
        match self {
            Amount::Counted(_) => "counted",
            Amount::Unreadable => "unreadable",
            Amount::NotFound => "not_found",
        }
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Amount::Counted(n) => write!(f, "{}", n),
            Amount::Unreadable => write!(f, "?"),
            Amount::NotFound => write!(f, "-"),
        }
    }
}

/// One exported row.
#[derive(Clone, Debug, Serialize)]
pub struct SnapshotRow {
    pub id: String,
    pub name: String,
    pub amount: u32,
    pub status: &'static str,
}

/// Amounts per entry. A later reading replaces an earlier one only if it is
/// strictly better (counted beats unreadable beats not found).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DepotSnapshot {
    amounts: BTreeMap<EntryId, Amount>,
}

impl DepotSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `amount` for `entry`. Returns true if the snapshot changed.
    pub fn record(&mut self, entry: EntryId, amount: Amount) -> bool {
        match self.amounts.get(&entry) {
            Some(existing) if existing.rank() >= amount.rank() => false,
            _ => {
                self.amounts.insert(entry, amount);
                true
            }
        }
    }

    pub fn get(&self, entry: EntryId) -> Option<Amount> {
        self.amounts.get(&entry).copied()
    }

    pub fn len(&self) -> usize {
        self.amounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntryId, Amount)> + '_ {
        self.amounts.iter().map(|(id, amount)| (*id, *amount))
    }

    /// Rows in depot order, for display or JSON export.
    pub fn rows(&self, catalog: &Catalog) -> Vec<SnapshotRow> {
        catalog
            .scan_order()
            .iter()
            .filter_map(|&id| {
                let amount = self.get(id)?;
                let entry = catalog.get(id)?;
                Some(SnapshotRow {
                    id: entry.key.clone(),
                    name: entry.name.clone(),
                    amount: amount.value(),
                    status: amount.status(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Default)]
struct SinkState {
    snapshot: DepotSnapshot,
    /// Next depot-order position to release
    next: usize,
    pending: BTreeMap<usize, (EntryId, Amount)>,
}

impl SinkState {
    fn release(&mut self, entry: EntryId, amount: Amount, events: &Sender<ScanEvent>) {
        if self.snapshot.record(entry, amount) {
            let _ = events.send(ScanEvent::Material { entry, amount });
        }
    }
}

/// Collects results keyed by depot-order position and records them in
/// position order, emitting a [`ScanEvent::Material`] for each.
pub struct ResultSink {
    state: Mutex<SinkState>,
    events: Sender<ScanEvent>,
}

impl ResultSink {
    pub fn new(events: Sender<ScanEvent>) -> Self {
        Self {
            state: Mutex::new(SinkState::default()),
            events,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Submits the result for one position. It is held back until every
    /// earlier position has been submitted.
    pub fn submit(&self, position: usize, entry: EntryId, amount: Amount) {
        let mut state = self.lock();
        if position < state.next {
            return;
        }
        state.pending.insert(position, (entry, amount));
        loop {
            let next = state.next;
            let Some((entry, amount)) = state.pending.remove(&next) else {
                break;
            };
            state.release(entry, amount, &self.events);
            state.next += 1;
        }
    }

    /// Number of positions released so far.
    pub fn released(&self) -> usize {
        self.lock().next
    }

    /// Releases anything still held back (positions after a gap), in order.
    pub fn flush(&self) {
        let mut state = self.lock();
        let pending = std::mem::take(&mut state.pending);
        for (position, (entry, amount)) in pending {
            state.release(entry, amount, &self.events);
            state.next = position + 1;
        }
    }

    pub fn into_snapshot(self) -> DepotSnapshot {
        self.state
            .into_inner()
            .unwrap_or_else(|e| e.into_inner())
            .snapshot
    }
}

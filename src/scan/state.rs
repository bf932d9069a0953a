//! Scan session state, cancellation and page-overlap bookkeeping.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::catalog::EntryId;
use crate::scan::layout::GRID_COLUMNS;

/// Session states.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanState {
    /// Session created, nothing touched yet
    Idle,
    /// Checking which screen is showing and navigating to the depot
    Validating,
    /// Matching slots against the depot order
    Scanning,
    /// Matching finished; waiting for quantity reads
    Draining,
    Done,
    Failed(String),
    Interrupted,
}

impl std::fmt::Display for ScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanState::Idle => write!(f, "Idle"),
            ScanState::Validating => write!(f, "Validating screen"),
            ScanState::Scanning => write!(f, "Scanning"),
            ScanState::Draining => write!(f, "Waiting for quantity reads"),
            ScanState::Done => write!(f, "Done"),
            ScanState::Failed(msg) => write!(f, "Failed: {}", msg),
            ScanState::Interrupted => write!(f, "Interrupted"),
        }
    }
}

/// Shared stop flag for one session.
///
/// Set by the user (stop request) or by a failing reader. The orchestrator
/// checks it before each slot and before each capture; in-flight drags poll it.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Identity seen in the top slot of each column of the last page, if any.
pub type RowFingerprint = [Option<EntryId>; GRID_COLUMNS];

/// Counts how many leading columns of a freshly scrolled page were already
/// on the previous page.
///
/// `top_row_shows(column, entry)` tells whether the new page's top slot in
/// `column` shows `entry`. The overlap is found by looking for the previous
/// column whose identity appears in the new first column, then confirming
/// the columns after it line up. Columns without a known identity are not
/// checked.
pub fn overlap_columns(
    fingerprint: &RowFingerprint,
    top_row_shows: impl Fn(usize, EntryId) -> bool,
) -> usize {
    for start in 0..GRID_COLUMNS {
        let Some(first) = fingerprint[start] else {
            continue;
        };
        if !top_row_shows(0, first) {
            continue;
        }
        let aligned = (1..GRID_COLUMNS - start).all(|k| match fingerprint[start + k] {
            Some(entry) => top_row_shows(k, entry),
            None => true,
        });
        if aligned {
            return GRID_COLUMNS - start;
        }
    }
    0
}

/// Fingerprint for the new page: overlapping columns keep the identities
/// they had on the previous page.
pub fn carry_fingerprint(previous: &RowFingerprint, overlap: usize) -> RowFingerprint {
    let mut next: RowFingerprint = [None; GRID_COLUMNS];
    let overlap = overlap.min(GRID_COLUMNS);
    for k in 0..overlap {
        next[k] = previous[GRID_COLUMNS - overlap + k];
    }
    next
}

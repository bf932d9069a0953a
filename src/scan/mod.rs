//! Depot scanning: screen validation, paging through the depot, matching
//! slots against the depot order and reading quantities.
//!
//! This module provides:
//! - Configuration loading
//! - Screen detection and navigation
//! - The page/slot geometry of the depot grid
//! - A scan orchestrator with a concurrent quantity reader pool

pub mod config;
pub mod detection;
pub mod error;
pub mod layout;
pub mod queue;
pub mod reader;
pub mod runner;
pub mod snapshot;
pub mod state;

pub use config::ScanConfig;
pub use error::ScanError;
pub use queue::ScanEvent;
pub use runner::{ScanHandle, ScanOutcome, is_scan_running, run_scan, start_scan};
pub use snapshot::{Amount, DepotSnapshot, SnapshotRow};
pub use state::{CancelToken, ScanState};

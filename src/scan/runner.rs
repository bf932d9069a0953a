//! Scan session orchestrator.
//!
//! Drives one depot scan: validates the screen, walks the depot page by page
//! matching slots against the depot order and hands matched slots to the
//! reader pool. Scrolling to the next page happens only once a page's slots
//! are used up, while the readers keep working on the queued slots.

use anyhow::{Result, anyhow};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::capture::{CaptureFrame, WindowDriver};
use crate::catalog::{Catalog, EntryId};
use crate::matcher::Matcher;
use crate::scan::config::ScanConfig;
use crate::scan::detection::{is_end_of_depot, navigation_clicks, recognize_screen};
use crate::scan::error::ScanError;
use crate::scan::layout::{
    GRID_COLUMNS, GRID_ROWS, GridAnchor, SCROLL_LINE_END, SCROLL_LINE_START, SlotBox, slice_page,
};
use crate::scan::queue::{ReadJob, ScanEvent, create_event_channel, create_job_queue};
use crate::scan::reader::{ReaderContext, run_reader_worker};
use crate::scan::snapshot::{Amount, DepotSnapshot, ResultSink};
use crate::scan::state::{
    CancelToken, RowFingerprint, ScanState, carry_fingerprint, overlap_columns,
};

/// Global flag indicating if a scan is currently running.
static SCAN_RUNNING: AtomicBool = AtomicBool::new(false);

/// Checks if a scan is currently running.
pub fn is_scan_running() -> bool {
    SCAN_RUNNING.load(Ordering::SeqCst)
}

/// Clears [`SCAN_RUNNING`] when the scan thread ends, even on panic.
struct RunningGuard;

impl Drop for RunningGuard {
    fn drop(&mut self) {
        SCAN_RUNNING.store(false, Ordering::SeqCst);
    }
}

/// Final state and everything recorded before the session ended.
#[derive(Debug)]
pub struct ScanOutcome {
    pub state: ScanState,
    pub snapshot: DepotSnapshot,
}

impl ScanOutcome {
    pub fn success(&self) -> bool {
        self.state == ScanState::Done
    }
}

/// A scan running on its own thread.
pub struct ScanHandle {
    events: Receiver<ScanEvent>,
    cancel: CancelToken,
    thread: JoinHandle<ScanOutcome>,
}

impl ScanHandle {
    /// Progress events. The channel closes once the session has finished.
    pub fn events(&self) -> &Receiver<ScanEvent> {
        &self.events
    }

    /// Asks the session to stop at its next safe point. Reads already queued
    /// still complete.
    pub fn request_stop(&self) {
        crate::log("Stop requested");
        self.cancel.interrupt();
    }

    pub fn join(self) -> Result<ScanOutcome> {
        self.thread
            .join()
            .map_err(|_| anyhow!("Scan thread panicked"))
    }
}

/// Starts a scan in a background thread.
///
/// Returns immediately. Only one scan may run at a time per process.
pub fn start_scan(
    driver: Box<dyn WindowDriver>,
    catalog: Arc<Catalog>,
    config: ScanConfig,
) -> Result<ScanHandle, ScanError> {
    if SCAN_RUNNING.swap(true, Ordering::SeqCst) {
        return Err(ScanError::AlreadyRunning);
    }

    let cancel = CancelToken::new();
    let (event_tx, event_rx) = create_event_channel();
    let thread_cancel = cancel.clone();

    crate::log(&format!(
        "Starting depot scan: {} entries in depot order",
        catalog.scan_order().len()
    ));
    let thread = thread::spawn(move || {
        let _guard = RunningGuard;
        let outcome = run_scan(driver.as_ref(), &catalog, &config, event_tx, &thread_cancel);
        crate::log("Scan thread finished");
        outcome
    });

    Ok(ScanHandle {
        events: event_rx,
        cancel,
        thread,
    })
}

/// Runs one scan session to completion on the calling thread.
///
/// Always cleans up the driver exactly once and ends with a
/// [`ScanEvent::Finished`].
pub fn run_scan(
    driver: &dyn WindowDriver,
    catalog: &Catalog,
    config: &ScanConfig,
    events: Sender<ScanEvent>,
    cancel: &CancelToken,
) -> ScanOutcome {
    let session = ScanSession {
        driver,
        catalog,
        config,
        sink: ResultSink::new(events.clone()),
        events,
        cancel,
    };

    let state = session.run();
    driver.cleanup();

    match &state {
        ScanState::Done => crate::log(&format!(
            "Scan completed: {} entries recorded",
            session.sink.released()
        )),
        ScanState::Interrupted => crate::log(&format!(
            "Scan interrupted after {} entries",
            session.sink.released()
        )),
        other => crate::log(&format!("Scan ended: {}", other)),
    }

    let success = state == ScanState::Done;
    session.emit(ScanEvent::Finished { success });
    ScanOutcome {
        state,
        snapshot: session.sink.into_snapshot(),
    }
}

/// One depot page being matched.
struct Page {
    number: usize,
    slots: Vec<SlotBox>,
    final_page: bool,
    /// Next slot to match
    cursor: usize,
    fingerprint: RowFingerprint,
}

struct ScanSession<'a> {
    driver: &'a dyn WindowDriver,
    catalog: &'a Catalog,
    config: &'a ScanConfig,
    sink: ResultSink,
    events: Sender<ScanEvent>,
    cancel: &'a CancelToken,
}

impl<'a> ScanSession<'a> {
    fn emit(&self, event: ScanEvent) {
        let _ = self.events.send(event);
    }

    fn status(&self, message: &str) {
        crate::log(message);
        self.emit(ScanEvent::Status(message.to_string()));
    }

    fn enter(&self, state: &ScanState) {
        crate::log(&format!("State: {}", state));
    }

    fn fail(&self, error: ScanError) -> ScanState {
        let message = error.to_string();
        self.status(&message);
        ScanState::Failed(message)
    }

    fn run(&self) -> ScanState {
        self.enter(&ScanState::Idle);
        self.status("Setting up...");
        if self.cancel.is_interrupted() {
            return ScanState::Interrupted;
        }
        let matcher = Matcher::new(
            self.catalog,
            self.config.match_search_radius,
            self.config.display_scale,
        );

        self.enter(&ScanState::Validating);
        let first_frame = match self.validate_screen() {
            Ok(frame) => frame,
            Err(e) => return self.fail(e),
        };
        if self.cancel.is_interrupted() {
            return ScanState::Interrupted;
        }

        self.enter(&ScanState::Scanning);
        self.status("Scanning...");
        let (job_tx, job_rx) = create_job_queue();
        let job_rx = Mutex::new(job_rx);
        let reader_ctx = ReaderContext {
            catalog: self.catalog,
            sink: &self.sink,
            events: self.events.clone(),
            cancel: self.cancel,
            metrics: self.config.glyph_metrics,
            debug_dir: self.config.debug_dir.as_deref(),
        };
        let threads = self.config.reader_threads.max(1);

        let scanned = thread::scope(|s| {
            let workers: Vec<_> = (0..threads)
                .map(|worker| {
                    let job_rx = &job_rx;
                    let ctx = &reader_ctx;
                    s.spawn(move || run_reader_worker(worker, job_rx, ctx))
                })
                .collect();

            let result = self.scan_pages(&matcher, &job_tx, first_frame);

            // Drop the sender to signal readers to finish
            drop(job_tx);
            self.enter(&ScanState::Draining);
            self.status("Waiting for quantity reads to finish...");
            for worker in workers {
                if let Err(e) = worker.join() {
                    crate::log(&format!("Reader thread panicked: {:?}", e));
                }
            }
            result
        });
        self.sink.flush();

        match scanned {
            Err(e) => self.fail(e),
            Ok(()) if self.cancel.is_interrupted() => ScanState::Interrupted,
            Ok(()) => ScanState::Done,
        }
    }

    /// Checks the window size and screen, and navigates to the depot.
    fn validate_screen(&self) -> Result<CaptureFrame, ScanError> {
        let frame = self.capture_page()?;
        let leniency = self.config.color_leniency;
        let screen = recognize_screen(&frame, leniency).ok_or(ScanError::UnknownScreen)?;
        crate::log(&format!("Detected {}, navigating to depot start", screen));

        for (point, delay) in navigation_clicks(screen) {
            self.driver
                .click(point, delay)
                .map_err(|e| ScanError::InputFailed(format!("{:#}", e)))?;
        }

        let frame = self.capture_page()?;
        if recognize_screen(&frame, leniency).is_none() {
            crate::log("Warning: depot not recognized after navigation, scanning anyway");
        }
        Ok(frame)
    }

    /// Resizes the window and grabs a frame of the canonical size.
    fn capture_page(&self) -> Result<CaptureFrame, ScanError> {
        let (width, height) = self.config.canonical_size();
        self.driver
            .resize(width, height)
            .map_err(|e| ScanError::WindowNotReady(format!("{:#}", e)))?;
        let frame = self
            .driver
            .capture()
            .map_err(|e| ScanError::CaptureFailed(format!("{:#}", e)))?;
        if frame.dimensions() != (width, height) {
            return Err(ScanError::ResolutionMismatch {
                expected: (width, height),
                actual: frame.dimensions(),
            });
        }
        Ok(frame)
    }

    fn scan_pages(
        &self,
        matcher: &Matcher,
        jobs: &Sender<ReadJob>,
        first_frame: CaptureFrame,
    ) -> Result<(), ScanError> {
        let order = self.catalog.scan_order();
        let threshold = self.config.match_threshold;
        let mut position = 0;

        let mut page = self.open_page(first_frame, None, matcher)?;

        loop {
            if self.cancel.is_interrupted() {
                crate::log(&format!("Stopping at depot position {}", position));
                return Ok(());
            }
            if position >= order.len() {
                crate::log("Every entry in the depot order has been checked");
                return Ok(());
            }

            if page.cursor >= page.slots.len() {
                if page.final_page {
                    self.finish_order(&order[position..], position);
                    return Ok(());
                }

                self.status("Scrolling to the next page...");
                self.scroll()?;
                if self.cancel.is_interrupted() {
                    continue;
                }
                let frame = self.capture_page()?;
                page = self.open_page(frame, Some(&page), matcher)?;
                self.status("Scanning...");
                continue;
            }

            let entry = order[position];
            let slot = &page.slots[page.cursor];
            if matcher.is_match(&slot.image, entry, threshold) {
                if slot.is_top_row() {
                    page.fingerprint[slot.column] = Some(entry);
                }
                let job = ReadJob::new(position, entry, slot.image.clone());
                if jobs.send(job).is_err() {
                    crate::log("Reader queue closed unexpectedly");
                    self.sink.submit(position, entry, Amount::Unreadable);
                }
                page.cursor += 1;
            } else {
                self.sink.submit(position, entry, Amount::NotFound);
            }
            position += 1;
        }
    }

    /// Slices a freshly captured page and skips the columns already matched
    /// on the previous one.
    fn open_page(
        &self,
        frame: CaptureFrame,
        previous: Option<&Page>,
        matcher: &Matcher,
    ) -> Result<Page, ScanError> {
        let final_page = is_end_of_depot(&frame);
        let anchor = if final_page {
            GridAnchor::End
        } else {
            GridAnchor::Start
        };
        let slots = slice_page(&frame, anchor);

        let Some(previous) = previous else {
            crate::log(&format!("Page 1{}", if final_page { " (last)" } else { "" }));
            return Ok(Page {
                number: 1,
                slots,
                final_page,
                cursor: 0,
                fingerprint: [None; GRID_COLUMNS],
            });
        };

        let threshold = self.config.match_threshold;
        let overlap = overlap_columns(&previous.fingerprint, |column, entry| {
            matcher.is_match(&slots[column * GRID_ROWS].image, entry, threshold)
        });
        if overlap >= GRID_COLUMNS {
            return Err(ScanError::InputFailed(
                "The depot did not move after scrolling".to_string(),
            ));
        }

        let number = previous.number + 1;
        crate::log(&format!(
            "Page {}{}: {} column(s) already scanned",
            number,
            if final_page { " (last)" } else { "" },
            overlap
        ));
        Ok(Page {
            number,
            slots,
            final_page,
            cursor: overlap * GRID_ROWS,
            fingerprint: carry_fingerprint(&previous.fingerprint, overlap),
        })
    }

    /// Drags the depot one page on. Queued reads carry on meanwhile.
    fn scroll(&self) -> Result<(), ScanError> {
        let (width, height) = self.config.canonical_size();
        self.driver
            .resize(width, height)
            .map_err(|e| ScanError::WindowNotReady(format!("{:#}", e)))?;

        let should_stop = || self.cancel.is_interrupted();
        self.driver
            .drag_line(
                SCROLL_LINE_START,
                SCROLL_LINE_END,
                self.config.scroll_speed,
                &should_stop,
            )
            .map_err(|e| ScanError::InputFailed(format!("{:#}", e)))?;

        if !should_stop() {
            // Let the scroll animation come to rest before the next capture
            thread::sleep(Duration::from_millis(self.config.scroll_settle_ms));
        }
        Ok(())
    }

    /// Last page exhausted: everything left in the depot order is absent.
    fn finish_order(&self, remaining: &[EntryId], first_position: usize) {
        if !remaining.is_empty() {
            crate::log(&format!(
                "End of depot reached, {} remaining entries not present",
                remaining.len()
            ));
        }
        for (offset, &entry) in remaining.iter().enumerate() {
            self.sink.submit(first_position + offset, entry, Amount::NotFound);
        }
    }
}

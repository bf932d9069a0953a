//! Quantity reader workers.
//!
//! A small pool of threads share the job queue. Each worker reads the badge of
//! a matched slot and hands the amount to the shared [`ResultSink`]. Workers
//! exit once the queue is closed and empty, so every job sent before the
//! scan loop stops is always processed.

use anyhow::{Context, Result, ensure};
use chrono::Local;
use image::{GrayImage, RgbImage};
use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Mutex;
use std::sync::mpsc::{Receiver, Sender};

use crate::catalog::Catalog;
use crate::ocr::{self, GlyphMetrics, QuantityReading};
use crate::scan::layout::{AMOUNT_BOX, amount_crop};
use crate::scan::queue::{ReadJob, ScanEvent};
use crate::scan::snapshot::{Amount, ResultSink};
use crate::scan::state::CancelToken;

/// What every worker needs, shared by reference.
pub struct ReaderContext<'a> {
    pub catalog: &'a Catalog,
    pub sink: &'a ResultSink,
    pub events: Sender<ScanEvent>,
    pub cancel: &'a CancelToken,
    pub metrics: GlyphMetrics,
    pub debug_dir: Option<&'a Path>,
}

/// Runs one reader worker until the job queue is closed and drained.
pub fn run_reader_worker(worker: usize, jobs: &Mutex<Receiver<ReadJob>>, ctx: &ReaderContext) {
    crate::log(&format!("Reader {} started", worker));

    loop {
        let next = jobs.lock().unwrap_or_else(|e| e.into_inner()).recv();
        match next {
            Ok(job) => process_job(&job, ctx),
            Err(_) => {
                // Channel closed, scan loop is done
                break;
            }
        }
    }

    crate::log(&format!("Reader {} finished", worker));
}

fn process_job(job: &ReadJob, ctx: &ReaderContext) {
    let name = ctx
        .catalog
        .get(job.entry)
        .map(|e| e.name.as_str())
        .unwrap_or("unknown item");

    let waited = (Local::now() - job.queued_at).num_milliseconds();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        read_job(job, &ctx.metrics, ctx.debug_dir)
    }));

    let amount = match result {
        Ok(Ok(QuantityReading::Count(n))) => {
            crate::log(&format!(
                "#{} {}: {} (queued {}ms)",
                job.position, name, n, waited
            ));
            Amount::Counted(n)
        }
        Ok(Ok(QuantityReading::Unreadable)) => {
            crate::log(&format!(
                "#{} {}: quantity unreadable, recorded as unknown",
                job.position, name
            ));
            Amount::Unreadable
        }
        Ok(Err(e)) => {
            report_failure(ctx, &format!("Error reading {}: {:#}", name, e));
            Amount::Unreadable
        }
        Err(payload) => {
            report_failure(
                ctx,
                &format!("Reader crashed on {}: {}", name, panic_message(&payload)),
            );
            Amount::Unreadable
        }
    };

    ctx.sink.submit(job.position, job.entry, amount);
}

/// A failed read stops the session; what was read so far is kept.
fn report_failure(ctx: &ReaderContext, message: &str) {
    crate::log(message);
    ctx.cancel.interrupt();
    let _ = ctx.events.send(ScanEvent::Status(message.to_string()));
}

fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Reads the quantity badge of one slot.
pub fn read_job(
    job: &ReadJob,
    metrics: &GlyphMetrics,
    debug_dir: Option<&Path>,
) -> Result<QuantityReading> {
    let (w, h) = job.slot.dimensions();
    ensure!(
        w >= AMOUNT_BOX.x1 && h >= AMOUNT_BOX.y1,
        "slot image {}x{} is too small for the quantity badge",
        w,
        h
    );

    let crop = amount_crop(&job.slot);
    let ink = ocr::prepare(&crop);
    if let Some(dir) = debug_dir {
        save_debug_images(dir, job.position, &crop, &ink)?;
    }
    Ok(ocr::read_prepared(&ink, metrics))
}

fn save_debug_images(dir: &Path, position: usize, crop: &RgbImage, ink: &GrayImage) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create debug directory {}", dir.display()))?;
    let raw_path = dir.join(format!("{:04}_amount.png", position));
    crop.save(&raw_path)
        .with_context(|| format!("Failed to save {}", raw_path.display()))?;
    let ink_path = dir.join(format!("{:04}_processed.png", position));
    ink.save(&ink_path)
        .with_context(|| format!("Failed to save {}", ink_path.display()))?;
    Ok(())
}

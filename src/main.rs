//! Depot Scanner
//!
//! Reads the item depot of a game running inside an Android emulator window:
//! pages through the depot, recognises each slot's item against a catalog of
//! reference icons and reads its quantity badge.

mod capture;
mod catalog;
mod matcher;
mod ocr;
mod paths;
mod scan;
#[cfg(test)]
mod testutil;

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::Parser;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use crate::capture::WindowDriver;
use crate::capture::replay::ReplayDriver;
use crate::catalog::Catalog;
use crate::scan::{DepotSnapshot, ScanConfig, ScanEvent};

const LOG_FILE_NAME: &str = "depot_scanner.log";

/// Scan the item depot of an emulator window.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Catalog manifest (defaults to resources/catalog.json next to the executable)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Config file (defaults to config.json next to the executable)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scan recorded depot pages instead of the live window, in order
    #[arg(long, num_args = 1..)]
    frames: Vec<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    let log_path = paths::get_logs_dir().join(LOG_FILE_NAME);
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = file.write_all(line.as_bytes());
    }
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = if let Some(loc) = panic_info.location() {
            format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column())
        } else {
            String::new()
        };
        let log_msg = format!("[PANIC]{} {}\n", location, msg);
        eprintln!("{}", log_msg);
        let log_path = paths::get_logs_dir().join(LOG_FILE_NAME);
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&log_path) {
            let _ = file.write_all(log_msg.as_bytes());
        }
    }));
}

fn main() -> Result<()> {
    install_panic_hook();
    paths::ensure_directories().context("Failed to create the logs directory")?;

    let args = Args::parse();
    let config = ScanConfig::load(args.config.as_deref());
    let catalog_path = args
        .catalog
        .clone()
        .unwrap_or_else(paths::get_default_catalog_path);
    let catalog = Arc::new(Catalog::load(&catalog_path)?);

    let driver = open_driver(&args, &config)?;
    let handle = scan::start_scan(driver, catalog.clone(), config)?;

    for event in handle.events().iter() {
        match event {
            // Already logged by the scanner
            ScanEvent::Status(_) => {}
            ScanEvent::Material { entry, amount } => {
                let name = catalog.get(entry).map(|e| e.name.as_str()).unwrap_or("?");
                log(&format!("{}: {}", name, amount));
            }
            ScanEvent::Finished { success } => {
                log(if success { "Scan finished" } else { "Scan did not complete" });
            }
        }
    }

    let outcome = handle.join()?;
    print_snapshot(&outcome.snapshot, &catalog, args.json)?;

    if !outcome.success() {
        bail!("Scan ended: {}", outcome.state);
    }
    Ok(())
}

/// Replay driver for recorded frames, otherwise the live emulator window.
fn open_driver(args: &Args, config: &ScanConfig) -> Result<Box<dyn WindowDriver>> {
    if !args.frames.is_empty() {
        return Ok(Box::new(ReplayDriver::from_files(&args.frames)?));
    }
    live_driver(config)
}

#[cfg(windows)]
fn live_driver(config: &ScanConfig) -> Result<Box<dyn WindowDriver>> {
    Ok(Box::new(capture::Win32Window::resolve(config)?))
}

#[cfg(not(windows))]
fn live_driver(_config: &ScanConfig) -> Result<Box<dyn WindowDriver>> {
    bail!("Live scanning needs Windows; pass --frames to scan recorded pages")
}

fn print_snapshot(snapshot: &DepotSnapshot, catalog: &Catalog, json: bool) -> Result<()> {
    if json {
        let rows = snapshot.rows(catalog);
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{:<20} {:<32} {:>8}", "ID", "NAME", "AMOUNT");
    for &id in catalog.scan_order() {
        let (Some(entry), Some(amount)) = (catalog.get(id), snapshot.get(id)) else {
            continue;
        };
        println!("{:<20} {:<32} {:>8}", entry.key, entry.name, amount.to_string());
    }
    Ok(())
}

//! Scan configuration.
//!
//! Loaded from config.json next to the executable (or an explicit path) at
//! startup. Every field has a default so partial files work.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ocr::GlyphMetrics;
use crate::scan::layout::{CANONICAL_HEIGHT, CANONICAL_WIDTH};

/// Complete scan configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Exact title of the emulator's top-level window
    #[serde(default = "default_window_title")]
    pub window_title: String,
    /// Class name of the child window that receives input
    #[serde(default)]
    pub input_child_class: Option<String>,
    /// Use the first enabled visible child as the input window
    /// (emulators in "advanced resolution" mode)
    #[serde(default)]
    pub auto_input_child: bool,
    /// Non-client border in pixels: left, top, right, bottom
    #[serde(default = "default_window_border")]
    pub window_border: [u32; 4],
    /// UI scale of the emulator relative to the reference art
    #[serde(default = "default_display_scale")]
    pub display_scale: f32,
    /// Confidence a slot must exceed to count as the expected item
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f32,
    /// Translation (pixels) searched around the slot centre when matching;
    /// unset searches every placement inside the slot
    #[serde(default = "default_match_search_radius")]
    pub match_search_radius: Option<u32>,
    /// Delay multiplier between drag moves (higher = slower scroll)
    #[serde(default = "default_scroll_speed")]
    pub scroll_speed: f32,
    /// Wait after a drag for the list to stop bouncing (milliseconds)
    #[serde(default = "default_scroll_settle_ms")]
    pub scroll_settle_ms: u64,
    /// Per-channel tolerance for screen probes
    #[serde(default = "default_color_leniency")]
    pub color_leniency: u8,
    #[serde(default = "default_capture_retries")]
    pub capture_retries: u32,
    #[serde(default = "default_capture_retry_delay_ms")]
    pub capture_retry_delay_ms: u64,
    /// Wait after restoring a minimised window (milliseconds)
    #[serde(default = "default_restore_delay_ms")]
    pub restore_delay_ms: u64,
    /// Number of concurrent quantity readers
    #[serde(default = "default_reader_threads")]
    pub reader_threads: usize,
    #[serde(default = "default_canonical_width")]
    pub canonical_width: u32,
    #[serde(default = "default_canonical_height")]
    pub canonical_height: u32,
    /// Save quantity crops here for diagnosing misreads
    #[serde(default)]
    pub debug_dir: Option<PathBuf>,
    #[serde(default)]
    pub glyph_metrics: GlyphMetrics,
}

fn default_window_title() -> String {
    "BlueStacks".to_string()
}

fn default_window_border() -> [u32; 4] {
    [1, 33, 33, 1]
}

fn default_display_scale() -> f32 {
    1.0
}

fn default_match_threshold() -> f32 {
    0.95
}

fn default_match_search_radius() -> Option<u32> {
    None
}

fn default_scroll_speed() -> f32 {
    1.0
}

fn default_scroll_settle_ms() -> u64 {
    1000
}

fn default_color_leniency() -> u8 {
    3
}

fn default_capture_retries() -> u32 {
    3
}

fn default_capture_retry_delay_ms() -> u64 {
    200
}

fn default_restore_delay_ms() -> u64 {
    500
}

fn default_reader_threads() -> usize {
    4
}

fn default_canonical_width() -> u32 {
    CANONICAL_WIDTH
}

fn default_canonical_height() -> u32 {
    CANONICAL_HEIGHT
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            window_title: default_window_title(),
            input_child_class: None,
            auto_input_child: false,
            window_border: default_window_border(),
            display_scale: default_display_scale(),
            match_threshold: default_match_threshold(),
            match_search_radius: default_match_search_radius(),
            scroll_speed: default_scroll_speed(),
            scroll_settle_ms: default_scroll_settle_ms(),
            color_leniency: default_color_leniency(),
            capture_retries: default_capture_retries(),
            capture_retry_delay_ms: default_capture_retry_delay_ms(),
            restore_delay_ms: default_restore_delay_ms(),
            reader_threads: default_reader_threads(),
            canonical_width: default_canonical_width(),
            canonical_height: default_canonical_height(),
            debug_dir: None,
            glyph_metrics: GlyphMetrics::default(),
        }
    }
}

impl ScanConfig {
    pub fn canonical_size(&self) -> (u32, u32) {
        (self.canonical_width, self.canonical_height)
    }

    /// Loads configuration from `path`, or from config.json next to the
    /// executable. Falls back to defaults when the file is missing or invalid.
    pub fn load(path: Option<&Path>) -> Self {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(crate::paths::get_default_config_path);

        crate::log(&format!("Looking for config at: {}", config_path.display()));

        if !config_path.exists() {
            crate::log("config.json not found. Using defaults.");
            return Self::default();
        }

        match fs::read_to_string(&config_path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    crate::log("Config loaded from config.json");
                    config
                }
                Err(e) => {
                    crate::log(&format!(
                        "Failed to parse config.json: {}. Using defaults.",
                        e
                    ));
                    Self::default()
                }
            },
            Err(e) => {
                crate::log(&format!(
                    "Failed to read config.json: {}. Using defaults.",
                    e
                ));
                Self::default()
            }
        }
    }
}

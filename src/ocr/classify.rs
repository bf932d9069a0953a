//! Scanline digit classifier.
//!
//! A digit is identified from three probes: where ink runs start on an upper
//! and a lower horizontal scanline, and how many ink runs a vertical scan
//! through the glyph's centre column crosses. The game font is fixed, so
//! these counts separate all ten digits.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use super::preprocess::INK;

/// Tunable geometry of the classifier, relative to glyph height.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlyphMetrics {
    /// Upper scanline as a fraction of glyph height.
    #[serde(default = "default_upper_scanline")]
    pub upper_scanline: f32,
    /// Lower scanline as a fraction of glyph height.
    #[serde(default = "default_lower_scanline")]
    pub lower_scanline: f32,
    /// Run-start offset (pixels) separating 2 from 3 and 5.
    #[serde(default = "default_wide_offset")]
    pub wide_offset: i32,
    /// Run-start offset (pixels) identifying 7 and bounding 3.
    #[serde(default = "default_narrow_offset")]
    pub narrow_offset: i32,
}

fn default_upper_scanline() -> f32 {
    58.0 / 140.0
}

fn default_lower_scanline() -> f32 {
    91.0 / 140.0
}

fn default_wide_offset() -> i32 {
    10
}

fn default_narrow_offset() -> i32 {
    5
}

impl Default for GlyphMetrics {
    fn default() -> Self {
        Self {
            upper_scanline: default_upper_scanline(),
            lower_scanline: default_lower_scanline(),
            wide_offset: default_wide_offset(),
            narrow_offset: default_narrow_offset(),
        }
    }
}

/// Ink run start positions along the three probes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanlineSignature {
    pub upper: Vec<u32>,
    pub lower: Vec<u32>,
    pub vertical: Vec<u32>,
}

impl ScanlineSignature {
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.upper.len(), self.lower.len(), self.vertical.len())
    }
}

fn run_starts(samples: impl Iterator<Item = bool>) -> Vec<u32> {
    let mut starts = Vec::new();
    let mut previous = false;
    for (i, ink) in samples.enumerate() {
        if ink && !previous {
            starts.push(i as u32);
        }
        previous = ink;
    }
    starts
}

fn scanline_row(height: u32, fraction: f32) -> u32 {
    ((height as f32 * fraction).round() as u32).min(height.saturating_sub(1))
}

pub fn signature(glyph: &GrayImage, metrics: &GlyphMetrics) -> ScanlineSignature {
    let (width, height) = glyph.dimensions();
    if width == 0 || height == 0 {
        return ScanlineSignature::default();
    }
    let is_ink = |x: u32, y: u32| glyph.get_pixel(x, y)[0] == INK;

    let upper = scanline_row(height, metrics.upper_scanline);
    let lower = scanline_row(height, metrics.lower_scanline);
    let middle = width / 2;

    ScanlineSignature {
        upper: run_starts((0..width).map(|x| is_ink(x, upper))),
        lower: run_starts((0..width).map(|x| is_ink(x, lower))),
        vertical: run_starts((0..height).map(|y| is_ink(middle, y))),
    }
}

/// Maps a signature to a digit, or `None` when it fits no digit.
///
/// Rules are checked in order; the first one that fits wins.
pub fn classify(sig: &ScanlineSignature, metrics: &GlyphMetrics) -> Option<char> {
    let (high, low, vertical) = sig.counts();
    // Horizontal shift between the first upper and first lower run
    let offset = match (sig.upper.first(), sig.lower.first()) {
        (Some(&h), Some(&l)) => h as i32 - l as i32,
        _ => 0,
    };

    match (high, low, vertical) {
        (1, 1, 1) => Some('1'),
        (1, 1, 3) if offset > metrics.wide_offset => Some('2'),
        (1, 1, v) if v != 1 && offset.abs() < metrics.narrow_offset => Some('3'),
        (2, 1, 2) => Some('4'),
        (1, 1, 3) if offset < -metrics.wide_offset => Some('5'),
        (1, 2, 3) => Some('6'),
        (1, 1, 2) if offset > metrics.narrow_offset => Some('7'),
        (2, 2, 3) => Some('8'),
        (2, 1, 3) => Some('9'),
        (2, 2, 2) => Some('0'),
        _ => None,
    }
}

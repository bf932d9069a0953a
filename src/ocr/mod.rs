//! Quantity reader for depot slot badges.
//!
//! The game renders quantities in one fixed font, so instead of a general OCR
//! engine the digits are recognised geometrically:
//! 1. Upscale the crop 4x and cut away any overlay band on the left
//! 2. Keep only bright, unsaturated pixels as ink
//! 3. Split into glyphs at ink-free columns
//! 4. Classify each glyph from its scanline signature

pub mod classify;
pub mod preprocess;
pub mod segment;

use image::{GrayImage, RgbImage};

pub use classify::{GlyphMetrics, ScanlineSignature, classify, signature};
pub use preprocess::{InkThreshold, PixelRect, UPSCALE};

/// Quantities never have more digits than this.
pub const MAX_DIGITS: usize = 5;

/// Minimum run of ink-free columns (upscaled pixels) between two glyphs.
pub const MIN_GLYPH_GAP: u32 = 1;

/// Result of reading one quantity badge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuantityReading {
    Count(u32),
    /// No digits, too many digits, or a glyph matching no digit.
    Unreadable,
}

/// Turns a raw quantity crop into the binarised image the reader works on.
pub fn prepare(region: &RgbImage) -> GrayImage {
    let upscaled = preprocess::upscale(region, UPSCALE);
    let trimmed = preprocess::cut_overlay(&upscaled);
    preprocess::binarize_ink(&trimmed, InkThreshold::default())
}

/// Reads the digit string from a prepared image, or `None` if any glyph is
/// unrecognised or the digit count is out of range.
pub fn read_digits(ink: &GrayImage, metrics: &GlyphMetrics) -> Option<String> {
    let glyphs = segment::split_glyphs(ink, MIN_GLYPH_GAP);
    if glyphs.is_empty() || glyphs.len() > MAX_DIGITS {
        return None;
    }
    glyphs
        .iter()
        .map(|glyph| classify(&signature(glyph, metrics), metrics))
        .collect()
}

/// Reads a quantity from a prepared image.
pub fn read_prepared(ink: &GrayImage, metrics: &GlyphMetrics) -> QuantityReading {
    match read_digits(ink, metrics).and_then(|digits| digits.parse().ok()) {
        Some(n) => QuantityReading::Count(n),
        None => QuantityReading::Unreadable,
    }
}

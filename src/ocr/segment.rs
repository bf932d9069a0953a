//! Splits a binarised quantity into per-digit glyphs.

use image::{GrayImage, imageops};

use super::preprocess::INK;

fn column_has_ink(img: &GrayImage, x: u32) -> bool {
    (0..img.height()).any(|y| img.get_pixel(x, y)[0] == INK)
}

/// Cuts the image into glyphs, scanning columns right to left.
///
/// A run of at least `min_gap` ink-free columns separates two glyphs; narrower
/// runs stay inside the glyph. Each glyph keeps the one background column to
/// its left so its centre column sits where the digit's centre is. A span
/// that touches the left edge has no such column and is dropped as a clipped
/// fragment.
///
/// Glyphs are returned left to right.
pub fn split_glyphs(img: &GrayImage, min_gap: u32) -> Vec<GrayImage> {
    let width = img.width();
    let min_gap = min_gap.max(1);
    let ink: Vec<bool> = (0..width).map(|x| column_has_ink(img, x)).collect();

    let mut glyphs = Vec::new();
    // Exclusive right edge of the glyph being built
    let mut glyph_end: Option<u32> = None;
    let mut gap = 0u32;
    // Leftmost ink column of the current glyph
    let mut glyph_start = 0u32;

    for x in (0..width).rev() {
        if ink[x as usize] {
            if glyph_end.is_none() {
                glyph_end = Some(x + 1);
            }
            glyph_start = x;
            gap = 0;
            continue;
        }

        gap += 1;
        if let Some(end) = glyph_end {
            if gap >= min_gap {
                // Boundary column is the one just left of the ink
                let left = glyph_start - 1;
                glyphs.push(imageops::crop_imm(img, left, 0, end - left, img.height()).to_image());
                glyph_end = None;
            }
        }
    }

    glyphs.reverse();
    glyphs
}

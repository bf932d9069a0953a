//! Synthetic depot screens for tests.
//!
//! Icons are blocky colour noise so unrelated entries never correlate, and
//! quantity badges use a small seven-segment style font with the same
//! proportions as the game's digits.

use image::{Rgb, RgbImage, Rgba, RgbaImage};

use crate::capture::CaptureFrame;
use crate::catalog::{Catalog, CatalogEntry};
use crate::scan::ScanConfig;
use crate::scan::layout::{
    AMOUNT_BOX, CANONICAL_HEIGHT, CANONICAL_WIDTH, GridAnchor, SLOT_RADIUS, slot_center,
    slot_origin,
};

pub const ICON_SIZE: u32 = 40;
pub const PAGE_BG: Rgb<u8> = Rgb([60, 60, 60]);
pub const BADGE_BG: Rgb<u8> = Rgb([35, 35, 35]);
const INK_WHITE: Rgb<u8> = Rgb([255, 255, 255]);

const GLYPH_W: u32 = 9;
const GLYPH_H: u32 = 25;
const STROKE: u32 = 3;
const GLYPH_GAP: u32 = 2;
const GLYPH_TOP: u32 = 6;
const BADGE_RIGHT_MARGIN: u32 = 3;
const COMB_W: u32 = 10;

fn hash(seed: u32, x: u32, y: u32) -> u32 {
    let mut h = seed
        .wrapping_mul(0x9E37_79B9)
        .wrapping_add(x.wrapping_mul(0x85EB_CA6B))
        .wrapping_add(y.wrapping_mul(0xC2B2_AE35));
    h ^= h >> 16;
    h = h.wrapping_mul(0x7FEB_352D);
    h ^= h >> 15;
    h = h.wrapping_mul(0x846C_A68B);
    h ^ (h >> 16)
}

/// Round icon filled with 2x2 blocks of colour noise.
pub fn icon(seed: u32) -> RgbaImage {
    let r = ICON_SIZE as f32 / 2.0;
    RgbaImage::from_fn(ICON_SIZE, ICON_SIZE, |x, y| {
        let h = hash(seed + 1, x / 2, y / 2);
        let dx = x as f32 + 0.5 - r;
        let dy = y as f32 + 0.5 - r;
        let alpha = if dx * dx + dy * dy <= (r - 1.0) * (r - 1.0) { 255 } else { 0 };
        Rgba([h as u8, (h >> 8) as u8, (h >> 16) as u8, alpha])
    })
}

/// Catalog with one noise icon per key; depot order is the key order.
pub fn catalog(keys: &[&str]) -> Catalog {
    let entries = keys
        .iter()
        .enumerate()
        .map(|(i, key)| CatalogEntry::new(key, &key.to_uppercase(), 1 + (i % 5) as u8, icon(i as u32)))
        .collect();
    Catalog::from_entries(entries, keys).unwrap()
}

/// Catalog with keys `m0`, `m1`, ...
pub fn numbered_catalog(count: usize) -> Catalog {
    let keys: Vec<String> = (0..count).map(|i| format!("m{}", i)).collect();
    let refs: Vec<&str> = keys.iter().map(|s| s.as_str()).collect();
    catalog(&refs)
}

/// Config for fast offline runs.
pub fn test_config() -> ScanConfig {
    ScanConfig {
        match_search_radius: Some(3),
        scroll_settle_ms: 0,
        reader_threads: 2,
        ..ScanConfig::default()
    }
}

fn paint_rgb(target: &mut RgbImage, img: &RgbaImage, x0: u32, y0: u32) {
    for (x, y, px) in img.enumerate_pixels() {
        target.put_pixel(x0 + x, y0 + y, Rgb([px[0], px[1], px[2]]));
    }
}

pub fn empty_slot() -> RgbImage {
    let side = SLOT_RADIUS * 2;
    RgbImage::from_pixel(side, side, PAGE_BG)
}

/// A slot of per-pixel colour noise, unrelated to any icon.
pub fn noise_slot(seed: u32) -> RgbImage {
    let side = SLOT_RADIUS * 2;
    RgbImage::from_fn(side, side, |x, y| {
        let h = hash(seed.wrapping_add(0xABCD), x, y);
        Rgb([h as u8, (h >> 8) as u8, (h >> 16) as u8])
    })
}

/// A lone slot image showing `entry` with no quantity badge.
pub fn slot_with(entry: &CatalogEntry) -> RgbImage {
    let mut slot = empty_slot();
    let reference = entry.reference_image();
    let x0 = SLOT_RADIUS - reference.width() / 2;
    let y0 = SLOT_RADIUS - reference.height() / 2;
    paint_rgb(&mut slot, &reference, x0, y0);
    slot
}

/// A lone slot image showing `entry` with a quantity badge.
pub fn slot_with_amount(entry: &CatalogEntry, amount: &str) -> RgbImage {
    let mut slot = slot_with(entry);
    let badge = render_badge(amount);
    for (x, y, px) in badge.enumerate_pixels() {
        slot.put_pixel(AMOUNT_BOX.x0 + x, AMOUNT_BOX.y0 + y, *px);
    }
    slot
}

fn in_rect(x: u32, y: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> bool {
    x >= x0 && x < x1 && y >= y0 && y < y1
}

/// Pixels of one glyph in a `glyph_width(c)` x 25 cell. `#` is a comb that
/// matches no digit.
fn glyph_pixels(c: char) -> Vec<(u32, u32)> {
    let mid = (GLYPH_H - STROKE) / 2;
    let bottom = GLYPH_H - STROKE;
    let right = GLYPH_W - STROKE;
    let segments: &[char] = match c {
        '0' => &['a', 'b', 'c', 'd', 'e', 'f'],
        '1' => &['b', 'c'],
        '2' => &['a', 'b', 'g', 'e', 'd'],
        '3' => &['a', 'b', 'g', 'c', 'd'],
        '4' => &['a', 'f', 'b', 'g', 'c'],
        '5' => &['a', 'f', 'g', 'c', 'd'],
        '6' => &['a', 'f', 'g', 'e', 'c', 'd'],
        '7' => &['a', 'z'],
        '8' => &['a', 'b', 'c', 'd', 'e', 'f', 'g'],
        '9' => &['a', 'b', 'c', 'd', 'f', 'g'],
        _ => &['#'],
    };

    let mut pixels = Vec::new();
    let width = glyph_width(c);
    for y in 0..GLYPH_H {
        for x in 0..width {
            let on = segments.iter().any(|&seg| match seg {
                'a' => in_rect(x, y, 0, 0, GLYPH_W, STROKE),
                'g' => in_rect(x, y, 0, mid, GLYPH_W, mid + STROKE),
                'd' => in_rect(x, y, 0, bottom, GLYPH_W, GLYPH_H),
                'f' => in_rect(x, y, 0, 0, STROKE, mid + STROKE),
                'b' => in_rect(x, y, right, 0, GLYPH_W, mid + STROKE),
                'e' => in_rect(x, y, 0, mid, STROKE, GLYPH_H),
                'c' => in_rect(x, y, right, mid, GLYPH_W, GLYPH_H),
                // Diagonal stroke of the 7, top right to bottom left
                'z' => {
                    y >= STROKE && {
                        let centre = 7.5 - (y - STROKE) as f32 * 6.0 / 22.0;
                        (x as f32 + 0.5 - centre).abs() <= 1.5
                    }
                }
                // Comb: top bar and three teeth
                _ => y < STROKE || x % 4 < 2,
            });
            if on {
                pixels.push((x, y));
            }
        }
    }
    pixels
}

fn glyph_width(c: char) -> u32 {
    if c.is_ascii_digit() { GLYPH_W } else { COMB_W }
}

/// Quantity badge exactly the size of the amount crop, text right-aligned.
pub fn render_badge(text: &str) -> RgbImage {
    let mut badge = RgbImage::from_pixel(AMOUNT_BOX.width(), AMOUNT_BOX.height(), BADGE_BG);
    let count = text.chars().count() as u32;
    let total: u32 =
        text.chars().map(glyph_width).sum::<u32>() + GLYPH_GAP * count.saturating_sub(1);
    let mut x0 = badge.width() - BADGE_RIGHT_MARGIN - total;
    for c in text.chars() {
        for (x, y) in glyph_pixels(c) {
            badge.put_pixel(x0 + x, GLYPH_TOP + y, INK_WHITE);
        }
        x0 += glyph_width(c) + GLYPH_GAP;
    }
    badge
}

/// Lightens the leftmost `width` columns, like the hover overlay in game.
pub fn shade_left_band(badge: &mut RgbImage, width: u32) {
    for y in 0..badge.height() {
        for x in 0..width.min(badge.width()) {
            badge.put_pixel(x, y, Rgb([120, 120, 120]));
        }
    }
}

fn paint_probes(frame: &mut RgbImage, probes: &[crate::scan::detection::ColorProbe]) {
    use crate::scan::detection::ProbeExpect;
    for probe in probes {
        let (x, y) = probe.at;
        let rgb = match probe.expect {
            ProbeExpect::Matches(rgb) => rgb,
            ProbeExpect::DiffersFrom(_) => [128, 0, 128],
        };
        frame.put_pixel(x, y, Rgb(rgb));
    }
}

/// Builds a canonical-size depot page.
pub struct PageBuilder {
    frame: RgbImage,
    anchor: GridAnchor,
    filtered: bool,
    final_page: bool,
}

impl PageBuilder {
    pub fn new(anchor: GridAnchor) -> Self {
        Self {
            frame: RgbImage::from_pixel(CANONICAL_WIDTH, CANONICAL_HEIGHT, PAGE_BG),
            anchor,
            filtered: false,
            final_page: false,
        }
    }

    /// Puts `entry` into a slot with a quantity badge showing `amount`.
    pub fn slot(mut self, column: usize, row: usize, entry: &CatalogEntry, amount: &str) -> Self {
        let (cx, cy) = slot_center(self.anchor, column, row);
        let reference = entry.reference_image();
        paint_rgb(
            &mut self.frame,
            &reference,
            cx - reference.width() / 2,
            cy - reference.height() / 2,
        );

        let (ox, oy) = slot_origin(self.anchor, column, row);
        let badge = render_badge(amount);
        for (x, y, px) in badge.enumerate_pixels() {
            self.frame.put_pixel(ox + AMOUNT_BOX.x0 + x, oy + AMOUNT_BOX.y0 + y, *px);
        }
        self
    }

    /// Fills slots column-major starting at `first`, one per entry.
    pub fn slots<'a>(
        mut self,
        first: usize,
        items: impl IntoIterator<Item = (&'a CatalogEntry, String)>,
    ) -> Self {
        use crate::scan::layout::GRID_ROWS;
        for (i, (entry, amount)) in items.into_iter().enumerate() {
            let index = first + i;
            self = self.slot(index / GRID_ROWS, index % GRID_ROWS, entry, &amount);
        }
        self
    }

    pub fn filtered(mut self) -> Self {
        self.filtered = true;
        self
    }

    pub fn final_page(mut self) -> Self {
        self.final_page = true;
        self
    }

    pub fn build(mut self) -> CaptureFrame {
        use crate::scan::detection::{DEPOT_END_PROBES, DEPOT_FILTERED_PROBES, DEPOT_PROBES};
        if self.filtered {
            paint_probes(&mut self.frame, &DEPOT_FILTERED_PROBES);
        } else {
            paint_probes(&mut self.frame, &DEPOT_PROBES);
        }
        let end = if self.final_page { Rgb([230, 230, 230]) } else { Rgb([90, 90, 90]) };
        for &(x, y) in &DEPOT_END_PROBES {
            self.frame.put_pixel(x, y, end);
        }
        self.frame
    }
}

pub fn main_menu() -> CaptureFrame {
    let mut frame = RgbImage::from_pixel(CANONICAL_WIDTH, CANONICAL_HEIGHT, Rgb([20, 30, 40]));
    paint_probes(&mut frame, &crate::scan::detection::MAIN_MENU_PROBES);
    frame
}

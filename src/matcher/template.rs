//! Reference templates with focus masks.

use image::{GrayImage, Luma, RgbaImage, imageops};

use crate::catalog::CatalogEntry;

/// Width of the half-weight band along the canvas edge used when an entry
/// has no tier frame. Tier colours live there.
pub const FOCUS_RING: u32 = 4;

/// Mask weight for frame-only or ring pixels.
const HALF_WEIGHT: u8 = 127;

/// One weighted template pixel.
#[derive(Clone, Copy, Debug)]
pub(crate) struct WeightedPixel {
    pub x: u32,
    pub y: u32,
    pub weight: f64,
    pub rgb: [f64; 3],
}

/// Precomputed data for masked correlation against one catalog entry.
#[derive(Clone, Debug)]
pub struct Template {
    width: u32,
    height: u32,
    /// Only pixels with non-zero weight.
    pixels: Vec<WeightedPixel>,
    /// Sum of weight * T^2 over all channels.
    energy: f64,
}

impl Template {
    pub fn from_entry(entry: &CatalogEntry) -> Self {
        let reference = entry.reference_image();
        let mask = focus_mask(entry);
        Self::from_parts(&reference, &mask)
    }

    /// Builds a template from a reference image and a 0-255 focus mask of the
    /// same size. Weights are the squared normalised mask values.
    pub fn from_parts(reference: &RgbaImage, mask: &GrayImage) -> Self {
        let (width, height) = reference.dimensions();
        let mut pixels = Vec::new();
        let mut energy = 0.0;

        for (x, y, px) in reference.enumerate_pixels() {
            let m = mask.get_pixel(x, y)[0] as f64 / 255.0;
            if m <= 0.0 {
                continue;
            }
            let weight = m * m;
            let rgb = [px[0] as f64, px[1] as f64, px[2] as f64];
            energy += weight * (rgb[0] * rgb[0] + rgb[1] * rgb[1] + rgb[2] * rgb[2]);
            pixels.push(WeightedPixel { x, y, weight, rgb });
        }

        Self {
            width,
            height,
            pixels,
            energy,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub(crate) fn pixels(&self) -> &[WeightedPixel] {
        &self.pixels
    }

    pub(crate) fn energy(&self) -> f64 {
        self.energy
    }
}

/// Focus mask over the reference canvas.
///
/// Each pixel takes the larger of the icon's own alpha and half weight for
/// the frame region (frame alpha / 2). Without a frame, a [`FOCUS_RING`]
/// wide band along the edge stands in for it.
pub fn focus_mask(entry: &CatalogEntry) -> GrayImage {
    let (ox, oy) = entry.icon_offset();
    let icon = &entry.icon;

    let (width, height) = match &entry.frame {
        Some(frame) => frame.dimensions(),
        None => icon.dimensions(),
    };
    let mut mask = GrayImage::new(width, height);
    imageops::replace(&mut mask, &alpha_channel(icon), ox as i64, oy as i64);

    for (x, y, px) in mask.enumerate_pixels_mut() {
        let secondary = match &entry.frame {
            Some(frame) => frame.get_pixel(x, y)[3] / 2,
            None if in_ring(x, y, width, height) => HALF_WEIGHT,
            None => 0,
        };
        *px = Luma([px[0].max(secondary)]);
    }
    mask
}

fn alpha_channel(img: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| Luma([img.get_pixel(x, y)[3]]))
}

fn in_ring(x: u32, y: u32, width: u32, height: u32) -> bool {
    x < FOCUS_RING
        || y < FOCUS_RING
        || x + FOCUS_RING >= width
        || y + FOCUS_RING >= height
}

use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage, imageops};

/// Ink value in binarised images (black text on white).
pub const INK: u8 = 0;
/// Background value in binarised images.
pub const PAPER: u8 = 255;

/// Upscale factor applied to quantity crops before segmentation.
pub const UPSCALE: u32 = 4;

/// Absolute pixel rectangle, `x1`/`y1` exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelRect {
    pub const fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }
}

/// Which pixels count as digit ink: nearly grey and bright.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InkThreshold {
    pub max_saturation: u8,
    pub min_value: u8,
}

impl Default for InkThreshold {
    fn default() -> Self {
        Self {
            max_saturation: 10,
            min_value: 210,
        }
    }
}

/// HSV saturation and value of a pixel, both scaled to 0-255.
pub fn saturation_value(px: &Rgb<u8>) -> (u8, u8) {
    let max = px[0].max(px[1]).max(px[2]);
    let min = px[0].min(px[1]).min(px[2]);
    if max == 0 {
        return (0, 0);
    }
    let saturation = ((max - min) as u32 * 255 / max as u32) as u8;
    (saturation, max)
}

/// Converts the image to binary by keeping only low-saturation bright pixels.
///
/// Matching pixels become black (ink), everything else white. The badge
/// background is dark and coloured overlays are saturated, so only the
/// white digits survive.
pub fn binarize_ink(img: &RgbImage, threshold: InkThreshold) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut output = ImageBuffer::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        let (s, v) = saturation_value(pixel);
        let value = if s <= threshold.max_saturation && v >= threshold.min_value {
            INK
        } else {
            PAPER
        };
        output.put_pixel(x, y, Luma([value]));
    }

    output
}

/// Crops an absolute rectangle, clamped to the image bounds.
pub fn crop_rect(img: &RgbImage, rect: PixelRect) -> RgbImage {
    let (w, h) = img.dimensions();

    let x0 = rect.x0.min(w);
    let y0 = rect.y0.min(h);
    let rw = rect.width().min(w - x0);
    let rh = rect.height().min(h - y0);

    imageops::crop_imm(img, x0, y0, rw, rh).to_image()
}

/// Bicubic (Catmull-Rom) upscale by an integer factor.
pub fn upscale(img: &RgbImage, factor: u32) -> RgbImage {
    imageops::resize(
        img,
        img.width() * factor,
        img.height() * factor,
        imageops::FilterType::CatmullRom,
    )
}

/// Removes a darkening overlay band from the left of a quantity badge.
///
/// Scans columns left to right and cuts at the first column where every row
/// is strictly darker (HSV value) than in the previous column. Returns the
/// image unchanged when no such edge exists.
pub fn cut_overlay(img: &RgbImage) -> RgbImage {
    let (width, height) = img.dimensions();
    if height == 0 {
        return img.clone();
    }

    let mut previous = vec![0u8; height as usize];
    for x in 0..width {
        let column: Vec<u8> = (0..height)
            .map(|y| saturation_value(img.get_pixel(x, y)).1)
            .collect();
        if column.iter().zip(&previous).all(|(v, p)| v < p) {
            return imageops::crop_imm(img, x, 0, width - x, height).to_image();
        }
        previous = column;
    }
    img.clone()
}

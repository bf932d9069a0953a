//! Depot grid geometry at the canonical 1641x923 client resolution.
//!
//! The depot scrolls horizontally. A page shows 7 columns of 3 slots and
//! items fill each column top to bottom before moving right, so slots are
//! numbered column-major: `index = column * GRID_ROWS + row`.

use image::{RgbImage, imageops};

use crate::capture::{CaptureFrame, Point};
use crate::ocr::PixelRect;

pub const CANONICAL_WIDTH: u32 = 1641;
pub const CANONICAL_HEIGHT: u32 = 923;

pub const GRID_COLUMNS: usize = 7;
pub const GRID_ROWS: usize = 3;
pub const SLOTS_PER_PAGE: usize = GRID_COLUMNS * GRID_ROWS;

/// Centre of the top-left slot on a page scrolled from the start.
pub const FIRST_SLOT_CENTER: (u32, u32) = (160, 240);
/// Centre of the top-left slot when the depot is scrolled to its end.
pub const FIRST_SLOT_CENTER_AT_END: (u32, u32) = (269, 240);
/// Distance between neighbouring slot centres.
pub const SLOT_PITCH: (u32, u32) = (199, 243);
/// Half the side of the square cut around each slot centre.
pub const SLOT_RADIUS: u32 = 120;

/// Quantity badge inside a slot image.
pub const AMOUNT_BOX: PixelRect = PixelRect::new(118, 157, 181, 192);

/// Drag that scrolls one page: right to left across the grid.
pub const SCROLL_LINE_START: Point = Point::new(1450, 360);
pub const SCROLL_LINE_END: Point = Point::new(25, 360);

/// Which edge the grid is aligned to on the current page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridAnchor {
    Start,
    End,
}

impl GridAnchor {
    fn first_center(self) -> (u32, u32) {
        match self {
            GridAnchor::Start => FIRST_SLOT_CENTER,
            GridAnchor::End => FIRST_SLOT_CENTER_AT_END,
        }
    }
}

/// One slot cut from a page.
#[derive(Clone, Debug)]
pub struct SlotBox {
    pub column: usize,
    pub row: usize,
    pub image: RgbImage,
}

impl SlotBox {
    pub fn is_top_row(&self) -> bool {
        self.row == 0
    }
}

pub fn slot_center(anchor: GridAnchor, column: usize, row: usize) -> (u32, u32) {
    let (x, y) = anchor.first_center();
    (
        x + column as u32 * SLOT_PITCH.0,
        y + row as u32 * SLOT_PITCH.1,
    )
}

/// Top-left corner of a slot's square.
pub fn slot_origin(anchor: GridAnchor, column: usize, row: usize) -> (u32, u32) {
    let (x, y) = slot_center(anchor, column, row);
    (x - SLOT_RADIUS, y - SLOT_RADIUS)
}

/// Cuts every slot of a page, in scan (column-major) order.
pub fn slice_page(frame: &CaptureFrame, anchor: GridAnchor) -> Vec<SlotBox> {
    let side = SLOT_RADIUS * 2;
    let mut slots = Vec::with_capacity(SLOTS_PER_PAGE);
    for column in 0..GRID_COLUMNS {
        for row in 0..GRID_ROWS {
            let (x, y) = slot_origin(anchor, column, row);
            let image = imageops::crop_imm(frame, x, y, side, side).to_image();
            slots.push(SlotBox { column, row, image });
        }
    }
    slots
}

/// The quantity badge of a slot.
pub fn amount_crop(slot: &RgbImage) -> RgbImage {
    crate::ocr::preprocess::crop_rect(slot, AMOUNT_BOX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_slice_page_is_column_major() {
        let frame = RgbImage::from_fn(CANONICAL_WIDTH, CANONICAL_HEIGHT, |x, y| {
            Rgb([(x / 199) as u8, (y / 243) as u8, 0])
        });
        let slots = slice_page(&frame, GridAnchor::Start);

        assert_eq!(slots.len(), SLOTS_PER_PAGE);
        assert!(slots.iter().all(|s| s.image.dimensions() == (240, 240)));
        for (i, slot) in slots.iter().enumerate() {
            assert_eq!(slot.column * GRID_ROWS + slot.row, i);
        }
        assert_eq!((slots[1].column, slots[1].row), (0, 1));
        assert_eq!((slots[3].column, slots[3].row), (1, 0));
        assert!(slots[3].is_top_row());
    }

    #[test]
    fn test_slot_geometry() {
        assert_eq!(slot_center(GridAnchor::Start, 0, 0), (160, 240));
        assert_eq!(slot_center(GridAnchor::Start, 6, 2), (160 + 6 * 199, 240 + 2 * 243));
        assert_eq!(slot_origin(GridAnchor::End, 0, 0), (149, 120));
        // Every slot fits inside the canonical frame
        for anchor in [GridAnchor::Start, GridAnchor::End] {
            let (x, y) = slot_origin(anchor, GRID_COLUMNS - 1, GRID_ROWS - 1);
            assert!(x + 2 * SLOT_RADIUS <= CANONICAL_WIDTH);
            assert!(y + 2 * SLOT_RADIUS <= CANONICAL_HEIGHT);
        }
    }

    #[test]
    fn test_amount_crop_size() {
        let slot = RgbImage::new(240, 240);
        assert_eq!(amount_crop(&slot).dimensions(), (63, 35));
    }
}

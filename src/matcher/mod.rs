//! Masked template matching of depot slots against catalog entries.
//!
//! Templates are built once per catalog entry when the matcher is created;
//! scoring a slot is then a pure function of the slot image and the entry.

pub mod correlate;
pub mod template;

use image::{RgbImage, imageops};

use crate::catalog::{Catalog, EntryId};

pub use template::{FOCUS_RING, Template, focus_mask};

pub struct Matcher {
    templates: Vec<Template>,
    search_radius: Option<u32>,
    display_scale: f32,
}

impl Matcher {
    /// Precomputes a template for every catalog entry.
    ///
    /// `search_radius` bounds the translation searched around the slot
    /// centre; `None` tries every placement inside the slot.
    /// `display_scale` is the emulator's UI scale relative to the reference
    /// art; slot images are divided by it before matching.
    pub fn new(catalog: &Catalog, search_radius: Option<u32>, display_scale: f32) -> Self {
        let templates = catalog.entries().iter().map(Template::from_entry).collect();
        Self {
            templates,
            search_radius,
            display_scale,
        }
    }

    /// Confidence in `[0, 1]` that `region` shows `entry`.
    pub fn confidence(&self, region: &RgbImage, entry: EntryId) -> f32 {
        let Some(template) = self.templates.get(entry.0) else {
            return 0.0;
        };
        if (self.display_scale - 1.0).abs() > f32::EPSILON && self.display_scale > 0.0 {
            let scaled = imageops::resize(
                region,
                (region.width() as f32 / self.display_scale).round() as u32,
                (region.height() as f32 / self.display_scale).round() as u32,
                imageops::FilterType::Triangle,
            );
            return correlate::best_alignment(&scaled, template, self.search_radius);
        }
        correlate::best_alignment(region, template, self.search_radius)
    }

    pub fn is_match(&self, region: &RgbImage, entry: EntryId, threshold: f32) -> bool {
        self.confidence(region, entry) > threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[test]
    fn test_slot_with_icon_matches_only_its_entry() {
        let catalog = testutil::catalog(&["a", "b"]);
        let matcher = Matcher::new(&catalog, Some(4), 1.0);
        let a = catalog.by_key("a").unwrap();
        let b = catalog.by_key("b").unwrap();

        let slot = testutil::slot_with(a);
        assert!(matcher.confidence(&slot, a.id) > 0.999);
        assert!(matcher.is_match(&slot, a.id, 0.95));
        assert!(!matcher.is_match(&slot, b.id, 0.95));
    }

    #[test]
    fn test_empty_slot_is_rejected() {
        let catalog = testutil::catalog(&["a"]);
        let matcher = Matcher::new(&catalog, Some(4), 1.0);
        let slot = testutil::empty_slot();
        assert!(matcher.confidence(&slot, EntryId(0)) < 0.95);
        assert_eq!(matcher.confidence(&slot, EntryId(7)), 0.0);
    }

    #[test]
    fn test_noise_slot_rejected_for_every_entry() {
        let catalog = testutil::numbered_catalog(12);
        let matcher = Matcher::new(&catalog, Some(16), 1.0);
        for seed in 0..3 {
            let slot = testutil::noise_slot(seed);
            for entry in catalog.entries() {
                let score = matcher.confidence(&slot, entry.id);
                assert!(score < 0.95, "{} scored {} on noise", entry.key, score);
            }
        }
    }

    #[test]
    fn test_display_scale_shrinks_slot() {
        let catalog = testutil::catalog(&["a"]);
        let scaled = Matcher::new(&catalog, Some(4), 2.0);
        let unscaled = Matcher::new(&catalog, Some(4), 1.0);
        // A slot rendered at 2x UI scale
        let slot = testutil::slot_with(catalog.entry(EntryId(0)));
        let doubled = imageops::resize(
            &slot,
            slot.width() * 2,
            slot.height() * 2,
            imageops::FilterType::Nearest,
        );
        assert!(scaled.confidence(&doubled, EntryId(0)) > unscaled.confidence(&doubled, EntryId(0)));
    }
}

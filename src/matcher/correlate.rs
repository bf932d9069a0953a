//! Masked normalised cross-correlation.

use image::RgbImage;

use super::template::Template;

/// Best masked correlation of `template` inside `region`, searching every
/// placement within `radius` pixels of the centred one, or every placement
/// in the region when `radius` is `None`.
///
/// At each placement the score is
/// `sum(w*T*I) / sqrt(sum(w*T^2) * sum(w*I^2))` over the three channels,
/// where `w` is the squared mask. The result is in `[0, 1]`; a region equal
/// to the reference under the mask scores 1.0. Returns 0.0 when the
/// template does not fit in the region.
pub fn best_alignment(region: &RgbImage, template: &Template, radius: Option<u32>) -> f32 {
    let (rw, rh) = region.dimensions();
    let (tw, th) = template.dimensions();
    if tw > rw || th > rh || template.energy() <= 0.0 {
        return 0.0;
    }

    let (x_min, x_max) = search_range(rw, tw, radius);
    let (y_min, y_max) = search_range(rh, th, radius);

    let mut best = 0.0f64;
    for oy in y_min..=y_max {
        for ox in x_min..=x_max {
            let score = score_at(region, template, ox, oy);
            if score > best {
                best = score;
            }
        }
    }
    best.clamp(0.0, 1.0) as f32
}

/// Inclusive offset range around the centred placement, clamped so the
/// template stays inside the region.
fn search_range(region_len: u32, template_len: u32, radius: Option<u32>) -> (u32, u32) {
    let slack = region_len - template_len;
    let Some(radius) = radius else {
        return (0, slack);
    };
    let centre = slack / 2;
    (centre.saturating_sub(radius), centre.saturating_add(radius).min(slack))
}

fn score_at(region: &RgbImage, template: &Template, ox: u32, oy: u32) -> f64 {
    let mut cross = 0.0;
    let mut region_energy = 0.0;
    for p in template.pixels() {
        let px = region.get_pixel(ox + p.x, oy + p.y);
        let i = [px[0] as f64, px[1] as f64, px[2] as f64];
        cross += p.weight * (p.rgb[0] * i[0] + p.rgb[1] * i[1] + p.rgb[2] * i[2]);
        region_energy += p.weight * (i[0] * i[0] + i[1] * i[1] + i[2] * i[2]);
    }

    let denom = (template.energy() * region_energy).sqrt();
    if denom <= f64::EPSILON {
        return 0.0;
    }
    cross / denom
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, Rgba, RgbaImage};

    fn checker_template(size: u32) -> (RgbaImage, Template) {
        let reference = RgbaImage::from_fn(size, size, |x, y| {
            if (x / 2 + y / 2) % 2 == 0 {
                Rgba([220, 40, 90, 255])
            } else {
                Rgba([20, 180, 60, 255])
            }
        });
        let mask = GrayImage::from_pixel(size, size, Luma([255]));
        let template = Template::from_parts(&reference, &mask);
        (reference, template)
    }

    #[test]
    fn test_search_range_clamps() {
        assert_eq!(search_range(240, 200, Some(10)), (10, 30));
        assert_eq!(search_range(240, 236, Some(10)), (0, 4));
        assert_eq!(search_range(20, 20, Some(5)), (0, 0));
        assert_eq!(search_range(240, 200, None), (0, 40));
    }

    #[test]
    fn test_exact_region_scores_one() {
        let (reference, template) = checker_template(12);
        let region = image::DynamicImage::ImageRgba8(reference).to_rgb8();
        let score = best_alignment(&region, &template, Some(3));
        assert!(score > 0.999_999, "score = {}", score);
    }

    #[test]
    fn test_finds_shifted_placement() {
        let (reference, template) = checker_template(12);
        let mut region = RgbImage::from_pixel(30, 30, Rgb([0, 0, 0]));
        // Centred placement is (9, 9); put the pattern at (11, 8)
        for (x, y, px) in reference.enumerate_pixels() {
            region.put_pixel(11 + x, 8 + y, Rgb([px[0], px[1], px[2]]));
        }
        assert!(best_alignment(&region, &template, Some(3)) > 0.999_999);
        assert!(best_alignment(&region, &template, Some(0)) < 0.95);
    }

    #[test]
    fn test_unbounded_search_reaches_region_corner() {
        let (reference, template) = checker_template(12);
        let mut region = RgbImage::from_pixel(30, 30, Rgb([0, 0, 0]));
        for (x, y, px) in reference.enumerate_pixels() {
            region.put_pixel(x, 18 + y, Rgb([px[0], px[1], px[2]]));
        }
        assert!(best_alignment(&region, &template, None) > 0.999_999);
        assert!(best_alignment(&region, &template, Some(3)) < 0.95);
    }

    #[test]
    fn test_flat_region_scores_below_threshold() {
        let (_, template) = checker_template(12);
        let region = RgbImage::from_pixel(16, 16, Rgb([120, 110, 75]));
        assert!(best_alignment(&region, &template, Some(2)) < 0.95);

        let black = RgbImage::new(16, 16);
        assert_eq!(best_alignment(&black, &template, Some(2)), 0.0);
    }

    #[test]
    fn test_template_larger_than_region() {
        let (_, template) = checker_template(12);
        let region = RgbImage::new(8, 8);
        assert_eq!(best_alignment(&region, &template, Some(2)), 0.0);
    }
}

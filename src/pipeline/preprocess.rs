//! Page pre-processing: grayscale + adaptive Gaussian binarisation.
//!
//! Scans come with uneven lighting, paper tint and bleed-through. A single
//! global threshold either erases faint strokes or floods shadows, so each
//! pixel is compared against a Gaussian-weighted mean of its own
//! neighbourhood instead:
//!
//! ```text
//! dst(x, y) = 255  if src(x, y) − mean(x, y) > −offset
//!             0    otherwise
//! ```
//!
//! Uniform regions (blank paper, solid fills) therefore come out white and
//! only local dark detail such as glyph strokes survives as black. The same
//! parameters are applied to every page.

use crate::config::ThresholdParams;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;
use imageproc::map::map_colors2;
use tracing::debug;

const WHITE: Luma<u8> = Luma([255]);
const BLACK: Luma<u8> = Luma([0]);

/// Convert any decoded page to 8-bit luma.
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}

/// Binarise a grayscale image against its Gaussian-weighted local mean.
pub fn adaptive_gaussian_threshold(gray: &GrayImage, params: &ThresholdParams) -> GrayImage {
    if gray.width() == 0 || gray.height() == 0 {
        return gray.clone();
    }

    let local_mean = gaussian_blur_f32(gray, params.sigma());
    let offset = params.offset;

    map_colors2(gray, &local_mean, |src, mean| {
        if i32::from(src[0]) - i32::from(mean[0]) > -offset {
            WHITE
        } else {
            BLACK
        }
    })
}

/// Full pre-processing step: grayscale, then adaptive Gaussian threshold.
pub fn binarize(image: &DynamicImage, params: &ThresholdParams) -> GrayImage {
    let gray = to_grayscale(image);
    let binary = adaptive_gaussian_threshold(&gray, params);
    debug!(
        "Binarised {}x{} page (block={}, offset={})",
        binary.width(),
        binary.height(),
        params.block_size,
        params.offset
    );
    binary
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn white_page_with_black_square() -> GrayImage {
        let mut img = GrayImage::from_pixel(60, 60, Luma([250]));
        for y in 25..35 {
            for x in 25..35 {
                img.put_pixel(x, y, Luma([5]));
            }
        }
        img
    }

    #[test]
    fn output_is_strictly_binary() {
        let mut gradient = GrayImage::new(64, 16);
        for (x, _, p) in gradient.enumerate_pixels_mut() {
            *p = Luma([(x * 4) as u8]);
        }
        let out = adaptive_gaussian_threshold(&gradient, &ThresholdParams::default());
        assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
        assert_eq!(out.dimensions(), gradient.dimensions());
    }

    #[test]
    fn uniform_regions_become_white() {
        let params = ThresholdParams::default();
        for level in [0u8, 128, 255] {
            let flat = GrayImage::from_pixel(32, 32, Luma([level]));
            let out = adaptive_gaussian_threshold(&flat, &params);
            assert!(
                out.pixels().all(|p| p[0] == 255),
                "flat level {level} should binarise to white"
            );
        }
    }

    #[test]
    fn dark_detail_on_light_paper_stays_black() {
        let out = adaptive_gaussian_threshold(&white_page_with_black_square(), &ThresholdParams::default());
        // Edges of the square sit against bright paper, well past the offset.
        assert_eq!(out.get_pixel(25, 30)[0], 0);
        assert_eq!(out.get_pixel(34, 30)[0], 0);
        // Paper far from the square is white.
        assert_eq!(out.get_pixel(2, 2)[0], 255);
        assert_eq!(out.get_pixel(57, 57)[0], 255);
    }

    #[test]
    fn faint_detail_below_offset_is_dropped() {
        let mut img = GrayImage::from_pixel(40, 40, Luma([200]));
        img.put_pixel(20, 20, Luma([190]));
        let out = adaptive_gaussian_threshold(&img, &ThresholdParams::default());
        assert_eq!(out.get_pixel(20, 20)[0], 255);
    }

    #[test]
    fn binarize_accepts_colour_input() {
        let rgb = RgbImage::from_pixel(20, 10, Rgb([240, 230, 220]));
        let out = binarize(&DynamicImage::ImageRgb8(rgb), &ThresholdParams::default());
        assert_eq!(out.dimensions(), (20, 10));
        assert!(out.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn empty_image_passes_through() {
        let empty = GrayImage::new(0, 0);
        let out = adaptive_gaussian_threshold(&empty, &ThresholdParams::default());
        assert_eq!(out.dimensions(), (0, 0));
    }
}

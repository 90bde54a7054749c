//! Pixel-level transforms used by the detection pipeline.

use nalgebra::Point2;

use crate::image::{ColorImage, ColorImageView, GrayImage, GrayImageView, ImageError};

/// Convert one RGB pixel to YCrCb (BT.601, the OpenCV convention).
#[inline]
pub fn rgb_to_ycrcb(rgb: [u8; 3]) -> [u8; 3] {
    let r = rgb[0] as f32;
    let g = rgb[1] as f32;
    let b = rgb[2] as f32;
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cr = (r - y) * 0.713 + 128.0;
    let cb = (b - y) * 0.564 + 128.0;
    [
        y.clamp(0.0, 255.0) as u8,
        cr.clamp(0.0, 255.0) as u8,
        cb.clamp(0.0, 255.0) as u8,
    ]
}

/// Binary mask of pixels whose channels all fall inside `[low, high]`.
pub fn in_range(frame: &ColorImageView<'_>, low: [f32; 3], high: [f32; 3]) -> GrayImage {
    let mut mask = GrayImage::zeros(frame.width, frame.height);
    for y in 0..frame.height {
        for x in 0..frame.width {
            let px = frame.pixel(x as i32, y as i32);
            let inside = (0..3).all(|i| {
                let v = px[i] as f32;
                v >= low[i] && v <= high[i]
            });
            if inside {
                mask.set(x, y, 255);
            }
        }
    }
    mask
}

/// Pixel-wise AND of two binary masks.
pub fn intersect_masks(
    a: &GrayImageView<'_>,
    b: &GrayImageView<'_>,
) -> Result<GrayImage, ImageError> {
    if a.width != b.width || a.height != b.height {
        return Err(ImageError::SizeMismatch {
            a_width: a.width,
            a_height: a.height,
            b_width: b.width,
            b_height: b.height,
        });
    }
    let mut out = GrayImage::zeros(a.width, a.height);
    for (idx, v) in out.data.iter_mut().enumerate() {
        if a.data[idx] != 0 && b.data[idx] != 0 {
            *v = 255;
        }
    }
    Ok(out)
}

/// Morphological open with a 3x3 box element (erode then dilate).
///
/// Removes isolated speckle without shrinking larger regions.
pub fn morph_open(mask: &GrayImageView<'_>) -> GrayImage {
    let eroded = erode3(mask);
    dilate3(&eroded.view())
}

fn erode3(mask: &GrayImageView<'_>) -> GrayImage {
    let mut out = GrayImage::zeros(mask.width, mask.height);
    for y in 0..mask.height as i32 {
        for x in 0..mask.width as i32 {
            let mut keep = true;
            'win: for dy in -1..=1 {
                for dx in -1..=1 {
                    if !mask.is_set(x + dx, y + dy) {
                        keep = false;
                        break 'win;
                    }
                }
            }
            if keep {
                out.set(x as usize, y as usize, 255);
            }
        }
    }
    out
}

fn dilate3(mask: &GrayImageView<'_>) -> GrayImage {
    let mut out = GrayImage::zeros(mask.width, mask.height);
    for y in 0..mask.height as i32 {
        for x in 0..mask.width as i32 {
            let mut hit = false;
            'win: for dy in -1..=1 {
                for dx in -1..=1 {
                    if mask.is_set(x + dx, y + dy) {
                        hit = true;
                        break 'win;
                    }
                }
            }
            if hit {
                out.set(x as usize, y as usize, 255);
            }
        }
    }
    out
}

/// 3x3 box blur. Border pixels average over the in-bounds neighborhood only.
pub fn box_blur_mask(mask: &GrayImageView<'_>) -> GrayImage {
    let mut out = GrayImage::zeros(mask.width, mask.height);
    for y in 0..mask.height as i32 {
        for x in 0..mask.width as i32 {
            let mut sum = 0u32;
            let mut count = 0u32;
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let nx = x + dx;
                    let ny = y + dy;
                    if nx >= 0 && ny >= 0 && nx < mask.width as i32 && ny < mask.height as i32 {
                        sum += mask.get(nx, ny) as u32;
                        count += 1;
                    }
                }
            }
            out.set(x as usize, y as usize, (sum / count) as u8);
        }
    }
    out
}

/// Re-binarize a grayscale image: pixels `>= threshold` become 255.
pub fn threshold_mask(gray: &GrayImageView<'_>, threshold: u8) -> GrayImage {
    let mut out = GrayImage::zeros(gray.width, gray.height);
    for (idx, v) in out.data.iter_mut().enumerate() {
        if gray.data[idx] >= threshold {
            *v = 255;
        }
    }
    out
}

/// Nearest-neighbor resize to a fixed height, preserving aspect ratio.
///
/// Returns the resized frame and the scale factor actually applied
/// (`target_height / source_height`). Callers map detected coordinates back
/// to the source frame by multiplying with the inverse of this factor.
pub fn resize_color_to_height(
    frame: &ColorImageView<'_>,
    target_height: usize,
) -> (ColorImage, f32) {
    if frame.height == target_height {
        let owned = ColorImage {
            width: frame.width,
            height: frame.height,
            data: frame.data.to_vec(),
        };
        return (owned, 1.0);
    }
    let ratio = target_height as f32 / frame.height as f32;
    let target_width = ((frame.width as f32 * ratio).round() as usize).max(1);

    let mut out = ColorImage::zeros(target_width, target_height);
    for y in 0..target_height {
        let sy = ((y as f32 / ratio) as i32).min(frame.height as i32 - 1);
        for x in 0..target_width {
            let sx = ((x as f32 / ratio) as i32).min(frame.width as i32 - 1);
            out.set_pixel(x, y, frame.pixel(sx, sy));
        }
    }
    (out, ratio)
}

/// Fill a closed polygon into `mask` (even-odd rule, set pixels to 255).
///
/// Scanlines are evaluated at pixel centers (`y + 0.5`) so polygon vertices
/// landing exactly on a row do not double-count.
pub fn fill_polygon(mask: &mut GrayImage, polygon: &[Point2<i32>]) {
    if polygon.len() < 3 {
        return;
    }
    let min_y = polygon.iter().map(|p| p.y).min().unwrap_or(0).max(0);
    let max_y = polygon
        .iter()
        .map(|p| p.y)
        .max()
        .unwrap_or(0)
        .min(mask.height as i32 - 1);

    let n = polygon.len();
    let mut crossings: Vec<f64> = Vec::with_capacity(8);
    for y in min_y..=max_y {
        let scan = y as f64 + 0.5;
        crossings.clear();
        for i in 0..n {
            let a = polygon[i];
            let b = polygon[(i + 1) % n];
            let (ay, by) = (a.y as f64, b.y as f64);
            if (ay <= scan && by > scan) || (by <= scan && ay > scan) {
                let t = (scan - ay) / (by - ay);
                crossings.push(a.x as f64 + t * (b.x as f64 - a.x as f64));
            }
        }
        crossings.sort_by(|p, q| p.partial_cmp(q).expect("finite crossing"));
        for pair in crossings.chunks_exact(2) {
            let x0 = pair[0].ceil().max(0.0) as usize;
            let x1 = (pair[1].floor() as i64).min(mask.width as i64 - 1);
            for x in x0 as i64..=x1 {
                if x >= 0 {
                    mask.set(x as usize, y as usize, 255);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn frame_of(width: usize, height: usize, px: [u8; 3]) -> ColorImage {
        let mut im = ColorImage::zeros(width, height);
        for y in 0..height {
            for x in 0..width {
                im.set_pixel(x, y, px);
            }
        }
        im
    }

    #[test]
    fn in_range_selects_matching_pixels() {
        let mut im = frame_of(4, 4, [10, 10, 10]);
        im.set_pixel(2, 1, [100, 155, 110]);
        let mask = in_range(&im.view(), [0.0, 150.0, 100.0], [255.0, 160.0, 130.0]);
        assert!(mask.view().is_set(2, 1));
        assert!(!mask.view().is_set(0, 0));
        assert_eq!(mask.data.iter().filter(|&&v| v != 0).count(), 1);
    }

    #[test]
    fn intersect_masks_requires_matching_sizes() {
        let a = GrayImage::zeros(3, 3);
        let b = GrayImage::zeros(4, 3);
        assert!(matches!(
            intersect_masks(&a.view(), &b.view()),
            Err(ImageError::SizeMismatch { .. })
        ));

        let mut c = GrayImage::zeros(3, 3);
        let mut d = GrayImage::zeros(3, 3);
        c.set(1, 1, 255);
        c.set(0, 0, 255);
        d.set(1, 1, 255);
        let out = intersect_masks(&c.view(), &d.view()).unwrap();
        assert!(out.view().is_set(1, 1));
        assert!(!out.view().is_set(0, 0));
    }

    #[test]
    fn morph_open_removes_speckle_keeps_blocks() {
        let mut mask = GrayImage::zeros(12, 12);
        mask.set(1, 1, 255); // isolated pixel
        for y in 4..10 {
            for x in 4..10 {
                mask.set(x, y, 255);
            }
        }
        let opened = morph_open(&mask.view());
        assert!(!opened.view().is_set(1, 1));
        assert!(opened.view().is_set(6, 6));
    }

    #[test]
    fn box_blur_averages_in_bounds_neighborhood_only() {
        let mut mask = GrayImage::zeros(3, 3);
        mask.set(0, 0, 255);
        let blurred = box_blur_mask(&mask.view());
        // corner window holds 4 pixels, center window holds 9
        assert_eq!(blurred.view().get(0, 0), 255 / 4);
        assert_eq!(blurred.view().get(1, 1), 255 / 9);
        assert_eq!(blurred.view().get(2, 2), 0);

        // a uniform mask stays uniform: borders are not diluted by
        // out-of-bounds zeros
        let mut full = GrayImage::zeros(3, 3);
        for y in 0..3 {
            for x in 0..3 {
                full.set(x, y, 255);
            }
        }
        let blurred = box_blur_mask(&full.view());
        assert!(blurred.data.iter().all(|&v| v == 255));
    }

    #[test]
    fn threshold_is_inclusive_at_the_boundary() {
        let gray = GrayImage::from_raw(5, 1, vec![0, 127, 128, 129, 255]).unwrap();
        let out = threshold_mask(&gray.view(), 128);
        assert_eq!(out.data, vec![0, 0, 255, 255, 255]);
    }

    #[test]
    fn resize_reports_applied_ratio() {
        let im = frame_of(40, 20, [9, 9, 9]);
        let (small, ratio) = resize_color_to_height(&im.view(), 10);
        assert_relative_eq!(ratio, 0.5);
        assert_eq!(small.height, 10);
        assert_eq!(small.width, 20);

        let (same, ratio) = resize_color_to_height(&im.view(), 20);
        assert_relative_eq!(ratio, 1.0);
        assert_eq!(same.width, 40);
    }

    #[test]
    fn fill_polygon_covers_interior_only() {
        let mut mask = GrayImage::zeros(10, 10);
        let square = [
            Point2::new(2, 2),
            Point2::new(7, 2),
            Point2::new(7, 7),
            Point2::new(2, 7),
        ];
        fill_polygon(&mut mask, &square);
        assert!(mask.view().is_set(4, 4));
        assert!(mask.view().is_set(2, 3));
        assert!(!mask.view().is_set(8, 4));
        assert!(!mask.view().is_set(0, 0));
    }

    #[test]
    fn ycrcb_conversion_matches_reference_points() {
        // Gray maps to centered chroma.
        assert_eq!(rgb_to_ycrcb([128, 128, 128]), [128, 128, 128]);
        let [y, cr, cb] = rgb_to_ycrcb([255, 0, 0]);
        assert_eq!(y, 76);
        assert!(cr > 200);
        assert!(cb < 128);
    }
}

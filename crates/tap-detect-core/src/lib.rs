//! Image containers and processing primitives for finger-tap detection.
//!
//! This crate is intentionally small and self-contained. It provides the
//! owned/view image types the detector crates operate on, plus the handful
//! of image transforms the pipeline needs: color in-range masking, mask
//! intersection, morphological open, box blur, resize with a reported scale
//! factor, scanline polygon fill, contour tracing, and closed-polygon
//! simplification.

mod contour;
mod image;
mod imgproc;
mod logger;
mod simplify;

pub use contour::find_contours;
pub use image::{ColorImage, ColorImageView, GrayImage, GrayImageView, ImageError};
pub use imgproc::{
    box_blur_mask, fill_polygon, in_range, intersect_masks, morph_open, resize_color_to_height,
    rgb_to_ycrcb, threshold_mask,
};
pub use simplify::simplify_closed;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init, init_with_level};

use tap_detect_core::{
    box_blur_mask, in_range, intersect_masks, morph_open, threshold_mask, ColorImageView,
    GrayImage, GrayImageView, ImageError,
};

use tap_detect_color::ColorModel;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Structural segmentation failures (mismatched inputs, never per-frame
/// detection conditions).
#[derive(thiserror::Error, Debug)]
pub enum SegmentError {
    #[error("foreground mask does not match frame size")]
    ForegroundMismatch(#[source] ImageError),
}

/// Produce a binary hand mask: pixels within the color model's acceptance
/// range, optionally intersected with a foreground mask, then cleaned up
/// with a morphological open and a blur-rethreshold pass.
///
/// Deterministic for a fixed model; an all-zero mask is a valid result.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(width = frame.width, height = frame.height))
)]
pub fn segment_hand(
    frame: &ColorImageView<'_>,
    model: &ColorModel,
    foreground: Option<&GrayImageView<'_>>,
) -> Result<GrayImage, SegmentError> {
    let mut mask = in_range(frame, model.low(), model.high());

    if let Some(fg) = foreground {
        mask = intersect_masks(&mask.view(), fg).map_err(SegmentError::ForegroundMismatch)?;
    }

    let opened = morph_open(&mask.view());
    let blurred = box_blur_mask(&opened.view());
    Ok(threshold_mask(&blurred.view(), 128))
}

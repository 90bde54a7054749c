//! Adapters from `image` buffers into the pipeline's YCrCb frames.
//!
//! The detection pipeline works exclusively on YCrCb frames; these helpers
//! bridge from the RGB buffers the `image` crate decodes.

use tap_detect_core::{rgb_to_ycrcb, ColorImage};

/// Errors produced by the buffer adapters.
#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    #[error("invalid RGB buffer length (expected {expected} bytes, got {got})")]
    InvalidRgbBuffer { expected: usize, got: usize },

    #[error("invalid frame dimensions (width={width}, height={height})")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Convert an `image::RgbImage` into a YCrCb frame.
pub fn frame_from_rgb(img: &::image::RgbImage) -> ColorImage {
    let width = img.width() as usize;
    let height = img.height() as usize;
    let mut frame = ColorImage::zeros(width, height);
    for (x, y, px) in img.enumerate_pixels() {
        frame.set_pixel(x as usize, y as usize, rgb_to_ycrcb(px.0));
    }
    frame
}

/// Convert any decoded `image::DynamicImage` into a YCrCb frame.
pub fn frame_from_dynamic(img: &::image::DynamicImage) -> ColorImage {
    frame_from_rgb(&img.to_rgb8())
}

/// Build a YCrCb frame from a raw interleaved RGB buffer.
pub fn frame_from_rgb8_raw(
    width: u32,
    height: u32,
    pixels: &[u8],
) -> Result<ColorImage, ConvertError> {
    if width == 0 || height == 0 {
        return Err(ConvertError::InvalidDimensions { width, height });
    }
    let w = width as usize;
    let h = height as usize;
    let Some(expected) = w.checked_mul(h).and_then(|n| n.checked_mul(3)) else {
        return Err(ConvertError::InvalidDimensions { width, height });
    };
    if pixels.len() != expected {
        return Err(ConvertError::InvalidRgbBuffer {
            expected,
            got: pixels.len(),
        });
    }
    let mut frame = ColorImage::zeros(w, h);
    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) * 3;
            let rgb = [pixels[idx], pixels[idx + 1], pixels[idx + 2]];
            frame.set_pixel(x, y, rgb_to_ycrcb(rgb));
        }
    }
    Ok(frame)
}

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use tap_detect_core::{fill_polygon, ColorImageView, GrayImage};

use crate::model::ColorModel;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Canonical frame size the hand polygon below is expressed in.
const WINDOW_WIDTH: usize = 245;
const WINDOW_HEIGHT: usize = 147;

/// Interior pixels are subsampled on this stride in both directions.
const SAMPLE_STRIDE: usize = 4;

/// Hand-shaped sampling silhouette, in canonical window coordinates.
const HAND_POLYGON: [[i32; 2]; 35] = [
    [32, 81],
    [32, 95],
    [57, 102],
    [60, 111],
    [94, 111],
    [96, 95],
    [103, 103],
    [105, 94],
    [102, 111],
    [110, 115],
    [104, 116],
    [113, 113],
    [120, 121],
    [142, 111],
    [139, 98],
    [152, 113],
    [168, 105],
    [174, 111],
    [180, 100],
    [207, 102],
    [207, 89],
    [193, 88],
    [187, 72],
    [184, 81],
    [178, 65],
    [168, 65],
    [175, 57],
    [162, 54],
    [151, 32],
    [99, 34],
    [89, 52],
    [75, 49],
    [77, 62],
    [72, 55],
    [67, 72],
];

/// Calibration failures that cannot be recovered within a session.
#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    #[error(
        "frame {width}x{height} is smaller than the {min_width}x{min_height} sampling window"
    )]
    FrameTooSmall {
        width: usize,
        height: usize,
        min_width: usize,
        min_height: usize,
    },
}

/// Fixed hand-shaped sampling region, rendered once per frame size.
///
/// The canonical polygon is filled into a mask centered in the target frame;
/// a stride-`SAMPLE_STRIDE` subsampling of the interior is cached as the set
/// of pixels to read on every calibration frame.
#[derive(Clone, Debug)]
pub struct SampleWindow {
    width: usize,
    height: usize,
    pixels: Vec<Point2<i32>>,
}

impl SampleWindow {
    /// Render the window for a `width` x `height` frame.
    ///
    /// Fails when the frame cannot contain the canonical polygon; that is a
    /// configuration error, not a per-frame condition.
    pub fn new(width: usize, height: usize) -> Result<Self, CalibrationError> {
        if width < WINDOW_WIDTH || height < WINDOW_HEIGHT {
            return Err(CalibrationError::FrameTooSmall {
                width,
                height,
                min_width: WINDOW_WIDTH,
                min_height: WINDOW_HEIGHT,
            });
        }

        let x0 = ((width - WINDOW_WIDTH) / 2) as i32;
        let y0 = ((height - WINDOW_HEIGHT) / 2) as i32;
        let centered: Vec<Point2<i32>> = HAND_POLYGON
            .iter()
            .map(|[x, y]| Point2::new(x + x0, y + y0))
            .collect();

        let mut mask = GrayImage::zeros(width, height);
        fill_polygon(&mut mask, &centered);

        let mut pixels = Vec::new();
        for y in (0..height).step_by(SAMPLE_STRIDE) {
            for x in (0..width).step_by(SAMPLE_STRIDE) {
                if mask.view().is_set(x as i32, y as i32) {
                    pixels.push(Point2::new(x as i32, y as i32));
                }
            }
        }
        debug_assert!(!pixels.is_empty(), "hand polygon interior is empty");

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn frame_size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn sample_pixels(&self) -> &[Point2<i32>] {
        &self.pixels
    }
}

/// Tuning for [`Calibrator`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CalibratorParams {
    /// Reference skin color the per-pixel acceptance test compares against.
    ///
    /// Deliberately fixed rather than the evolving model, so a drifting
    /// model cannot lock calibration onto non-skin color.
    pub reference_color: [f32; 3],
    /// Per-channel acceptance tolerance around `reference_color`.
    pub color_tolerance: [f32; 3],
    /// Minimum fraction of window pixels that must pass for the frame to
    /// count; below this the model is reset instead.
    pub pass_ratio_min: f32,
}

impl Default for CalibratorParams {
    fn default() -> Self {
        Self {
            reference_color: [127.5, 155.0, 115.0],
            // luminance is unconstrained; chroma carries the skin signal
            color_tolerance: [128.0, 10.0, 20.0],
            pass_ratio_min: 0.3,
        }
    }
}

/// Outcome of one calibration frame, mostly for diagnostics.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SampleReport {
    /// Fraction of window pixels that passed the reference-color test.
    pub ratio: f32,
    /// Mean color of the passing pixels (zeros when none passed).
    pub mean: [f32; 3],
    /// Number of passing pixels fed to the model.
    pub passing: usize,
    /// Whether the frame was accepted (ratio above threshold).
    pub accepted: bool,
}

/// Drives per-frame sampling against the [`SampleWindow`] to tune a
/// [`ColorModel`].
#[derive(Clone, Debug, Default)]
pub struct Calibrator {
    params: CalibratorParams,
    window: Option<SampleWindow>,
}

impl Calibrator {
    pub fn new(params: CalibratorParams) -> Self {
        Self {
            params,
            window: None,
        }
    }

    pub fn params(&self) -> &CalibratorParams {
        &self.params
    }

    /// Run one calibration frame.
    ///
    /// Window pixels within tolerance of the reference color feed
    /// [`ColorModel::update`]; a frame whose pass ratio falls below the
    /// threshold resets the model instead (a transient failure -- the next
    /// frame simply tries again).
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(width = frame.width, height = frame.height))
    )]
    pub fn sample(
        &mut self,
        frame: &ColorImageView<'_>,
        model: &mut ColorModel,
    ) -> Result<SampleReport, CalibrationError> {
        let needs_init = self
            .window
            .as_ref()
            .map(|w| w.frame_size() != (frame.width, frame.height))
            .unwrap_or(true);
        if needs_init {
            self.window = Some(SampleWindow::new(frame.width, frame.height)?);
        }
        let window = self.window.as_ref().expect("window initialized above");

        let mut passing: Vec<Point2<i32>> = Vec::new();
        let mut mean = [0.0f32; 3];
        for p in window.sample_pixels() {
            let px = frame.pixel(p.x, p.y);
            let ok = (0..3).all(|i| {
                (px[i] as f32 - self.params.reference_color[i]).abs()
                    <= self.params.color_tolerance[i]
            });
            if ok {
                for i in 0..3 {
                    mean[i] += px[i] as f32;
                }
                passing.push(*p);
            }
        }
        if !passing.is_empty() {
            for m in &mut mean {
                *m /= passing.len() as f32;
            }
        }

        let ratio = passing.len() as f32 / window.sample_pixels().len() as f32;
        let accepted = ratio >= self.params.pass_ratio_min;
        if accepted {
            model.update(frame, &passing);
        } else {
            log::info!(
                "calibration frame rejected (ratio {ratio:.2} < {:.2}), model reset",
                self.params.pass_ratio_min
            );
            model.reset();
        }

        Ok(SampleReport {
            ratio,
            mean,
            passing: passing.len(),
            accepted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ColorModelParams;
    use tap_detect_core::ColorImage;

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
    fn window_requires_frame_at_least_canonical_size() {
        assert!(matches!(
            SampleWindow::new(200, 200),
            Err(CalibrationError::FrameTooSmall { .. })
        ));
        assert!(matches!(
            SampleWindow::new(400, 100),
            Err(CalibrationError::FrameTooSmall { .. })
        ));
        let window = SampleWindow::new(333, 250).unwrap();
        assert!(!window.sample_pixels().is_empty());
    }

    #[test]
    fn window_pixels_are_interior_and_centered() {
        let window = SampleWindow::new(333, 250).unwrap();
        let (x0, y0) = ((333 - 245) / 2, (250 - 147) / 2);
        for p in window.sample_pixels() {
            assert!(p.x >= x0 as i32 && p.x < (x0 + 245) as i32);
            assert!(p.y >= y0 as i32 && p.y < (y0 + 147) as i32);
        }
        // strictly smaller than the frame
        assert!(window.sample_pixels().len() < 333 * 250 / (SAMPLE_STRIDE * SAMPLE_STRIDE));
    }

    #[test]
    fn skin_colored_frame_feeds_the_model() {
        let mut calibrator = Calibrator::new(CalibratorParams::default());
        let mut model = ColorModel::new(ColorModelParams::default());
        let frame = frame_of(333, 250, [120, 152, 108]);

        let report = calibrator.sample(&frame.view(), &mut model).unwrap();
        assert!(report.accepted);
        assert!(report.ratio > 0.99);
        assert_eq!(report.mean, [120.0, 152.0, 108.0]);
        assert_eq!(model.update_count(), 2);
    }

    #[test]
    fn failing_ratio_resets_the_model_to_defaults() {
        let params = ColorModelParams::default();
        let mut calibrator = Calibrator::new(CalibratorParams::default());
        let mut model = ColorModel::new(params);

        // tighten the model first with a good frame
        let skin = frame_of(333, 250, [120, 152, 108]);
        calibrator.sample(&skin.view(), &mut model).unwrap();
        assert_ne!(model.low(), params.default_low);

        // then feed clearly non-skin frames for a whole session
        let blue = frame_of(333, 250, [40, 90, 200]);
        for _ in 0..5 {
            let report = calibrator.sample(&blue.view(), &mut model).unwrap();
            assert!(!report.accepted);
            assert_eq!(report.passing, 0);
        }
        assert_eq!(model.low(), params.default_low);
        assert_eq!(model.high(), params.default_high);
        assert!(!model.is_stable());
    }

    #[test]
    fn sample_fails_fast_on_undersized_frame() {
        let mut calibrator = Calibrator::new(CalibratorParams::default());
        let mut model = ColorModel::new(ColorModelParams::default());
        let tiny = frame_of(100, 80, [120, 152, 108]);
        assert!(matches!(
            calibrator.sample(&tiny.view(), &mut model),
            Err(CalibrationError::FrameTooSmall { .. })
        ));
    }
}

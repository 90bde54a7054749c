use std::time::{Duration, Instant};

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use tap_detect_color::{
    CalibrationError, Calibrator, CalibratorParams, ColorModel, ColorModelParams,
};
use tap_detect_core::{resize_color_to_height, ColorImageView};
use tap_detect_finger::{find_finger_tips, segment_hand, FingerTipParams, SegmentError};
use tap_detect_tracker::{TapTracker, TapTrackerParams, TrackedTip};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Session tuning. The nested parameter blocks mirror the pipeline stages.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SessionParams {
    /// Fixed working height frames are resized to before detection.
    pub working_height: usize,
    /// Calibration ends early after this many sample frames even if the
    /// color model never reports stable.
    pub max_calibration_samples: u32,
    /// Frames arriving closer together than this are dropped unprocessed.
    /// `None` disables throttling.
    pub min_frame_interval: Option<Duration>,
    #[serde(default)]
    pub color_model: ColorModelParams,
    #[serde(default)]
    pub calibrator: CalibratorParams,
    #[serde(default)]
    pub finger: FingerTipParams,
    #[serde(default)]
    pub tracker: TapTrackerParams,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            working_height: 250,
            max_calibration_samples: 10,
            min_frame_interval: None,
            color_model: ColorModelParams::default(),
            calibrator: CalibratorParams::default(),
            finger: FingerTipParams::default(),
            tracker: TapTrackerParams::default(),
        }
    }
}

/// Result of advancing a session by one frame.
///
/// All coordinates are in the *input* frame's coordinate system; the session
/// rescales working-frame detections back through the inverse of the resize
/// factor before returning them.
#[derive(Clone, Debug)]
pub enum FrameOutput {
    /// Frame dropped by the inter-frame throttle; no state was touched.
    Throttled,
    /// Calibration in progress; no detection was attempted.
    Calibrating {
        /// Skin ratio of this sample frame (diagnostics).
        ratio: f32,
        /// Sample frames consumed so far.
        samples: u32,
        /// Whether the color model reports stable yet.
        stable: bool,
    },
    /// One detection step.
    Detection {
        /// Every tracked tip with its motion state.
        tips: Vec<TrackedTip>,
        /// Positions of tips that tapped this frame.
        taps: Vec<Point2<f32>>,
    },
}

/// Errors surfaced to the session caller. Everything else is represented as
/// empty per-frame results.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error(transparent)]
    Segment(#[from] SegmentError),
}

/// One independent detection session.
///
/// Owns one [`ColorModel`], one [`Calibrator`] and one [`TapTracker`];
/// nothing is shared between sessions, so independent video sources each get
/// their own instance. Frames must be fed serially per session.
#[derive(Debug)]
pub struct TapSession {
    params: SessionParams,
    model: ColorModel,
    calibrator: Calibrator,
    tracker: TapTracker,
    samples: u32,
    calibrated: bool,
    last_frame_at: Option<Instant>,
}

impl TapSession {
    pub fn new(params: SessionParams) -> Self {
        Self {
            params,
            model: ColorModel::new(params.color_model),
            calibrator: Calibrator::new(params.calibrator),
            tracker: TapTracker::new(params.tracker),
            samples: 0,
            calibrated: false,
            last_frame_at: None,
        }
    }

    /// True once calibration finished and frames run detection.
    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    /// Read access to the session's color model (diagnostics).
    pub fn color_model(&self) -> &ColorModel {
        &self.model
    }

    /// Restart calibration and drop all cross-frame state.
    pub fn recalibrate(&mut self) {
        self.model.reset();
        self.tracker.reset();
        self.samples = 0;
        self.calibrated = false;
    }

    /// Process one frame to completion.
    ///
    /// The frame must be YCrCb. While uncalibrated the frame feeds one
    /// calibration sample; afterwards it runs one detection step. The frame
    /// is resized to the working height internally and all returned
    /// coordinates are mapped back to the input frame.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(width = frame.width, height = frame.height))
    )]
    pub fn advance(&mut self, frame: &ColorImageView<'_>) -> Result<FrameOutput, SessionError> {
        if self.throttled() {
            return Ok(FrameOutput::Throttled);
        }

        let (working, ratio) = resize_color_to_height(frame, self.params.working_height);

        if !self.calibrated {
            let report = self.calibrator.sample(&working.view(), &mut self.model)?;
            self.samples += 1;
            let stable = self.model.is_stable();
            if stable || self.samples >= self.params.max_calibration_samples {
                self.calibrated = true;
                log::info!(
                    "calibration finished after {} sample(s) (stable: {stable})",
                    self.samples
                );
            }
            return Ok(FrameOutput::Calibrating {
                ratio: report.ratio,
                samples: self.samples,
                stable,
            });
        }

        let hand = segment_hand(&working.view(), &self.model, None)?;
        let candidates = find_finger_tips(&hand.view(), &self.params.finger);
        let points: Vec<Point2<f32>> = candidates.iter().map(|c| c.position).collect();
        let tracked = self.tracker.track(&points);

        // map working-frame coordinates back to the caller's frame
        let inv = 1.0 / ratio;
        let tips: Vec<TrackedTip> = tracked
            .iter()
            .map(|t| TrackedTip {
                position: Point2::new(t.position.x * inv, t.position.y * inv),
                status: t.status,
            })
            .collect();
        let taps = tips
            .iter()
            .filter(|t| t.is_tapping())
            .map(|t| t.position)
            .collect();

        Ok(FrameOutput::Detection { tips, taps })
    }

    fn throttled(&mut self) -> bool {
        let Some(min_interval) = self.params.min_frame_interval else {
            self.last_frame_at = Some(Instant::now());
            return false;
        };
        let now = Instant::now();
        if let Some(last) = self.last_frame_at {
            if now.duration_since(last) < min_interval {
                return true;
            }
        }
        self.last_frame_at = Some(now);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tap_detect_core::ColorImage;

    const SKIN: [u8; 3] = [120, 155, 115];
    const BACKGROUND: [u8; 3] = [30, 90, 200];

    fn flat_frame(width: usize, height: usize, px: [u8; 3]) -> ColorImage {
        let mut im = ColorImage::zeros(width, height);
        for y in 0..height {
            for x in 0..width {
                im.set_pixel(x, y, px);
            }
        }
        im
    }

    /// Background frame with a skin-colored finger column ending at `tip_y`.
    fn finger_frame(
        width: usize,
        height: usize,
        tip: (usize, usize),
        half_width: usize,
    ) -> ColorImage {
        let mut im = flat_frame(width, height, BACKGROUND);
        let (cx, tip_y) = tip;
        for y in 0..=tip_y {
            for x in cx - half_width..=cx + half_width {
                im.set_pixel(x, y, SKIN);
            }
        }
        im
    }

    fn calibrate(session: &mut TapSession) {
        let skin = flat_frame(333, 250, SKIN);
        while !session.is_calibrated() {
            session.advance(&skin.view()).unwrap();
        }
    }

    #[test]
    fn session_calibrates_then_detects() {
        let mut session = TapSession::new(SessionParams::default());
        let skin = flat_frame(333, 250, SKIN);

        let out = session.advance(&skin.view()).unwrap();
        assert!(matches!(out, FrameOutput::Calibrating { ratio, .. } if ratio > 0.9));
        calibrate(&mut session);
        assert!(session.is_calibrated());

        let frame = finger_frame(333, 250, (160, 140), 7);
        let out = session.advance(&frame.view()).unwrap();
        match out {
            FrameOutput::Detection { tips, .. } => assert!(!tips.is_empty()),
            other => panic!("expected detection, got {other:?}"),
        }
    }

    #[test]
    fn undersized_frame_fails_session_setup() {
        let mut session = TapSession::new(SessionParams::default());
        // 100px wide at working height cannot contain the sampling window
        let tiny = flat_frame(100, 250, SKIN);
        assert!(matches!(
            session.advance(&tiny.view()),
            Err(SessionError::Calibration(_))
        ));
    }

    #[test]
    fn tap_coordinates_round_trip_through_resize() {
        let mut params = SessionParams::default();
        params.tracker.tap_threshold_row = 60.0;
        let mut session = TapSession::new(params);

        // calibrate at 2x the working height so detection downscales by 0.5
        let skin = flat_frame(666, 500, SKIN);
        while !session.is_calibrated() {
            session.advance(&skin.view()).unwrap();
        }

        // drive a finger downward to a tap: approach, fall, linger
        let mut taps = Vec::new();
        for tip_y in [240usize, 260, 280, 282, 284] {
            // 31px wide at input scale stays finger-width after the 0.5x resize
            let frame = finger_frame(666, 500, (320, tip_y), 15);
            if let FrameOutput::Detection { taps: t, .. } =
                session.advance(&frame.view()).unwrap()
            {
                taps.extend(t);
            }
        }
        assert!(!taps.is_empty(), "no tap detected");
        // the tip is at input-frame scale: x near the finger column center,
        // y near the final tip row
        let tap = taps[0];
        assert!((tap.x - 320.0).abs() <= 8.0, "tap at {tap}");
        assert!((tap.y - 284.0).abs() <= 8.0, "tap at {tap}");
    }

    #[test]
    fn recalibrate_restarts_the_session() {
        let mut session = TapSession::new(SessionParams::default());
        calibrate(&mut session);
        assert!(session.is_calibrated());
        session.recalibrate();
        assert!(!session.is_calibrated());

        let skin = flat_frame(333, 250, SKIN);
        let out = session.advance(&skin.view()).unwrap();
        assert!(matches!(
            out,
            FrameOutput::Calibrating { samples: 1, .. }
        ));
    }

    #[test]
    fn throttle_drops_back_to_back_frames_without_state_changes() {
        let mut params = SessionParams::default();
        params.min_frame_interval = Some(Duration::from_secs(3600));
        let mut session = TapSession::new(params);
        let skin = flat_frame(333, 250, SKIN);

        let first = session.advance(&skin.view()).unwrap();
        assert!(matches!(first, FrameOutput::Calibrating { .. }));
        let second = session.advance(&skin.view()).unwrap();
        assert!(matches!(second, FrameOutput::Throttled));
        // the throttled frame consumed no calibration sample
        let model_updates = session.color_model().update_count();
        assert_eq!(model_updates, 2);
    }
}

//! Temporal finger-tip tracking and tap classification.
//!
//! [`TapTracker`] matches each frame's finger-tip points against the
//! previous frame's tracked tips by nearest-neighbor search under an
//! asymmetric distance, and classifies the motion of every tip. A tap is a
//! tip that was falling on the previous frame and now lingers below the
//! configured surface row.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Motion state of one tracked finger tip.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipStatus {
    /// No continuity with the previous frame.
    NotCare,
    /// Matched a prior tip above it; moving predominantly downward.
    Falling,
    /// Matched a prior tip at nearly the same position.
    Linger,
    /// Terminal per-tap event: was falling, now lingers on the surface.
    Tapping,
}

/// A finger tip with its classified motion state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackedTip {
    pub position: Point2<f32>,
    pub status: TipStatus,
}

impl TrackedTip {
    pub fn is_tapping(&self) -> bool {
        self.status == TipStatus::Tapping
    }

    pub fn is_falling(&self) -> bool {
        self.status == TipStatus::Falling
    }

    pub fn is_lingering(&self) -> bool {
        self.status == TipStatus::Linger
    }
}

/// Tuning for [`TapTracker`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TapTrackerParams {
    /// Farthest a tip may move between consecutive frames and still match.
    pub move_dist_max: f32,
    /// Below this distance a matched tip counts as lingering.
    pub linger_dist_max: f32,
    /// Surface plane: taps only register on rows below this one.
    pub tap_threshold_row: f32,
}

impl Default for TapTrackerParams {
    fn default() -> Self {
        Self {
            move_dist_max: 20.0,
            linger_dist_max: 4.0,
            tap_threshold_row: 125.0,
        }
    }
}

/// Cross-frame finger-tip state machine.
///
/// Holds exactly one frame of memory: the previous frame's tracked tips.
/// Not synchronized; one tracker belongs to one detection session and
/// callers serialize frames per session.
#[derive(Clone, Debug, Default)]
pub struct TapTracker {
    params: TapTrackerParams,
    last_tips: Vec<TrackedTip>,
}

impl TapTracker {
    pub fn new(params: TapTrackerParams) -> Self {
        Self {
            params,
            last_tips: Vec::new(),
        }
    }

    pub fn params(&self) -> &TapTrackerParams {
        &self.params
    }

    /// Drop all cross-frame memory.
    pub fn reset(&mut self) {
        self.last_tips.clear();
    }

    /// Classify one frame's finger-tip points.
    ///
    /// Each point is matched against the nearest unconsumed tip from the
    /// previous frame; a matched prior tip is consumed so correspondence is
    /// one-to-one. On return the tracker's memory is replaced wholesale with
    /// this frame's classification.
    pub fn track(&mut self, tips: &[Point2<f32>]) -> Vec<TrackedTip> {
        let mut prior = std::mem::take(&mut self.last_tips);
        let mut current = Vec::with_capacity(tips.len());

        for &p in tips {
            let nearest = prior
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    fall_distance(a.position, p)
                        .partial_cmp(&fall_distance(b.position, p))
                        .expect("finite distance")
                })
                .map(|(idx, tip)| (idx, *tip, fall_distance(tip.position, p)));

            let status = match nearest {
                // no usable correspondence with the previous frame
                None => TipStatus::NotCare,
                Some((_, _, dist)) if dist > self.params.move_dist_max => TipStatus::NotCare,

                Some((idx, matched, dist)) if dist < self.params.linger_dist_max => {
                    prior.swap_remove(idx);
                    if matched.status == TipStatus::Falling && p.y > self.params.tap_threshold_row
                    {
                        TipStatus::Tapping
                    } else {
                        TipStatus::Linger
                    }
                }

                // prior tip sits above and the motion is predominantly down
                Some((idx, matched, _)) if (p.x - matched.position.x).abs() < p.y - matched.position.y => {
                    prior.swap_remove(idx);
                    TipStatus::Falling
                }

                // ambiguous or sideways motion
                Some(_) => TipStatus::NotCare,
            };
            current.push(TrackedTip {
                position: p,
                status,
            });
        }

        if current.iter().any(TrackedTip::is_tapping) {
            log::debug!(
                "tap detected among {} tip(s): {:?}",
                current.len(),
                current
            );
        }
        self.last_tips = current.clone();
        current
    }

    /// Classify one frame and return only the tap events.
    pub fn track_taps(&mut self, tips: &[Point2<f32>]) -> Vec<Point2<f32>> {
        self.track(tips)
            .into_iter()
            .filter(TrackedTip::is_tapping)
            .map(|t| t.position)
            .collect()
    }

    /// The previous frame's classification (this frame's matching pool).
    pub fn last_tips(&self) -> &[TrackedTip] {
        &self.last_tips
    }
}

/// Asymmetric inter-frame distance: `|dx| / 2 + |dy|`.
///
/// Horizontal motion is weighted less than vertical since tapping is
/// dominantly vertical and horizontal jitter should not break
/// correspondence.
#[inline]
fn fall_distance(a: Point2<f32>, b: Point2<f32>) -> f32 {
    (a.x - b.x).abs() / 2.0 + (a.y - b.y).abs()
}

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use tap_detect_core::ColorImageView;

/// Tuning for [`ColorModel`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ColorModelParams {
    /// Default acceptance range restored by `reset` (YCrCb).
    pub default_low: [f32; 3],
    pub default_high: [f32; 3],
    /// Consecutive calm updates required before the model reports stable.
    pub stable_streak: u32,
    /// An update is calm when no bound moves by this much on any channel.
    pub stable_delta_max: f32,
}

impl Default for ColorModelParams {
    fn default() -> Self {
        Self {
            // Y is left wide open; skin lives in a narrow Cr/Cb band.
            default_low: [0.0, 150.0, 100.0],
            default_high: [255.0, 160.0, 130.0],
            stable_streak: 3,
            stable_delta_max: 2.0,
        }
    }
}

/// Per-channel skin-color acceptance range with running statistics.
///
/// Invariants: `low[i] <= high[i]` and `center[i] == (low[i] + high[i]) / 2`
/// for every channel, after any sequence of updates.
#[derive(Clone, Debug)]
pub struct ColorModel {
    params: ColorModelParams,
    low: [f32; 3],
    high: [f32; 3],
    center: [f32; 3],
    update_count: u32,
    calm_updates: u32,
}

impl ColorModel {
    pub fn new(params: ColorModelParams) -> Self {
        let mut model = Self {
            params,
            low: [0.0; 3],
            high: [0.0; 3],
            center: [0.0; 3],
            update_count: 1,
            calm_updates: 0,
        };
        model.reset();
        model
    }

    /// Restore the configured default range and restart accumulation.
    pub fn reset(&mut self) {
        self.low = self.params.default_low;
        self.high = self.params.default_high;
        for i in 0..3 {
            self.center[i] = (self.low[i] + self.high[i]) / 2.0;
        }
        self.update_count = 1;
        self.calm_updates = 0;
    }

    pub fn low(&self) -> [f32; 3] {
        self.low
    }

    pub fn high(&self) -> [f32; 3] {
        self.high
    }

    pub fn center(&self) -> [f32; 3] {
        self.center
    }

    pub fn update_count(&self) -> u32 {
        self.update_count
    }

    /// True once enough consecutive updates barely moved the range.
    ///
    /// Concretely: the last `stable_streak` updates each moved every bound by
    /// less than `stable_delta_max` intensity units. A reset clears the
    /// streak.
    pub fn is_stable(&self) -> bool {
        self.calm_updates >= self.params.stable_streak
    }

    /// True if `pixel` falls inside the acceptance range on all channels.
    #[inline]
    pub fn contains(&self, pixel: [u8; 3]) -> bool {
        (0..3).all(|i| {
            let v = pixel[i] as f32;
            v >= self.low[i] && v <= self.high[i]
        })
    }

    /// Fold one sample of pixels into the acceptance range.
    ///
    /// Candidate bounds are `mean ± std` per channel, clamped to `[0, 255]`,
    /// folded in with cumulative-moving-average damping: each bound moves by
    /// `(candidate - bound) / update_count`, so early samples dominate and
    /// later ones only refine. Empty pixel sets are a no-op.
    pub fn update(&mut self, frame: &ColorImageView<'_>, pixels: &[Point2<i32>]) {
        if pixels.is_empty() {
            return;
        }

        let mut mean = [0.0f64; 3];
        let mut sq = [0.0f64; 3];
        for p in pixels {
            let px = frame.pixel(p.x, p.y);
            for i in 0..3 {
                let v = px[i] as f64;
                mean[i] += v;
                sq[i] += v * v;
            }
        }
        let n = pixels.len() as f64;
        let mut max_delta = 0.0f32;
        for i in 0..3 {
            mean[i] /= n;
            let var = (sq[i] / n - mean[i] * mean[i]).max(0.0);
            let std = var.sqrt();

            let cand_low = ((mean[i] - std).max(0.0)) as f32;
            let cand_high = ((mean[i] + std).min(255.0)) as f32;

            let step_low = (cand_low - self.low[i]) / self.update_count as f32;
            let step_high = (cand_high - self.high[i]) / self.update_count as f32;
            self.low[i] += step_low;
            self.high[i] += step_high;
            self.center[i] = (self.low[i] + self.high[i]) / 2.0;

            max_delta = max_delta.max(step_low.abs()).max(step_high.abs());
        }
        self.update_count += 1;

        if max_delta < self.params.stable_delta_max {
            self.calm_updates += 1;
        } else {
            self.calm_updates = 0;
        }
        log::debug!(
            "color model update #{}: low={:?} high={:?} (delta {:.2})",
            self.update_count,
            self.low,
            self.high,
            max_delta
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tap_detect_core::ColorImage;

    fn frame_of(px: [u8; 3]) -> ColorImage {
        let mut im = ColorImage::zeros(8, 8);
        for y in 0..8 {
            for x in 0..8 {
                im.set_pixel(x, y, px);
            }
        }
        im
    }

    fn all_pixels() -> Vec<Point2<i32>> {
        (0..8)
            .flat_map(|y| (0..8).map(move |x| Point2::new(x, y)))
            .collect()
    }

    fn assert_invariants(model: &ColorModel) {
        let (low, high, center) = (model.low(), model.high(), model.center());
        for i in 0..3 {
            assert!(low[i] <= high[i], "channel {i}: {} > {}", low[i], high[i]);
            assert_relative_eq!(center[i], (low[i] + high[i]) / 2.0);
        }
    }

    #[test]
    fn invariants_hold_after_arbitrary_updates() {
        let mut model = ColorModel::new(ColorModelParams::default());
        let frames = [
            frame_of([12, 200, 44]),
            frame_of([240, 10, 230]),
            frame_of([100, 155, 110]),
        ];
        let pixels = all_pixels();
        for frame in &frames {
            model.update(&frame.view(), &pixels);
            assert_invariants(&model);
        }
        assert_eq!(model.update_count(), 4);
    }

    #[test]
    fn empty_pixel_set_is_a_noop() {
        let mut model = ColorModel::new(ColorModelParams::default());
        let before = (model.low(), model.high(), model.update_count());
        model.update(&frame_of([1, 2, 3]).view(), &[]);
        assert_eq!(before, (model.low(), model.high(), model.update_count()));
    }

    #[test]
    fn converges_to_constant_color_and_stabilizes() {
        let mut model = ColorModel::new(ColorModelParams::default());
        let frame = frame_of([120, 152, 108]);
        let pixels = all_pixels();

        let mut last_gap = f32::INFINITY;
        for _ in 0..8 {
            model.update(&frame.view(), &pixels);
            assert_invariants(&model);
            // zero variance sample: bounds close in on the sample color
            let gap = (model.low()[1] - 152.0).abs() + (model.high()[1] - 152.0).abs();
            assert!(gap <= last_gap + 1e-4);
            last_gap = gap;
        }
        assert!(model.is_stable());
        assert!((model.center()[0] - 120.0).abs() < 4.0);
    }

    #[test]
    fn reset_restores_defaults_and_clears_stability() {
        let params = ColorModelParams::default();
        let mut model = ColorModel::new(params);
        let pixels = all_pixels();
        for _ in 0..6 {
            model.update(&frame_of([120, 152, 108]).view(), &pixels);
        }
        assert!(model.is_stable());

        model.reset();
        assert_eq!(model.update_count(), 1);
        assert!(!model.is_stable());
        assert_eq!(model.low(), params.default_low);
        assert_eq!(model.high(), params.default_high);
        assert_invariants(&model);
    }

    #[test]
    fn contains_checks_all_channels() {
        let model = ColorModel::new(ColorModelParams::default());
        assert!(model.contains([128, 155, 115]));
        assert!(!model.contains([128, 100, 115])); // Cr out of range
        assert!(!model.contains([128, 155, 240])); // Cb out of range
    }
}

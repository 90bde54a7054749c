//! Online skin-color calibration.
//!
//! [`ColorModel`] keeps a per-channel YCrCb acceptance range and tightens it
//! with cumulative-moving-average updates; [`Calibrator`] harvests candidate
//! skin pixels through a fixed hand-shaped [`SampleWindow`] and feeds them to
//! the model until it stabilizes.

mod model;
mod sampler;

pub use model::{ColorModel, ColorModelParams};
pub use sampler::{Calibrator, CalibratorParams, CalibrationError, SampleReport, SampleWindow};

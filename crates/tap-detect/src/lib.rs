//! High-level facade crate for the `tap-detect-*` workspace.
//!
//! This crate provides:
//! - stable, convenient re-exports of the underlying pipeline crates
//! - [`TapSession`], which sequences calibration and detection per frame
//! - (feature-gated) adapters from `image` buffers into the pipeline's
//!   YCrCb frames.
//!
//! ## Quickstart
//!
//! ```no_run
//! use tap_detect::{FrameOutput, SessionParams, TapSession};
//! use tap_detect_core::ColorImage;
//!
//! # fn next_frame() -> ColorImage { ColorImage::zeros(333, 250) }
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = TapSession::new(SessionParams::default());
//! loop {
//!     let frame = next_frame(); // YCrCb, any size >= the sampling window
//!     match session.advance(&frame.view())? {
//!         FrameOutput::Calibrating { ratio, .. } => {
//!             println!("calibrating, skin ratio {ratio:.2}");
//!         }
//!         FrameOutput::Detection { taps, .. } => {
//!             for tap in &taps {
//!                 println!("tap at ({:.0}, {:.0})", tap.x, tap.y);
//!             }
//!         }
//!         FrameOutput::Throttled => {}
//!     }
//! }
//! # }
//! ```
//!
//! ## API map
//! - `tap_detect::core`: image containers and processing primitives.
//! - `tap_detect::color`: skin-color model and calibrator.
//! - `tap_detect::finger`: hand segmentation and tip extraction.
//! - `tap_detect::tracker`: temporal tap classification.

pub use tap_detect_color as color;
pub use tap_detect_core as core;
pub use tap_detect_finger as finger;
pub use tap_detect_tracker as tracker;

pub use tap_detect_color::{CalibrationError, ColorModel, ColorModelParams, SampleReport};
pub use tap_detect_finger::{FingerTipCandidate, FingerTipParams, TipKind};
pub use tap_detect_tracker::{TapTracker, TapTrackerParams, TipStatus, TrackedTip};

mod session;

pub use session::{FrameOutput, SessionError, SessionParams, TapSession};

#[cfg(feature = "image")]
pub mod convert;

//! Hand segmentation and finger-tip extraction.
//!
//! [`segment_hand`] turns a YCrCb frame into a binary hand silhouette using
//! a calibrated [`tap_detect_color::ColorModel`]; [`find_finger_tips`] walks
//! the silhouette's simplified contours and emits the points most likely to
//! be finger tips.
//!
//! Image coordinates grow downward: a finger approaching the tap surface
//! points *down*, so a tip is a local row maximum with the hand filling the
//! rows above it.

mod extract;
mod segment;

pub use extract::{find_finger_tips, FingerTipCandidate, FingerTipParams, TipKind};
pub use segment::{segment_hand, SegmentError};

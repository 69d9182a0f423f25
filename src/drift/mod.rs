//! Drift Detection Module
//!
//! Streaming change detection on a single numeric signal:
//! - Exponential-histogram window with logarithmic memory
//! - Split test bounded by the window's pooled variance
//! - `Stable` / `DriftSignaled` state machine

pub mod detector;
pub mod window;

pub use detector::{DriftDetector, DriftEvent, DriftState};
pub use window::{AdaptiveWindow, Bucket};

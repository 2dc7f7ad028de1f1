//! Shared utilities for the engine.
//!
//! Helpers for frame pacing and easing curves.

pub mod easing;
pub mod frame_timing;

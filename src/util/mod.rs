//! Shared utilities: frame pacing and geometry fingerprints.

/// Smoothed FPS of published frames.
pub mod frame_timing;
pub mod hash;

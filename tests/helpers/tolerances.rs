//! Tolerance constants for audio testing.

/// Exact operations (plain copy, unity gain).
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Values below this are considered silent (~-80dB).
pub const SILENCE_THRESHOLD: f32 = 0.0001;

//! Errors reported when a voice is built from invalid parameters.
//!
//! Rendering never fails; out-of-range values met while rendering are clamped.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ParameterError {
    #[error("stage count {0} is outside 1..={max}", max = crate::MAX_STAGES)]
    StageCount(usize),

    #[error("sample rate {0} Hz is not a positive finite number")]
    SampleRate(f32),

    #[error("block size must be at least one sample")]
    BlockSize,

    #[error("note frequency {0} Hz is not a positive finite number")]
    Frequency(f32),

    #[error("velocity {0} is outside 0.0..=1.0")]
    Velocity(f32),

    #[error("overtone multiplier for harmonic {0} is not a positive finite number")]
    OvertoneMultiplier(usize),

    #[error("envelope has no points")]
    EmptyEnvelope,

    #[error("envelope sustain point {0} is past the last point")]
    SustainPoint(usize),
}

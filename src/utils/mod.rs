//! Utility functions shared by the voice components.

pub mod random;
pub mod units;

#[allow(unused_imports)]
use num_traits::float::Float;

/// Relative amplitude change below which a block is scaled uniformly.
pub const AMPLITUDE_INTERPOLATION_THRESHOLD: f32 = 0.0001;

/// Checks whether two amplitudes differ enough to be interpolated per sample.
#[inline]
pub fn above_amplitude_threshold(a: f32, b: f32) -> bool {
    (2.0 * (b - a).abs() / (b + a + 0.000_000_000_1).abs()) > AMPLITUDE_INTERPOLATION_THRESHOLD
}

/// Linear ramp from `a` towards `b`, evaluated at sample `x` of `size`.
#[inline]
pub fn interpolate_amplitude(a: f32, b: f32, x: usize, size: usize) -> f32 {
    a + (b - a) * x as f32 / size as f32
}

/// Velocity sensing curve.
///
/// `scaling` is the sensitivity parameter in the range from `0` to `127`; `127`
/// disables velocity sensing, `64` is linear.
#[inline]
pub fn velocity_scale(velocity: f32, scaling: u8) -> f32 {
    if scaling == 127 || velocity > 0.99 {
        return 1.0;
    }

    let exponent = 8.0_f32.powf((64.0 - scaling as f32) / 64.0);
    velocity.powf(exponent)
}

/// Raised cosine from 0.0 to 1.0 over `length` samples, evaluated at `index`.
#[inline]
pub fn raised_cosine(index: usize, length: usize) -> f32 {
    0.5 - 0.5 * (index as f32 / length as f32 * core::f32::consts::PI).cos()
}

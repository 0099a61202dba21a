//! Unit conversions.

#[allow(unused_imports)]
use num_traits::float::Float;

#[inline]
pub fn cents_to_ratio(cents: f32) -> f32 {
    2.0_f32.powf(cents / 1200.0)
}

#[inline]
pub fn octaves_to_ratio(octaves: f32) -> f32 {
    2.0_f32.powf(octaves)
}

#[inline]
pub fn db_to_ratio(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Pitch in octaves relative to 1 kHz converted to Hz.
#[inline]
pub fn pitch_to_frequency(octaves: f32) -> f32 {
    1000.0 * octaves_to_ratio(octaves)
}

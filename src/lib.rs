//! Subtractive synthesis voice.
//!
//! A voice excites a bank of band-pass filters, one chain per harmonic, with
//! white noise and shapes the result with envelopes, an optional global tone
//! filter, panning and a click-free legato transition machine.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[allow(unused_imports)]
use num_traits::float::Float;

pub mod controller;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod filter_bank;
pub mod legato;
pub mod params;
pub mod utils;
pub mod voice;

pub use error::ParameterError;

/// Maximum number of harmonics a voice can enable.
pub const MAX_HARMONICS: usize = 64;

/// Maximum number of filter stages per harmonic.
pub const MAX_STAGES: usize = 5;

/// Sample rate context for DSP calculations.
#[derive(Debug, Clone, Copy)]
pub struct SampleRate {
    /// Sample rate in Hz
    pub sample_rate_hz: f32,
    /// Half the sample rate (Nyquist frequency) in Hz
    pub half_sample_rate_hz: f32,
    /// Reciprocal of sample rate (1.0 / sample_rate_hz) for fast multiplication
    pub inv_sr: f32,
}

impl SampleRate {
    /// Create a new sample rate context.
    pub fn new(sample_rate_hz: f32) -> Self {
        Self {
            sample_rate_hz,
            half_sample_rate_hz: sample_rate_hz * 0.5,
            inv_sr: 1.0 / sample_rate_hz,
        }
    }

    /// Number of whole samples covering `millis` milliseconds, never less than one.
    #[inline]
    pub fn samples_for_millis(&self, millis: f32) -> usize {
        let samples = (self.sample_rate_hz * millis / 1000.0).ceil();
        if samples < 1.0 {
            1
        } else {
            samples as usize
        }
    }
}

//! Global tone filter applied to the summed harmonics of a voice.

#[allow(unused_imports)]
use num_traits::float::Float;

use super::svf::{FilterMode, Svf};
use crate::utils::units::pitch_to_frequency;
use crate::SampleRate;

const LN_1000: f32 = 6.907_755;

/// Maximum number of cascaded filter stages.
pub const MAX_TONE_FILTER_STAGES: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct ToneFilterParameters {
    pub mode: FilterMode,
    /// Cutoff in the range from `0` to `127`; `64` is 1 kHz, each step of
    /// 64 is 5 octaves.
    pub freq: u8,
    /// Resonance in the range from `0` to `127`.
    pub q: u8,
    /// Keyboard tracking in the range from `0` to `127`; `64` disables it,
    /// `127` tracks the key one octave per octave.
    pub freq_tracking: u8,
    /// Number of cascaded stages, `1` to [`MAX_TONE_FILTER_STAGES`].
    pub stages: usize,
}

impl Default for ToneFilterParameters {
    fn default() -> Self {
        Self {
            mode: FilterMode::LowPass,
            freq: 94,
            q: 40,
            freq_tracking: 64,
            stages: 1,
        }
    }
}

impl ToneFilterParameters {
    /// Cutoff in octaves relative to 1 kHz.
    pub fn center_pitch(&self) -> f32 {
        (self.freq as f32 / 64.0 - 1.0) * 5.0
    }

    pub fn center_q(&self) -> f32 {
        let q = self.q as f32 / 127.0;
        (q * q * LN_1000).exp() - 0.9
    }

    /// Keyboard tracking offset in octaves for a note at `note_freq`.
    pub fn freq_tracking(&self, note_freq: f32) -> f32 {
        (note_freq / 440.0).log2() * (self.freq_tracking as f32 - 64.0) / 64.0
    }
}

#[derive(Debug, Clone)]
pub struct ToneFilter {
    mode: FilterMode,
    stages: usize,
    svf: [Svf; MAX_TONE_FILTER_STAGES],
    sample_rate: SampleRate,
}

impl ToneFilter {
    pub fn new(parameters: &ToneFilterParameters, sample_rate: SampleRate) -> Self {
        let mut filter = Self {
            mode: parameters.mode,
            stages: parameters.stages.clamp(1, MAX_TONE_FILTER_STAGES),
            svf: core::array::from_fn(|_| Svf::new()),
            sample_rate,
        };
        for svf in filter.svf.iter_mut() {
            svf.init();
        }
        filter.set_freq_and_q(
            pitch_to_frequency(parameters.center_pitch()),
            parameters.center_q(),
        );

        filter
    }

    /// Converts a pitch in octaves relative to 1 kHz to a cutoff in Hz.
    pub fn real_freq(pitch: f32) -> f32 {
        pitch_to_frequency(pitch.clamp(-7.0, 7.0))
    }

    #[inline]
    pub fn set_freq_and_q(&mut self, freq: f32, q: f32) {
        let f = freq * self.sample_rate.inv_sr;
        let q = q.max(0.01);
        for svf in self.svf[..self.stages].iter_mut() {
            svf.set_f_q(f, q);
        }
    }

    #[inline]
    pub fn filter_out(&mut self, in_out: &mut [f32]) {
        for svf in self.svf[..self.stages].iter_mut() {
            svf.process_replacing(in_out, self.mode);
        }
    }
}

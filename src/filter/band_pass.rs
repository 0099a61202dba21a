//! Second order band-pass filter used for each stage of a harmonic.
//!
//! The recurrence is `y[n] = b0 x[n] + b2 x[n-2] - a1 y[n-1] - a2 y[n-2]`
//! (the `b1` term of a band-pass biquad is zero).

#[allow(unused_imports)]
use num_traits::float::Float;

use crate::SampleRate;

const TWO_PI: f32 = 2.0 * core::f32::consts::PI;
const LN_2: f32 = core::f32::consts::LN_2;

/// Distance from Nyquist that filter frequencies are kept away from.
pub const NYQUIST_MARGIN_HZ: f32 = 200.0;

/// Lowest frequency a coefficient set is derived for.
pub const MIN_FREQ_HZ: f32 = 1.0;

/// Keeps `freq` between [`MIN_FREQ_HZ`] and the Nyquist margin.
#[inline]
fn clamp_freq(freq: f32, sample_rate: &SampleRate) -> f32 {
    freq.min(sample_rate.half_sample_rate_hz - NYQUIST_MARGIN_HZ).max(MIN_FREQ_HZ)
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct BandPass {
    pub b0: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,

    pub xn1: f32,
    pub xn2: f32,
    pub yn1: f32,
    pub yn2: f32,

    /// Target frequency in Hz.
    pub freq: f32,
    /// Bandwidth relative to the frequency.
    pub bw: f32,
    /// Stage gain.
    pub amp: f32,
}

/// Stability term of the band-pass design, clamped to `0.0..=1.0` and `bw`.
#[inline]
pub fn band_pass_alpha(freq: f32, bw: f32, sample_rate: &SampleRate) -> f32 {
    let freq = clamp_freq(freq, sample_rate);
    let omega = TWO_PI * freq * sample_rate.inv_sr;
    let sn = omega.sin();
    let alpha = sn * (LN_2 / 2.0 * bw * omega / sn).sinh();

    alpha.min(1.0).min(bw).max(0.0)
}

impl BandPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears input and output history.
    pub fn reset(&mut self) {
        self.xn1 = 0.0;
        self.xn2 = 0.0;
        self.yn1 = 0.0;
        self.yn2 = 0.0;
    }

    /// Computes the coefficients for `freq` and `bw`, scaled by the stage
    /// gain and an extra `gain`.
    #[inline]
    pub fn set_coefficients(&mut self, freq: f32, bw: f32, gain: f32, sample_rate: &SampleRate) {
        let freq = clamp_freq(freq, sample_rate);
        let omega = TWO_PI * freq * sample_rate.inv_sr;
        let cs = omega.cos();
        let alpha = band_pass_alpha(freq, bw, sample_rate);
        let norm = 1.0 / (1.0 + alpha);

        self.b0 = alpha * norm * self.amp * gain;
        self.b2 = -alpha * norm * self.amp * gain;
        self.a1 = -2.0 * cs * norm;
        self.a2 = (1.0 - alpha) * norm;
    }

    /// Seeds the output history with a small oscillation at the filter
    /// frequency so that a warm start does not begin on a zero crossing.
    ///
    /// `amplitude` and `phase` are drawn by the caller. Frequencies within
    /// 4% of Nyquist fall back to a cold start.
    pub fn seed(&mut self, amplitude: f32, phase: f32, sample_rate: &SampleRate) {
        self.xn1 = 0.0;
        self.xn2 = 0.0;

        if self.freq > sample_rate.half_sample_rate_hz * 0.96 {
            self.yn1 = 0.0;
            self.yn2 = 0.0;
            return;
        }

        self.yn1 = amplitude * phase.cos();
        self.yn2 = amplitude * (phase + self.freq * TWO_PI * sample_rate.inv_sr).cos();
    }

    /// Filters a block in place.
    ///
    /// Lengths that are a multiple of eight run through the unrolled kernel,
    /// anything else through the variable run kernel.
    #[inline]
    pub fn process(&mut self, in_out: &mut [f32]) {
        if in_out.len() % 8 == 0 {
            self.process_block(in_out);
        } else {
            self.process_var_run(in_out);
        }
    }

    /// Unrolled kernel: groups of 8 samples, then pairs.
    ///
    /// The working state alternates between two rotations so that the
    /// history never has to be shifted. `in_out.len()` must be even.
    #[inline]
    pub fn process_block(&mut self, in_out: &mut [f32]) {
        debug_assert!(in_out.len() % 2 == 0);

        let coeff = [self.b0, self.b2, -self.a1, -self.a2];
        let mut work = [self.xn1, self.xn2, self.yn1, self.yn2];

        let mut chunks = in_out.chunks_exact_mut(8);
        for chunk in &mut chunks {
            filter_a(&coeff, &mut chunk[0], &mut work);
            filter_b(&coeff, &mut chunk[1], &mut work);
            filter_a(&coeff, &mut chunk[2], &mut work);
            filter_b(&coeff, &mut chunk[3], &mut work);
            filter_a(&coeff, &mut chunk[4], &mut work);
            filter_b(&coeff, &mut chunk[5], &mut work);
            filter_a(&coeff, &mut chunk[6], &mut work);
            filter_b(&coeff, &mut chunk[7], &mut work);
        }
        for pair in chunks.into_remainder().chunks_exact_mut(2) {
            filter_a(&coeff, &mut pair[0], &mut work);
            filter_b(&coeff, &mut pair[1], &mut work);
        }

        self.xn1 = work[0];
        self.xn2 = work[1];
        self.yn1 = work[2];
        self.yn2 = work[3];
    }

    /// Kernel for runs of arbitrary length, as requested by hosts that do not
    /// keep a fixed block size. The even part goes through the unrolled
    /// kernel, a trailing odd sample through [`BandPass::tick`].
    #[inline]
    pub fn process_var_run(&mut self, in_out: &mut [f32]) {
        let even = in_out.len() - in_out.len() % 2;
        let (head, tail) = in_out.split_at_mut(even);

        if !head.is_empty() {
            self.process_block(head);
        }

        if let Some(sample) = tail.first_mut() {
            *sample = self.tick(*sample);
        }
    }

    /// Single sample recurrence.
    #[inline]
    pub fn tick(&mut self, x: f32) -> f32 {
        let y = x * self.b0 + self.b2 * self.xn2 - self.a1 * self.yn1 - self.a2 * self.yn2;
        self.xn2 = self.xn1;
        self.xn1 = x;
        self.yn2 = self.yn1;
        self.yn1 = y;

        y
    }
}

// The two rotations hold {x[n-1], x[n-2], y[n-1], y[n-2]} in alternating
// slots: after `filter_a` slot 1/3 hold the newest values, after `filter_b`
// slot 0/2 do.
#[inline(always)]
fn filter_a(coeff: &[f32; 4], sample: &mut f32, work: &mut [f32; 4]) {
    work[3] = *sample * coeff[0] + work[1] * coeff[1] + work[2] * coeff[2] + work[3] * coeff[3];
    work[1] = *sample;
    *sample = work[3];
}

#[inline(always)]
fn filter_b(coeff: &[f32; 4], sample: &mut f32, work: &mut [f32; 4]) {
    work[2] = *sample * coeff[0] + work[0] * coeff[1] + work[3] * coeff[2] + work[2] * coeff[3];
    work[0] = *sample;
    *sample = work[2];
}

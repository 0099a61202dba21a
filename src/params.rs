//! Static voice parameters, as edited by the user interface.
//!
//! Most values use the 7-bit controller range (`0` - `127`) with `64` as the
//! neutral centre, matching the preset format they are loaded from.

#[allow(unused_imports)]
use num_traits::float::Float;
use spin::Once;

use crate::envelope::{EnvelopeMode, EnvelopeParameters};
use crate::error::ParameterError;
use crate::filter::ToneFilterParameters;
use crate::{MAX_HARMONICS, MAX_STAGES};

const HALF_PI: f32 = core::f32::consts::FRAC_PI_2;

static HARMONIC_MULTIPLIERS: Once<[f32; MAX_HARMONICS]> = Once::new();

/// Multipliers of a purely harmonic series: `1, 2, 3, ...`.
pub fn harmonic_multipliers() -> &'static [f32; MAX_HARMONICS] {
    HARMONIC_MULTIPLIERS.call_once(|| core::array::from_fn(|n| (n + 1) as f32))
}

/// Curve mapping harmonic magnitudes to gains.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum MagnitudeType {
    #[default]
    Linear,
    Db40,
    Db60,
    Db80,
    Db100,
}

impl MagnitudeType {
    /// Gain for a magnitude in the range from `0` to `127`.
    pub fn gain(self, magnitude: u8) -> f32 {
        let attenuation = 1.0 - magnitude as f32 / 127.0;
        let floor: f32 = match self {
            Self::Linear => return 1.0 - attenuation,
            Self::Db40 => 0.01,
            Self::Db60 => 0.001,
            Self::Db80 => 0.0001,
            Self::Db100 => 0.00001,
        };

        (attenuation * floor.ln()).exp()
    }
}

/// How the output history of new filters is initialised.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum StartPolicy {
    /// Start from silence.
    #[default]
    Cold,
    /// Start from an oscillation of random phase and random amplitude.
    RandomAmplitude,
    /// Start from an oscillation of random phase and full amplitude.
    Warm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panning {
    /// Pick a random position for every note.
    Random,
    /// Fixed position in the range from `0` (left) to `127` (right).
    Fixed(u8),
}

impl Default for Panning {
    fn default() -> Self {
        Self::Fixed(64)
    }
}

impl Panning {
    /// Left and right gains for a position `t` in the range from `0.0` to `1.0`.
    pub fn gains_at(t: f32) -> (f32, f32) {
        ((t * HALF_PI).cos(), ((1.0 - t) * HALF_PI).cos())
    }

    /// Gains of a fixed position, `None` for random panning.
    pub fn fixed_gains(self) -> Option<(f32, f32)> {
        match self {
            Self::Random => None,
            Self::Fixed(position) => {
                let t = position.saturating_sub(1).min(126) as f32 / 126.0;
                Some(Self::gains_at(t))
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DetuneType {
    /// Fine detune up to 35 cents.
    #[default]
    L35Cents,
    /// Fine detune up to 10 cents.
    L10Cents,
    /// Exponential fine detune up to 100 cents.
    E100Cents,
    /// Exponential fine detune up to 1200 cents, coarse steps of a fifth.
    E1200Cents,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Detune {
    pub kind: DetuneType,
    /// Octave shift in the range from `-8` to `7`.
    pub octave: i8,
    /// Coarse detune steps in the range from `-64` to `63`.
    pub coarse: i16,
    /// Fine detune in the range from `-8192` to `8191`.
    pub fine: i16,
}

impl Detune {
    pub fn cents(&self) -> f32 {
        let octave = self.octave as f32 * 1200.0;
        let coarse = self.coarse as f32;
        let fine = self.fine as f32 / 8192.0;

        let (coarse_cents, fine_cents) = match self.kind {
            DetuneType::L35Cents => (coarse * 50.0, fine.abs() * 35.0),
            DetuneType::L10Cents => (coarse * 10.0, fine.abs() * 10.0),
            DetuneType::E100Cents => (
                coarse * 100.0,
                10.0_f32.powf(fine.abs() * 3.0) * 10.0 - 10.0,
            ),
            DetuneType::E1200Cents => (
                coarse * 701.955,
                (2.0_f32.powf(fine.abs() * 12.0) - 1.0) / 4095.0 * 1200.0,
            ),
        };

        octave + coarse_cents + fine_cents.copysign(fine)
    }
}

/// Global tone filter settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalFilter {
    pub filter: ToneFilterParameters,
    /// Velocity sensing amount in the range from `0` to `127`.
    pub velocity_scale: u8,
    /// Velocity sensing curve in the range from `0` to `127`.
    pub velocity_scale_function: u8,
    /// Cutoff envelope, in octaves.
    pub envelope: EnvelopeParameters,
}

impl Default for GlobalFilter {
    fn default() -> Self {
        Self {
            filter: ToneFilterParameters::default(),
            velocity_scale: 0,
            velocity_scale_function: 64,
            envelope: EnvelopeParameters::adsr(EnvelopeMode::Filter, 0.0, 100.0, 0.0, 100.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubParameters {
    /// Magnitude of every harmonic in the range from `0` to `127`; `0`
    /// disables the harmonic.
    pub harmonic_magnitudes: [u8; MAX_HARMONICS],
    /// Relative bandwidth of every harmonic in the range from `0` to `127`.
    /// Default is `64`.
    pub harmonic_bandwidths: [u8; MAX_HARMONICS],
    /// Frequency of every harmonic relative to the base frequency.
    pub overtone_multipliers: [f32; MAX_HARMONICS],
    pub magnitude_type: MagnitudeType,

    /// Volume in the range from `0` to `127`. Default is `96` (0 dB).
    pub volume: u8,
    /// Amplitude velocity sensing in the range from `0` to `127`.
    pub amp_velocity_scale: u8,
    pub panning: Panning,
    pub stereo: bool,

    /// Filter stages per harmonic, `1` to [`MAX_STAGES`].
    pub num_stages: usize,
    pub start: StartPolicy,

    /// Pitch bend sensitivity in the range from `0` to `127`; `64` ignores
    /// the wheel, `88` follows it.
    pub bend_adjust: u8,
    /// Frequency offset added to every harmonic, `64` is none.
    pub offset_hz: u8,
    /// Bandwidth in the range from `0` to `127`.
    pub bandwidth: u8,
    /// Bandwidth scaling with frequency, `64` is none.
    pub bandwidth_scale: u8,

    /// Play every key at 440 Hz.
    pub fixed_freq: bool,
    /// Key tracking applied in fixed frequency mode, `0` disables it.
    pub fixed_freq_et: u8,
    pub detune: Detune,

    pub amp_envelope: EnvelopeParameters,
    /// Pitch envelope in cents.
    pub freq_envelope: Option<EnvelopeParameters>,
    /// Bandwidth envelope in octaves.
    pub bandwidth_envelope: Option<EnvelopeParameters>,
    pub global_filter: Option<GlobalFilter>,

    revision: u32,
}

impl Default for SubParameters {
    fn default() -> Self {
        let mut harmonic_magnitudes = [0; MAX_HARMONICS];
        harmonic_magnitudes[0] = 127;

        Self {
            harmonic_magnitudes,
            harmonic_bandwidths: [64; MAX_HARMONICS],
            overtone_multipliers: *harmonic_multipliers(),
            magnitude_type: MagnitudeType::Linear,
            volume: 96,
            amp_velocity_scale: 90,
            panning: Panning::default(),
            stereo: true,
            num_stages: 2,
            start: StartPolicy::Warm,
            bend_adjust: 88,
            offset_hz: 64,
            bandwidth: 40,
            bandwidth_scale: 64,
            fixed_freq: false,
            fixed_freq_et: 0,
            detune: Detune::default(),
            amp_envelope: EnvelopeParameters::default(),
            freq_envelope: None,
            bandwidth_envelope: None,
            global_filter: None,
            revision: 0,
        }
    }
}

impl SubParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags the parameters as edited. Voices pick the change up on their next
    /// block.
    pub fn mark_changed(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    #[inline]
    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        if !(1..=MAX_STAGES).contains(&self.num_stages) {
            return Err(ParameterError::StageCount(self.num_stages));
        }

        if let Some(n) = self
            .overtone_multipliers
            .iter()
            .position(|m| !m.is_finite() || *m <= 0.0)
        {
            return Err(ParameterError::OvertoneMultiplier(n));
        }

        self.amp_envelope.validate()?;
        if let Some(envelope) = &self.freq_envelope {
            envelope.validate()?;
        }
        if let Some(envelope) = &self.bandwidth_envelope {
            envelope.validate()?;
        }
        if let Some(global_filter) = &self.global_filter {
            global_filter.envelope.validate()?;
        }

        Ok(())
    }

    /// Pitch bend exponent. Ranges that are whole multiples of 24 steps give
    /// an exact integer exponent.
    pub fn bend_sensitivity(&self) -> f32 {
        let adjust = self.bend_adjust as i32 - 64;
        if adjust % 24 == 0 {
            (adjust / 24) as f32
        } else {
            adjust as f32 / 24.0
        }
    }

    /// Frequency offset in Hz added to every harmonic.
    pub fn offset_hz(&self) -> f32 {
        let offset = (self.offset_hz as f32 - 64.0) / 64.0;
        15.0 * (offset * offset.abs().sqrt())
    }

    /// Base volume before velocity sensing, from -60 dB to 0 dB at `96`.
    pub fn volume_gain(&self) -> f32 {
        0.1_f32.powf(3.0 * (1.0 - self.volume as f32 / 96.0))
    }

    /// Gain of harmonic `n` according to its magnitude.
    #[inline]
    pub fn harmonic_gain(&self, n: usize) -> f32 {
        self.magnitude_type.gain(self.harmonic_magnitudes[n])
    }

    /// Bandwidth of harmonic `n` at `freq` for a chain of `stages` filters,
    /// relative to the frequency and clamped to [`MAX_BANDWIDTH`].
    pub fn harmonic_bandwidth(&self, n: usize, freq: f32, stages: usize) -> f32 {
        let mut bw = 10.0_f32.powf((self.bandwidth as f32 - 127.0) / 127.0 * 4.0)
            * stages as f32;
        bw *= (1000.0 / freq).powf((self.bandwidth_scale as f32 - 64.0) / 64.0 * 3.0);
        bw *= 100.0_f32.powf((self.harmonic_bandwidths[n] as f32 - 64.0) / 64.0);

        bw.min(MAX_BANDWIDTH)
    }
}

/// Ceiling of the relative bandwidth of a harmonic.
pub const MAX_BANDWIDTH: f32 = 25.0;

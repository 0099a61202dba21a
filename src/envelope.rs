//! Multi-point envelope generator evaluated once per rendered block.
//!
//! An envelope is a list of points. Point 0 holds the start value, each
//! following point is reached after its duration. One point may be marked as
//! the sustain point: the envelope holds there until the key is released,
//! then glides from wherever it is towards the point after the sustain point
//! and runs the remaining segments.

use alloc::boxed::Box;
use alloc::vec::Vec;

#[allow(unused_imports)]
use num_traits::float::Float;

use crate::error::ParameterError;
use crate::utils::units::db_to_ratio;

/// Dynamic range covered by an amplitude envelope going from level 0 to 1.
pub const AMPLITUDE_ENVELOPE_DB_RANGE: f32 = 40.0;

/// Unit of the values produced by an envelope.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeMode {
    /// Level in the range from `0.0` to `1.0`, mapped to decibels.
    #[default]
    AmplitudeDb,
    /// Pitch offset in cents.
    Frequency,
    /// Bandwidth offset in octaves.
    Bandwidth,
    /// Filter cutoff offset in octaves.
    Filter,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct EnvelopePoint {
    /// Time to reach this point from the previous one, in milliseconds.
    /// Ignored for the first point.
    pub duration_ms: f32,
    pub value: f32,
}

impl EnvelopePoint {
    pub const fn new(duration_ms: f32, value: f32) -> Self {
        Self { duration_ms, value }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopeParameters {
    pub mode: EnvelopeMode,
    pub points: Vec<EnvelopePoint>,
    /// Index of the point held while the key is down.
    pub sustain: Option<usize>,
    /// Stretches segment times for notes below 440 Hz and shrinks them above.
    /// Range: 0 - 127, 0 disables stretching.
    pub stretch: u8,
}

impl Default for EnvelopeParameters {
    fn default() -> Self {
        Self::adsr(EnvelopeMode::AmplitudeDb, 0.0, 80.0, 1.0, 50.0)
    }
}

impl EnvelopeParameters {
    /// Attack to 1.0, decay to `sustain`, release back to 0.0.
    pub fn adsr(
        mode: EnvelopeMode,
        attack_ms: f32,
        decay_ms: f32,
        sustain: f32,
        release_ms: f32,
    ) -> Self {
        Self {
            mode,
            points: alloc::vec![
                EnvelopePoint::new(0.0, 0.0),
                EnvelopePoint::new(attack_ms, 1.0),
                EnvelopePoint::new(decay_ms, sustain),
                EnvelopePoint::new(release_ms, 0.0),
            ],
            sustain: Some(2),
            stretch: 0,
        }
    }

    /// Glide from `start` to `sustain`, then from `sustain` to `release` after
    /// the key is released.
    pub fn asr(
        mode: EnvelopeMode,
        start: f32,
        attack_ms: f32,
        sustain: f32,
        release_ms: f32,
        release: f32,
    ) -> Self {
        Self {
            mode,
            points: alloc::vec![
                EnvelopePoint::new(0.0, start),
                EnvelopePoint::new(attack_ms, sustain),
                EnvelopePoint::new(release_ms, release),
            ],
            sustain: Some(1),
            stretch: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.points.is_empty() {
            return Err(ParameterError::EmptyEnvelope);
        }
        if let Some(sustain) = self.sustain {
            if sustain >= self.points.len() {
                return Err(ParameterError::SustainPoint(sustain));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Envelope {
    /// Per-point values.
    values: Box<[f32]>,
    /// Per-point phase increment per block; `>= 1.0` means instantaneous.
    increments: Box<[f32]>,
    sustain: Option<usize>,

    current_point: usize,
    t: f32,
    increment: f32,
    out_value: f32,
    /// Value the forced release glides from.
    release_value: f32,
    key_released: bool,
    forced_release: bool,
    finished: bool,
}

impl Envelope {
    /// Builds an envelope advancing by `tick_seconds` per call of
    /// [`Envelope::env_out`].
    pub fn new(parameters: &EnvelopeParameters, base_freq: f32, tick_seconds: f32) -> Self {
        let stretch = (440.0 / base_freq).powf(parameters.stretch as f32 / 64.0);

        let values: Box<[f32]> = parameters.points.iter().map(|p| p.value).collect();
        let increments: Box<[f32]> = parameters
            .points
            .iter()
            .map(|p| {
                let seconds = p.duration_ms * 0.001 * stretch;
                if seconds > 0.0 {
                    tick_seconds / seconds
                } else {
                    2.0
                }
            })
            .collect();

        let point_count = values.len();
        let increment = if point_count > 1 { increments[1] } else { 2.0 };
        let out_value = values.first().copied().unwrap_or(0.0);

        Self {
            values,
            increments,
            sustain: parameters.sustain,
            current_point: 1,
            t: 0.0,
            increment,
            out_value,
            release_value: out_value,
            key_released: false,
            forced_release: false,
            finished: point_count < 2,
        }
    }

    /// Starts the release phase.
    pub fn release_key(&mut self) {
        if self.key_released {
            return;
        }
        self.key_released = true;
        if self.sustain.is_some() && !self.finished {
            self.forced_release = true;
            self.release_value = self.out_value;
            self.t = 0.0;
        }
    }

    #[inline]
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Last value produced, without advancing.
    #[inline]
    pub fn value(&self) -> f32 {
        self.out_value
    }

    /// Current value, advancing the envelope by one block.
    pub fn env_out(&mut self) -> f32 {
        if self.finished {
            return self.out_value;
        }

        if let Some(sustain) = self.sustain {
            if !self.key_released && self.current_point == sustain + 1 {
                self.out_value = self.values[sustain];
                return self.out_value;
            }

            if self.forced_release {
                let release_point = sustain + 1;
                if release_point >= self.values.len() {
                    self.finished = true;
                    return self.out_value;
                }

                let increment = self.increments[release_point];
                let out = if increment >= 1.0 {
                    self.values[release_point]
                } else {
                    self.release_value + (self.values[release_point] - self.release_value) * self.t
                };

                self.t += increment;
                if self.t >= 1.0 {
                    self.current_point = release_point + 1;
                    self.forced_release = false;
                    self.t = 0.0;
                    if self.current_point >= self.values.len() {
                        self.finished = true;
                    } else {
                        self.increment = self.increments[self.current_point];
                    }
                }

                self.out_value = out;
                return out;
            }
        }

        let point = self.current_point;
        let out = if self.increment >= 1.0 {
            self.values[point]
        } else {
            self.values[point - 1] + (self.values[point] - self.values[point - 1]) * self.t
        };

        self.t += self.increment;
        if self.t >= 1.0 {
            let hold = self.sustain == Some(point) && !self.key_released;
            if point >= self.values.len() - 1 && !hold {
                self.finished = true;
            } else {
                self.current_point += 1;
            }
            self.t = 0.0;
            self.increment = self.increments[self.current_point.min(self.values.len() - 1)];
        }

        self.out_value = out;
        out
    }

    /// Current value of an amplitude envelope as a linear gain, advancing the
    /// envelope by one block.
    pub fn env_out_db(&mut self) -> f32 {
        level_to_gain(self.env_out())
    }
}

/// Maps an amplitude envelope level to a gain along a decibel curve.
#[inline]
pub fn level_to_gain(level: f32) -> f32 {
    db_to_ratio((level.clamp(0.0, 1.0) - 1.0) * AMPLITUDE_ENVELOPE_DB_RANGE)
}

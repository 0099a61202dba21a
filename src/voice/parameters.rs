//! Note and per-block parameter computation.

#[allow(unused_imports)]
use num_traits::float::Float;

use super::SubVoice;
use crate::controller::Controller;
use crate::filter::ToneFilter;
use crate::filter_bank::Channel;
use crate::legato::LegatoNote;
use crate::params::{StartPolicy, SubParameters};
use crate::utils::random::RandomSource;
use crate::utils::units::{cents_to_ratio, octaves_to_ratio};
use crate::utils::velocity_scale;
use crate::SampleRate;

const TWO_PI: f32 = 2.0 * core::f32::consts::PI;

/// Base frequency of a note before pitch modulation.
pub(super) fn note_base_freq(params: &SubParameters, note: &LegatoNote) -> f32 {
    let mut base_freq = note.freq;

    if params.fixed_freq {
        base_freq = 440.0;
        let et = params.fixed_freq_et;
        if et > 0 {
            let tmp = (note.midi_note as f32 - 69.0) / 12.0
                * 2.0_f32.powf((et as f32 - 1.0) / 63.0 - 1.0);
            base_freq *= if et <= 64 {
                2.0_f32.powf(tmp)
            } else {
                3.0_f32.powf(tmp)
            };
        }
    }

    base_freq * cents_to_ratio(params.detune.cents())
}

/// Attenuation of a harmonic close to the subsonic range or to Nyquist.
pub fn rolloff(freq: f32, sample_rate: &SampleRate) -> f32 {
    const LOWER_LIMIT: f32 = 10.0;
    const LOWER_WIDTH: f32 = 10.0;
    const UPPER_WIDTH: f32 = 200.0;
    let upper_limit = sample_rate.half_sample_rate_hz;

    if freq > LOWER_LIMIT + LOWER_WIDTH && freq < upper_limit - UPPER_WIDTH {
        return 1.0;
    }
    if freq <= LOWER_LIMIT || freq >= upper_limit {
        return 0.0;
    }
    if freq <= LOWER_LIMIT + LOWER_WIDTH {
        return (1.0 - (core::f32::consts::PI * (freq - LOWER_LIMIT) / LOWER_WIDTH).cos()) / 2.0;
    }

    (1.0 - (core::f32::consts::PI * (freq - upper_limit) / UPPER_WIDTH).cos()) / 2.0
}

impl SubVoice {
    pub(super) fn set_base_freq(&mut self, params: &SubParameters, note: &LegatoNote) {
        self.base_freq = note_base_freq(params, note);
    }

    /// Derives everything that depends on the note and the static parameters:
    /// volume, bend sensitivity, filter bank targets and tone filter centre.
    pub(super) fn compute_note_parameters(
        &mut self,
        params: &SubParameters,
        controller: &Controller,
        rng: &mut dyn RandomSource,
        note: &LegatoNote,
    ) {
        self.volume = params.volume_gain();
        self.volume *= velocity_scale(note.velocity, params.amp_velocity_scale);

        self.bend_sensitivity = params.bend_sensitivity();

        if let (Some(state), Some(global_filter)) =
            (&mut self.global_filter, &params.global_filter)
        {
            state.center_pitch = global_filter.filter.center_pitch()
                + (global_filter.velocity_scale as f32 / 127.0 * 6.0)
                    * (velocity_scale(note.velocity, global_filter.velocity_scale_function) - 1.0);
        }

        self.update_filter_bank(params, controller, rng);

        if let (Some(state), Some(global_filter)) =
            (&mut self.global_filter, &params.global_filter)
        {
            state.center_q = global_filter.filter.center_q();
            state.freq_tracking = global_filter.filter.freq_tracking(self.base_freq);
        }
    }

    /// Enables new harmonics and sets frequency, bandwidth and gain of every
    /// active filter. The overall volume is normalized by the summed harmonic
    /// gains.
    fn update_filter_bank(
        &mut self,
        params: &SubParameters,
        controller: &Controller,
        rng: &mut dyn RandomSource,
    ) {
        let added = self
            .bank
            .grow(&params.harmonic_magnitudes, self.base_freq, &self.sample_rate);
        let offset_hz = params.offset_hz();
        let mut reduce_amp = 0.0;

        for slot in 0..self.bank.active() {
            let position = self.bank.position(slot);
            let freq = self.base_freq * params.overtone_multipliers[position];
            self.overtone_rolloff[slot] = rolloff(freq, &self.sample_rate);

            let bw = params.harmonic_bandwidth(position, freq, self.num_stages);

            // Keeps loudness roughly constant across frequencies and bandwidths.
            let mut gain = (1500.0 / (bw * freq)).sqrt();
            let hgain = params.harmonic_gain(position);
            gain *= hgain;
            reduce_amp += hgain;

            for &channel in self.channels() {
                for (stage, filter) in self.bank.chain_mut(channel, slot).iter_mut().enumerate() {
                    filter.amp = if stage == 0 { gain } else { 1.0 };
                    filter.freq = freq + offset_hz;
                    filter.bw = bw;
                }
            }
        }

        self.init_filters(self.bank.active() - added, params, rng);

        let (env_freq, env_bw) = self.filter_modulation(controller, false);
        self.compute_all_filter_coefs(controller, env_freq, env_bw);

        if reduce_amp < 0.001 {
            reduce_amp = 1.0;
        }
        self.volume /= reduce_amp;
    }

    /// Seeds the history of the filters from `first_slot` on.
    fn init_filters(&mut self, first_slot: usize, params: &SubParameters, rng: &mut dyn RandomSource) {
        let sample_rate = self.sample_rate;
        let start = self.start;

        for slot in first_slot..self.bank.active() {
            let hgain = params.harmonic_gain(self.bank.position(slot));
            for &channel in self.channels() {
                for filter in self.bank.chain_mut(channel, slot) {
                    match start {
                        StartPolicy::Cold => filter.reset(),
                        StartPolicy::RandomAmplitude | StartPolicy::Warm => {
                            let mut amplitude = 0.1 * hgain;
                            let phase = rng.get_float() * TWO_PI;
                            if start == StartPolicy::RandomAmplitude {
                                amplitude *= rng.get_float();
                            }
                            filter.seed(amplitude, phase, &sample_rate);
                        }
                    }
                }
            }
        }
    }

    /// Frequency and bandwidth multipliers from envelopes and controllers.
    ///
    /// Envelopes are advanced by one block when `advance` is set and only read
    /// otherwise.
    fn filter_modulation(&mut self, controller: &Controller, advance: bool) -> (f32, f32) {
        let mut env_freq = match &mut self.freq_envelope {
            Some(envelope) if advance => cents_to_ratio(envelope.env_out()),
            Some(envelope) => cents_to_ratio(envelope.value()),
            None => 1.0,
        };

        env_freq *= controller.pitch_wheel.rel_freq.powf(self.bend_sensitivity);

        if self.portamento {
            env_freq *= controller.portamento.freq_ratio;
            if !controller.portamento.used {
                self.portamento = false;
            }
        }

        let mut env_bw = match &mut self.bandwidth_envelope {
            Some(envelope) if advance => octaves_to_ratio(envelope.env_out()),
            Some(envelope) => octaves_to_ratio(envelope.value()),
            None => 1.0,
        };
        env_bw *= controller.bandwidth.rel_bw;

        (env_freq, env_bw)
    }

    fn compute_all_filter_coefs(&mut self, controller: &Controller, env_freq: f32, env_bw: f32) {
        let sample_rate = self.sample_rate;
        let stages = self.bank.stages();
        let first_stage_gain = 1.0 / (env_bw * env_freq).sqrt();

        for &channel in self.channels() {
            for (n, filter) in self.bank.units_mut(channel).iter_mut().enumerate() {
                let gain = if n % stages == 0 { first_stage_gain } else { 1.0 };
                let freq = filter.freq * env_freq;
                let bw = filter.bw * env_bw;
                filter.set_coefficients(freq, bw, gain, &sample_rate);
            }
        }

        self.old_bandwidth = controller.bandwidth.data;
        self.old_pitch_wheel = controller.pitch_wheel.data;
    }

    /// Samples the modulation sources for the next block.
    ///
    /// Filter coefficients are only recomputed when a source has moved or an
    /// envelope is driving them.
    pub fn compute_current_parameters(&mut self, controller: &Controller) {
        if self.freq_envelope.is_some()
            || self.bandwidth_envelope.is_some()
            || self.old_pitch_wheel != controller.pitch_wheel.data
            || self.old_bandwidth != controller.bandwidth.data
            || self.portamento
        {
            let (env_freq, env_bw) = self.filter_modulation(controller, true);
            self.compute_all_filter_coefs(controller, env_freq, env_bw);
        }

        self.new_amplitude = self.volume * self.amp_envelope.env_out_db() * 2.0;

        if let Some(state) = &mut self.global_filter {
            let pitch = state.center_pitch
                + state.envelope.env_out()
                + controller.filter_cutoff.rel_freq
                + state.freq_tracking;
            let freq = ToneFilter::real_freq(pitch);
            let q = state.center_q * controller.filter_q.rel_q;

            state.left.set_freq_and_q(freq, q);
            if let Some(right) = &mut state.right {
                right.set_freq_and_q(freq, q);
            }
        }
    }

    #[inline]
    pub(super) fn channels(&self) -> &'static [Channel] {
        if self.stereo {
            &[Channel::Left, Channel::Right]
        } else {
            &[Channel::Left]
        }
    }
}

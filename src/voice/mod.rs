//! Subtractive synthesis voice.
//!
//! A voice renders one note: white noise runs through a chain of band-pass
//! filters for every enabled harmonic, the chains are summed, optionally
//! shaped by a global tone filter and scaled by the amplitude envelope.
//!
//! The host calls [`SubVoice::render`] once per block from its audio thread
//! until it returns `false`, lending the voice its random source and scratch
//! buffers for the duration of the call.

mod parameters;
mod render;

use alloc::boxed::Box;
use alloc::vec;

use crate::controller::Controller;
use crate::envelope::Envelope;
use crate::error::ParameterError;
use crate::filter::ToneFilter;
use crate::filter_bank::FilterBank;
use crate::legato::{Legato, LegatoAction, LegatoMode, LegatoNote};
use crate::params::{Panning, StartPolicy, SubParameters};
use crate::utils::random::RandomSource;
use crate::{SampleRate, MAX_HARMONICS};

pub use render::ScratchBuffers;

/// Global tone filter of a voice, one filter per channel.
#[derive(Debug, Clone)]
struct GlobalFilterState {
    left: ToneFilter,
    right: Option<ToneFilter>,
    envelope: Envelope,
    /// Cutoff in octaves relative to 1 kHz, including velocity sensing.
    center_pitch: f32,
    center_q: f32,
    /// Keyboard tracking in octaves.
    freq_tracking: f32,
}

#[derive(Debug, Clone)]
pub struct SubVoice {
    sample_rate: SampleRate,
    block_size: usize,

    enabled: bool,
    ready: bool,
    stereo: bool,
    num_stages: usize,
    start: StartPolicy,
    first_tick: bool,
    portamento: bool,
    /// Parameter revision the voice was last computed from.
    revision: u32,

    /// Note currently applied.
    note: LegatoNote,
    base_freq: f32,
    volume: f32,
    bend_sensitivity: f32,

    old_amplitude: f32,
    new_amplitude: f32,
    old_pitch_wheel: i32,
    old_bandwidth: i32,
    random_pan: (f32, f32),

    bank: FilterBank,
    overtone_rolloff: Box<[f32]>,

    amp_envelope: Envelope,
    freq_envelope: Option<Envelope>,
    bandwidth_envelope: Option<Envelope>,
    global_filter: Option<GlobalFilterState>,

    legato: Legato,
}

impl SubVoice {
    /// Starts a note.
    ///
    /// `block_size` is the largest block the host will ask for; envelopes
    /// advance by one block of that size per rendered block. A `silent` voice
    /// renders nothing until a legato request fades it in.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        params: &SubParameters,
        controller: &Controller,
        sample_rate: SampleRate,
        block_size: usize,
        note: LegatoNote,
        silent: bool,
        rng: &mut dyn RandomSource,
    ) -> Result<Self, ParameterError> {
        if let Err(err) = validate(params, &sample_rate, block_size, &note) {
            log::warn!("voice not started: {}", err);
            return Err(err);
        }

        let t = rng.get_float();
        let random_pan = Panning::gains_at(t);
        let tick_seconds = block_size as f32 * sample_rate.inv_sr;

        let base_freq = parameters::note_base_freq(params, &note);
        let envelope_freq = if params.fixed_freq {
            base_freq / 440.0 * note.freq
        } else {
            base_freq
        };

        let mut voice = Self {
            sample_rate,
            block_size,
            enabled: true,
            ready: false,
            stereo: params.stereo,
            num_stages: params.num_stages,
            start: params.start,
            first_tick: true,
            portamento: note.portamento,
            revision: params.revision(),
            note,
            base_freq,
            volume: 0.0,
            bend_sensitivity: 0.0,
            old_amplitude: 0.0,
            new_amplitude: 0.0,
            old_pitch_wheel: 0,
            old_bandwidth: 64,
            random_pan,
            bank: FilterBank::new(params.num_stages, params.stereo),
            overtone_rolloff: vec![0.0; MAX_HARMONICS].into_boxed_slice(),
            amp_envelope: Envelope::new(&params.amp_envelope, envelope_freq, tick_seconds),
            freq_envelope: params
                .freq_envelope
                .as_ref()
                .map(|envelope| Envelope::new(envelope, envelope_freq, tick_seconds)),
            bandwidth_envelope: params
                .bandwidth_envelope
                .as_ref()
                .map(|envelope| Envelope::new(envelope, envelope_freq, tick_seconds)),
            global_filter: params.global_filter.as_ref().map(|global_filter| {
                GlobalFilterState {
                    left: ToneFilter::new(&global_filter.filter, sample_rate),
                    right: params
                        .stereo
                        .then(|| ToneFilter::new(&global_filter.filter, sample_rate)),
                    envelope: Envelope::new(&global_filter.envelope, envelope_freq, tick_seconds),
                    center_pitch: 0.0,
                    center_q: 1.0,
                    freq_tracking: 0.0,
                }
            }),
            legato: Legato::new(note, silent, &sample_rate),
        };

        voice.compute_note_parameters(params, controller, rng, &note);
        voice.compute_current_parameters(controller);
        voice.old_amplitude = voice.new_amplitude;
        voice.ready = true;

        log::debug!(
            "voice started: {} Hz, {} harmonics, {} stages{}",
            voice.base_freq,
            voice.bank.active(),
            voice.num_stages,
            if voice.stereo { ", stereo" } else { "" }
        );

        Ok(voice)
    }

    /// Retargets the sounding voice to a new note.
    ///
    /// Requests from the host (`external`) go through the legato transition;
    /// internal ones apply the note right away.
    pub fn legato_note(
        &mut self,
        params: &SubParameters,
        controller: &Controller,
        rng: &mut dyn RandomSource,
        note: LegatoNote,
        external: bool,
    ) {
        if !external {
            self.apply_note(params, controller, rng, &note);
            return;
        }

        if let LegatoAction::Retune(note) = self.legato.request(note) {
            self.apply_note(params, controller, rng, &note);
        }
    }

    fn apply_note(
        &mut self,
        params: &SubParameters,
        controller: &Controller,
        rng: &mut dyn RandomSource,
        note: &LegatoNote,
    ) {
        self.note = *note;
        self.portamento = note.portamento;
        self.set_base_freq(params, note);

        self.old_pitch_wheel = 0;
        self.old_bandwidth = 64;

        self.compute_note_parameters(params, controller, rng, note);
        self.old_amplitude = self.new_amplitude;
        self.legato.settle();
    }

    /// Note off: starts the release phase of every envelope.
    pub fn release_key(&mut self) {
        self.amp_envelope.release_key();
        if let Some(envelope) = &mut self.freq_envelope {
            envelope.release_key();
        }
        if let Some(envelope) = &mut self.bandwidth_envelope {
            envelope.release_key();
        }
        if let Some(global_filter) = &mut self.global_filter {
            global_filter.envelope.release_key();
        }
    }

    /// Stops the voice at once. Following renders produce no output.
    pub fn kill(&mut self) {
        if self.enabled {
            log::debug!("voice stopped: {} Hz", self.base_freq);
        }
        self.enabled = false;
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    #[inline]
    pub fn base_freq(&self) -> f32 {
        self.base_freq
    }

    /// Note currently applied, which differs from the legato target while a
    /// transition is running.
    #[inline]
    pub fn note(&self) -> &LegatoNote {
        &self.note
    }

    #[inline]
    pub fn volume(&self) -> f32 {
        self.volume
    }

    #[inline]
    pub fn bend_sensitivity(&self) -> f32 {
        self.bend_sensitivity
    }

    /// Amplitudes the current block ramps between.
    #[inline]
    pub fn amplitudes(&self) -> (f32, f32) {
        (self.old_amplitude, self.new_amplitude)
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn filter_bank(&self) -> &FilterBank {
        &self.bank
    }

    #[inline]
    pub fn overtone_rolloff(&self, slot: usize) -> f32 {
        self.overtone_rolloff[slot]
    }

    #[inline]
    pub fn legato_mode(&self) -> LegatoMode {
        self.legato.mode()
    }

    #[inline]
    pub fn legato(&self) -> &Legato {
        &self.legato
    }
}

fn validate(
    params: &SubParameters,
    sample_rate: &SampleRate,
    block_size: usize,
    note: &LegatoNote,
) -> Result<(), ParameterError> {
    params.validate()?;

    if !sample_rate.sample_rate_hz.is_finite() || sample_rate.sample_rate_hz <= 0.0 {
        return Err(ParameterError::SampleRate(sample_rate.sample_rate_hz));
    }
    if block_size == 0 {
        return Err(ParameterError::BlockSize);
    }
    if !note.freq.is_finite() || note.freq <= 0.0 {
        return Err(ParameterError::Frequency(note.freq));
    }
    if !(0.0..=1.0).contains(&note.velocity) {
        return Err(ParameterError::Velocity(note.velocity));
    }

    Ok(())
}

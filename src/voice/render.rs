//! Block rendering.

use alloc::boxed::Box;
use alloc::vec;

use super::SubVoice;
use crate::controller::Controller;
use crate::filter_bank::Channel;
use crate::legato::LegatoAction;
use crate::params::SubParameters;
use crate::utils::random::RandomSource;
use crate::utils::{above_amplitude_threshold, interpolate_amplitude, raised_cosine};

/// Length of the fade applied to the very first block of a note.
const FIRST_TICK_FADE: usize = 10;

/// Working memory lent to a voice while it renders.
///
/// One set is enough for all voices rendered by the same thread.
#[derive(Debug, Clone)]
pub struct ScratchBuffers {
    noise: Box<[f32]>,
    work: Box<[f32]>,
}

impl ScratchBuffers {
    pub fn new(block_size: usize) -> Self {
        Self {
            noise: vec![0.0; block_size].into_boxed_slice(),
            work: vec![0.0; block_size].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.noise.len()
    }
}

impl SubVoice {
    /// Renders one block into `out_l` and `out_r`.
    ///
    /// Both buffers are overwritten. Blocks are limited to the size of the
    /// scratch buffers. Returns `false` once the voice has finished; the
    /// buffers are left silent in that case.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        params: &SubParameters,
        controller: &Controller,
        rng: &mut dyn RandomSource,
        scratch: &mut ScratchBuffers,
        out_l: &mut [f32],
        out_r: &mut [f32],
    ) -> bool {
        let size = out_l.len().min(out_r.len()).min(scratch.block_size());
        out_l.fill(0.0);
        out_r.fill(0.0);

        if !self.enabled {
            return false;
        }

        let out_l = &mut out_l[..size];
        let out_r = &mut out_r[..size];

        if params.revision() != self.revision {
            self.revision = params.revision();
            let note = self.note;
            self.set_base_freq(params, &note);
            self.compute_note_parameters(params, controller, rng, &note);
        }

        self.render_channel(Channel::Left, rng, scratch, out_l);
        if let Some(state) = &mut self.global_filter {
            state.left.filter_out(out_l);
        }

        if self.stereo {
            self.render_channel(Channel::Right, rng, scratch, out_r);
            if let Some(right) = self.global_filter.as_mut().and_then(|s| s.right.as_mut()) {
                right.filter_out(out_r);
            }
        } else {
            out_r.copy_from_slice(out_l);
        }

        if self.first_tick {
            let length = FIRST_TICK_FADE.min(size);
            for i in 0..length {
                let fade = raised_cosine(i, length);
                out_l[i] *= fade;
                out_r[i] *= fade;
            }
            self.first_tick = false;
        }

        let (pan_l, pan_r) = params.panning.fixed_gains().unwrap_or(self.random_pan);

        if above_amplitude_threshold(self.old_amplitude, self.new_amplitude) {
            for (i, (left, right)) in out_l.iter_mut().zip(out_r.iter_mut()).enumerate() {
                let amplitude =
                    interpolate_amplitude(self.old_amplitude, self.new_amplitude, i, size);
                *left *= amplitude * pan_l;
                *right *= amplitude * pan_r;
            }
        } else {
            let gain_l = self.new_amplitude * pan_l;
            let gain_r = self.new_amplitude * pan_r;
            for (left, right) in out_l.iter_mut().zip(out_r.iter_mut()) {
                *left *= gain_l;
                *right *= gain_r;
            }
        }

        self.old_amplitude = self.new_amplitude;
        self.compute_current_parameters(controller);

        if let LegatoAction::Retune(note) = self.legato.process(out_l, out_r) {
            self.apply_note(params, controller, rng, &note);
        }

        if self.amp_envelope.finished() {
            for (i, (left, right)) in out_l.iter_mut().zip(out_r.iter_mut()).enumerate() {
                let fade = 1.0 - i as f32 / size as f32;
                *left *= fade;
                *right *= fade;
            }
            self.kill();
        }

        true
    }

    /// Sums every harmonic of one channel into `out`, each filtering its own
    /// copy of the same noise block.
    fn render_channel(
        &mut self,
        channel: Channel,
        rng: &mut dyn RandomSource,
        scratch: &mut ScratchBuffers,
        out: &mut [f32],
    ) {
        let size = out.len();
        let noise = &mut scratch.noise[..size];
        let work = &mut scratch.work[..size];

        for sample in noise.iter_mut() {
            *sample = rng.get_noise();
        }

        for slot in 0..self.bank.active() {
            work.copy_from_slice(noise);
            self.bank.process(channel, slot, work);

            let rolloff = self.overtone_rolloff[slot];
            for (sum, sample) in out.iter_mut().zip(work.iter()) {
                *sum += sample * rolloff;
            }
        }
    }
}

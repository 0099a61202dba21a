//! Bank of band-pass filter chains, one chain per enabled harmonic.
//!
//! Storage for every possible harmonic is allocated when the bank is built, so
//! enabling harmonics in the middle of a note only moves the active count and
//! never reallocates. Harmonics are appended in the order they are found and
//! are never removed: a slot keeps its filter state for the whole note.

use alloc::boxed::Box;
use alloc::vec;

use crate::filter::BandPass;
use crate::{SampleRate, MAX_HARMONICS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct FilterBank {
    stages: usize,
    stereo: bool,
    left: Box<[BandPass]>,
    right: Box<[BandPass]>,

    /// Index into the harmonic tables for every active slot.
    positions: [usize; MAX_HARMONICS],
    enabled: [bool; MAX_HARMONICS],
    active: usize,
}

impl FilterBank {
    pub fn new(stages: usize, stereo: bool) -> Self {
        let units = stages * MAX_HARMONICS;
        Self {
            stages,
            stereo,
            left: vec![BandPass::new(); units].into_boxed_slice(),
            right: vec![BandPass::new(); if stereo { units } else { 0 }].into_boxed_slice(),
            positions: [0; MAX_HARMONICS],
            enabled: [false; MAX_HARMONICS],
            active: 0,
        }
    }

    /// Enables every harmonic with a non-zero magnitude that is not yet in
    /// the bank, scanning upwards and stopping at the first harmonic whose
    /// `index × base_freq` lies above Nyquist.
    ///
    /// Returns the number of newly enabled harmonics. They occupy the last
    /// slots and start from default filter state.
    pub fn grow(
        &mut self,
        magnitudes: &[u8; MAX_HARMONICS],
        base_freq: f32,
        sample_rate: &SampleRate,
    ) -> usize {
        let previously_active = self.active;

        for (n, magnitude) in magnitudes.iter().enumerate() {
            if *magnitude == 0 || self.enabled[n] {
                continue;
            }
            if n as f32 * base_freq > sample_rate.half_sample_rate_hz {
                break;
            }
            self.positions[self.active] = n;
            self.enabled[n] = true;
            self.active += 1;
        }

        let added = self.active - previously_active;
        if added > 0 {
            let range = previously_active * self.stages..self.active * self.stages;
            self.left[range.clone()].fill(BandPass::new());
            if self.stereo {
                self.right[range].fill(BandPass::new());
            }
            log::debug!(
                "filter bank: {} harmonics enabled, {} active",
                added,
                self.active
            );
        }

        added
    }

    #[inline]
    pub fn active(&self) -> usize {
        self.active
    }

    #[inline]
    pub fn stages(&self) -> usize {
        self.stages
    }

    #[inline]
    pub fn is_stereo(&self) -> bool {
        self.stereo
    }

    /// Harmonic table index of every active slot.
    #[inline]
    pub fn positions(&self) -> &[usize] {
        &self.positions[..self.active]
    }

    #[inline]
    pub fn position(&self, slot: usize) -> usize {
        self.positions[slot]
    }

    /// Filter stages of an active slot.
    #[inline]
    pub fn chain(&self, channel: Channel, slot: usize) -> &[BandPass] {
        let range = slot * self.stages..(slot + 1) * self.stages;
        match channel {
            Channel::Left => &self.left[range],
            Channel::Right => &self.right[range],
        }
    }

    #[inline]
    pub fn chain_mut(&mut self, channel: Channel, slot: usize) -> &mut [BandPass] {
        let range = slot * self.stages..(slot + 1) * self.stages;
        match channel {
            Channel::Left => &mut self.left[range],
            Channel::Right => &mut self.right[range],
        }
    }

    /// All active filters of a channel.
    #[inline]
    pub fn units_mut(&mut self, channel: Channel) -> &mut [BandPass] {
        let end = self.active * self.stages;
        match channel {
            Channel::Left => &mut self.left[..end],
            Channel::Right => &mut self.right[..end],
        }
    }

    /// Runs `in_out` through every stage of one slot.
    #[inline]
    pub fn process(&mut self, channel: Channel, slot: usize, in_out: &mut [f32]) {
        for filter in self.chain_mut(channel, slot) {
            filter.process(in_out);
        }
    }
}

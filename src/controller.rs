//! Per-part performance controllers sampled by voices once per block.
//!
//! The host updates the controller from incoming MIDI data; voices only read
//! the derived values (`rel_freq`, `rel_bw`, `freq_ratio`, ...).

#[allow(unused_imports)]
use num_traits::float::Float;

use crate::utils::units::cents_to_ratio;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchWheel {
    /// Raw wheel position in the range from `-8192` to `8191`.
    pub data: i32,
    /// Bend range in cents at full deflection.
    pub bend_range: i32,
    /// Frequency ratio at the current position.
    pub rel_freq: f32,
}

impl Default for PitchWheel {
    fn default() -> Self {
        Self {
            data: 0,
            bend_range: 200,
            rel_freq: 1.0,
        }
    }
}

impl PitchWheel {
    pub fn set(&mut self, data: i32) {
        self.data = data.clamp(-8192, 8191);
        self.rel_freq = cents_to_ratio(self.data as f32 / 8192.0 * self.bend_range as f32);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bandwidth {
    /// Raw controller value in the range from `0` to `127`. Centre is `64`.
    pub data: i32,
    /// Depth in the range from `0` to `127`.
    pub depth: i32,
    /// Use the exponential law instead of the linear one.
    pub exponential: bool,
    /// Bandwidth multiplier.
    pub rel_bw: f32,
}

impl Default for Bandwidth {
    fn default() -> Self {
        Self {
            data: 64,
            depth: 64,
            exponential: false,
            rel_bw: 1.0,
        }
    }
}

impl Bandwidth {
    pub fn set(&mut self, data: i32) {
        self.data = data.clamp(0, 127);
        let value = self.data as f32;
        let depth = self.depth as f32;

        if self.exponential {
            self.rel_bw = 25.0_f32.powf((value - 64.0) / 64.0 * (depth / 64.0));
            return;
        }

        let mut range = 25.0_f32.powf((depth / 127.0).powf(1.5)) - 1.0;
        if value < 64.0 && depth >= 64.0 {
            range = 1.0;
        }
        self.rel_bw = ((value / 64.0 - 1.0) * range + 1.0).max(0.01);
    }
}

/// Glide between the previous and the current note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Portamento {
    /// Whether a glide is in progress.
    pub used: bool,
    /// Ratio applied to the target note frequency.
    pub freq_ratio: f32,
    origin_ratio: f32,
    x: f32,
    dx: f32,
}

impl Default for Portamento {
    fn default() -> Self {
        Self {
            used: false,
            freq_ratio: 1.0,
            origin_ratio: 1.0,
            x: 1.0,
            dx: 0.0,
        }
    }
}

impl Portamento {
    /// Starts a glide from `old_freq` to `new_freq` lasting `seconds`, with
    /// [`Portamento::update`] called every `tick_seconds`.
    pub fn start(&mut self, old_freq: f32, new_freq: f32, seconds: f32, tick_seconds: f32) {
        if seconds <= 0.0 || old_freq <= 0.0 || new_freq <= 0.0 {
            *self = Self::default();
            return;
        }

        self.origin_ratio = old_freq / new_freq;
        self.freq_ratio = self.origin_ratio;
        self.x = 0.0;
        self.dx = tick_seconds / seconds;
        self.used = true;
    }

    /// Advances the glide by one block.
    pub fn update(&mut self) {
        if !self.used {
            return;
        }

        self.x += self.dx;
        if self.x >= 1.0 {
            self.x = 1.0;
            self.used = false;
        }
        self.freq_ratio = (1.0 - self.x) * self.origin_ratio + self.x;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterCutoff {
    pub data: i32,
    pub depth: i32,
    /// Cutoff offset in octaves.
    pub rel_freq: f32,
}

impl Default for FilterCutoff {
    fn default() -> Self {
        Self {
            data: 64,
            depth: 64,
            rel_freq: 0.0,
        }
    }
}

impl FilterCutoff {
    pub fn set(&mut self, data: i32) {
        self.data = data.clamp(0, 127);
        self.rel_freq = (self.data as f32 - 64.0) * self.depth as f32 / 4096.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterQ {
    pub data: i32,
    pub depth: i32,
    /// Resonance multiplier.
    pub rel_q: f32,
}

impl Default for FilterQ {
    fn default() -> Self {
        Self {
            data: 64,
            depth: 64,
            rel_q: 1.0,
        }
    }
}

impl FilterQ {
    pub fn set(&mut self, data: i32) {
        self.data = data.clamp(0, 127);
        self.rel_q =
            30.0_f32.powf((self.data as f32 - 64.0) / 64.0 * (self.depth as f32 / 64.0));
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Controller {
    pub pitch_wheel: PitchWheel,
    pub bandwidth: Bandwidth,
    pub portamento: Portamento,
    pub filter_cutoff: FilterCutoff,
    pub filter_q: FilterQ,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }
}

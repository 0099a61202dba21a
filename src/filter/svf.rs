//! Zero-delay-feedback state variable filter.

#[allow(unused_imports)]
use num_traits::float::Float;

const M_PI_F: f32 = core::f32::consts::PI;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    #[default]
    LowPass,
    BandPass,
    BandPassNormalized,
    HighPass,
}

#[derive(Debug, Default, Clone)]
pub struct Svf {
    g: f32,
    r: f32,
    h: f32,
    state_1: f32,
    state_2: f32,
}

impl Svf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init(&mut self) {
        self.set_f_q(0.01, 100.0);
        self.reset();
    }

    pub fn reset(&mut self) {
        self.state_1 = 0.0;
        self.state_2 = 0.0;
    }

    /// Sets the normalized cutoff `f` (cycles per sample) and resonance.
    #[inline]
    pub fn set_f_q(&mut self, f: f32, resonance: f32) {
        // Clip coefficient to about 100.
        let f = f.clamp(0.0, 0.497);
        self.g = (M_PI_F * f).tan();
        self.r = 1.0 / resonance;
        self.h = 1.0 / (1.0 + self.r * self.g + self.g * self.g);
    }

    #[inline]
    pub fn process_replacing(&mut self, in_out: &mut [f32], mode: FilterMode) {
        let mut state_1 = self.state_1;
        let mut state_2 = self.state_2;

        for sample in in_out.iter_mut() {
            let hp = (*sample - self.r * state_1 - self.g * state_1 - state_2) * self.h;
            let bp = self.g * hp + state_1;
            state_1 = self.g * hp + bp;
            let lp = self.g * bp + state_2;
            state_2 = self.g * bp + lp;

            *sample = match mode {
                FilterMode::LowPass => lp,
                FilterMode::BandPass => bp,
                FilterMode::BandPassNormalized => bp * self.r,
                FilterMode::HighPass => hp,
            };
        }

        self.state_1 = state_1;
        self.state_2 = state_2;
    }
}

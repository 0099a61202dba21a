//! Uniform random number sources lent to voices by the host.

// Linear congruential generator constants from Numerical Recipes.

use dyn_clone::DynClone;

/// Source of uniformly distributed numbers in the range `0.0..1.0`.
///
/// The host owns the source and lends it to a voice for the duration of a
/// construction or render call.
pub trait RandomSource: DynClone {
    fn get_float(&mut self) -> f32;

    /// Uniform noise sample in the range `-1.0..1.0`.
    #[inline]
    fn get_noise(&mut self) -> f32 {
        self.get_float() * 2.0 - 1.0
    }
}

dyn_clone::clone_trait_object!(RandomSource);

/// Fast 32-bit pseudo random number generator.
#[derive(Debug, Clone)]
pub struct Lcg {
    state: u32,
}

impl Default for Lcg {
    fn default() -> Self {
        Self::new(0x21)
    }
}

impl Lcg {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    #[inline]
    pub fn get_word(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }
}

impl RandomSource for Lcg {
    #[inline]
    fn get_float(&mut self) -> f32 {
        // 24 bits keep the result strictly below 1.0 after rounding to f32.
        (self.get_word() >> 8) as f32 / 16777216.0
    }
}

/// Source that always sits in the middle of the range, producing zero noise.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silence;

impl RandomSource for Silence {
    #[inline]
    fn get_float(&mut self) -> f32 {
        0.5
    }
}

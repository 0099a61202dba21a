//! Filters used by the voice: the band-pass stages of the harmonic filter
//! bank and the global tone filter.

pub mod band_pass;
pub mod svf;
pub mod tone;

pub use band_pass::BandPass;
pub use svf::FilterMode;
pub use tone::{ToneFilter, ToneFilterParameters};

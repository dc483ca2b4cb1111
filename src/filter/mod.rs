pub mod biquad;

pub use biquad::{design_resonant_lowpass, section_is_stable, FilterCoeffs};

//! Per-key envelope time and depth multipliers.

use crate::constants::{ENVELOPE_STAGES, MIDDLEC};

use super::constant::{TKCATCONST, TKCATMULT};

/// Depth keyfollow exponent divisors, per envelope stage.
const DEPEXP: [f64; ENVELOPE_STAGES] = [3000.0, 950.0, 485.0, 255.0, 138.9];

/// Envelope multipliers for one key, 256 = unity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyLookup {
    pub(crate) env_time_mult: [i32; ENVELOPE_STAGES],
    pub(crate) env_depth_mult: [i32; ENVELOPE_STAGES],
}

impl KeyLookup {
    pub fn env_time_mult(&self) -> &[i32; ENVELOPE_STAGES] {
        &self.env_time_mult
    }

    pub fn env_depth_mult(&self) -> &[i32; ENVELOPE_STAGES] {
        &self.env_depth_mult
    }
}

/// Fills `key_lookup` for `key`. Stage 0 is never key-scaled.
pub fn init_key(key_lookup: &mut KeyLookup, key: u8) {
    let offset = key as f32 - MIDDLEC as f32;
    key_lookup.env_time_mult[0] = 256;
    key_lookup.env_depth_mult[0] = 256;

    for stage in 1..ENVELOPE_STAGES {
        let depth = 2.0f32.powf(offset / DEPEXP[stage] as f32);
        key_lookup.env_depth_mult[stage] = (depth * 256.0) as i32;

        let time = ((TKCATCONST[stage] * (MIDDLEC as f64 - key as f64)).exp() * TKCATMULT[stage]) as f32;
        key_lookup.env_time_mult[stage] = (time * 256.0) as i32;
    }
}

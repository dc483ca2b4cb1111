//! Constant tables: the rate-independent modulation curves, the envelope
//! timing tables and the filter coefficient table.

use once_cell::sync::Lazy;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha12Rng;

use crate::constants::*;
use crate::filter::design_resonant_lowpass;

use super::Tables;

/// Envelope time keyfollow exponential coefficients, per envelope stage.
pub(crate) const TKCATCONST: [f64; ENVELOPE_STAGES] =
    [0.0, 0.005853144, 0.011148054, 0.019086143, 0.023200245];
pub(crate) const TKCATMULT: [f64; ENVELOPE_STAGES] =
    [1.0, 1.058245688, 1.048488989, 1.016049301, 1.097538067];

/// Seed of the noise buffer. Any change alters rendered output.
pub const NOISE_SEED: u64 = 0x4d54_3332_4e4f_4953;
/// Range of the noise source, matching a 15-bit `rand()`.
const NOISE_RAND_MAX: i32 = 0x7fff;

/// ChaCha key of the noise generator: `NOISE_SEED` little-endian, four times.
fn noise_key() -> [u8; 32] {
    let mut key = [0u8; 32];
    for chunk in key.chunks_exact_mut(8) {
        chunk.copy_from_slice(&NOISE_SEED.to_le_bytes());
    }
    key
}

/// Pitch envelope depth adjustment, indexed by distance from the centre
/// depth (0..=50).
static PITCH_ADJUST: Lazy<[f32; 51]> = Lazy::new(|| {
    let mut table = [0.0f32; 51];
    for (lf, value) in table.iter_mut().enumerate() {
        let lf_f = lf as f32;
        *value = match lf {
            0 => 7.0,
            1 => 6.0,
            2 => 5.0,
            3 => 4.0,
            4 => 4.0 - 0.333333,
            5 => 4.0 - 0.333333 * 2.0,
            6 => 3.0,
            7..=12 => 3.0 - (lf_f - 6.0) / 6.0,
            13..=25 => 2.0 - (lf_f - 12.0) / 13.0,
            _ => 1.0 - (lf_f - 25.0) / 25.0,
        };
    }
    table
});

impl Tables {
    /// Fills every table that does not depend on the sample rate.
    pub(crate) fn init_mt32_constant_tables(&mut self) {
        log::debug!("Initialising constant tables");

        for (i, value) in self.tvf_keyfollow_mult.iter_mut().enumerate() {
            let lf = i as i32 - 108;
            *value = (256.0 * 2.0f32.powf(lf as f32 / 24.0)) as i32;
        }

        for (res, factor) in self.resonance_factor.iter_mut().enumerate() {
            *factor = (res as f32 / 30.0).powf(5.0) + 1.0;
        }

        self.init_sintable();
        self.init_velfollow_tables();

        for (lf, value) in self.volume_mult.iter_mut().enumerate() {
            // 0..=100 level to volume multiplier
            *value = fixedpoint_make((lf as f32 / 100.0).powf(FLOAT_LN), 7) as i32;
        }

        for (lf, value) in self.pw_factor.iter_mut().enumerate() {
            let pt = (lf as f32 / 100.0 - 0.5).max(0.0);
            // Approximation from sample comparison
            *value = (pt * 179.0) as i32 + 128;
        }

        self.init_noise();
        self.init_pitch_tables();
        self.init_bias_tables();
    }

    fn init_sintable(&mut self) {
        let period = SINTABLE_SIZE as f64;
        for (ang, value) in self.sintable.iter_mut().enumerate() {
            let phase = 2.0 * DOUBLE_PI * ang as f64 / period;
            *value = (phase.sin() * 50.0) as i16 + 50;
        }
    }

    fn init_velfollow_tables(&mut self) {
        for velt in 0..VELOCITY_RANGE {
            let fvelt = velt as f32;
            for dep in 0..ENVELOPE_STAGES {
                self.env_time_velfollow_mult[dep][velt] = if dep > 0 {
                    let ff = ((3.5 * TKCATCONST[dep] * (59.0 - fvelt as f64)).exp()
                        * TKCATMULT[dep]) as f32;
                    (256.0 * ff) as i32
                } else {
                    256
                };
            }

            for dep in -7i32..8 {
                let mut fldep = (dep.abs() as f32 / 7.0).powf(2.5);
                if dep < 0 {
                    fldep = -fldep;
                }
                self.pw_velfollow_add[(dep + 7) as usize][velt] =
                    ((fldep * fvelt * 100.0) as f64 / 128.0) as i32;
            }
        }

        for dep in 0..PARAM_RANGE {
            for velt in 0..VELOCITY_RANGE {
                let fdep = dep as f32 * 0.000347013;
                let fv = (velt as f32 - 64.0) / 7.26;
                let flogdep = 10.0f32.powf(fdep * fv);
                self.tvf_velfollow_mult[velt][dep] = if velt > 64 {
                    (flogdep as f64 * 256.0) as i32
                } else {
                    let fbase =
                        1.0 - (dep as f32 / 100.0).powf(0.25) * ((64 - velt) as f32 / 96.0);
                    (fbase as f64 * 256.0) as i32
                };
            }
        }

        for lf in 0..VELOCITY_RANGE {
            let velo_fract = lf as f32 / 127.0;
            for velsens in 0..PARAM_RANGE {
                let sens_fract = (velsens as f32 - 50.0) / 50.0;
                let exponent = if velsens < 50 {
                    velo_fract * -sens_fract * 127.0 / 20.0
                } else {
                    (1.0 - velo_fract) * sens_fract * 127.0 / 20.0
                };
                self.tva_velfollow_mult[lf][velsens] =
                    fixedpoint_make(1.0 / 2.0f32.powf(exponent), 8) as i32;
            }
        }
    }

    /// Fixed-seed noise; identical on every platform and run.
    fn init_noise(&mut self) {
        let mut rng = ChaCha12Rng::from_seed(noise_key());
        for value in self.noise_buf.iter_mut() {
            let my_rand = (rng.next_u32() & NOISE_RAND_MAX as u32) as i32;
            *value = ((my_rand - NOISE_RAND_MAX / 2) as f32 / NOISE_RAND_MAX as f32
                * (WGAMP / 2.0)) as i16;
        }
    }

    fn init_pitch_tables(&mut self) {
        let padj = &*PITCH_ADJUST;
        for lf in 0..PITCH_ENV_DEPTHS {
            for depat in 0..PARAM_RANGE {
                self.pitch_env_val[lf][depat] = if lf > 0 {
                    let depti = (depat as i32 - 50).unsigned_abs() as usize;
                    let tlf = (lf as f32 - padj[depti]).max(0.0);
                    let lfp = ((0.713619942f32 * tlf) as f64).exp() as f32 / 407.4945111;
                    let finalval = if depat < 50 {
                        4096.0 * 2.0f32.powf(-lfp)
                    } else {
                        4096.0 * 2.0f32.powf(lfp)
                    };
                    finalval as i32
                } else {
                    4096
                };
            }
        }

        for lf in 0..PARAM_RANGE {
            // Linear, verified on the hardware
            let lfp = (lf as f32 * 0.1904) / 310.55;
            for depat in 0..PARAM_RANGE {
                let depf = (depat as f32 - 50.0) / 50.0;
                let finalval = 4096.0 + 4096.0 * lfp * depf;
                self.lfo_shift[lf][depat] = finalval as i32;
            }
        }
    }

    fn init_bias_tables(&mut self) {
        for lf in 0..TVA_BIAS_LEVELS {
            for distval in 0..VELOCITY_RANGE {
                self.tva_bias_mult[lf][distval] = if lf == 0 {
                    256
                } else {
                    let amplog = (1.431817011f32.powf(lf as f32) / FLOAT_PI).exp();
                    let dval = (128.0 - distval as f32) / 128.0;
                    let dval = amplog.powf(dval) / amplog;
                    (dval as f64 * 256.0) as i32
                };
            }
        }

        for lf in 0..TVF_BIAS_LEVELS {
            let slot = TVF_BIAS_LEVELS - 1 - lf;
            for distval in 0..VELOCITY_RANGE {
                if lf == 7 {
                    self.tvf_bias_mult[slot][distval] = 256;
                    continue;
                }
                let filval = (((lf as i32 - 7) * 12) as f32 / 7.0).abs();
                let amplog = (1.531817011f32.powf(filval) / FLOAT_PI).exp();
                let dval = (128.0 - distval as f32) / 128.0;
                let mut dval = amplog.powf(dval) / amplog;
                if lf >= 8 {
                    dval = dval.powf(0.3333333).max(0.01);
                    dval = 1.0 / dval;
                }
                self.tvf_bias_mult[slot][distval] = (dval * 256.0) as i32;
            }
        }
    }

    /// Envelope and LFO timing at `sample_rate`, indexed by the 0..=100
    /// time parameter.
    pub(crate) fn init_envelopes(&mut self, sample_rate: f32) {
        for lf in 0..PARAM_RANGE {
            let elf = lf as f32;

            // Fits the CM-32L to about 0.03s on the second filter time when
            // all other times are 0 and all levels 100.
            let seconds = 2.0f32.powf(elf / 8.0 + 7.0) / 32768.0;
            self.env_time[lf] = (seconds * sample_rate) as i32;

            // Cap on envelope times depending on the level delta
            self.env_delta_max_param[lf] = if lf == 0 {
                63
            } else {
                (11.0 * elf.ln() + 64.0).min(100.0) as i32
            };

            // Duration when the target level is 0
            let seconds = 2.0f32.powf(elf / 8.0 + 6.0) / 32768.0;
            self.env_decay_time[lf] = (seconds * sample_rate) as i32;

            self.lfo_period[lf] = (sample_rate / (1.088883372f32.powf(elf) * 0.021236044)) as u32;
        }

        for lf in 0..PARAM_RANGE {
            let cap = self.env_delta_max_param[lf] as usize;
            self.env_delta_max_time[lf] = self.env_time[cap];
        }
    }

    /// Resonant low-pass coefficients for every cutoff step and resonance.
    /// Steps above what `sample_rate` can represent share the highest
    /// designable cutoff.
    pub(crate) fn init_filt_coeff(&mut self, sample_rate: f32) {
        debug_assert_eq!(self.filt_coeff.len(), FILTERGRAN);
        debug_assert_eq!(self.filt_gain.len(), FILTERGRAN);

        let max_cutoff = sample_rate * MAX_CUTOFF_FRACTION;
        for j in 0..FILTERGRAN {
            let fc = (((j as f32 + 1.0) / FILTERGRAN as f32) * (HARDWARE_SAMPLE_RATE / 2.0)).min(max_cutoff);
            for res in 0..RESONANCE_STEPS {
                let designed = design_resonant_lowpass(sample_rate, fc, self.resonance_factor[res]);
                assert!(
                    designed.is_stable(),
                    "filter coefficients unstable at cutoff step {} resonance {}",
                    j,
                    res
                );
                self.filt_coeff[j][res] = designed.coeffs;
                self.filt_gain[j][res] = designed.gain;
            }
        }
    }
}

use crate::constants::{DOUBLE_PI, FILTER_ORDER};

/// Damping terms of the two analog sections of the 4-pole low-pass
/// (2·sin(π/8) and 2·sin(3π/8)), divided by the resonance factor.
const SECTION_DAMPING: [f64; 2] = [0.765367, 1.847759];

/// Overall gain the filter is designed for.
const DESIGN_GAIN: f64 = 1.5;

/// Slack allowed on the stability test for coefficients rounded to f32.
const STABILITY_EPSILON: f32 = 1e-6;

/// One designed filter: overall gain plus two z-domain sections.
///
/// `coeffs[0..4]` is section 1 as `[beta1, beta2, alpha1, alpha2]`,
/// `coeffs[4..8]` section 2.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FilterCoeffs {
    pub gain: f32,
    pub coeffs: [f32; FILTER_ORDER],
}

impl FilterCoeffs {
    /// Both sections have their poles inside or on the unit circle.
    pub fn is_stable(&self) -> bool {
        self.coeffs
            .chunks_exact(4)
            .all(|section| section_is_stable(section[0], section[1]))
    }
}

/// Jury test for `z^2 + beta1 z + beta2`.
#[inline]
pub fn section_is_stable(beta1: f32, beta2: f32) -> bool {
    beta2.abs() <= 1.0 + STABILITY_EPSILON && beta1.abs() <= 1.0 + beta2 + STABILITY_EPSILON
}

/// Pre-warp the s-domain coefficients of a numerator or denominator
/// (a0 is 1 and left alone).
fn prewarp(a1: &mut f64, a2: &mut f64, fc: f64, fs: f64) {
    let wp = 2.0 * fs * (DOUBLE_PI * fc / fs).tan();
    *a2 /= wp * wp;
    *a1 /= wp;
}

/// Bilinear transform of one s-domain biquad section.
///
/// Writes `[beta1, beta2, alpha1, alpha2]` and folds the section gain
/// into `k`.
fn bilinear(
    a: [f64; 3],
    b: [f64; 3],
    k: &mut f64,
    fs: f64,
    coef: &mut [f32],
) {
    let [a0, a1, a2] = a;
    let [b0, b1, b2] = b;
    let fs2 = fs * fs;

    // alpha (numerator in s-domain)
    let ad = 4.0 * a2 * fs2 + 2.0 * a1 * fs + a0;
    // beta (denominator in s-domain)
    let bd = 4.0 * b2 * fs2 + 2.0 * b1 * fs + b0;

    *k *= ad / bd;

    coef[0] = ((2.0 * b0 - 8.0 * b2 * fs2) / bd) as f32;
    coef[1] = ((4.0 * b2 * fs2 - 2.0 * b1 * fs + b0) / bd) as f32;
    coef[2] = ((2.0 * a0 - 8.0 * a2 * fs2) / ad) as f32;
    coef[3] = ((4.0 * a2 * fs2 - 2.0 * a1 * fs + a0) / ad) as f32;
}

fn szxform(mut a: [f64; 3], mut b: [f64; 3], fc: f64, fs: f64, k: &mut f64, coef: &mut [f32]) {
    {
        let [_, a1, a2] = &mut a;
        prewarp(a1, a2, fc, fs);
    }
    {
        let [_, b1, b2] = &mut b;
        prewarp(b1, b2, fc, fs);
    }
    bilinear(a, b, k, fs, coef);
}

/// Designs the resonant 4-pole low-pass at cutoff `fc` for rate `fs`.
///
/// `q` is the resonance factor (1.0 = flat Butterworth response).
pub fn design_resonant_lowpass(fs: f32, fc: f32, q: f32) -> FilterCoeffs {
    let mut out = FilterCoeffs::default();
    let mut k = DESIGN_GAIN;
    let fs = fs as f64;
    let fc = fc as f64;
    let q = q as f64;

    for (section, damping) in SECTION_DAMPING.iter().enumerate() {
        let numerator = [1.0, 0.0, 0.0];
        let denominator = [1.0, damping / q, 1.0];
        let coef = &mut out.coeffs[section * 4..section * 4 + 4];
        szxform(numerator, denominator, fc, fs, &mut k, coef);
    }

    out.gain = k as f32;
    out
}

//! Band-limited waveform synthesis used when no wave source is supplied.

use crate::constants::DOUBLE_PI;

/// Waveform slots of a note, in storage order.
pub const WAVEFORM_NAMES: [&str; 3] = ["saw", "cos", "cosoff"];

/// Buffer lengths for a note with divider `div2`.
#[inline]
pub fn waveform_sizes(div2: i32) -> [u32; 3] {
    let div2 = div2.max(1) as u32;
    [div2 << 1, div2 << 1, div2 << 2]
}

/// Raw (unscaled) samples of the three waveforms for divider `div2`.
///
/// Slot 0 is two periods of a band-limited sawtooth with `div2 / 2`
/// partials, slot 1 one cosine period over the same length, slot 2 one
/// cosine period over twice the length, offset by an eighth of a turn.
pub fn synthesize_raw(div2: f32) -> [Vec<f64>; 3] {
    let sizes = waveform_sizes(div2 as i32);
    let sd = DOUBLE_PI / div2 as f64;
    let partials = (div2 as i32 >> 1).max(0) as usize;

    let mut saw = Vec::with_capacity(sizes[0] as usize);
    let mut cos = Vec::with_capacity(sizes[1] as usize);
    for fa in 0..sizes[0] as usize {
        // Two periods of the note
        let sa = fa as f64 * sd;
        saw.push(band_limited_saw(sa, partials) * -0.5);
        cos.push((sa / 2.0).cos());
    }

    let mut cosoff = Vec::with_capacity(sizes[2] as usize);
    for fa in 0..sizes[2] as usize {
        // Half the step, over twice the length
        let sa = fa as f64 * sd / 2.0;
        cosoff.push((sa / 2.0 - DOUBLE_PI / 4.0).cos());
    }

    [saw, cos, cosoff]
}

/// `sum(sin(k·x) / k)` for `k = 1..=partials`.
///
/// Uses the Chebyshev recurrence `sin((k+1)x) = 2cos(x)sin(kx) - sin((k-1)x)`
/// instead of one `sin` call per partial.
fn band_limited_saw(x: f64, partials: usize) -> f64 {
    let c2 = 2.0 * x.cos();
    let mut prev = 0.0;
    let mut cur = x.sin();
    let mut sum = 0.0;
    for k in 1..=partials {
        sum += cur / k as f64;
        let next = c2 * cur - prev;
        prev = cur;
        cur = next;
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saw_recurrence_matches_direct_sum() {
        for &x in &[0.1, 1.0, 2.5, 3.0, 5.9] {
            let direct: f64 = (1..=64).map(|k| (k as f64 * x).sin() / k as f64).sum();
            let fast = band_limited_saw(x, 64);
            assert!((direct - fast).abs() < 1e-9, "x={} {} vs {}", x, direct, fast);
        }
    }

    #[test]
    fn test_sizes_follow_divider() {
        let raw = synthesize_raw(100.7);
        assert_eq!(raw[0].len(), 200);
        assert_eq!(raw[1].len(), 200);
        assert_eq!(raw[2].len(), 400);
        assert_eq!(waveform_sizes(0), [2, 2, 4]);
    }

    #[test]
    fn test_raw_waveforms_stay_in_unit_range() {
        let raw = synthesize_raw(257.3);
        for wave in raw.iter() {
            for &s in wave {
                assert!(s.abs() <= 1.0, "sample {} out of range", s);
            }
        }
        // Cosine starts at its peak
        assert!((raw[1][0] - 1.0).abs() < 1e-12);
        assert_eq!(raw[0][0], 0.0);
    }
}

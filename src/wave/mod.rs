//! Waveform loader: fills a note's waveform buffers from the wave source or
//! from synthesis, clamping every sample to the waveform amplitude.

pub mod source;
pub mod synth;

use std::io::Read;

use rustc_hash::FxHashMap;

use crate::constants::{WAVEFORM_COUNT, WGAMP};
use crate::error::{TablesError, TablesResult};

pub use source::{read_header, write_wave_source, RecordHeader};
pub use synth::{synthesize_raw, waveform_sizes, WAVEFORM_NAMES};

/// Scales `input` by `amp` and clamps it into `[-amp - 1, amp]`.
///
/// Returns the sample and whether clamping was needed. Values slightly
/// over the amplitude are expected from the reference data, so clamping is
/// only reported, never an error.
pub fn clamp_sample(name: &str, amp: f32, input: f64) -> (i16, bool) {
    let x = (input * amp as f64) as i32;
    let low = -amp - 1.0;
    if (x as f32) < low {
        log::warn!("{}=={}<-WGAMP-1!", name, x);
        (low as i16, true)
    } else if x as f32 > amp {
        log::warn!("{}=={}>WGAMP!", name, x);
        (amp as i16, true)
    } else {
        (x as i16, false)
    }
}

/// Statistics gathered while loading waveforms.
#[derive(Debug, Default, Clone)]
pub struct LoadReport {
    /// Waveform buffers filled (three per note).
    pub loads: usize,
    /// Buffers that had to be allocated.
    pub allocations: usize,
    clamped: FxHashMap<&'static str, usize>,
}

impl LoadReport {
    pub fn clamped(&self, name: &str) -> usize {
        self.clamped.get(name).copied().unwrap_or(0)
    }

    pub fn total_clamped(&self) -> usize {
        self.clamped.values().sum()
    }

    fn record_clamp(&mut self, name: &'static str) {
        *self.clamped.entry(name).or_insert(0) += 1;
    }
}

/// The three waveform buffers owned by one note.
#[derive(Debug, Default)]
pub struct WaveformSet {
    buffers: [Option<Box<[i16]>>; WAVEFORM_COUNT],
    sizes: [u32; WAVEFORM_COUNT],
}

impl WaveformSet {
    pub fn get(&self, index: usize) -> Option<&[i16]> {
        self.buffers[index].as_deref()
    }

    pub fn size(&self, index: usize) -> u32 {
        self.sizes[index]
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.iter().all(Option::is_none)
    }

    /// Sizes the buffers for `div2`, allocating any that are missing or
    /// have the wrong length.
    fn prepare(&mut self, div2: i32, report: &mut LoadReport) {
        self.sizes = waveform_sizes(div2);
        for (buffer, &size) in self.buffers.iter_mut().zip(self.sizes.iter()) {
            let fits = buffer.as_ref().is_some_and(|b| b.len() == size as usize);
            if !fits {
                *buffer = Some(vec![0i16; size as usize].into_boxed_slice());
                report.allocations += 1;
            }
        }
    }

    fn fill<I>(&mut self, index: usize, name: &'static str, amp: f32, raw: I, report: &mut LoadReport)
    where
        I: IntoIterator<Item = f64>,
    {
        if let Some(buffer) = self.buffers[index].as_deref_mut() {
            for (dst, value) in buffer.iter_mut().zip(raw) {
                let (sample, clamped) = clamp_sample(name, amp, value);
                if clamped {
                    report.record_clamp(name);
                }
                *dst = sample;
            }
            report.loads += 1;
        }
    }

    /// Drops every buffer. Safe to call repeatedly.
    pub fn release(&mut self) {
        self.buffers = Default::default();
        self.sizes = [0; WAVEFORM_COUNT];
    }
}

/// Loads the waveforms of `note` with divider `div2`.
///
/// With a source the next record is consumed: its divider must match, its
/// amplitude scales the raw samples. Without one the waveforms are
/// synthesized at `WGAMP`.
pub fn load_waveform(
    waveforms: &mut WaveformSet,
    note: u8,
    div2: f32,
    source: Option<&mut dyn Read>,
    report: &mut LoadReport,
) -> TablesResult<()> {
    let idiv2 = div2 as i32;
    waveforms.prepare(idiv2, report);

    match source {
        Some(source) => {
            let record = source::read_record_header(source, note)?;
            if record.divider as i32 != idiv2 {
                return Err(TablesError::DividerMismatch {
                    note,
                    expected: idiv2,
                    found: record.divider as i32,
                });
            }
            for index in 0..WAVEFORM_COUNT {
                let len = waveforms.size(index) as usize;
                let run = source::read_run(source, note, len)?;
                waveforms.fill(
                    index,
                    WAVEFORM_NAMES[index],
                    record.amplitude,
                    run.into_iter().map(f64::from),
                    report,
                );
            }
        }
        None => {
            let raw = synthesize_raw(div2);
            for (index, run) in raw.into_iter().enumerate() {
                waveforms.fill(index, WAVEFORM_NAMES[index], WGAMP, run, report);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_clamp_sample_bounds() {
        assert_eq!(clamp_sample("t", WGAMP, 0.5), (6191, false));
        assert_eq!(clamp_sample("t", WGAMP, 1.0), (12382, false));
        assert_eq!(clamp_sample("t", WGAMP, 1.5), (12382, true));
        assert_eq!(clamp_sample("t", WGAMP, -1.0), (-12382, false));
        assert_eq!(clamp_sample("t", WGAMP, -3.0), (-12383, true));
        // Far outside the i32 range still clamps instead of wrapping
        assert_eq!(clamp_sample("t", WGAMP, 1.0e12), (12382, true));
        assert_eq!(clamp_sample("t", WGAMP, -1.0e12), (-12383, true));
    }

    #[test]
    fn test_synthesized_load_allocates_once() {
        let mut set = WaveformSet::default();
        let mut report = LoadReport::default();
        load_waveform(&mut set, 60, 244.6, None, &mut report).unwrap();
        assert_eq!(report.allocations, 3);
        assert_eq!(report.loads, 3);
        assert_eq!(set.size(0), 488);
        assert_eq!(set.size(2), 976);
        assert_eq!(set.get(1).map(|b| b.len()), Some(488));

        load_waveform(&mut set, 60, 244.6, None, &mut report).unwrap();
        assert_eq!(report.allocations, 3);
        assert_eq!(report.loads, 6);

        set.release();
        assert!(set.is_empty());
        assert_eq!(set.size(0), 0);
        set.release();
        assert!(set.is_empty());
    }

    #[test]
    fn test_source_load_clamps_overdriven_samples() {
        let runs = [vec![2.0, -2.0], vec![0.5, 0.25], vec![0.0, 1.0, -1.0, 3.0]];
        let mut bytes = Vec::new();
        source::write_record(&mut bytes, WGAMP, 1.2, &runs).unwrap();

        let mut set = WaveformSet::default();
        let mut report = LoadReport::default();
        let mut cursor = Cursor::new(bytes);
        load_waveform(&mut set, 127, 1.2, Some(&mut cursor), &mut report).unwrap();

        assert_eq!(set.get(0).unwrap(), &[12382, -12383]);
        assert_eq!(set.get(1).unwrap(), &[6191, 3095]);
        assert_eq!(set.get(2).unwrap(), &[0, 12382, -12382, 12382]);
        assert_eq!(report.clamped("saw"), 2);
        assert_eq!(report.clamped("cosoff"), 1);
        assert_eq!(report.total_clamped(), 3);
    }

    #[test]
    fn test_source_divider_mismatch() {
        let runs = [vec![0.0; 4], vec![0.0; 4], vec![0.0; 8]];
        let mut bytes = Vec::new();
        source::write_record(&mut bytes, WGAMP, 2.0, &runs).unwrap();

        let mut set = WaveformSet::default();
        let mut report = LoadReport::default();
        let result = load_waveform(&mut set, 90, 3.5, Some(&mut Cursor::new(bytes)), &mut report);
        assert!(matches!(
            result,
            Err(TablesError::DividerMismatch {
                note: 90,
                expected: 3,
                found: 2
            })
        ));
    }
}

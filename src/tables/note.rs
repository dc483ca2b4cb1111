//! Per-note lookups: divider, sawtooth offsets, PCM pitch steps, filter
//! cutoff index tables and the note's own waveform buffers.

use std::io::Read;

use crate::config::PcmWaveEntry;
use crate::constants::*;
use crate::error::TablesResult;
use crate::wave::{load_waveform, LoadReport, WaveformSet};

/// Lookup data for one MIDI note.
#[derive(Debug)]
pub struct NoteLookup {
    pub(crate) div2: i32,
    pub(crate) wav_table: Vec<u32>,
    pub(crate) saw_table: [i32; SAW_TABLE_SIZE],
    pub(crate) filt_table: [[i32; FILT_TABLE_SIZE]; 2],
    pub(crate) nfilt_table: Vec<[i32; NFILT_TABLE_SIZE]>,
    pub(crate) waveforms: WaveformSet,
}

impl Default for NoteLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteLookup {
    pub fn new() -> Self {
        Self {
            div2: 0,
            wav_table: Vec::new(),
            saw_table: [0; SAW_TABLE_SIZE],
            filt_table: [[0; FILT_TABLE_SIZE]; 2],
            nfilt_table: vec![[0; NFILT_TABLE_SIZE]; NFILT_TABLE_SIZE],
            waveforms: WaveformSet::default(),
        }
    }

    /// Samples in two periods of the note at the build rate. Never 0 once
    /// built.
    pub fn div2(&self) -> i32 {
        self.div2
    }

    /// 16.16 step per output sample for each PCM wave played at this note,
    /// indexed like the descriptor list passed to `init`.
    pub fn wav_table(&self) -> &[u32] {
        &self.wav_table
    }

    /// Sawtooth offset for pulse width 0..=100.
    pub fn saw_table(&self) -> &[i32; SAW_TABLE_SIZE] {
        &self.saw_table
    }

    /// `filt_table[kind][0..=200]`: cutoff index into the coefficient table.
    pub fn filt_table(&self) -> &[[i32; FILT_TABLE_SIZE]; 2] {
        &self.filt_table
    }

    /// `nfilt_table[cutoff][envelope]`, both 0..=100.
    pub fn nfilt_table(&self) -> &[[i32; NFILT_TABLE_SIZE]] {
        &self.nfilt_table
    }

    /// Waveform buffer 0 (saw), 1 (cos) or 2 (offset cos); `None` after
    /// `free_notes`.
    pub fn waveform(&self, index: usize) -> Option<&[i16]> {
        self.waveforms.get(index)
    }

    pub fn waveform_size(&self, index: usize) -> u32 {
        self.waveforms.size(index)
    }

    pub(crate) fn free_waveforms(&mut self) {
        self.waveforms.release();
    }
}

/// Frequency and (fractional) divider of `note`.
///
/// `master_tune` shifts every note by the same number of semitones.
pub fn note_divider(note: u8, sample_rate: f32, master_tune: f32) -> (f32, f32) {
    let semitones = note as f64 - MIDDLEA as f64 + master_tune as f64;
    let freq = (REFERENCE_PITCH_HZ * 2.0f64.powf(semitones / 12.0)) as f32;
    let div2 = sample_rate * 2.0 / freq;
    (freq, div2)
}

fn init_saw(note_lookup: &mut NoteLookup, div2: i32) {
    let tmpdiv = (div2 as i64) << 16;
    for (rsaw, value) in note_lookup.saw_table.iter_mut().enumerate() {
        let fsaw = (rsaw as f32).max(50.0);
        let sawfact = (66.0 - ((fsaw - 50.0) / 50.0).powf(0.63) * 50.0) / 132.0;
        *value = ((sawfact * tmpdiv as f32) as i64 >> 16) as i32;
    }
}

#[inline]
fn cutoff_index(freq: f32, mult: f32) -> i32 {
    (((freq * mult) / (HARDWARE_SAMPLE_RATE / 2.0) * FILTERGRAN as f32) as i32).min(FILTER_INDEX_MAX)
}

fn init_filt_table(note_lookup: &mut NoteLookup, freq: f32) {
    for tr in 0..FILT_TABLE_SIZE {
        let ftr = tr as f32;

        let brsq = 10.0f32.powf(ftr / 50.0 - 1.0);
        note_lookup.filt_table[0][tr] = cutoff_index(freq, brsq);

        let brsa = 10.0f32.powf(ftr / 55.0 - 1.0) / 2.0;
        note_lookup.filt_table[1][tr] = cutoff_index(freq, brsa);
    }
}

fn init_nfilt_table(note_lookup: &mut NoteLookup, freq: f32) {
    debug_assert_eq!(note_lookup.nfilt_table.len(), NFILT_TABLE_SIZE);
    for (cf, row) in note_lookup.nfilt_table.iter_mut().enumerate() {
        for (tf, value) in row.iter_mut().enumerate() {
            let freqsum = 2.0f32.powf(((cf + tf) as f32 - 40.0) / 16.0);
            *value = cutoff_index(freq, freqsum);
        }
    }
}

fn init_wav_table(note_lookup: &mut NoteLookup, freq: f32, sample_rate: f32, pcm_waves: &[PcmWaveEntry]) {
    // PCM tunes are relative to the 32 kHz hardware clock
    let rate_mult = (HARDWARE_SAMPLE_RATE / sample_rate) as f64;
    let tuner = (freq * 65536.0) as f64;
    note_lookup.wav_table.clear();
    note_lookup
        .wav_table
        .extend(pcm_waves.iter().map(|wave| (tuner / wave.tune * rate_mult) as u32));
}

/// Builds the lookup for `note`.
///
/// With a source the note's record is consumed from it; the stream is left
/// at the start of the next record.
pub fn init_note(
    note_lookup: &mut NoteLookup,
    note: u8,
    sample_rate: f32,
    master_tune: f32,
    pcm_waves: &[PcmWaveEntry],
    source: Option<&mut dyn Read>,
    report: &mut LoadReport,
) -> TablesResult<()> {
    let (freq, div2) = note_divider(note, sample_rate, master_tune);
    note_lookup.div2 = (div2 as i32).max(1);

    init_saw(note_lookup, note_lookup.div2);
    load_waveform(&mut note_lookup.waveforms, note, div2, source, report)?;
    init_wav_table(note_lookup, freq, sample_rate, pcm_waves);
    init_filt_table(note_lookup, freq);
    init_nfilt_table(note_lookup, freq);
    Ok(())
}

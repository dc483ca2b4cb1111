//! The table set a voice mixer reads every tick.
//!
//! `Tables` owns every constant table, one `NoteLookup` per MIDI note
//! 12..=127 and one `KeyLookup` per key 12..=108. It starts uninitialized;
//! `init` builds everything for a sample rate and master tune, `free_notes`
//! releases the per-note waveform buffers again.

pub mod constant;
pub mod key;
pub mod note;

#[cfg(test)]
mod tests;

use std::io::Read;

use crate::config::{validate_pcm_waves, PcmWaveEntry, TablesConfig};
use crate::constants::*;
use crate::error::{TablesError, TablesResult};
use crate::filter::FilterCoeffs;
use crate::wave::{read_header, LoadReport};

pub use key::{init_key, KeyLookup};
pub use note::{init_note, note_divider, NoteLookup};

#[derive(Debug)]
pub struct Tables {
    pub(crate) tvf_keyfollow_mult: [i32; KEYFOLLOW_RANGE],
    pub(crate) tvf_velfollow_mult: Vec<[i32; PARAM_RANGE]>,
    pub(crate) tvf_bias_mult: [[i32; VELOCITY_RANGE]; TVF_BIAS_LEVELS],
    pub(crate) tva_velfollow_mult: Vec<[i32; PARAM_RANGE]>,
    pub(crate) tva_bias_mult: [[i32; VELOCITY_RANGE]; TVA_BIAS_LEVELS],
    pub(crate) noise_buf: Vec<i16>,
    pub(crate) sintable: Vec<i16>,
    pub(crate) pitch_env_val: [[i32; PARAM_RANGE]; PITCH_ENV_ROWS],
    pub(crate) env_time_velfollow_mult: [[i32; VELOCITY_RANGE]; ENVELOPE_STAGES],
    pub(crate) pw_velfollow_add: [[i32; VELOCITY_RANGE]; PW_VELFOLLOW_LEVELS],
    pub(crate) resonance_factor: [f32; RESONANCE_STEPS],
    pub(crate) lfo_shift: Vec<[i32; PARAM_RANGE]>,
    pub(crate) pw_factor: [i32; PARAM_RANGE],
    pub(crate) volume_mult: [i32; PARAM_RANGE],

    pub(crate) env_time: [i32; PARAM_RANGE],
    pub(crate) env_delta_max_param: [i32; PARAM_RANGE],
    pub(crate) env_delta_max_time: [i32; PARAM_RANGE],
    pub(crate) env_decay_time: [i32; PARAM_RANGE],
    pub(crate) lfo_period: [u32; PARAM_RANGE],
    pub(crate) filt_coeff: Vec<[[f32; FILTER_ORDER]; RESONANCE_STEPS]>,
    pub(crate) filt_gain: Vec<[f32; RESONANCE_STEPS]>,

    notes: Vec<NoteLookup>,
    keys: Vec<KeyLookup>,

    initialized: Option<TablesConfig>,
    load_report: LoadReport,
    builds: usize,
}

impl Default for Tables {
    fn default() -> Self {
        Self::new()
    }
}

impl Tables {
    /// Allocates zeroed, uninitialized tables.
    pub fn new() -> Self {
        Self {
            tvf_keyfollow_mult: [0; KEYFOLLOW_RANGE],
            tvf_velfollow_mult: vec![[0; PARAM_RANGE]; VELOCITY_RANGE],
            tvf_bias_mult: [[0; VELOCITY_RANGE]; TVF_BIAS_LEVELS],
            tva_velfollow_mult: vec![[0; PARAM_RANGE]; VELOCITY_RANGE],
            tva_bias_mult: [[0; VELOCITY_RANGE]; TVA_BIAS_LEVELS],
            noise_buf: vec![0; MAX_SAMPLE_OUTPUT],
            sintable: vec![0; SINTABLE_SIZE],
            pitch_env_val: [[0; PARAM_RANGE]; PITCH_ENV_ROWS],
            env_time_velfollow_mult: [[0; VELOCITY_RANGE]; ENVELOPE_STAGES],
            pw_velfollow_add: [[0; VELOCITY_RANGE]; PW_VELFOLLOW_LEVELS],
            resonance_factor: [0.0; RESONANCE_STEPS],
            lfo_shift: vec![[0; PARAM_RANGE]; PARAM_RANGE],
            pw_factor: [0; PARAM_RANGE],
            volume_mult: [0; PARAM_RANGE],
            env_time: [0; PARAM_RANGE],
            env_delta_max_param: [0; PARAM_RANGE],
            env_delta_max_time: [0; PARAM_RANGE],
            env_decay_time: [0; PARAM_RANGE],
            lfo_period: [0; PARAM_RANGE],
            filt_coeff: vec![[[0.0; FILTER_ORDER]; RESONANCE_STEPS]; FILTERGRAN],
            filt_gain: vec![[0.0; RESONANCE_STEPS]; FILTERGRAN],
            notes: (0..NUM_NOTES).map(|_| NoteLookup::new()).collect(),
            keys: vec![KeyLookup::default(); NUM_KEYS],
            initialized: None,
            load_report: LoadReport::default(),
            builds: 0,
        }
    }

    /// Builds every table for `config`.
    ///
    /// Returns immediately when the tables were already built for the same
    /// sample rate and master tune. On error the tables are left
    /// uninitialized with no waveform buffers.
    pub fn init(
        &mut self,
        config: &TablesConfig,
        pcm_waves: &[PcmWaveEntry],
        source: Option<&mut dyn Read>,
    ) -> TablesResult<()> {
        self.init_with_progress(config, pcm_waves, source, |_| true)
    }

    /// Like [`Tables::init`], calling `progress` with the fraction of notes
    /// built after each note. Returning `false` aborts the build.
    pub fn init_with_progress<F>(
        &mut self,
        config: &TablesConfig,
        pcm_waves: &[PcmWaveEntry],
        source: Option<&mut dyn Read>,
        mut progress: F,
    ) -> TablesResult<()>
    where
        F: FnMut(f32) -> bool,
    {
        if self.initialized.as_ref() == Some(config) {
            log::info!(
                "Tables already built for {} Hz, tune {}",
                config.sample_rate,
                config.master_tune
            );
            return Ok(());
        }

        if let Err(err) = config.validate().and_then(|_| validate_pcm_waves(pcm_waves)) {
            self.free_notes();
            return Err(err);
        }

        self.free_notes();
        self.load_report = LoadReport::default();

        let sample_rate = config.sample_rate;
        self.init_mt32_constant_tables();
        self.init_envelopes(sample_rate);
        self.init_filt_coeff(sample_rate);

        if let Err(err) = self.init_notes(config, pcm_waves, source, &mut progress) {
            log::error!("Table build failed: {}", err);
            self.free_notes();
            return Err(err);
        }
        self.init_keys();

        self.initialized = Some(*config);
        self.builds += 1;
        log::info!(
            "Built tables for {} Hz, tune {} ({} waveforms, {} samples clamped)",
            sample_rate,
            config.master_tune,
            self.load_report.loads,
            self.load_report.total_clamped()
        );
        Ok(())
    }

    fn init_notes<F>(
        &mut self,
        config: &TablesConfig,
        pcm_waves: &[PcmWaveEntry],
        mut source: Option<&mut dyn Read>,
        progress: &mut F,
    ) -> TablesResult<()>
    where
        F: FnMut(f32) -> bool,
    {
        if let Some(reader) = source.as_mut() {
            read_header(&mut **reader, config.sample_rate, config.master_tune)?;
        }

        for (i, note_lookup) in self.notes.iter_mut().enumerate() {
            let note = LOWEST_NOTE + i as u8;
            log::debug!(
                "Initialising note {}{}",
                NOTE_NAMES[note as usize % 12],
                note as i32 / 12 - 1
            );
            init_note(
                note_lookup,
                note,
                config.sample_rate,
                config.master_tune,
                pcm_waves,
                source.as_mut().map(|s| &mut **s as &mut dyn Read),
                &mut self.load_report,
            )?;

            if !progress((i + 1) as f32 / NUM_NOTES as f32) {
                return Err(TablesError::Aborted { note });
            }
        }
        Ok(())
    }

    fn init_keys(&mut self) {
        for (i, key_lookup) in self.keys.iter_mut().enumerate() {
            init_key(key_lookup, LOWEST_KEY + i as u8);
        }
    }

    /// Releases every note's waveform buffers and marks the tables
    /// uninitialized. Other tables keep their contents.
    pub fn free_notes(&mut self) {
        for note_lookup in self.notes.iter_mut() {
            note_lookup.free_waveforms();
        }
        self.initialized = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.is_some()
    }

    /// Parameters of the current build, if any.
    pub fn initialized_config(&self) -> Option<&TablesConfig> {
        self.initialized.as_ref()
    }

    /// Waveform statistics of the last build.
    pub fn load_report(&self) -> &LoadReport {
        &self.load_report
    }

    /// Number of completed full builds.
    pub fn build_count(&self) -> usize {
        self.builds
    }

    /// Lookup of MIDI note `midi`, `None` outside 12..=127.
    pub fn note(&self, midi: u8) -> Option<&NoteLookup> {
        midi.checked_sub(LOWEST_NOTE)
            .and_then(|i| self.notes.get(i as usize))
    }

    pub fn notes(&self) -> &[NoteLookup] {
        &self.notes
    }

    /// Lookup of `key`, `None` outside 12..=108.
    pub fn key(&self, key: u8) -> Option<&KeyLookup> {
        key.checked_sub(LOWEST_KEY)
            .and_then(|i| self.keys.get(i as usize))
    }

    pub fn keys(&self) -> &[KeyLookup] {
        &self.keys
    }

    /// Coefficients for cutoff step `cutoff` (0..512) and resonance
    /// 0..=30.
    pub fn filter_coeffs(&self, cutoff: usize, resonance: usize) -> FilterCoeffs {
        assert!(
            resonance < RESONANCE_STEPS,
            "resonance {} out of range",
            resonance
        );
        FilterCoeffs {
            gain: self.filt_gain[cutoff][resonance],
            coeffs: self.filt_coeff[cutoff][resonance],
        }
    }

    /// `filt_coeff[cutoff][resonance]`: two biquad sections, see
    /// [`FilterCoeffs`].
    pub fn filt_coeff(&self) -> &[[[f32; FILTER_ORDER]; RESONANCE_STEPS]] {
        &self.filt_coeff
    }

    pub fn filt_gain(&self) -> &[[f32; RESONANCE_STEPS]] {
        &self.filt_gain
    }

    pub fn resonance_factor(&self) -> &[f32; RESONANCE_STEPS] {
        &self.resonance_factor
    }

    /// Indexed by key offset + 108.
    pub fn tvf_keyfollow_mult(&self) -> &[i32; KEYFOLLOW_RANGE] {
        &self.tvf_keyfollow_mult
    }

    /// `[velocity][depth]`.
    pub fn tvf_velfollow_mult(&self) -> &[[i32; PARAM_RANGE]] {
        &self.tvf_velfollow_mult
    }

    /// `[bias level][distance]`, level 7 is neutral.
    pub fn tvf_bias_mult(&self) -> &[[i32; VELOCITY_RANGE]; TVF_BIAS_LEVELS] {
        &self.tvf_bias_mult
    }

    /// `[velocity][sensitivity]`.
    pub fn tva_velfollow_mult(&self) -> &[[i32; PARAM_RANGE]] {
        &self.tva_velfollow_mult
    }

    pub fn tva_bias_mult(&self) -> &[[i32; VELOCITY_RANGE]; TVA_BIAS_LEVELS] {
        &self.tva_bias_mult
    }

    pub fn noise_buf(&self) -> &[i16] {
        &self.noise_buf
    }

    /// One sine period scaled to 0..=100.
    pub fn sintable(&self) -> &[i16] {
        &self.sintable
    }

    /// `[depth][envelope level]`, 4096 = unity. Rows 11..16 are unused.
    pub fn pitch_env_val(&self) -> &[[i32; PARAM_RANGE]; PITCH_ENV_ROWS] {
        &self.pitch_env_val
    }

    /// `[stage][velocity]`.
    pub fn env_time_velfollow_mult(&self) -> &[[i32; VELOCITY_RANGE]; ENVELOPE_STAGES] {
        &self.env_time_velfollow_mult
    }

    /// `[depth + 7][velocity]`.
    pub fn pw_velfollow_add(&self) -> &[[i32; VELOCITY_RANGE]; PW_VELFOLLOW_LEVELS] {
        &self.pw_velfollow_add
    }

    /// `[lfo depth][modulation]`, 4096 = unity.
    pub fn lfo_shift(&self) -> &[[i32; PARAM_RANGE]] {
        &self.lfo_shift
    }

    pub fn pw_factor(&self) -> &[i32; PARAM_RANGE] {
        &self.pw_factor
    }

    pub fn volume_mult(&self) -> &[i32; PARAM_RANGE] {
        &self.volume_mult
    }

    /// Envelope stage length in samples.
    pub fn env_time(&self) -> &[i32; PARAM_RANGE] {
        &self.env_time
    }

    /// Time parameter cap for a level delta, 0..=100.
    pub fn env_delta_max_param(&self) -> &[i32; PARAM_RANGE] {
        &self.env_delta_max_param
    }

    /// `env_time` at the capped time parameter, in samples.
    pub fn env_delta_max_time(&self) -> &[i32; PARAM_RANGE] {
        &self.env_delta_max_time
    }

    pub fn env_decay_time(&self) -> &[i32; PARAM_RANGE] {
        &self.env_decay_time
    }

    /// LFO period in samples.
    pub fn lfo_period(&self) -> &[u32; PARAM_RANGE] {
        &self.lfo_period
    }
}

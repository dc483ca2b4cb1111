use serde::{Deserialize, Serialize};

use crate::error::{TablesError, TablesResult};

/// Parameters a table set is built for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TablesConfig {
    #[serde(rename = "sampleRate")]
    pub sample_rate: f32,
    /// Tuning offset in semitones relative to A = 440 Hz.
    #[serde(rename = "masterTune", default)]
    pub master_tune: f32,
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            sample_rate: 32000.0,
            master_tune: 0.0,
        }
    }
}

impl TablesConfig {
    pub fn new(sample_rate: f32, master_tune: f32) -> Self {
        Self {
            sample_rate,
            master_tune,
        }
    }

    pub fn from_json(json: &str) -> TablesResult<Self> {
        let config: TablesConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TablesResult<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(TablesError::InvalidSampleRate(self.sample_rate));
        }
        if !self.master_tune.is_finite() {
            return Err(TablesError::InvalidMasterTune(self.master_tune));
        }
        Ok(())
    }
}

/// Descriptor of one PCM sample in the sound ROM.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PcmWaveEntry {
    pub addr: u32,
    pub len: u32,
    /// Frequency the sample plays at when stepped at one sample per tick
    /// of the 32 kHz hardware clock.
    pub tune: f64,
    #[serde(rename = "loop", default)]
    pub looped: bool,
}

impl PcmWaveEntry {
    pub fn new(addr: u32, len: u32, tune: f64, looped: bool) -> Self {
        Self {
            addr,
            len,
            tune,
            looped,
        }
    }
}

/// Parse a JSON array of PCM wave descriptors.
pub fn load_pcm_waves(json: &str) -> TablesResult<Vec<PcmWaveEntry>> {
    let waves: Vec<PcmWaveEntry> = serde_json::from_str(json)?;
    validate_pcm_waves(&waves)?;
    Ok(waves)
}

pub fn validate_pcm_waves(waves: &[PcmWaveEntry]) -> TablesResult<()> {
    for (index, wave) in waves.iter().enumerate() {
        if !(wave.tune.is_finite() && wave.tune > 0.0) {
            return Err(TablesError::InvalidPcmWave {
                index,
                tune: wave.tune,
            });
        }
    }
    Ok(())
}

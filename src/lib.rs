pub mod config;
pub mod constants;
pub mod error;
pub mod filter;
pub mod tables;
pub mod wave;

pub use config::{load_pcm_waves, PcmWaveEntry, TablesConfig};
pub use error::{TablesError, TablesResult};
pub use filter::FilterCoeffs;
pub use tables::{KeyLookup, NoteLookup, Tables};
pub use wave::{write_wave_source, LoadReport};

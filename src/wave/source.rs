//! Wave source stream: header, per-note records and the cache writer.

use std::io::{self, Read, Write};

use crate::constants::{HIGHEST_NOTE, LOWEST_NOTE, WGAMP};
use crate::error::{TablesError, TablesResult};
use crate::tables::note::note_divider;

use super::synth::{synthesize_raw, waveform_sizes};

pub const MAGIC: [u8; 8] = *b"MT32WAVE";
pub const VERSION: [u8; 4] = [0, 0, 1, 0];
pub const HEADER_LEN: usize = 20;
const ENDIAN_MARKER: u16 = 1;

fn header_bytes(sample_rate: f32, master_tune: f32) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[0..8].copy_from_slice(&MAGIC);
    header[8..12].copy_from_slice(&VERSION);
    header[12..16].copy_from_slice(&(sample_rate as u32).to_be_bytes());
    header[16..20].copy_from_slice(&master_tune.to_le_bytes());
    header
}

/// Reads and checks the stream header and endian marker.
pub fn read_header(source: &mut dyn Read, sample_rate: f32, master_tune: f32) -> TablesResult<()> {
    let mut found = [0u8; HEADER_LEN];
    source.read_exact(&mut found)?;

    let mut magic = [0u8; 8];
    magic.copy_from_slice(&found[0..8]);
    if magic != MAGIC {
        return Err(TablesError::BadMagic(magic));
    }

    let mut version = [0u8; 4];
    version.copy_from_slice(&found[8..12]);
    if version != VERSION {
        return Err(TablesError::UnsupportedVersion(version));
    }

    let expected = header_bytes(sample_rate, master_tune);
    if found[12..20] != expected[12..20] {
        let found_rate = u32::from_be_bytes([found[12], found[13], found[14], found[15]]);
        let found_tune = f32::from_le_bytes([found[16], found[17], found[18], found[19]]);
        return Err(TablesError::HeaderMismatch {
            expected_rate: sample_rate as u32,
            found_rate,
            expected_tune: master_tune,
            found_tune,
        });
    }

    let mut marker = [0u8; 2];
    source.read_exact(&mut marker)?;
    let marker = u16::from_le_bytes(marker);
    if marker != ENDIAN_MARKER {
        return Err(TablesError::BadEndianMarker(marker));
    }
    Ok(())
}

fn truncated_on_eof(note: u8) -> impl Fn(io::Error) -> TablesError {
    move |err| {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            TablesError::Truncated { note }
        } else {
            TablesError::Io(err)
        }
    }
}

/// Amplitude and divider at the start of a note record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordHeader {
    pub amplitude: f32,
    pub divider: f32,
}

pub fn read_record_header(source: &mut dyn Read, note: u8) -> TablesResult<RecordHeader> {
    let mut bytes = [0u8; 8];
    source.read_exact(&mut bytes).map_err(truncated_on_eof(note))?;
    let amplitude = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let divider = f32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

    if !(amplitude.is_finite() && amplitude > 0.0 && amplitude <= i16::MAX as f32) {
        return Err(TablesError::MalformedRecord {
            note,
            reason: format!("amplitude {} outside (0, 32767]", amplitude),
        });
    }
    if !(divider.is_finite() && divider >= 0.0) {
        return Err(TablesError::MalformedRecord {
            note,
            reason: format!("divider {} is not a positive number", divider),
        });
    }
    Ok(RecordHeader { amplitude, divider })
}

/// Reads one run of `len` raw samples.
pub fn read_run(source: &mut dyn Read, note: u8, len: usize) -> TablesResult<Vec<f32>> {
    let mut bytes = vec![0u8; len * 4];
    source.read_exact(&mut bytes).map_err(truncated_on_eof(note))?;
    let run = bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect::<Vec<f32>>();
    if let Some(bad) = run.iter().position(|s| !s.is_finite()) {
        return Err(TablesError::MalformedRecord {
            note,
            reason: format!("sample {} is not finite", bad),
        });
    }
    Ok(run)
}

/// Writes one note record.
pub fn write_record(
    writer: &mut dyn Write,
    amplitude: f32,
    divider: f32,
    runs: &[Vec<f64>; 3],
) -> io::Result<()> {
    writer.write_all(&amplitude.to_le_bytes())?;
    writer.write_all(&divider.to_le_bytes())?;
    for run in runs {
        for &sample in run {
            writer.write_all(&(sample as f32).to_le_bytes())?;
        }
    }
    Ok(())
}

/// Writes a complete wave source for `sample_rate`/`master_tune` from the
/// synthesized waveforms. Loading it back yields the same tables as
/// building without a source.
pub fn write_wave_source(
    writer: &mut dyn Write,
    sample_rate: f32,
    master_tune: f32,
) -> io::Result<()> {
    writer.write_all(&header_bytes(sample_rate, master_tune))?;
    writer.write_all(&ENDIAN_MARKER.to_le_bytes())?;
    for note in LOWEST_NOTE..=HIGHEST_NOTE {
        let (_, div2) = note_divider(note, sample_rate, master_tune);
        let runs = synthesize_raw(div2);
        debug_assert_eq!(runs[2].len() as u32, waveform_sizes(div2 as i32)[2]);
        write_record(writer, WGAMP, div2, &runs)?;
    }
    writer.flush()
}

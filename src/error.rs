use std::fmt;
use std::io;

/// Result type shared by the table builder and the wave loader.
pub type TablesResult<T> = Result<T, TablesError>;

/// Failures that abort a table build.
///
/// Every variant leaves the `Tables` object uninitialized. Internal
/// consistency problems (unstable filter sections, out-of-range resonance)
/// are assertions, not variants.
#[derive(Debug)]
pub enum TablesError {
    InvalidSampleRate(f32),
    InvalidMasterTune(f32),
    InvalidPcmWave {
        index: usize,
        tune: f64,
    },
    BadMagic([u8; 8]),
    UnsupportedVersion([u8; 4]),
    HeaderMismatch {
        expected_rate: u32,
        found_rate: u32,
        expected_tune: f32,
        found_tune: f32,
    },
    BadEndianMarker(u16),
    /// The wave source ended inside a note record.
    Truncated {
        note: u8,
    },
    MalformedRecord {
        note: u8,
        reason: String,
    },
    DividerMismatch {
        note: u8,
        expected: i32,
        found: i32,
    },
    Io(io::Error),
    Descriptors(serde_json::Error),
    /// The progress callback asked to stop.
    Aborted {
        note: u8,
    },
}

impl TablesError {
    /// Whether the error came from reading the wave source.
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            TablesError::BadMagic(_)
                | TablesError::UnsupportedVersion(_)
                | TablesError::HeaderMismatch { .. }
                | TablesError::BadEndianMarker(_)
                | TablesError::Truncated { .. }
                | TablesError::MalformedRecord { .. }
                | TablesError::DividerMismatch { .. }
                | TablesError::Io(_)
        )
    }
}

impl fmt::Display for TablesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TablesError::InvalidSampleRate(rate) => {
                write!(f, "Bad sample rate ({} <= 0.0 or not finite)", rate)
            }
            TablesError::InvalidMasterTune(tune) => write!(f, "Bad master tune ({})", tune),
            TablesError::InvalidPcmWave { index, tune } => {
                write!(f, "PCM wave {} has unusable tune {}", index, tune)
            }
            TablesError::BadMagic(magic) => write!(f, "Wave source magic {:?} not recognised", magic),
            TablesError::UnsupportedVersion(version) => {
                write!(f, "Wave source version {:?} not supported", version)
            }
            TablesError::HeaderMismatch {
                expected_rate,
                found_rate,
                expected_tune,
                found_tune,
            } => write!(
                f,
                "Wave source built for {} Hz / tune {}, expected {} Hz / tune {}",
                found_rate, found_tune, expected_rate, expected_tune
            ),
            TablesError::BadEndianMarker(marker) => {
                write!(f, "Endian check in wave source is {:#06x}, expected 0x0001", marker)
            }
            TablesError::Truncated { note } => {
                write!(f, "Wave source ended inside the record of note {}", note)
            }
            TablesError::MalformedRecord { note, reason } => {
                write!(f, "Malformed wave record for note {}: {}", note, reason)
            }
            TablesError::DividerMismatch {
                note,
                expected,
                found,
            } => write!(
                f,
                "Wave record for note {} has divider {}, expected {}",
                note, found, expected
            ),
            TablesError::Io(err) => write!(f, "Error reading wave source: {}", err),
            TablesError::Descriptors(err) => write!(f, "Invalid PCM wave descriptors: {}", err),
            TablesError::Aborted { note } => write!(f, "Initialisation aborted at note {}", note),
        }
    }
}

impl std::error::Error for TablesError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TablesError::Io(err) => Some(err),
            TablesError::Descriptors(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for TablesError {
    fn from(err: io::Error) -> Self {
        TablesError::Io(err)
    }
}

impl From<serde_json::Error> for TablesError {
    fn from(err: serde_json::Error) -> Self {
        TablesError::Descriptors(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_io_errors_keep_their_source() {
        let err: TablesError = io::Error::new(io::ErrorKind::Other, "disk gone").into();
        assert!(err.is_source_error());
        assert!(err.source().is_some());
        assert!(err.to_string().contains("disk gone"));
    }

    #[test]
    fn test_parameter_errors_are_not_source_errors() {
        assert!(!TablesError::InvalidSampleRate(0.0).is_source_error());
        assert!(!TablesError::Aborted { note: 40 }.is_source_error());
        assert!(TablesError::Truncated { note: 61 }.is_source_error());
    }
}

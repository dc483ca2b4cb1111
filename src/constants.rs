//! Fixed dimensions and hardware constants shared by the table builders.

/// Lowest MIDI note with a `NoteLookup`.
pub const LOWEST_NOTE: u8 = 12;
/// Highest MIDI note with a `NoteLookup`.
pub const HIGHEST_NOTE: u8 = 127;
pub const NUM_NOTES: usize = (HIGHEST_NOTE - LOWEST_NOTE) as usize + 1;

/// Lowest key with a `KeyLookup`.
pub const LOWEST_KEY: u8 = 12;
/// Highest key with a `KeyLookup`.
pub const HIGHEST_KEY: u8 = 108;
pub const NUM_KEYS: usize = (HIGHEST_KEY - LOWEST_KEY) as usize + 1;

/// Clock of the emulated hardware; cutoff steps and PCM tunes are relative
/// to it.
pub const HARDWARE_SAMPLE_RATE: f32 = 32000.0;

pub const MIDDLEC: u8 = 60;
pub const MIDDLEA: u8 = 69;
pub const REFERENCE_PITCH_HZ: f64 = 440.0;

/// Cutoff granularity of the filter coefficient table. Step `j` is
/// `(j + 1) / FILTERGRAN` of the hardware Nyquist frequency.
pub const FILTERGRAN: usize = 512;
/// Highest cutoff designed, as a fraction of the output rate.
pub const MAX_CUTOFF_FRACTION: f32 = 0.45;
/// Highest cutoff index a note filter table may produce.
pub const FILTER_INDEX_MAX: i32 = ((FILTERGRAN * 15) / 16) as i32;
pub const RESONANCE_STEPS: usize = 31;
/// Terms per coefficient set: two biquad sections of four.
pub const FILTER_ORDER: usize = 8;

/// Largest block the mixer renders in one call.
pub const MAX_SAMPLE_OUTPUT: usize = 4096;

/// Waveform amplitude. Pinned against the reference hardware output,
/// samples are clamped into `[-WGAMP - 1, WGAMP]`.
pub const WGAMP: f32 = 12382.0;

pub const SINTABLE_SIZE: usize = 65536;

/// Parameter range of most MT-32 controls (0..=100).
pub const PARAM_RANGE: usize = 101;
pub const VELOCITY_RANGE: usize = 128;

pub const ENVELOPE_STAGES: usize = 5;
pub const TVA_BIAS_LEVELS: usize = 13;
pub const TVF_BIAS_LEVELS: usize = 15;
pub const PW_VELFOLLOW_LEVELS: usize = 15;
pub const PITCH_ENV_ROWS: usize = 16;
/// Rows of `pitch_env_val` that carry data.
pub const PITCH_ENV_DEPTHS: usize = 11;
/// Key offsets -108..=108 covered by the TVF keyfollow table.
pub const KEYFOLLOW_RANGE: usize = 217;

pub const SAW_TABLE_SIZE: usize = 101;
pub const FILT_TABLE_SIZE: usize = 201;
pub const NFILT_TABLE_SIZE: usize = 101;
pub const WAVEFORM_COUNT: usize = 3;

pub const FLOAT_PI: f32 = std::f32::consts::PI;
pub const FLOAT_LN: f32 = std::f32::consts::LN_10;
pub const DOUBLE_PI: f64 = std::f64::consts::PI;

/// Converts `x` to fixed point with `point` fractional bits.
#[inline]
pub fn fixedpoint_make(x: f32, point: u32) -> u32 {
    ((1u32 << point) as f32 * x) as u32
}

pub const NOTE_NAMES: [&str; 12] = [
    "C ", "C#", "D ", "D#", "E ", "F ", "F#", "G ", "G#", "A ", "A#", "B ",
];

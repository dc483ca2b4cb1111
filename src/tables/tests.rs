use std::io::Cursor;

use assert_approx_eq::assert_approx_eq;

use super::*;
use crate::wave::write_wave_source;

fn built(sample_rate: f32) -> Tables {
    let mut tables = Tables::new();
    tables
        .init(&TablesConfig::new(sample_rate, 0.0), &[], None)
        .expect("synthesized build succeeds");
    tables
}

fn wave_source(sample_rate: f32, master_tune: f32) -> Vec<u8> {
    let mut bytes = Vec::new();
    write_wave_source(&mut bytes, sample_rate, master_tune).expect("writing to memory");
    bytes
}

fn assert_no_waveforms(tables: &Tables) {
    for note_lookup in tables.notes() {
        for index in 0..WAVEFORM_COUNT {
            assert!(note_lookup.waveform(index).is_none());
            assert_eq!(note_lookup.waveform_size(index), 0);
        }
    }
}

#[test]
fn test_end_to_end_at_hardware_rate() {
    let tables = built(32000.0);
    assert!(tables.is_initialized());
    assert_eq!(tables.notes().len(), NUM_NOTES);
    assert_eq!(tables.keys().len(), NUM_KEYS);

    assert_eq!(tables.notes()[0].div2(), 3913);
    assert_eq!(tables.keys()[0].env_time_mult()[0], 256);

    let middle_a = tables.note(MIDDLEA).expect("note in range");
    assert_eq!(middle_a.div2(), 145);
    assert_eq!(middle_a.waveform_size(0), 290);
    assert_eq!(middle_a.waveform_size(2), 580);
    assert_eq!(middle_a.waveform(1).map(|w| w.len()), Some(290));

    assert!(tables.note(LOWEST_NOTE - 1).is_none());
    assert!(tables.note(HIGHEST_NOTE).is_some());
    assert!(tables.key(HIGHEST_KEY + 1).is_none());
    assert_eq!(tables.key(MIDDLEC).map(|k| k.env_depth_mult()[4]), Some(256));

    assert_eq!(tables.load_report().loads, NUM_NOTES * WAVEFORM_COUNT);
    assert_eq!(tables.load_report().allocations, NUM_NOTES * WAVEFORM_COUNT);
    assert_approx_eq!(tables.resonance_factor()[0], 1.0);
    assert_approx_eq!(tables.resonance_factor()[30], 2.0);
}

#[test]
fn test_env_delta_max_time_follows_env_time() {
    let tables = built(32000.0);
    for lf in 0..PARAM_RANGE {
        let cap = tables.env_delta_max_param()[lf] as usize;
        assert_eq!(tables.env_delta_max_time()[lf], tables.env_time()[cap]);
    }
}

#[test]
fn test_init_is_idempotent() {
    let mut tables = built(32000.0);
    let sintable = tables.sintable().to_vec();
    let loads = tables.load_report().loads;

    tables
        .init(&TablesConfig::new(32000.0, 0.0), &[], None)
        .expect("repeat build");
    assert_eq!(tables.build_count(), 1);
    assert_eq!(tables.load_report().loads, loads);
    assert_eq!(tables.sintable(), &sintable[..]);

    // A different tune is a full rebuild
    tables
        .init(&TablesConfig::new(32000.0, 0.5), &[], None)
        .expect("retuned build");
    assert_eq!(tables.build_count(), 2);
    assert_eq!(tables.initialized_config(), Some(&TablesConfig::new(32000.0, 0.5)));
}

#[test]
fn test_builds_are_deterministic() {
    let a = built(44100.0);
    let b = built(44100.0);

    assert_eq!(a.noise_buf(), b.noise_buf());
    assert_eq!(a.sintable(), b.sintable());
    assert_eq!(a.env_time(), b.env_time());
    assert_eq!(a.filt_coeff(), b.filt_coeff());
    assert_eq!(a.filt_gain(), b.filt_gain());
    for (x, y) in a.notes().iter().zip(b.notes()) {
        assert_eq!(x.div2(), y.div2());
        assert_eq!(x.saw_table(), y.saw_table());
        assert_eq!(x.filt_table(), y.filt_table());
        assert_eq!(x.nfilt_table(), y.nfilt_table());
        for index in 0..WAVEFORM_COUNT {
            assert_eq!(x.waveform(index), y.waveform(index));
        }
    }
    assert_eq!(a.keys(), b.keys());
}

#[test]
fn test_only_timing_and_filter_tables_depend_on_rate() {
    let low = built(22050.0);
    let high = built(44100.0);

    assert_ne!(low.env_time(), high.env_time());
    assert_ne!(low.env_delta_max_time(), high.env_delta_max_time());
    assert_ne!(low.env_decay_time(), high.env_decay_time());
    assert_ne!(low.lfo_period(), high.lfo_period());
    assert_ne!(low.filt_coeff(), high.filt_coeff());
    assert_ne!(low.filt_gain(), high.filt_gain());

    assert_eq!(low.tvf_keyfollow_mult(), high.tvf_keyfollow_mult());
    assert_eq!(low.tvf_velfollow_mult(), high.tvf_velfollow_mult());
    assert_eq!(low.tva_bias_mult(), high.tva_bias_mult());
    assert_eq!(low.sintable(), high.sintable());
    assert_eq!(low.noise_buf(), high.noise_buf());
    assert_eq!(low.pitch_env_val(), high.pitch_env_val());
    assert_eq!(low.lfo_shift(), high.lfo_shift());
    assert_eq!(low.volume_mult(), high.volume_mult());
    assert_eq!(low.pw_factor(), high.pw_factor());
    assert_eq!(low.env_delta_max_param(), high.env_delta_max_param());
    assert_eq!(low.keys(), high.keys());
}

#[test]
fn test_free_notes_releases_every_buffer() {
    let waves = [PcmWaveEntry::new(0, 256, 440.0, true)];
    let mut tables = Tables::new();
    tables
        .init(&TablesConfig::default(), &waves, None)
        .expect("build with one PCM wave");

    tables.free_notes();
    assert!(!tables.is_initialized());
    assert_no_waveforms(&tables);
    // PCM steps survive teardown
    assert_eq!(tables.note(MIDDLEA).map(|n| n.wav_table()), Some(&[65536u32][..]));

    tables.free_notes();
    assert_no_waveforms(&tables);

    // Rebuilding after teardown works and allocates again
    tables
        .init(&TablesConfig::default(), &waves, None)
        .expect("rebuild");
    assert!(tables.note(LOWEST_NOTE).and_then(|n| n.waveform(0)).is_some());
}

#[test]
fn test_truncated_stream_fails_atomically() {
    let mut bytes = wave_source(32000.0, 0.0);
    bytes.truncate(bytes.len() / 2);

    let mut tables = built(32000.0);
    let config = TablesConfig::new(32000.0, 0.25);
    let mut retuned = wave_source(32000.0, 0.25);
    retuned.truncate(retuned.len() / 2);

    let result = tables.init(&config, &[], Some(&mut Cursor::new(retuned)));
    assert!(matches!(result, Err(TablesError::Truncated { .. })));
    assert!(!tables.is_initialized());
    assert_no_waveforms(&tables);

    let mut fresh = Tables::new();
    let result = fresh.init(&TablesConfig::default(), &[], Some(&mut Cursor::new(bytes)));
    assert!(matches!(result, Err(TablesError::Truncated { .. })));
    assert!(!fresh.is_initialized());
    assert_no_waveforms(&fresh);
    assert_eq!(fresh.build_count(), 0);
}

#[test]
fn test_stream_header_must_match_config() {
    let bytes = wave_source(44100.0, 0.0);
    let mut tables = Tables::new();
    let result = tables.init(&TablesConfig::default(), &[], Some(&mut Cursor::new(bytes)));
    assert!(matches!(
        result,
        Err(TablesError::HeaderMismatch {
            expected_rate: 32000,
            found_rate: 44100,
            ..
        })
    ));
    assert!(!tables.is_initialized());
}

#[test]
fn test_stream_matches_synthesized_build() {
    let bytes = wave_source(32000.0, 0.0);
    let mut streamed = Tables::new();
    streamed
        .init(&TablesConfig::default(), &[], Some(&mut Cursor::new(bytes)))
        .expect("complete stream");
    let synthesized = built(32000.0);

    for (x, y) in streamed.notes().iter().zip(synthesized.notes()) {
        assert_eq!(x.div2(), y.div2());
        for index in 0..WAVEFORM_COUNT {
            let (Some(a), Some(b)) = (x.waveform(index), y.waveform(index)) else {
                panic!("waveform {} missing", index);
            };
            assert_eq!(a.len(), b.len());
            // Samples pass through f32 in the stream
            assert!(a.iter().zip(b).all(|(s, t)| (*s as i32 - *t as i32).abs() <= 1));
        }
    }
}

#[test]
fn test_progress_can_abort() {
    let mut calls = 0;
    let mut last = 0.0;
    let mut tables = Tables::new();
    let result = tables.init_with_progress(&TablesConfig::default(), &[], None, |fraction| {
        calls += 1;
        last = fraction;
        calls < 10
    });

    assert!(matches!(result, Err(TablesError::Aborted { note: 21 })));
    assert_eq!(calls, 10);
    assert_approx_eq!(last, 10.0 / NUM_NOTES as f32);
    assert!(!tables.is_initialized());
    assert_no_waveforms(&tables);
}

#[test]
fn test_progress_reaches_one() {
    let mut fractions = Vec::new();
    let mut tables = Tables::new();
    tables
        .init_with_progress(&TablesConfig::default(), &[], None, |fraction| {
            fractions.push(fraction);
            true
        })
        .expect("full build");
    assert_eq!(fractions.len(), NUM_NOTES);
    assert_approx_eq!(fractions[NUM_NOTES - 1], 1.0);
    assert!(fractions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_invalid_input_leaves_tables_untouched() {
    let mut tables = Tables::new();
    assert!(matches!(
        tables.init(&TablesConfig::new(0.0, 0.0), &[], None),
        Err(TablesError::InvalidSampleRate(_))
    ));
    assert!(matches!(
        tables.init(&TablesConfig::new(32000.0, f32::NAN), &[], None),
        Err(TablesError::InvalidMasterTune(_))
    ));
    let waves = [PcmWaveEntry::new(0, 16, -1.0, false)];
    assert!(matches!(
        tables.init(&TablesConfig::default(), &waves, None),
        Err(TablesError::InvalidPcmWave { index: 0, .. })
    ));
    assert!(!tables.is_initialized());
    assert_eq!(tables.build_count(), 0);
}

#[test]
fn test_invalid_input_tears_down_built_tables() {
    let mut tables = built(32000.0);
    assert!(matches!(
        tables.init(&TablesConfig::new(0.0, 0.0), &[], None),
        Err(TablesError::InvalidSampleRate(_))
    ));
    assert!(!tables.is_initialized());
    assert_eq!(tables.initialized_config(), None);
    assert_no_waveforms(&tables);

    let mut tables = built(32000.0);
    let waves = [PcmWaveEntry::new(0, 16, -1.0, false)];
    assert!(matches!(
        tables.init(&TablesConfig::default(), &waves, None),
        Err(TablesError::InvalidPcmWave { index: 0, .. })
    ));
    assert!(!tables.is_initialized());
    assert_no_waveforms(&tables);
}

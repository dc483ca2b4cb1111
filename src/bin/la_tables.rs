//! Builds the synthesis tables for a sample rate and prints a JSON summary.
//!
//! ```text
//! la-tables [SAMPLE_RATE] [MASTER_TUNE] [--pcm waves.json] [--source waves.bin]
//!           [--cache waves.bin] [--wav NOTE out.wav]
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read};

use anyhow::{anyhow, bail, Context};
use dasp_sample::Sample;
use hound::{SampleFormat, WavSpec, WavWriter};
use serde_json::json;

use la_tables::{load_pcm_waves, write_wave_source, PcmWaveEntry, Tables, TablesConfig};

#[derive(Default)]
struct Options {
    config: TablesConfig,
    pcm_path: Option<String>,
    source_path: Option<String>,
    cache_path: Option<String>,
    wav: Option<(u8, String)>,
}

fn parse_args() -> anyhow::Result<Options> {
    let mut options = Options::default();
    let mut positional = 0;
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--pcm" => options.pcm_path = Some(args.next().context("--pcm needs a file")?),
            "--source" => options.source_path = Some(args.next().context("--source needs a file")?),
            "--cache" => options.cache_path = Some(args.next().context("--cache needs a file")?),
            "--wav" => {
                let note = args.next().context("--wav needs a note")?;
                let note = note.parse::<u8>().with_context(|| format!("bad note {}", note))?;
                let path = args.next().context("--wav needs an output file")?;
                options.wav = Some((note, path));
            }
            value => {
                let parsed = value
                    .parse::<f32>()
                    .with_context(|| format!("unexpected argument {}", value))?;
                match positional {
                    0 => options.config.sample_rate = parsed,
                    1 => options.config.master_tune = parsed,
                    _ => bail!("unexpected argument {}", value),
                }
                positional += 1;
            }
        }
    }
    Ok(options)
}

fn write_note_wav(tables: &Tables, note: u8, path: &str, sample_rate: u32) -> anyhow::Result<()> {
    let lookup = tables
        .note(note)
        .ok_or_else(|| anyhow!("note {} has no lookup", note))?;

    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec).with_context(|| format!("creating {}", path))?;

    // The three waveforms back to back
    for index in 0..3 {
        let waveform = lookup
            .waveform(index)
            .ok_or_else(|| anyhow!("waveform {} of note {} is not loaded", index, note))?;
        for &sample in waveform {
            writer.write_sample(sample.to_sample::<f32>())?;
        }
    }
    writer.finalize()?;
    log::info!("Wrote waveforms of note {} to {}", note, path);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let options = parse_args()?;
    let config = options.config;
    config.validate()?;

    let pcm_waves: Vec<PcmWaveEntry> = match &options.pcm_path {
        Some(path) => {
            let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
            load_pcm_waves(&json).with_context(|| format!("parsing {}", path))?
        }
        None => Vec::new(),
    };

    if let Some(path) = &options.cache_path {
        let file = File::create(path).with_context(|| format!("creating {}", path))?;
        write_wave_source(&mut BufWriter::new(file), config.sample_rate, config.master_tune)?;
        log::info!("Wrote wave source to {}", path);
    }

    let mut source = match &options.source_path {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("opening {}", path))?;
            Some(BufReader::new(file))
        }
        None => None,
    };

    let mut tables = Tables::new();
    let mut last_logged = 0;
    tables.init_with_progress(
        &config,
        &pcm_waves,
        source.as_mut().map(|s| s as &mut dyn Read),
        |fraction| {
            let percent = (fraction * 100.0) as u32;
            if percent >= last_logged + 25 {
                log::info!("{}% of notes built", percent);
                last_logged = percent;
            }
            true
        },
    )?;

    if let Some((note, path)) = &options.wav {
        write_note_wav(&tables, *note, path, config.sample_rate as u32)?;
    }

    let report = tables.load_report();
    let summary = json!({
        "sampleRate": config.sample_rate,
        "masterTune": config.master_tune,
        "pcmWaves": pcm_waves.len(),
        "notes": tables.notes().len(),
        "keys": tables.keys().len(),
        "lowestDiv2": tables.notes().first().map(|n| n.div2()),
        "highestDiv2": tables.notes().last().map(|n| n.div2()),
        "envTime": [tables.env_time()[0], tables.env_time()[100]],
        "lfoPeriod": [tables.lfo_period()[0], tables.lfo_period()[100]],
        "waveformLoads": report.loads,
        "clamped": {
            "saw": report.clamped("saw"),
            "cos": report.clamped("cos"),
            "cosoff": report.clamped("cosoff"),
        },
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

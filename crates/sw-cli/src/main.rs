//! Stillwater command-line denoiser
//!
//! Usage:
//!   stillwater noisy.wav                       - Denoise with the voice profile
//!   stillwater a.wav b.flac -o out/            - Several files, in parallel
//!   stillwater in.mp3 --profile advanced       - Pick a built-in profile
//!   stillwater in.wav --config my.json         - Load a JSON configuration
//!   stillwater --profile basic --print-config  - Show the resolved configuration

mod decode;
mod encode;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{error, info};
use rayon::prelude::*;
use sw_denoise::{
    DenoiseConfig, DenoisingPipeline, FilterSpec, Profile, ThresholdRule, WaveletFamily,
};

use crate::encode::BitDepth;

#[derive(Parser, Debug)]
#[command(name = "stillwater", version, about = "Three-stage audio denoiser")]
struct Cli {
    /// Input audio files (WAV, FLAC, AIFF, MP3, OGG, M4A)
    inputs: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Built-in parameter set (basic, voice, advanced)
    #[arg(short, long, default_value = "voice")]
    profile: Profile,

    /// JSON configuration file; replaces the profile
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Band-pass low cutoff (Hz)
    #[arg(long)]
    low: Option<f64>,

    /// Band-pass high cutoff (Hz)
    #[arg(long)]
    high: Option<f64>,

    /// Butterworth order
    #[arg(long)]
    order: Option<usize>,

    /// Spectral gate reduction factor
    #[arg(long)]
    reduction: Option<f64>,

    /// Wavelet family (haar, db2..db8, sym4, sym8, coif1, coif2)
    #[arg(long)]
    wavelet: Option<WaveletFamily>,

    /// Wavelet decomposition level
    #[arg(long)]
    level: Option<usize>,

    /// Threshold rule (median, universal)
    #[arg(long)]
    rule: Option<ThresholdRule>,

    /// Output bit depth
    #[arg(long, value_enum, default_value_t = BitDepth::Int16)]
    bit_depth: BitDepth,

    /// Print the resolved configuration as JSON and exit
    #[arg(long)]
    print_config: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Profile or config file, then individual overrides
    fn resolve_config(&self) -> Result<DenoiseConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                DenoiseConfig::from_json(&json)
                    .with_context(|| format!("invalid configuration in {}", path.display()))?
            }
            None => self.profile.config(),
        };

        let filter = config.filter;
        config.filter = FilterSpec::new(
            self.order.unwrap_or(filter.order),
            self.low.unwrap_or(filter.low_hz),
            self.high.unwrap_or(filter.high_hz),
        );
        if let Some(reduction) = self.reduction {
            config.reduction_factor = reduction;
        }
        if let Some(wavelet) = self.wavelet {
            config.wavelet = wavelet;
        }
        if let Some(level) = self.level {
            config.level = level;
        }
        if let Some(rule) = self.rule {
            config.threshold_rule = rule;
        }
        Ok(config)
    }
}

/// `denoised_<stem>.wav` inside `output_dir`
fn output_path(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    output_dir.join(format!("denoised_{}.wav", stem))
}

/// Decode, denoise and write one file
fn process_file(
    pipeline: &DenoisingPipeline,
    input: &Path,
    output_dir: &Path,
    bit_depth: BitDepth,
) -> Result<PathBuf> {
    let start = Instant::now();
    let buffer = decode::decode_mono(input)?;
    let denoised = pipeline
        .run(buffer)
        .with_context(|| format!("denoising {} failed", input.display()))?;

    let output = output_path(input, output_dir);
    encode::write_wav(&output, &denoised, bit_depth)?;
    info!(
        "{} -> {} in {:.2?}",
        input.display(),
        output.display(),
        start.elapsed()
    );
    Ok(output)
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.resolve_config()?;
    if cli.print_config {
        println!("{}", config.to_json()?);
        return Ok(());
    }
    if cli.inputs.is_empty() {
        bail!("no input files given");
    }

    fs::create_dir_all(&cli.output)
        .with_context(|| format!("failed to create {}", cli.output.display()))?;

    info!(
        "Denoising {} file(s): band {}-{} Hz (order {}), reduction {}, {} level {} ({})",
        cli.inputs.len(),
        config.filter.low_hz,
        config.filter.high_hz,
        config.filter.order,
        config.reduction_factor,
        config.wavelet,
        config.level,
        config.threshold_rule
    );

    let pipeline = DenoisingPipeline::new(config);
    let results: Vec<(&PathBuf, Result<PathBuf>)> = cli
        .inputs
        .par_iter()
        .map(|input| (input, process_file(&pipeline, input, &cli.output, cli.bit_depth)))
        .collect();

    let mut failed = 0;
    for (input, result) in &results {
        if let Err(e) = result {
            error!("{}: {:#}", input.display(), e);
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{} of {} file(s) failed", failed, results.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;
    use sw_core::{AudioBuffer, SampleBuffer};

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("stillwater").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_default_config_is_voice_profile() {
        let cli = parse(&["in.wav"]);
        assert_eq!(cli.resolve_config().unwrap(), Profile::VoicePreserving.config());
        assert_eq!(cli.bit_depth, BitDepth::Int16);
    }

    #[test]
    fn test_overrides_apply_on_top_of_profile() {
        let cli = parse(&[
            "--profile", "advanced", "--low", "120", "--order", "2", "--wavelet", "sym8",
            "--rule", "median", "--reduction", "0.1", "--level", "3", "--bit-depth", "24",
        ]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.filter, FilterSpec::new(2, 120.0, 7500.0));
        assert_eq!(config.wavelet, WaveletFamily::Symlet(8));
        assert_eq!(config.threshold_rule, ThresholdRule::RobustMedian);
        assert_eq!(config.reduction_factor, 0.1);
        assert_eq!(config.level, 3);
        assert_eq!(cli.bit_depth, BitDepth::Int24);
    }

    #[test]
    fn test_rejects_unknown_values() {
        let args = |extra: &[&str]| {
            Cli::try_parse_from(std::iter::once("stillwater").chain(extra.iter().copied()))
        };
        assert!(args(&["--profile", "loud"]).is_err());
        assert!(args(&["--wavelet", "mexh"]).is_err());
        assert!(args(&["--bit-depth", "12"]).is_err());
    }

    #[test]
    fn test_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = Profile::Basic.config().with_level(2);
        fs::write(&path, config.to_json().unwrap()).unwrap();

        let cli = parse(&["--config", path.to_str().unwrap(), "--high", "1500"]);
        let resolved = cli.resolve_config().unwrap();
        assert_eq!(resolved.level, 2);
        assert_eq!(resolved.filter.high_hz, 1500.0);

        fs::write(&path, "{ not json").unwrap();
        assert!(parse(&["--config", path.to_str().unwrap()]).resolve_config().is_err());
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("/music/take 1.flac"), Path::new("out")),
            PathBuf::from("out/denoised_take 1.wav")
        );
    }

    #[test]
    fn test_process_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("tone.wav");

        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&input, spec).unwrap();
        for i in 0..8000 {
            let s = (0.5 * (2.0 * PI * 440.0 * i as f64 / 16000.0).sin() * 32767.0) as i16;
            writer.write_sample(s).unwrap();
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let pipeline = DenoisingPipeline::default();
        let output = process_file(&pipeline, &input, dir.path(), BitDepth::Float32).unwrap();
        assert_eq!(output, dir.path().join("denoised_tone.wav"));

        let decoded: SampleBuffer = decode::decode_mono(&output).unwrap();
        assert_eq!(decoded.len(), 8000);
        assert_eq!(decoded.sample_rate(), 16000);
    }

    #[test]
    fn test_process_file_reports_invalid_band() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("low_rate.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 4000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&input, spec).unwrap();
        for _ in 0..4000 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        // 3400 Hz upper edge is above the 2 kHz Nyquist
        let err = process_file(&DenoisingPipeline::default(), &input, dir.path(), BitDepth::Int16)
            .unwrap_err();
        let root = err.root_cause().to_string();
        assert!(root.contains("Nyquist"), "{}", root);
    }
}

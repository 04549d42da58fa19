//! WAV output via hound

use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::{debug, warn};
use sw_core::SampleBuffer;

/// Output sample format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BitDepth {
    /// 16-bit integer PCM
    #[default]
    #[value(name = "16")]
    Int16,
    /// 24-bit integer PCM
    #[value(name = "24")]
    Int24,
    /// 32-bit IEEE float
    #[value(name = "32")]
    Float32,
}

impl BitDepth {
    fn spec(self, sample_rate: u32) -> hound::WavSpec {
        let (bits_per_sample, sample_format) = match self {
            BitDepth::Int16 => (16, hound::SampleFormat::Int),
            BitDepth::Int24 => (24, hound::SampleFormat::Int),
            BitDepth::Float32 => (32, hound::SampleFormat::Float),
        };
        hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample,
            sample_format,
        }
    }
}

/// Write `buffer` as a mono WAV file, clamping to [-1, 1] for integer formats
pub fn write_wav(path: &Path, buffer: &SampleBuffer, bit_depth: BitDepth) -> Result<()> {
    let spec = bit_depth.spec(buffer.sample_rate());
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("failed to create {}", path.display()))?;

    let clipped = buffer.samples().iter().filter(|s| s.abs() > 1.0).count();
    if clipped > 0 && bit_depth != BitDepth::Float32 {
        warn!("{}: {} samples clipped to full scale", path.display(), clipped);
    }

    match bit_depth {
        BitDepth::Int16 => {
            for &sample in buffer.samples() {
                writer.write_sample((sample.clamp(-1.0, 1.0) * 32767.0).round() as i16)?;
            }
        }
        BitDepth::Int24 => {
            for &sample in buffer.samples() {
                writer.write_sample((sample.clamp(-1.0, 1.0) * 8388607.0).round() as i32)?;
            }
        }
        BitDepth::Float32 => {
            for &sample in buffer.samples() {
                writer.write_sample(sample as f32)?;
            }
        }
    }

    writer
        .finalize()
        .with_context(|| format!("failed to finalize {}", path.display()))?;
    debug!("Wrote {} ({:?})", path.display(), bit_depth);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_back(path: &Path) -> (hound::WavSpec, Vec<f64>) {
        let mut reader = hound::WavReader::open(path).unwrap();
        let spec = reader.spec();
        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .map(|s| s.unwrap() as f64)
                .collect(),
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample - 1)) as f64;
                reader
                    .samples::<i32>()
                    .map(|s| s.unwrap() as f64 / scale)
                    .collect()
            }
        };
        (spec, samples)
    }

    #[test]
    fn test_write_each_depth() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = SampleBuffer::new(vec![0.0, 0.5, -0.5, 0.25], 16000).unwrap();

        for (depth, bits) in [
            (BitDepth::Int16, 16),
            (BitDepth::Int24, 24),
            (BitDepth::Float32, 32),
        ] {
            let path = dir.path().join(format!("out_{}.wav", bits));
            write_wav(&path, &buffer, depth).unwrap();

            let (spec, samples) = read_back(&path);
            assert_eq!(spec.channels, 1);
            assert_eq!(spec.sample_rate, 16000);
            assert_eq!(spec.bits_per_sample, bits);
            assert_eq!(samples.len(), 4);
            for (a, b) in samples.iter().zip(buffer.samples()) {
                assert!((a - b).abs() < 1e-4, "{:?}: {} vs {}", depth, a, b);
            }
        }
    }

    #[test]
    fn test_integer_output_clamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hot.wav");
        let buffer = SampleBuffer::new(vec![2.0, -3.0], 8000).unwrap();
        write_wav(&path, &buffer, BitDepth::Int16).unwrap();

        let (_, samples) = read_back(&path);
        assert!((samples[0] - 32767.0 / 32768.0).abs() < 1e-9);
        assert!((samples[1] + 32767.0 / 32768.0).abs() < 1e-9);
    }
}

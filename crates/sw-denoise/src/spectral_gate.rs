//! Spectral gate stage
//!
//! Estimates a stationary noise floor as the per-bin median magnitude across
//! all STFT frames, scales it by the reduction factor, and subtracts it from
//! every frame's magnitude (clamped at zero). Phase is left untouched.

use log::debug;
use sw_core::{AudioBuffer, DenoiseError, DenoiseResult, Sample, SampleBuffer};
use sw_dsp::stats::median;
use sw_dsp::stft::{Spectrogram, Stft};

use crate::pipeline::Stage;

/// Scaled per-bin noise floor
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseProfile {
    magnitude: Vec<f64>,
    reduction_factor: f64,
}

impl NoiseProfile {
    /// Per-bin median magnitude across frames, times `reduction_factor`
    pub fn estimate(spectrogram: &Spectrogram, reduction_factor: f64) -> Self {
        let magnitude = (0..spectrogram.num_bins())
            .map(|bin| median(&spectrogram.bin_magnitudes(bin)) * reduction_factor)
            .collect();

        Self {
            magnitude,
            reduction_factor,
        }
    }

    /// Scaled floor per bin
    pub fn magnitude(&self) -> &[f64] {
        &self.magnitude
    }

    /// Factor the median was scaled by
    pub fn reduction_factor(&self) -> f64 {
        self.reduction_factor
    }

    /// Number of bins
    pub fn num_bins(&self) -> usize {
        self.magnitude.len()
    }

    /// Subtract the floor from every frame, clamping at zero
    pub fn subtract(&self, spectrogram: &Spectrogram) -> DenoiseResult<Spectrogram> {
        if spectrogram.num_bins() != self.num_bins() {
            return Err(DenoiseError::InvalidConfig(format!(
                "noise profile has {} bins, spectrogram has {}",
                self.num_bins(),
                spectrogram.num_bins()
            )));
        }
        Ok(spectrogram.map_magnitudes(|bin, mag| (mag - self.magnitude[bin]).max(0.0)))
    }
}

/// Median-floor spectral gate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralGateStage {
    reduction_factor: f64,
    frame_size: usize,
    hop_size: usize,
}

impl SpectralGateStage {
    /// Create the stage
    pub fn new(reduction_factor: f64, frame_size: usize, hop_size: usize) -> Self {
        Self {
            reduction_factor,
            frame_size,
            hop_size,
        }
    }

    /// Gate reduction factor
    pub fn reduction_factor(&self) -> f64 {
        self.reduction_factor
    }

    fn check_factor(&self) -> DenoiseResult<()> {
        if !(self.reduction_factor >= 0.0) || !self.reduction_factor.is_finite() {
            return Err(DenoiseError::InvalidConfig(format!(
                "reduction factor must be a finite value >= 0, got {}",
                self.reduction_factor
            )));
        }
        Ok(())
    }

    /// Analyse `samples` and return the gated spectrogram with the noise profile used
    pub fn gated_spectrogram(
        &self,
        samples: &[Sample],
    ) -> DenoiseResult<(Spectrogram, NoiseProfile)> {
        let stft = self.stft()?;
        self.gate_with(&stft, samples)
    }

    /// Gate `buffer`; output length equals input length
    pub fn gate(&self, buffer: SampleBuffer) -> DenoiseResult<SampleBuffer> {
        let stft = self.stft()?;
        if buffer.is_empty() {
            return Ok(buffer);
        }

        let (gated, _) = self.gate_with(&stft, buffer.samples())?;
        let mut output = stft.synthesize(&gated)?;
        output.resize(buffer.len(), 0.0);
        Ok(buffer.with_samples(output))
    }

    /// Validated transform for this stage's geometry
    fn stft(&self) -> DenoiseResult<Stft> {
        self.check_factor()?;
        Stft::new(self.frame_size, self.hop_size)
    }

    fn gate_with(
        &self,
        stft: &Stft,
        samples: &[Sample],
    ) -> DenoiseResult<(Spectrogram, NoiseProfile)> {
        let spectrogram = stft.analyze(samples)?;
        let profile = NoiseProfile::estimate(&spectrogram, self.reduction_factor);
        let gated = profile.subtract(&spectrogram)?;

        debug!(
            "Spectral gate: {} frames x {} bins, reduction {:.2}",
            spectrogram.num_frames(),
            spectrogram.num_bins(),
            self.reduction_factor
        );
        Ok((gated, profile))
    }
}

impl Stage for SpectralGateStage {
    fn name(&self) -> &str {
        "spectral-gate"
    }

    fn process(&self, buffer: SampleBuffer) -> DenoiseResult<SampleBuffer> {
        self.gate(buffer)
    }
}

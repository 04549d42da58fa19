//! Wavelet shrinkage stage
//!
//! Decomposes the signal with a periodised DWT, soft-thresholds every band
//! (approximation included) with a single threshold, and reconstructs.

use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};
use sw_core::{AudioBuffer, DenoiseError, DenoiseResult, Sample, SampleBuffer};
use sw_dsp::stats::median_abs;
use sw_dsp::wavelet::{Dwt, WaveletCoefficients, WaveletFamily};

use crate::pipeline::Stage;

/// Median absolute deviation to Gaussian sigma
const MAD_TO_SIGMA: f64 = 0.6745;

/// Soft threshold: `sign(c) * max(|c| - t, 0)`
#[inline]
pub fn soft_threshold(c: f64, t: f64) -> f64 {
    let shrunk = c.abs() - t;
    if shrunk > 0.0 { shrunk.copysign(c) } else { 0.0 }
}

/// How the shrinkage threshold is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdRule {
    /// `median(|finest detail|) / 0.6745`
    #[default]
    RobustMedian,
    /// `sqrt(2 ln N)` for an `N`-sample signal, independent of content
    UniversalThreshold,
}

impl ThresholdRule {
    /// Threshold for `coeffs` of a signal with `signal_len` samples
    pub fn threshold(self, coeffs: &WaveletCoefficients, signal_len: usize) -> f64 {
        match self {
            ThresholdRule::RobustMedian => median_abs(coeffs.finest_detail()) / MAD_TO_SIGMA,
            ThresholdRule::UniversalThreshold => {
                if signal_len < 2 {
                    0.0
                } else {
                    (2.0 * (signal_len as f64).ln()).sqrt()
                }
            }
        }
    }

    /// Short name
    pub fn name(self) -> &'static str {
        match self {
            ThresholdRule::RobustMedian => "median",
            ThresholdRule::UniversalThreshold => "universal",
        }
    }
}

impl fmt::Display for ThresholdRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ThresholdRule {
    type Err = DenoiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "median" | "robust_median" | "mad" => Ok(ThresholdRule::RobustMedian),
            "universal" | "universal_threshold" | "visu" => Ok(ThresholdRule::UniversalThreshold),
            other => Err(DenoiseError::InvalidConfig(format!(
                "unknown threshold rule '{}' (expected median or universal)",
                other
            ))),
        }
    }
}

/// Wavelet soft-threshold stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveletDenoiseStage {
    wavelet: WaveletFamily,
    level: usize,
    rule: ThresholdRule,
}

impl WaveletDenoiseStage {
    /// Create the stage
    pub fn new(wavelet: WaveletFamily, level: usize, rule: ThresholdRule) -> Self {
        Self {
            wavelet,
            level,
            rule,
        }
    }

    /// Wavelet family
    pub fn wavelet(&self) -> WaveletFamily {
        self.wavelet
    }

    /// Decomposition level
    pub fn level(&self) -> usize {
        self.level
    }

    /// Threshold rule
    pub fn rule(&self) -> ThresholdRule {
        self.rule
    }

    fn transform(&self) -> DenoiseResult<Dwt> {
        let dwt = Dwt::new(self.wavelet)?;
        if self.level == 0 {
            return Err(DenoiseError::InvalidConfig(
                "decomposition level must be positive".to_string(),
            ));
        }
        Ok(dwt)
    }

    /// Decompose, shrink every coefficient by `threshold`, reconstruct
    pub fn apply_threshold(&self, samples: &[Sample], threshold: f64) -> DenoiseResult<Vec<Sample>> {
        let dwt = self.transform()?;
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        let mut coeffs = dwt.decompose(samples, self.level)?;
        coeffs.map_in_place(|c| soft_threshold(c, threshold));
        Ok(dwt.reconstruct(&coeffs))
    }

    /// Denoise `buffer` with the configured rule
    ///
    /// Fails with `InsufficientLength` when the level is too deep for the
    /// signal length; empty input yields empty output.
    pub fn denoise(&self, buffer: SampleBuffer) -> DenoiseResult<SampleBuffer> {
        let dwt = self.transform()?;
        if buffer.is_empty() {
            return Ok(buffer);
        }

        let mut coeffs = dwt.decompose(buffer.samples(), self.level)?;
        let threshold = self.rule.threshold(&coeffs, buffer.len());

        debug!(
            "Wavelet shrinkage: {} level {} over {} samples, {} threshold {:.6}",
            self.wavelet,
            self.level,
            buffer.len(),
            self.rule,
            threshold
        );

        coeffs.map_in_place(|c| soft_threshold(c, threshold));
        let output = dwt.reconstruct(&coeffs);
        Ok(buffer.with_samples(output))
    }
}

impl Stage for WaveletDenoiseStage {
    fn name(&self) -> &str {
        "wavelet-denoise"
    }

    fn process(&self, buffer: SampleBuffer) -> DenoiseResult<SampleBuffer> {
        self.denoise(buffer)
    }
}

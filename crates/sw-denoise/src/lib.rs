//! Stillwater denoiser
//!
//! Three stages run in sequence over a mono signal:
//!
//! ## Band-pass
//! - Butterworth design as cascaded second-order sections
//! - Single forward pass, output length equals input length
//!
//! ## Spectral Gate
//! - Per-bin median noise floor across all STFT frames
//! - Scaled subtraction clamped at zero, original phase kept
//!
//! ## Wavelet Shrinkage
//! - Periodised multi-level DWT
//! - Robust-median or universal threshold, soft shrinkage of every band

#![warn(missing_docs)]

pub mod bandpass;
pub mod config;
pub mod pipeline;
pub mod spectral_gate;
pub mod wavelet_denoise;

pub use bandpass::BandPassStage;
pub use config::{DenoiseConfig, FilterSpec, Profile};
pub use pipeline::{DenoisingPipeline, Stage};
pub use spectral_gate::{NoiseProfile, SpectralGateStage};
pub use sw_core::{DenoiseError, DenoiseResult, Sample, SampleBuffer};
pub use sw_dsp::wavelet::WaveletFamily;
pub use wavelet_denoise::{ThresholdRule, WaveletDenoiseStage, soft_threshold};

/// Denoise a mono signal with `config`
///
/// Convenience wrapper over [`DenoisingPipeline::run`].
pub fn denoise(
    samples: Vec<Sample>,
    sample_rate: u32,
    config: &DenoiseConfig,
) -> DenoiseResult<Vec<Sample>> {
    let buffer = SampleBuffer::new(samples, sample_rate)?;
    Ok(DenoisingPipeline::new(config.clone())
        .run(buffer)?
        .into_samples())
}

//! Three-stage denoising pipeline

use std::time::Instant;

use log::{debug, info};
use rayon::prelude::*;
use sw_core::{AudioBuffer, DenoiseResult, SampleBuffer};

use crate::bandpass::BandPassStage;
use crate::config::DenoiseConfig;
use crate::spectral_gate::SpectralGateStage;
use crate::wavelet_denoise::WaveletDenoiseStage;

/// One stage of the pipeline
///
/// Stages are pure: they consume a buffer and return a new one of the same
/// length and sample rate, or an error.
pub trait Stage: Send + Sync {
    /// Stage name for logging
    fn name(&self) -> &str;

    /// Process a whole buffer
    fn process(&self, buffer: SampleBuffer) -> DenoiseResult<SampleBuffer>;
}

/// Band-pass, spectral gate, then wavelet shrinkage
pub struct DenoisingPipeline {
    config: DenoiseConfig,
    stages: Vec<Box<dyn Stage>>,
}

impl DenoisingPipeline {
    /// Build the three stages from `config`
    pub fn new(config: DenoiseConfig) -> Self {
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(BandPassStage::new(config.filter)),
            Box::new(SpectralGateStage::new(
                config.reduction_factor,
                config.frame_size,
                config.hop_size,
            )),
            Box::new(WaveletDenoiseStage::new(
                config.wavelet,
                config.level,
                config.threshold_rule,
            )),
        ];

        Self { config, stages }
    }

    /// Configuration in use
    pub fn config(&self) -> &DenoiseConfig {
        &self.config
    }

    /// Stage names in processing order
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run all stages on `buffer`
    ///
    /// The configuration is checked against the buffer before any stage runs;
    /// stage errors are returned unchanged.
    pub fn run(&self, buffer: SampleBuffer) -> DenoiseResult<SampleBuffer> {
        self.config.validate(buffer.sample_rate(), buffer.len())?;

        let start = Instant::now();
        let len = buffer.len();
        info!(
            "Denoising {} samples @ {} Hz ({:.2}s)",
            len,
            buffer.sample_rate(),
            buffer.duration_secs()
        );

        let mut buffer = buffer;
        for stage in &self.stages {
            let stage_start = Instant::now();
            buffer = stage.process(buffer)?;
            debug!("{} done in {:?}", stage.name(), stage_start.elapsed());
        }

        debug_assert_eq!(buffer.len(), len);
        info!("Denoised {} samples in {:?}", len, start.elapsed());
        Ok(buffer)
    }

    /// Run independent buffers in parallel; results keep input order
    pub fn run_batch(&self, buffers: Vec<SampleBuffer>) -> Vec<DenoiseResult<SampleBuffer>> {
        info!("Denoising batch of {} buffers", buffers.len());
        buffers.into_par_iter().map(|b| self.run(b)).collect()
    }
}

impl Default for DenoisingPipeline {
    fn default() -> Self {
        Self::new(DenoiseConfig::default())
    }
}

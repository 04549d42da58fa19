//! Sample types and the mono sample buffer

use crate::error::{DenoiseError, DenoiseResult};

/// Type alias for audio samples (always f64 for maximum precision)
pub type Sample = f64;

/// Audio buffer trait for generic buffer operations
pub trait AudioBuffer {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mono sample sequence paired with its sample rate
///
/// The sample rate is always positive. A zero-length buffer is valid and
/// passes through every stage unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<Sample>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Wrap decoded samples, rejecting a zero sample rate
    pub fn new(samples: Vec<Sample>, sample_rate: u32) -> DenoiseResult<Self> {
        if sample_rate == 0 {
            return Err(DenoiseError::InvalidSampleRate(sample_rate));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Empty buffer at the given rate
    pub fn empty(sample_rate: u32) -> DenoiseResult<Self> {
        Self::new(Vec::new(), sample_rate)
    }

    /// Mix interleaved multi-channel audio down to mono (channel mean)
    pub fn from_interleaved(
        interleaved: &[Sample],
        channels: usize,
        sample_rate: u32,
    ) -> DenoiseResult<Self> {
        if channels <= 1 {
            return Self::new(interleaved.to_vec(), sample_rate);
        }

        let scale = 1.0 / channels as Sample;
        let samples: Vec<Sample> = interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<Sample>() * scale)
            .collect();

        log::debug!(
            "Downmixed {} channels to mono ({} frames)",
            channels,
            samples.len()
        );

        Self::new(samples, sample_rate)
    }

    #[inline]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    #[inline]
    pub fn samples_mut(&mut self) -> &mut [Sample] {
        &mut self.samples
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Half the sample rate in Hz
    #[inline]
    pub fn nyquist(&self) -> f64 {
        self.sample_rate as f64 / 2.0
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Replace the samples, keeping the sample rate
    pub fn with_samples(self, samples: Vec<Sample>) -> Self {
        Self {
            samples,
            sample_rate: self.sample_rate,
        }
    }

    /// Take the samples out of the buffer
    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }
}

impl AudioBuffer for SampleBuffer {
    fn len(&self) -> usize {
        self.samples.len()
    }
}

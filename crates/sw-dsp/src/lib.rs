//! sw-dsp: Transform primitives for Stillwater
//!
//! Stateless building blocks used by the denoising stages.
//!
//! ## Modules
//! - `biquad` - TDF-II biquad sections
//! - `butterworth` - Butterworth band-pass design as cascaded second-order sections
//! - `stft` - Short-time Fourier analysis/resynthesis and the spectrogram types
//! - `wavelet` - Periodised multi-level discrete wavelet transform
//! - `stats` - Median and RMS helpers

pub mod biquad;
pub mod butterworth;
pub mod stats;
pub mod stft;
pub mod wavelet;

use sw_core::Sample;

/// Trait for all DSP processors
pub trait Processor: Send + Sync {
    /// Reset processor state
    fn reset(&mut self);
}

/// Mono processor trait
pub trait MonoProcessor: Processor {
    /// Process a single sample
    fn process_sample(&mut self, input: Sample) -> Sample;

    /// Process a block of samples
    fn process_block(&mut self, buffer: &mut [Sample]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }
}

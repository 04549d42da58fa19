//! Band-pass stage
//!
//! Removes energy outside the band of interest with a Butterworth band-pass
//! built from cascaded second-order sections, applied in a single forward pass.

use log::debug;
use sw_core::{AudioBuffer, DenoiseResult, SampleBuffer};
use sw_dsp::MonoProcessor;
use sw_dsp::butterworth::SosFilter;

use crate::config::FilterSpec;
use crate::pipeline::Stage;

/// Butterworth band-pass stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPassStage {
    spec: FilterSpec,
}

impl BandPassStage {
    /// Create the stage from a filter specification
    pub fn new(spec: FilterSpec) -> Self {
        Self { spec }
    }

    /// Filter specification in use
    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    /// Band-limit `buffer`
    ///
    /// Fails with `InvalidSpec` unless `0 < low < high < sample_rate / 2`.
    /// Output length equals input length; empty input yields empty output.
    pub fn filter(&self, buffer: SampleBuffer) -> DenoiseResult<SampleBuffer> {
        self.spec.validate(buffer.sample_rate())?;
        if buffer.is_empty() {
            return Ok(buffer);
        }

        let mut filter = SosFilter::bandpass(
            self.spec.order,
            self.spec.low_hz,
            self.spec.high_hz,
            buffer.sample_rate() as f64,
        )?;

        debug!(
            "Band-pass: order {} [{:.1}, {:.1}] Hz, {} sections over {} samples",
            self.spec.order,
            self.spec.low_hz,
            self.spec.high_hz,
            filter.num_sections(),
            buffer.len()
        );

        let mut buffer = buffer;
        filter.process_block(buffer.samples_mut());
        Ok(buffer)
    }
}

impl Stage for BandPassStage {
    fn name(&self) -> &str {
        "band-pass"
    }

    fn process(&self, buffer: SampleBuffer) -> DenoiseResult<SampleBuffer> {
        self.filter(buffer)
    }
}

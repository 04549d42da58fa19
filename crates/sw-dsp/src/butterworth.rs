//! Butterworth band-pass design as cascaded second-order sections
//!
//! Design path: analog Butterworth low-pass prototype → low-pass to band-pass
//! transformation → bilinear transform with prewarped band edges. An order-N
//! prototype yields 2N poles, grouped into N biquads whose zeros sit at
//! z = +1 and z = -1.

use std::f64::consts::PI;

use rustfft::num_complex::Complex;
use sw_core::{DenoiseError, DenoiseResult, Sample};

use crate::biquad::{BiquadCoeffs, BiquadTDF2};
use crate::{MonoProcessor, Processor};

/// Imaginary parts below this are treated as real
const REAL_EPSILON: f64 = 1e-12;

/// Design an order-`order` Butterworth band-pass as second-order sections
///
/// Each section is scaled to unit gain at the digital centre frequency, so the
/// cascade has unity gain at the centre and -3 dB at `low` and `high`.
pub fn bandpass_sections(
    order: usize,
    low: f64,
    high: f64,
    sample_rate: f64,
) -> DenoiseResult<Vec<BiquadCoeffs>> {
    let nyquist = sample_rate / 2.0;
    if order == 0 {
        return Err(DenoiseError::InvalidSpec(
            "filter order must be positive".to_string(),
        ));
    }
    if !(low > 0.0 && low < high && high < nyquist) {
        return Err(DenoiseError::InvalidSpec(format!(
            "cutoffs must satisfy 0 < low < high < {} Hz, got low={} high={}",
            nyquist, low, high
        )));
    }

    // Prewarped analog band edges (rad/s)
    let fs2 = 2.0 * sample_rate;
    let warped_low = fs2 * (PI * low / sample_rate).tan();
    let warped_high = fs2 * (PI * high / sample_rate).tan();
    let bandwidth = warped_high - warped_low;
    let center = (warped_low * warped_high).sqrt();

    let bilinear = |s: Complex<f64>| (fs2 + s) / (fs2 - s);
    let mut sections = Vec::with_capacity(order);

    for k in 0..order {
        // Prototype poles on the left half of the unit circle
        let m = 2.0 * k as f64 + 1.0 - order as f64;
        let pole = -Complex::from_polar(1.0, PI * m / (2.0 * order as f64));

        // Conjugate partners are covered by their upper-half twin
        if pole.im < -REAL_EPSILON {
            continue;
        }

        let half = pole * (bandwidth / 2.0);
        let disc = (half * half - center * center).sqrt();
        let (upper, lower) = (bilinear(half + disc), bilinear(half - disc));

        if pole.im.abs() <= REAL_EPSILON {
            // Real prototype pole (odd order): one section from the pair
            if upper.im.abs() > REAL_EPSILON {
                sections.push(conjugate_pair_section(upper));
            } else {
                sections.push(BiquadCoeffs::new(
                    1.0,
                    0.0,
                    -1.0,
                    -(upper.re + lower.re),
                    upper.re * lower.re,
                ));
            }
        } else {
            sections.push(conjugate_pair_section(upper));
            sections.push(conjugate_pair_section(lower));
        }
    }

    // Unit gain per section at the digital image of the analog centre
    let center_omega = 2.0 * (center / fs2).atan();
    let sections: Vec<BiquadCoeffs> = sections
        .into_iter()
        .map(|section| {
            let gain = section.response(center_omega).norm();
            section.scaled(1.0 / gain)
        })
        .collect();

    log::debug!(
        "Butterworth band-pass: order {} ({} sections), {}-{} Hz @ {} Hz",
        order,
        sections.len(),
        low,
        high,
        sample_rate
    );

    Ok(sections)
}

/// Section with numerator 1 - z^-2 and a conjugate pole pair at `pole`, `pole*`
fn conjugate_pair_section(pole: Complex<f64>) -> BiquadCoeffs {
    BiquadCoeffs::new(1.0, 0.0, -1.0, -2.0 * pole.re, pole.norm_sqr())
}

/// Cascade of TDF-II biquads run one after another
#[derive(Debug, Clone)]
pub struct SosFilter {
    sections: Vec<BiquadTDF2>,
}

impl SosFilter {
    pub fn new(coeffs: &[BiquadCoeffs]) -> Self {
        Self {
            sections: coeffs.iter().copied().map(BiquadTDF2::with_coeffs).collect(),
        }
    }

    /// Butterworth band-pass cascade
    pub fn bandpass(order: usize, low: f64, high: f64, sample_rate: f64) -> DenoiseResult<Self> {
        Ok(Self::new(&bandpass_sections(order, low, high, sample_rate)?))
    }

    pub fn num_sections(&self) -> usize {
        self.sections.len()
    }

    /// Magnitude response of the whole cascade at `freq` Hz
    pub fn magnitude_at(&self, freq: f64, sample_rate: f64) -> f64 {
        self.sections
            .iter()
            .map(|s| s.coeffs().magnitude_at(freq, sample_rate))
            .product()
    }
}

impl Processor for SosFilter {
    fn reset(&mut self) {
        for section in &mut self.sections {
            section.reset();
        }
    }
}

impl MonoProcessor for SosFilter {
    #[inline]
    fn process_sample(&mut self, input: Sample) -> Sample {
        self.sections
            .iter_mut()
            .fold(input, |x, section| section.process_sample(x))
    }

    fn process_block(&mut self, buffer: &mut [Sample]) {
        // Section by section, like a cascaded sosfilt
        for section in &mut self.sections {
            section.process_block(buffer);
        }
    }
}

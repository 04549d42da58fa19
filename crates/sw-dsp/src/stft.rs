//! Short-time Fourier analysis and overlap-add resynthesis
//!
//! Frames are centred: the signal is zero-padded by half a frame on both sides
//! (and at the end up to the next hop boundary), so even a signal shorter than
//! one frame yields at least one full frame. Resynthesis divides the
//! overlap-added output by the summed squared window and crops back to the
//! original length. Hops are at most half a frame, so with the Hann window the
//! summed squared window never drops below one half inside the signal.

use std::f64::consts::PI;
use std::sync::Arc;

use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;
use sw_core::{DenoiseError, DenoiseResult, Sample};

// ============ Constants ============

/// Default FFT size
pub const DEFAULT_FRAME_SIZE: usize = 2048;

/// Default hop size (overlap factor of 4)
pub const DEFAULT_HOP_SIZE: usize = 512;

/// Window-energy sums below this are left unnormalised
const WINDOW_SUM_FLOOR: f64 = 1e-10;

// ============ Spectral Frame ============

/// Single spectral frame (magnitude + phase)
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFrame {
    magnitude: Vec<f64>,
    phase: Vec<f64>,
}

impl SpectralFrame {
    /// Build from matching magnitude/phase arrays
    pub fn new(magnitude: Vec<f64>, phase: Vec<f64>) -> DenoiseResult<Self> {
        if magnitude.len() != phase.len() {
            return Err(DenoiseError::InvalidConfig(format!(
                "magnitude/phase length mismatch: {} vs {}",
                magnitude.len(),
                phase.len()
            )));
        }
        Ok(Self { magnitude, phase })
    }

    pub fn from_complex(spectrum: &[Complex<f64>]) -> Self {
        let magnitude = spectrum.iter().map(|c| c.norm()).collect();
        let phase = spectrum.iter().map(|c| wrap_phase(c.arg())).collect();
        Self { magnitude, phase }
    }

    pub fn to_complex(&self) -> Vec<Complex<f64>> {
        self.magnitude
            .iter()
            .zip(&self.phase)
            .map(|(&mag, &phase)| Complex::from_polar(mag, phase))
            .collect()
    }

    #[inline]
    pub fn magnitude(&self) -> &[f64] {
        &self.magnitude
    }

    #[inline]
    pub fn phase(&self) -> &[f64] {
        &self.phase
    }

    pub fn num_bins(&self) -> usize {
        self.magnitude.len()
    }
}

// ============ Spectrogram ============

/// Sequence of spectral frames, one per hop
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    frames: Vec<SpectralFrame>,
    num_bins: usize,
    signal_len: usize,
}

impl Spectrogram {
    /// Build from frames that all share `num_bins`
    pub fn new(frames: Vec<SpectralFrame>, num_bins: usize, signal_len: usize) -> DenoiseResult<Self> {
        if let Some(bad) = frames.iter().find(|f| f.num_bins() != num_bins) {
            return Err(DenoiseError::InvalidConfig(format!(
                "spectrogram frame has {} bins, expected {}",
                bad.num_bins(),
                num_bins
            )));
        }
        Ok(Self {
            frames,
            num_bins,
            signal_len,
        })
    }

    #[inline]
    pub fn frames(&self) -> &[SpectralFrame] {
        &self.frames
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Length of the analysed signal before padding
    pub fn signal_len(&self) -> usize {
        self.signal_len
    }

    /// Magnitudes of one bin across all frames
    pub fn bin_magnitudes(&self, bin: usize) -> Vec<f64> {
        self.frames.iter().map(|f| f.magnitude[bin]).collect()
    }

    /// Map every frame's magnitudes, keeping phase and shape
    pub fn map_magnitudes<F>(&self, mut f: F) -> Self
    where
        F: FnMut(usize, f64) -> f64,
    {
        let frames = self
            .frames
            .iter()
            .map(|frame| SpectralFrame {
                magnitude: frame
                    .magnitude
                    .iter()
                    .enumerate()
                    .map(|(bin, &mag)| f(bin, mag))
                    .collect(),
                phase: frame.phase.clone(),
            })
            .collect();

        Self {
            frames,
            num_bins: self.num_bins,
            signal_len: self.signal_len,
        }
    }
}

// ============ STFT ============

/// Short-Time Fourier Transform with a periodic Hann window
pub struct Stft {
    frame_size: usize,
    hop_size: usize,
    window: Vec<f64>,
    fft_forward: Arc<dyn RealToComplex<f64>>,
    fft_inverse: Arc<dyn ComplexToReal<f64>>,
}

impl Stft {
    /// Create an STFT; `frame_size` must be a power of two, `hop_size` in `1..=frame_size / 2`
    pub fn new(frame_size: usize, hop_size: usize) -> DenoiseResult<Self> {
        validate_geometry(frame_size, hop_size)?;

        let mut planner = RealFftPlanner::<f64>::new();

        // Hann window
        let window: Vec<f64> = (0..frame_size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / frame_size as f64).cos()))
            .collect();

        Ok(Self {
            frame_size,
            hop_size,
            window,
            fft_forward: planner.plan_fft_forward(frame_size),
            fft_inverse: planner.plan_fft_inverse(frame_size),
        })
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn num_bins(&self) -> usize {
        self.frame_size / 2 + 1
    }

    /// Padded length and frame count for a signal of `len` samples
    fn layout(&self, len: usize) -> (usize, usize) {
        let mut padded = len + self.frame_size;
        let rem = (padded - self.frame_size) % self.hop_size;
        if rem != 0 {
            padded += self.hop_size - rem;
        }
        let frames = (padded - self.frame_size) / self.hop_size + 1;
        (padded, frames)
    }

    /// Analyze: time domain -> spectrogram
    pub fn analyze(&self, signal: &[Sample]) -> DenoiseResult<Spectrogram> {
        let pad = self.frame_size / 2;
        let (padded_len, num_frames) = self.layout(signal.len());

        let mut padded = vec![0.0; padded_len];
        padded[pad..pad + signal.len()].copy_from_slice(signal);

        let mut windowed = self.fft_forward.make_input_vec();
        let mut spectrum = self.fft_forward.make_output_vec();
        let mut frames = Vec::with_capacity(num_frames);

        for frame in 0..num_frames {
            let start = frame * self.hop_size;
            for (i, (out, &win)) in windowed.iter_mut().zip(&self.window).enumerate() {
                *out = padded[start + i] * win;
            }

            self.fft_forward
                .process(&mut windowed, &mut spectrum)
                .map_err(|e| {
                    DenoiseError::InvalidConfig(format!(
                        "forward FFT failed on frame {}: {}",
                        frame, e
                    ))
                })?;
            frames.push(SpectralFrame::from_complex(&spectrum));
        }

        log::trace!(
            "STFT: {} samples -> {} frames x {} bins",
            signal.len(),
            num_frames,
            self.num_bins()
        );

        Ok(Spectrogram {
            frames,
            num_bins: self.num_bins(),
            signal_len: signal.len(),
        })
    }

    /// Synthesize: spectrogram -> time domain, cropped to the analysed length
    ///
    /// The spectrogram must have the shape `analyze` produces for its signal
    /// length with this frame/hop geometry.
    pub fn synthesize(&self, spectrogram: &Spectrogram) -> DenoiseResult<Vec<Sample>> {
        let len = spectrogram.signal_len();
        let (padded_len, num_frames) = self.layout(len);
        if spectrogram.num_bins() != self.num_bins() || spectrogram.num_frames() != num_frames {
            return Err(DenoiseError::InvalidConfig(format!(
                "spectrogram is {} frames x {} bins, expected {} x {} for {} samples",
                spectrogram.num_frames(),
                spectrogram.num_bins(),
                num_frames,
                self.num_bins(),
                len
            )));
        }

        let mut output = vec![0.0; padded_len];
        let mut window_sum = vec![0.0; padded_len];
        let mut frame_out = self.fft_inverse.make_output_vec();
        let norm = 1.0 / self.frame_size as f64;

        for (index, frame) in spectrogram.frames().iter().enumerate() {
            let mut spectrum = frame.to_complex();
            // DC and Nyquist bins of a real signal carry no imaginary part
            if let Some(first) = spectrum.first_mut() {
                first.im = 0.0;
            }
            if let Some(last) = spectrum.last_mut() {
                last.im = 0.0;
            }

            self.fft_inverse
                .process(&mut spectrum, &mut frame_out)
                .map_err(|e| {
                    DenoiseError::InvalidConfig(format!(
                        "inverse FFT failed on frame {}: {}",
                        index, e
                    ))
                })?;

            let start = index * self.hop_size;
            for (i, (&sample, &win)) in frame_out.iter().zip(&self.window).enumerate() {
                output[start + i] += sample * norm * win;
                window_sum[start + i] += win * win;
            }
        }

        for (sample, &sum) in output.iter_mut().zip(&window_sum) {
            if sum > WINDOW_SUM_FLOOR {
                *sample /= sum;
            }
        }

        let pad = self.frame_size / 2;
        Ok(output[pad..pad + len].to_vec())
    }
}

/// Map `atan2` output onto (-π, π]
#[inline]
fn wrap_phase(phase: f64) -> f64 {
    if phase <= -PI { phase + 2.0 * PI } else { phase }
}

/// Check frame/hop geometry: power-of-two frame, hop at most half a frame
pub fn validate_geometry(frame_size: usize, hop_size: usize) -> DenoiseResult<()> {
    if frame_size < 2 || !frame_size.is_power_of_two() {
        return Err(DenoiseError::InvalidConfig(format!(
            "frame size must be a power of two >= 2, got {}",
            frame_size
        )));
    }
    if hop_size == 0 || hop_size > frame_size / 2 {
        return Err(DenoiseError::InvalidConfig(format!(
            "hop size must be in 1..={}, got {}",
            frame_size / 2,
            hop_size
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn noise(len: usize, seed: u64) -> Vec<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..len).map(|_| rng.random_range(-1.0..1.0)).collect()
    }

    #[test]
    fn test_wrap_phase() {
        assert_eq!(wrap_phase(-PI), PI);
        assert_eq!(wrap_phase(PI), PI);
        assert_eq!(wrap_phase(0.5), 0.5);
    }

    #[test]
    fn test_perfect_reconstruction() {
        let stft = Stft::new(DEFAULT_FRAME_SIZE, DEFAULT_HOP_SIZE).unwrap();
        let signal = noise(5000, 7);

        let spectrogram = stft.analyze(&signal).unwrap();
        let output = stft.synthesize(&spectrogram).unwrap();

        assert_eq!(output.len(), signal.len());
        for (a, b) in signal.iter().zip(&output) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_short_signal() {
        let stft = Stft::new(DEFAULT_FRAME_SIZE, DEFAULT_HOP_SIZE).unwrap();
        let signal = noise(100, 3);

        let spectrogram = stft.analyze(&signal).unwrap();
        assert!(spectrogram.num_frames() >= 1);
        assert_eq!(spectrogram.num_bins(), 1025);

        let output = stft.synthesize(&spectrogram).unwrap();
        assert_eq!(output.len(), 100);
        for (a, b) in signal.iter().zip(&output) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_empty_signal() {
        let stft = Stft::new(256, 64).unwrap();
        let spectrogram = stft.analyze(&[]).unwrap();
        assert!(stft.synthesize(&spectrogram).unwrap().is_empty());
    }

    #[test]
    fn test_phase_range_and_magnitude() {
        let stft = Stft::new(512, 128).unwrap();
        let signal = noise(2000, 11);
        let spectrogram = stft.analyze(&signal).unwrap();

        for frame in spectrogram.frames() {
            assert!(frame.magnitude().iter().all(|&m| m >= 0.0));
            assert!(frame.phase().iter().all(|&p| p > -PI && p <= PI));
        }
    }

    #[test]
    fn test_sine_peak_bin() {
        let sr = 16000.0;
        let stft = Stft::new(1024, 256).unwrap();
        let signal: Vec<f64> = (0..8000)
            .map(|i| (2.0 * PI * 1000.0 * i as f64 / sr).sin())
            .collect();

        let spectrogram = stft.analyze(&signal).unwrap();
        let frame = &spectrogram.frames()[spectrogram.num_frames() / 2];
        let peak = frame
            .magnitude()
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(bin, _)| bin)
            .unwrap();

        // 1000 Hz at 15.625 Hz per bin
        assert_eq!(peak, 64);
    }

    #[test]
    fn test_map_magnitudes_keeps_phase() {
        let stft = Stft::new(256, 64).unwrap();
        let spectrogram = stft.analyze(&noise(1000, 5)).unwrap();
        let halved = spectrogram.map_magnitudes(|_, m| m * 0.5);

        assert_eq!(halved.num_frames(), spectrogram.num_frames());
        for (a, b) in spectrogram.frames().iter().zip(halved.frames()) {
            assert_eq!(a.phase(), b.phase());
            assert_abs_diff_eq!(a.magnitude()[3] * 0.5, b.magnitude()[3], epsilon = 1e-15);
        }
    }

    #[test]
    fn test_invalid_geometry() {
        assert!(Stft::new(1000, 250).is_err());
        assert!(Stft::new(1024, 0).is_err());
        assert!(Stft::new(1024, 2048).is_err());
        assert!(Stft::new(1024, 1024).is_err());
        assert!(Stft::new(1024, 513).is_err());
        assert!(Stft::new(1024, 512).is_ok());
        assert!(Stft::new(2, 1).is_ok());
        assert!(SpectralFrame::new(vec![1.0; 3], vec![0.0; 2]).is_err());

        let frame = SpectralFrame::new(vec![1.0; 3], vec![0.0; 3]).unwrap();
        assert!(Spectrogram::new(vec![frame.clone()], 3, 10).is_ok());
        assert!(Spectrogram::new(vec![frame], 5, 10).is_err());
    }

    #[test]
    fn test_half_frame_hop_reconstructs() {
        let stft = Stft::new(256, 128).unwrap();
        let signal = noise(3000, 9);
        let output = stft.synthesize(&stft.analyze(&signal).unwrap()).unwrap();

        for (a, b) in signal.iter().zip(&output) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_synthesize_rejects_foreign_shape() {
        let stft = Stft::new(256, 64).unwrap();

        let frame = SpectralFrame::new(vec![1.0; 10], vec![0.0; 10]).unwrap();
        let narrow = Spectrogram::new(vec![frame; 6], 10, 100).unwrap();
        assert!(matches!(
            stft.synthesize(&narrow),
            Err(DenoiseError::InvalidConfig(_))
        ));

        // Right bin count, wrong frame count for the stated length
        let other = Stft::new(256, 128).unwrap();
        let spectrogram = other.analyze(&noise(1000, 1)).unwrap();
        assert!(stft.synthesize(&spectrogram).is_err());
    }
}

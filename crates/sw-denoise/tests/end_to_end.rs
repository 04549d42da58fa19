//! End-to-end denoising of a noisy tone

use std::f64::consts::PI;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use realfft::RealFftPlanner;
use sw_denoise::{DenoiseConfig, Profile, denoise};
use sw_dsp::stats::rms;

const SAMPLE_RATE: u32 = 16000;
const TONE_HZ: f64 = 440.0;

/// One second of a 440 Hz sine plus uniform noise in [-0.05, 0.05]
fn noisy_tone(seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..SAMPLE_RATE as usize)
        .map(|i| {
            let t = i as f64 / SAMPLE_RATE as f64;
            (2.0 * PI * TONE_HZ * t).sin() + rng.random_range(-0.05..0.05)
        })
        .collect()
}

/// Magnitude spectrum; with one second of audio each bin is 1 Hz wide
fn magnitude_spectrum(signal: &[f64]) -> Vec<f64> {
    let mut planner = RealFftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(signal.len());
    let mut input = signal.to_vec();
    let mut output = fft.make_output_vec();
    fft.process(&mut input, &mut output).unwrap();
    output.iter().map(|c| c.norm()).collect()
}

fn band_energy(spectrum: &[f64], low_hz: usize, high_hz: usize) -> f64 {
    spectrum[low_hz..=high_hz].iter().map(|m| m * m).sum::<f64>().sqrt()
}

fn peak_hz(spectrum: &[f64]) -> usize {
    spectrum
        .iter()
        .enumerate()
        .skip(1)
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(bin, _)| bin)
        .unwrap()
}

#[test]
fn test_noisy_tone_default_profile() {
    let input = noisy_tone(42);
    let output = denoise(input.clone(), SAMPLE_RATE, &DenoiseConfig::default()).unwrap();

    assert_eq!(output.len(), input.len());
    assert!(output.iter().all(|x| x.is_finite()));

    let before = magnitude_spectrum(&input);
    let after = magnitude_spectrum(&output);

    let noise_before = band_energy(&before, 1000, 2000);
    let noise_after = band_energy(&after, 1000, 2000);
    assert!(
        noise_after < noise_before,
        "1-2 kHz energy {} -> {}",
        noise_before,
        noise_after
    );

    let peak = peak_hz(&after);
    assert!((435..=445).contains(&peak), "peak at {} Hz", peak);
}

#[test]
fn test_noisy_tone_every_profile_finite() {
    let input = noisy_tone(7);
    for profile in Profile::ALL {
        let output = denoise(input.clone(), SAMPLE_RATE, &profile.config()).unwrap();
        assert_eq!(output.len(), input.len());
        assert!(output.iter().all(|x| x.is_finite()), "{}", profile);
    }
}

#[test]
fn test_advanced_profile_flattens_unit_scale_tone() {
    // sqrt(2 ln N) is about 4.4 here, above every coefficient of a unit sine,
    // and the universal rule shrinks the approximation band too
    let input = noisy_tone(3);
    let output = denoise(input.clone(), SAMPLE_RATE, &Profile::Advanced.config()).unwrap();

    assert_eq!(output.len(), input.len());
    assert!(rms(&input) > 0.5);
    assert!(rms(&output) < 1e-2, "rms {}", rms(&output));
}

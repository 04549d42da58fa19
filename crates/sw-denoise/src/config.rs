//! Configuration types for the denoising pipeline

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sw_core::{DenoiseError, DenoiseResult};
use sw_dsp::stft::{self, DEFAULT_FRAME_SIZE, DEFAULT_HOP_SIZE};
use sw_dsp::wavelet::{Dwt, WaveletFamily};

use crate::wavelet_denoise::ThresholdRule;

/// Band-pass filter specification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Butterworth prototype order
    pub order: usize,
    /// Low cutoff (Hz)
    pub low_hz: f64,
    /// High cutoff (Hz)
    pub high_hz: f64,
}

impl FilterSpec {
    /// Create a filter specification
    pub fn new(order: usize, low_hz: f64, high_hz: f64) -> Self {
        Self {
            order,
            low_hz,
            high_hz,
        }
    }

    /// Check `order > 0` and `0 < low < high < sample_rate / 2`
    pub fn validate(&self, sample_rate: u32) -> DenoiseResult<()> {
        let nyquist = sample_rate as f64 / 2.0;

        if self.order == 0 {
            return Err(DenoiseError::InvalidSpec(
                "filter order must be positive".to_string(),
            ));
        }
        if !(self.low_hz > 0.0) {
            return Err(DenoiseError::InvalidSpec(format!(
                "low cutoff must be > 0 Hz, got {}",
                self.low_hz
            )));
        }
        if !(self.low_hz < self.high_hz) {
            return Err(DenoiseError::InvalidSpec(format!(
                "low cutoff {} Hz must be below high cutoff {} Hz",
                self.low_hz, self.high_hz
            )));
        }
        if !(self.high_hz < nyquist) {
            return Err(DenoiseError::InvalidSpec(format!(
                "high cutoff {} Hz must be below Nyquist ({} Hz)",
                self.high_hz, nyquist
            )));
        }
        Ok(())
    }
}

/// Named parameter sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Reference band-pass (order 4, 1-2000 Hz) with gentle shrinkage
    Basic,
    /// Speech band (80-3400 Hz), median-based threshold
    VoicePreserving,
    /// Wide band, steeper filter, stronger gate and universal threshold
    ///
    /// The universal threshold `sqrt(2 ln N)` does not scale with the signal
    /// and is applied to every band, approximation included. For audio near
    /// full scale it exceeds nearly every coefficient, so the output is close
    /// to silence. Use it on low-level recordings, or pick `median`.
    Advanced,
}

impl Profile {
    /// Every profile, in increasing strength
    pub const ALL: [Profile; 3] = [Profile::Basic, Profile::VoicePreserving, Profile::Advanced];

    /// Resolved configuration for this profile
    pub fn config(self) -> DenoiseConfig {
        match self {
            Profile::Basic => DenoiseConfig {
                filter: FilterSpec::new(4, 1.0, 2000.0),
                reduction_factor: 0.3,
                wavelet: WaveletFamily::Daubechies(4),
                level: 1,
                threshold_rule: ThresholdRule::RobustMedian,
                frame_size: DEFAULT_FRAME_SIZE,
                hop_size: DEFAULT_HOP_SIZE,
            },
            Profile::VoicePreserving => DenoiseConfig {
                filter: FilterSpec::new(4, 80.0, 3400.0),
                reduction_factor: 0.3,
                wavelet: WaveletFamily::Daubechies(4),
                level: 2,
                threshold_rule: ThresholdRule::RobustMedian,
                frame_size: DEFAULT_FRAME_SIZE,
                hop_size: DEFAULT_HOP_SIZE,
            },
            Profile::Advanced => DenoiseConfig {
                filter: FilterSpec::new(6, 50.0, 7500.0),
                reduction_factor: 0.5,
                wavelet: WaveletFamily::Daubechies(8),
                level: 4,
                threshold_rule: ThresholdRule::UniversalThreshold,
                frame_size: DEFAULT_FRAME_SIZE,
                hop_size: DEFAULT_HOP_SIZE,
            },
        }
    }

    /// Short name accepted by `FromStr`
    pub fn name(self) -> &'static str {
        match self {
            Profile::Basic => "basic",
            Profile::VoicePreserving => "voice",
            Profile::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Profile {
    type Err = DenoiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Profile::Basic),
            "voice" | "voice_preserving" | "voice-preserving" => Ok(Profile::VoicePreserving),
            "advanced" => Ok(Profile::Advanced),
            other => Err(DenoiseError::InvalidConfig(format!(
                "unknown profile '{}' (expected basic, voice or advanced)",
                other
            ))),
        }
    }
}

fn default_frame_size() -> usize {
    DEFAULT_FRAME_SIZE
}

fn default_hop_size() -> usize {
    DEFAULT_HOP_SIZE
}

/// Immutable configuration for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenoiseConfig {
    /// Band-pass stage
    pub filter: FilterSpec,
    /// Fraction of the per-bin median magnitude subtracted by the gate (>= 0)
    pub reduction_factor: f64,
    /// Wavelet family for the shrinkage stage
    pub wavelet: WaveletFamily,
    /// Wavelet decomposition level (>= 1)
    pub level: usize,
    /// Threshold selection rule
    pub threshold_rule: ThresholdRule,
    /// STFT frame size (power of two)
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,
    /// STFT hop size
    #[serde(default = "default_hop_size")]
    pub hop_size: usize,
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Profile::VoicePreserving.config()
    }
}

impl DenoiseConfig {
    /// Set the band-pass filter
    pub fn with_filter(mut self, filter: FilterSpec) -> Self {
        self.filter = filter;
        self
    }

    /// Set the gate reduction factor
    pub fn with_reduction_factor(mut self, factor: f64) -> Self {
        self.reduction_factor = factor;
        self
    }

    /// Set the wavelet family
    pub fn with_wavelet(mut self, wavelet: WaveletFamily) -> Self {
        self.wavelet = wavelet;
        self
    }

    /// Set the decomposition level
    pub fn with_level(mut self, level: usize) -> Self {
        self.level = level;
        self
    }

    /// Set the threshold rule
    pub fn with_threshold_rule(mut self, rule: ThresholdRule) -> Self {
        self.threshold_rule = rule;
        self
    }

    /// Set STFT frame and hop size
    pub fn with_frame(mut self, frame_size: usize, hop_size: usize) -> Self {
        self.frame_size = frame_size;
        self.hop_size = hop_size;
        self
    }

    /// Check every stage precondition for a signal of `len` samples at `sample_rate`
    pub fn validate(&self, sample_rate: u32, len: usize) -> DenoiseResult<()> {
        self.filter.validate(sample_rate)?;

        if !(self.reduction_factor >= 0.0) || !self.reduction_factor.is_finite() {
            return Err(DenoiseError::InvalidConfig(format!(
                "reduction factor must be a finite value >= 0, got {}",
                self.reduction_factor
            )));
        }
        stft::validate_geometry(self.frame_size, self.hop_size)?;

        let dwt = Dwt::new(self.wavelet)?;
        if len == 0 {
            // Empty input passes through; only the level itself must be sane
            if self.level == 0 {
                return Err(DenoiseError::InvalidConfig(
                    "decomposition level must be positive".to_string(),
                ));
            }
            return Ok(());
        }
        dwt.check_level(len, self.level)
    }

    /// Parse a JSON configuration
    pub fn from_json(json: &str) -> DenoiseResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| DenoiseError::InvalidConfig(format!("bad config JSON: {}", e)))
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> DenoiseResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| DenoiseError::InvalidConfig(format!("config not serializable: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = DenoiseConfig::default();
        assert_eq!(config, Profile::VoicePreserving.config());
        assert_eq!(config.frame_size, 2048);
        assert_eq!(config.hop_size, 512);
        assert!(config.validate(16000, 16000).is_ok());
    }

    #[test]
    fn test_profiles_valid_at_common_rates() {
        for profile in Profile::ALL {
            for rate in [16000, 44100, 48000] {
                assert!(
                    profile.config().validate(rate, rate as usize).is_ok(),
                    "{} @ {}",
                    profile,
                    rate
                );
            }
        }
        // 7.5 kHz upper cutoff does not fit under an 8 kHz rate
        assert!(matches!(
            Profile::Advanced.config().validate(8000, 8000),
            Err(DenoiseError::InvalidSpec(_))
        ));
    }

    #[test]
    fn test_filter_spec_validation() {
        let sr = 16000;
        assert!(FilterSpec::new(4, 100.0, 7999.0).validate(sr).is_ok());
        for spec in [
            FilterSpec::new(4, 100.0, 8000.0),
            FilterSpec::new(4, 0.0, 1000.0),
            FilterSpec::new(4, -5.0, 1000.0),
            FilterSpec::new(4, 1000.0, 1000.0),
            FilterSpec::new(4, 2000.0, 1000.0),
            FilterSpec::new(0, 100.0, 1000.0),
            FilterSpec::new(4, f64::NAN, 1000.0),
        ] {
            assert!(
                matches!(spec.validate(sr), Err(DenoiseError::InvalidSpec(_))),
                "{:?}",
                spec
            );
        }
    }

    #[test]
    fn test_validate_config_errors() {
        let config = DenoiseConfig::default().with_reduction_factor(-0.1);
        assert!(matches!(
            config.validate(16000, 1000),
            Err(DenoiseError::InvalidConfig(_))
        ));

        let config = DenoiseConfig::default().with_level(0);
        assert!(matches!(
            config.validate(16000, 0),
            Err(DenoiseError::InvalidConfig(_))
        ));

        let config = DenoiseConfig::default().with_frame(1000, 250);
        assert!(matches!(
            config.validate(16000, 1000),
            Err(DenoiseError::InvalidConfig(_))
        ));

        let config = DenoiseConfig::default().with_level(8);
        assert!(matches!(
            config.validate(16000, 100),
            Err(DenoiseError::InsufficientLength { .. })
        ));
        // Empty input skips the length check
        assert!(config.validate(16000, 0).is_ok());

        let config = DenoiseConfig::default().with_frame(2048, 2048);
        assert!(matches!(
            config.validate(16000, 16000),
            Err(DenoiseError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_absurd_levels_rejected_without_overflow() {
        for level in [62, 64, 200] {
            assert_eq!(
                DenoiseConfig::default().with_level(level).validate(16000, 16000),
                Err(DenoiseError::InsufficientLength {
                    required: usize::MAX,
                    actual: 16000
                })
            );
        }

        let config = DenoiseConfig::from_json(r#"{
            "filter": { "order": 4, "low_hz": 80.0, "high_hz": 3400.0 },
            "reduction_factor": 0.3,
            "wavelet": "db4",
            "level": 64,
            "threshold_rule": "robust_median"
        }"#)
        .unwrap();
        assert!(matches!(
            config.validate(16000, 16000),
            Err(DenoiseError::InsufficientLength { .. })
        ));
    }

    #[test]
    fn test_json_roundtrip() {
        let config = Profile::Advanced.config();
        let json = config.to_json().unwrap();
        assert!(json.contains("\"db8\""));
        assert!(json.contains("\"universal_threshold\""));
        assert_eq!(DenoiseConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_json_defaults_and_errors() {
        let json = r#"{
            "filter": { "order": 2, "low_hz": 100.0, "high_hz": 3000.0 },
            "reduction_factor": 0.4,
            "wavelet": "sym4",
            "level": 3,
            "threshold_rule": "robust_median"
        }"#;
        let config = DenoiseConfig::from_json(json).unwrap();
        assert_eq!(config.wavelet, WaveletFamily::Symlet(4));
        assert_eq!(config.frame_size, DEFAULT_FRAME_SIZE);

        let bad = json.replace("sym4", "mexh");
        assert!(matches!(
            DenoiseConfig::from_json(&bad),
            Err(DenoiseError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_profile_names() {
        for profile in Profile::ALL {
            assert_eq!(profile.name().parse::<Profile>().unwrap(), profile);
        }
        assert_eq!("voice_preserving".parse::<Profile>().unwrap(), Profile::VoicePreserving);
        assert!("loud".parse::<Profile>().is_err());
    }
}

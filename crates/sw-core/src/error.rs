//! Error types for Stillwater

use thiserror::Error;

/// Denoising error type
///
/// Every variant is a precondition violation detected at stage entry.
/// Nothing here is transient; retrying with the same input fails the same way.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DenoiseError {
    /// Filter cutoffs violate ordering or the Nyquist bound
    #[error("Invalid filter spec: {0}")]
    InvalidSpec(String),

    /// Negative reduction factor, unknown wavelet, bad level or frame geometry
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Signal too short for the requested wavelet decomposition
    #[error("Insufficient length: need at least {required} samples, got {actual}")]
    InsufficientLength { required: usize, actual: usize },

    /// Sample rate must be positive
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),
}

impl DenoiseError {
    /// Short stable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidSpec(_) => "InvalidSpec",
            Self::InvalidConfig(_) => "InvalidConfig",
            Self::InsufficientLength { .. } => "InsufficientLength",
            Self::InvalidSampleRate(_) => "InvalidSampleRate",
        }
    }
}

/// Result type alias
pub type DenoiseResult<T> = Result<T, DenoiseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = DenoiseError::InsufficientLength {
            required: 64,
            actual: 10,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient length: need at least 64 samples, got 10"
        );
        assert_eq!(err.kind(), "InsufficientLength");

        let err = DenoiseError::InvalidSpec("high >= nyquist".into());
        assert!(err.to_string().contains("high >= nyquist"));
    }
}

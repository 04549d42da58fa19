//! sw-core: Shared types for Stillwater
//!
//! This crate provides the foundational types used across all Stillwater crates:
//! the sample type, the mono [`SampleBuffer`] that flows stage to stage, and the
//! single error enum every stage reports through.

mod error;
mod sample;

pub use error::*;
pub use sample::*;

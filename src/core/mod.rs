//! Core functionality: fetching, translation, scoring and ranking

/// Orchestrates a single image analysis.
pub mod analyzer;
/// Builds location candidates from user input.
pub mod candidates;
/// In-process CLIP inference with libtorch.
#[cfg(feature = "embeddings")]
pub mod clip;
/// Downloads and decodes images by URL.
pub mod fetch;
/// Selects the best candidate and phrases the result.
pub mod ranking;
/// The scorer interface and its HTTP backend.
pub mod scorer;
/// The translator interface and its backends.
pub mod translate;

#![doc(html_root_url = "https://docs.rs/placeclip/0.1.0")]
#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

//! # placeclip
//!
//! A small web service that guesses where a photo was taken. Given an image URL
//! and a list of candidate place names, it translates the names, scores the
//! image against each with a CLIP model (StreetCLIP by default) and reports the
//! best match with its similarity.
//!
//! ## Features
//!
//! - **Ranking**: softmax over raw model scores, argmax selection and a fixed
//!   75% confidence threshold choosing the reply template
//! - **Translation**: pluggable [`Translator`] with a Google Translate backend
//! - **Scoring**: pluggable [`Scorer`] with an in-process libtorch CLIP model
//!   (`embeddings` feature) or a remote inference endpoint
//! - **Web API**: `POST /analyze/`, `POST /translate` and a small HTML form at `/`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use placeclip::{init, AppState, Config, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     init()?;
//!     let state = AppState::from_config(Config::from_env()?)?;
//!     let ranking = state
//!         .analyzer
//!         .analyze("https://example.com/street.jpg", vec!["서울".into(), "부산".into()])
//!         .await?;
//!     println!("{}", ranking.message());
//!     Ok(())
//! }
//! ```

// Internal modules
pub mod api;
pub mod core;
/// Defines the application's error types and result aliases.
pub mod error;
pub mod models;
mod state;

/// Build-time metadata generated by `build.rs`.
#[allow(missing_docs, unreachable_pub, dead_code)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

// Public API exports
pub use crate::{
    core::{
        analyzer::Analyzer,
        candidates::LocationCandidate,
        fetch::ImageFetcher,
        ranking::{Ranking, CONFIDENCE_THRESHOLD},
        scorer::{RemoteScorer, Scorer},
        translate::{GoogleTranslator, PassthroughTranslator, Translator},
    },
    error::{AppError, Result, ResultExt},
    models::request::{AnalyzeRequest, Locations},
    state::{AppState, Config, ScorerKind, TranslatorKind},
};

#[cfg(feature = "web")]
pub use crate::api::{create_router, health_check};

#[cfg(feature = "embeddings")]
pub use crate::core::clip::{self, ClipScorer};

/// Initialize logging
///
/// Sets up `env_logger` with an `info` default filter. Call it once, early in
/// startup; `RUST_LOG` overrides the filter.
///
/// # Errors
///
/// Returns an error if a global logger is already installed.
///
/// # Example
///
/// ```no_run
/// use placeclip::init;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     init()?;
///     // Application code here
///     Ok(())
/// }
/// ```
pub fn init() -> Result<()> {
    let env = env_logger::Env::default()
        .default_filter_or("info")
        .default_write_style_or("auto");

    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .format_module_path(false)
        .format_target(false)
        .try_init()
        .map_err(|e| AppError::Config(format!("logger already initialized: {}", e)))?;

    log::info!("Initializing placeclip {}", built_info::PKG_VERSION);
    Ok(())
}

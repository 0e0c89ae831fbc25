use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::core::{
    analyzer::Analyzer,
    fetch::ImageFetcher,
    scorer::{RemoteScorer, Scorer},
    translate::{GoogleTranslator, PassthroughTranslator, Translator, GOOGLE_TRANSLATE_URL},
};
use crate::error::{AppError, Result, ResultExt};

const ENV_PREFIX: &str = "PLACECLIP_";

/// Which scorer backend to construct
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScorerKind {
    /// In-process CLIP model
    Clip,
    /// HTTP inference server
    Remote,
}

impl FromStr for ScorerKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clip" => Ok(Self::Clip),
            "remote" => Ok(Self::Remote),
            other => Err(AppError::Config(format!("unknown scorer {:?}", other))),
        }
    }
}

/// Which translator backend to construct
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TranslatorKind {
    /// Google Translate web API
    Google,
    /// No translation
    None,
}

impl FromStr for TranslatorKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "none" | "off" => Ok(Self::None),
            other => Err(AppError::Config(format!("unknown translator {:?}", other))),
        }
    }
}

/// Configuration for the application
#[derive(Clone, Debug)]
pub struct Config {
    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,
    /// Scorer backend
    pub scorer: ScorerKind,
    /// Directory holding `model.pt` and `tokenizer.json`
    pub model_dir: PathBuf,
    /// Square input resolution of the CLIP vision tower
    pub image_size: u32,
    /// Endpoint of the remote scorer
    pub scorer_url: Option<String>,
    /// Translator backend
    pub translator: TranslatorKind,
    /// Endpoint of the Google translator
    pub translate_url: String,
    /// Language the location names arrive in
    pub source_lang: String,
    /// Language the scorer understands
    pub target_lang: String,
    /// Largest image body accepted, in bytes
    pub max_image_bytes: u64,
    /// Timeout applied to every outbound HTTP request
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            scorer: ScorerKind::Clip,
            model_dir: PathBuf::from("models/StreetCLIP"),
            image_size: 336,
            scorer_url: None,
            translator: TranslatorKind::Google,
            translate_url: GOOGLE_TRANSLATE_URL.to_string(),
            source_lang: String::from("ko"),
            target_lang: String::from("en"),
            max_image_bytes: 20 * 1024 * 1024, // 20MB
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Load configuration from `PLACECLIP_*` environment variables, reading
    /// a `.env` file first if one exists.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Keys are the
    /// variable names without the `PLACECLIP_` prefix.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();

        if let Some(v) = get("BIND_ADDR") {
            config.bind_addr = v
                .parse()
                .map_err(|e| AppError::Config(format!("PLACECLIP_BIND_ADDR {:?}: {}", v, e)))?;
        }
        if let Some(v) = get("SCORER") {
            config.scorer = v.parse()?;
        }
        if let Some(v) = get("MODEL_DIR") {
            config.model_dir = PathBuf::from(v);
        }
        if let Some(v) = get("IMAGE_SIZE") {
            config.image_size = parse_number("IMAGE_SIZE", &v)?;
        }
        config.scorer_url = get("SCORER_URL");
        if let Some(v) = get("TRANSLATOR") {
            config.translator = v.parse()?;
        }
        if let Some(v) = get("TRANSLATE_URL") {
            config.translate_url = v;
        }
        if let Some(v) = get("SOURCE_LANG") {
            config.source_lang = v;
        }
        if let Some(v) = get("TARGET_LANG") {
            config.target_lang = v;
        }
        if let Some(v) = get("MAX_IMAGE_BYTES") {
            config.max_image_bytes = parse_number("MAX_IMAGE_BYTES", &v)?;
        }
        if let Some(v) = get("HTTP_TIMEOUT_SECS") {
            config.http_timeout = Duration::from_secs(parse_number("HTTP_TIMEOUT_SECS", &v)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.scorer == ScorerKind::Remote && self.scorer_url.is_none() {
            return Err(AppError::Config(
                "PLACECLIP_SCORER_URL is required when PLACECLIP_SCORER=remote".to_string(),
            ));
        }
        if self.image_size == 0 {
            return Err(AppError::Config("image size must be positive".to_string()));
        }
        if self.max_image_bytes == 0 {
            return Err(AppError::Config("max image bytes must be positive".to_string()));
        }
        Ok(())
    }
}

fn parse_number<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| AppError::Config(format!("{}{} {:?}: {}", ENV_PREFIX, name, value, e)))
}

/// Application state that can be shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Application configuration
    pub config: Config,
    /// Analysis pipeline with its injected collaborators
    pub analyzer: Analyzer,
}

impl AppState {
    /// Construct the collaborators named in `config` and wrap them in state.
    ///
    /// Loads the model, so this is called once at startup.
    pub fn from_config(config: Config) -> Result<Arc<Self>> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(concat!("placeclip/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;

        let translator: Arc<dyn Translator> = match config.translator {
            TranslatorKind::Google => {
                Arc::new(GoogleTranslator::new(client.clone(), &config.translate_url))
            }
            TranslatorKind::None => Arc::new(PassthroughTranslator),
        };

        let scorer: Arc<dyn Scorer> = match config.scorer {
            ScorerKind::Remote => {
                let url = config.scorer_url.clone().ok_or_else(|| {
                    AppError::Config("remote scorer needs a URL".to_string())
                })?;
                Arc::new(RemoteScorer::new(client.clone(), url))
            }
            #[cfg(feature = "embeddings")]
            ScorerKind::Clip => Arc::new(crate::core::clip::ClipScorer::load(
                &config.model_dir,
                config.image_size,
            )?),
            #[cfg(not(feature = "embeddings"))]
            ScorerKind::Clip => {
                return Err(AppError::Config(
                    "built without the `embeddings` feature; use PLACECLIP_SCORER=remote"
                        .to_string(),
                ))
            }
        };

        let fetcher = ImageFetcher::new(client, config.max_image_bytes);
        Ok(Self::with_components(config, fetcher, translator, scorer))
    }

    /// Create state from already-built collaborators
    pub fn with_components(
        config: Config,
        fetcher: ImageFetcher,
        translator: Arc<dyn Translator>,
        scorer: Arc<dyn Scorer>,
    ) -> Arc<Self> {
        log::info!(
            "Using translator {} ({} -> {}) and scorer {}",
            translator.name(),
            config.source_lang,
            config.target_lang,
            scorer.name()
        );

        let analyzer = Analyzer::new(
            fetcher,
            translator,
            scorer,
            config.source_lang.clone(),
            config.target_lang.clone(),
        );

        Arc::new(Self { config, analyzer })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr.port(), 8000);
        assert_eq!(config.scorer, ScorerKind::Clip);
        assert_eq!(config.translator, TranslatorKind::Google);
        assert_eq!(config.source_lang, "ko");
        assert_eq!(config.target_lang, "en");
        assert_eq!(config.image_size, 336);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PLACECLIP_BIND_ADDR", "127.0.0.1:9000"),
            ("PLACECLIP_SCORER", "Remote"),
            ("PLACECLIP_SCORER_URL", "http://inference:8080/score"),
            ("PLACECLIP_TRANSLATOR", "none"),
            ("PLACECLIP_MAX_IMAGE_BYTES", "1024"),
            ("PLACECLIP_HTTP_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.scorer, ScorerKind::Remote);
        assert_eq!(config.scorer_url.as_deref(), Some("http://inference:8080/score"));
        assert_eq!(config.translator, TranslatorKind::None);
        assert_eq!(config.max_image_bytes, 1024);
        assert_eq!(config.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_remote_scorer_requires_url() {
        let err = Config::from_lookup(lookup(&[("PLACECLIP_SCORER", "remote")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Config::from_lookup(lookup(&[("PLACECLIP_SCORER", "bert")])).is_err());
        assert!(Config::from_lookup(lookup(&[("PLACECLIP_IMAGE_SIZE", "big")])).is_err());
        assert!(Config::from_lookup(lookup(&[("PLACECLIP_BIND_ADDR", "localhost")])).is_err());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var("PLACECLIP_TARGET_LANG", "ja");
        let config = Config::from_env();
        std::env::remove_var("PLACECLIP_TARGET_LANG");

        assert_eq!(config.unwrap().target_lang, "ja");
    }

    #[test]
    fn test_state_with_remote_scorer() {
        let config = Config {
            scorer: ScorerKind::Remote,
            scorer_url: Some("http://127.0.0.1:1/score".to_string()),
            translator: TranslatorKind::None,
            ..Config::default()
        };

        let state = AppState::from_config(config).unwrap();
        assert_eq!(state.analyzer.scorer_name(), "remote");
        assert_eq!(state.analyzer.translator_name(), "none");
    }
}

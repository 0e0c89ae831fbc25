use std::sync::Arc;

use uuid::Uuid;

use crate::core::{
    candidates::build_candidates,
    fetch::ImageFetcher,
    ranking::{best_match, Ranking},
    scorer::Scorer,
    translate::Translator,
};
use crate::error::{AppError, Result};

/// Runs one analysis: fetch the image, translate the names, score and rank.
#[derive(Clone)]
pub struct Analyzer {
    fetcher: ImageFetcher,
    translator: Arc<dyn Translator>,
    scorer: Arc<dyn Scorer>,
    source_lang: String,
    target_lang: String,
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("translator", &self.translator.name())
            .field("scorer", &self.scorer.name())
            .field("source_lang", &self.source_lang)
            .field("target_lang", &self.target_lang)
            .finish()
    }
}

impl Analyzer {
    /// Creates an analyzer from its collaborators.
    pub fn new(
        fetcher: ImageFetcher,
        translator: Arc<dyn Translator>,
        scorer: Arc<dyn Scorer>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            translator,
            scorer,
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
        }
    }

    /// Name of the translation backend
    pub fn translator_name(&self) -> &str {
        self.translator.name()
    }

    /// Name of the scoring backend
    pub fn scorer_name(&self) -> &str {
        self.scorer.name()
    }

    /// Translate arbitrary text with the configured translator.
    pub async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::InvalidInput("text must not be empty".to_string()));
        }
        if target_lang.trim().is_empty() {
            return Err(AppError::InvalidInput("lang must not be empty".to_string()));
        }

        log::info!(
            "translating {} char(s) {} -> {} with {}",
            text.chars().count(),
            source_lang,
            target_lang,
            self.translator.name()
        );
        self.translator.translate(text, source_lang, target_lang).await
    }

    /// Analyze the image at `image_url` against already-cleaned location names.
    ///
    /// The image is fetched first, so an unusable URL is reported even when
    /// `locations` is empty.
    pub async fn analyze(&self, image_url: &str, locations: Vec<String>) -> Result<Ranking> {
        let request_id = Uuid::new_v4();
        log::info!(
            "[{}] analyzing {} with {} location(s)",
            request_id,
            image_url,
            locations.len()
        );

        let image = self.fetcher.fetch(image_url).await?;
        let candidates = build_candidates(
            self.translator.as_ref(),
            locations,
            &self.source_lang,
            &self.target_lang,
        )
        .await?;

        let ranking = best_match(self.scorer.as_ref(), &image, &candidates).await?;
        log::info!(
            "[{}] best match {} at {:.2}% (confident: {})",
            request_id,
            ranking.location,
            ranking.percentage,
            ranking.is_confident()
        );

        Ok(ranking)
    }
}

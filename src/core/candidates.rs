use futures_util::future::try_join_all;
use serde::Serialize;

use crate::core::translate::Translator;
use crate::error::{AppError, Result};

/// A location name paired with the form the scorer sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationCandidate {
    /// Name as the user typed it
    pub original: String,
    /// Name in the scorer's language
    pub translated: String,
}

impl LocationCandidate {
    /// Creates a candidate from its original and translated names.
    pub fn new(original: impl Into<String>, translated: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            translated: translated.into(),
        }
    }
}

/// Split a comma-delimited list, trimming entries and dropping blanks.
pub fn split_locations(raw: &str) -> Vec<String> {
    clean_locations(raw.split(','))
}

/// Trim entries and drop the blank ones, keeping order.
pub fn clean_locations<I, S>(entries: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Translate every name, preserving input order.
///
/// Fails with [`AppError::NoCandidates`] before any translation when `names` is empty.
pub async fn build_candidates(
    translator: &dyn Translator,
    names: Vec<String>,
    source_lang: &str,
    target_lang: &str,
) -> Result<Vec<LocationCandidate>> {
    if names.is_empty() {
        return Err(AppError::NoCandidates);
    }

    let translations = try_join_all(
        names
            .iter()
            .map(|name| translator.translate(name, source_lang, target_lang)),
    )
    .await?;

    Ok(names
        .into_iter()
        .zip(translations)
        .map(|(original, translated)| LocationCandidate::new(original, translated))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    struct DictTranslator(HashMap<&'static str, &'static str>);

    #[async_trait]
    impl Translator for DictTranslator {
        fn name(&self) -> &str {
            "dict"
        }

        async fn translate(&self, text: &str, _source: &str, _target: &str) -> Result<String> {
            // Longer names finish first so ordering is actually exercised
            tokio::time::sleep(Duration::from_millis(10 / (text.chars().count() as u64).max(1)))
                .await;
            self.0
                .get(text)
                .map(|s| s.to_string())
                .ok_or_else(|| AppError::Translation(format!("unknown word {}", text)))
        }
    }

    fn dict() -> DictTranslator {
        DictTranslator(HashMap::from([
            ("서울", "Seoul"),
            ("부산", "Busan"),
            ("제주도", "Jeju Island"),
        ]))
    }

    #[test]
    fn test_split_locations_trims_and_filters() {
        assert_eq!(
            split_locations(" 서울, 부산 ,,  ,제주도 "),
            vec!["서울", "부산", "제주도"]
        );
        assert!(split_locations("").is_empty());
        assert!(split_locations(" , ,").is_empty());
    }

    #[test]
    fn test_clean_locations_from_list() {
        let list = vec!["  대구".to_string(), String::new(), "광주 ".to_string()];
        assert_eq!(clean_locations(&list), vec!["대구", "광주"]);
    }

    #[tokio::test]
    async fn test_build_candidates_preserves_order() {
        let names = split_locations("서울,제주도,부산");
        let cands = build_candidates(&dict(), names, "ko", "en").await.unwrap();

        assert_eq!(
            cands,
            vec![
                LocationCandidate::new("서울", "Seoul"),
                LocationCandidate::new("제주도", "Jeju Island"),
                LocationCandidate::new("부산", "Busan"),
            ]
        );
    }

    #[tokio::test]
    async fn test_build_candidates_empty_is_no_candidates() {
        let err = build_candidates(&dict(), Vec::new(), "ko", "en")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoCandidates));
    }

    #[tokio::test]
    async fn test_build_candidates_propagates_translation_failure() {
        let names = split_locations("서울,평양");
        let err = build_candidates(&dict(), names, "ko", "en")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Translation(_)));
    }
}

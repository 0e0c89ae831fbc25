//! Translation collaborators used to put location names in the scorer's language.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{AppError, Result};

/// Default endpoint of the public Google Translate web API.
pub const GOOGLE_TRANSLATE_URL: &str = "https://translate.googleapis.com/translate_a/single";

/// Maps text from one language to another.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Translate `text` from `source_lang` to `target_lang` (ISO 639-1 codes).
    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String>;
}

/// Returns its input untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughTranslator;

#[async_trait]
impl Translator for PassthroughTranslator {
    fn name(&self) -> &str {
        "none"
    }

    async fn translate(&self, text: &str, _source_lang: &str, _target_lang: &str) -> Result<String> {
        Ok(text.to_string())
    }
}

/// Client for the `translate_a/single` endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    client: reqwest::Client,
    endpoint: String,
}

impl GoogleTranslator {
    /// Creates a translator that sends requests to `endpoint`.
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    fn name(&self) -> &str {
        "google"
    }

    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String> {
        if source_lang == target_lang {
            return Ok(text.to_string());
        }

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", source_lang),
                ("tl", target_lang),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| AppError::Translation(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Translation(format!(
                "translation endpoint returned {}",
                status
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::Translation(format!("invalid response body: {}", e)))?;

        let translated = parse_translation(&body)?;
        log::debug!("Translated {:?} -> {:?}", text, translated);
        Ok(translated)
    }
}

/// Join the translated segments of a `translate_a/single` response.
///
/// The response is a nested array whose first element lists segments as
/// `[translated, original, ...]`.
pub fn parse_translation(body: &Value) -> Result<String> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::Translation("response has no segment list".to_string()))?;

    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();

    let translated = translated.trim();
    if translated.is_empty() {
        return Err(AppError::Translation("empty translation".to_string()));
    }
    Ok(translated.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_single_segment() {
        let body = json!([[["Seoul", "서울", null, null, 10]], null, "ko"]);
        assert_eq!(parse_translation(&body).unwrap(), "Seoul");
    }

    #[test]
    fn test_parse_joins_segments() {
        let body = json!([
            [["Haeundae Beach, ", "해운대 해수욕장, ", null], ["Busan", "부산", null]],
            null,
            "ko"
        ]);
        assert_eq!(parse_translation(&body).unwrap(), "Haeundae Beach, Busan");
    }

    #[test]
    fn test_parse_rejects_unexpected_shapes() {
        assert!(parse_translation(&json!({"text": "Seoul"})).is_err());
        assert!(parse_translation(&json!([[]])).is_err());
        assert!(parse_translation(&json!([[["  ", "서울"]]])).is_err());
    }

    #[tokio::test]
    async fn test_passthrough() {
        let out = PassthroughTranslator
            .translate("Gyeongbokgung", "ko", "en")
            .await
            .unwrap();
        assert_eq!(out, "Gyeongbokgung");
    }

    #[tokio::test]
    async fn test_same_language_skips_request() {
        // Unroutable endpoint: any request would fail
        let translator = GoogleTranslator::new(reqwest::Client::new(), "http://127.0.0.1:1/");
        let out = translator.translate("Seoul", "en", "en").await.unwrap();
        assert_eq!(out, "Seoul");
    }
}

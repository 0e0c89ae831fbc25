//! Vision-language scorers: given an image and labels, one raw score per label.

use std::io::Cursor;

use async_trait::async_trait;
use base64::Engine;
use image::{DynamicImage, ImageOutputFormat};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Scores an image against candidate text labels.
///
/// Implementations return raw, unnormalized scores (logits) aligned by index
/// with `labels`.
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Score `image` against each label.
    async fn score(&self, image: &DynamicImage, labels: &[String]) -> Result<Vec<f32>>;
}

#[derive(Serialize)]
struct ScoreRequest<'a> {
    image: String,
    labels: &'a [String],
}

#[derive(Deserialize)]
struct ScoreResponse {
    scores: Vec<f32>,
}

/// Scorer backed by an HTTP inference server.
///
/// Sends `{"image": <base64 PNG>, "labels": [...]}` and expects
/// `{"scores": [...]}` in return.
#[derive(Debug, Clone)]
pub struct RemoteScorer {
    client: reqwest::Client,
    endpoint: String,
}

impl RemoteScorer {
    /// Creates a scorer that posts to `endpoint`.
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Scorer for RemoteScorer {
    fn name(&self) -> &str {
        "remote"
    }

    async fn score(&self, image: &DynamicImage, labels: &[String]) -> Result<Vec<f32>> {
        let image = image.clone();
        let encoded = tokio::task::spawn_blocking(move || encode_png_base64(&image)).await??;

        let response = self
            .client
            .post(&self.endpoint)
            .json(&ScoreRequest {
                image: encoded,
                labels,
            })
            .send()
            .await
            .map_err(|e| AppError::Scoring(format!("inference request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Scoring(format!(
                "inference server returned {}",
                status
            )));
        }

        let body: ScoreResponse = response
            .json()
            .await
            .map_err(|e| AppError::Scoring(format!("invalid inference response: {}", e)))?;

        Ok(body.scores)
    }
}

/// PNG-encode an image and base64 it for a JSON payload.
pub fn encode_png_base64(image: &DynamicImage) -> Result<String> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageOutputFormat::Png)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(buf.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_png_base64_decodes_back() {
        let image = DynamicImage::new_rgb8(3, 2);
        let encoded = encode_png_base64(&image).unwrap();

        let raw = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        let decoded = image::load_from_memory(&raw).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
    }

    #[tokio::test]
    async fn test_remote_scorer_unreachable() {
        let scorer = RemoteScorer::new(reqwest::Client::new(), "http://127.0.0.1:1/score");
        let err = scorer
            .score(&DynamicImage::new_rgb8(1, 1), &["Seoul".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Scoring(_)));
    }
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::core::ranking::Ranking;

/// Successful analysis result
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnalyzeResponse {
    /// Human-readable verdict naming the best location
    pub message: String,
    /// Original name of the best location
    pub location: String,
    /// Similarity of the best location, in percent
    pub similarity: f64,
}

impl From<&Ranking> for AnalyzeResponse {
    fn from(ranking: &Ranking) -> Self {
        Self {
            message: ranking.message(),
            location: ranking.location.clone(),
            similarity: ranking.percentage,
        }
    }
}

impl IntoResponse for AnalyzeResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Translation result
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslateResponse {
    /// Translated text
    pub text: String,
}

impl IntoResponse for TranslateResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Health check payload
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HealthResponse {
    /// Always "ok" when the server answers
    pub status: String,
    /// Crate version the server was built from
    pub version: String,
    /// Translator backend in use
    pub translator: String,
    /// Scorer backend in use
    pub scorer: String,
}

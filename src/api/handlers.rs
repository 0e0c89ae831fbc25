use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use std::sync::Arc;

use crate::{
    error::{AppError, Result},
    models::request::{AnalyzeForm, AnalyzeRequest, Locations, TranslateRequest},
    AppState,
};

use super::responses::{AnalyzeResponse, HealthResponse, TranslateResponse};

const INDEX_HTML: &str = include_str!("index.html");

/// Accepts a JSON body, a urlencoded form, or a multipart form.
#[derive(Debug)]
pub struct AnalyzeInput(pub AnalyzeRequest);

#[async_trait]
impl<S> FromRequest<S> for AnalyzeInput
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if content_type.starts_with("application/json") {
            let Json(body) = Json::<AnalyzeRequest>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self(body))
        } else if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            read_multipart(multipart)
                .await
                .map(Self)
                .map_err(IntoResponse::into_response)
        } else {
            let Form(form) = Form::<AnalyzeForm>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self(form.into()))
        }
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<AnalyzeRequest> {
    let mut image_url = None;
    let mut locations = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name != "image_url" && name != "locations" {
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::InvalidInput(format!("unreadable field {}: {}", name, e)))?;
        if name == "image_url" {
            image_url = Some(value);
        } else {
            locations = Some(value);
        }
    }

    let image_url = image_url
        .ok_or_else(|| AppError::InvalidInput("missing field image_url".to_string()))?;
    let locations = locations
        .ok_or_else(|| AppError::InvalidInput("missing field locations".to_string()))?;

    Ok(AnalyzeRequest {
        image_url,
        locations: Locations::Delimited(locations),
    })
}

/// Rank the candidate locations against the image
pub async fn analyze_location(
    State(state): State<Arc<AppState>>,
    AnalyzeInput(request): AnalyzeInput,
) -> Result<AnalyzeResponse> {
    let names = request.locations.into_names();
    let ranking = state.analyzer.analyze(&request.image_url, names).await?;

    Ok(AnalyzeResponse::from(&ranking))
}

/// Translate free text with the configured translator
pub async fn translate_text(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TranslateRequest>,
) -> Result<TranslateResponse> {
    let source = request
        .source
        .as_deref()
        .unwrap_or(&state.config.source_lang);
    let text = state
        .analyzer
        .translate(&request.text, source, &request.lang)
        .await?;

    Ok(TranslateResponse { text })
}

/// The HTML form for manual use
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::built_info::PKG_VERSION.to_string(),
        translator: state.analyzer.translator_name().to_string(),
        scorer: state.analyzer.scorer_name().to_string(),
    })
}

use serde::{Deserialize, Serialize};

use crate::core::candidates::{clean_locations, split_locations};

/// Location names as sent by the client.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum Locations {
    /// A single comma-delimited string, as submitted by the HTML form.
    Delimited(String),
    /// One entry per location.
    List(Vec<String>),
}

impl Locations {
    /// Trimmed, non-blank location names in input order.
    pub fn into_names(self) -> Vec<String> {
        match self {
            Self::Delimited(raw) => split_locations(&raw),
            Self::List(entries) => clean_locations(entries),
        }
    }
}

/// Body of an analysis request.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnalyzeRequest {
    /// URL of the image to analyze
    pub image_url: String,
    /// Candidate place names
    pub locations: Locations,
}

/// Form-encoded variant of [`AnalyzeRequest`].
#[derive(Debug, Deserialize, Clone)]
pub struct AnalyzeForm {
    /// URL of the image to analyze
    pub image_url: String,
    /// Comma-delimited place names
    pub locations: String,
}

impl From<AnalyzeForm> for AnalyzeRequest {
    fn from(form: AnalyzeForm) -> Self {
        Self {
            image_url: form.image_url,
            locations: Locations::Delimited(form.locations),
        }
    }
}

/// Body of a translation request.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslateRequest {
    /// Text to translate
    pub text: String,
    /// Target language code
    pub lang: String,
    /// Source language code; the configured source language when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

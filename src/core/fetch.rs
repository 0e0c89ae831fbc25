use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use image::DynamicImage;
use reqwest::Url;

use crate::error::{AppError, Result};

/// Downloads and decodes images referenced by URL.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: reqwest::Client,
    max_bytes: u64,
}

impl ImageFetcher {
    /// Creates a fetcher that refuses bodies larger than `max_bytes`.
    pub fn new(client: reqwest::Client, max_bytes: u64) -> Self {
        Self { client, max_bytes }
    }

    /// Fetch and decode the image at `url`.
    ///
    /// Every failure, from a malformed URL to undecodable bytes, is reported as
    /// [`AppError::InvalidImage`].
    pub async fn fetch(&self, url: &str) -> Result<DynamicImage> {
        let bytes = self.download(url).await?;
        let image = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await?
            .map_err(|e| AppError::InvalidImage(format!("decode failed: {}", e)))?;

        log::debug!("Fetched {}x{} image from {}", image.width(), image.height(), url);
        Ok(image)
    }

    async fn download(&self, url: &str) -> Result<Bytes> {
        let url = Url::parse(url.trim())
            .map_err(|e| AppError::InvalidImage(format!("bad URL {:?}: {}", url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::InvalidImage(format!(
                "unsupported scheme {}",
                url.scheme()
            )));
        }

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| AppError::InvalidImage(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::InvalidImage(format!("{} returned {}", url, status)));
        }

        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(AppError::InvalidImage(format!(
                    "image is {} bytes, limit is {}",
                    len, self.max_bytes
                )));
            }
        }

        let mut body = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| AppError::InvalidImage(format!("read failed: {}", e)))?;
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(AppError::InvalidImage(format!(
                    "image exceeds {} bytes",
                    self.max_bytes
                )));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body.freeze())
    }
}

pub mod image_client;

use async_trait::async_trait;

use crate::{
    config::GeminiConfig,
    error::{GenerationError, Result},
    models::{ApiErrorEnvelope, GenerateContentRequest, GenerateContentResponse},
};

pub use image_client::{strip_data_uri_prefix, WallpaperClient, WallpaperGenerator};

/// One `generateContent` round trip. The seam between the request client and the network.
#[async_trait]
pub trait ContentTransport: Send + Sync {
    async fn generate_content(
        &self,
        api_key: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse>;
}

#[derive(Clone)]
pub struct GeminiTransport {
    http: reqwest::Client,
    endpoint: String,
}

impl GeminiTransport {
    pub fn new(config: &GeminiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.endpoint(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Turns a non-2xx body into an `ApiError`, preferring Google's error envelope.
fn api_error_from_body(status: reqwest::StatusCode, body: &str) -> GenerationError {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => GenerationError::ApiError {
            status: envelope
                .error
                .status
                .unwrap_or_else(|| status.as_u16().to_string()),
            message: envelope.error.message,
        },
        Err(_) => GenerationError::ApiError {
            status: status.as_u16().to_string(),
            message: if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("unknown").to_string()
            } else {
                body.trim().to_string()
            },
        },
    }
}

#[async_trait]
impl ContentTransport for GeminiTransport {
    async fn generate_content(
        &self,
        api_key: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        log::debug!("POST {}", self.endpoint);

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| GenerationError::RequestError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::ResponseError(e.to_string()))?;

        if !status.is_success() {
            let err = api_error_from_body(status, &body);
            log::error!("Gemini returned {}: {}", status, err);
            return Err(err);
        }

        serde_json::from_str(&body).map_err(|e| GenerationError::ResponseError(e.to_string()))
    }
}

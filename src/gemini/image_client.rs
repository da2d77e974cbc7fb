use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::{ContentTransport, GeminiTransport};
use crate::{
    app::key_gate::{ApiKeyStore, KeyManager},
    config::GeminiConfig,
    error::{GenerationError, Result},
    models::{Content, GenerateContentRequest, GenerationConfig, Part},
};

const DATA_URI_PREFIXES: [&str; 3] = [
    "data:image/png;base64,",
    "data:image/jpeg;base64,",
    "data:image/webp;base64,",
];

/// Drops a leading `data:image/{png|jpeg|webp};base64,` so only the payload goes on the wire.
pub fn strip_data_uri_prefix(data: &str) -> &str {
    DATA_URI_PREFIXES
        .iter()
        .find_map(|prefix| data.strip_prefix(prefix))
        .unwrap_or(data)
}

/// Produces one wallpaper as a PNG data URI.
#[async_trait]
pub trait WallpaperGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        config: GenerationConfig,
        reference_image: Option<&str>,
    ) -> Result<String>;

    /// Called once before the requests of a batch are started.
    fn begin_batch(&self) {}
}

#[derive(Clone)]
pub struct WallpaperClient {
    transport: Arc<dyn ContentTransport>,
    keys: ApiKeyStore,
    key_manager: Arc<dyn KeyManager>,
    // Key the selector was last opened for. Concurrent requests that fail with
    // the same key share one selector; `begin_batch` clears it.
    reselected_for: Arc<Mutex<Option<String>>>,
}

impl WallpaperClient {
    pub fn new(config: &GeminiConfig, keys: ApiKeyStore, key_manager: Arc<dyn KeyManager>) -> Self {
        Self::with_transport(Arc::new(GeminiTransport::new(config)), keys, key_manager)
    }

    pub fn with_transport(
        transport: Arc<dyn ContentTransport>,
        keys: ApiKeyStore,
        key_manager: Arc<dyn KeyManager>,
    ) -> Self {
        Self {
            transport,
            keys,
            key_manager,
            reselected_for: Arc::new(Mutex::new(None)),
        }
    }

    pub fn build_request(
        prompt: &str,
        config: GenerationConfig,
        reference_image: Option<&str>,
    ) -> GenerateContentRequest {
        let mut parts = Vec::with_capacity(2);
        if let Some(reference) = reference_image {
            parts.push(Part::inline_png(strip_data_uri_prefix(reference)));
        }
        parts.push(Part::text(prompt));

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: config.into(),
        }
    }

    async fn request_image(
        &self,
        api_key: &str,
        prompt: &str,
        config: GenerationConfig,
        reference_image: Option<&str>,
    ) -> Result<String> {
        let request = Self::build_request(prompt, config, reference_image);
        let response = self.transport.generate_content(api_key, &request).await?;

        let data = response
            .first_inline_image()
            .ok_or(GenerationError::NoImageData)?;
        Ok(format!("data:image/png;base64,{}", data))
    }

    /// True for the first caller that failed with `api_key` since the last batch began.
    fn claim_reselect(&self, api_key: &str) -> bool {
        let mut last = self
            .reselected_for
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if last.as_deref() == Some(api_key) {
            return false;
        }
        *last = Some(api_key.to_string());
        true
    }
}

#[async_trait]
impl WallpaperGenerator for WallpaperClient {
    async fn generate(
        &self,
        prompt: &str,
        config: GenerationConfig,
        reference_image: Option<&str>,
    ) -> Result<String> {
        log::debug!(
            "Requesting wallpaper ({} @ {}, remix: {})",
            config.aspect_ratio,
            config.image_size,
            reference_image.is_some()
        );

        // Read per call so a key picked after startup is used right away.
        let api_key = self.keys.get().ok_or_else(|| {
            GenerationError::ConfigError("no API key selected".to_string())
        })?;

        match self.request_image(&api_key, prompt, config, reference_image).await {
            Ok(url) => Ok(url),
            Err(e) => {
                if e.is_entity_not_found() {
                    if self.claim_reselect(&api_key) {
                        log::warn!("Selected key cannot reach the model, asking for another one");
                        if let Err(hook_err) = self.key_manager.open_select_key().await {
                            log::warn!("Key selector failed: {}", hook_err);
                        }
                    } else {
                        log::debug!("Key selector already opened for this key");
                    }
                }
                Err(e)
            }
        }
    }

    fn begin_batch(&self) {
        *self
            .reselected_for
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::FakeKeys;
    use crate::app::{SubmitOutcome, WallpaperApp};
    use crate::models::{AspectRatio, GenerateContentResponse, ImageSize};
    use serde_json::json;
    use std::sync::Mutex;

    struct FakeTransport {
        response: Mutex<Option<Result<GenerateContentResponse>>>,
        seen: Mutex<Vec<(String, GenerateContentRequest)>>,
    }

    impl FakeTransport {
        fn returning(response: Result<GenerateContentResponse>) -> Arc<Self> {
            Arc::new(Self {
                response: Mutex::new(Some(response)),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ContentTransport for FakeTransport {
        async fn generate_content(
            &self,
            api_key: &str,
            request: &GenerateContentRequest,
        ) -> Result<GenerateContentResponse> {
            self.seen
                .lock()
                .unwrap()
                .push((api_key.to_string(), request.clone()));
            self.response
                .lock()
                .unwrap()
                .take()
                .expect("transport called more than once")
        }
    }

    /// Rejects every request the way Gemini does for a key without model access.
    #[derive(Default)]
    struct EntityNotFoundTransport {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl ContentTransport for EntityNotFoundTransport {
        async fn generate_content(
            &self,
            _api_key: &str,
            _request: &GenerateContentRequest,
        ) -> Result<GenerateContentResponse> {
            self.calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Err(GenerationError::ApiError {
                status: "NOT_FOUND".into(),
                message: "Requested entity was not found.".into(),
            })
        }
    }

    fn image_response(data: &str) -> GenerateContentResponse {
        serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [
                { "text": "done" },
                { "inlineData": { "mimeType": "image/png", "data": data } }
            ]}}]
        }))
        .unwrap()
    }

    fn client(transport: Arc<FakeTransport>, keys: FakeKeys) -> WallpaperClient {
        WallpaperClient::with_transport(
            transport,
            ApiKeyStore::new(Some("test-key".into())),
            Arc::new(keys),
        )
    }

    fn portrait() -> GenerationConfig {
        GenerationConfig::new(AspectRatio::Portrait9x16, ImageSize::OneK)
    }

    #[test]
    fn test_strip_prefix_variants() {
        assert_eq!(strip_data_uri_prefix("data:image/png;base64,QUJD"), "QUJD");
        assert_eq!(strip_data_uri_prefix("data:image/jpeg;base64,QUJD"), "QUJD");
        assert_eq!(strip_data_uri_prefix("data:image/webp;base64,QUJD"), "QUJD");
        assert_eq!(strip_data_uri_prefix("QUJD"), "QUJD");
        assert_eq!(
            strip_data_uri_prefix("data:image/gif;base64,QUJD"),
            "data:image/gif;base64,QUJD"
        );
    }

    #[test]
    fn test_strip_prefix_is_idempotent() {
        let once = strip_data_uri_prefix("data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(strip_data_uri_prefix(once), once);
    }

    #[test]
    fn test_reference_image_part_comes_first() {
        let request = WallpaperClient::build_request(
            "make it warmer",
            portrait(),
            Some("data:image/png;base64,QUJD"),
        );
        let parts = &request.contents[0].parts;
        assert_eq!(parts.len(), 2);
        let inline = parts[0].inline_data.as_ref().unwrap();
        assert_eq!(inline.data, "QUJD");
        assert_eq!(inline.mime_type.as_deref(), Some("image/png"));
        assert_eq!(parts[1].text.as_deref(), Some("make it warmer"));
    }

    #[test]
    fn test_text_only_request() {
        let request = WallpaperClient::build_request("aurora", portrait(), None);
        assert_eq!(request.contents[0].parts, vec![Part::text("aurora")]);
        assert_eq!(request.generation_config.image_config, portrait());
    }

    #[tokio::test]
    async fn test_generate_returns_png_data_uri() {
        let transport = FakeTransport::returning(Ok(image_response("aW1n")));
        let client = client(transport.clone(), FakeKeys::with_key(true));

        let url = client
            .generate("rainy cyberpunk lo-fi", portrait(), None)
            .await
            .unwrap();

        assert_eq!(url, "data:image/png;base64,aW1n");
        assert_eq!(transport.calls(), 1);
        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].0, "test-key");
    }

    #[tokio::test]
    async fn test_missing_image_fails_with_no_image_data() {
        let response = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "I can't draw that" }] } }]
        }))
        .unwrap();
        let transport = FakeTransport::returning(Ok(response));
        let keys = FakeKeys::with_key(true);
        let client = client(transport, keys.clone());

        let err = client.generate("x", portrait(), None).await.unwrap_err();
        assert!(matches!(err, GenerationError::NoImageData));
        assert_eq!(keys.selector_opens(), 0);
    }

    #[tokio::test]
    async fn test_entity_not_found_opens_selector_then_rethrows() {
        let transport = FakeTransport::returning(Err(GenerationError::ApiError {
            status: "NOT_FOUND".into(),
            message: "Requested entity was not found.".into(),
        }));
        let keys = FakeKeys::with_key(true);
        let client = client(transport.clone(), keys.clone());

        let err = client.generate("x", portrait(), None).await.unwrap_err();
        assert!(err.is_entity_not_found());
        assert_eq!(keys.selector_opens(), 1);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_failing_selector_does_not_mask_original_error() {
        let transport = FakeTransport::returning(Err(GenerationError::ApiError {
            status: "NOT_FOUND".into(),
            message: "Requested entity was not found.".into(),
        }));
        let keys = FakeKeys::failing_selector();
        let client = client(transport, keys.clone());

        let err = client.generate("x", portrait(), None).await.unwrap_err();
        assert!(matches!(err, GenerationError::ApiError { .. }));
        assert_eq!(keys.selector_opens(), 1);
    }

    #[tokio::test]
    async fn test_other_errors_propagate_without_selector() {
        let transport = FakeTransport::returning(Err(GenerationError::RequestError(
            "connection reset".into(),
        )));
        let keys = FakeKeys::with_key(true);
        let client = client(transport, keys.clone());

        let err = client.generate("x", portrait(), None).await.unwrap_err();
        assert_eq!(err.to_string(), "Request error: connection reset");
        assert_eq!(keys.selector_opens(), 0);
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let transport = FakeTransport::returning(Ok(image_response("aW1n")));
        let client = WallpaperClient::with_transport(
            transport.clone(),
            ApiKeyStore::new(None),
            Arc::new(FakeKeys::with_key(false)),
        );

        let err = client.generate("x", portrait(), None).await.unwrap_err();
        assert!(matches!(err, GenerationError::ConfigError(_)));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_batch_opens_selector_once() {
        let transport = Arc::new(EntityNotFoundTransport::default());
        let keys = FakeKeys::with_key(true);
        let client = WallpaperClient::with_transport(
            transport.clone(),
            ApiKeyStore::new(Some("unbilled-key".into())),
            Arc::new(keys.clone()),
        );
        let app = WallpaperApp::new(client, keys.clone());

        let outcome = app.submit_prompt("x").await;
        assert_eq!(outcome, SubmitOutcome::Failed);
        assert_eq!(keys.selector_opens(), 1);

        // Let the detached siblings settle; none of them may open another selector.
        while transport.calls.load(std::sync::atomic::Ordering::SeqCst) < 4 {
            tokio::task::yield_now().await;
        }
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert_eq!(keys.selector_opens(), 1);

        // A fresh batch with the same key gets its own single selector.
        assert_eq!(app.submit_prompt("x").await, SubmitOutcome::Failed);
        assert_eq!(keys.selector_opens(), 2);
    }

    #[tokio::test]
    async fn test_selector_reopens_when_key_changes() {
        let transport = Arc::new(EntityNotFoundTransport::default());
        let store = ApiKeyStore::new(Some("first".into()));
        let keys = FakeKeys::with_key(true);
        let client =
            WallpaperClient::with_transport(transport, store.clone(), Arc::new(keys.clone()));

        let _ = client.generate("x", portrait(), None).await;
        let _ = client.generate("x", portrait(), None).await;
        assert_eq!(keys.selector_opens(), 1);

        store.set("second");
        let _ = client.generate("x", portrait(), None).await;
        assert_eq!(keys.selector_opens(), 2);
    }
}

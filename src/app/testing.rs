//! In-memory collaborators for unit tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use super::key_gate::KeyManager;
use crate::error::{GenerationError, Result};
use crate::gemini::WallpaperGenerator;
use crate::models::GenerationConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub prompt: String,
    pub config: GenerationConfig,
    pub reference_image: Option<String>,
}

#[derive(Clone)]
pub struct FakeGenerator {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    fail_on_call: Option<usize>,
    no_image: bool,
    gate: Option<Arc<Semaphore>>,
}

impl FakeGenerator {
    pub fn succeeding() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_on_call: None,
            no_image: false,
            gate: None,
        }
    }

    /// The call with this zero-based sequence number fails, all others succeed.
    pub fn failing_on_call(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::succeeding()
        }
    }

    /// Every call fails the way a response without an inline image does.
    pub fn without_image() -> Self {
        Self {
            no_image: true,
            ..Self::succeeding()
        }
    }

    /// Calls block until the returned semaphore hands out a permit per call.
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        (
            Self {
                gate: Some(Arc::clone(&gate)),
                ..Self::succeeding()
            },
            gate,
        )
    }

    /// Like [`FakeGenerator::gated`], except call `call` fails at once without waiting.
    pub fn gated_failing_on_call(call: usize) -> (Self, Arc<Semaphore>) {
        let (generator, gate) = Self::gated();
        (
            Self {
                fail_on_call: Some(call),
                ..generator
            },
            gate,
        )
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub async fn wait_for_calls(&self, expected: usize) {
        while self.call_count() < expected {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl WallpaperGenerator for FakeGenerator {
    async fn generate(
        &self,
        prompt: &str,
        config: GenerationConfig,
        reference_image: Option<&str>,
    ) -> Result<String> {
        let seq = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(RecordedCall {
                prompt: prompt.to_string(),
                config,
                reference_image: reference_image.map(str::to_string),
            });
            calls.len() - 1
        };

        if self.fail_on_call == Some(seq) {
            return Err(GenerationError::RequestError("connection reset".into()));
        }

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        if self.no_image {
            return Err(GenerationError::NoImageData);
        }
        Ok(format!("data:image/png;base64,aW1n{}", seq))
    }
}

#[derive(Clone)]
pub struct FakeKeys {
    has_key: bool,
    probe_fails: bool,
    selector_fails: bool,
    probes: Arc<AtomicUsize>,
    selector_opens: Arc<AtomicUsize>,
}

impl FakeKeys {
    pub fn with_key(has_key: bool) -> Self {
        Self {
            has_key,
            probe_fails: false,
            selector_fails: false,
            probes: Arc::new(AtomicUsize::new(0)),
            selector_opens: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing_probe() -> Self {
        Self {
            probe_fails: true,
            ..Self::with_key(false)
        }
    }

    pub fn failing_selector() -> Self {
        Self {
            selector_fails: true,
            ..Self::with_key(false)
        }
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn selector_opens(&self) -> usize {
        self.selector_opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyManager for FakeKeys {
    async fn has_selected_api_key(&self) -> Result<bool> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.probe_fails {
            return Err(GenerationError::KeySelectionError("host bridge unavailable".into()));
        }
        Ok(self.has_key)
    }

    async fn open_select_key(&self) -> Result<()> {
        self.selector_opens.fetch_add(1, Ordering::SeqCst);
        if self.selector_fails {
            return Err(GenerationError::KeySelectionError("dialog dismissed".into()));
        }
        Ok(())
    }
}

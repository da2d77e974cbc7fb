use async_trait::async_trait;
use std::io::Write;
use std::sync::{Arc, RwLock};

use super::{state::KeyStatus, WallpaperApp};
use crate::error::{GenerationError, Result};

/// Host capability that knows whether a usable API key is selected and can ask the user for one.
#[async_trait]
pub trait KeyManager: Send + Sync {
    async fn has_selected_api_key(&self) -> Result<bool>;

    /// Returns once the selector closes. Callers cannot tell whether a key was actually chosen.
    async fn open_select_key(&self) -> Result<()>;
}

/// Shared slot for the active API key. Cloning shares the slot.
#[derive(Debug, Clone, Default)]
pub struct ApiKeyStore {
    key: Arc<RwLock<Option<String>>>,
}

impl ApiKeyStore {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            key: Arc::new(RwLock::new(initial.filter(|k| !k.trim().is_empty()))),
        }
    }

    pub fn get(&self) -> Option<String> {
        self.key.read().ok().and_then(|guard| guard.clone())
    }

    pub fn set(&self, key: impl Into<String>) {
        let key = key.into();
        if key.trim().is_empty() {
            return;
        }
        if let Ok(mut guard) = self.key.write() {
            *guard = Some(key.trim().to_string());
        }
    }

    pub fn is_set(&self) -> bool {
        self.get().is_some()
    }
}

/// Key selector for the terminal: reads a key from stdin into the store.
#[derive(Debug, Clone)]
pub struct ConsoleKeyManager {
    store: ApiKeyStore,
}

impl ConsoleKeyManager {
    pub fn new(store: ApiKeyStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl KeyManager for ConsoleKeyManager {
    async fn has_selected_api_key(&self) -> Result<bool> {
        Ok(self.store.is_set())
    }

    async fn open_select_key(&self) -> Result<()> {
        print!("🔑 Paste a Gemini API key (billing enabled, see https://ai.google.dev/gemini-api/docs/billing): ");
        std::io::stdout()
            .flush()
            .map_err(|e| GenerationError::KeySelectionError(e.to_string()))?;

        let line = read_console_line()
            .await
            .map_err(|e| GenerationError::KeySelectionError(e.to_string()))?
            .unwrap_or_default();

        if line.trim().is_empty() {
            log::warn!("No key entered, keeping the current selection");
        } else {
            self.store.set(line);
            log::info!("🔑 API key updated");
        }
        Ok(())
    }
}

/// Reads one line through the process-wide std stdin buffer, so the key selector and the
/// terminal front end never steal each other's buffered input. `None` on end of input.
pub async fn read_console_line() -> std::io::Result<Option<String>> {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        match std::io::stdin().read_line(&mut line)? {
            0 => Ok(None),
            _ => Ok(Some(line)),
        }
    })
    .await
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?
}

impl WallpaperApp {
    /// Startup probe. A failing capability check counts as "no key" and is never shown to the user.
    pub async fn probe_api_key(&self) -> KeyStatus {
        let status = match self.keys().has_selected_api_key().await {
            Ok(true) => KeyStatus::Present,
            Ok(false) => KeyStatus::Missing,
            Err(e) => {
                log::debug!("Key probe failed, treating as missing: {}", e);
                KeyStatus::Missing
            }
        };
        self.update(|state| state.api_key = status);
        status
    }

    /// Opens the selector and then assumes a key was chosen, without re-checking.
    pub async fn connect_api_key(&self) -> Result<()> {
        self.keys().open_select_key().await?;
        self.update(|state| state.api_key = KeyStatus::Present);
        Ok(())
    }

    /// Lets the user swap keys from the main screen. The gate status is left as is.
    pub async fn reselect_api_key(&self) -> Result<()> {
        self.keys().open_select_key().await
    }
}

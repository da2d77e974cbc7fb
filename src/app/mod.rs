pub mod gallery;
pub mod key_gate;
pub mod orchestrator;
pub mod settings;
pub mod state;
pub mod viewer;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use tokio::sync::watch;

use crate::gemini::WallpaperGenerator;

pub use gallery::{GalleryTile, GalleryView};
pub use key_gate::{read_console_line, ApiKeyStore, ConsoleKeyManager, KeyManager};
pub use orchestrator::SubmitOutcome;
pub use settings::{SettingOption, SettingsView};
pub use state::{GenerationPhase, KeyStatus, ViewState, BATCH_SIZE, GENERATION_FAILED_MESSAGE};

/// Owns the view state and the collaborators that act on it.
///
/// Every mutation goes through [`WallpaperApp::update`], so subscribers see each change
/// exactly once and the busy check in `submit` cannot race another submit.
#[derive(Clone)]
pub struct WallpaperApp {
    state: Arc<watch::Sender<ViewState>>,
    generator: Arc<dyn WallpaperGenerator>,
    keys: Arc<dyn KeyManager>,
}

impl WallpaperApp {
    pub fn new<G, K>(generator: G, keys: K) -> Self
    where
        G: WallpaperGenerator + 'static,
        K: KeyManager + 'static,
    {
        Self::with_shared(Arc::new(generator), Arc::new(keys))
    }

    pub fn with_shared(generator: Arc<dyn WallpaperGenerator>, keys: Arc<dyn KeyManager>) -> Self {
        let (sender, _) = watch::channel(ViewState::default());
        Self {
            state: Arc::new(sender),
            generator,
            keys,
        }
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> ViewState {
        self.state.borrow().clone()
    }

    /// Receiver that is notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    pub fn set_prompt(&self, prompt: impl Into<String>) {
        let prompt = prompt.into();
        self.update(|state| state.prompt = prompt);
    }

    pub(crate) fn update(&self, apply: impl FnOnce(&mut ViewState)) {
        self.state.send_modify(apply);
    }

    pub(crate) fn update_if(&self, apply: impl FnOnce(&mut ViewState) -> bool) -> bool {
        self.state.send_if_modified(apply)
    }

    pub(crate) fn generator(&self) -> Arc<dyn WallpaperGenerator> {
        Arc::clone(&self.generator)
    }

    pub(crate) fn keys(&self) -> &dyn KeyManager {
        self.keys.as_ref()
    }
}

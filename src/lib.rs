//! VibePaper: four AI wallpapers from one prompt, backed by the Gemini image model.
//!
//! [`WallpaperClient`] makes single generation calls. [`WallpaperApp`] owns the view state
//! and runs the four-way batch, remix, viewer and key gate on top of it.

pub mod app;
pub mod config;
pub mod error;
pub mod gemini;
pub mod logger;
pub mod models;

pub use app::{
    ApiKeyStore, ConsoleKeyManager, GalleryView, GenerationPhase, KeyManager, KeyStatus,
    SettingsView, SubmitOutcome, ViewState, WallpaperApp,
};
pub use config::{Config, GeminiConfig};
pub use error::{GenerationError, Result};
pub use gemini::{ContentTransport, GeminiTransport, WallpaperClient, WallpaperGenerator};
pub use models::{AspectRatio, GeneratedImage, GenerationConfig, ImageSize};

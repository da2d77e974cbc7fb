use serde::Serialize;

use crate::models::{GeneratedImage, GenerationConfig};

/// Number of variations requested per submit.
pub const BATCH_SIZE: usize = 4;

/// The only error text the user ever sees for a failed batch.
pub const GENERATION_FAILED_MESSAGE: &str = "Failed to generate some wallpapers. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum KeyStatus {
    #[default]
    Unknown,
    Present,
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GenerationPhase {
    Idle,
    Generating,
    Succeeded,
    Failed,
}

/// Everything the UI renders. Lives for one session and is never persisted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ViewState {
    pub prompt: String,
    pub config: GenerationConfig,
    pub images: Vec<GeneratedImage>,
    pub is_generating: bool,
    /// Copy of an earlier result that seeds the next submit.
    pub reference_image: Option<GeneratedImage>,
    pub error: Option<String>,
    pub selected_image: Option<GeneratedImage>,
    pub api_key: KeyStatus,
}

impl ViewState {
    pub fn phase(&self) -> GenerationPhase {
        if self.is_generating {
            GenerationPhase::Generating
        } else if self.error.is_some() {
            GenerationPhase::Failed
        } else if !self.images.is_empty() {
            GenerationPhase::Succeeded
        } else {
            GenerationPhase::Idle
        }
    }

    /// Submit control enablement.
    pub fn can_submit(&self) -> bool {
        !self.is_generating && !self.prompt.trim().is_empty()
    }

    pub fn shows_main_ui(&self) -> bool {
        self.api_key == KeyStatus::Present
    }
}

use futures::future::try_join_all;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{
    state::{BATCH_SIZE, GENERATION_FAILED_MESSAGE},
    WallpaperApp,
};
use crate::{
    error::{GenerationError, Result},
    logger,
    models::GeneratedImage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank prompt, or a batch was already running.
    Ignored,
    Completed(usize),
    Failed,
}

impl WallpaperApp {
    /// Sets the prompt and submits it.
    pub async fn submit_prompt(&self, prompt: impl Into<String>) -> SubmitOutcome {
        self.set_prompt(prompt);
        self.submit().await
    }

    /// Runs one batch of [`BATCH_SIZE`] parallel generations for the current prompt.
    ///
    /// The batch is all-or-nothing: the first failure ends it, results from the other
    /// requests are dropped and only a generic message is shown. Requests still in flight
    /// at that point keep running detached.
    pub async fn submit(&self) -> SubmitOutcome {
        let mut batch = None;
        self.update_if(|state| {
            if state.is_generating || state.prompt.trim().is_empty() {
                return false;
            }
            state.is_generating = true;
            state.error = None;
            state.images.clear();
            batch = Some((
                state.prompt.clone(),
                state.config,
                state.reference_image.as_ref().map(|image| image.url.clone()),
            ));
            true
        });

        let Some((prompt, config, reference)) = batch else {
            log::debug!("Submit ignored: prompt blank or batch in progress");
            return SubmitOutcome::Ignored;
        };

        let batch_id = Uuid::new_v4();
        log::info!(
            "🎨 Batch {} started: {} x {} @ {}{}",
            batch_id,
            BATCH_SIZE,
            config.aspect_ratio,
            config.image_size,
            if reference.is_some() { " (remix)" } else { "" }
        );
        let _timer = logger::timer(&format!("Batch {}", batch_id));
        self.generator().begin_batch();

        let handles: Vec<JoinHandle<Result<GeneratedImage>>> = (0..BATCH_SIZE)
            .map(|index| {
                let generator = self.generator();
                let prompt = prompt.clone();
                let reference = reference.clone();
                tokio::spawn(async move {
                    let url = generator
                        .generate(&prompt, config, reference.as_deref())
                        .await
                        .map_err(|e| {
                            log::error!("Generation {} of batch {} failed: {}", index + 1, batch_id, e);
                            e
                        })?;
                    Ok(GeneratedImage::new(url, prompt))
                })
            })
            .collect();

        // Dropping a JoinHandle detaches its task, so fail-fast leaves the others running.
        let joined = try_join_all(handles.into_iter().map(|handle| async move {
            handle
                .await
                .map_err(|e| GenerationError::InternalError(e.to_string()))?
        }))
        .await;

        match joined {
            Ok(images) => {
                let count = images.len();
                self.update(|state| {
                    state.images = images;
                    state.reference_image = None;
                    state.error = None;
                    state.is_generating = false;
                });
                log::info!("✅ Batch {} produced {} wallpapers", batch_id, count);
                SubmitOutcome::Completed(count)
            }
            Err(e) => {
                self.update(|state| {
                    state.images.clear();
                    state.error = Some(GENERATION_FAILED_MESSAGE.to_string());
                    state.is_generating = false;
                });
                log::warn!("Batch {} failed: {}", batch_id, e);
                SubmitOutcome::Failed
            }
        }
    }
}

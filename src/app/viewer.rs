use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::{Path, PathBuf};

use super::WallpaperApp;
use crate::{
    error::{GenerationError, Result},
    gemini::strip_data_uri_prefix,
    models::GeneratedImage,
};

/// Decodes the image bytes carried by a generated image's data URI.
pub fn decode_image(image: &GeneratedImage) -> Result<Vec<u8>> {
    if !image.url.starts_with("data:image/") {
        return Err(GenerationError::ResponseError(
            "image url is not a data URI".to_string(),
        ));
    }
    STANDARD
        .decode(strip_data_uri_prefix(&image.url))
        .map_err(|e| GenerationError::ResponseError(format!("invalid image payload: {}", e)))
}

/// `vibepaper-<unix millis>-<id prefix>.png`, unique across a batch saved in one go.
pub fn download_file_name(image: &GeneratedImage) -> String {
    let id_prefix: String = image.id.chars().filter(|c| c.is_ascii_alphanumeric()).take(8).collect();
    format!(
        "vibepaper-{}-{}.png",
        chrono::Utc::now().timestamp_millis(),
        id_prefix
    )
}

impl WallpaperApp {
    pub fn close_viewer(&self) {
        self.update(|state| state.selected_image = None);
    }

    /// Seeds the next submit from an earlier result. Does not start a generation.
    pub fn remix(&self, image: &GeneratedImage) {
        let image = image.clone();
        self.update(|state| {
            state.prompt = image.prompt.clone();
            state.reference_image = Some(image);
            state.selected_image = None;
        });
        log::debug!("Remix armed with prompt from the selected wallpaper");
    }

    pub fn clear_reference(&self) {
        self.update(|state| state.reference_image = None);
    }

    /// Writes the image as a PNG file into `dir` and returns its path.
    pub async fn download(&self, image: &GeneratedImage, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let bytes = decode_image(image)?;
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| GenerationError::InternalError(format!("{}: {}", dir.display(), e)))?;

        let path = dir.join(download_file_name(image));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| GenerationError::InternalError(format!("{}: {}", path.display(), e)))?;

        log::info!("💾 Saved {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }
}

use super::{state::BATCH_SIZE, ViewState, WallpaperApp};
use crate::models::GeneratedImage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryTile {
    pub index: usize,
    pub image: GeneratedImage,
    /// `w/h` of the active aspect ratio.
    pub tile_ratio: String,
}

/// What the two-column results grid shows for a given state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryView {
    pub heading: &'static str,
    pub placeholders: usize,
    pub tiles: Vec<GalleryTile>,
    pub empty_hint: Option<&'static str>,
}

impl GalleryView {
    pub fn from_state(state: &ViewState) -> Self {
        let heading = if !state.images.is_empty() {
            "Your Wallpapers"
        } else if state.is_generating {
            "Generating Magic..."
        } else {
            "Ready to Create"
        };
        let placeholders = if state.is_generating && state.images.is_empty() {
            BATCH_SIZE
        } else {
            0
        };
        let tile_ratio = state.config.aspect_ratio.tile_ratio();
        let tiles = state
            .images
            .iter()
            .enumerate()
            .map(|(index, image)| GalleryTile {
                index,
                image: image.clone(),
                tile_ratio: tile_ratio.clone(),
            })
            .collect();
        let empty_hint = (state.images.is_empty() && !state.is_generating)
            .then_some("Your creations will appear here");

        Self {
            heading,
            placeholders,
            tiles,
            empty_hint,
        }
    }
}

impl WallpaperApp {
    pub fn gallery_view(&self) -> GalleryView {
        GalleryView::from_state(&self.snapshot())
    }

    /// Opens the full-screen viewer on a grid tile. Returns false for an index with no image.
    pub fn select_image(&self, index: usize) -> bool {
        self.update_if(|state| match state.images.get(index) {
            Some(image) => {
                state.selected_image = Some(image.clone());
                true
            }
            None => false,
        })
    }
}

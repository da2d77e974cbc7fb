use super::WallpaperApp;
use crate::models::{AspectRatio, GenerationConfig, ImageSize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingOption<T> {
    pub value: T,
    pub label: &'static str,
    pub active: bool,
}

/// The two toggle groups of the settings panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsView {
    pub aspect_ratios: Vec<SettingOption<AspectRatio>>,
    pub image_sizes: Vec<SettingOption<ImageSize>>,
}

impl SettingsView {
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self {
            aspect_ratios: AspectRatio::ALL
                .into_iter()
                .map(|ratio| SettingOption {
                    value: ratio,
                    label: ratio.as_str(),
                    active: ratio == config.aspect_ratio,
                })
                .collect(),
            image_sizes: ImageSize::ALL
                .into_iter()
                .map(|size| SettingOption {
                    value: size,
                    label: size.as_str(),
                    active: size == config.image_size,
                })
                .collect(),
        }
    }
}

impl WallpaperApp {
    pub fn set_aspect_ratio(&self, aspect_ratio: AspectRatio) {
        self.update(|state| state.config.aspect_ratio = aspect_ratio);
    }

    pub fn set_image_size(&self, image_size: ImageSize) {
        self.update(|state| state.config.image_size = image_size);
    }

    pub fn settings_view(&self) -> SettingsView {
        SettingsView::from_config(&self.snapshot().config)
    }
}

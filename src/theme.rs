//! Acrylic theme preferences.
//!
//! Every operation reads or writes the [`PreferenceStore`] and returns a
//! [`ThemeUpdate`] describing the style changes the page has to apply. The
//! controller never touches the page itself.

use crate::prefs::PreferenceStore;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

pub const OPACITY_KEY: &str = "acrylic-opacity";
pub const BLUR_KEY: &str = "acrylic-blur";
pub const BACKGROUND_KEY: &str = "custom-bg-image";

pub const OPACITY_PROPERTY: &str = "--acrylic-bg-opacity";
pub const BLUR_PROPERTY: &str = "--acrylic-blur";
pub const BACKGROUND_PROPERTY: &str = "--custom-bg-image";
pub const BACKGROUND_CLASS: &str = "custom-bg";

pub const DEFAULT_OPACITY: f64 = 0.8;
pub const DEFAULT_BLUR_PX: u32 = 12;
pub const MAX_BACKGROUND_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThemeError {
    #[error("image must not exceed 5MB (got {size} bytes)")]
    TooLarge { size: usize },
    #[error("failed to read image, please try again")]
    Unreadable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StyleChange {
    SetProperty { name: String, value: String },
    RemoveProperty { name: String },
    AddBodyClass { class: String },
    RemoveBodyClass { class: String },
}

impl StyleChange {
    fn set(name: &str, value: impl Into<String>) -> Self {
        Self::SetProperty {
            name: name.to_string(),
            value: value.into(),
        }
    }

    fn remove(name: &str) -> Self {
        Self::RemoveProperty {
            name: name.to_string(),
        }
    }
}

/// Position and caption of the two slider controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SliderSync {
    pub opacity_percent: u32,
    pub opacity_label: String,
    pub blur_px: u32,
    pub blur_label: String,
}

impl SliderSync {
    fn new(opacity: f64, blur_px: u32) -> Self {
        let opacity_percent = (opacity * 100.0).round() as u32;
        Self {
            opacity_percent,
            opacity_label: format!("{opacity_percent}%"),
            blur_px,
            blur_label: format!("{blur_px}px"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundStatus {
    Applied,
    Rejected,
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ThemeUpdate {
    pub changes: Vec<StyleChange>,
    pub sliders: Option<SliderSync>,
    pub background: Option<BackgroundStatus>,
}

impl ThemeUpdate {
    fn merge(&mut self, other: ThemeUpdate) {
        self.changes.extend(other.changes);
        if other.sliders.is_some() {
            self.sliders = other.sliders;
        }
        if other.background.is_some() {
            self.background = other.background;
        }
    }

    /// Value a property ends up with after all changes, `None` if removed or never set.
    pub fn property(&self, name: &str) -> Option<&str> {
        let mut current = None;
        for change in &self.changes {
            match change {
                StyleChange::SetProperty { name: n, value } if n == name => {
                    current = Some(value.as_str())
                }
                StyleChange::RemoveProperty { name: n } if n == name => current = None,
                _ => {}
            }
        }
        current
    }
}

/// Snapshot of the persisted preferences after defaults are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemePreferences {
    pub opacity: f64,
    pub blur_px: u32,
    pub background: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn to_data_uri(&self) -> String {
        let mime = self.mime.trim();
        let mime = if !mime.is_empty()
            && mime
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '/' | '+' | '.' | '-'))
        {
            mime
        } else {
            "application/octet-stream"
        };
        format!("data:{mime};base64,{}", STANDARD.encode(&self.bytes))
    }
}

pub struct ThemeController<S> {
    store: S,
}

impl<S: PreferenceStore> ThemeController<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn preferences(&self) -> ThemePreferences {
        let opacity = self
            .store
            .get_item(OPACITY_KEY)
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite())
            .map(|value| value.clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_OPACITY);
        let blur_px = self
            .store
            .get_item(BLUR_KEY)
            .and_then(|value| value.trim().parse::<u32>().ok())
            .unwrap_or(DEFAULT_BLUR_PX);
        let background = self
            .store
            .get_item(BACKGROUND_KEY)
            .filter(|value| !value.is_empty());

        ThemePreferences {
            opacity,
            blur_px,
            background,
        }
    }

    pub fn init(&mut self) -> ThemeUpdate {
        let prefs = self.preferences();
        let mut update = ThemeUpdate {
            changes: vec![
                StyleChange::set(OPACITY_PROPERTY, prefs.opacity.to_string()),
                StyleChange::set(BLUR_PROPERTY, format!("{}px", prefs.blur_px)),
            ],
            sliders: Some(SliderSync::new(prefs.opacity, prefs.blur_px)),
            background: None,
        };

        if let Some(background) = prefs.background {
            update.merge(self.apply_background(&background));
        }

        update
    }

    /// Opacity slider input, `percent` in 0..=100.
    pub fn set_opacity(&mut self, percent: u32) -> ThemeUpdate {
        let percent = percent.min(100);
        let opacity = f64::from(percent) / 100.0;
        let value = opacity.to_string();
        self.store.set_item(OPACITY_KEY, &value);

        let blur_px = self.preferences().blur_px;
        ThemeUpdate {
            changes: vec![StyleChange::set(OPACITY_PROPERTY, value)],
            sliders: Some(SliderSync::new(opacity, blur_px)),
            background: None,
        }
    }

    pub fn set_blur(&mut self, blur_px: u32) -> ThemeUpdate {
        self.store.set_item(BLUR_KEY, &blur_px.to_string());

        let opacity = self.preferences().opacity;
        ThemeUpdate {
            changes: vec![StyleChange::set(BLUR_PROPERTY, format!("{blur_px}px"))],
            sliders: Some(SliderSync::new(opacity, blur_px)),
            background: None,
        }
    }

    pub fn upload_background(&mut self, upload: &ImageUpload) -> Result<ThemeUpdate, ThemeError> {
        if upload.size() > MAX_BACKGROUND_BYTES {
            return Err(ThemeError::TooLarge {
                size: upload.size(),
            });
        }
        if upload.bytes.is_empty() {
            return Err(ThemeError::Unreadable);
        }

        Ok(self.apply_background(&upload.to_data_uri()))
    }

    /// Commits `data_uri` only once it decodes as an image; otherwise clears
    /// whatever custom background was stored or applied.
    pub fn apply_background(&mut self, data_uri: &str) -> ThemeUpdate {
        let mut changes = vec![StyleChange::AddBodyClass {
            class: BACKGROUND_CLASS.to_string(),
        }];

        let background = match decode_data_uri(data_uri).as_deref().and_then(sniff_image) {
            Some(kind) => {
                info!("applying custom background ({kind})");
                self.store.set_item(BACKGROUND_KEY, data_uri);
                changes.push(StyleChange::set(BACKGROUND_PROPERTY, format!("url('{data_uri}')")));
                BackgroundStatus::Applied
            }
            None => {
                warn!("background image failed to load");
                self.store.remove_item(BACKGROUND_KEY);
                changes.push(StyleChange::remove(BACKGROUND_PROPERTY));
                BackgroundStatus::Rejected
            }
        };

        ThemeUpdate {
            changes,
            sliders: None,
            background: Some(background),
        }
    }

    pub fn reset(&mut self) -> ThemeUpdate {
        self.store.remove_item(BACKGROUND_KEY);
        self.store.set_item(OPACITY_KEY, &DEFAULT_OPACITY.to_string());
        self.store.set_item(BLUR_KEY, &DEFAULT_BLUR_PX.to_string());

        let mut update = ThemeUpdate {
            changes: vec![
                StyleChange::remove(BACKGROUND_PROPERTY),
                StyleChange::RemoveBodyClass {
                    class: BACKGROUND_CLASS.to_string(),
                },
            ],
            sliders: None,
            background: Some(BackgroundStatus::Cleared),
        };
        update.merge(self.init());
        update
    }
}

fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
    let rest = uri.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    if !meta.ends_with(";base64") {
        return None;
    }
    STANDARD.decode(payload.trim()).ok()
}

fn sniff_image(bytes: &[u8]) -> Option<&'static str> {
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";

    if bytes.len() >= 24 && bytes.starts_with(PNG) && &bytes[12..16] == b"IHDR" {
        return Some("png");
    }
    if bytes.len() >= 4 && bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("jpeg");
    }
    if bytes.len() >= 10 && (bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a")) {
        return Some("gif");
    }
    if bytes.len() >= 16 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        return Some("webp");
    }
    if bytes.len() >= 26 && bytes.starts_with(b"BM") {
        return Some("bmp");
    }
    None
}

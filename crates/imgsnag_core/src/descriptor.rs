use serde::{Deserialize, Serialize};

/// Marker attribute on the chat's message containers.
pub const DEFAULT_MESSAGE_SELECTOR: &str = r#"[data-testid="send_message"]"#;

/// One `<img>` element as seen in the rendered page.
///
/// `width`/`height` are the natural dimensions; 0 means the image was not
/// measured (not loaded yet, or unknown).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageDescriptor {
    pub src: String,
    pub width: u32,
    pub height: u32,
    pub alt: String,
}

impl ImageDescriptor {
    pub fn new(src: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            src: src.into(),
            width,
            height,
            alt: String::new(),
        }
    }
}

/// Which images an extraction pass collects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageScope {
    /// Every `img` in the document.
    All,
    /// Only `img` elements nested under elements matching the CSS selector.
    Within(String),
}

impl Default for ImageScope {
    fn default() -> Self {
        ImageScope::Within(DEFAULT_MESSAGE_SELECTOR.to_string())
    }
}

use url::Url;

const EMBEDDED_PREFIX: &str = "data:image";
const FALLBACK_EXTENSION: &str = ".jpg";
const MAX_EXTENSION_LEN: usize = 5;

/// Where the bytes of an image come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Pixel data inlined in a `data:image/...;base64,` URI.
    Embedded { data_uri: String },
    /// An `http(s)` URL to fetch.
    Remote { url: String },
}

/// Classify an image `src`. Anything that is neither an inline image nor an
/// `http(s)` URL (`blob:`, relative paths, ...) yields `None`.
pub fn classify(src: &str) -> Option<ImageSource> {
    if src.starts_with(EMBEDDED_PREFIX) {
        Some(ImageSource::Embedded {
            data_uri: src.to_string(),
        })
    } else if src.starts_with("http") {
        Some(ImageSource::Remote {
            url: src.to_string(),
        })
    } else {
        None
    }
}

/// File extension (with leading dot) to save `source` under.
pub fn extension_for(source: &ImageSource) -> String {
    let raw = match source {
        ImageSource::Embedded { data_uri } => embedded_subtype(data_uri).map(|s| format!(".{s}")),
        ImageSource::Remote { url } => url_path_extension(url),
    };
    normalize_extension(raw.as_deref().unwrap_or(FALLBACK_EXTENSION))
}

/// Lower-case, fold `.jpeg` into `.jpg`, and fall back to `.jpg` for anything
/// empty, longer than five characters, or containing characters outside
/// `[a-z0-9.]`.
pub fn normalize_extension(ext: &str) -> String {
    let lowered = ext.to_ascii_lowercase();
    if lowered == ".jpeg" {
        return FALLBACK_EXTENSION.to_string();
    }
    let legal = lowered
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.');
    if lowered.len() <= 1 || lowered.len() > MAX_EXTENSION_LEN || !legal {
        return FALLBACK_EXTENSION.to_string();
    }
    lowered
}

/// `png` out of `data:image/png;base64,...`.
fn embedded_subtype(data_uri: &str) -> Option<&str> {
    let rest = data_uri.strip_prefix("data:image/")?;
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    let (subtype, tail) = rest.split_at(end);
    if subtype.is_empty() || !tail.starts_with(";base64,") {
        return None;
    }
    Some(subtype)
}

/// Extension of the last path segment, ignoring leading-dot names and a
/// trailing bare dot.
fn url_path_extension(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let basename = parsed.path().rsplit('/').next().unwrap_or_default();
    let dot = basename.rfind('.')?;
    if dot == 0 || dot + 1 == basename.len() {
        return None;
    }
    Some(basename[dot..].to_string())
}

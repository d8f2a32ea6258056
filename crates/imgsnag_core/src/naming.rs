use url::Url;

const UNKNOWN: &str = "unknown";
const MAX_COMPONENT_CHARS: usize = 80;

/// How the per-run output directory is named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirNaming {
    /// Last path segment of the target URL.
    #[default]
    Slug,
    /// Local date, `YYYY-MM-DD`.
    Date,
}

/// Directory name for one run. `today` is the caller's formatted local date.
pub fn run_dir_name(naming: DirNaming, target_url: &str, today: &str) -> String {
    match naming {
        DirNaming::Slug => url_slug(target_url),
        DirNaming::Date => sanitize_component(today),
    }
}

/// Filesystem-safe slug from the last path segment of `url`
/// (`https://host/chat/123/` -> `123`). Unparsable URLs and empty paths give
/// `unknown`.
pub fn url_slug(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return UNKNOWN.to_string();
    };
    let path = parsed.path();
    let path = path.strip_suffix('/').unwrap_or(path);
    let segment = path.rsplit('/').next().unwrap_or_default();
    sanitize_component(segment)
}

/// `img_<timestamp-ms>_<index><ext>`; `ext` carries its leading dot.
pub fn image_file_name(timestamp_ms: i64, index: usize, ext: &str) -> String {
    format!("img_{timestamp_ms}_{index}{ext}")
}

/// Windows-safe single path component.
pub fn sanitize_component(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]);
    if cleaned.is_empty() {
        return UNKNOWN.to_string();
    }

    // Collapse runs of underscores.
    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' && prev_underscore {
            continue;
        }
        prev_underscore = c == '_';
        compacted.push(c);
    }

    let mut final_name: String = compacted.chars().take(MAX_COMPONENT_CHARS).collect();
    if is_reserved_windows_name(&final_name) {
        final_name.push('_');
    }
    final_name
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

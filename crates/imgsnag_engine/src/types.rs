use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Network,
    Io,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Io => write!(f, "io error"),
        }
    }
}

/// Result of handling one planned image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Saved { path: PathBuf, bytes: u64 },
    /// Embedded payload that did not decode; no file was written.
    Undecodable,
    Failed { kind: FailureKind, message: String },
}

/// Per-item notifications emitted while downloading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
    /// `embedded` is set for inline data URIs, which are decoded rather than fetched.
    Started {
        index: usize,
        source: String,
        embedded: bool,
    },
    Finished { index: usize, outcome: ItemOutcome },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DownloadSummary {
    pub saved: usize,
    pub failed: usize,
    pub undecodable: usize,
    /// Saved files, ordered by plan index.
    pub files: Vec<PathBuf>,
}

/// What one harvested page produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub url: String,
    pub output_dir: PathBuf,
    pub found: usize,
    pub planned: usize,
    pub summary: DownloadSummary,
}

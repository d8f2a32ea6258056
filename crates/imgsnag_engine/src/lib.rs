//! Imgsnag engine: browser driving, downloads and persistence.
mod browser;
mod config_store;
mod decode;
mod download;
mod engine;
mod fetch;
mod persist;
mod scroll;
mod snapshot;
mod types;

pub use browser::{
    BrowserError, BrowserSettings, ChromeLauncher, ChromeSession, PageRequest, PageSession,
    SessionLauncher, DEFAULT_COOKIE_DOMAIN, DEFAULT_USER_AGENT,
};
pub use config_store::ConfigStore;
pub use decode::{decode_data_uri, EmbeddedDecodeError, EmbeddedImage};
pub use download::{Downloader, LogProgressSink, NullProgressSink, ProgressSink};
pub use engine::{system_clock, Clock, Harvester, RunError, RunSettings};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use scroll::{auto_scroll, ScrollOutcome};
pub use snapshot::{extract_images, HtmlSnapshotLauncher, HtmlSnapshotSession};
pub use types::{DownloadEvent, DownloadSummary, FailureKind, FetchError, ItemOutcome, RunReport};

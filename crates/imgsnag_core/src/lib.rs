//! Imgsnag core: pure planning logic and data model, no IO.
mod config;
mod cookie;
mod descriptor;
mod naming;
mod plan;
mod scroll;
mod source;

pub use config::{HistoryEntry, RunConfig};
pub use cookie::{parse_cookie_string, CookiePair};
pub use descriptor::{ImageDescriptor, ImageScope, DEFAULT_MESSAGE_SELECTOR};
pub use naming::{image_file_name, run_dir_name, sanitize_component, url_slug, DirNaming};
pub use plan::{plan_downloads, DownloadItem, DownloadPlan, IconFilter, PlanStats};
pub use scroll::{ScrollDecision, ScrollMetrics, ScrollPolicy, ScrollTracker};
pub use source::{classify, extension_for, normalize_extension, ImageSource};

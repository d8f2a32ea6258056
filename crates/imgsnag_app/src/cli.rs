//! Command line surface.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use imgsnag_core::{DirNaming, ImageScope, ScrollPolicy};
use imgsnag_engine::{BrowserSettings, FetchSettings, RunSettings};
use log::LevelFilter;
use snag_logging::LogDestination;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum DirNamingArg {
    /// Last path segment of the URL
    Slug,
    /// Today's date, YYYY-MM-DD
    Date,
}

impl From<DirNamingArg> for DirNaming {
    fn from(arg: DirNamingArg) -> Self {
        match arg {
            DirNamingArg::Slug => DirNaming::Slug,
            DirNamingArg::Date => DirNaming::Date,
        }
    }
}

/// Save the images from a chat page, one queued URL per run.
#[derive(Debug, Parser)]
#[command(name = "imgsnag")]
#[command(version)]
pub(crate) struct Cli {
    /// Config file holding the URL queue, cookie and history
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Harvest this URL once, leaving the queue untouched
    #[arg(long)]
    pub url: Option<String>,

    /// Cookie string for --url mode (the queue uses the config's cookie)
    #[arg(long, requires = "url")]
    pub cookie: Option<String>,

    /// Base directory for saved images
    #[arg(short, long, default_value = "images")]
    pub output_dir: PathBuf,

    /// How the per-run subdirectory is named
    #[arg(long, value_enum, default_value_t = DirNamingArg::Slug)]
    pub dir_naming: DirNamingArg,

    /// Take every image on the page instead of only message containers
    #[arg(long, conflicts_with = "selector")]
    pub all_images: bool,

    /// CSS selector for the containers whose images are taken
    #[arg(long)]
    pub selector: Option<String>,

    /// Parallel downloads
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,

    /// Upper bound on auto-scroll steps
    #[arg(long, default_value_t = 200)]
    pub max_scrolls: u32,

    /// Navigation timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub nav_timeout_secs: u64,

    /// Chrome/Chromium executable (auto-detected when omitted)
    #[arg(long)]
    pub chrome: Option<PathBuf>,

    /// Show the browser window instead of running headless
    #[arg(long, conflicts_with = "from_html")]
    pub headed: bool,

    /// Extract from a saved HTML file instead of launching Chrome
    #[arg(long)]
    pub from_html: Option<PathBuf>,

    /// Base URL for relative image sources in --from-html mode
    #[arg(long, requires = "from_html")]
    pub base_url: Option<Url>,

    /// Also write the log to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }

    pub fn scope(&self) -> ImageScope {
        if self.all_images {
            return ImageScope::All;
        }
        match &self.selector {
            Some(css) => ImageScope::Within(css.clone()),
            None => ImageScope::default(),
        }
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            base_dir: self.output_dir.clone(),
            dir_naming: self.dir_naming.into(),
            scope: self.scope(),
            scroll: ScrollPolicy {
                max_steps: self.max_scrolls,
                ..ScrollPolicy::default()
            },
            concurrency: self.concurrency,
            ..RunSettings::default()
        }
    }

    pub fn browser_settings(&self) -> BrowserSettings {
        BrowserSettings {
            chrome_executable: self.chrome.clone(),
            headless: !self.headed,
            navigation_timeout: Duration::from_secs(self.nav_timeout_secs),
            ..BrowserSettings::default()
        }
    }

    /// Remote fetches present the same user agent as the browser.
    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            user_agent: Some(self.browser_settings().user_agent),
            ..FetchSettings::default()
        }
    }
}

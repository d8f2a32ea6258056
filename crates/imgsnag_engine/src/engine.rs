use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local, SecondsFormat, Utc};
use imgsnag_core::{
    parse_cookie_string, plan_downloads, run_dir_name, DirNaming, IconFilter, ImageDescriptor,
    ImageScope, RunConfig, ScrollPolicy,
};
use snag_logging::{snag_debug, snag_info};

use crate::browser::{BrowserError, PageRequest, PageSession, SessionLauncher};
use crate::download::{Downloader, LogProgressSink, ProgressSink};
use crate::fetch::Fetcher;
use crate::persist::{ensure_output_dir, PersistError};
use crate::scroll::auto_scroll;
use crate::RunReport;

/// Source of "now"; injected so tests get stable names and timestamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Local::now)
}

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub base_dir: PathBuf,
    pub dir_naming: DirNaming,
    pub scope: ImageScope,
    pub icon_filter: IconFilter,
    pub scroll: ScrollPolicy,
    pub concurrency: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("images"),
            dir_naming: DirNaming::default(),
            scope: ImageScope::default(),
            icon_filter: IconFilter::default(),
            scroll: ScrollPolicy::default(),
            concurrency: 1,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Browser(#[from] BrowserError),
    #[error("cannot prepare output directory {path:?}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: PersistError,
    },
}

/// One page in, images on disk out.
pub struct Harvester {
    settings: RunSettings,
    launcher: Arc<dyn SessionLauncher>,
    downloader: Downloader,
    sink: Arc<dyn ProgressSink>,
    clock: Clock,
}

impl Harvester {
    pub fn new(
        settings: RunSettings,
        launcher: Arc<dyn SessionLauncher>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        let downloader = Downloader::new(fetcher, settings.concurrency);
        Self {
            settings,
            launcher,
            downloader,
            sink: Arc::new(LogProgressSink),
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Harvest the queue head and hand back the advanced config.
    ///
    /// With an empty queue nothing is launched or written and the config is
    /// returned unchanged with no report.
    pub async fn run_next(
        &self,
        mut config: RunConfig,
    ) -> Result<(RunConfig, Option<RunReport>), RunError> {
        let Some(url) = config.active_url().map(str::to_owned) else {
            snag_info!("No target URLs queued; nothing to do");
            return Ok((config, None));
        };

        let report = self.harvest(&url, &config.cookie).await?;

        let completed_at = (self.clock)()
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        config.complete_active(completed_at);
        Ok((config, Some(report)))
    }

    /// Harvest a single URL without touching any queue.
    pub async fn harvest(&self, url: &str, cookie: &str) -> Result<RunReport, RunError> {
        let today = (self.clock)().format("%Y-%m-%d").to_string();
        let output_dir = self
            .settings
            .base_dir
            .join(run_dir_name(self.settings.dir_naming, url, &today));
        snag_info!("Saving images to {:?}", output_dir);
        ensure_output_dir(&output_dir).map_err(|source| RunError::OutputDir {
            path: output_dir.clone(),
            source,
        })?;

        let request = PageRequest {
            url: url.to_string(),
            cookies: parse_cookie_string(cookie),
        };
        snag_info!("Launching browser...");
        let mut session = self.launcher.open(&request).await?;
        let collected = self.collect(session.as_mut()).await;
        session.close().await;
        let descriptors = collected?;
        snag_info!("Found {} potential images", descriptors.len());

        let clock = Arc::clone(&self.clock);
        let plan = plan_downloads(&descriptors, self.settings.icon_filter, || {
            clock().timestamp_millis()
        });
        snag_debug!("Download plan: {} items, {:?}", plan.items.len(), plan.stats);

        let summary = self
            .downloader
            .download_all(&plan, &output_dir, self.sink.as_ref())
            .await
            .map_err(|source| RunError::OutputDir {
                path: output_dir.clone(),
                source,
            })?;
        snag_info!(
            "Saved {} images to {:?} ({} failed)",
            summary.saved,
            output_dir,
            summary.failed
        );

        Ok(RunReport {
            url: url.to_string(),
            output_dir,
            found: descriptors.len(),
            planned: plan.items.len(),
            summary,
        })
    }

    async fn collect(
        &self,
        session: &mut dyn PageSession,
    ) -> Result<Vec<ImageDescriptor>, BrowserError> {
        auto_scroll(&mut *session, self.settings.scroll).await;
        session.query_images(&self.settings.scope).await
    }
}

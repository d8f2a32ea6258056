//! `imgsnag`: harvest the images from one chat page per run.

mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use imgsnag_engine::{
    ChromeLauncher, ConfigStore, Harvester, HtmlSnapshotLauncher, ReqwestFetcher, RunReport,
    SessionLauncher,
};
use snag_logging::{snag_info, snag_warn};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    snag_logging::initialize(cli.log_destination(), cli.log_level());

    let launcher: Arc<dyn SessionLauncher> = match &cli.from_html {
        Some(path) => Arc::new(HtmlSnapshotLauncher::new(path, cli.base_url.clone())),
        None => Arc::new(ChromeLauncher::new(cli.browser_settings())),
    };
    let fetcher =
        ReqwestFetcher::new(cli.fetch_settings()).context("failed to build the HTTP client")?;
    let harvester = Harvester::new(cli.run_settings(), launcher, Arc::new(fetcher));

    if let Some(url) = cli.url.as_deref() {
        let cookie = cli.cookie.as_deref().unwrap_or_default();
        let report = harvester
            .harvest(url, cookie)
            .await
            .with_context(|| format!("failed to harvest {url}"))?;
        log_report(&report);
        return Ok(());
    }

    let store = ConfigStore::new(&cli.config);
    let (config, report) = harvester
        .run_next(store.load())
        .await
        .context("run aborted")?;
    let Some(report) = report else {
        return Ok(());
    };
    log_report(&report);

    if store.save_or_log(&config) {
        snag_info!(
            "Moved {} to history; {} URL(s) left in the queue",
            report.url,
            config.target_urls.len()
        );
    }
    Ok(())
}

fn log_report(report: &RunReport) {
    snag_info!(
        "{}: {} images found, {} planned, {} saved to {:?}",
        report.url,
        report.found,
        report.planned,
        report.summary.saved,
        report.output_dir
    );
    if report.summary.failed > 0 {
        snag_warn!("{} downloads failed", report.summary.failed);
    }
}

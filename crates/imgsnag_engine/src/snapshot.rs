//! Offline extraction from a saved HTML page.
//!
//! Natural dimensions are not available without rendering, so `width` and
//! `height` come from the element attributes and are 0 when absent.

use std::path::PathBuf;

use imgsnag_core::{ImageDescriptor, ImageScope, ScrollMetrics};
use scraper::{ElementRef, Html, Selector};
use snag_logging::snag_info;
use url::Url;

use crate::browser::{BrowserError, PageRequest, PageSession, SessionLauncher};

/// Serves every request from one HTML file on disk.
#[derive(Debug, Clone)]
pub struct HtmlSnapshotLauncher {
    path: PathBuf,
    base_url: Option<Url>,
}

impl HtmlSnapshotLauncher {
    pub fn new(path: impl Into<PathBuf>, base_url: Option<Url>) -> Self {
        Self {
            path: path.into(),
            base_url,
        }
    }
}

#[async_trait::async_trait]
impl SessionLauncher for HtmlSnapshotLauncher {
    async fn open(&self, request: &PageRequest) -> Result<Box<dyn PageSession>, BrowserError> {
        let html = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|err| BrowserError::Launch(format!("{:?}: {err}", self.path)))?;
        snag_info!("Using HTML snapshot {:?} for {}", self.path, request.url);
        // Without an explicit base, relative sources resolve against the target URL.
        let base_url = self
            .base_url
            .clone()
            .or_else(|| Url::parse(&request.url).ok());
        Ok(Box::new(HtmlSnapshotSession { html, base_url }))
    }
}

#[derive(Debug, Clone)]
pub struct HtmlSnapshotSession {
    html: String,
    base_url: Option<Url>,
}

impl HtmlSnapshotSession {
    pub fn new(html: impl Into<String>, base_url: Option<Url>) -> Self {
        Self {
            html: html.into(),
            base_url,
        }
    }
}

#[async_trait::async_trait]
impl PageSession for HtmlSnapshotSession {
    async fn scroll_step(&mut self, _distance_px: u32) -> Result<ScrollMetrics, BrowserError> {
        Ok(ScrollMetrics::default())
    }

    async fn query_images(
        &mut self,
        scope: &ImageScope,
    ) -> Result<Vec<ImageDescriptor>, BrowserError> {
        extract_images(&self.html, scope, self.base_url.as_ref())
    }

    fn needs_scrolling(&self) -> bool {
        false
    }

    async fn close(self: Box<Self>) {}
}

/// Same scoping rules as the in-page query: containers in document order,
/// then images in document order within each container.
pub fn extract_images(
    html: &str,
    scope: &ImageScope,
    base_url: Option<&Url>,
) -> Result<Vec<ImageDescriptor>, BrowserError> {
    let doc = Html::parse_document(html);
    let img_sel = parse_selector("img")?;

    let images: Vec<ElementRef<'_>> = match scope {
        ImageScope::All => doc.select(&img_sel).collect(),
        ImageScope::Within(css) => {
            let container_sel = parse_selector(css)?;
            doc.select(&container_sel)
                .flat_map(|container| container.select(&img_sel))
                .collect()
        }
    };

    Ok(images
        .into_iter()
        .map(|img| ImageDescriptor {
            src: resolve_src(img.value().attr("src").unwrap_or_default(), base_url),
            width: dimension(img.value().attr("width")),
            height: dimension(img.value().attr("height")),
            alt: img.value().attr("alt").unwrap_or_default().to_string(),
        })
        .collect())
}

fn parse_selector(css: &str) -> Result<Selector, BrowserError> {
    Selector::parse(css)
        .map_err(|err| BrowserError::Evaluation(format!("invalid selector {css:?}: {err}")))
}

fn resolve_src(raw: &str, base_url: Option<&Url>) -> String {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("data:") {
        return raw.to_string();
    }
    match base_url.map(|base| base.join(raw)) {
        Some(Ok(resolved)) => resolved.to_string(),
        _ => raw.to_string(),
    }
}

fn dimension(attr: Option<&str>) -> u32 {
    attr.and_then(|value| value.trim().parse().ok()).unwrap_or(0)
}

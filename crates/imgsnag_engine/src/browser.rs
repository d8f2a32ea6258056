use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::browser::HeadlessMode;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, SetCookiesParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures_util::StreamExt;
use imgsnag_core::{CookiePair, ImageDescriptor, ImageScope, ScrollMetrics};
use serde::Deserialize;
use snag_logging::{snag_debug, snag_info, snag_warn};
use tokio::task::JoinHandle;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const DEFAULT_COOKIE_DOMAIN: &str = ".doubao.com";

#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("invalid browser configuration: {0}")]
    Config(String),
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("page error: {0}")]
    Page(String),
    #[error("page script failed: {0}")]
    Evaluation(String),
}

/// What to open: the target URL and the cookies to install first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub url: String,
    pub cookies: Vec<CookiePair>,
}

/// A rendered page the harvester can scroll and query.
///
/// This is the only surface through which the run touches a browser.
#[async_trait::async_trait]
pub trait PageSession: Send {
    /// Sample the page geometry, then scroll down by `distance_px`.
    async fn scroll_step(&mut self, distance_px: u32) -> Result<ScrollMetrics, BrowserError>;

    /// Image descriptors in document order.
    async fn query_images(
        &mut self,
        scope: &ImageScope,
    ) -> Result<Vec<ImageDescriptor>, BrowserError>;

    /// Static sources have nothing to lazy-load.
    fn needs_scrolling(&self) -> bool {
        true
    }

    /// Release the page and anything backing it.
    async fn close(self: Box<Self>);
}

#[async_trait::async_trait]
pub trait SessionLauncher: Send + Sync {
    /// Open a session on `request.url`. Navigation problems are logged and
    /// the session is still returned; only launch failures are errors.
    async fn open(&self, request: &PageRequest) -> Result<Box<dyn PageSession>, BrowserError>;
}

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub chrome_executable: Option<PathBuf>,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: String,
    pub cookie_domain: String,
    pub navigation_timeout: Duration,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            chrome_executable: None,
            headless: true,
            viewport_width: 1280,
            viewport_height: 1024,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cookie_domain: DEFAULT_COOKIE_DOMAIN.to_string(),
            navigation_timeout: Duration::from_secs(60),
        }
    }
}

/// Launches a local Chrome per session over the DevTools protocol.
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    settings: BrowserSettings,
}

impl ChromeLauncher {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    fn browser_config(&self) -> Result<BrowserConfig, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .window_size(self.settings.viewport_width, self.settings.viewport_height)
            .request_timeout(self.settings.navigation_timeout);

        builder = if self.settings.headless {
            builder.headless_mode(HeadlessMode::New)
        } else {
            builder.with_head()
        };
        if let Some(path) = self.settings.chrome_executable.as_ref() {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(BrowserError::Config)
    }

    async fn prepare_page(&self, browser: &Browser, request: &PageRequest) -> Result<Page, BrowserError> {
        let page = browser.new_page("about:blank").await.map_err(page_error)?;

        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(self.settings.viewport_width),
            i64::from(self.settings.viewport_height),
            1.0,
            false,
        ))
        .await
        .map_err(page_error)?;

        if !request.cookies.is_empty() {
            let cookies = request
                .cookies
                .iter()
                .map(|pair| {
                    CookieParam::builder()
                        .name(pair.name.as_str())
                        .value(pair.value.as_str())
                        .domain(self.settings.cookie_domain.as_str())
                        .build()
                        .map_err(BrowserError::Config)
                })
                .collect::<Result<Vec<_>, _>>()?;
            let count = cookies.len();
            page.execute(SetCookiesParams::new(cookies))
                .await
                .map_err(page_error)?;
            snag_info!("Set {} cookies for {}", count, self.settings.cookie_domain);
        }

        page.execute(SetUserAgentOverrideParams::new(self.settings.user_agent.clone()))
            .await
            .map_err(page_error)?;

        Ok(page)
    }
}

#[async_trait::async_trait]
impl SessionLauncher for ChromeLauncher {
    async fn open(&self, request: &PageRequest) -> Result<Box<dyn PageSession>, BrowserError> {
        let config = self.browser_config()?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| BrowserError::Launch(err.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    snag_debug!("Browser handler error: {}", err);
                }
            }
        });

        let page = match self.prepare_page(&browser, request).await {
            Ok(page) => page,
            Err(err) => {
                shutdown(&mut browser, handler_task).await;
                return Err(err);
            }
        };

        navigate(&page, &request.url, self.settings.navigation_timeout).await;

        Ok(Box::new(ChromeSession {
            browser,
            page,
            handler_task,
        }))
    }
}

pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl ChromeSession {
    async fn eval<T: serde::de::DeserializeOwned>(&self, script: String) -> Result<T, BrowserError> {
        let params = EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(BrowserError::Evaluation)?;
        let result = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(|err| BrowserError::Evaluation(err.to_string()))?;
        result
            .into_value()
            .map_err(|err| BrowserError::Evaluation(err.to_string()))
    }
}

#[async_trait::async_trait]
impl PageSession for ChromeSession {
    async fn scroll_step(&mut self, distance_px: u32) -> Result<ScrollMetrics, BrowserError> {
        let raw: RawScrollMetrics = self.eval(scroll_step_script(distance_px)).await?;
        Ok(raw.into())
    }

    async fn query_images(
        &mut self,
        scope: &ImageScope,
    ) -> Result<Vec<ImageDescriptor>, BrowserError> {
        self.eval(image_query_script(scope)).await
    }

    async fn close(self: Box<Self>) {
        let ChromeSession {
            mut browser,
            page,
            handler_task,
        } = *self;
        drop(page);
        shutdown(&mut browser, handler_task).await;
    }
}

async fn navigate(page: &Page, url: &str, timeout: Duration) {
    snag_info!("Navigating to {}", url);
    let navigation = async {
        page.goto(url).await?;
        page.wait_for_navigation().await?;
        Ok::<_, CdpError>(())
    };
    match tokio::time::timeout(timeout, navigation).await {
        Ok(Ok(())) => snag_debug!("Navigation to {} finished", url),
        Ok(Err(err)) => snag_warn!("Navigation error for {}: {}; continuing", url, err),
        Err(_) => snag_warn!(
            "Navigation to {} timed out after {:?}; continuing",
            url,
            timeout
        ),
    }
}

async fn shutdown(browser: &mut Browser, handler_task: JoinHandle<()>) {
    if let Err(err) = browser.close().await {
        snag_warn!("Failed to close browser: {}", err);
    }
    if let Err(err) = browser.wait().await {
        snag_debug!("Failed to wait for browser exit: {}", err);
    }
    handler_task.abort();
}

fn page_error(err: CdpError) -> BrowserError {
    BrowserError::Page(err.to_string())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScrollMetrics {
    scroll_height: f64,
    viewport_height: f64,
}

impl From<RawScrollMetrics> for ScrollMetrics {
    fn from(raw: RawScrollMetrics) -> Self {
        ScrollMetrics {
            scroll_height: raw.scroll_height.max(0.0) as u64,
            viewport_height: raw.viewport_height.max(0.0) as u64,
        }
    }
}

/// Reads the height before scrolling, matching the order the tracker expects.
pub(crate) fn scroll_step_script(distance_px: u32) -> String {
    format!(
        r#"(() => {{
    const scrollHeight = document.body ? document.body.scrollHeight : 0;
    window.scrollBy(0, {distance_px});
    return {{ scrollHeight, viewportHeight: window.innerHeight }};
}})()"#
    )
}

pub(crate) fn image_query_script(scope: &ImageScope) -> String {
    let scope_literal = match scope {
        ImageScope::All => "null".to_string(),
        // A JSON string is a valid JS string literal.
        ImageScope::Within(selector) => {
            serde_json::to_string(selector).unwrap_or_else(|_| "null".to_string())
        }
    };
    format!(
        r#"(() => {{
    const scope = {scope_literal};
    const roots = scope === null ? [document] : Array.from(document.querySelectorAll(scope));
    const images = [];
    for (const root of roots) {{
        images.push(...root.querySelectorAll('img'));
    }}
    return images.map(img => ({{
        src: img.src || '',
        width: img.naturalWidth || 0,
        height: img.naturalHeight || 0,
        alt: img.alt || ''
    }}));
}})()"#
    )
}

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Local, TimeZone};
use imgsnag_core::{
    CookiePair, DirNaming, ImageDescriptor, ImageScope, RunConfig, ScrollMetrics, ScrollPolicy,
};
use imgsnag_engine::{
    BrowserError, Clock, ConfigStore, FetchSettings, Harvester, NullProgressSink, PageRequest,
    PageSession, ReqwestFetcher, RunError, RunSettings, SessionLauncher,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct Recorder {
    opened: AtomicUsize,
    closed: AtomicUsize,
    scroll_steps: AtomicUsize,
    requests: Mutex<Vec<PageRequest>>,
    scopes: Mutex<Vec<ImageScope>>,
}

/// How the stub page answers scroll steps.
#[derive(Debug, Clone, Copy)]
enum ScrollScript {
    /// Fixed 1300 px page in a 1024 px viewport: bottom after 3 steps.
    Bottom,
    /// Endless page whose step `n` (1-based) fails.
    FailAt(usize),
    /// Page that grows faster than it is scrolled.
    Growing,
}

#[derive(Clone)]
struct StubPage {
    images: Vec<ImageDescriptor>,
    fail_query: bool,
    scroll: ScrollScript,
}

impl StubPage {
    fn with_images(images: Vec<ImageDescriptor>) -> Self {
        Self {
            images,
            fail_query: false,
            scroll: ScrollScript::Bottom,
        }
    }
}

struct StubLauncher {
    recorder: Arc<Recorder>,
    page: StubPage,
}

struct StubSession {
    recorder: Arc<Recorder>,
    page: StubPage,
}

#[async_trait::async_trait]
impl SessionLauncher for StubLauncher {
    async fn open(&self, request: &PageRequest) -> Result<Box<dyn PageSession>, BrowserError> {
        self.recorder.opened.fetch_add(1, Ordering::SeqCst);
        self.recorder.requests.lock().unwrap().push(request.clone());
        Ok(Box::new(StubSession {
            recorder: Arc::clone(&self.recorder),
            page: self.page.clone(),
        }))
    }
}

#[async_trait::async_trait]
impl PageSession for StubSession {
    async fn scroll_step(&mut self, _distance_px: u32) -> Result<ScrollMetrics, BrowserError> {
        let step = self.recorder.scroll_steps.fetch_add(1, Ordering::SeqCst) + 1;
        let scroll_height = match self.page.scroll {
            ScrollScript::Bottom => 1_300,
            ScrollScript::FailAt(n) if step == n => {
                return Err(BrowserError::Page("target closed".into()));
            }
            ScrollScript::FailAt(_) => 1_000_000,
            ScrollScript::Growing => 1_024 + (step as u64 + 2) * 100,
        };
        Ok(ScrollMetrics {
            scroll_height,
            viewport_height: 1_024,
        })
    }

    async fn query_images(
        &mut self,
        scope: &ImageScope,
    ) -> Result<Vec<ImageDescriptor>, BrowserError> {
        self.recorder.scopes.lock().unwrap().push(scope.clone());
        if self.page.fail_query {
            return Err(BrowserError::Evaluation("page crashed".into()));
        }
        Ok(self.page.images.clone())
    }

    async fn close(self: Box<Self>) {
        self.recorder.closed.fetch_add(1, Ordering::SeqCst);
    }
}

fn fixed_clock() -> Clock {
    Arc::new(|| Local.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
}

fn fast_settings(base_dir: &std::path::Path) -> RunSettings {
    RunSettings {
        base_dir: base_dir.to_path_buf(),
        scroll: ScrollPolicy {
            interval: Duration::from_millis(1),
            settle: Duration::ZERO,
            ..ScrollPolicy::default()
        },
        ..RunSettings::default()
    }
}

fn harvester(settings: RunSettings, page: StubPage) -> (Harvester, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let launcher = StubLauncher {
        recorder: Arc::clone(&recorder),
        page,
    };
    let fetcher = ReqwestFetcher::new(FetchSettings::default()).unwrap();
    let harvester = Harvester::new(settings, Arc::new(launcher), Arc::new(fetcher))
        .with_clock(fixed_clock())
        .with_sink(Arc::new(NullProgressSink));
    (harvester, recorder)
}

#[tokio::test]
async fn empty_queue_launches_nothing_and_writes_nothing() {
    snag_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let base_dir = temp.path().join("images");
    let (harvester, recorder) =
        harvester(fast_settings(&base_dir), StubPage::with_images(Vec::new()));

    let config = RunConfig {
        cookie: "sid=1".into(),
        ..RunConfig::default()
    };
    let (returned, report) = harvester.run_next(config.clone()).await.unwrap();

    assert_eq!(returned, config);
    assert!(report.is_none());
    assert_eq!(recorder.opened.load(Ordering::SeqCst), 0);
    assert!(!base_dir.exists());
}

#[tokio::test]
async fn queue_head_is_harvested_and_moved_to_history() {
    snag_logging::initialize_for_tests();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/full.JPEG"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"JPEGDATA".to_vec(), "image/jpeg"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken.png"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    let base = server.uri();

    let temp = TempDir::new().unwrap();
    let base_dir = temp.path().join("images");
    let images = vec![
        ImageDescriptor::new(format!("{base}/avatar.png"), 30, 30),
        ImageDescriptor::new(format!("{base}/full.JPEG"), 1024, 768),
        ImageDescriptor::new(format!("{base}/full.JPEG"), 1024, 768),
        ImageDescriptor::new(format!("{base}/broken.png"), 0, 0),
        ImageDescriptor::new("data:image/png;base64,aGVsbG8=", 64, 64),
    ];
    let (harvester, recorder) =
        harvester(fast_settings(&base_dir), StubPage::with_images(images));

    let config_path = temp.path().join("config.json");
    fs::write(
        &config_path,
        r#"{
            "targetUrls": ["https://www.doubao.com/chat/777", "https://www.doubao.com/chat/778"],
            "cookie": "sid=abc; theme",
            "history": []
        }"#,
    )
    .unwrap();
    let store = ConfigStore::new(&config_path);

    let (config, report) = harvester.run_next(store.load()).await.unwrap();
    let report = report.expect("run report");

    let out_dir = base_dir.join("777");
    assert_eq!(report.output_dir, out_dir);
    assert_eq!(report.found, 5);
    assert_eq!(report.planned, 3);
    assert_eq!(report.summary.saved, 2);
    assert_eq!(report.summary.failed, 1);

    let stamp = Local
        .with_ymd_and_hms(2024, 5, 1, 10, 0, 0)
        .unwrap()
        .timestamp_millis();
    let mut saved: Vec<String> = fs::read_dir(&out_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    saved.sort();
    assert_eq!(
        saved,
        vec![format!("img_{stamp}_0.jpg"), format!("img_{stamp}_2.png")]
    );

    assert_eq!(recorder.opened.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.closed.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.scroll_steps.load(Ordering::SeqCst), 3);
    assert_eq!(
        recorder.scopes.lock().unwrap().clone(),
        vec![ImageScope::default()]
    );
    let request = recorder.requests.lock().unwrap()[0].clone();
    assert_eq!(request.url, "https://www.doubao.com/chat/777");
    assert_eq!(
        request.cookies,
        vec![
            CookiePair {
                name: "sid".into(),
                value: "abc".into()
            },
            CookiePair {
                name: "theme".into(),
                value: String::new()
            },
        ]
    );

    assert_eq!(config.target_urls, vec!["https://www.doubao.com/chat/778"]);
    assert_eq!(config.history.len(), 1);
    assert_eq!(config.history[0].url, "https://www.doubao.com/chat/777");
    assert!(config.history[0].timestamp.ends_with('Z'));

    store.save(&config).unwrap();
    assert_eq!(store.load(), config);
}

#[tokio::test]
async fn date_naming_uses_clock_date() {
    snag_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let settings = RunSettings {
        dir_naming: DirNaming::Date,
        ..fast_settings(temp.path())
    };
    let (harvester, _recorder) = harvester(settings, StubPage::with_images(Vec::new()));

    let report = harvester
        .harvest("https://www.doubao.com/chat/9", "")
        .await
        .unwrap();
    assert_eq!(report.output_dir, temp.path().join("2024-05-01"));
    assert!(report.output_dir.is_dir());
    assert_eq!(report.summary.saved, 0);
}

#[tokio::test]
async fn session_is_closed_when_extraction_fails() {
    snag_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let (harvester, recorder) = harvester(
        fast_settings(temp.path()),
        StubPage {
            fail_query: true,
            ..StubPage::with_images(Vec::new())
        },
    );

    let config = RunConfig {
        target_urls: vec!["https://www.doubao.com/chat/5".into()],
        ..RunConfig::default()
    };
    let err = harvester.run_next(config).await.unwrap_err();
    assert!(matches!(err, RunError::Browser(BrowserError::Evaluation(_))));
    assert_eq!(recorder.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failing_scroll_step_ends_scrolling_but_not_the_run() {
    snag_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let page = StubPage {
        scroll: ScrollScript::FailAt(4),
        ..StubPage::with_images(vec![ImageDescriptor::new(
            "data:image/png;base64,aGVsbG8=",
            0,
            0,
        )])
    };
    let (harvester, recorder) = harvester(fast_settings(temp.path()), page);

    let report = harvester
        .harvest("https://www.doubao.com/chat/31", "")
        .await
        .unwrap();

    assert_eq!(recorder.scroll_steps.load(Ordering::SeqCst), 4);
    assert_eq!(recorder.scopes.lock().unwrap().len(), 1);
    assert_eq!(recorder.closed.load(Ordering::SeqCst), 1);
    assert_eq!(report.summary.saved, 1);
}

#[tokio::test]
async fn growing_page_stops_at_step_cap() {
    snag_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let page = StubPage {
        scroll: ScrollScript::Growing,
        ..StubPage::with_images(Vec::new())
    };
    let (harvester, recorder) = harvester(fast_settings(temp.path()), page);

    harvester
        .harvest("https://www.doubao.com/chat/32", "")
        .await
        .unwrap();

    let cap = ScrollPolicy::default().max_steps as usize;
    assert_eq!(recorder.scroll_steps.load(Ordering::SeqCst), cap);
    assert_eq!(recorder.closed.load(Ordering::SeqCst), 1);
}

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, TimeZone};
use imgsnag_core::{ImageDescriptor, ImageScope, RunConfig, ScrollPolicy};
use imgsnag_engine::{
    extract_images, BrowserError, FetchSettings, Harvester, HtmlSnapshotLauncher,
    NullProgressSink, PageRequest, ReqwestFetcher, RunSettings, SessionLauncher,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use url::Url;

const PAGE: &str = r#"<!doctype html>
<html><body>
  <header><img src="/static/logo.png" width="32" height="32" alt="logo"></header>
  <div data-testid="send_message">
    <p>Here you go</p>
    <img src="/gen/first.png" width="1024" height="1024" alt="first">
    <img src="data:image/png;base64,aGVsbG8=">
  </div>
  <div data-testid="receive_message"><img src="https://cdn.example.com/other.jpg"></div>
  <div data-testid="send_message">
    <img src="second.webp" width=" 640 " height="oops">
  </div>
</body></html>"#;

fn base() -> Url {
    Url::parse("https://www.doubao.com/chat/123").unwrap()
}

#[test]
fn scoped_extraction_keeps_container_order() {
    let images = extract_images(PAGE, &ImageScope::default(), Some(&base())).unwrap();
    assert_eq!(
        images,
        vec![
            ImageDescriptor {
                src: "https://www.doubao.com/gen/first.png".into(),
                width: 1024,
                height: 1024,
                alt: "first".into(),
            },
            ImageDescriptor::new("data:image/png;base64,aGVsbG8=", 0, 0),
            ImageDescriptor::new("https://www.doubao.com/chat/second.webp", 640, 0),
        ]
    );
}

#[test]
fn all_scope_includes_every_image() {
    let images = extract_images(PAGE, &ImageScope::All, Some(&base())).unwrap();
    let srcs: Vec<&str> = images.iter().map(|image| image.src.as_str()).collect();
    assert_eq!(
        srcs,
        vec![
            "https://www.doubao.com/static/logo.png",
            "https://www.doubao.com/gen/first.png",
            "data:image/png;base64,aGVsbG8=",
            "https://cdn.example.com/other.jpg",
            "https://www.doubao.com/chat/second.webp",
        ]
    );
}

#[test]
fn relative_sources_stay_raw_without_base() {
    let images = extract_images(PAGE, &ImageScope::default(), None).unwrap();
    assert_eq!(images[0].src, "/gen/first.png");
}

#[test]
fn invalid_selector_is_an_evaluation_error() {
    let err = extract_images(PAGE, &ImageScope::Within("div[".into()), None).unwrap_err();
    assert!(matches!(err, BrowserError::Evaluation(_)));
}

#[tokio::test]
async fn missing_snapshot_file_fails_to_launch() {
    let temp = TempDir::new().unwrap();
    let launcher = HtmlSnapshotLauncher::new(temp.path().join("absent.html"), None);
    let request = PageRequest {
        url: "https://www.doubao.com/chat/1".into(),
        cookies: Vec::new(),
    };
    let err = launcher.open(&request).await.err().unwrap();
    assert!(matches!(err, BrowserError::Launch(_)));
}

#[tokio::test]
async fn snapshot_run_saves_embedded_images_and_advances_queue() {
    snag_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let html_path = temp.path().join("chat.html");
    fs::write(
        &html_path,
        r#"<div data-testid="send_message">
             <img src="data:image/png;base64,aGVsbG8=">
             <img src="data:image/png;base64,aGVsbG8=">
             <img src="data:image/gif;base64,R0lGODlh" width="16" height="16">
           </div>"#,
    )
    .unwrap();

    let settings = RunSettings {
        base_dir: temp.path().join("images"),
        scroll: ScrollPolicy {
            interval: Duration::from_millis(1),
            settle: Duration::ZERO,
            ..ScrollPolicy::default()
        },
        ..RunSettings::default()
    };
    let fetcher = ReqwestFetcher::new(FetchSettings::default()).unwrap();
    let harvester = Harvester::new(
        settings,
        Arc::new(HtmlSnapshotLauncher::new(&html_path, None)),
        Arc::new(fetcher),
    )
    .with_clock(Arc::new(|| {
        Local.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }))
    .with_sink(Arc::new(NullProgressSink));

    let config = RunConfig {
        target_urls: vec!["https://www.doubao.com/chat/42/".into()],
        ..RunConfig::default()
    };
    let (config, report) = harvester.run_next(config).await.unwrap();
    let report = report.unwrap();

    assert_eq!(report.output_dir, temp.path().join("images").join("42"));
    assert_eq!(report.found, 3);
    assert_eq!(report.planned, 1);
    assert_eq!(report.summary.saved, 1);
    assert_eq!(fs::read(&report.summary.files[0]).unwrap(), b"hello");
    assert!(config.target_urls.is_empty());
    assert_eq!(config.history.len(), 1);
}

use std::path::Path;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use imgsnag_core::{DownloadItem, DownloadPlan, ImageSource};
use snag_logging::{snag_debug, snag_info, snag_warn};

use crate::decode::decode_data_uri;
use crate::fetch::Fetcher;
use crate::persist::{ensure_output_dir, AtomicFileWriter, PersistError};
use crate::{DownloadEvent, DownloadSummary, FailureKind, ItemOutcome};

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: DownloadEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: DownloadEvent) {}
}

/// Reports progress through the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: DownloadEvent) {
        match event {
            DownloadEvent::Started {
                index,
                source,
                embedded,
            } => {
                snag_info!("{}", started_line(index, &source, embedded));
            }
            DownloadEvent::Finished {
                index,
                outcome: ItemOutcome::Saved { path, bytes },
            } => {
                snag_debug!("Saved ({}) {:?}, {} bytes", index + 1, path, bytes);
            }
            DownloadEvent::Finished { .. } => {}
        }
    }
}

fn started_line(index: usize, source: &str, embedded: bool) -> String {
    if embedded {
        format!("Saving embedded image ({})", index + 1)
    } else {
        format!("Downloading ({}): {}", index + 1, source)
    }
}

/// Saves planned images into one directory, at most `concurrency` at a time.
///
/// Items are independent: a failed item is logged and never stops the others.
#[derive(Clone)]
pub struct Downloader {
    fetcher: Arc<dyn Fetcher>,
    concurrency: usize,
}

impl Downloader {
    pub fn new(fetcher: Arc<dyn Fetcher>, concurrency: usize) -> Self {
        Self {
            fetcher,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Save every planned item into `dir`.
    ///
    /// Only an unusable `dir` is an error; it is checked once up front.
    pub async fn download_all(
        &self,
        plan: &DownloadPlan,
        dir: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadSummary, PersistError> {
        ensure_output_dir(dir)?;
        let writer = AtomicFileWriter::new(dir.to_path_buf());

        let mut outcomes: Vec<(usize, ItemOutcome)> = stream::iter(plan.items.iter())
            .map(|item| self.download_one(item, &writer, sink))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        outcomes.sort_by_key(|(index, _)| *index);

        let mut summary = DownloadSummary::default();
        for (_, outcome) in outcomes {
            match outcome {
                ItemOutcome::Saved { path, .. } => {
                    summary.saved += 1;
                    summary.files.push(path);
                }
                ItemOutcome::Undecodable => summary.undecodable += 1,
                ItemOutcome::Failed { .. } => summary.failed += 1,
            }
        }
        Ok(summary)
    }

    async fn download_one(
        &self,
        item: &DownloadItem,
        writer: &AtomicFileWriter,
        sink: &dyn ProgressSink,
    ) -> (usize, ItemOutcome) {
        sink.emit(DownloadEvent::Started {
            index: item.index,
            source: describe(&item.source),
            embedded: matches!(item.source, ImageSource::Embedded { .. }),
        });

        let outcome = match &item.source {
            ImageSource::Embedded { data_uri } => save_embedded(item, data_uri, writer).await,
            ImageSource::Remote { url } => {
                let dest = writer.dir().join(&item.file_name);
                match self.fetcher.fetch_to_file(url, &dest).await {
                    Ok(bytes) => ItemOutcome::Saved { path: dest, bytes },
                    Err(err) => {
                        snag_warn!("Failed to download {}: {}", url, err);
                        ItemOutcome::Failed {
                            kind: err.kind,
                            message: err.message,
                        }
                    }
                }
            }
        };

        sink.emit(DownloadEvent::Finished {
            index: item.index,
            outcome: outcome.clone(),
        });
        (item.index, outcome)
    }
}

/// Decode in place, then write and fsync on the blocking pool so parallel
/// remote downloads keep streaming.
async fn save_embedded(
    item: &DownloadItem,
    data_uri: &str,
    writer: &AtomicFileWriter,
) -> ItemOutcome {
    let image = match decode_data_uri(data_uri) {
        Ok(image) => image,
        Err(err) => {
            snag_debug!("Skipping embedded image {}: {}", item.index, err);
            return ItemOutcome::Undecodable;
        }
    };

    let bytes = image.bytes.len() as u64;
    let writer = writer.clone();
    let file_name = item.file_name.clone();
    let written =
        tokio::task::spawn_blocking(move || writer.write(&file_name, &image.bytes)).await;

    let message = match written {
        Ok(Ok(path)) => return ItemOutcome::Saved { path, bytes },
        Ok(Err(err)) => err.to_string(),
        Err(join_err) => join_err.to_string(),
    };
    snag_warn!("Failed to save embedded image {}: {}", item.file_name, message);
    ItemOutcome::Failed {
        kind: FailureKind::Io,
        message,
    }
}

/// Log-friendly label; data URIs are cut down to their header.
fn describe(source: &ImageSource) -> String {
    match source {
        ImageSource::Remote { url } => url.clone(),
        ImageSource::Embedded { data_uri } => {
            let header = data_uri.split(',').next().unwrap_or_default();
            format!("{header},… ({} chars)", data_uri.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_start_line_names_the_branch() {
        assert_eq!(
            started_line(0, "data:image/png;base64,… (30 chars)", true),
            "Saving embedded image (1)"
        );
        assert_eq!(
            started_line(4, "https://cdn.example.com/a.png", false),
            "Downloading (5): https://cdn.example.com/a.png"
        );
    }
}

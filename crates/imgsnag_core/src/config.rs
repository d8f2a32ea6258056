use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A processed target URL and when it was completed (RFC 3339, UTC).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub timestamp: String,
}

/// Persistent run queue: URLs still to process, the cookie used for every
/// page visit, and the append-only history of completed URLs.
///
/// Keys the program does not know about are kept in `extra` so they survive
/// a load/save cycle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunConfig {
    #[serde(deserialize_with = "null_as_default")]
    pub target_urls: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub history: Vec<HistoryEntry>,
    #[serde(deserialize_with = "null_as_default")]
    pub cookie: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RunConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Pretty JSON with 4-space indentation.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut serializer)?;
        // serde_json only emits valid UTF-8.
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// The URL the next run will process.
    pub fn active_url(&self) -> Option<&str> {
        self.target_urls.first().map(String::as_str)
    }

    pub fn has_pending(&self) -> bool {
        !self.target_urls.is_empty()
    }

    /// Move the active URL from the queue into history.
    ///
    /// Returns the processed URL, or `None` (leaving the config untouched) when
    /// the queue is empty.
    pub fn complete_active(&mut self, completed_at: impl Into<String>) -> Option<String> {
        if self.target_urls.is_empty() {
            return None;
        }
        let url = self.target_urls.remove(0);
        self.history.push(HistoryEntry {
            url: url.clone(),
            timestamp: completed_at.into(),
        });
        Some(url)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

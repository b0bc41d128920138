//! Browsing-history source.
//!
//! Wraps a history export behind the `HistoryStore` trait so the pipeline
//! can be tested against an in-memory store. The shipped implementation
//! reads a JSON export of the browser's history (one object per visited
//! URL, camelCase keys as produced by the history API).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Hard cap on how many history records a single query may request.
pub const MAX_HISTORY_RESULTS: usize = 5000;

/// A single visited page, one per distinct URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub visit_count: u32,
    /// Milliseconds since the epoch.
    #[serde(default)]
    pub last_visit_time: i64,
}

/// Time window selector for a history query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    #[default]
    AllTime,
    LastDay,
    LastWeek,
    LastMonth,
}

const ONE_DAY_MS: i64 = 24 * 60 * 60 * 1000;

impl TimeRange {
    /// Parse a wire value. Unrecognized values fall back to `AllTime`
    /// with a warning rather than failing the request.
    pub fn parse(value: &str) -> Self {
        match value {
            "all_time" => TimeRange::AllTime,
            "last_day" => TimeRange::LastDay,
            "last_week" => TimeRange::LastWeek,
            "last_month" => TimeRange::LastMonth,
            other => {
                log::warn!("invalid time range {other:?}, defaulting to all_time");
                TimeRange::AllTime
            }
        }
    }

    /// Start of the window in epoch milliseconds; 0 means no lower bound.
    pub fn start_time(&self, now_ms: i64) -> i64 {
        match self {
            TimeRange::AllTime => 0,
            TimeRange::LastDay => now_ms - ONE_DAY_MS,
            TimeRange::LastWeek => now_ms - 7 * ONE_DAY_MS,
            TimeRange::LastMonth => now_ms - 30 * ONE_DAY_MS,
        }
    }
}

/// Count- and time-bounded history request.
#[derive(Debug, Clone, Copy)]
pub struct HistoryQuery {
    pub start_time_ms: i64,
    pub max_results: usize,
}

#[derive(thiserror::Error, Debug)]
pub enum HistoryError {
    #[error("history store unavailable: {0}")]
    Unavailable(String),
}

pub trait HistoryStore: Send + Sync {
    /// Usable history for the window: web URLs only, titled, visited at
    /// least once, newest first, one record per URL.
    fn search(&self, query: &HistoryQuery) -> Result<Vec<HistoryRecord>, HistoryError>;
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Keep only records the ranking stages can work with.
fn is_usable(record: &HistoryRecord) -> bool {
    if record.title.trim().is_empty() || record.visit_count == 0 {
        return false;
    }

    match url::Url::parse(&record.url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Normalize a raw export into the canonical record sequence: filter to
/// usable web pages inside the window, collapse duplicate URLs onto the
/// most recent visit, sort newest first and cap the count.
pub fn normalize(
    records: Vec<HistoryRecord>,
    query: &HistoryQuery,
) -> Vec<HistoryRecord> {
    let mut by_url: HashMap<String, usize> = HashMap::new();
    let mut seen: Vec<HistoryRecord> = Vec::new();

    for record in records {
        if !is_usable(&record) || record.last_visit_time < query.start_time_ms {
            continue;
        }

        match by_url.get(&record.url) {
            Some(&i) => {
                if record.last_visit_time > seen[i].last_visit_time {
                    seen[i] = record;
                }
            }
            None => {
                by_url.insert(record.url.clone(), seen.len());
                seen.push(record);
            }
        }
    }

    seen.sort_by(|a, b| b.last_visit_time.cmp(&a.last_visit_time));
    seen.truncate(query.max_results.min(MAX_HISTORY_RESULTS));
    seen
}

/// History store backed by a JSON export file.
pub struct JsonHistoryStore {
    path: PathBuf,
}

impl JsonHistoryStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl HistoryStore for JsonHistoryStore {
    fn search(&self, query: &HistoryQuery) -> Result<Vec<HistoryRecord>, HistoryError> {
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| HistoryError::Unavailable(format!("{}: {e}", self.path.display())))?;

        let records: Vec<HistoryRecord> = serde_json::from_str(&raw)
            .map_err(|e| HistoryError::Unavailable(format!("{}: {e}", self.path.display())))?;

        Ok(normalize(records, query))
    }
}

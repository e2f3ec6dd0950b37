pub mod client;
pub mod history;
pub mod sse;

pub use client::FeedClient;
pub use history::fetch_history;

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

pub const HISTORY_PATH: &str = "/metrics";
pub const FEED_PATH: &str = "/metrics/feed";

/// One sample from the metrics backend, either an element of the history
/// snapshot array or the payload of a live `point` event.
///
/// `ts` is Unix seconds. Every other field of the wire object is a numeric
/// metric collected under its deployment-specific name (e.g. `clicks`/`views`
/// or `clicksA`/`clicksB`); nothing downstream depends on which names exist.
/// `BTreeMap` keeps the metric order deterministic across points.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MetricPoint {
    pub ts: u64,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

/// Events published by the live stream task.
#[derive(Debug, Clone)]
pub enum Event {
    Connected,
    Disconnected(String),
    PointReceived(MetricPoint),
}

#[derive(thiserror::Error, Debug)]
pub enum FeedError {
    #[error("Fetch error: {0}")]
    FetchError(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Stream error: {0}")]
    StreamError(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Where the metrics backend lives. Both endpoints derive from one base URL,
/// matching the server's fixed route table.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    base_url: String,
}

impl FeedConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    pub fn history_url(&self) -> String {
        format!("{}{HISTORY_PATH}", self.base_url)
    }

    pub fn feed_url(&self) -> String {
        format!("{}{FEED_PATH}", self.base_url)
    }
}

use crate::{FeedConfig, FeedError, MetricPoint};

use std::time::Duration;

const HISTORY_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches the one-shot history snapshot.
///
/// Points come back in server order (ascending `ts`). An empty or `null`
/// body is a valid empty snapshot: the backend encodes "no rows yet" as
/// JSON `null`.
pub async fn fetch_history(config: &FeedConfig) -> Result<Vec<MetricPoint>, FeedError> {
    let url = config.history_url();
    log::debug!("fetching history snapshot from {url}");

    let client = reqwest::Client::new();
    let resp = client.get(&url).timeout(HISTORY_TIMEOUT).send().await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(FeedError::InvalidRequest(format!(
            "history fetch returned {}: {}",
            status, body
        )));
    }

    let body = resp.text().await?;
    parse_history(&body)
}

/// Decodes a history response body.
pub fn parse_history(body: &str) -> Result<Vec<MetricPoint>, FeedError> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str::<Option<Vec<MetricPoint>>>(body)
        .map(Option::unwrap_or_default)
        .map_err(|e| FeedError::ParseError(format!("invalid history payload: {e}")))
}

use crate::sse::{SseDecoder, SseEvent};
use crate::{Event, FeedConfig, FeedError, MetricPoint};

use backon::{BackoffBuilder, ExponentialBuilder};
use bytes::Bytes;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum gap between raw reads before the live stream counts as dead.
/// Keep-alive comments count as reads: the backend pings every 30s, so
/// 75s tolerates two missed pings before forcing a reconnect.
const FEED_READ_TIMEOUT: Duration = Duration::from_secs(75);

/// Events buffered per subscription; a consumer that falls further behind
/// loses the oldest events and is told how many it missed.
const EVENT_BUFFER: usize = 256;

/// Creates a backoff iterator for feed reconnection.
/// 1s → 2s → 4s → 8s → ... → 30s max, with jitter to prevent thundering herd.
/// Unlimited retries; the stream loop runs until the client is closed.
fn reconnect_backoff() -> impl Iterator<Item = Duration> {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(1))
        .with_max_delay(Duration::from_secs(30))
        .with_jitter()
        .without_max_times()
        .build()
}

/// Owns the page-lifetime subscription to the live point feed.
///
/// The connection is lazy: nothing is spawned until the first `connect`,
/// and there is never more than one stream task per client. Dropping the
/// client releases the connection.
pub struct FeedClient {
    config: FeedConfig,
    live: Option<LiveStream>,
}

struct LiveStream {
    events: broadcast::Sender<Event>,
    task: JoinHandle<()>,
}

impl FeedClient {
    pub fn new(config: FeedConfig) -> Self {
        Self { config, live: None }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Subscribes to the live point stream, spawning the connection task on
    /// first use. Later calls attach another receiver to the existing
    /// connection instead of opening a second one.
    pub fn connect(&mut self) -> broadcast::Receiver<Event> {
        if let Some(live) = &self.live {
            return live.events.subscribe();
        }

        let (events, receiver) = broadcast::channel(EVENT_BUFFER);
        let task = tokio::spawn(run_stream(self.config.clone(), events.clone()));
        self.live = Some(LiveStream { events, task });
        receiver
    }

    pub fn is_connected(&self) -> bool {
        self.live.is_some()
    }

    /// Stops the stream task. Safe to call more than once; the abort happens
    /// exactly once.
    pub fn close(&mut self) {
        if let Some(live) = self.live.take() {
            live.task.abort();
            log::info!("live metrics stream closed");
        }
    }
}

impl Drop for FeedClient {
    fn drop(&mut self) {
        self.close();
    }
}

enum State {
    Disconnected,
    Connected(PointStream),
}

struct PointStream {
    resp: reqwest::Response,
    decoder: SseDecoder,
}

impl PointStream {
    /// Next decoded event, or `None` once the server closes the stream.
    async fn next_event(&mut self) -> Result<Option<SseEvent>, FeedError> {
        let Self { resp, decoder } = self;
        decode_next(decoder, async || Ok(resp.chunk().await?)).await
    }
}

/// Pulls the next complete event out of `decoder`, reading more chunks
/// through `read` as needed. Each read is individually bounded by
/// `FEED_READ_TIMEOUT`, so keep-alive comment frames hold an otherwise
/// quiet connection open.
async fn decode_next<F>(
    decoder: &mut SseDecoder,
    mut read: F,
) -> Result<Option<SseEvent>, FeedError>
where
    F: AsyncFnMut() -> Result<Option<Bytes>, FeedError>,
{
    loop {
        if let Some(event) = decoder.next_event() {
            return Ok(Some(event));
        }
        match tokio::time::timeout(FEED_READ_TIMEOUT, read()).await {
            Ok(Ok(Some(chunk))) => decoder.feed(&chunk),
            Ok(Ok(None)) => return Ok(None),
            Ok(Err(err)) => return Err(err),
            Err(_) => return Err(FeedError::StreamError("read timed out".to_string())),
        }
    }
}

async fn open_stream(
    config: &FeedConfig,
    last_event_id: Option<&str>,
) -> Result<PointStream, FeedError> {
    let client = reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()?;

    // no total request timeout: the body is open-ended, reads are bounded
    // by FEED_READ_TIMEOUT instead
    let mut request = client
        .get(config.feed_url())
        .header("Accept", "text/event-stream");

    if let Some(id) = last_event_id {
        request = request.header("Last-Event-ID", id);
    }

    let resp = request.send().await?;
    if !resp.status().is_success() {
        return Err(FeedError::InvalidRequest(format!(
            "feed endpoint returned {}",
            resp.status()
        )));
    }

    Ok(PointStream {
        resp,
        decoder: SseDecoder::new(),
    })
}

async fn run_stream(config: FeedConfig, output: broadcast::Sender<Event>) {
    let mut state = State::Disconnected;
    let mut backoff = reconnect_backoff();
    let mut last_event_id: Option<String> = None;

    loop {
        match &mut state {
            State::Disconnected => {
                match open_stream(&config, last_event_id.as_deref()).await {
                    Ok(stream) => {
                        state = State::Connected(stream);
                        backoff = reconnect_backoff();
                        let _ = output.send(Event::Connected);
                    }
                    Err(err) => {
                        if let Some(delay) = backoff.next() {
                            tokio::time::sleep(delay).await;
                        }

                        let _ = output.send(Event::Disconnected(format!(
                            "failed to connect to feed: {err}"
                        )));
                    }
                }
            }
            State::Connected(stream) => match stream.next_event().await {
                Ok(Some(event)) => match event.name.as_str() {
                    "point" => match parse_point(&event.data) {
                        Ok(point) => {
                            let _ = output.send(Event::PointReceived(point));
                        }
                        Err(err) => log::warn!("skipping malformed point: {err}"),
                    },
                    other => log::debug!("ignoring feed event {other:?}"),
                },
                Ok(None) => {
                    // the decoder's sticky id covers ids seen on frames that
                    // never dispatched, e.g. an id-tagged keep-alive
                    if let Some(id) = stream.decoder.last_id() {
                        last_event_id = Some(id.to_string());
                    }
                    state = State::Disconnected;
                    let _ =
                        output.send(Event::Disconnected("stream closed by server".to_string()));
                }
                Err(err) => {
                    if let Some(id) = stream.decoder.last_id() {
                        last_event_id = Some(id.to_string());
                    }
                    state = State::Disconnected;
                    let _ = output.send(Event::Disconnected(err.to_string()));
                }
            },
        }
    }
}

fn parse_point(data: &str) -> Result<MetricPoint, FeedError> {
    serde_json::from_str(data)
        .map_err(|e| FeedError::ParseError(format!("invalid point payload: {e}")))
}

use crate::render::{ChartSurface, Renderer, WindowStrategy};

use feed::{Event, FeedClient, FeedConfig, FeedError, MetricPoint};
use series::{RangeSelection, SeriesBuffer, Window, compute_window};

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};

/// Engine commands from the embedding surface (range controls, unload).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SelectRange(RangeSelection),
    Shutdown,
}

/// The dashboard engine: buffered series state plus the live subscription
/// and chart that surround it.
///
/// Every mutation goes through a `&mut self` entry point and `run` drives
/// them from a single task, so events are processed to completion in
/// arrival order.
pub struct Dashboard<C: ChartSurface> {
    feed: FeedClient,
    buffer: SeriesBuffer,
    renderer: Renderer<C>,
    selection: RangeSelection,
}

impl<C: ChartSurface> Dashboard<C> {
    pub fn new(config: FeedConfig, surface: C) -> Self {
        Self::with_strategy(config, surface, WindowStrategy::default())
    }

    pub fn with_strategy(config: FeedConfig, surface: C, strategy: WindowStrategy) -> Self {
        Self {
            feed: FeedClient::new(config),
            buffer: SeriesBuffer::new(),
            renderer: Renderer::with_strategy(surface, strategy),
            selection: RangeSelection::default(),
        }
    }

    /// One-shot history bootstrap. A non-empty buffer means an earlier
    /// bootstrap already ran, so the fetch is skipped outright.
    pub async fn bootstrap(&mut self) -> Result<(), FeedError> {
        if !self.buffer.is_empty() {
            log::debug!("buffer already seeded, skipping history fetch");
            return Ok(());
        }

        let points = feed::fetch_history(self.feed.config()).await?;
        self.seed_history(points);
        Ok(())
    }

    /// Seeds the buffer from a history snapshot and performs the initial
    /// draw. Ignored when points are already buffered, so revisiting the
    /// bootstrap path cannot duplicate data.
    pub fn seed_history(&mut self, points: Vec<MetricPoint>) {
        if !self.buffer.is_empty() {
            log::debug!("buffer already seeded, ignoring {} points", points.len());
            return;
        }

        if points.is_empty() {
            log::info!("history snapshot is empty, starting with a blank chart");
        } else {
            log::info!("seeded {} history points", points.len());
        }

        for point in points {
            self.buffer.append(point);
        }
        self.renderer.draw(&self.buffer);
    }

    /// Applies a user range selection: recompute the window, one refresh.
    pub fn on_range_selected(&mut self, range: RangeSelection) {
        self.selection = range;
        log::info!("range selected: {range}");

        let window = compute_window(&self.buffer, range, unix_now());
        self.renderer.update(&self.buffer, window);
    }

    /// Applies one live point: append, recompute the window unless the
    /// active range is `All` (that view is never constrained), one refresh.
    pub fn on_point_arrived(&mut self, point: MetricPoint) {
        self.buffer.append(point);

        let window = if self.selection == RangeSelection::All {
            Window::full()
        } else {
            compute_window(&self.buffer, self.selection, unix_now())
        };
        self.renderer.update(&self.buffer, window);
    }

    /// Routes one feed event. Disruptions are logged only: reconnecting is
    /// the transport's job, and a resumed stream just keeps appending.
    pub fn apply_event(&mut self, event: Event) {
        match event {
            Event::Connected => log::info!("live metrics feed connected"),
            Event::Disconnected(reason) => {
                log::warn!("live metrics feed interrupted: {reason}");
            }
            Event::PointReceived(point) => self.on_point_arrived(point),
        }
    }

    /// Runs the engine until `Shutdown` (or the command channel closes):
    /// bootstrap, subscribe to the live feed, then process feed events and
    /// commands one at a time in arrival order.
    ///
    /// A failed bootstrap is logged and the engine continues with an empty
    /// buffer; the live stream fills it from there.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        if let Err(err) = self.bootstrap().await {
            log::error!("history bootstrap failed: {err}");
        }

        let mut events = self.feed.connect();

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => self.apply_event(event),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        log::warn!("dropped {missed} feed events, consumer fell behind");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        log::warn!("feed event channel closed");
                        break;
                    }
                },
                command = commands.recv() => match command {
                    Some(Command::SelectRange(range)) => self.on_range_selected(range),
                    Some(Command::Shutdown) | None => break,
                },
            }
        }

        self.teardown();
    }

    /// Releases the live subscription and the chart. Safe to call twice.
    pub fn teardown(&mut self) {
        self.feed.close();
        self.renderer.teardown();
    }

    pub fn buffer(&self) -> &SeriesBuffer {
        &self.buffer
    }

    pub fn selection(&self) -> RangeSelection {
        self.selection
    }

    pub fn surface(&self) -> &C {
        self.renderer.surface()
    }
}

fn unix_now() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::recording::RecordingSurface;

    use std::collections::BTreeMap;

    fn point(ts: u64, clicks: f64) -> MetricPoint {
        MetricPoint {
            ts,
            values: BTreeMap::from([("clicks".to_string(), clicks)]),
        }
    }

    fn dashboard() -> Dashboard<RecordingSurface> {
        Dashboard::new(
            FeedConfig::new("http://127.0.0.1:9"),
            RecordingSurface::default(),
        )
    }

    #[test]
    fn seeding_twice_changes_nothing() {
        let mut dashboard = dashboard();

        dashboard.seed_history(vec![point(100, 1.0), point(200, 2.0)]);
        dashboard.seed_history(vec![point(300, 3.0)]);

        assert_eq!(dashboard.buffer().len(), 2);
        assert_eq!(dashboard.surface().mounts.len(), 1);
        assert_eq!(dashboard.buffer().snapshot()[1].ts, 200);
    }

    #[test]
    fn empty_seed_then_streamed_point() {
        let mut dashboard = dashboard();

        dashboard.seed_history(Vec::new());
        assert_eq!(dashboard.surface().mounts.len(), 1);
        assert!(dashboard.buffer().is_empty());

        dashboard.apply_event(Event::PointReceived(point(unix_now(), 5.0)));

        assert_eq!(dashboard.buffer().len(), 1);
        assert_eq!(dashboard.surface().patches.len(), 1);
    }

    #[test]
    fn all_view_keeps_the_full_series_visible() {
        let mut dashboard = dashboard();
        let now = unix_now();

        dashboard.seed_history(vec![point(now - 20, 1.0), point(now - 10, 2.0)]);
        dashboard.on_point_arrived(point(now, 3.0));

        assert_eq!(dashboard.selection(), RangeSelection::All);
        let patches = &dashboard.surface().patches;
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].labels, vec![now - 20, now - 10, now]);
    }

    #[test]
    fn fixed_range_windows_live_points() {
        let mut dashboard = dashboard();
        let now = unix_now();

        dashboard.seed_history(vec![point(now - 600, 1.0), point(now - 10, 2.0)]);
        dashboard.on_range_selected(RangeSelection::M5);
        dashboard.on_point_arrived(point(now, 3.0));

        let patches = &dashboard.surface().patches;
        assert_eq!(patches.len(), 2);
        // the point at now-600 sits outside the 5m window both times
        assert_eq!(patches[0].labels, vec![now - 10]);
        assert_eq!(patches[1].labels, vec![now - 10, now]);
    }

    #[test]
    fn switching_back_to_all_clears_axis_bounds() {
        let mut dashboard = Dashboard::with_strategy(
            FeedConfig::new("http://127.0.0.1:9"),
            RecordingSurface::default(),
            WindowStrategy::AxisBounds,
        );
        let now = unix_now();

        dashboard.seed_history(vec![point(now - 100, 1.0), point(now - 50, 2.0)]);
        dashboard.on_range_selected(RangeSelection::H1);
        dashboard.on_range_selected(RangeSelection::All);

        let bounds = &dashboard.surface().bounds;
        assert_eq!(bounds.len(), 2);
        assert!(bounds[0].is_some());
        assert!(bounds[1].is_none());
    }

    #[test]
    fn stream_disruption_is_log_only() {
        let mut dashboard = dashboard();
        dashboard.seed_history(vec![point(100, 1.0)]);

        dashboard.apply_event(Event::Connected);
        dashboard.apply_event(Event::Disconnected("read timed out".to_string()));

        assert_eq!(dashboard.buffer().len(), 1);
        assert_eq!(dashboard.surface().mounts.len(), 1);
        assert!(dashboard.surface().patches.is_empty());
    }

    #[tokio::test]
    async fn bootstrap_skips_the_fetch_once_seeded() {
        let mut dashboard = dashboard();
        dashboard.seed_history(vec![point(100, 1.0)]);

        // the configured endpoint is unreachable, so an actual fetch
        // attempt would error rather than return Ok
        dashboard.bootstrap().await.unwrap();
        assert_eq!(dashboard.buffer().len(), 1);
    }

    #[tokio::test]
    async fn bootstrap_propagates_transport_errors() {
        let mut dashboard = dashboard();

        let result = dashboard.bootstrap().await;
        assert!(matches!(result, Err(FeedError::FetchError(_))));
        assert!(dashboard.buffer().is_empty());
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let (commands, receiver) = mpsc::channel(1);
        commands.send(Command::Shutdown).await.unwrap();

        dashboard().run(receiver).await;
    }
}

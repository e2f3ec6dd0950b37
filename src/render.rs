use feed::MetricPoint;
use series::{SeriesBuffer, TimeBounds, Window};

use std::collections::BTreeSet;

/// Seam to the embedding chart widget. Implementations own the actual
/// plotting; the engine only decides what is visible.
pub trait ChartSurface {
    /// Builds a fresh chart from `view`, replacing any instance a previous
    /// `mount` created.
    fn mount(&mut self, view: &ChartView);

    /// Releases the current chart instance, if any.
    fn unmount(&mut self);

    /// Replaces the plotted data in place, without animation.
    fn patch(&mut self, view: &ChartView);

    /// Constrains the visible x axis, or restores auto-fit with `None`.
    fn set_time_bounds(&mut self, bounds: Option<TimeBounds>);
}

/// Column-oriented snapshot of buffered points, the shape chart widgets
/// consume: one timestamp label per point plus one named value column per
/// metric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartView {
    pub labels: Vec<u64>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub name: String,
    pub values: Vec<f64>,
}

impl ChartView {
    /// Builds columns from row-ordered points. Dataset names come from the
    /// union of metric keys across the points, in lexicographic order; a
    /// point missing a metric plots as a gap.
    pub fn from_points(points: &[MetricPoint]) -> Self {
        let mut names = BTreeSet::new();
        for point in points {
            names.extend(point.values.keys().map(String::as_str));
        }

        let labels = points.iter().map(|p| p.ts).collect();
        let datasets = names
            .into_iter()
            .map(|name| Dataset {
                name: name.to_string(),
                values: points
                    .iter()
                    .map(|p| p.values.get(name).copied().unwrap_or(f64::NAN))
                    .collect(),
            })
            .collect();

        ChartView { labels, datasets }
    }
}

/// How a computed window reaches the surface: slice the data down to the
/// window, or hand the surface the full series and pin its x axis.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WindowStrategy {
    #[default]
    Slice,
    AxisBounds,
}

/// Drives a `ChartSurface` from buffer state.
pub struct Renderer<C: ChartSurface> {
    surface: C,
    strategy: WindowStrategy,
    mounted: bool,
}

impl<C: ChartSurface> Renderer<C> {
    pub fn new(surface: C) -> Self {
        Self::with_strategy(surface, WindowStrategy::default())
    }

    pub fn with_strategy(surface: C, strategy: WindowStrategy) -> Self {
        Self {
            surface,
            strategy,
            mounted: false,
        }
    }

    /// Full (re)initialization from the whole buffer. Tears down any chart
    /// mounted earlier, so repeated draws never leak an instance.
    pub fn draw(&mut self, buffer: &SeriesBuffer) {
        if self.mounted {
            self.surface.unmount();
        }
        self.surface
            .mount(&ChartView::from_points(buffer.snapshot()));
        self.mounted = true;
    }

    /// Incremental refresh after an append or a range switch. Exactly one
    /// patch per call.
    pub fn update(&mut self, buffer: &SeriesBuffer, window: Window) {
        let points = buffer.snapshot();
        match self.strategy {
            WindowStrategy::Slice => {
                self.surface
                    .patch(&ChartView::from_points(&points[window.start..]));
            }
            WindowStrategy::AxisBounds => {
                self.surface.set_time_bounds(window.bounds);
                self.surface.patch(&ChartView::from_points(points));
            }
        }
    }

    /// Releases the mounted chart, if any. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        if self.mounted {
            self.surface.unmount();
            self.mounted = false;
        }
    }

    pub fn surface(&self) -> &C {
        &self.surface
    }
}

/// Headless surface that reports chart activity to the log. Stands in for
/// a real widget when the engine runs without a UI.
#[derive(Debug, Default)]
pub struct LogSurface;

impl ChartSurface for LogSurface {
    fn mount(&mut self, view: &ChartView) {
        let names: Vec<&str> = view.datasets.iter().map(|d| d.name.as_str()).collect();
        log::info!(
            "chart mounted: {} points, datasets {:?}",
            view.labels.len(),
            names
        );
    }

    fn unmount(&mut self) {
        log::info!("chart unmounted");
    }

    fn patch(&mut self, view: &ChartView) {
        log::debug!("chart patched: {} visible points", view.labels.len());
    }

    fn set_time_bounds(&mut self, bounds: Option<TimeBounds>) {
        match bounds {
            Some(b) => log::debug!("chart x axis pinned to [{}, {}]", b.min, b.max),
            None => log::debug!("chart x axis auto-fit"),
        }
    }
}

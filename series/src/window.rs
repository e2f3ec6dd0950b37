use crate::{RangeSelection, SeriesBuffer};

/// Inclusive x-axis bounds, Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBounds {
    pub min: u64,
    pub max: u64,
}

/// Visible portion of a series buffer.
///
/// `start` indexes the first visible point, for renderers that slice the
/// data; `bounds` is the equivalent axis constraint, for renderers that pin
/// the visible axis instead, `None` when the chart should auto-fit the
/// whole series. Both fields describe the same window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub bounds: Option<TimeBounds>,
}

impl Window {
    /// The whole buffer, axis auto-fit.
    pub fn full() -> Self {
        Self {
            start: 0,
            bounds: None,
        }
    }
}

/// Derives the visible window for `range` at wall-clock `now`.
///
/// For a fixed lookback the cutoff is `now - lookback` and the window
/// starts at the first point at-or-after it; nothing strictly before the
/// cutoff is included. When every point is older than the cutoff the full
/// buffer is returned instead of an empty window (that fallback is policy,
/// matching the `All` view). Assumes the buffer's non-decreasing order.
pub fn compute_window(buffer: &SeriesBuffer, range: RangeSelection, now: u64) -> Window {
    let Some(lookback) = range.lookback_secs() else {
        return Window::full();
    };

    let cutoff = now.saturating_sub(lookback);
    let points = buffer.snapshot();
    let start = points.partition_point(|p| p.ts < cutoff);

    if start == points.len() {
        return Window::full();
    }

    Window {
        start,
        bounds: Some(TimeBounds {
            min: cutoff,
            max: now,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use feed::MetricPoint;
    use std::collections::BTreeMap;

    fn buffer_at(timestamps: &[u64]) -> SeriesBuffer {
        let mut buffer = SeriesBuffer::new();
        for &ts in timestamps {
            buffer.append(MetricPoint {
                ts,
                values: BTreeMap::from([("clicks".to_string(), ts as f64)]),
            });
        }
        buffer
    }

    #[test]
    fn five_minute_window_over_sparse_series() {
        let buffer = buffer_at(&[100, 200, 300, 1000]);

        let window = compute_window(&buffer, RangeSelection::M5, 1000);
        assert_eq!(window.start, 3);
        assert_eq!(window.bounds, Some(TimeBounds { min: 700, max: 1000 }));

        let window = compute_window(&buffer, RangeSelection::All, 1000);
        assert_eq!(window, Window::full());
    }

    #[test]
    fn cutoff_boundary_point_is_included() {
        // lookback 1h at now=10_000 puts the cutoff exactly on 6_400
        let buffer = buffer_at(&[5_000, 6_399, 6_400, 9_000]);

        let window = compute_window(&buffer, RangeSelection::H1, 10_000);
        assert_eq!(window.start, 2);

        let points = buffer.snapshot();
        assert!(points[window.start - 1].ts < 6_400);
        assert!(points[window.start].ts >= 6_400);
    }

    #[test]
    fn stale_series_falls_back_to_full_buffer() {
        let buffer = buffer_at(&[100, 200, 300]);

        // every point is older than the 5m cutoff
        let window = compute_window(&buffer, RangeSelection::M5, 1_000_000);
        assert_eq!(window, Window::full());
    }

    #[test]
    fn empty_buffer_yields_full_window() {
        let buffer = SeriesBuffer::new();
        assert_eq!(
            compute_window(&buffer, RangeSelection::H1, 1000),
            Window::full()
        );
        assert_eq!(
            compute_window(&buffer, RangeSelection::All, 1000),
            Window::full()
        );
    }

    #[test]
    fn lookback_longer_than_history_starts_at_zero() {
        let buffer = buffer_at(&[10, 20, 30]);

        // now < lookback saturates the cutoff to zero
        let window = compute_window(&buffer, RangeSelection::W1, 100);
        assert_eq!(window.start, 0);
        assert_eq!(window.bounds, Some(TimeBounds { min: 0, max: 100 }));
    }

    #[test]
    fn window_and_complement_reconstruct_the_buffer() {
        let buffer = buffer_at(&[100, 200, 300, 700, 800, 1000]);
        let window = compute_window(&buffer, RangeSelection::M5, 1000);

        let points = buffer.snapshot();
        let visible = &points[window.start..];
        let hidden = &points[..window.start];

        let rebuilt: Vec<u64> = hidden.iter().chain(visible).map(|p| p.ts).collect();
        let original: Vec<u64> = points.iter().map(|p| p.ts).collect();
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn slice_and_bounds_describe_the_same_window() {
        let buffer = buffer_at(&[100, 650, 700, 701, 900, 1000]);
        let window = compute_window(&buffer, RangeSelection::M5, 1000);
        let bounds = window.bounds.unwrap();

        for (i, point) in buffer.snapshot().iter().enumerate() {
            let sliced_in = i >= window.start;
            let within_bounds = point.ts >= bounds.min && point.ts <= bounds.max;
            assert_eq!(sliced_in, within_bounds, "point at ts={}", point.ts);
        }
    }
}

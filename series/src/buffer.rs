use feed::MetricPoint;

/// Append-only store for the growing dataset, oldest point first.
///
/// Both the history snapshot and the live feed deliver points in
/// non-decreasing `ts` order; the buffer relies on that but does not
/// enforce it. A regression is kept exactly as received and flagged in
/// the log (see `append`). Readers only ever get borrowed views.
#[derive(Debug, Default, Clone)]
pub struct SeriesBuffer {
    points: Vec<MetricPoint>,
}

impl SeriesBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one point at the end. An out-of-order timestamp is appended
    /// anyway and logged, never reordered or dropped.
    pub fn append(&mut self, point: MetricPoint) {
        if let Some(last) = self.points.last()
            && point.ts < last.ts
        {
            log::warn!(
                "timestamp regression in series: {} arrived after {}",
                point.ts,
                last.ts
            );
        }
        self.points.push(point);
    }

    /// Borrowed view of every point, in append order.
    pub fn snapshot(&self) -> &[MetricPoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }
}

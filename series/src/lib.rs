pub mod buffer;
pub mod range;
pub mod window;

pub use buffer::SeriesBuffer;
pub use range::{ParseRangeError, RangeSelection};
pub use window::{TimeBounds, Window, compute_window};

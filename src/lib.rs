pub mod engine;
pub mod logger;
pub mod render;

pub use engine::{Command, Dashboard};
pub use render::{ChartSurface, ChartView, Dataset, LogSurface, Renderer, WindowStrategy};

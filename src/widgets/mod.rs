pub mod chart;
pub mod gauge;

pub use chart::{ChartState, HistoryChart};
pub use gauge::{render_gauge, GaugeKind, GaugeSpec, NOT_AVAILABLE};

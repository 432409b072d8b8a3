mod aggregator;
mod sink;

pub use aggregator::{DEFAULT_CAPACITY, MetricsAggregator, percentile};
pub use sink::{MetricsSink, SharedAggregator};

//! Prometheus metrics

use std::time::Duration;

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Full recompute cycle, regression through alert evaluation
    Recompute,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Latest hedge ratio
    HedgeRatio,
    /// Latest z-score of the spread
    ZScore,
    /// Pearson correlation of the pair
    Correlation,
    /// ADF t-statistic of the spread
    AdfStatistic,
    /// Ticks held per symbol
    BufferLength,
}

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Ticks accepted into a buffer
    TicksIngested,
    /// Ticks evicted from a full buffer
    TicksEvicted,
    /// Cycles that failed to produce a snapshot
    RecomputeFailures,
    /// Alerts that moved into the triggered state
    AlertsTriggered,
}

impl LatencyMetric {
    pub fn name(self) -> &'static str {
        match self {
            LatencyMetric::Recompute => "pairsarb_recompute_latency_ms",
        }
    }
}

impl GaugeMetric {
    pub fn name(self) -> &'static str {
        match self {
            GaugeMetric::HedgeRatio => "pairsarb_hedge_ratio",
            GaugeMetric::ZScore => "pairsarb_z_score",
            GaugeMetric::Correlation => "pairsarb_correlation",
            GaugeMetric::AdfStatistic => "pairsarb_adf_statistic",
            GaugeMetric::BufferLength => "pairsarb_buffer_length",
        }
    }
}

impl CounterMetric {
    pub fn name(self) -> &'static str {
        match self {
            CounterMetric::TicksIngested => "pairsarb_ticks_ingested_total",
            CounterMetric::TicksEvicted => "pairsarb_ticks_evicted_total",
            CounterMetric::RecomputeFailures => "pairsarb_recompute_failures_total",
            CounterMetric::AlertsTriggered => "pairsarb_alerts_triggered_total",
        }
    }
}

/// Register metric descriptions with the installed recorder
pub fn describe_metrics() {
    metrics::describe_histogram!(
        LatencyMetric::Recompute.name(),
        metrics::Unit::Milliseconds,
        "Time to recompute and publish one analytics snapshot"
    );
    metrics::describe_gauge!(GaugeMetric::HedgeRatio.name(), "Latest hedge ratio");
    metrics::describe_gauge!(GaugeMetric::ZScore.name(), "Latest spread z-score");
    metrics::describe_gauge!(GaugeMetric::Correlation.name(), "Pair correlation");
    metrics::describe_gauge!(GaugeMetric::AdfStatistic.name(), "ADF statistic of the spread");
    metrics::describe_gauge!(GaugeMetric::BufferLength.name(), "Buffered ticks per symbol");
    metrics::describe_counter!(CounterMetric::TicksIngested.name(), "Ticks ingested");
    metrics::describe_counter!(CounterMetric::TicksEvicted.name(), "Ticks evicted from full buffers");
    metrics::describe_counter!(CounterMetric::RecomputeFailures.name(), "Failed recompute cycles");
    metrics::describe_counter!(CounterMetric::AlertsTriggered.name(), "Alerts triggered");
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    metrics::histogram!(metric.name()).record(duration.as_secs_f64() * 1000.0);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    metrics::gauge!(metric.name()).set(value);
}

/// Set a gauge value labelled with a symbol
pub fn set_symbol_gauge(metric: GaugeMetric, symbol: &str, value: f64) {
    metrics::gauge!(metric.name(), "symbol" => symbol.to_string()).set(value);
}

/// Increment a counter
pub fn increment_counter(metric: CounterMetric, by: u64) {
    metrics::counter!(metric.name()).increment(by);
}

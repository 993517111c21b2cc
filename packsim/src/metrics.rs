//! Metrics collection for simulation analysis.

use packrat::Timestamp;

/// Simulation metrics collected over a run.
#[derive(Debug, Clone, Default)]
pub struct SimMetrics {
    /// Total frames put on the air.
    pub messages_sent: u64,
    /// Frame deliveries lost to link loss or inactive links.
    pub messages_dropped: u64,
    /// Frame deliveries that reached a node.
    pub messages_delivered: u64,
}

impl SimMetrics {
    /// Create new empty metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fraction of scheduled deliveries that arrived (1.0 when nothing
    /// was sent).
    pub fn delivery_rate(&self) -> f64 {
        let attempted = self.messages_delivered + self.messages_dropped;
        if attempted == 0 {
            return 1.0;
        }
        self.messages_delivered as f64 / attempted as f64
    }
}

/// Result of running a simulation.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// Final simulation time.
    pub end_time: Timestamp,
    /// Collected metrics.
    pub metrics: SimMetrics,
    /// Whether simulation ended due to event queue exhaustion (vs time
    /// limit).
    pub queue_exhausted: bool,
}

use crate::trial::{TrialMetrics, partition};
use isofitts_core::{CaptureRule, RunStatus, SessionLog, WidthConvention};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Containment test used when counting overshoots.
    pub capture_rule: CaptureRule,
    /// Goal extent used as the Fitts' law width.
    pub width: WidthConvention,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub run_id: String,
    pub status: RunStatus,
    pub overshoot_count: usize,
    pub mean_efficiency: Option<f64>,
    pub mean_throughput: Option<f64>,
    pub trials: Vec<TrialMetrics>,
}

impl SessionMetrics {
    /// Trials whose efficiency and throughput are both defined.
    pub fn complete_trials(&self) -> usize {
        self.trials
            .iter()
            .filter(|t| t.efficiency.is_some() && t.throughput.is_some())
            .count()
    }
}

/// Computes overshoots, efficiency and throughput for one log.
///
/// Means skip trials where the value is undefined and are `None` when no
/// trial has one. Summation follows trial order, so the result is the same
/// on every call.
pub fn analyze(log: &SessionLog, config: &MetricsConfig) -> SessionMetrics {
    let trials: Vec<TrialMetrics> = partition(log.events())
        .iter()
        .map(|slice| TrialMetrics::compute(slice, config.capture_rule, config.width))
        .collect();

    let overshoot_count = trials.iter().map(|t| t.overshoots).sum();
    let mean_efficiency = mean(trials.iter().filter_map(|t| t.efficiency));
    let mean_throughput = mean(trials.iter().filter_map(|t| t.throughput));

    debug!(
        run_id = log.run_id(),
        trials = trials.len(),
        overshoot_count,
        ?mean_efficiency,
        ?mean_throughput,
        "session analyzed"
    );

    SessionMetrics {
        run_id: log.run_id().to_string(),
        status: log.status(),
        overshoot_count,
        mean_efficiency,
        mean_throughput,
        trials,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

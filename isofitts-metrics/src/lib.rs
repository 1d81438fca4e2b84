//! Offline Fitts' law metrics over persisted session logs: overshoots, path
//! efficiency and throughput per trial and per session, plus a batch mode
//! for a whole results directory.

pub mod batch;
pub mod session;
pub mod trial;

pub use batch::{
    LabelSummary, RunReport, analyze_dir, analyze_file, collect_logs, label_from_run_id,
    summarize_by_label, write_report,
};
pub use session::{MetricsConfig, SessionMetrics, analyze};
pub use trial::{DegenerateMetric, TrialMetrics, TrialSlice, count_overshoots, partition};

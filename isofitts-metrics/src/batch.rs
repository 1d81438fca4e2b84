use crate::session::{MetricsConfig, SessionMetrics, analyze};
use isofitts_core::{Result, SessionLog, run_id_from_path, write_atomically};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{debug, info, warn};

/// Outcome for one persisted log. Exactly one of `metrics` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    /// Condition tag from `fitts_<label>_<timestamp>` file names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<SessionMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    pub fn is_ok(&self) -> bool {
        self.metrics.is_some()
    }
}

/// Mean session values across every run sharing a label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSummary {
    pub label: String,
    pub runs: usize,
    pub mean_overshoots: f64,
    pub mean_efficiency: Option<f64>,
    pub mean_throughput: Option<f64>,
}

/// `fitts_<label>_<date>_<time>` yields `<label>`; labels may contain
/// underscores themselves.
pub fn label_from_run_id(run_id: &str) -> Option<String> {
    let rest = run_id.strip_prefix("fitts_")?;
    let mut parts: Vec<&str> = rest.split('_').collect();
    if parts.len() < 3 {
        return None;
    }
    let time = parts.pop()?;
    let date = parts.pop()?;
    let stamp_like = |s: &str, len| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());
    if !stamp_like(date, 8) || !stamp_like(time, 6) {
        return None;
    }
    Some(parts.join("_"))
}

/// Completed `*.json` logs in `dir`, sorted by path. In-flight
/// `*.json.tmp` files are skipped.
pub fn collect_logs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Loads and analyzes one log. The run id comes from the file name, both
/// in the report and in its metrics, even when the log header disagrees.
pub fn analyze_file(path: &Path, config: &MetricsConfig) -> RunReport {
    let run_id = run_id_from_path(path);
    let label = label_from_run_id(&run_id);
    match SessionLog::load(path) {
        Ok(log) => {
            let mut metrics = analyze(&log, config);
            if metrics.run_id != run_id {
                debug!(file = %run_id, header = %metrics.run_id, "log was renamed");
                metrics.run_id.clone_from(&run_id);
            }
            RunReport {
                run_id,
                label,
                path: path.to_path_buf(),
                metrics: Some(metrics),
                error: None,
            }
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping unreadable log");
            RunReport {
                run_id,
                label,
                path: path.to_path_buf(),
                metrics: None,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Analyzes every log in `dir` across scoped worker threads.
///
/// A log that fails to load becomes a report carrying the error; only an
/// unreadable directory fails the call. Reports come back sorted by run id.
pub fn analyze_dir(dir: &Path, config: &MetricsConfig) -> Result<Vec<RunReport>> {
    let paths = collect_logs(dir)?;
    if paths.is_empty() {
        info!(dir = %dir.display(), "no session logs found");
        return Ok(Vec::new());
    }

    let workers = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(paths.len());
    let chunk_len = paths.len().div_ceil(workers);

    let mut reports = thread::scope(|scope| -> Result<Vec<RunReport>> {
        let mut handles = Vec::with_capacity(workers);
        for (i, chunk) in paths.chunks(chunk_len).enumerate() {
            let handle = thread::Builder::new()
                .name(format!("isofitts-metrics-{i}"))
                .spawn_scoped(scope, move || {
                    chunk
                        .iter()
                        .map(|path| analyze_file(path, config))
                        .collect::<Vec<_>>()
                })?;
            handles.push(handle);
        }

        let mut reports = Vec::with_capacity(paths.len());
        for handle in handles {
            match handle.join() {
                Ok(batch) => reports.extend(batch),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        Ok(reports)
    })?;

    reports.sort_by(|a, b| a.run_id.cmp(&b.run_id).then_with(|| a.path.cmp(&b.path)));

    let failed = reports.iter().filter(|r| !r.is_ok()).count();
    info!(
        dir = %dir.display(),
        runs = reports.len(),
        failed,
        workers,
        "batch analysis finished"
    );
    Ok(reports)
}

/// Groups successful reports by label, in label order. Unlabelled runs are
/// left out.
pub fn summarize_by_label(reports: &[RunReport]) -> Vec<LabelSummary> {
    let mut groups: std::collections::BTreeMap<&str, Vec<&SessionMetrics>> = Default::default();
    for report in reports {
        if let (Some(label), Some(metrics)) = (&report.label, &report.metrics) {
            groups.entry(label.as_str()).or_default().push(metrics);
        }
    }

    groups
        .into_iter()
        .map(|(label, runs)| {
            let n = runs.len() as f64;
            let efficiencies: Vec<f64> = runs.iter().filter_map(|m| m.mean_efficiency).collect();
            let throughputs: Vec<f64> = runs.iter().filter_map(|m| m.mean_throughput).collect();
            let defined_mean = |values: Vec<f64>| {
                (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
            };
            LabelSummary {
                label: label.to_string(),
                runs: runs.len(),
                mean_overshoots: runs.iter().map(|m| m.overshoot_count as f64).sum::<f64>() / n,
                mean_efficiency: defined_mean(efficiencies),
                mean_throughput: defined_mean(throughputs),
            }
        })
        .collect()
}

/// Writes `reports` as pretty-printed JSON, staged and renamed into place
/// like a session log.
pub fn write_report(path: &Path, reports: &[RunReport]) -> Result<()> {
    write_atomically(path, |writer| {
        serde_json::to_writer_pretty(&mut *writer, reports).map_err(io::Error::other)?;
        writer.write_all(b"\n")
    })?;
    info!(path = %path.display(), runs = reports.len(), "report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_come_from_run_ids() {
        assert_eq!(
            label_from_run_id("fitts_lda_20260101_120000").as_deref(),
            Some("lda")
        );
        assert_eq!(
            label_from_run_id("fitts_my_svm_20260101_120000").as_deref(),
            Some("my_svm")
        );
        assert_eq!(label_from_run_id("fitts_20260101_120000"), None);
        assert_eq!(label_from_run_id("fitts_lda_notadate_120000"), None);
        assert_eq!(label_from_run_id("session"), None);
    }

    #[test]
    fn collect_skips_temp_and_other_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.json", "a.json", "c.json.tmp", "notes.txt"] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        let names: Vec<String> = collect_logs(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(analyze_dir(&missing, &MetricsConfig::default()).is_err());
    }

    #[test]
    fn label_summary_averages_defined_values() {
        let report = |run_id: &str, eff: Option<f64>, overshoots| RunReport {
            run_id: run_id.to_string(),
            label: label_from_run_id(run_id),
            path: PathBuf::from(format!("{run_id}.json")),
            metrics: Some(SessionMetrics {
                run_id: run_id.to_string(),
                status: isofitts_core::RunStatus::Completed,
                overshoot_count: overshoots,
                mean_efficiency: eff,
                mean_throughput: None,
                trials: Vec::new(),
            }),
            error: None,
        };
        let reports = vec![
            report("fitts_svm_20260101_120000", Some(0.5), 1),
            report("fitts_lda_20260101_120000", Some(0.8), 2),
            report("fitts_lda_20260102_120000", None, 4),
            report("loose", Some(0.1), 9),
        ];
        let summary = summarize_by_label(&reports);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].label, "lda");
        assert_eq!(summary[0].runs, 2);
        assert_eq!(summary[0].mean_overshoots, 3.0);
        assert_eq!(summary[0].mean_efficiency, Some(0.8));
        assert_eq!(summary[0].mean_throughput, None);
        assert_eq!(summary[1].label, "svm");
    }
}

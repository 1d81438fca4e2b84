use crate::config::AppConfig;
use anyhow::Context;
use isofitts_metrics::{analyze_dir, summarize_by_label, write_report, RunReport};
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

pub fn run_analyze(dir: &Path, report: Option<&Path>, config: &AppConfig) -> anyhow::Result<()> {
    let reports = analyze_dir(dir, &config.metrics)
        .with_context(|| format!("analyzing session logs in {}", dir.display()))?;

    print!("{}", format_table(&reports));

    let summary = summarize_by_label(&reports);
    if summary.len() > 1 {
        println!();
        println!(
            "{:<16} {:>5} {:>11} {:>11} {:>12}",
            "label", "runs", "overshoots", "efficiency", "throughput"
        );
        for s in &summary {
            println!(
                "{:<16} {:>5} {:>11.2} {:>11} {:>12}",
                s.label,
                s.runs,
                s.mean_overshoots,
                fmt_opt(s.mean_efficiency, 3),
                fmt_opt(s.mean_throughput, 3),
            );
        }
    }

    if let Some(path) = report {
        write_report(path, &reports)?;
        info!(path = %path.display(), "wrote metrics report");
    }
    Ok(())
}

/// One line per run; failed runs show their error instead of numbers.
pub fn format_table(reports: &[RunReport]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<36} {:>9} {:>7} {:>11} {:>11} {:>12}",
        "run", "status", "trials", "overshoots", "efficiency", "throughput"
    );
    for report in reports {
        match (&report.metrics, &report.error) {
            (Some(m), _) => {
                let _ = writeln!(
                    out,
                    "{:<36} {:>9} {:>7} {:>11} {:>11} {:>12}",
                    report.run_id,
                    format!("{:?}", m.status).to_lowercase(),
                    m.trials.len(),
                    m.overshoot_count,
                    fmt_opt(m.mean_efficiency, 3),
                    fmt_opt(m.mean_throughput, 3),
                );
            }
            (None, error) => {
                let _ = writeln!(
                    out,
                    "{:<36} error: {}",
                    report.run_id,
                    error.as_deref().unwrap_or("unknown")
                );
            }
        }
    }
    if reports.is_empty() {
        out.push_str("(no session logs)\n");
    }
    out
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.precision$}"))
}

use crate::cli::SourceKind;
use crate::config::{validate_label, AppConfig};
use anyhow::Context;
use isofitts_core::SessionLog;
use isofitts_experiment::{
    drive, ControlSource, DriveOptions, DriveSummary, SimulatedOperator, TrialEngine, UdpSource,
};
use isofitts_metrics::{analyze, SessionMetrics};
use isofitts_timing::{HighPrecisionTimer, Timer};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Overrides from the command line; `None` falls back to the config file.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub source: SourceKind,
    pub bind: Option<String>,
    pub label: Option<String>,
    pub seed: u64,
    pub output: Option<PathBuf>,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub log: Arc<SessionLog>,
    pub saved_to: PathBuf,
    pub summary: DriveSummary,
    pub metrics: SessionMetrics,
}

pub fn run_id_for(label: &str) -> String {
    format!(
        "fitts_{label}_{}",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    )
}

/// Runs a live session on the wall clock.
pub fn run_session(
    config: &AppConfig,
    options: &RunOptions,
    abort: &AtomicBool,
) -> anyhow::Result<RunOutcome> {
    let label = options.label.as_deref().unwrap_or(&config.session.label);
    validate_label(label)?;
    let results_dir = options
        .output
        .clone()
        .unwrap_or_else(|| config.session.results_dir.clone());

    let engine = TrialEngine::new(config.engine.clone(), HighPrecisionTimer::new())?
        .with_run_id(run_id_for(label));

    let labels = config.engine.labels.clone();
    let mut source: Box<dyn ControlSource> = match options.source {
        SourceKind::Udp => {
            let addr = options.bind.as_deref().unwrap_or(&config.session.bind_addr);
            let udp = UdpSource::bind(addr, labels)
                .with_context(|| format!("binding control socket {addr}"))?;
            info!(addr = %udp.local_addr()?, "listening for classifier decisions");
            Box::new(udp)
        }
        SourceKind::Sim => {
            info!(
                seed = options.seed,
                error_rate = config.session.sim_error_rate,
                "using simulated operator"
            );
            Box::new(SimulatedOperator::seeded(
                options.seed,
                labels,
                config.session.sim_error_rate,
            ))
        }
    };

    let mut drive_options = DriveOptions::from_hz(config.session.tick_hz);
    drive_options.max_ticks = config.session.max_ticks;

    execute(
        engine,
        source.as_mut(),
        &drive_options,
        abort,
        &results_dir,
        config,
    )
}

/// Drives `engine` to the end, persists its log and computes its metrics.
pub fn execute<T, S>(
    mut engine: TrialEngine<T>,
    source: &mut S,
    drive_options: &DriveOptions,
    abort: &AtomicBool,
    results_dir: &Path,
    config: &AppConfig,
) -> anyhow::Result<RunOutcome>
where
    T: Timer<Timestamp = u64>,
    S: ControlSource + ?Sized,
{
    info!(
        run_id = engine.log().run_id(),
        hz = 1.0 / drive_options.tick_interval.as_secs_f64(),
        "session started, press Ctrl+C to abort"
    );
    let summary = drive(&mut engine, source, drive_options, abort);
    let log = engine.finalize();
    let saved_to = persist(&log, results_dir)?;

    let metrics = analyze(&log, &config.metrics);
    info!(
        run_id = %metrics.run_id,
        status = ?metrics.status,
        trials = metrics.trials.len(),
        overshoots = metrics.overshoot_count,
        efficiency = ?metrics.mean_efficiency,
        throughput_bps = ?metrics.mean_throughput,
        "session metrics"
    );

    Ok(RunOutcome {
        log,
        saved_to,
        summary,
        metrics,
    })
}

/// Saves into `dir`, falling back to the system temp directory so a
/// finished run is never lost to a bad results path.
pub fn persist(log: &SessionLog, dir: &Path) -> anyhow::Result<PathBuf> {
    match log.save(dir) {
        Ok(path) => {
            info!(path = %path.display(), events = log.len(), "session log saved");
            Ok(path)
        }
        Err(e) => {
            error!(error = %e, "could not save session log, trying temp directory");
            let fallback = std::env::temp_dir().join("isofitts");
            let path = log
                .save(&fallback)
                .with_context(|| format!("saving session log to fallback {}", fallback.display()))?;
            warn!(path = %path.display(), "session log saved to fallback location");
            Ok(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isofitts_core::{LabelMap, RunStatus};
    use isofitts_experiment::{EngineConfig, ScriptedSource, StopReason};
    use isofitts_timing::ManualTimer;
    use tempfile::TempDir;

    fn config() -> AppConfig {
        AppConfig {
            engine: EngineConfig {
                max_trials: 3,
                dwell_threshold_secs: 0.2,
                ..EngineConfig::default()
            },
            ..AppConfig::default()
        }
    }

    #[test]
    fn run_ids_embed_label_and_timestamp() {
        let id = run_id_for("lda");
        assert!(id.starts_with("fitts_lda_"));
        assert_eq!(id.len(), "fitts_lda_".len() + "YYYYmmdd_HHMMSS".len());
        assert_eq!(
            isofitts_metrics::label_from_run_id(&id).as_deref(),
            Some("lda")
        );
    }

    #[test]
    fn simulated_run_is_saved_and_summarized() {
        let dir = TempDir::new().unwrap();
        let config = config();
        let engine = TrialEngine::new(config.engine.clone(), ManualTimer::new())
            .unwrap()
            .with_run_id("fitts_sim_20260101_000000");
        let mut op = SimulatedOperator::seeded(5, LabelMap::default(), 0.0);

        let outcome = execute(
            engine,
            &mut op,
            &DriveOptions::default(),
            &AtomicBool::new(false),
            dir.path(),
            &config,
        )
        .unwrap();

        assert_eq!(outcome.summary.stop, StopReason::RunEnded);
        assert_eq!(outcome.log.status(), RunStatus::Completed);
        assert_eq!(
            outcome.saved_to,
            dir.path().join("fitts_sim_20260101_000000.json")
        );
        assert_eq!(outcome.metrics.trials.len(), 3);
        assert!(outcome.metrics.mean_throughput.unwrap().is_finite());
        assert_eq!(SessionLog::load(&outcome.saved_to).unwrap(), *outcome.log);
    }

    #[test]
    fn unwritable_results_dir_falls_back_to_temp() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();

        let run_id = format!("fitts_fallback_{}", std::process::id());
        let engine = TrialEngine::new(config().engine, ManualTimer::new())
            .unwrap()
            .with_run_id(run_id.clone());
        let mut source = ScriptedSource::new(Vec::new());

        let outcome = execute(
            engine,
            &mut source,
            &DriveOptions::default(),
            &AtomicBool::new(false),
            &blocker.join("results"),
            &config(),
        )
        .unwrap();

        assert_eq!(outcome.log.status(), RunStatus::Aborted);
        assert!(outcome.saved_to.starts_with(std::env::temp_dir()));
        assert!(outcome.saved_to.exists());
        std::fs::remove_file(&outcome.saved_to).unwrap();
    }
}

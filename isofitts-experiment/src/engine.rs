use super::config::EngineConfig;
use super::dwell::{DwellMachine, DwellState};
use super::sequencer::TargetSequencer;
use isofitts_core::{
    Circle, ControlDecision, Cursor, LogEvent, Result, RunStatus, SessionLog, Target,
    contains_with, layout,
};
use isofitts_timing::{Timer, secs};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Renderable state after a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub cursor: Cursor,
    pub goal: Target,
    pub goal_index: usize,
    pub trial: usize,
    pub max_trials: usize,
    pub dwell: DwellState,
    /// Set on the tick a selection was confirmed.
    pub confirmed: bool,
    pub terminal: bool,
}

/// Runs one session of `max_trials` target acquisitions, one tick per
/// control decision.
pub struct TrialEngine<T>
where
    T: Timer<Timestamp = u64>,
{
    config: EngineConfig,
    timer: T,
    targets: Vec<Target>,
    sequencer: TargetSequencer,
    dwell: DwellMachine,
    cursor: Cursor,
    trial: usize,
    status: RunStatus,
    ticks: u64,
    log: SessionLog,
    finalized: Option<Arc<SessionLog>>,
}

impl<T> TrialEngine<T>
where
    T: Timer<Timestamp = u64>,
{
    pub fn new(config: EngineConfig, timer: T) -> Result<Self> {
        config.validate()?;

        let center = config.viewport.center();
        let targets = layout(
            center,
            config.layout_radius,
            config.target_radius,
            config.target_count,
        )?;
        let run_id = chrono::Local::now()
            .format("fitts_%Y%m%d_%H%M%S")
            .to_string();

        info!(
            targets = config.target_count,
            max_trials = config.max_trials,
            dwell_secs = config.dwell_threshold_secs,
            "trial engine ready"
        );

        Ok(Self {
            sequencer: TargetSequencer::new(config.target_count),
            dwell: DwellMachine::new(config.dwell_threshold()),
            cursor: Circle::new(center.0, center.1, config.cursor_radius),
            trial: 0,
            status: RunStatus::Running,
            ticks: 0,
            log: SessionLog::new(run_id),
            finalized: None,
            targets,
            timer,
            config,
        })
    }

    /// Replaces the generated run identifier. Call before the first tick.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.log = SessionLog::new(run_id);
        self
    }

    pub fn tick(&mut self, decision: &ControlDecision, dt: Duration) -> Snapshot {
        if self.is_terminal() {
            return self.snapshot();
        }
        let now = self.timer.now();
        self.ticks += 1;

        if !decision.is_well_formed() {
            self.log.record_malformed();
            debug!(
                label = decision.label,
                magnitude = ?decision.magnitude,
                "malformed control decision treated as neutral"
            );
        }
        let command = decision.effective_command();
        let step = if command.is_motion() {
            self.config.velocity * self.config.gain.apply(decision.magnitude)
        } else {
            0.0
        };
        let (ux, uy) = command.unit_vector();
        let direction = self.integrate(ux * step, uy * step);

        let goal_index = self.sequencer.current();
        let goal = self.targets[goal_index];
        let inside = contains_with(&self.cursor, &goal, self.config.capture_rule);
        let confirmed = self.dwell.update(inside, dt, now) == DwellState::Confirmed;

        if self.config.logging_enabled {
            self.log.push(LogEvent {
                trial: self.trial,
                goal,
                clock_secs: secs(now),
                cursor: self.cursor,
                label: decision.label,
                magnitude: decision.magnitude,
                direction,
            });
        }

        if confirmed {
            self.complete_trial(goal_index);
        }

        Snapshot {
            confirmed,
            ..self.snapshot()
        }
    }

    /// Moves the cursor, dropping the component of the move on any axis
    /// that would leave the viewport. Returns the applied motion.
    fn integrate(&mut self, dx: f64, dy: f64) -> (f64, f64) {
        let width = self.config.viewport.width as f64;
        let height = self.config.viewport.height as f64;

        let x = self.cursor.x + dx;
        let applied_x = if (0.0..=width).contains(&x) {
            self.cursor.x = x;
            dx
        } else {
            0.0
        };

        let y = self.cursor.y + dy;
        let applied_y = if (0.0..=height).contains(&y) {
            self.cursor.y = y;
            dy
        } else {
            0.0
        };

        (applied_x, applied_y)
    }

    fn complete_trial(&mut self, goal_index: usize) {
        let next_goal = self.sequencer.advance();
        self.dwell.reset();
        self.trial += 1;
        debug!(
            trial = self.trial - 1,
            goal = goal_index,
            next_goal,
            at = secs(self.timer.now()),
            "selection confirmed"
        );

        if self.trial >= self.config.max_trials {
            self.status = RunStatus::Completed;
            info!(trials = self.trial, ticks = self.ticks, "run complete");
        }
    }

    /// Stops the run early and freezes the log.
    pub fn abort(&mut self) -> Arc<SessionLog> {
        if self.status == RunStatus::Running && self.finalized.is_none() {
            self.status = RunStatus::Aborted;
            warn!(trial = self.trial, ticks = self.ticks, "run aborted");
        }
        self.finalize()
    }

    /// Freezes the log on first call; later calls return the same log.
    /// Finalizing a run that is still going marks it aborted.
    pub fn finalize(&mut self) -> Arc<SessionLog> {
        if let Some(log) = &self.finalized {
            return Arc::clone(log);
        }
        if self.status == RunStatus::Running {
            self.status = RunStatus::Aborted;
        }

        let run_id = self.log.run_id().to_string();
        let mut log = std::mem::replace(&mut self.log, SessionLog::new(run_id));
        log.mark(self.status);
        let log = Arc::new(log);
        self.finalized = Some(Arc::clone(&log));

        info!(
            run_id = log.run_id(),
            status = ?log.status(),
            events = log.len(),
            malformed = log.malformed_decisions(),
            "session log finalized"
        );
        log
    }

    pub fn snapshot(&self) -> Snapshot {
        let goal_index = self.sequencer.current();
        Snapshot {
            cursor: self.cursor,
            goal: self.targets[goal_index],
            goal_index,
            trial: self.trial,
            max_trials: self.config.max_trials,
            dwell: self.dwell.state(),
            confirmed: false,
            terminal: self.is_terminal(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != RunStatus::Running || self.finalized.is_some()
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn trial(&self) -> usize {
        self.trial
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The live log, or the frozen one once finalized.
    pub fn log(&self) -> &SessionLog {
        self.finalized.as_deref().unwrap_or(&self.log)
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }
}

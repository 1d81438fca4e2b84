use super::engine::TrialEngine;
use super::source::ControlSource;
use isofitts_core::RunStatus;
use isofitts_timing::{CadenceStats, Timer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct DriveOptions {
    pub tick_interval: Duration,
    /// Stop after this many ticks even if trials remain.
    pub max_ticks: Option<u64>,
}

impl Default for DriveOptions {
    fn default() -> Self {
        Self::from_hz(60.0)
    }
}

impl DriveOptions {
    pub fn from_hz(hz: f64) -> Self {
        Self {
            tick_interval: Duration::from_secs_f64(1.0 / hz),
            max_ticks: None,
        }
    }

    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The engine reached a terminal state on its own.
    RunEnded,
    AbortRequested,
    SourceClosed,
    TickLimit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriveSummary {
    pub ticks: u64,
    pub stop: StopReason,
    pub status: RunStatus,
    pub cadence: CadenceStats,
}

/// Paces `engine` at `options.tick_interval`, pulling one decision from
/// `source` per tick.
///
/// `dt` for each tick is measured on the engine's timer, so a slow tick
/// shows up as a longer step rather than being hidden. Raising `abort` or
/// closing the source aborts the engine; a tick limit leaves it running
/// for the caller to finalize.
pub fn drive<T, S>(
    engine: &mut TrialEngine<T>,
    source: &mut S,
    options: &DriveOptions,
    abort: &AtomicBool,
) -> DriveSummary
where
    T: Timer<Timestamp = u64>,
    S: ControlSource + ?Sized,
{
    let mut snapshot = engine.snapshot();
    let mut last = engine.timer().now();
    let mut ticks = 0u64;

    let stop = loop {
        if snapshot.terminal {
            break StopReason::RunEnded;
        }
        if abort.load(Ordering::SeqCst) {
            engine.abort();
            break StopReason::AbortRequested;
        }
        if options.max_ticks.is_some_and(|limit| ticks >= limit) {
            break StopReason::TickLimit;
        }

        let wait = options
            .tick_interval
            .saturating_sub(engine.timer().elapsed(last));
        if !wait.is_zero() {
            engine.timer().sleep(wait);
        }

        let Some(decision) = source.next_decision(&snapshot) else {
            warn!(ticks, "control source closed");
            engine.abort();
            break StopReason::SourceClosed;
        };

        let now = engine.timer().now();
        let dt = Duration::from_nanos(now.saturating_sub(last));
        last = now;

        snapshot = engine.tick(&decision, dt);
        engine.timer_mut().record_frame(dt);
        ticks += 1;
    };

    let cadence = engine.timer().cadence_stats();
    info!(
        ticks,
        ?stop,
        status = ?engine.status(),
        hz = cadence.effective_hz,
        jitter_us = cadence.jitter_ns / 1e3,
        "drive loop finished"
    );

    DriveSummary {
        ticks,
        stop,
        status: engine.status(),
        cadence,
    }
}

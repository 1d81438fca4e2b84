use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DwellState {
    #[default]
    Idle,
    /// Cursor has stayed inside the goal since `started_at` (timer ns).
    Dwelling { started_at: u64, elapsed: Duration },
    /// One-tick pulse; the engine consumes it and calls [`DwellMachine::reset`].
    Confirmed,
}

impl DwellState {
    pub fn elapsed(&self) -> Duration {
        match self {
            DwellState::Dwelling { elapsed, .. } => *elapsed,
            _ => Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DwellMachine {
    state: DwellState,
    threshold: Duration,
}

impl DwellMachine {
    pub fn new(threshold: Duration) -> Self {
        Self {
            state: DwellState::Idle,
            threshold,
        }
    }

    pub fn state(&self) -> DwellState {
        self.state
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Feeds one tick's containment result.
    ///
    /// The entry tick starts the timer at `now` with nothing elapsed; each
    /// further tick inside adds `dt`. Leaving before the threshold drops
    /// back to `Idle` with no carry-over.
    pub fn update(&mut self, inside: bool, dt: Duration, now: u64) -> DwellState {
        self.state = match (self.state, inside) {
            (_, false) => DwellState::Idle,
            (DwellState::Idle | DwellState::Confirmed, true) => DwellState::Dwelling {
                started_at: now,
                elapsed: Duration::ZERO,
            },
            (DwellState::Dwelling { started_at, elapsed }, true) => {
                let elapsed = elapsed + dt;
                if elapsed >= self.threshold {
                    DwellState::Confirmed
                } else {
                    DwellState::Dwelling { started_at, elapsed }
                }
            }
        };
        self.state
    }

    pub fn reset(&mut self) {
        self.state = DwellState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(500);

    fn machine() -> DwellMachine {
        DwellMachine::new(Duration::from_secs(2))
    }

    #[test]
    fn entry_tick_starts_timer_without_credit() {
        let mut m = machine();
        assert_eq!(m.update(false, TICK, 0), DwellState::Idle);
        assert_eq!(
            m.update(true, TICK, 42),
            DwellState::Dwelling {
                started_at: 42,
                elapsed: Duration::ZERO
            }
        );
        let next = m.update(true, TICK, 43);
        assert_eq!(next.elapsed(), TICK);
        assert!(matches!(next, DwellState::Dwelling { started_at: 42, .. }));
    }

    #[test]
    fn exit_before_threshold_resets_completely() {
        let mut m = machine();
        m.update(true, TICK, 0);
        m.update(true, TICK, 1);
        m.update(true, TICK, 2);
        assert_eq!(m.state().elapsed(), Duration::from_secs(1));

        assert_eq!(m.update(false, TICK, 3), DwellState::Idle);
        let again = m.update(true, TICK, 4);
        assert_eq!(again.elapsed(), Duration::ZERO);
        assert!(matches!(again, DwellState::Dwelling { started_at: 4, .. }));
    }

    #[test]
    fn threshold_emits_single_pulse() {
        let mut m = machine();
        let states: Vec<_> = (0..6).map(|i| m.update(true, TICK, i)).collect();
        // entry, then 0.5, 1.0, 1.5, 2.0 -> confirmed
        assert_eq!(states[3].elapsed(), Duration::from_millis(1500));
        assert_eq!(states[4], DwellState::Confirmed);
        // a fresh dwell starts if the pulse was not reset
        assert!(matches!(states[5], DwellState::Dwelling { started_at: 5, .. }));

        let pulses = states
            .iter()
            .filter(|s| matches!(s, DwellState::Confirmed))
            .count();
        assert_eq!(pulses, 1);
    }

    #[test]
    fn reset_consumes_pulse() {
        let mut m = DwellMachine::new(TICK);
        m.update(true, TICK, 0);
        assert_eq!(m.update(true, TICK, 1), DwellState::Confirmed);
        m.reset();
        assert_eq!(m.state(), DwellState::Idle);
        assert_eq!(m.update(false, TICK, 2), DwellState::Idle);
    }
}

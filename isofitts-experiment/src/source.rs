use super::engine::Snapshot;
use isofitts_core::{Command, ControlDecision, LabelMap, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use tracing::{trace, warn};

/// Supplies one control decision per engine tick.
pub trait ControlSource {
    /// `None` means the source has closed and the run should stop.
    fn next_decision(&mut self, view: &Snapshot) -> Option<ControlDecision>;
}

/// Replays a fixed list of decisions, then closes.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    queue: VecDeque<ControlDecision>,
}

impl ScriptedSource {
    pub fn new(decisions: impl IntoIterator<Item = ControlDecision>) -> Self {
        Self {
            queue: decisions.into_iter().collect(),
        }
    }

    /// Builds decisions from commands using the labels bound in `labels`.
    pub fn from_commands(commands: impl IntoIterator<Item = Command>, labels: &LabelMap) -> Self {
        Self::new(commands.into_iter().map(|command| {
            labels
                .label_for(command)
                .map(|label| ControlDecision::new(label, command, None))
                .unwrap_or_else(ControlDecision::idle)
        }))
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl ControlSource for ScriptedSource {
    fn next_decision(&mut self, _view: &Snapshot) -> Option<ControlDecision> {
        self.queue.pop_front()
    }
}

/// Reads classifier datagrams (`"<label> [<magnitude>]"`) from a local UDP port.
///
/// Each call drains whatever arrived since the last tick and keeps only the
/// newest payload; a tick with nothing pending is idle.
pub struct UdpSource {
    socket: UdpSocket,
    labels: LabelMap,
    buf: [u8; 1024],
}

impl UdpSource {
    pub fn bind(addr: impl ToSocketAddrs, labels: LabelMap) -> Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;
        Ok(Self {
            socket,
            labels,
            buf: [0; 1024],
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl ControlSource for UdpSource {
    fn next_decision(&mut self, _view: &Snapshot) -> Option<ControlDecision> {
        let mut latest = None;
        loop {
            match self.socket.recv(&mut self.buf) {
                Ok(n) => {
                    let payload = String::from_utf8_lossy(&self.buf[..n]);
                    trace!(%payload, "classifier datagram");
                    latest = Some(self.labels.parse_datagram(&payload));
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "control socket failed, closing source");
                    return None;
                }
            }
        }
        Some(latest.unwrap_or_else(ControlDecision::idle))
    }
}

/// Synthetic participant: steers toward the goal along the axis with the
/// larger error and holds still once close to its center. With probability
/// `error_rate` the classifier "misfires" and a random bound label is sent
/// instead.
#[derive(Debug, Clone)]
pub struct SimulatedOperator<R: Rng> {
    rng: R,
    labels: LabelMap,
    error_rate: f64,
    hold_radius: f64,
    magnitude: Option<f64>,
}

impl SimulatedOperator<StdRng> {
    pub fn seeded(seed: u64, labels: LabelMap, error_rate: f64) -> Self {
        Self::new(StdRng::seed_from_u64(seed), labels, error_rate)
    }
}

impl<R: Rng> SimulatedOperator<R> {
    pub fn new(rng: R, labels: LabelMap, error_rate: f64) -> Self {
        Self {
            rng,
            labels,
            error_rate: error_rate.clamp(0.0, 1.0),
            hold_radius: 10.0,
            magnitude: None,
        }
    }

    pub fn with_hold_radius(mut self, hold_radius: f64) -> Self {
        self.hold_radius = hold_radius;
        self
    }

    pub fn with_magnitude(mut self, magnitude: f64) -> Self {
        self.magnitude = Some(magnitude);
        self
    }

    fn intended(&self, view: &Snapshot) -> Command {
        let dx = view.goal.x - view.cursor.x;
        let dy = view.goal.y - view.cursor.y;
        if dx.hypot(dy) < self.hold_radius {
            Command::Neutral
        } else if dx.abs() >= dy.abs() {
            if dx > 0.0 { Command::MoveRight } else { Command::MoveLeft }
        } else if dy > 0.0 {
            Command::MoveDown
        } else {
            Command::MoveUp
        }
    }
}

impl<R: Rng> ControlSource for SimulatedOperator<R> {
    fn next_decision(&mut self, view: &Snapshot) -> Option<ControlDecision> {
        let bindings = self.labels.bindings();
        if !bindings.is_empty() && self.rng.random_bool(self.error_rate) {
            let label = bindings[self.rng.random_range(0..bindings.len())].label;
            return Some(self.labels.decide(label, self.magnitude));
        }

        let command = self.intended(view);
        Some(match self.labels.label_for(command) {
            Some(label) => ControlDecision::new(label, command, self.magnitude),
            None => ControlDecision::idle(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dwell::DwellState;
    use isofitts_core::{Circle, REJECT_LABEL};
    use std::time::Duration;

    fn view(cursor: (f64, f64), goal: (f64, f64)) -> Snapshot {
        Snapshot {
            cursor: Circle::new(cursor.0, cursor.1, 7.0),
            goal: Circle::new(goal.0, goal.1, 40.0),
            goal_index: 0,
            trial: 0,
            max_trials: 1,
            dwell: DwellState::Idle,
            confirmed: false,
            terminal: false,
        }
    }

    #[test]
    fn scripted_source_replays_then_closes() {
        let labels = LabelMap::default();
        let mut source =
            ScriptedSource::from_commands([Command::MoveLeft, Command::Neutral], &labels);
        let v = view((0.0, 0.0), (0.0, 0.0));
        assert_eq!(source.remaining(), 2);
        assert_eq!(source.next_decision(&v).unwrap().label, 4);
        assert_eq!(source.next_decision(&v).unwrap().command, Command::Neutral);
        assert!(source.next_decision(&v).is_none());
    }

    #[test]
    fn operator_steers_along_larger_error() {
        let mut op = SimulatedOperator::seeded(7, LabelMap::default(), 0.0);
        let d = op.next_decision(&view((100.0, 100.0), (300.0, 150.0))).unwrap();
        assert_eq!(d.command, Command::MoveRight);
        assert_eq!(d.label, 3);
        let d = op.next_decision(&view((100.0, 100.0), (120.0, 20.0))).unwrap();
        assert_eq!(d.command, Command::MoveUp);
        let d = op.next_decision(&view((100.0, 100.0), (104.0, 103.0))).unwrap();
        assert_eq!(d.command, Command::Neutral);
        assert_eq!(d.label, 2);
    }

    #[test]
    fn operator_is_reproducible_for_a_seed() {
        let v = view((100.0, 100.0), (400.0, 100.0));
        let run = |seed| {
            let mut op = SimulatedOperator::seeded(seed, LabelMap::default(), 0.3);
            (0..50)
                .map(|_| op.next_decision(&v).unwrap().label)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(11), run(11));
        assert!(run(11).iter().any(|&l| l != 3), "misfires expected at 30%");
    }

    #[test]
    fn udp_source_decodes_datagrams() {
        let mut source = UdpSource::bind("127.0.0.1:0", LabelMap::default()).unwrap();
        let addr = source.local_addr().unwrap();
        let v = view((0.0, 0.0), (0.0, 0.0));

        assert_eq!(source.next_decision(&v).unwrap().label, REJECT_LABEL);

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(b"3 0.8", addr).unwrap();

        let mut decision = ControlDecision::idle();
        for _ in 0..100 {
            decision = source.next_decision(&v).unwrap();
            if decision.label != REJECT_LABEL {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(decision.command, Command::MoveRight);
        assert_eq!(decision.magnitude, Some(0.8));
    }
}

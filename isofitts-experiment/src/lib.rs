pub mod config;
pub mod driver;
pub mod dwell;
pub mod engine;
pub mod sequencer;
pub mod source;
pub use config::{EngineConfig, Viewport};
pub use driver::{DriveOptions, DriveSummary, StopReason, drive};
pub use dwell::{DwellMachine, DwellState};
pub use engine::{Snapshot, TrialEngine};
pub use sequencer::TargetSequencer;
pub use source::{ControlSource, ScriptedSource, SimulatedOperator, UdpSource};

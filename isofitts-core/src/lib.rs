//! Shared vocabulary for the isofitts engine and metrics: target geometry,
//! control decisions and the session log both sides agree on.

pub mod control;
pub mod error;
pub mod geometry;
pub mod log;

pub use control::{Command, ControlDecision, Gain, LabelBinding, LabelMap, REJECT_LABEL};
pub use error::{Error, Result};
pub use geometry::{
    CaptureRule, Circle, Cursor, Target, WidthConvention, contains, contains_with, distance,
    fitts_index_of_difficulty, layout, path_length,
};
pub use log::{
    FORMAT_VERSION, LogEvent, RunStatus, SessionLog, checkpoint_path, run_id_from_path,
    write_atomically,
};

pub mod timer;

pub use timer::{secs, CadenceStats, HighPrecisionTimer, ManualTimer, Timer};

use crate::error::{Error, Result};
use crate::geometry::{Circle, Cursor, Target};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Current on-disk layout version
pub const FORMAT_VERSION: &str = "1.0";

/// State of one engine tick, as recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogEvent {
    pub trial: usize,
    pub goal: Target,
    /// Monotonic seconds since the engine's timer started.
    pub clock_secs: f64,
    pub cursor: Cursor,
    pub label: i32,
    pub magnitude: Option<f64>,
    /// Motion actually applied this tick.
    pub direction: (f64, f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    #[default]
    Running,
    Completed,
    Aborted,
}

/// Ordered per-tick record of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionLog {
    run_id: String,
    status: RunStatus,
    malformed_decisions: u64,
    events: Vec<LogEvent>,
}

impl SessionLog {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            status: RunStatus::Running,
            malformed_decisions: 0,
            events: Vec::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn mark(&mut self, status: RunStatus) {
        self.status = status;
    }

    pub fn malformed_decisions(&self) -> u64 {
        self.malformed_decisions
    }

    pub fn record_malformed(&mut self) {
        self.malformed_decisions += 1;
    }

    pub fn push(&mut self, event: LogEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Clock span between the first and last event.
    pub fn duration_secs(&self) -> f64 {
        match (self.events.first(), self.events.last()) {
            (Some(first), Some(last)) => last.clock_secs - first.clock_secs,
            _ => 0.0,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.run_id)
    }

    /// Saves as `<dir>/<run_id>.json` and returns the written path.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(self.file_name());
        self.save_to(&path)?;
        Ok(path)
    }

    /// Writes through [`write_atomically`], so a reader never sees a
    /// partial file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let columns = LogColumns::from(self);
        write_atomically(path, |writer| {
            serde_json::to_writer(writer, &columns).map_err(io::Error::other)
        })?;

        debug!(
            run_id = %self.run_id,
            events = self.events.len(),
            path = %path.display(),
            "session log saved"
        );
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let columns: LogColumns = serde_json::from_str(&content)?;
        if columns.format_version != FORMAT_VERSION {
            warn!(
                path = %path.display(),
                found = %columns.format_version,
                expected = FORMAT_VERSION,
                "session log has a different format version"
            );
        }
        let mut log = columns.into_log().map_err(|reason| Error::MalformedLog {
            path: path.to_path_buf(),
            reason,
        })?;
        if log.run_id.is_empty() {
            log.run_id = run_id_from_path(path);
        }
        Ok(log)
    }
}

/// Run identifier for a persisted log: its file stem.
pub fn run_id_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `<path>.tmp`, where a file is staged before it replaces `path`.
pub fn checkpoint_path(final_path: &Path) -> PathBuf {
    let mut name = final_path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Stages `write`'s output in the checkpoint file, syncs it and renames it
/// over `path`. Parent directories are created. Any failure, including one
/// raised by `write`, removes the checkpoint and comes back as
/// [`Error::Persistence`].
pub fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let persist_err = |source: io::Error| Error::Persistence {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(persist_err)?;
    }

    let tmp = checkpoint_path(path);
    let staged = File::create(&tmp).and_then(|file| {
        let mut writer = BufWriter::new(file);
        write(&mut writer)?;
        writer.flush()?;
        writer.get_ref().sync_all()
    });
    if let Err(source) = staged.and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(persist_err(source));
    }
    Ok(())
}

/// Persisted layout: header fields plus one array per field, one entry per tick.
#[derive(Debug, Serialize, Deserialize)]
struct LogColumns {
    #[serde(default)]
    run_id: String,
    #[serde(default)]
    format_version: String,
    #[serde(default)]
    status: RunStatus,
    #[serde(default)]
    malformed_decisions: u64,
    trial_number: Vec<usize>,
    goal_circle: Vec<Circle>,
    global_clock: Vec<f64>,
    cursor_position: Vec<Circle>,
    class_label: Vec<i32>,
    #[serde(default)]
    magnitude: Vec<Option<f64>>,
    current_direction: Vec<(f64, f64)>,
}

impl From<&SessionLog> for LogColumns {
    fn from(log: &SessionLog) -> Self {
        let events = &log.events;
        Self {
            run_id: log.run_id.clone(),
            format_version: FORMAT_VERSION.to_string(),
            status: log.status,
            malformed_decisions: log.malformed_decisions,
            trial_number: events.iter().map(|e| e.trial).collect(),
            goal_circle: events.iter().map(|e| e.goal).collect(),
            global_clock: events.iter().map(|e| e.clock_secs).collect(),
            cursor_position: events.iter().map(|e| e.cursor).collect(),
            class_label: events.iter().map(|e| e.label).collect(),
            magnitude: events.iter().map(|e| e.magnitude).collect(),
            current_direction: events.iter().map(|e| e.direction).collect(),
        }
    }
}

impl LogColumns {
    fn into_log(self) -> std::result::Result<SessionLog, String> {
        let n = self.trial_number.len();
        let lengths = [
            ("goal_circle", self.goal_circle.len()),
            ("global_clock", self.global_clock.len()),
            ("cursor_position", self.cursor_position.len()),
            ("class_label", self.class_label.len()),
            ("current_direction", self.current_direction.len()),
        ];
        if let Some((name, len)) = lengths.iter().find(|(_, len)| *len != n) {
            return Err(format!("column {name} has {len} entries, trial_number has {n}"));
        }
        if !self.magnitude.is_empty() && self.magnitude.len() != n {
            return Err(format!(
                "column magnitude has {} entries, trial_number has {n}",
                self.magnitude.len()
            ));
        }
        check_trial_sequence(&self.trial_number)?;

        let mut magnitude = self.magnitude.into_iter();
        let events = (0..n)
            .map(|i| LogEvent {
                trial: self.trial_number[i],
                goal: self.goal_circle[i],
                clock_secs: self.global_clock[i],
                cursor: self.cursor_position[i],
                label: self.class_label[i],
                magnitude: magnitude.next().flatten(),
                direction: self.current_direction[i],
            })
            .collect();

        Ok(SessionLog {
            run_id: self.run_id,
            status: self.status,
            malformed_decisions: self.malformed_decisions,
            events,
        })
    }
}

/// Trial numbers start at 0 and each tick either repeats the previous trial
/// or moves to the next one.
fn check_trial_sequence(trials: &[usize]) -> std::result::Result<(), String> {
    let mut previous: Option<usize> = None;
    for (i, &trial) in trials.iter().enumerate() {
        let valid = match previous {
            None => trial == 0,
            Some(p) => trial == p || trial == p + 1,
        };
        if !valid {
            return Err(format!(
                "trial_number[{i}] jumps to {trial} after {previous:?}"
            ));
        }
        previous = Some(trial);
    }
    Ok(())
}

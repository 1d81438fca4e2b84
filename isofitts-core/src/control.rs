use serde::{Deserialize, Serialize};

/// Label logged for decisions that carry no usable class.
pub const REJECT_LABEL: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    #[default]
    Neutral,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
}

impl Command {
    /// Direction in screen coordinates, so up is -y.
    pub fn unit_vector(self) -> (f64, f64) {
        match self {
            Command::Neutral => (0.0, 0.0),
            Command::MoveUp => (0.0, -1.0),
            Command::MoveDown => (0.0, 1.0),
            Command::MoveLeft => (-1.0, 0.0),
            Command::MoveRight => (1.0, 0.0),
        }
    }

    pub fn is_motion(self) -> bool {
        !matches!(self, Command::Neutral)
    }
}

/// One classifier output for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlDecision {
    pub label: i32,
    pub command: Command,
    pub magnitude: Option<f64>,
    pub recognized: bool,
}

impl ControlDecision {
    pub fn new(label: i32, command: Command, magnitude: Option<f64>) -> Self {
        Self {
            label,
            command,
            magnitude,
            recognized: true,
        }
    }

    /// No decision arrived this tick.
    pub fn idle() -> Self {
        Self::new(REJECT_LABEL, Command::Neutral, None)
    }

    pub fn malformed(label: i32) -> Self {
        Self {
            label,
            command: Command::Neutral,
            magnitude: None,
            recognized: false,
        }
    }

    /// False for unknown labels and for negative or non-finite magnitudes.
    pub fn is_well_formed(&self) -> bool {
        self.recognized && self.magnitude.is_none_or(|m| m.is_finite() && m >= 0.0)
    }

    /// The command to act on; malformed decisions never move the cursor.
    pub fn effective_command(&self) -> Command {
        if self.is_well_formed() {
            self.command
        } else {
            Command::Neutral
        }
    }
}

/// Maps the optional magnitude onto a velocity multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Gain {
    /// Magnitude is ignored.
    Off,
    #[default]
    Linear,
    /// `m * e^m`, steeper response for strong contractions.
    Exponential,
}

impl Gain {
    pub fn apply(self, magnitude: Option<f64>) -> f64 {
        match (self, magnitude) {
            (Gain::Off, _) | (_, None) => 1.0,
            (Gain::Linear, Some(m)) => m,
            (Gain::Exponential, Some(m)) => m * m.exp(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelBinding {
    pub label: i32,
    pub command: Command,
}

/// Classifier label to command table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelMap {
    bindings: Vec<LabelBinding>,
}

impl Default for LabelMap {
    fn default() -> Self {
        // hand closed, hand open, rest, wrist extension, wrist flexion
        Self::new(vec![
            LabelBinding { label: 0, command: Command::MoveDown },
            LabelBinding { label: 1, command: Command::MoveUp },
            LabelBinding { label: 2, command: Command::Neutral },
            LabelBinding { label: 3, command: Command::MoveRight },
            LabelBinding { label: 4, command: Command::MoveLeft },
        ])
    }
}

impl LabelMap {
    pub fn new(bindings: Vec<LabelBinding>) -> Self {
        Self { bindings }
    }

    pub fn bindings(&self) -> &[LabelBinding] {
        &self.bindings
    }

    pub fn command_for(&self, label: i32) -> Option<Command> {
        self.bindings
            .iter()
            .find(|b| b.label == label)
            .map(|b| b.command)
    }

    /// First label bound to `command`, if any.
    pub fn label_for(&self, command: Command) -> Option<i32> {
        self.bindings
            .iter()
            .find(|b| b.command == command)
            .map(|b| b.label)
    }

    pub fn decide(&self, label: i32, magnitude: Option<f64>) -> ControlDecision {
        match self.command_for(label) {
            Some(command) => ControlDecision::new(label, command, magnitude),
            None => ControlDecision::malformed(label),
        }
    }

    /// Decodes a `"<label> [<magnitude>]"` classifier payload.
    pub fn parse_datagram(&self, payload: &str) -> ControlDecision {
        let mut fields = payload.split_whitespace();

        let Some(label) = fields.next().and_then(parse_label) else {
            return ControlDecision::malformed(REJECT_LABEL);
        };

        let magnitude = match fields.next() {
            None => None,
            Some(raw) => match raw.parse::<f64>() {
                Ok(m) => Some(m),
                Err(_) => return ControlDecision::malformed(label),
            },
        };

        self.decide(label, magnitude)
    }
}

fn parse_label(raw: &str) -> Option<i32> {
    let value = raw.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= i32::MAX as f64 {
        Some(value as i32)
    } else {
        None
    }
}

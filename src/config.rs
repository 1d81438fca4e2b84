//! Application configuration (TOML)

use anyhow::{bail, Context};
use isofitts_experiment::EngineConfig;
use isofitts_metrics::MetricsConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_FILE: &str = "isofitts.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Trial engine parameters
    pub engine: EngineConfig,
    /// Offline analysis conventions
    pub metrics: MetricsConfig,
    /// Per-run settings for the `run` command
    pub session: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Directory session logs are written to
    pub results_dir: PathBuf,
    /// Condition tag used in file names
    pub label: String,
    /// Engine tick rate
    pub tick_hz: f64,
    /// Address the classifier sends datagrams to
    pub bind_addr: String,
    /// Misfire probability of the simulated operator
    pub sim_error_rate: f64,
    /// Hard stop for a run, in ticks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_ticks: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
            label: "default".to_string(),
            tick_hz: 60.0,
            bind_addr: "127.0.0.1:12346".to_string(),
            sim_error_rate: 0.05,
            max_ticks: None,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.engine.validate()?;
        let session = &self.session;
        if !(session.tick_hz.is_finite() && session.tick_hz > 0.0) {
            bail!("session.tick_hz must be positive, got {}", session.tick_hz);
        }
        if !(0.0..=1.0).contains(&session.sim_error_rate) {
            bail!(
                "session.sim_error_rate must be in [0, 1], got {}",
                session.sim_error_rate
            );
        }
        validate_label(&session.label)?;
        if session.bind_addr.trim().is_empty() {
            bail!("session.bind_addr must not be empty");
        }
        Ok(())
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the default file if present, otherwise the built-in defaults.
    pub fn load_default() -> anyhow::Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = self.to_toml()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_FILE)
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Labels end up in file names.
pub fn validate_label(label: &str) -> anyhow::Result<()> {
    if label.is_empty() {
        bail!("label must not be empty");
    }
    if !label
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        bail!("label {label:?} may only contain ASCII letters, digits, '-' and '_'");
    }
    Ok(())
}

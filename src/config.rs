//! TOML configuration for a dashboard run.
//!
//! Every field has a default, so an empty file is a valid configuration.
//! A method table may set only the fields it changes; the others keep that
//! method's preset. Unknown keys are rejected.
//!
//! ```toml
//! seed = 42
//!
//! [engine]
//! threshold = 0.001
//! min_steps = 10
//! convergence_window = 2
//!
//! [engine.methods.normal_vqe]
//! target = -1.25
//! noise_amplitude = 0.06
//!
//! [scheduler]
//! interval_ms = 2000
//! max_ticks = 200
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::EngineConfig;
use crate::method::Method;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tick cadence of the background scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Milliseconds between ticks
    pub interval_ms: u64,
    /// Ticks after which a run stops even if not every method converged
    pub max_ticks: usize,
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            max_ticks: 200,
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fixed RNG seed; absent means seed from entropy
    pub seed: Option<u64>,
    pub engine: EngineConfig,
    pub scheduler: SchedulerConfig,
}

impl SimulationConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: SimulationConfig = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let cfg = Self::from_toml_str(&text)?;
        log::info!("loaded config from {}", path.display());
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let e = &self.engine;
        if !(e.threshold.is_finite() && e.threshold > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "threshold must be positive, got {}",
                e.threshold
            )));
        }
        if e.convergence_window < 2 {
            return Err(ConfigError::Invalid(format!(
                "convergence_window must be at least 2, got {}",
                e.convergence_window
            )));
        }
        for m in Method::ALL {
            let p = e.methods.get(m);
            let fields = [
                ("initial", p.initial),
                ("target", p.target),
                ("decay_rate", p.decay_rate),
                ("noise_amplitude", p.noise_amplitude),
                ("noise_decay", p.noise_decay),
            ];
            for (name, v) in fields {
                if !v.is_finite() {
                    return Err(ConfigError::Invalid(format!(
                        "{}.{} is not finite",
                        m.key(),
                        name
                    )));
                }
            }
            // initial and target may be any energy; rates and widths may not
            for (name, v) in &fields[2..] {
                if *v < 0.0 {
                    return Err(ConfigError::Invalid(format!(
                        "{}.{} must be non-negative, got {}",
                        m.key(),
                        name,
                        v
                    )));
                }
            }
        }
        if self.scheduler.interval_ms == 0 {
            return Err(ConfigError::Invalid("scheduler.interval_ms must be non-zero".into()));
        }
        if self.scheduler.max_ticks == 0 {
            return Err(ConfigError::Invalid("scheduler.max_ticks must be non-zero".into()));
        }
        Ok(())
    }
}

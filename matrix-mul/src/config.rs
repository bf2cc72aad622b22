//! TOML settings for runs started from the command line.
//!
//! Every field has a default, so an empty file (or no file) is valid:
//!
//! ```toml
//! strategy = "non-blocking"
//! dimension = 240
//! seed = 42
//! bound = 100
//! verify = true
//! ranks = 4
//! latency_ms = 0
//!
//! [relay]
//! addr = "127.0.0.1:50051"
//! # One session per run; the relay refuses a session it has seen before.
//! session = "run-0001"
//!
//! # Optional explicit operands; when present they replace the random ones
//! # and fix the dimension.
//! [matrices]
//! a = [[1, 2], [3, 4]]
//! b = [[5, 6], [7, 8]]
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::Error;
use crate::matrix::Matrix;
use crate::run::RunConfig;
use crate::source::MatrixSource;
use crate::strategy::Strategy;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub strategy: Strategy,
    /// Side length of the square operands.
    pub dimension: usize,
    pub seed: u64,
    /// Random values are drawn from `0..bound`.
    pub bound: i64,
    pub verify: bool,
    /// Group size for in-process runs.
    pub ranks: usize,
    /// Upper bound of the random delivery delay for in-process runs.
    pub latency_ms: u64,
    pub relay: RelaySettings,
    pub matrices: Option<ExplicitMatrices>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            strategy: Strategy::OneToAll,
            dimension: 240,
            seed: 42,
            bound: 100,
            verify: true,
            ranks: 4,
            latency_ms: 0,
            relay: RelaySettings::default(),
            matrices: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelaySettings {
    pub addr: String,
    /// Ranks only exchange messages with ranks of the same session. Has no
    /// default: every multi-process run must name a session of its own.
    pub session: Option<String>,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:50051".to_string(),
            session: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExplicitMatrices {
    pub a: Vec<Vec<i64>>,
    pub b: Vec<Vec<i64>>,
}

pub fn load_settings(path: &Path) -> Result<Settings, Error> {
    let text = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&text)?)
}

impl Settings {
    pub fn latency(&self) -> Option<Duration> {
        (self.latency_ms > 0).then(|| Duration::from_millis(self.latency_ms))
    }

    pub fn run_config(&self) -> Result<RunConfig, Error> {
        let (dimension, source) = match &self.matrices {
            Some(matrices) => {
                let a = Matrix::from_rows(matrices.a.clone())?;
                let b = Matrix::from_rows(matrices.b.clone())?;
                (a.rows(), MatrixSource::explicit(a, b))
            }
            None => (self.dimension, MatrixSource::random(self.seed, self.bound)),
        };
        source.validate(dimension)?;

        let mut config = RunConfig::new(self.strategy, dimension, source);
        config.verify = self.verify;
        Ok(config)
    }
}

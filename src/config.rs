//! Solver parameters.
//!
//! [`SolverConfig`] gathers every heuristic parameter used by the experiment
//! pipeline. Defaults reproduce the reference experiment setup; a JSON file
//! may override any subset of fields.

use crate::heuristics::annealing::SimulatedAnnealing;
use crate::heuristics::local_search::ImprovementPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Error while reading a configuration file
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "cannot read configuration: {}", e),
            ConfigError::Parse(e) => write!(f, "invalid configuration file: {}", e),
            ConfigError::Invalid(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Parameters of the whole heuristic pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Restarts of the random construction
    pub random_restarts: usize,
    /// GRASP iterations
    pub grasp_iters: usize,
    /// Restricted candidate list size
    pub rcl_size: usize,
    /// Policy used by the `solve` command's local search
    pub policy: ImprovementPolicy,
    /// Short annealing schedule
    pub sa_fast: SimulatedAnnealing,
    /// Long annealing schedule
    pub sa_quality: SimulatedAnnealing,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            random_restarts: 200,
            grasp_iters: 200,
            rcl_size: 8,
            policy: ImprovementPolicy::Best,
            sa_fast: SimulatedAnnealing::fast(),
            sa_quality: SimulatedAnnealing::quality(),
        }
    }
}

impl SolverConfig {
    /// Load a configuration from a JSON file; missing fields keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: SolverConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject parameter sets the heuristics would silently ignore
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rcl_size == 0 {
            return Err(ConfigError::Invalid("rcl_size must be at least 1".to_string()));
        }
        self.sa_fast
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("sa_fast: {}", e)))?;
        self.sa_quality
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("sa_quality: {}", e)))?;
        Ok(())
    }

    /// Write the configuration as pretty JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

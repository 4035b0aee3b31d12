//! Optimization loop configuration.

use crate::error::{BboError, BboResult};
use serde::{Deserialize, Serialize};

/// Missing fields take their default values when deserializing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationConfig {
    pub n_updates: usize,
    pub n_samples_per_update: usize,
    /// Roll out the samples of one update on the rayon thread pool.
    pub parallel_rollouts: bool,
    /// Seed for sampling; `None` seeds from the operating system.
    pub seed: Option<u64>,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            n_updates: 10,
            n_samples_per_update: 10,
            parallel_rollouts: false,
            seed: None,
        }
    }
}

impl OptimizationConfig {
    pub fn from_yaml_str(content: &str) -> BboResult<Self> {
        let config: Self = serde_yaml::from_str(content).map_err(|e| BboError::Config {
            what: e.to_string(),
        })?;
        if config.n_samples_per_update == 0 {
            return Err(BboError::Config {
                what: "n_samples_per_update must be at least 1".to_string(),
            });
        }
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> BboResult<String> {
        serde_yaml::to_string(self).map_err(|e| BboError::Config { what: e.to_string() })
    }
}

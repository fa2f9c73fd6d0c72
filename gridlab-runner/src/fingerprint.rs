//! Run fingerprinting: deterministic identity of a config applied to a
//! dataset.

use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;

/// Identity of one run.
///
/// `config_hash` covers every setting that affects the simulation. File
/// locations are left out, so moving the data or the outputs keeps the
/// fingerprint stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub config_hash: String,
    pub dataset_hash: String,
    pub run_id: String,
}

impl RunFingerprint {
    pub fn compute(
        config: &SimulationConfig,
        dataset_hash: &str,
    ) -> Result<Self, serde_json::Error> {
        let config_hash = config_hash(config)?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(config_hash.as_bytes());
        hasher.update(dataset_hash.as_bytes());
        Ok(Self {
            run_id: hasher.finalize().to_hex().to_string(),
            config_hash,
            dataset_hash: dataset_hash.to_string(),
        })
    }

    /// First 12 hex digits of the run id.
    pub fn short_id(&self) -> &str {
        &self.run_id[..self.run_id.len().min(12)]
    }
}

/// BLAKE3 over the canonical JSON form of the config, minus file paths.
pub fn config_hash(config: &SimulationConfig) -> Result<String, serde_json::Error> {
    let mut canonical = config.clone();
    canonical.data.path = None;
    canonical.data.output = None;
    canonical.data.summary = None;
    let json = serde_json::to_string(&canonical)?;
    Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
}

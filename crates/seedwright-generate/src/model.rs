use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use seedwright_plan::CountConfig;

/// Options for a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    /// Prefix of every value path; the same seed and plan give the same rows.
    pub seed: String,
    /// Attempts per record before a unique collision becomes an error.
    pub max_unique_attempts: u32,
    /// Fan-out for child fields with no count and no fingerprint count.
    pub default_child_count: CountConfig,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            seed: "seedwright".to_string(),
            max_unique_attempts: 50,
            default_child_count: CountConfig::default(),
        }
    }
}

/// Per-model counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelReport {
    pub rows_generated: u64,
    pub unique_retries: u64,
    /// Parents generated because no connect candidate matched or the field was omitted.
    pub fallback_parents: u64,
    pub connected: u64,
    pub defaults_applied: u64,
}

/// Report for a generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub run_seed: String,
    /// SHA-256 of the data model JSON the run was built from.
    pub data_model_digest: String,
    pub models: BTreeMap<String, ModelReport>,
    pub rows_total: u64,
    pub unique_retries_total: u64,
    pub generate_calls: u64,
}

impl GenerationReport {
    pub fn new(run_seed: String, data_model_digest: String) -> Self {
        Self {
            run_seed,
            data_model_digest,
            ..Self::default()
        }
    }

    fn model(&mut self, model: &str) -> &mut ModelReport {
        self.models.entry(model.to_string()).or_default()
    }

    pub fn record_row(&mut self, model: &str) {
        self.model(model).rows_generated += 1;
        self.rows_total += 1;
    }

    pub fn record_retry(&mut self, model: &str) {
        self.model(model).unique_retries += 1;
        self.unique_retries_total += 1;
    }

    pub fn record_fallback_parent(&mut self, model: &str) {
        self.model(model).fallback_parents += 1;
    }

    pub fn record_connect(&mut self, model: &str) {
        self.model(model).connected += 1;
    }

    pub fn record_default(&mut self, model: &str) {
        self.model(model).defaults_applied += 1;
    }
}

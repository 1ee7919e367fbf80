use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Fixed count or inclusive range, as written in plan documents and config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum CountConfig {
    Fixed(usize),
    Range { min: usize, max: usize },
}

impl CountConfig {
    pub fn bounds(self) -> (usize, usize) {
        match self {
            CountConfig::Fixed(value) => (value, value),
            CountConfig::Range { min, max } => (min, max),
        }
    }
}

impl Default for CountConfig {
    fn default() -> Self {
        CountConfig::Range { min: 1, max: 3 }
    }
}

/// Value options for a single field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldOptions {
    /// Fixed candidate list; one is picked per record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_year: Option<i32>,
}

/// Per-field generation override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FingerprintField {
    /// Default fan-out for a child field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<CountConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<FieldOptions>,
    /// Example JSON document whose shape json columns follow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,
}

/// `modelId -> fieldName -> override`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Fingerprint(pub BTreeMap<String, BTreeMap<String, FingerprintField>>);

impl Fingerprint {
    pub fn field(&self, model: &str, field: &str) -> Option<&FingerprintField> {
        self.0.get(model).and_then(|fields| fields.get(field))
    }

    pub fn insert(&mut self, model: impl Into<String>, field: impl Into<String>, value: FingerprintField) {
        self.0
            .entry(model.into())
            .or_default()
            .insert(field.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

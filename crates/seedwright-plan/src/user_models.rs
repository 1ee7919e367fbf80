use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Per-model defaults supplied by configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UserModel {
    /// Literal values used for fields the plan leaves out.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, serde_json::Value>,
    /// Connect omitted parent fields to existing rows before generating new parents.
    #[serde(default)]
    pub connect: bool,
}

/// `modelId -> UserModel`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct UserModels(pub BTreeMap<String, UserModel>);

impl UserModels {
    pub fn get(&self, model: &str) -> Option<&UserModel> {
        self.0.get(model)
    }

    pub fn insert(&mut self, model: impl Into<String>, value: UserModel) {
        self.0.insert(model.into(), value);
    }

    pub fn default_value(&self, model: &str, field: &str) -> Option<&serde_json::Value> {
        self.get(model).and_then(|entry| entry.data.get(field))
    }

    pub fn connects(&self, model: &str) -> bool {
        self.get(model).is_some_and(|entry| entry.connect)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

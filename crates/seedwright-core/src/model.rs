use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// SQL dialect the data model was introspected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    Mysql,
    Sqlite,
}

impl Dialect {
    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::Mysql => "mysql",
            Dialect::Sqlite => "sqlite",
        }
    }
}

/// Introspected schema snapshot, persisted as `dataModel.json`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DataModel {
    /// Dialect used for type classification and SQL rendering.
    pub dialect: Dialect,
    /// Models keyed by model id.
    pub models: BTreeMap<String, Model>,
    /// Enum types keyed by enum id.
    #[serde(default)]
    pub enums: BTreeMap<String, Enum>,
}

impl DataModel {
    /// Parse a `dataModel.json` document.
    pub fn from_json_str(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Render the model as pretty JSON, preserving the interchange field names.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn model(&self, id: &str) -> Option<&Model> {
        self.models.get(id)
    }

    pub fn enum_labels(&self, id: &str) -> Option<Vec<&str>> {
        self.enums
            .get(id)
            .map(|item| item.values.iter().map(|value| value.name.as_str()).collect())
    }
}

/// A table in the data model.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: String,
    pub table_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    pub fields: Vec<Field>,
    #[serde(default)]
    pub unique_constraints: Vec<UniqueConstraint>,
}

/// Field of a model: a column, or one side of a relation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Field {
    Scalar(ScalarField),
    Object(ObjectField),
}

impl Field {
    pub fn name(&self) -> &str {
        match self {
            Field::Scalar(field) => &field.name,
            Field::Object(field) => &field.name,
        }
    }
}

/// Column-backed field.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScalarField {
    pub name: String,
    pub column_name: String,
    /// Declared SQL type as reported by introspection (e.g. `varchar(255)`, `int4`, `text[]`).
    #[serde(rename = "type")]
    pub column_type: String,
    pub is_required: bool,
    #[serde(default)]
    pub is_id: bool,
    #[serde(default)]
    pub is_generated: bool,
    #[serde(default)]
    pub has_default_value: bool,
    #[serde(default)]
    pub is_list: bool,
    #[serde(default)]
    pub sequence: FieldSequence,
}

impl ScalarField {
    pub fn sequence(&self) -> Option<&SequenceInfo> {
        self.sequence.info()
    }
}

/// Sequence slot of a scalar field; `false` in JSON when the column has no sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FieldSequence {
    Disabled(bool),
    Enabled(SequenceInfo),
}

impl Default for FieldSequence {
    fn default() -> Self {
        FieldSequence::Disabled(false)
    }
}

impl FieldSequence {
    pub fn info(&self) -> Option<&SequenceInfo> {
        match self {
            FieldSequence::Enabled(info) => Some(info),
            FieldSequence::Disabled(_) => None,
        }
    }
}

/// Identity or serial sequence backing a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SequenceInfo {
    pub identifier: String,
    pub increment: i64,
    pub start: i64,
    /// Next value the database would hand out, when known at introspection time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<i64>,
}

/// Relation field. Parent side when `relation_from_fields` is non-empty.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectField {
    pub name: String,
    /// Id of the model on the other side of the relation.
    #[serde(rename = "type")]
    pub target: String,
    pub relation_name: String,
    #[serde(default)]
    pub relation_from_fields: Vec<String>,
    #[serde(default)]
    pub relation_to_fields: Vec<String>,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub is_list: bool,
}

impl ObjectField {
    pub fn is_parent(&self) -> bool {
        !self.relation_from_fields.is_empty()
    }

    pub fn is_child(&self) -> bool {
        self.relation_from_fields.is_empty()
    }
}

/// Unique constraint over one or more columns.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UniqueConstraint {
    pub name: String,
    pub fields: Vec<String>,
    #[serde(default)]
    pub null_not_distinct: bool,
}

/// Enum type definition.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Enum {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EnumValue {
    pub name: String,
}

/// Fields of a model split by role.
#[derive(Debug, Clone, Default)]
pub struct FieldGroups<'a> {
    pub scalars: Vec<&'a ScalarField>,
    pub parents: Vec<&'a ObjectField>,
    pub children: Vec<&'a ObjectField>,
}

/// Unique key tracked during generation; the primary key is reported as `name = "PRIMARY"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueKey {
    pub name: String,
    pub columns: Vec<String>,
    pub null_not_distinct: bool,
}

impl UniqueKey {
    /// Canonical key for the constraint's column set.
    pub fn field_key(&self) -> String {
        self.columns.join("|")
    }
}

impl Model {
    pub fn groups(&self) -> FieldGroups<'_> {
        let mut groups = FieldGroups::default();
        for field in &self.fields {
            match field {
                Field::Scalar(scalar) => groups.scalars.push(scalar),
                Field::Object(object) if object.is_parent() => groups.parents.push(object),
                Field::Object(object) => groups.children.push(object),
            }
        }
        groups
    }

    pub fn scalar_fields(&self) -> impl Iterator<Item = &ScalarField> {
        self.fields.iter().filter_map(|field| match field {
            Field::Scalar(scalar) => Some(scalar),
            Field::Object(_) => None,
        })
    }

    pub fn object_fields(&self) -> impl Iterator<Item = &ObjectField> {
        self.fields.iter().filter_map(|field| match field {
            Field::Object(object) => Some(object),
            Field::Scalar(_) => None,
        })
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name() == name)
    }

    pub fn scalar_by_column(&self, column: &str) -> Option<&ScalarField> {
        self.scalar_fields()
            .find(|scalar| scalar.column_name == column)
    }

    /// Qualified name used in logs and error messages (`schema.table`).
    pub fn qualified_name(&self) -> String {
        match &self.schema_name {
            Some(schema) => format!("{schema}.{}", self.table_name),
            None => self.table_name.clone(),
        }
    }

    pub fn id_columns(&self) -> Vec<String> {
        self.scalar_fields()
            .filter(|scalar| scalar.is_id)
            .map(|scalar| scalar.column_name.clone())
            .collect()
    }

    /// Columns identifying a single row: the primary key, or the first unique constraint.
    pub fn row_key_columns(&self) -> Option<Vec<String>> {
        let ids = self.id_columns();
        if !ids.is_empty() {
            return Some(ids);
        }
        self.unique_constraints
            .first()
            .map(|constraint| constraint.fields.clone())
    }

    /// Every unique key the generator must respect, primary key first, de-duplicated by columns.
    pub fn unique_keys(&self) -> Vec<UniqueKey> {
        let mut keys: Vec<UniqueKey> = Vec::new();
        let ids = self.id_columns();
        if !ids.is_empty() {
            keys.push(UniqueKey {
                name: "PRIMARY".to_string(),
                columns: ids,
                null_not_distinct: false,
            });
        }
        for constraint in &self.unique_constraints {
            if keys.iter().any(|key| key.columns == constraint.fields) {
                continue;
            }
            keys.push(UniqueKey {
                name: constraint.name.clone(),
                columns: constraint.fields.clone(),
                null_not_distinct: constraint.null_not_distinct,
            });
        }
        keys
    }

    pub fn is_unique_column(&self, column: &str) -> bool {
        self.unique_keys()
            .iter()
            .any(|key| key.columns.iter().any(|item| item == column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(name: &str, is_id: bool) -> Field {
        Field::Scalar(ScalarField {
            name: name.to_string(),
            column_name: name.to_string(),
            column_type: "int4".to_string(),
            is_required: true,
            is_id,
            is_generated: false,
            has_default_value: false,
            is_list: false,
            sequence: FieldSequence::default(),
        })
    }

    #[test]
    fn unique_keys_put_primary_first_and_skip_duplicates() {
        let model = Model {
            id: "Team".to_string(),
            table_name: "team".to_string(),
            schema_name: Some("public".to_string()),
            fields: vec![scalar("id", true), scalar("slug", false)],
            unique_constraints: vec![
                UniqueConstraint {
                    name: "team_pkey".to_string(),
                    fields: vec!["id".to_string()],
                    null_not_distinct: false,
                },
                UniqueConstraint {
                    name: "team_slug_key".to_string(),
                    fields: vec!["slug".to_string()],
                    null_not_distinct: false,
                },
            ],
        };

        let keys = model.unique_keys();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].name, "PRIMARY");
        assert_eq!(keys[1].field_key(), "slug");
        assert_eq!(model.qualified_name(), "public.team");
    }

    #[test]
    fn sequence_false_round_trips() {
        let json = r#"{"kind":"scalar","name":"id","columnName":"id","type":"int4","isRequired":true,"sequence":false}"#;
        let field: Field = serde_json::from_str(json).expect("parse field");
        let Field::Scalar(scalar) = &field else {
            panic!("expected scalar field");
        };
        assert!(scalar.sequence().is_none());
        let encoded = serde_json::to_value(&field).expect("encode field");
        assert_eq!(encoded["sequence"], serde_json::Value::Bool(false));
    }
}

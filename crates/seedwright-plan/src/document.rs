use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use seedwright_core::{ColumnKind, DataModel, Field, GeneratedValue, Model};

use crate::errors::{ValidationIssue, ValidationReport};
use crate::fingerprint::CountConfig;
use crate::record::{
    ChildSpec, ConnectMatcher, ConnectSpec, Criteria, FieldSpec, ModelRecord, Plan, RecordTemplate,
    ScalarSpec,
};

/// Marker object that leaves a column to its database default: `{"$default": true}`.
pub const DEFAULT_MARKER: &str = "$default";

/// JSON form of a plan, with no callbacks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PlanDocument {
    pub plans: Vec<PlanDocumentEntry>,
}

/// One top-level request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlanDocumentEntry {
    /// Model id from the data model.
    pub model: String,
    /// Defaults to one record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<CountConfig>,
    /// Field name to literal, nested parent, connect, or child set.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data: Map<String, Value>,
}

impl PlanDocument {
    pub fn from_json_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// Build the record tree, interpreting each `data` entry by the field it names.
    pub fn to_plan(&self, data_model: &DataModel) -> Result<Plan, ValidationReport> {
        let mut report = ValidationReport::default();
        let mut plan = Plan::new();

        for (idx, entry) in self.plans.iter().enumerate() {
            let path = format!("/plans/{idx}");
            let Some(model) = data_model.model(&entry.model) else {
                report.push_error(
                    ValidationIssue::error(
                        "model_not_found",
                        format!("{path}/model"),
                        format!("model '{}' is not in the data model", entry.model),
                    )
                    .with_hint("use a model id from dataModel.json"),
                );
                continue;
            };
            let record = convert_record(data_model, model, &entry.data, &format!("{path}/data"), &mut report);
            let records = ChildSpec::Repeat {
                count: entry.count.map(Into::into),
                template: RecordTemplate::Static(record),
            };
            plan = plan.model(entry.model.clone(), records);
        }

        if report.is_ok() { Ok(plan) } else { Err(report) }
    }
}

fn convert_record(
    data_model: &DataModel,
    model: &Model,
    data: &Map<String, Value>,
    path: &str,
    report: &mut ValidationReport,
) -> ModelRecord {
    let mut record = ModelRecord::new();

    for (name, value) in data {
        let field_path = format!("{path}/{name}");
        let Some(field) = model.field(name) else {
            report.push_error(ValidationIssue::error(
                "field_not_found",
                field_path,
                format!("field '{name}' is not defined on model '{}'", model.id),
            ));
            continue;
        };

        let spec = match field {
            Field::Scalar(scalar) => {
                if is_default_marker(value) {
                    Some(FieldSpec::Scalar(ScalarSpec::Default))
                } else {
                    let kind = ColumnKind::classify(&scalar.column_type, data_model.dialect, &data_model.enums);
                    match GeneratedValue::from_json(value, &kind) {
                        Ok(value) => Some(FieldSpec::Scalar(ScalarSpec::Value(value))),
                        Err(message) => {
                            report.push_error(ValidationIssue::error("invalid_literal", field_path, message));
                            None
                        }
                    }
                }
            }
            Field::Object(object) => {
                let Some(target) = data_model.model(&object.target) else {
                    report.push_error(ValidationIssue::error(
                        "model_not_found",
                        field_path,
                        format!("relation target '{}' is not in the data model", object.target),
                    ));
                    continue;
                };
                if object.is_parent() {
                    convert_parent(data_model, target, value, &field_path, report)
                } else {
                    convert_children(data_model, target, value, &field_path, report)
                }
            }
        };

        if let Some(spec) = spec {
            record = record.field(name.clone(), spec);
        }
    }

    record
}

fn convert_parent(
    data_model: &DataModel,
    target: &Model,
    value: &Value,
    path: &str,
    report: &mut ValidationReport,
) -> Option<FieldSpec> {
    let Value::Object(object) = value else {
        report.push_error(
            ValidationIssue::error("invalid_parent", path, "parent field expects an object")
                .with_hint("use a nested record or {\"connect\": {...}}"),
        );
        return None;
    };

    let Some(connect) = object.get("connect") else {
        let nested = convert_record(data_model, target, object, path, report);
        return Some(FieldSpec::Nested(Box::new(nested)));
    };

    let matcher = match connect {
        Value::Bool(true) => ConnectMatcher::Any,
        Value::Object(criteria) => {
            let mut converted = Criteria::new();
            for (column, literal) in criteria {
                let Some(scalar) = target.scalar_by_column(column) else {
                    report.push_error(ValidationIssue::error(
                        "column_not_found",
                        format!("{path}/connect/{column}"),
                        format!("column '{column}' is not defined on model '{}'", target.id),
                    ));
                    continue;
                };
                let kind = ColumnKind::classify(&scalar.column_type, data_model.dialect, &data_model.enums);
                match GeneratedValue::from_json(literal, &kind) {
                    Ok(value) => {
                        converted.insert(column.clone(), value);
                    }
                    Err(message) => report.push_error(ValidationIssue::error(
                        "invalid_literal",
                        format!("{path}/connect/{column}"),
                        message,
                    )),
                }
            }
            ConnectMatcher::Criteria(converted)
        }
        _ => {
            report.push_error(ValidationIssue::error(
                "invalid_connect",
                format!("{path}/connect"),
                "connect expects true or an object of column criteria",
            ));
            return None;
        }
    };

    let fallback = match object.get("fallback") {
        None => true,
        Some(Value::Bool(flag)) => *flag,
        Some(_) => {
            report.push_error(ValidationIssue::error(
                "invalid_connect",
                format!("{path}/fallback"),
                "fallback expects a boolean",
            ));
            true
        }
    };

    Some(FieldSpec::Connect(ConnectSpec { matcher, fallback }))
}

fn convert_children(
    data_model: &DataModel,
    target: &Model,
    value: &Value,
    path: &str,
    report: &mut ValidationReport,
) -> Option<FieldSpec> {
    match value {
        Value::Array(items) => {
            let mut records = Vec::with_capacity(items.len());
            for (idx, item) in items.iter().enumerate() {
                let item_path = format!("{path}/{idx}");
                let Value::Object(data) = item else {
                    report.push_error(ValidationIssue::error(
                        "invalid_child",
                        item_path,
                        "child record expects an object",
                    ));
                    continue;
                };
                records.push(convert_record(data_model, target, data, &item_path, report));
            }
            Some(FieldSpec::Child(ChildSpec::Records(records)))
        }
        Value::Object(object) => {
            let count = match object.get("count") {
                None => None,
                Some(count) => match serde_json::from_value::<CountConfig>(count.clone()) {
                    Ok(count) => Some(count.into()),
                    Err(err) => {
                        report.push_error(ValidationIssue::error(
                            "invalid_count",
                            format!("{path}/count"),
                            err.to_string(),
                        ));
                        return None;
                    }
                },
            };
            let template = match object.get("data") {
                None => ModelRecord::new(),
                Some(Value::Object(data)) => {
                    convert_record(data_model, target, data, &format!("{path}/data"), report)
                }
                Some(_) => {
                    report.push_error(ValidationIssue::error(
                        "invalid_child",
                        format!("{path}/data"),
                        "child data expects an object",
                    ));
                    return None;
                }
            };
            Some(FieldSpec::Child(ChildSpec::Repeat {
                count,
                template: RecordTemplate::Static(template),
            }))
        }
        Value::Number(number) => match number.as_u64() {
            Some(count) => Some(FieldSpec::Child(ChildSpec::count(count as usize))),
            None => {
                report.push_error(ValidationIssue::error(
                    "invalid_count",
                    path,
                    "child count must be a non-negative integer",
                ));
                None
            }
        },
        _ => {
            report.push_error(
                ValidationIssue::error("invalid_child", path, "child field expects an array, a count or an object")
                    .with_hint("use [{...}], 3 or {\"count\": {\"min\": 1, \"max\": 3}, \"data\": {...}}"),
            );
            None
        }
    }
}

fn is_default_marker(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.len() == 1 && map.get(DEFAULT_MARKER) == Some(&Value::Bool(true)))
}

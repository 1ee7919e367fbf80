use jsonschema::JSONSchema;
use serde_json::Value;

use seedwright_core::{DataModel, Field, GeneratedValue, Model};

use crate::document::PlanDocument;
use crate::errors::{IssueSeverity, PlanError, ValidationIssue, ValidationReport};
use crate::fingerprint::Fingerprint;
use crate::record::{
    ChildSpec, ConnectMatcher, CountSpec, FieldSpec, ModelRecord, Plan, RecordTemplate, ScalarSpec,
};
use crate::schema::plan_json_schema;
use crate::user_models::UserModels;

/// Validated plan with accumulated warnings.
#[derive(Debug, Clone)]
pub struct ValidatedPlan {
    pub plan: Plan,
    pub warnings: Vec<ValidationIssue>,
}

/// Validate a plan JSON document against the plan JSON Schema.
pub fn validate_plan_json(
    plan_json: &Value,
    plan_schema: &Value,
) -> Result<ValidationReport, PlanError> {
    let compiled =
        JSONSchema::compile(plan_schema).map_err(|err| PlanError::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();

    if let Err(errors) = compiled.validate(plan_json) {
        for error in errors {
            let path = normalized_json_pointer(&error.instance_path.to_string());
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "schema_violation",
                path,
                error.to_string(),
                None,
            ));
        }
    }

    Ok(report)
}

/// Validate a plan document end-to-end and build its record tree.
pub fn load_plan(plan_json: &Value, data_model: &DataModel) -> Result<ValidatedPlan, ValidationReport> {
    let plan_schema = match serde_json::to_value(plan_json_schema()) {
        Ok(schema) => schema,
        Err(err) => return Err(single_error("schema_validation_error", err.to_string())),
    };

    let structural = match validate_plan_json(plan_json, &plan_schema) {
        Ok(report) => report,
        Err(err) => return Err(single_error("schema_validation_error", err.to_string())),
    };

    if !structural.is_ok() {
        return Err(structural);
    }

    let document = match PlanDocument::from_json_value(plan_json.clone()) {
        Ok(document) => document,
        Err(err) => return Err(single_error("invalid_plan_json", err.to_string())),
    };

    let plan = document.to_plan(data_model)?;
    let report = validate_plan(&plan, data_model);
    if !report.is_ok() {
        return Err(report);
    }

    Ok(ValidatedPlan {
        plan,
        warnings: report.warnings,
    })
}

fn single_error(code: &str, message: String) -> ValidationReport {
    let mut report = ValidationReport::default();
    report.push_error(ValidationIssue::error(code, "/", message));
    report
}

/// Check a record tree against the data model before any generation starts.
pub fn validate_plan(plan: &Plan, data_model: &DataModel) -> ValidationReport {
    let mut report = ValidationReport::default();

    if plan.is_empty() {
        report.push_warning(ValidationIssue::warning(
            "plan_empty",
            "/plans",
            "plan requests no records",
        ));
    }

    for (idx, entry) in plan.entries.iter().enumerate() {
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
        validate_set(data_model, model, &entry.records, &path, &mut report);
    }

    report
}

fn validate_set(
    data_model: &DataModel,
    model: &Model,
    spec: &ChildSpec,
    path: &str,
    report: &mut ValidationReport,
) {
    match spec {
        ChildSpec::Records(records) => {
            for (idx, record) in records.iter().enumerate() {
                validate_record(data_model, model, record, &format!("{path}/{idx}"), report);
            }
        }
        ChildSpec::Repeat { count, template } => {
            if let Some(CountSpec::Range { min, max }) = count
                && min > max
            {
                report.push_error(
                    ValidationIssue::error(
                        "invalid_range",
                        format!("{path}/count"),
                        format!("count range min {min} is greater than max {max}"),
                    )
                    .with_hint("swap min and max"),
                );
            }
            if let RecordTemplate::Static(record) = template {
                validate_record(data_model, model, record, &format!("{path}/data"), report);
            }
        }
    }
}

fn validate_record(
    data_model: &DataModel,
    model: &Model,
    record: &ModelRecord,
    path: &str,
    report: &mut ValidationReport,
) {
    for (name, spec) in &record.fields {
        let field_path = format!("{path}/{name}");
        let Some(field) = model.field(name) else {
            report.push_error(ValidationIssue::error(
                "field_not_found",
                field_path,
                format!("field '{name}' is not defined on model '{}'", model.id),
            ));
            continue;
        };

        match (field, spec) {
            (Field::Scalar(scalar), FieldSpec::Scalar(scalar_spec)) => match scalar_spec {
                ScalarSpec::Value(GeneratedValue::Null) if scalar.is_required => {
                    report.push_error(ValidationIssue::error(
                        "null_required",
                        field_path,
                        format!("field '{name}' is required and cannot be null"),
                    ));
                }
                ScalarSpec::Default if !scalar.has_default_value => {
                    report.push_warning(
                        ValidationIssue::warning(
                            "no_database_default",
                            field_path,
                            format!("field '{name}' has no database default"),
                        )
                        .with_hint("the database will insert NULL or reject the row"),
                    );
                }
                ScalarSpec::Value(_) if scalar.is_generated => {
                    report.push_warning(ValidationIssue::warning(
                        "generated_column_override",
                        field_path,
                        format!("field '{name}' is generated by the database"),
                    ));
                }
                _ => {}
            },
            (Field::Object(object), FieldSpec::Nested(nested)) if object.is_parent() => {
                if let Some(target) = data_model.model(&object.target) {
                    validate_record(data_model, target, nested, &field_path, report);
                }
            }
            (Field::Object(object), FieldSpec::Connect(connect)) if object.is_parent() => {
                if let ConnectMatcher::Criteria(criteria) = &connect.matcher
                    && let Some(target) = data_model.model(&object.target)
                {
                    for column in criteria.keys() {
                        if target.scalar_by_column(column).is_none() {
                            report.push_error(ValidationIssue::error(
                                "column_not_found",
                                format!("{field_path}/connect/{column}"),
                                format!(
                                    "column '{column}' is not defined on model '{}'",
                                    target.id
                                ),
                            ));
                        }
                    }
                }
            }
            (Field::Object(object), FieldSpec::Child(child)) if object.is_child() => {
                if let Some(target) = data_model.model(&object.target) {
                    validate_set(data_model, target, child, &field_path, report);
                }
            }
            (field, spec) => {
                report.push_error(
                    ValidationIssue::error(
                        "field_kind_mismatch",
                        field_path,
                        format!("{} instruction does not apply to {}", spec.kind(), field_role(field)),
                    )
                    .with_hint(
                        "scalars take values, parents take nested records or connect, children take record sets",
                    ),
                );
            }
        }
    }
}

fn field_role(field: &Field) -> String {
    match field {
        Field::Scalar(scalar) => format!("scalar field '{}'", scalar.name),
        Field::Object(object) if object.is_parent() => format!("parent field '{}'", object.name),
        Field::Object(object) => format!("child field '{}'", object.name),
    }
}

/// Check fingerprint and user model entries against the data model. Unknown entries are warnings.
pub fn validate_config(
    fingerprint: &Fingerprint,
    user_models: &UserModels,
    data_model: &DataModel,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    for (model_id, fields) in &fingerprint.0 {
        let path = format!("/fingerprint/{model_id}");
        let Some(model) = data_model.model(model_id) else {
            report.push_warning(ValidationIssue::warning(
                "model_not_found",
                path,
                format!("fingerprint model '{model_id}' is not in the data model"),
            ));
            continue;
        };
        for (name, entry) in fields {
            let field_path = format!("{path}/{name}");
            match model.field(name) {
                None => report.push_warning(ValidationIssue::warning(
                    "field_not_found",
                    field_path,
                    format!("fingerprint field '{name}' is not defined on '{model_id}'"),
                )),
                Some(Field::Object(object)) if object.is_child() => {
                    if let Some((min, max)) = entry.count.map(|count| count.bounds())
                        && min > max
                    {
                        report.push_error(ValidationIssue::error(
                            "invalid_range",
                            format!("{field_path}/count"),
                            format!("count range min {min} is greater than max {max}"),
                        ));
                    }
                }
                Some(_) if entry.count.is_some() => report.push_warning(ValidationIssue::warning(
                    "count_ignored",
                    format!("{field_path}/count"),
                    "count only applies to child fields",
                )),
                Some(_) => {
                    if let Some(options) = &entry.options
                        && let (Some(min), Some(max)) = (options.min, options.max)
                        && min > max
                    {
                        report.push_error(ValidationIssue::error(
                            "invalid_range",
                            format!("{field_path}/options"),
                            format!("options min {min} is greater than max {max}"),
                        ));
                    }
                }
            }
        }
    }

    for (model_id, entry) in &user_models.0 {
        let path = format!("/models/{model_id}");
        let Some(model) = data_model.model(model_id) else {
            report.push_warning(ValidationIssue::warning(
                "model_not_found",
                path,
                format!("user model '{model_id}' is not in the data model"),
            ));
            continue;
        };
        for name in entry.data.keys() {
            if !matches!(model.field(name), Some(Field::Scalar(_))) {
                report.push_warning(ValidationIssue::warning(
                    "field_not_found",
                    format!("{path}/data/{name}"),
                    format!("'{name}' is not a scalar field of '{model_id}'"),
                ));
            }
        }
    }

    report
}

fn normalized_json_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}

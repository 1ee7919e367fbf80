use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::model::{DataModel, Field, Model};

/// Validate internal consistency of a data model.
///
/// This checks:
/// - model keys match model ids
/// - duplicate field and column names
/// - relation columns and targets exist on both sides
/// - every child-side field has a matching parent-side field
/// - unique constraint columns exist
/// - sequences advance
pub fn validate_data_model(data_model: &DataModel) -> Result<()> {
    for (key, model) in &data_model.models {
        if key != &model.id {
            return Err(Error::InvalidDataModel(format!(
                "model key '{key}' does not match id '{}'",
                model.id
            )));
        }
        validate_fields(model)?;
    }

    for model in data_model.models.values() {
        for field in model.object_fields() {
            let Some(target) = data_model.model(&field.target) else {
                return Err(Error::InvalidDataModel(format!(
                    "relation target not found: {}.{} -> {}",
                    model.id, field.name, field.target
                )));
            };

            if field.is_parent() {
                if field.relation_from_fields.len() != field.relation_to_fields.len() {
                    return Err(Error::InvalidDataModel(format!(
                        "relation column count mismatch: {}.{}",
                        model.id, field.name
                    )));
                }
                for column in &field.relation_from_fields {
                    if model.scalar_by_column(column).is_none() {
                        return Err(Error::InvalidDataModel(format!(
                            "relation column not found: {}.{}",
                            model.id, column
                        )));
                    }
                }
                for column in &field.relation_to_fields {
                    if target.scalar_by_column(column).is_none() {
                        return Err(Error::InvalidDataModel(format!(
                            "referenced column not found: {}.{}",
                            target.id, column
                        )));
                    }
                }
            } else if data_model.child_relation(&model.id, &field.name).is_none() {
                return Err(Error::InvalidDataModel(format!(
                    "child relation '{}' on {} has no parent field on {}",
                    field.relation_name, model.id, target.id
                )));
            }
        }
    }

    Ok(())
}

fn validate_fields(model: &Model) -> Result<()> {
    let mut names = BTreeSet::new();
    let mut columns = BTreeSet::new();

    for field in &model.fields {
        if !names.insert(field.name()) {
            return Err(Error::InvalidDataModel(format!(
                "duplicate field name: {}.{}",
                model.id,
                field.name()
            )));
        }
        if let Field::Scalar(scalar) = field {
            if !columns.insert(scalar.column_name.as_str()) {
                return Err(Error::InvalidDataModel(format!(
                    "duplicate column name: {}.{}",
                    model.id, scalar.column_name
                )));
            }
            if let Some(sequence) = scalar.sequence()
                && sequence.increment == 0
            {
                return Err(Error::InvalidDataModel(format!(
                    "sequence '{}' has zero increment",
                    sequence.identifier
                )));
            }
        }
    }

    for constraint in &model.unique_constraints {
        if constraint.fields.is_empty() {
            return Err(Error::InvalidDataModel(format!(
                "unique constraint '{}' on {} has no columns",
                constraint.name, model.id
            )));
        }
        for column in &constraint.fields {
            if !columns.contains(column.as_str()) {
                return Err(Error::InvalidDataModel(format!(
                    "unique column not found: {}.{}",
                    model.id, column
                )));
            }
        }
    }

    Ok(())
}

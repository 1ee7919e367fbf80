//! Row store and dependency-ordered SQL serialization.

pub mod sql;

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use seedwright_core::{Cell, DataModel, GeneratedValue, InsertionPlan, Model, Row, plan_insertion};
use seedwright_plan::StoreView;

use crate::errors::{GenerationError, Result};

/// FK values written after every INSERT, addressed by row ordinal.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredUpdate {
    pub model: String,
    pub ordinal: usize,
    pub assignments: Vec<(String, GeneratedValue)>,
}

/// Resolved rows per model, in insertion order.
///
/// `existing` holds rows already present in the database: they can be connected to but are
/// never serialized.
#[derive(Debug, Clone, Default)]
pub struct Store {
    rows: BTreeMap<String, Vec<Row>>,
    existing: BTreeMap<String, Vec<Row>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row and return its ordinal within the model.
    pub fn add(&mut self, model: &str, row: Row) -> usize {
        let rows = self.rows.entry(model.to_string()).or_default();
        rows.push(row);
        rows.len() - 1
    }

    pub fn add_existing<I>(&mut self, model: &str, rows: I)
    where
        I: IntoIterator<Item = Row>,
    {
        self.existing
            .entry(model.to_string())
            .or_default()
            .extend(rows);
    }

    pub fn get(&self, model: &str, ordinal: usize) -> Option<&Row> {
        self.rows.get(model).and_then(|rows| rows.get(ordinal))
    }

    /// Model ids holding at least one generated row.
    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(model, _)| model.as_str())
    }

    pub fn len(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row count per model, used as a checkpoint for [`Store::split_since`].
    pub fn lengths(&self) -> BTreeMap<String, usize> {
        self.rows
            .iter()
            .map(|(model, rows)| (model.clone(), rows.len()))
            .collect()
    }

    /// Rows appended after the `lengths` checkpoint, as a store of their own.
    pub fn split_since(&self, lengths: &BTreeMap<String, usize>) -> Store {
        let mut rows = BTreeMap::new();
        for (model, model_rows) in &self.rows {
            let start = lengths.get(model).copied().unwrap_or(0);
            if model_rows.len() > start {
                rows.insert(model.clone(), model_rows[start..].to_vec());
            }
        }
        Store {
            rows,
            existing: BTreeMap::new(),
        }
    }

    /// Insertion order for the models present in the store.
    pub fn topological_order(&self, data_model: &DataModel) -> Result<InsertionPlan> {
        let models: BTreeSet<String> = self.models().map(str::to_string).collect();
        Ok(plan_insertion(data_model, &models)?)
    }

    /// Every INSERT in dependency order, then the UPDATEs that fill deferred FK columns.
    pub fn to_sql(&self, data_model: &DataModel) -> Result<Vec<String>> {
        let plan = self.topological_order(data_model)?;
        let dialect = data_model.dialect;
        let mut inserts = Vec::new();
        let mut updates = Vec::new();

        for model_id in &plan.order {
            let model = data_model.model(model_id).ok_or_else(|| {
                GenerationError::InvalidDataModel(format!("model '{model_id}' not found"))
            })?;
            let rows = self.rows(model_id);
            let deferred_columns: Vec<&[String]> = plan
                .deferred_for(model_id)
                .map(|edge| edge.columns.as_slice())
                .collect();

            let mut model_updates = Vec::new();
            let mut model_inserts = Vec::with_capacity(rows.len());
            for (ordinal, row) in rows.iter().enumerate() {
                let (row, deferred) = split_deferred(model_id, ordinal, row, &deferred_columns);
                if let Some(deferred) = deferred {
                    model_updates.push(deferred);
                }
                model_inserts.push(sql::insert_statement(dialect, model, &row));
            }

            for deferred in &model_updates {
                let key = row_key(model, &rows[deferred.ordinal])?;
                updates.push(sql::update_statement(
                    dialect,
                    model,
                    &key,
                    &deferred.assignments,
                ));
            }

            debug!(
                model = %model_id,
                rows = rows.len(),
                deferred = model_updates.len(),
                "model serialized"
            );
            inserts.extend(model_inserts);
        }

        inserts.extend(updates);
        Ok(inserts)
    }
}

/// Null out deferred FK columns that hold a value and collect them as an update.
fn split_deferred(
    model: &str,
    ordinal: usize,
    row: &Row,
    deferred_columns: &[&[String]],
) -> (Row, Option<DeferredUpdate>) {
    let mut assignments = Vec::new();
    let mut insert_row = row.clone();
    for columns in deferred_columns {
        let set = columns.iter().any(|column| {
            matches!(row.get(column), Some(Cell::Value(value)) if !value.is_null())
        });
        if !set {
            continue;
        }
        for column in columns.iter() {
            if let Some(Cell::Value(value)) = row.get(column)
                && !assignments.iter().any(|(name, _)| name == column)
            {
                assignments.push((column.clone(), value.clone()));
                insert_row.insert(column.clone(), Cell::Value(GeneratedValue::Null));
            }
        }
    }

    if assignments.is_empty() {
        return (insert_row, None);
    }
    let update = DeferredUpdate {
        model: model.to_string(),
        ordinal,
        assignments,
    };
    (insert_row, Some(update))
}

/// Key values that identify a row for a deferred UPDATE.
fn row_key(model: &Model, row: &Row) -> Result<Vec<(String, GeneratedValue)>> {
    let unbreakable = || GenerationError::UnbreakableCycle {
        models: vec![model.id.clone()],
    };
    let columns = model.row_key_columns().ok_or_else(unbreakable)?;
    columns
        .into_iter()
        .map(|column| match row.get(&column) {
            Some(Cell::Value(value)) if !value.is_null() => Ok((column, value.clone())),
            _ => Err(unbreakable()),
        })
        .collect()
}

impl StoreView for Store {
    fn rows(&self, model: &str) -> &[Row] {
        self.rows.get(model).map(Vec::as_slice).unwrap_or_default()
    }

    fn existing_rows(&self, model: &str) -> &[Row] {
        self.existing.get(model).map(Vec::as_slice).unwrap_or_default()
    }
}

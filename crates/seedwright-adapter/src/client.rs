use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use seedwright_core::{Cell, ColumnKind, DataModel, GeneratedValue, Model, Row};
use seedwright_generate::store::sql::{quote_ident, table_name};

use crate::errors::{AdapterError, Result};

/// Minimal client surface the generator needs from a database driver.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<()>;

    /// Result rows as JSON objects keyed by column name.
    async fn query(&self, sql: &str) -> Result<Vec<Value>>;
}

/// Run a query and deserialize each row.
pub async fn query_as<T: DeserializeOwned>(client: &dyn DatabaseClient, sql: &str) -> Result<Vec<T>> {
    client
        .query(sql)
        .await?
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(AdapterError::from))
        .collect()
}

/// Execute `statements` in order, stopping at the first failure.
pub async fn apply_statements(client: &dyn DatabaseClient, statements: &[String]) -> Result<usize> {
    for (index, statement) in statements.iter().enumerate() {
        debug!(index, "executing statement");
        if let Err(err) = client.execute(statement).await {
            warn!(index, error = %err, "statement failed");
            return Err(AdapterError::Statement {
                index,
                message: err.to_string(),
            });
        }
    }
    info!(statements = statements.len(), "statements applied");
    Ok(statements.len())
}

/// Read the current rows of a model so they can be registered as pre-existing.
pub async fn fetch_existing_rows(
    client: &dyn DatabaseClient,
    data_model: &DataModel,
    model_id: &str,
) -> Result<Vec<Row>> {
    let model = data_model.model(model_id).ok_or_else(|| AdapterError::Decode {
        model: model_id.to_string(),
        message: "model is not in the data model".to_string(),
    })?;
    let dialect = data_model.dialect;
    let columns: Vec<String> = model
        .scalar_fields()
        .map(|field| quote_ident(dialect, &field.column_name))
        .collect();
    let sql = format!(
        "SELECT {} FROM {};",
        columns.join(", "),
        table_name(dialect, model)
    );

    let records = client.query(&sql).await?;
    let rows = records
        .iter()
        .map(|record| decode_row(data_model, model, record))
        .collect::<Result<Vec<_>>>()?;
    info!(model = %model_id, rows = rows.len(), "existing rows fetched");
    Ok(rows)
}

fn decode_row(data_model: &DataModel, model: &Model, record: &Value) -> Result<Row> {
    let decode_error = |message: String| AdapterError::Decode {
        model: model.id.clone(),
        message,
    };
    let object = record
        .as_object()
        .ok_or_else(|| decode_error(format!("expected an object, got {record}")))?;

    let mut row = Row::new();
    for field in model.scalar_fields() {
        let Some(value) = object.get(&field.column_name) else {
            continue;
        };
        let kind = ColumnKind::classify(&field.column_type, data_model.dialect, &data_model.enums);
        let value = GeneratedValue::from_json(value, &kind)
            .map_err(|message| decode_error(format!("{}: {message}", field.column_name)))?;
        row.insert(field.column_name.clone(), Cell::Value(value));
    }
    Ok(row)
}

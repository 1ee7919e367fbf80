//! Dialect-specific SQL rendering for stored rows.

use serde_json::{Number, Value};

use seedwright_core::{Cell, Dialect, GeneratedValue, Model, Row};

pub fn quote_ident(dialect: Dialect, ident: &str) -> String {
    match dialect {
        Dialect::Mysql => format!("`{}`", ident.replace('`', "``")),
        Dialect::Postgres | Dialect::Sqlite => format!("\"{}\"", ident.replace('"', "\"\"")),
    }
}

/// Table reference, schema-qualified except on SQLite.
pub fn table_name(dialect: Dialect, model: &Model) -> String {
    match (&model.schema_name, dialect) {
        (Some(schema), Dialect::Postgres | Dialect::Mysql) => format!(
            "{}.{}",
            quote_ident(dialect, schema),
            quote_ident(dialect, &model.table_name)
        ),
        _ => quote_ident(dialect, &model.table_name),
    }
}

pub fn quote_str(dialect: Dialect, text: &str) -> String {
    let escaped = match dialect {
        Dialect::Mysql => text.replace('\\', "\\\\").replace('\'', "''"),
        Dialect::Postgres | Dialect::Sqlite => text.replace('\'', "''"),
    };
    format!("'{escaped}'")
}

/// SQL literal for a value.
pub fn literal(dialect: Dialect, value: &GeneratedValue) -> String {
    match value {
        GeneratedValue::Null => "NULL".to_string(),
        GeneratedValue::Bool(flag) => match (dialect, flag) {
            (Dialect::Postgres, true) => "true".to_string(),
            (Dialect::Postgres, false) => "false".to_string(),
            (_, true) => "1".to_string(),
            (_, false) => "0".to_string(),
        },
        GeneratedValue::Int(number) => number.to_string(),
        GeneratedValue::Float(number) if number.is_finite() => number.to_string(),
        GeneratedValue::Float(number) => quote_str(dialect, &non_finite(*number)),
        GeneratedValue::Text(text) | GeneratedValue::Uuid(text) => quote_str(dialect, text),
        GeneratedValue::Date(_) | GeneratedValue::Time(_) => quote_str(dialect, &value.key()),
        GeneratedValue::Timestamp(stamp) => {
            quote_str(dialect, &stamp.format("%Y-%m-%d %H:%M:%S%.f").to_string())
        }
        GeneratedValue::Json(json) => quote_str(dialect, &json.to_string()),
        GeneratedValue::Array(items) => match dialect {
            Dialect::Postgres => quote_str(dialect, &pg_array(items)),
            Dialect::Mysql | Dialect::Sqlite => {
                quote_str(dialect, &Value::Array(items.iter().map(to_json).collect()).to_string())
            }
        },
        GeneratedValue::Bytes(bytes) => match dialect {
            Dialect::Postgres => format!("'\\x{}'", hex::encode(bytes)),
            Dialect::Mysql | Dialect::Sqlite => format!("X'{}'", hex::encode(bytes)),
        },
    }
}

fn non_finite(number: f64) -> String {
    if number.is_nan() {
        "NaN".to_string()
    } else if number.is_sign_negative() {
        "-Infinity".to_string()
    } else {
        "Infinity".to_string()
    }
}

/// Postgres array literal body, e.g. `{1,2}` or `{"a","b \"c\""}`.
fn pg_array(items: &[GeneratedValue]) -> String {
    let parts: Vec<String> = items
        .iter()
        .map(|item| match item {
            GeneratedValue::Null => "NULL".to_string(),
            GeneratedValue::Bool(flag) => flag.to_string(),
            GeneratedValue::Int(number) => number.to_string(),
            GeneratedValue::Float(number) if number.is_finite() => number.to_string(),
            GeneratedValue::Array(inner) => pg_array(inner),
            other => {
                let text = match other {
                    GeneratedValue::Float(number) => non_finite(*number),
                    GeneratedValue::Timestamp(stamp) => {
                        stamp.format("%Y-%m-%d %H:%M:%S%.f").to_string()
                    }
                    other => other.key(),
                };
                format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
            }
        })
        .collect();
    format!("{{{}}}", parts.join(","))
}

fn to_json(value: &GeneratedValue) -> Value {
    match value {
        GeneratedValue::Null => Value::Null,
        GeneratedValue::Bool(flag) => Value::Bool(*flag),
        GeneratedValue::Int(number) => Value::from(*number),
        GeneratedValue::Float(number) => Number::from_f64(*number)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        GeneratedValue::Json(json) => json.clone(),
        GeneratedValue::Array(items) => Value::Array(items.iter().map(to_json).collect()),
        other => Value::String(other.key()),
    }
}

/// `INSERT` for one row. Columns follow the model's field order; `Default` cells are left out.
pub fn insert_statement(dialect: Dialect, model: &Model, row: &Row) -> String {
    let mut columns = Vec::new();
    let mut values = Vec::new();
    for field in model.scalar_fields() {
        if let Some(Cell::Value(value)) = row.get(&field.column_name) {
            columns.push(quote_ident(dialect, &field.column_name));
            values.push(literal(dialect, value));
        }
    }

    let table = table_name(dialect, model);
    if columns.is_empty() {
        return match dialect {
            Dialect::Mysql => format!("INSERT INTO {table} () VALUES ();"),
            Dialect::Postgres | Dialect::Sqlite => format!("INSERT INTO {table} DEFAULT VALUES;"),
        };
    }
    format!(
        "INSERT INTO {table} ({}) VALUES ({});",
        columns.join(", "),
        values.join(", ")
    )
}

/// `UPDATE` setting `assignments` on the row identified by `key`.
pub fn update_statement(
    dialect: Dialect,
    model: &Model,
    key: &[(String, GeneratedValue)],
    assignments: &[(String, GeneratedValue)],
) -> String {
    let set: Vec<String> = assignments
        .iter()
        .map(|(column, value)| format!("{} = {}", quote_ident(dialect, column), literal(dialect, value)))
        .collect();
    let filter: Vec<String> = key
        .iter()
        .map(|(column, value)| format!("{} = {}", quote_ident(dialect, column), literal(dialect, value)))
        .collect();
    format!(
        "UPDATE {} SET {} WHERE {};",
        table_name(dialect, model),
        set.join(", "),
        filter.join(" AND ")
    )
}

/// Move a Postgres sequence so its next value follows `last`.
pub fn setval_statement(identifier: &str, last: i64) -> String {
    format!(
        "SELECT setval({}, {last}, true);",
        quote_str(Dialect::Postgres, identifier)
    )
}

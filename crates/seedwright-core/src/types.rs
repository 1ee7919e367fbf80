use std::collections::BTreeMap;

use crate::model::{Dialect, Enum};

/// Generation-relevant classification of a declared SQL column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    SmallInt,
    Int,
    BigInt,
    Float,
    Decimal { scale: Option<u32> },
    Bool,
    Text { max_len: Option<u32> },
    Uuid,
    Date,
    Time,
    Timestamp { with_time_zone: bool },
    Json,
    Bytes,
    Enum(String),
    Array(Box<ColumnKind>),
    Unknown(String),
}

impl ColumnKind {
    /// Classify a declared type such as `varchar(255)`, `int4`, `_text` or `timestamptz`.
    pub fn classify(column_type: &str, dialect: Dialect, enums: &BTreeMap<String, Enum>) -> Self {
        let raw = column_type.trim();
        if let Some(inner) = raw.strip_suffix("[]") {
            return ColumnKind::Array(Box::new(Self::classify(inner, dialect, enums)));
        }
        if dialect == Dialect::Postgres
            && let Some(inner) = raw.strip_prefix('_')
        {
            return ColumnKind::Array(Box::new(Self::classify(inner, dialect, enums)));
        }

        if enums.contains_key(raw) {
            return ColumnKind::Enum(raw.to_string());
        }

        let lower = raw.to_lowercase();
        let (base, args) = split_type_args(&lower);

        if dialect == Dialect::Mysql && base == "tinyint" && args.first() == Some(&1) {
            return ColumnKind::Bool;
        }

        match base.as_str() {
            "int2" | "smallint" | "smallserial" | "serial2" | "tinyint" => ColumnKind::SmallInt,
            "int" | "int4" | "integer" | "serial" | "serial4" | "mediumint" => ColumnKind::Int,
            "int8" | "bigint" | "bigserial" | "serial8" => ColumnKind::BigInt,
            "float4" | "float8" | "real" | "double precision" | "double" | "float" => {
                ColumnKind::Float
            }
            "numeric" | "decimal" | "money" => ColumnKind::Decimal {
                scale: args.get(1).copied(),
            },
            "bool" | "boolean" => ColumnKind::Bool,
            "text" | "varchar" | "character varying" | "char" | "character" | "bpchar"
            | "citext" | "name" | "tinytext" | "mediumtext" | "longtext" | "nvarchar"
            | "nchar" | "clob" => ColumnKind::Text {
                max_len: args.first().copied(),
            },
            "uuid" => ColumnKind::Uuid,
            "date" => ColumnKind::Date,
            "time" | "timetz" | "time with time zone" | "time without time zone" => {
                ColumnKind::Time
            }
            "timestamp" | "timestamp without time zone" | "datetime" => ColumnKind::Timestamp {
                with_time_zone: false,
            },
            "timestamptz" | "timestamp with time zone" => ColumnKind::Timestamp {
                with_time_zone: true,
            },
            "json" | "jsonb" => ColumnKind::Json,
            "bytea" | "blob" | "binary" | "varbinary" | "longblob" => ColumnKind::Bytes,
            _ if dialect == Dialect::Sqlite => sqlite_affinity(&base, &args, raw),
            _ => ColumnKind::Unknown(raw.to_string()),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ColumnKind::SmallInt
                | ColumnKind::Int
                | ColumnKind::BigInt
                | ColumnKind::Float
                | ColumnKind::Decimal { .. }
        )
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnKind::SmallInt | ColumnKind::Int | ColumnKind::BigInt
        )
    }
}

fn split_type_args(lower: &str) -> (String, Vec<u32>) {
    let Some((base, rest)) = lower.split_once('(') else {
        return (lower.trim().to_string(), Vec::new());
    };
    let args_part = rest.split(')').next().unwrap_or_default();
    let args = args_part
        .split(',')
        .filter_map(|arg| arg.trim().parse::<u32>().ok())
        .collect();
    let suffix = rest.split_once(')').map(|(_, tail)| tail.trim()).unwrap_or("");
    let base = if suffix.is_empty() {
        base.trim().to_string()
    } else {
        format!("{} {}", base.trim(), suffix)
    };
    (base, args)
}

// SQLite column affinity rules, applied to declared types we do not recognize by name.
fn sqlite_affinity(base: &str, args: &[u32], raw: &str) -> ColumnKind {
    if base.contains("int") {
        ColumnKind::BigInt
    } else if base.contains("char") || base.contains("clob") || base.contains("text") {
        ColumnKind::Text {
            max_len: args.first().copied(),
        }
    } else if base.contains("real") || base.contains("floa") || base.contains("doub") {
        ColumnKind::Float
    } else {
        ColumnKind::Unknown(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(value: &str, dialect: Dialect) -> ColumnKind {
        ColumnKind::classify(value, dialect, &BTreeMap::new())
    }

    #[test]
    fn classifies_common_postgres_types() {
        assert_eq!(
            classify("varchar(255)", Dialect::Postgres),
            ColumnKind::Text { max_len: Some(255) }
        );
        assert_eq!(
            classify("numeric(10,2)", Dialect::Postgres),
            ColumnKind::Decimal { scale: Some(2) }
        );
        assert_eq!(
            classify("_int4", Dialect::Postgres),
            ColumnKind::Array(Box::new(ColumnKind::Int))
        );
        assert_eq!(
            classify("timestamp(3) with time zone", Dialect::Postgres),
            ColumnKind::Timestamp {
                with_time_zone: true
            }
        );
        assert_eq!(
            classify("tsvector", Dialect::Postgres),
            ColumnKind::Unknown("tsvector".to_string())
        );
    }

    #[test]
    fn mysql_tinyint_one_is_boolean() {
        assert_eq!(classify("tinyint(1)", Dialect::Mysql), ColumnKind::Bool);
        assert_eq!(classify("tinyint(4)", Dialect::Mysql), ColumnKind::SmallInt);
    }

    #[test]
    fn sqlite_falls_back_to_affinity() {
        assert_eq!(classify("UNSIGNED BIG INT", Dialect::Sqlite), ColumnKind::BigInt);
        assert_eq!(
            classify("VARYING CHARACTER(20)", Dialect::Sqlite),
            ColumnKind::Text { max_len: Some(20) }
        );
    }
}

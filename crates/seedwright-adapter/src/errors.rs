use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    /// Failure reported by the database driver.
    #[error("database error: {0}")]
    Db(String),
    #[error("statement {index} failed: {message}")]
    Statement { index: usize, message: String },
    #[error("cannot decode {model} row: {message}")]
    Decode { model: String, message: String },
    #[error("data model error: {0}")]
    DataModel(#[from] seedwright_core::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AdapterError>;

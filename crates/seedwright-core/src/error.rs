use thiserror::Error;

/// Core error type shared across seedwright crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The data model violates internal invariants.
    #[error("invalid data model: {0}")]
    InvalidDataModel(String),
    /// A foreign key cycle with no nullable edge to defer.
    #[error("unbreakable foreign key cycle between {}", .models.join(", "))]
    UnbreakableCycle { models: Vec<String> },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for results returned by seedwright crates.
pub type Result<T> = std::result::Result<T, Error>;

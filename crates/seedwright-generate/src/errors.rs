use thiserror::Error;

/// Errors emitted by the generation engine. Any of them aborts the whole `generate()` call.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("unique constraint on {model}({}) exhausted after {attempts} attempts", .fields.join(", "))]
    UniqueConstraintExhausted {
        model: String,
        fields: Vec<String>,
        attempts: u32,
    },
    #[error("no {model} row matched the connect on field '{field}'")]
    RequiredConnectUnmatched { model: String, field: String },
    #[error("no generation strategy for {model}.{field} of type '{column_type}'")]
    UnsupportedFieldShape {
        model: String,
        field: String,
        column_type: String,
    },
    #[error("unbreakable foreign key cycle between {}", .models.join(", "))]
    UnbreakableCycle { models: Vec<String> },
    #[error("callback failed at {path}: {message}")]
    Callback { path: String, message: String },
    #[error("invalid plan: {0}")]
    InvalidPlan(String),
    #[error("invalid data model: {0}")]
    InvalidDataModel(String),
    #[error("generation cancelled")]
    Cancelled,
}

impl From<seedwright_core::Error> for GenerationError {
    fn from(value: seedwright_core::Error) -> Self {
        match value {
            seedwright_core::Error::UnbreakableCycle { models } => {
                GenerationError::UnbreakableCycle { models }
            }
            seedwright_core::Error::InvalidDataModel(message) => {
                GenerationError::InvalidDataModel(message)
            }
            seedwright_core::Error::Json(err) => GenerationError::InvalidDataModel(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, GenerationError>;

use thiserror::Error;

/// Errors that abort a generation pass.
///
/// Everything else (unmatched declarations, unresolved annotation arguments,
/// path recovery misses, missing stylesheets) degrades to a default instead
/// of surfacing here.
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("generation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Invalid options: {message}")]
    InvalidOptions { message: String },
}

pub type Result<T> = std::result::Result<T, GeneratorError>;

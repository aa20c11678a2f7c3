use thiserror::Error;

/// Result type alias for fallible fakecheck operations.
pub type Result<T> = std::result::Result<T, FakeCheckError>;

#[derive(Error, Debug)]
pub enum FakeCheckError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Graph store error: {0}")]
    Graph(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

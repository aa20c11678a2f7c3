use fakecheck_common::FakeCheckError;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Corrupt row: {0}")]
    Decode(String),
}

impl From<StoreError> for FakeCheckError {
    fn from(e: StoreError) -> Self {
        FakeCheckError::Database(e.to_string())
    }
}

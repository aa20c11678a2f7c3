pub mod error;
mod rows;
pub mod store;

pub use error::{Result, StoreError};
pub use store::PgCorpusStore;

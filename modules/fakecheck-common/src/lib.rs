pub mod config;
pub mod dimension;
pub mod error;
pub mod types;

pub use config::{CacheConfig, Config, FileConfig, GraphConfig, ScoringConfig};
pub use dimension::{Dimension, DimensionMap};
pub use error::{FakeCheckError, Result};
pub use types::*;

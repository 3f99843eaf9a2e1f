pub mod diag;
pub mod error;
pub mod global;
pub mod plugin;
pub mod provider;
pub mod resource;
pub mod schema;

pub use anyhow::anyhow;
pub use error::{ProviderError, Result, SchemaError};

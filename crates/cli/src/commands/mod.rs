//! CLI command implementations.

pub mod check;
pub mod index;

use customer_service::config::{ConfigError, StoreConfig};
use customer_service::db::{self, DocumentStore, StoreError};
use std::sync::Arc;

/// Errors returned by CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Connect to the store configured in the environment.
fn connect_from_env() -> Result<Arc<dyn DocumentStore>, CommandError> {
    let config = StoreConfig::from_env()?;
    Ok(db::connect(&config)?)
}

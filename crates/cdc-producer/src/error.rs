//! The part of the error taxonomy this crate owns directly:
//! configuration parsing. Everything else (`PublisherInitError`,
//! `OffsetPersistError`) is the underlying crate's own `thiserror` type,
//! propagated to `main`'s `anyhow::Result` boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse producer configuration")]
    Toml(#[from] toml::de::Error),
}

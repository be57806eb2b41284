//! Trellis core library — template loaders, configuration, errors.
//!
//! - [`loader`] — the [`Loader`] contract plus map and directory backends
//! - [`config`] — YAML [`Config`] for the renderer and CLI
//! - [`error`] — [`LoadError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod loader;

pub use config::{CacheConfig, Config};
pub use error::{ConfigError, LoadError};
pub use loader::{DirLoader, Loader, LoaderSet, MapLoader};

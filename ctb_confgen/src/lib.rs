//! Configuration generator for Central Trigger Board (CTB) control
//! applications.
//!
//! The crate turns a layered generator configuration into the JSON job
//! descriptions consumed by the DAQ process-deployment tooling. The pipeline
//! is:
//!
//! 1. [`load_gen_config`] layers defaults, an optional configuration file,
//!    environment variables and CLI overrides into a [`GenConfig`].
//! 2. The [`apps`] builders merge user trigger definitions over the board
//!    schema defaults with [`update_triggers`] and assemble a
//!    [`graph::ModuleGraph`] per application.
//! 3. [`command_data`] renders per-application and system command data,
//!    which [`output::write_json_files`] and
//!    [`metadata::write_metadata_file`] write to a fresh output directory.

pub use figment;

pub mod apps;
pub mod command_data;
mod env;
mod error;
pub mod file;
pub mod graph;
pub mod layers;
mod loader;
pub mod merge;
pub mod metadata;
pub mod output;
pub mod schema;

pub use error::ConfgenError;
pub use loader::{ConfigSources, ENV_PREFIX, load_gen_config};
pub use merge::{Keyed, update_triggers};
pub use schema::confgen::GenConfig;

/// Shared result type used throughout the crate.
pub type ConfgenResult<T> = std::result::Result<T, std::sync::Arc<ConfgenError>>;

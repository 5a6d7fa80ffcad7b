//! Error types produced by the configuration generator.

mod constructors;
mod types;

pub use types::ConfgenError;

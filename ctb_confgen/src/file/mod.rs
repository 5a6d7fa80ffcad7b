//! Reading generator configuration files.
//!
//! `.json` files are parsed as JSON and everything else as TOML. Syntax
//! errors are caught before the document reaches Figment so they name the
//! offending file.

mod loader;
mod parser;

pub use loader::{load_config_file, load_config_value};

//! Test helpers shared across crates.
//!
//! [`figment`] wraps `figment::Jail` so tests can stage files and environment
//! variables in isolation; [`temp`] provides UTF-8 scratch directories.

pub mod figment;
pub mod temp;

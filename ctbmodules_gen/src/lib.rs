//! Library facade for `ctbmodules-gen` so integration tests can drive the
//! generation pipeline without spawning the binary.

pub mod cli;
pub mod error;
pub mod generate;
pub mod logging;

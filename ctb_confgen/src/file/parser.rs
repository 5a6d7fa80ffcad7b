//! Format-specific parsing of configuration files.

use camino::Utf8Path;
use figment::Figment;
use figment::providers::{Format, Json, Toml};

use super::loader::file_error;
use crate::ConfgenResult;

/// Syntax of a configuration file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Syntax {
    Json,
    Toml,
}

impl Syntax {
    /// `.json` (any case) is JSON; everything else, extensionless included,
    /// is TOML.
    pub(super) fn of(path: &Utf8Path) -> Self {
        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }

    /// Checks `data` and wraps it in a provider.
    pub(super) fn parse(self, path: &Utf8Path, data: &str) -> ConfgenResult<Figment> {
        match self {
            Self::Json => {
                serde_json::from_str::<serde_json::Value>(data).map_err(|e| file_error(path, e))?;
                Ok(Figment::from(Json::string(data)))
            }
            Self::Toml => {
                toml::from_str::<toml::Table>(data).map_err(|e| file_error(path, e))?;
                Ok(Figment::from(Toml::string(data)))
            }
        }
    }
}

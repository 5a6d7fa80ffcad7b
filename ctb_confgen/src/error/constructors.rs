//! Constructors for `ConfgenError`.
//!
//! Errors raised deep in generation are returned as `Arc<ConfgenError>`
//! directly; those that are usually collected first return the bare value.

use std::sync::Arc;

use camino::Utf8Path;
use figment::Error as FigmentError;

use super::ConfgenError;

impl ConfgenError {
    /// Folds collected errors into one.
    ///
    /// Returns `None` for no errors and the error itself for exactly one
    /// uniquely owned error. Anything else becomes [`Self::Aggregate`].
    ///
    /// # Examples
    ///
    /// ```
    /// use ctb_confgen::ConfgenError;
    ///
    /// let err = ConfgenError::try_aggregate(vec![
    ///     ConfgenError::validation("boot.base_command_port", "must be non-zero"),
    ///     ConfgenError::validation("ctb_hsi.host_ctb_hsi", "must contain visible characters"),
    /// ]);
    /// assert!(matches!(err, Some(ConfgenError::Aggregate(errors)) if errors.len() == 2));
    /// ```
    #[must_use]
    pub fn try_aggregate<I, E>(errors: I) -> Option<Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<Arc<Self>>,
    {
        let mut arcs: Vec<Arc<Self>> = errors.into_iter().map(Into::into).collect();
        match arcs.len() {
            0 => None,
            1 => {
                let only = arcs.pop()?;
                Some(Arc::try_unwrap(only).unwrap_or_else(|shared| Self::Aggregate(vec![shared])))
            }
            _ => Some(Self::Aggregate(arcs)),
        }
    }

    /// Like [`Self::try_aggregate`] for results: `Ok(())` when nothing was
    /// collected.
    ///
    /// # Errors
    ///
    /// Returns the folded error when `errors` is non-empty.
    pub fn collected<I, E>(errors: I) -> Result<(), Arc<Self>>
    where
        I: IntoIterator<Item = E>,
        E: Into<Arc<Self>>,
    {
        Self::try_aggregate(errors).map_or(Ok(()), |err| Err(Arc::new(err)))
    }

    /// Failure collecting a provider's values.
    #[must_use]
    pub fn gathering(source: FigmentError) -> Self {
        Self::Gathering(Box::new(source))
    }

    /// Merged layers that do not fit the configuration schema.
    #[must_use]
    pub fn merge(source: serde_json::Error) -> Arc<Self> {
        Arc::new(Self::Merge(source))
    }

    /// Validation failure for the dotted configuration `key`.
    #[must_use]
    pub fn validation(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Module-graph failure in the application `app`.
    #[must_use]
    pub fn graph(app: impl Into<String>, message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::Graph {
            app: app.into(),
            message: message.into(),
        })
    }

    /// I/O failure at `path`.
    #[must_use]
    pub fn io(path: &Utf8Path, source: std::io::Error) -> Arc<Self> {
        Arc::new(Self::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// JSON encoding failure for the payload described by `what`.
    #[must_use]
    pub fn encode(what: impl Into<String>, source: serde_json::Error) -> Arc<Self> {
        Arc::new(Self::Encode {
            what: what.into(),
            source,
        })
    }
}

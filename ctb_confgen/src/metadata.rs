//! Provenance record written next to the generated files.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::{ConfgenError, ConfgenResult};

/// Contents of `<generator>.info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    /// Name of the generator that produced the directory.
    pub generator: String,
    /// Version of the generating crate.
    pub version: String,
    /// Configuration file the run was driven by, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<Utf8PathBuf>,
    /// Hex SHA-256 of the configuration file contents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_sha256: Option<String>,
}

/// Writes `<dir>/<generator>.info` describing how `dir` was generated.
///
/// `dir` must already exist. Returns the path of the written file.
///
/// # Errors
///
/// Returns a [`ConfgenError::Io`] when `dir` cannot be opened, the
/// configuration file cannot be read, or the record cannot be written.
pub fn write_metadata_file(
    dir: &Utf8Path,
    generator: &str,
    config_file: Option<&Utf8Path>,
) -> ConfgenResult<Utf8PathBuf> {
    let config_sha256 = config_file.map(digest_file).transpose()?;
    let metadata = Metadata {
        generator: generator.to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        config_file: config_file.map(Utf8Path::to_path_buf),
        config_sha256,
    };

    let name = format!("{generator}.info");
    let path = dir.join(&name);
    let mut content = serde_json::to_string_pretty(&metadata)
        .map_err(|err| ConfgenError::encode("metadata", err))?;
    content.push('\n');

    let root = Dir::open_ambient_dir(dir, ambient_authority())
        .map_err(|err| ConfgenError::io(dir, err))?;
    let mut file = root.create(&name).map_err(|err| ConfgenError::io(&path, err))?;
    file.write_all(content.as_bytes())
        .map_err(|err| ConfgenError::io(&path, err))?;
    tracing::info!(path = %path, "wrote metadata file");
    Ok(path)
}

fn digest_file(path: &Utf8Path) -> ConfgenResult<String> {
    let bytes = std::fs::read(path).map_err(|err| ConfgenError::io(path, err))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::write_metadata_file;
    use anyhow::{Result, anyhow};
    use rstest::{fixture, rstest};
    use serde_json::{Value, json};
    use test_helpers::temp::Utf8TempDir;

    #[fixture]
    fn scratch() -> Utf8TempDir {
        Utf8TempDir::new().expect("temp dir")
    }

    #[rstest]
    fn records_config_digest(scratch: Utf8TempDir) -> Result<()> {
        let dir = scratch.path();
        let config = dir.join("ctb.toml");
        std::fs::write(&config, "abc")?;

        let path = write_metadata_file(dir, "ctbmodules_gen", Some(&config))?;
        assert_eq!(path, dir.join("ctbmodules_gen.info"));
        let value: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(value.get("generator"), Some(&json!("ctbmodules_gen")));
        assert_eq!(
            value.get("config_sha256"),
            Some(&json!(
                "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
            ))
        );
        assert_eq!(value.get("version"), Some(&json!(env!("CARGO_PKG_VERSION"))));
        assert_eq!(value.get("config_file"), Some(&json!(config.as_str())));
        Ok(())
    }

    #[rstest]
    fn omits_config_fields_without_a_file(scratch: Utf8TempDir) -> Result<()> {
        let dir = scratch.path();
        let path = write_metadata_file(dir, "ctbcontrollers_gen", None)?;
        let value: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        let object = value.as_object().ok_or_else(|| anyhow!("metadata is not an object"))?;
        assert!(!object.contains_key("config_file"));
        assert!(!object.contains_key("config_sha256"));
        Ok(())
    }

    #[rstest]
    fn unreadable_config_is_an_error(scratch: Utf8TempDir) {
        let dir = scratch.path();
        let missing = dir.join("missing.toml");
        assert!(write_metadata_file(dir, "gen", Some(&missing)).is_err());
    }
}

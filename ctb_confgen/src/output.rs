//! Writers for the generated JSON tree.
//!
//! Layout of an output directory:
//!
//! ```text
//! <dir>/boot.json
//! <dir>/<cmd>.json              one per command
//! <dir>/data/<app>_<cmd>.json   one per application and command
//! ```

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use serde_json::Value;

use crate::command_data::{AppCommandData, Command, SystemCommandData};
use crate::{ConfgenError, ConfgenResult};

const DATA_DIR: &str = "data";

/// Fails when `dir` exists in any form, including as a dangling symlink.
///
/// # Errors
///
/// Returns [`ConfgenError::OutputExists`] when the path exists, or
/// [`ConfgenError::Io`] when its existence cannot be determined.
pub fn ensure_output_dir_absent(dir: &Utf8Path) -> ConfgenResult<()> {
    match dir.symlink_metadata() {
        Ok(_) => Err(Arc::new(ConfgenError::OutputExists {
            path: dir.to_path_buf(),
        })),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(ConfgenError::io(dir, err)),
    }
}

/// Writes every application payload and the system files under `dir`,
/// creating it. Returns the written paths in write order.
///
/// # Errors
///
/// Returns [`ConfgenError::OutputExists`] when `dir` already exists, and
/// [`ConfgenError::Io`] or [`ConfgenError::Encode`] when writing fails.
pub fn write_json_files(
    app_datas: &BTreeMap<String, AppCommandData>,
    system_datas: &SystemCommandData,
    dir: &Utf8Path,
) -> ConfgenResult<Vec<Utf8PathBuf>> {
    ensure_output_dir_absent(dir)?;
    let root = create_fresh_dir(dir)?;
    root.create_dir(DATA_DIR)
        .map_err(|err| ConfgenError::io(&dir.join(DATA_DIR), err))?;
    let data = root
        .open_dir(DATA_DIR)
        .map_err(|err| ConfgenError::io(&dir.join(DATA_DIR), err))?;

    let mut written = Vec::new();
    for (app, app_data) in app_datas {
        for command in Command::ALL {
            let name = format!("{app}_{command}.json");
            let path = dir.join(DATA_DIR).join(&name);
            write_json(&data, &name, &path, &app_data.payload(command)?)?;
            written.push(path);
        }
    }

    for command in Command::ALL {
        if let Some(payload) = system_datas.command_payload(command)? {
            let name = format!("{command}.json");
            let path = dir.join(&name);
            write_json(&root, &name, &path, &payload)?;
            written.push(path);
        }
    }

    let boot = dir.join("boot.json");
    write_json(&root, "boot.json", &boot, &system_datas.boot_payload()?)?;
    written.push(boot);

    tracing::info!(dir = %dir, files = written.len(), "wrote JSON files");
    Ok(written)
}

/// Creates `path`, which must not exist yet, and opens it as a capability.
///
/// Missing parents are created as needed. The leaf itself is created with a
/// plain `mkdir`, so a directory that appeared after the absence check is
/// reported instead of being reused.
fn create_fresh_dir(path: &Utf8Path) -> ConfgenResult<Dir> {
    let exists = || {
        Arc::new(ConfgenError::OutputExists {
            path: path.to_path_buf(),
        })
    };
    let Some(leaf) = path.file_name() else {
        return Err(exists());
    };
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    Dir::create_ambient_dir_all(parent, ambient_authority())
        .map_err(|err| ConfgenError::io(parent, err))?;
    let base = Dir::open_ambient_dir(parent, ambient_authority())
        .map_err(|err| ConfgenError::io(parent, err))?;
    base.create_dir(leaf).map_err(|err| {
        if err.kind() == std::io::ErrorKind::AlreadyExists {
            exists()
        } else {
            ConfgenError::io(path, err)
        }
    })?;
    base.open_dir(leaf).map_err(|err| ConfgenError::io(path, err))
}

fn write_json(dir: &Dir, name: &str, path: &Utf8Path, payload: &Value) -> ConfgenResult<()> {
    let mut content = serde_json::to_string_pretty(payload)
        .map_err(|err| ConfgenError::encode(path.as_str(), err))?;
    content.push('\n');
    let mut file = dir.create(name).map_err(|err| ConfgenError::io(path, err))?;
    file.write_all(content.as_bytes())
        .map_err(|err| ConfgenError::io(path, err))?;
    tracing::debug!(path = %path, "wrote file");
    Ok(())
}

//! Preparing a local directory to act as the synced source tree.

use std::fs;
use std::path::Path;

use log::info;

use crate::error::WorkspaceError;

pub const ENTRYPOINT_FILE_NAME: &str = "kustomization.yaml";

const ENTRYPOINT_CONTENT: &str = "---
apiVersion: kustomize.config.k8s.io/v1beta1
kind: Kustomization
resources: []
";

/// Creates `path` if needed and seeds an empty kustomization when the
/// directory is new or empty.
///
/// Returns `true` if the entrypoint was written. A non-empty directory is
/// left untouched.
pub fn initialize_target_dir(path: impl AsRef<Path>) -> Result<bool, WorkspaceError> {
    let path = path.as_ref();

    let empty = match fs::metadata(path) {
        Ok(meta) if !meta.is_dir() => {
            return Err(WorkspaceError::NotADirectory(path.to_path_buf()));
        }
        Ok(_) => is_empty_dir(path)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            fs::create_dir_all(path).map_err(|source| WorkspaceError::CreateDirectory {
                path: path.to_path_buf(),
                source,
            })?;
            true
        }
        Err(source) => {
            return Err(WorkspaceError::Inspect {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if !empty {
        return Ok(false);
    }

    fs::write(path.join(ENTRYPOINT_FILE_NAME), ENTRYPOINT_CONTENT).map_err(|source| {
        WorkspaceError::WriteEntrypoint {
            path: path.to_path_buf(),
            source,
        }
    })?;

    info!("Created {} in {}", ENTRYPOINT_FILE_NAME, path.display());
    Ok(true)
}

fn is_empty_dir(path: &Path) -> Result<bool, WorkspaceError> {
    let mut entries = fs::read_dir(path).map_err(|source| WorkspaceError::Inspect {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(entries.next().is_none())
}

//! Workspace directory resolution.

use crate::error::{StorageError, StorageResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Maps an automation account to its local directory:
/// `base/<subscription>/<resource group>/<account>`.
pub fn workspace_path(
    base: &Path,
    subscription_id: &str,
    resource_group: &str,
    account: &str,
) -> StorageResult<PathBuf> {
    let mut path = base.to_path_buf();
    for component in [subscription_id, resource_group, account] {
        path.push(sanitize_component(component)?);
    }
    Ok(path)
}

/// Creates the workspace directory tree if missing.
pub fn ensure_workspace(path: &Path) -> StorageResult<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

fn sanitize_component(raw: &str) -> StorageResult<String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return Err(StorageError::InvalidWorkspace(format!(
            "unusable path component {raw:?}"
        )));
    }
    Ok(cleaned)
}

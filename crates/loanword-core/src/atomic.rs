// Write-then-rename file output.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::CoreError;

/// Writes `bytes` to `path` through a temporary file in the same directory,
/// so readers see either the old contents or the new ones. Parent
/// directories are created as needed.
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<(), CoreError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
    let mut temp = NamedTempFile::new_in(parent).map_err(|e| CoreError::io(parent, e))?;
    temp.write_all(bytes)
        .map_err(|e| CoreError::io(temp.path(), e))?;
    temp.persist(path).map_err(|e| CoreError::io(path, e.error))?;
    Ok(())
}

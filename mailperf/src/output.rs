//! Whole-file replacement of the report and chart outputs.
//!
//! Each output is produced in a temporary sibling of its destination and renamed into place once
//! complete, so a failed run never leaves a half-written file behind.

use std::fs;
use std::path::Path;

use tempfile::Builder;
use tracing::debug;

use crate::errors::{Error, Result};

/// Produce `dest` through `write`, which receives the path of a temporary sibling file.
///
/// The temporary file keeps the destination's extension so that encoders which pick a format from
/// the file name behave the same as for `dest`. Missing parent directories are created. If `write`
/// fails, the temporary file is removed and any existing `dest` is left untouched.
pub fn replace_with<T>(dest: &Path, write: impl FnOnce(&Path) -> Result<T>) -> Result<T> {
    let parent = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;

    let suffix = dest
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let temp = Builder::new()
        .prefix(".mailperf-")
        .suffix(&suffix)
        .tempfile_in(parent)
        .map_err(|e| Error::io(parent, e))?;

    let value = write(temp.path())?;

    debug!(from = %temp.path().display(), to = %dest.display(), "Replacing output");
    temp.persist(dest).map_err(|e| Error::io(dest, e.error))?;
    Ok(value)
}

/// Replace `dest` with `contents`
pub fn write_file(dest: &Path, contents: &[u8]) -> Result<()> {
    replace_with(dest, |path| fs::write(path, contents).map_err(|e| Error::io(path, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_write_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("report.txt");
        fs::write(&dest, "a much longer previous report\n").unwrap();

        write_file(&dest, b"new\n").unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "new\n");
        assert_eq!(entries(dir.path()), vec!["report.txt"]);
    }

    #[test]
    fn test_failed_write_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("report.txt");
        fs::write(&dest, "previous\n").unwrap();

        let result: Result<()> = replace_with(&dest, |path| {
            fs::write(path, "partial").unwrap();
            Err(Error::Render {
                message: "backend failed".to_string(),
            })
        });

        assert!(matches!(result, Err(Error::Render { .. })));
        assert_eq!(fs::read_to_string(&dest).unwrap(), "previous\n");
        assert_eq!(entries(dir.path()), vec!["report.txt"]);
    }

    #[test]
    fn test_creates_parent_and_keeps_extension() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("metric analysis").join("panel.png");

        let temp_name = replace_with(&dest, |path| {
            fs::write(path, [0u8; 4]).map_err(|e| Error::io(path, e))?;
            Ok(path.file_name().unwrap().to_string_lossy().into_owned())
        })
        .unwrap();

        assert!(temp_name.ends_with(".png"), "{temp_name}");
        assert!(dest.exists());
    }
}

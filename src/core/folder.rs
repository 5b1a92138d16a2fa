//! Recursive folder copies used by profiles and backups.

use crate::errors::{Error, Result};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

fn walk_error(err: walkdir::Error, root: &Path) -> Error {
    let path = err.path().unwrap_or(root).to_path_buf();
    match err.into_io_error() {
        Some(source) => Error::io(source, &path),
        None => Error::Io {
            path: path.display().to_string(),
            source: std::io::Error::other("filesystem loop"),
        },
    }
}

/// Copies the contents of `src` into `dst`, creating `dst` if needed.
///
/// Top-level entries of `src` whose name is in `skip` are left out. Returns the number of
/// files copied.
pub fn copy_dir_all(src: &Path, dst: &Path, skip: &[&str]) -> Result<u64> {
    fs::create_dir_all(dst).map_err(Error::io_at(dst))?;

    let mut copied = 0;
    let walker = WalkDir::new(src)
        .follow_links(false)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| {
            e.depth() != 1
                || e
                    .file_name()
                    .to_str()
                    .is_none_or(|name| !skip.contains(&name))
        });

    for entry in walker {
        let entry = entry.map_err(|e| walk_error(e, src))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::Io {
                path: entry.path().display().to_string(),
                source: std::io::Error::other(e),
            })?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(Error::io_at(&target))?;
        } else {
            fs::copy(entry.path(), &target).map_err(Error::io_at(entry.path()))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Removes every top-level entry of `dir` except those named in `keep`.
pub fn clear_dir_except(dir: &Path, keep: &[&str]) -> Result<()> {
    for entry in fs::read_dir(dir).map_err(Error::io_at(dir))? {
        let entry = entry.map_err(Error::io_at(dir))?;
        let name = entry.file_name();
        if name.to_str().is_some_and(|n| keep.contains(&n)) {
            continue;
        }

        let path = entry.path();
        let file_type = entry.file_type().map_err(Error::io_at(&path))?;
        if file_type.is_dir() {
            fs::remove_dir_all(&path).map_err(Error::io_at(&path))?;
        } else {
            fs::remove_file(&path).map_err(Error::io_at(&path))?;
        }
    }
    Ok(())
}

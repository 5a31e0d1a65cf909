//! Directory-scan and file-shuffling helpers for the file input/output
//! adapters.

use std::path::{Path, PathBuf};

/// Extension appended to files that could not be moved out of the input
/// directory, so the scanner stops picking them up.
pub const MOVE_ERROR_EXTENSION: &str = "moveerror";

/// Returns the alphabetically-first regular file in `dir` whose name ends
/// with `.extension`, skipping directories and `.moveerror` leftovers.
pub fn first_file_with_extension(dir: &Path, extension: &str) -> Option<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::error!("fileutil: couldn't open directory {}: {e}", dir.display());
            return None;
        }
    };

    let suffix = format!(".{extension}");
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.ends_with(&suffix))
        .filter(|name| !name.contains(MOVE_ERROR_EXTENSION))
        .collect();

    if names.is_empty() {
        return None;
    }
    names.sort();
    Some(dir.join(&names[0]))
}

/// Moves `file` into `dest_dir`, keeping its file name.
///
/// Falls back to copy-and-delete when rename fails (for instance across
/// filesystems). If the file still cannot be moved it is renamed in place
/// with a `.moveerror` suffix so the input scanner will not retry it
/// forever.
pub fn move_file_to(file: &Path, dest_dir: &Path) -> bool {
    let Some(name) = file.file_name() else {
        return false;
    };
    let dest = dest_dir.join(name);

    log::debug!("fileutil: moving {} to {}", file.display(), dest.display());

    if std::fs::rename(file, &dest).is_ok() {
        return true;
    }
    if copy_file_to(file, &dest) && delete_file(file) {
        return true;
    }

    log::error!(
        "fileutil: unable to move {} to {}; marking with .{MOVE_ERROR_EXTENSION}",
        file.display(),
        dest.display()
    );
    let mut bad = file.as_os_str().to_owned();
    bad.push(format!(".{MOVE_ERROR_EXTENSION}"));
    if std::fs::rename(file, PathBuf::from(&bad)).is_err() {
        // last resort so the scanner doesn't loop on this file
        return delete_file(file);
    }
    false
}

/// Copies `from` to `to`, logging failures.
pub fn copy_file_to(from: &Path, to: &Path) -> bool {
    match std::fs::copy(from, to) {
        Ok(_) => true,
        Err(e) => {
            log::error!(
                "fileutil: unable to copy {} to {}: {e}",
                from.display(),
                to.display()
            );
            false
        }
    }
}

/// Deletes `file`, logging failures.
pub fn delete_file(file: &Path) -> bool {
    log::debug!("fileutil: deleting {}", file.display());
    match std::fs::remove_file(file) {
        Ok(()) => true,
        Err(e) => {
            log::error!("fileutil: unable to delete {}: {e}", file.display());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_first_file_by_extension_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.gpick"), "data").unwrap();
        std::fs::write(dir.path().join("a.gpick"), "data").unwrap();
        std::fs::write(dir.path().join("c.json"), "data").unwrap();
        std::fs::create_dir(dir.path().join("sub.gpick")).unwrap();

        let found = first_file_with_extension(dir.path(), "gpick").unwrap();
        assert_eq!(found.file_name().unwrap(), "a.gpick");

        let found = first_file_with_extension(dir.path(), "json").unwrap();
        assert_eq!(found.file_name().unwrap(), "c.json");

        assert!(first_file_with_extension(dir.path(), "dat").is_none());
    }

    #[test]
    fn skips_moveerror_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stuck.gpick.moveerror"), "data").unwrap();
        assert!(first_file_with_extension(dir.path(), "gpick").is_none());
    }

    #[test]
    fn moves_file_between_directories() {
        let from_dir = tempfile::tempdir().unwrap();
        let to_dir = tempfile::tempdir().unwrap();
        let file = from_dir.path().join("pickfile.gpick");
        std::fs::write(&file, "payload").unwrap();

        assert!(move_file_to(&file, to_dir.path()));
        assert!(!file.exists());
        let moved = to_dir.path().join("pickfile.gpick");
        assert_eq!(std::fs::read_to_string(moved).unwrap(), "payload");
    }

    #[test]
    fn deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("gone.dat");
        std::fs::write(&file, "x").unwrap();
        assert!(delete_file(&file));
        assert!(!file.exists());
        // deleting a missing file reports failure
        assert!(!delete_file(&file));
    }
}

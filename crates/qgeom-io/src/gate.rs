use std::env;
use std::path::{Path, PathBuf};

/// Directory that a file at `path` would be created in.
///
/// Relative paths are resolved against the current working directory; a
/// bare file name resolves to the working directory itself.
pub fn containing_directory(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    match absolute.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Whether the current process may create a file at `path`.
///
/// Checks the containing directory rather than the file, which need not exist
/// yet. A missing directory yields `false`. Nothing is created or modified.
pub fn can_write(path: impl AsRef<Path>) -> bool {
    let directory = containing_directory(path.as_ref());
    let writable = directory.is_dir() && directory_writable(&directory);
    if !writable {
        log::warn!(
            "Not able to write to directory. File not written.: {}",
            directory.display()
        );
    }
    writable
}

#[cfg(unix)]
fn directory_writable(directory: &Path) -> bool {
    use rustix::fs::{access, Access};
    // creating an entry needs write and search permission on the directory
    access(directory, Access::WRITE_OK | Access::EXEC_OK).is_ok()
}

#[cfg(not(unix))]
fn directory_writable(directory: &Path) -> bool {
    std::fs::metadata(directory)
        .map(|meta| !meta.permissions().readonly())
        .unwrap_or(false)
}

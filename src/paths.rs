//! Filesystem locations a service needs at runtime: the shared temp folder
//! for local sockets, and the directory holding the running executable
//! together with its sibling programs.

use std::env;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Subdirectory of the system temp folder holding service sockets
const TMP_SUBDIR: &str = "svcboot";

/// Temp folder for local sockets: `$TMP`, `$TEMP` or `$TMPDIR` (first set), else `/tmp`,
/// plus a `svcboot` subdirectory which is created world-writable if missing.
pub fn tmp_folder() -> PathBuf {
    let base = ["TMP", "TEMP", "TMPDIR"]
        .iter()
        .find_map(|key| env::var_os(key).filter(|v| !v.is_empty()))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"));

    let dir = base.join(TMP_SUBDIR);
    if !dir.exists() && fs::create_dir_all(&dir).is_ok() {
        let _ = fs::set_permissions(&dir, fs::Permissions::from_mode(0o777));
    }
    dir
}

/// Directory containing the running executable
pub fn my_path() -> io::Result<PathBuf> {
    let exe = env::current_exe()?;
    exe.parent().map(Path::to_path_buf).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} has no parent directory", exe.display()),
        )
    })
}

/// Names of entries in [`my_path`] starting with `prefix`, sorted.
///
/// Empty when the directory cannot be determined or read.
pub fn sibling_executables(prefix: &str) -> Vec<String> {
    match my_path() {
        Ok(dir) => entries_with_prefix(&dir, prefix),
        Err(e) => {
            tracing::debug!(error = %e, "cannot locate executable directory");
            Vec::new()
        }
    }
}

/// Names of entries in `dir` starting with `prefix`, sorted
pub fn entries_with_prefix(dir: &Path, prefix: &str) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with(prefix))
        .collect();
    names.sort();
    names
}

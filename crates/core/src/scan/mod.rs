use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Component, Path};

mod read;
mod walker;


pub(crate) use read::{ReadSkip, make_rel_path, read_text_file};
pub(crate) use walker::collect_files;

pub(crate) fn validate_root(root: &Path) -> io::Result<()> {
    let meta = fs::metadata(root)
        .map_err(|err| io::Error::new(err.kind(), format!("root {}: {err}", root.display())))?;
    if !meta.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("root {} is not a directory", root.display()),
        ));
    }
    Ok(())
}

pub(crate) fn ignore_dirs_contains(ignore_dirs: &HashSet<String>, name: &str) -> bool {
    if ignore_dirs.contains(name) {
        return true;
    }
    #[cfg(windows)]
    {
        ignore_dirs.iter().any(|d| d.eq_ignore_ascii_case(name))
    }
    #[cfg(not(windows))]
    {
        false
    }
}

/// Diff target paths must stay inside the source tree.
pub(crate) fn is_safe_relative_path(raw: &str) -> bool {
    if raw.is_empty() {
        return false;
    }
    let path = Path::new(raw);
    if path.is_absolute() {
        return false;
    }
    path.components()
        .all(|component| matches!(component, Component::Normal(_)))
}

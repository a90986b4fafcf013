use std::env;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Absolute, lexically normalized form of `p`, canonicalized when it exists.
pub(crate) fn resolve_path(p: &Path) -> io::Result<PathBuf> {
    let base = if p.is_absolute() {
        PathBuf::new()
    } else {
        env::current_dir()?
    };
    let normalized = normalize_path(&base.join(p));
    Ok(fs::canonicalize(&normalized).unwrap_or(normalized))
}

/// Like [`resolve_path`], but the result must be an existing directory.
pub(crate) fn resolve_dir(p: &Path, what: &str) -> io::Result<PathBuf> {
    let resolved = resolve_path(p)?;
    if !resolved.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{what} {} is not a directory", p.display()),
        ));
    }
    Ok(resolved)
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    let mut floor = 0usize;
    let mut depth = 0usize;

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {
                out.push(component.as_os_str());
                floor = depth;
            }
            Component::CurDir => {}
            Component::ParentDir if depth > floor => {
                out.pop();
                depth -= 1;
            }
            Component::ParentDir => {}
            Component::Normal(part) => {
                out.push(part);
                depth += 1;
            }
        }
    }
    out
}

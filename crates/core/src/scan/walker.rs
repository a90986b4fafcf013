use std::io;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use log::debug;

use crate::types::{AnalysisOptions, ScanStats};

use super::ignore_dirs_contains;

/// Regular files under `root`, sorted so results do not depend on directory order.
pub(crate) fn collect_files(
    root: &Path,
    options: &AnalysisOptions,
    stats: &mut ScanStats,
) -> io::Result<Vec<PathBuf>> {
    let ignore_dirs = options.ignore_dirs.clone();
    let respect_gitignore = options.respect_gitignore;
    let is_git_repo = root.join(".git").exists();

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(false)
        .follow_links(false)
        .ignore(false)
        .git_ignore(respect_gitignore)
        .git_global(respect_gitignore && is_git_repo)
        .git_exclude(respect_gitignore && is_git_repo)
        .parents(false)
        .require_git(false);

    let walker = builder
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            if entry.path_is_symlink() {
                return false;
            }
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            if !is_dir {
                return true;
            }
            !entry
                .file_name()
                .to_str()
                .is_some_and(|name| ignore_dirs_contains(&ignore_dirs, name))
        })
        .build();

    let mut files = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(e) => e,
            Err(err) => {
                if let Some(io_err) = err.io_error() {
                    match io_err.kind() {
                        io::ErrorKind::NotFound => {
                            stats.skipped_not_found = stats.skipped_not_found.saturating_add(1);
                            continue;
                        }
                        io::ErrorKind::PermissionDenied => {
                            stats.skipped_permission_denied =
                                stats.skipped_permission_denied.saturating_add(1);
                            continue;
                        }
                        _ => {}
                    }
                }
                debug!("walk error under {}: {err}", root.display());
                stats.skipped_walk_errors = stats.skipped_walk_errors.saturating_add(1);
                continue;
            }
        };

        if entry.depth() == 0 {
            continue;
        }
        let Some(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_file() {
            continue;
        }

        stats.candidate_files = stats.candidate_files.saturating_add(1);
        files.push(entry.into_path());
    }

    files.sort();
    Ok(files)
}

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use crate::types::ScanStats;
use crate::util::fnv1a64;

/// Why a file produced no text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadSkip {
    NotFound,
    PermissionDenied,
    TooLarge,
    Binary,
    InvalidEncoding,
    Io,
}

impl ReadSkip {
    /// The file could not be located or opened at all.
    pub(crate) fn is_missing(self) -> bool {
        matches!(self, Self::NotFound | Self::PermissionDenied)
    }

    pub(crate) fn describe(self) -> &'static str {
        match self {
            Self::NotFound => "not found",
            Self::PermissionDenied => "permission denied",
            Self::TooLarge => "file too large",
            Self::Binary => "binary content",
            Self::InvalidEncoding => "not valid UTF-8",
            Self::Io => "read error",
        }
    }

    fn from_io(err: &io::Error, stats: &mut ScanStats) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => {
                stats.skipped_not_found = stats.skipped_not_found.saturating_add(1);
                Self::NotFound
            }
            io::ErrorKind::PermissionDenied => {
                stats.skipped_permission_denied = stats.skipped_permission_denied.saturating_add(1);
                Self::PermissionDenied
            }
            _ => {
                stats.skipped_walk_errors = stats.skipped_walk_errors.saturating_add(1);
                Self::Io
            }
        }
    }
}

pub(crate) fn make_rel_path(root: &Path, abs_path: &Path) -> String {
    match abs_path.strip_prefix(root) {
        Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
        Err(_) => {
            let name = abs_path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("<unknown>");
            let hash = fnv1a64(abs_path.to_string_lossy().as_bytes());
            format!("<external:{hash:016x}>/{name}")
        }
    }
}

/// Reads at most `max_file_size` bytes, refusing files with NUL bytes.
fn read_file_bytes(
    path: &Path,
    max_file_size: Option<u64>,
    stats: &mut ScanStats,
) -> Result<Vec<u8>, ReadSkip> {
    let metadata = fs::metadata(path).map_err(|err| ReadSkip::from_io(&err, stats))?;
    if !metadata.is_file() {
        stats.skipped_not_found = stats.skipped_not_found.saturating_add(1);
        return Err(ReadSkip::NotFound);
    }
    if let Some(max_file_size) = max_file_size
        && metadata.len() > max_file_size
    {
        stats.skipped_too_large = stats.skipped_too_large.saturating_add(1);
        return Err(ReadSkip::TooLarge);
    }

    let mut file = fs::File::open(path).map_err(|err| ReadSkip::from_io(&err, stats))?;

    let mut bytes: Vec<u8> = Vec::with_capacity(metadata.len().min(1024 * 1024) as usize);
    let mut total_read: u64 = 0;
    let mut buf = [0u8; 16 * 1024];
    loop {
        let mut limit = buf.len() as u64;
        if let Some(max_file_size) = max_file_size {
            let remaining = max_file_size.saturating_add(1).saturating_sub(total_read);
            limit = limit.min(remaining.max(1));
        }

        let n = match file.read(&mut buf[..limit as usize]) {
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                let skip = ReadSkip::from_io(&err, stats);
                if total_read > 0 {
                    stats.scanned_files = stats.scanned_files.saturating_add(1);
                    stats.scanned_bytes = stats.scanned_bytes.saturating_add(total_read);
                }
                return Err(skip);
            }
        };
        if n == 0 {
            break;
        }

        let new_total_read = total_read.saturating_add(n as u64);
        if buf[..n].contains(&0) {
            stats.scanned_files = stats.scanned_files.saturating_add(1);
            stats.scanned_bytes = stats.scanned_bytes.saturating_add(new_total_read);
            stats.skipped_binary = stats.skipped_binary.saturating_add(1);
            return Err(ReadSkip::Binary);
        }

        // The file grew after the metadata check.
        if let Some(max_file_size) = max_file_size
            && new_total_read > max_file_size
        {
            stats.scanned_files = stats.scanned_files.saturating_add(1);
            stats.scanned_bytes = stats.scanned_bytes.saturating_add(new_total_read);
            stats.skipped_too_large = stats.skipped_too_large.saturating_add(1);
            return Err(ReadSkip::TooLarge);
        }

        bytes.extend_from_slice(&buf[..n]);
        total_read = new_total_read;
    }

    stats.scanned_files = stats.scanned_files.saturating_add(1);
    stats.scanned_bytes = stats.scanned_bytes.saturating_add(total_read);

    Ok(bytes)
}

pub(crate) fn read_text_file(
    path: &Path,
    max_file_size: Option<u64>,
    stats: &mut ScanStats,
) -> Result<String, ReadSkip> {
    let bytes = read_file_bytes(path, max_file_size, stats)?;
    String::from_utf8(bytes).map_err(|_| {
        stats.skipped_invalid_encoding = stats.skipped_invalid_encoding.saturating_add(1);
        ReadSkip::InvalidEncoding
    })
}

use crate::error::DiffError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    Context,
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: LineKind,
    pub text: String,
}

/// One `@@ -a,b +c,d @@` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: u32,
    pub old_len: u32,
    pub new_start: u32,
    pub new_len: u32,
    pub lines: Vec<DiffLine>,
}

/// The hunks of one file inside a diff, with the paths from its `---`/`+++` headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSection {
    pub old_path: Option<String>,
    pub new_path: Option<String>,
    pub hunks: Vec<Hunk>,
}

impl DiffSection {
    /// Path the change applies to: the new side unless the file was deleted.
    pub fn target(&self) -> Option<&str> {
        self.new_path.as_deref().or(self.old_path.as_deref())
    }

    fn is_empty(&self) -> bool {
        self.old_path.is_none() && self.new_path.is_none() && self.hunks.is_empty()
    }
}

/// Splits unified-diff text into per-file sections.
///
/// A hunk takes exactly as many lines as its `@@` header counts, so body lines that look like
/// `---`/`+++` headers stay in the hunk. Mail headers, commit messages and git metadata
/// outside hunks are skipped. Blank input is a valid diff with no sections.
pub fn parse_unified_diff(text: &str) -> Result<Vec<DiffSection>, DiffError> {
    let mut sections: Vec<DiffSection> = Vec::new();
    let mut section = DiffSection::default();
    let mut hunk: Option<Hunk> = None;
    let mut saw_header = false;
    // Between a file header and its first `@@`.
    let mut awaiting_hunk = false;
    // Old and new lines the open hunk still expects.
    let mut old_left = 0u32;
    let mut new_left = 0u32;

    let mut lines = text.lines().enumerate().peekable();
    while let Some((idx, line)) = lines.next() {
        let line_no = idx + 1;

        if let Some(current) = hunk.as_mut() {
            let kind = match line.as_bytes().first() {
                Some(b'+') => Some(LineKind::Added),
                Some(b'-') => Some(LineKind::Removed),
                Some(b' ') | None => Some(LineKind::Context),
                _ => None,
            };
            if let Some(kind) = kind {
                current
                    .lines
                    .push(diff_line(kind, line.get(1..).unwrap_or_default()));
                if kind != LineKind::Added {
                    old_left = old_left.saturating_sub(1);
                }
                if kind != LineKind::Removed {
                    new_left = new_left.saturating_sub(1);
                }
                if old_left == 0 && new_left == 0 {
                    flush_hunk(&mut section, &mut hunk);
                }
                continue;
            }
            if line.starts_with('\\') {
                continue;
            }
            // A short hunk ends at the first line that cannot be part of it.
            flush_hunk(&mut section, &mut hunk);
        }

        if let Some(rest) = line.strip_prefix("diff --git ") {
            flush_hunk(&mut section, &mut hunk);
            flush_section(&mut sections, &mut section);
            let (old_path, new_path) = git_header_paths(rest);
            section.old_path = old_path;
            section.new_path = new_path;
            saw_header = true;
            awaiting_hunk = true;
            continue;
        }

        if let Some(old) = line.strip_prefix("--- ")
            && let Some(&(_, next)) = lines.peek()
            && let Some(new) = next.strip_prefix("+++ ")
        {
            flush_hunk(&mut section, &mut hunk);
            if !section.hunks.is_empty() {
                flush_section(&mut sections, &mut section);
            }
            section.old_path = header_path(old);
            section.new_path = header_path(new);
            saw_header = true;
            awaiting_hunk = true;
            lines.next();
            continue;
        }

        if line.starts_with("@@") {
            let opened = parse_hunk_header(line, line_no)?;
            old_left = opened.old_len;
            new_left = opened.new_len;
            if old_left == 0 && new_left == 0 {
                section.hunks.push(opened);
            } else {
                hunk = Some(opened);
            }
            awaiting_hunk = false;
            continue;
        }

        if awaiting_hunk && (line.starts_with('+') || line.starts_with('-')) {
            return Err(DiffError::MissingHunkHeader { line: line_no });
        }
    }

    flush_hunk(&mut section, &mut hunk);
    flush_section(&mut sections, &mut section);

    let hunk_count: usize = sections.iter().map(|s| s.hunks.len()).sum();
    if hunk_count == 0
        && !saw_header
        && let Some(first) = text.lines().position(|l| !l.trim().is_empty())
    {
        return Err(DiffError::MissingHunkHeader { line: first + 1 });
    }

    Ok(sections)
}

fn diff_line(kind: LineKind, text: &str) -> DiffLine {
    DiffLine {
        kind,
        text: text.to_string(),
    }
}

fn flush_hunk(section: &mut DiffSection, hunk: &mut Option<Hunk>) {
    if let Some(done) = hunk.take() {
        section.hunks.push(done);
    }
}

fn flush_section(sections: &mut Vec<DiffSection>, section: &mut DiffSection) {
    let done = std::mem::take(section);
    if !done.is_empty() {
        sections.push(done);
    }
}

fn parse_hunk_header(line: &str, line_no: usize) -> Result<Hunk, DiffError> {
    let malformed = || DiffError::MalformedHunkHeader {
        line: line_no,
        header: line.to_string(),
    };

    let body = line.strip_prefix("@@").ok_or_else(malformed)?;
    let (ranges, _) = body.split_once("@@").ok_or_else(malformed)?;
    let mut parts = ranges.split_whitespace();
    let old = parts
        .next()
        .and_then(|p| p.strip_prefix('-'))
        .ok_or_else(malformed)?;
    let new = parts
        .next()
        .and_then(|p| p.strip_prefix('+'))
        .ok_or_else(malformed)?;
    if parts.next().is_some() {
        return Err(malformed());
    }

    let (old_start, old_len) = parse_range(old).ok_or_else(malformed)?;
    let (new_start, new_len) = parse_range(new).ok_or_else(malformed)?;
    Ok(Hunk {
        old_start,
        old_len,
        new_start,
        new_len,
        lines: Vec::new(),
    })
}

/// `start[,len]`; the length defaults to 1.
fn parse_range(raw: &str) -> Option<(u32, u32)> {
    match raw.split_once(',') {
        Some((start, len)) => Some((start.parse().ok()?, len.parse().ok()?)),
        None => Some((raw.parse().ok()?, 1)),
    }
}

/// Path from a `---`/`+++` header. `/dev/null` means the side does not exist.
fn header_path(raw: &str) -> Option<String> {
    let path = raw.split('\t').next().unwrap_or(raw).trim();
    if path.is_empty() || path == "/dev/null" {
        return None;
    }
    Some(strip_side_prefix(path).to_string())
}

fn git_header_paths(rest: &str) -> (Option<String>, Option<String>) {
    match rest.split_once(" b/") {
        Some((old, new)) => (
            Some(strip_side_prefix(old.trim()).to_string()),
            Some(new.trim().to_string()),
        ),
        None => (None, None),
    }
}

fn strip_side_prefix(path: &str) -> &str {
    path.strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path)
}

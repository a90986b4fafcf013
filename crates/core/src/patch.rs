use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::diff::{DiffSection, Hunk, LineKind, parse_unified_diff};
use crate::error::DiffError;
use crate::fingerprint::{Fingerprint, NgramKind, hash_ngrams};
use crate::language::Language;
use crate::scan::{ReadSkip, collect_files, make_rel_path, read_text_file};
use crate::tokenize::normalize;
use crate::types::{AnalysisOptions, Polarity, ScanOutcome, ScanStats};
use crate::util::escape_markup;

/// One fingerprinted hunk. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRecord {
    /// `[<diff file>] <target> #<hunk>`.
    pub id: String,
    /// Id of the [`PatchUnit`] this hunk belongs to.
    pub unit: String,
    /// 1-based hunk number inside the unit.
    pub sequence: usize,
    pub language: Language,
    /// Display copy of the hunk with selected lines wrapped in `<font>` tags.
    pub markup: String,
    pub tokens: Vec<String>,
    pub fingerprints: Vec<Fingerprint>,
    /// Width used for `fingerprints`; at most the configured n-gram size.
    pub ngram_width: usize,
}

impl PatchRecord {
    pub fn total_ngrams(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn priority_ngrams(&self) -> usize {
        self.fingerprints
            .iter()
            .filter(|fp| fp.kind == NgramKind::Priority)
            .count()
    }
}

/// One diff section: the changes a diff file makes to a single target file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchUnit {
    pub id: String,
    /// Diff file path relative to the ingested root.
    pub origin: String,
    pub target: Option<String>,
    pub hunks: Result<Vec<Hunk>, DiffError>,
}

impl PatchUnit {
    pub fn error(&self) -> Option<&DiffError> {
        self.hunks.as_ref().err()
    }

    pub fn hunk_count(&self) -> usize {
        self.hunks.as_ref().map_or(0, Vec::len)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestResult {
    pub units: Vec<PatchUnit>,
    pub records: Vec<PatchRecord>,
}

impl IngestResult {
    /// Number of patch records ingested.
    pub fn count(&self) -> usize {
        self.records.len()
    }
}

pub struct PatchIngestor<'a> {
    options: &'a AnalysisOptions,
}

impl<'a> PatchIngestor<'a> {
    pub fn new(options: &'a AnalysisOptions) -> Self {
        Self { options }
    }

    /// Ingests a diff file or every file under a directory of diffs.
    ///
    /// `language` of `None` picks the language from each unit's target path.
    pub fn ingest(
        &self,
        path: &Path,
        polarity: Polarity,
        language: Option<Language>,
    ) -> io::Result<IngestResult> {
        Ok(self.ingest_with_stats(path, polarity, language)?.result)
    }

    pub fn ingest_with_stats(
        &self,
        path: &Path,
        polarity: Polarity,
        language: Option<Language>,
    ) -> io::Result<ScanOutcome<IngestResult>> {
        self.options.validate()?;
        let mut stats = ScanStats::default();
        let units = self.load(path, &mut stats)?;
        let mut records = Vec::new();
        for unit in &units {
            let language = language.unwrap_or_else(|| unit_language(unit));
            records.extend(self.fingerprint(unit, polarity, language, &mut stats));
        }
        info!(
            "ingested {} records from {} diff units under {}",
            records.len(),
            units.len(),
            path.display()
        );
        Ok(ScanOutcome {
            result: IngestResult { units, records },
            stats,
        })
    }

    /// Parses diffs without fingerprinting them.
    ///
    /// Only an unreadable `path` itself is an error; a bad file inside a directory becomes a
    /// unit carrying its [`DiffError`].
    pub fn load(&self, path: &Path, stats: &mut ScanStats) -> io::Result<Vec<PatchUnit>> {
        let meta = fs::metadata(path)
            .map_err(|err| io::Error::new(err.kind(), format!("{}: {err}", path.display())))?;

        let (root, files): (PathBuf, Vec<PathBuf>) = if meta.is_dir() {
            (path.to_path_buf(), collect_files(path, self.options, stats)?)
        } else {
            stats.candidate_files = stats.candidate_files.saturating_add(1);
            let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
            (root, vec![path.to_path_buf()])
        };

        let mut units = Vec::new();
        for file in files {
            let origin = make_rel_path(&root, &file);
            let parsed = match read_text_file(&file, self.options.max_file_size, stats) {
                Ok(text) => parse_unified_diff(&text),
                Err(skip) => Err(read_failure(skip)),
            };
            let before = units.len();
            units.extend(split_units(&origin, parsed));
            for unit in &units[before..] {
                if let Some(err) = unit.error() {
                    warn!("diff {}: {err}", unit.origin);
                    stats.malformed_diffs = stats.malformed_diffs.saturating_add(1);
                }
            }
        }
        Ok(units)
    }

    /// Builds one record per hunk whose selected lines normalize to at least one token.
    pub fn fingerprint(
        &self,
        unit: &PatchUnit,
        polarity: Polarity,
        language: Language,
        stats: &mut ScanStats,
    ) -> Vec<PatchRecord> {
        let Ok(hunks) = &unit.hunks else {
            return Vec::new();
        };
        let file_name = unit.origin.rsplit('/').next().unwrap_or(&unit.origin);
        let target = unit.target.as_deref().unwrap_or("-");

        let mut records = Vec::with_capacity(hunks.len());
        for (idx, hunk) in hunks.iter().enumerate() {
            let sequence = idx + 1;
            let tokens = normalize(&selected_text(hunk, polarity), language);
            if tokens.is_empty() {
                debug!("{}: hunk #{sequence} has no {} tokens", unit.id, polarity.as_str());
                stats.empty_hunks = stats.empty_hunks.saturating_add(1);
                continue;
            }
            let hashed = hash_ngrams(&tokens, self.options.ngram_size);
            let fingerprints = hashed
                .entries
                .into_iter()
                .map(|(ngram, hashes)| Fingerprint {
                    kind: NgramKind::of(&ngram, self.options.priority_min_chars),
                    ngram,
                    hashes,
                })
                .collect();
            records.push(PatchRecord {
                id: format!("[{file_name}] {target} #{sequence}"),
                unit: unit.id.clone(),
                sequence,
                language,
                markup: markup(hunk, polarity),
                tokens,
                fingerprints,
                ngram_width: hashed.width,
            });
        }
        records
    }
}

/// Language implied by the unit's target path.
pub(crate) fn unit_language(unit: &PatchUnit) -> Language {
    unit.target
        .as_deref()
        .map(|target| Language::from_path(Path::new(target)))
        .unwrap_or(Language::Text)
}

fn read_failure(skip: ReadSkip) -> DiffError {
    match skip {
        ReadSkip::Binary => DiffError::Binary,
        ReadSkip::InvalidEncoding => DiffError::InvalidEncoding,
        other => DiffError::Unreadable(other.describe().to_string()),
    }
}

fn split_units(
    origin: &str,
    parsed: Result<Vec<DiffSection>, DiffError>,
) -> Vec<PatchUnit> {
    let fallback_target = fallback_target(origin);
    match parsed {
        Err(err) => vec![PatchUnit {
            id: origin.to_string(),
            origin: origin.to_string(),
            target: fallback_target,
            hunks: Err(err),
        }],
        Ok(sections) if sections.len() <= 1 => {
            let (target, hunks) = match sections.into_iter().next() {
                Some(section) => (
                    section.target().map(str::to_string).or(fallback_target),
                    section.hunks,
                ),
                None => (fallback_target, Vec::new()),
            };
            vec![PatchUnit {
                id: origin.to_string(),
                origin: origin.to_string(),
                target,
                hunks: Ok(hunks),
            }]
        }
        Ok(sections) => sections
            .into_iter()
            .enumerate()
            .map(|(idx, section)| {
                let target = section.target().map(str::to_string);
                let id = match &target {
                    Some(target) => format!("{origin}:{target}"),
                    None => format!("{origin}:#{}", idx + 1),
                };
                PatchUnit {
                    id,
                    origin: origin.to_string(),
                    target,
                    hunks: Ok(section.hunks),
                }
            })
            .collect(),
    }
}

/// `src/app.py.patch` targets `src/app.py` when the diff itself names no file.
fn fallback_target(origin: &str) -> Option<String> {
    let stripped = origin
        .strip_suffix(".patch")
        .or_else(|| origin.strip_suffix(".diff"))?;
    (!stripped.is_empty()).then(|| stripped.to_string())
}

fn selected_kind(polarity: Polarity) -> LineKind {
    match polarity {
        Polarity::Added => LineKind::Added,
        Polarity::Removed => LineKind::Removed,
    }
}

fn selected_text(hunk: &Hunk, polarity: Polarity) -> String {
    let kind = selected_kind(polarity);
    hunk.lines
        .iter()
        .filter(|line| line.kind == kind)
        .map(|line| line.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn markup(hunk: &Hunk, polarity: Polarity) -> String {
    let kind = selected_kind(polarity);
    let (marker, color) = match polarity {
        Polarity::Added => ('+', "#00AA00"),
        Polarity::Removed => ('-', "#AA0000"),
    };
    let mut out = Vec::with_capacity(hunk.lines.len());
    for line in &hunk.lines {
        if line.kind == LineKind::Context {
            out.push(escape_markup(&format!(" {}", line.text)));
        } else if line.kind == kind {
            out.push(format!(
                "<font color=\"{color}\">{}</font>",
                escape_markup(&format!("{marker}{}", line.text))
            ));
        }
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(suffix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be monotonic")
            .as_nanos();
        std::env::temp_dir().join(format!("patch-track-core-{suffix}-{nanos}"))
    }

    const APP_DIFF: &str = "\
--- a/src/app.py
+++ b/src/app.py
@@ -1,4 +1,4 @@
 import os
-print(\"old\")
+print(\"new\")  # loud
 x = 1
@@ -10,2 +10,2 @@
-# only a comment
+
";

    fn unit(text: &str) -> PatchUnit {
        split_units("fix.patch", parse_unified_diff(text))
            .into_iter()
            .next()
            .unwrap()
    }

    #[test]
    fn records_follow_polarity() {
        let options = AnalysisOptions::default();
        let ingestor = PatchIngestor::new(&options);
        let mut stats = ScanStats::default();
        let unit = unit(APP_DIFF);

        let added = ingestor.fingerprint(&unit, Polarity::Added, Language::Python, &mut stats);
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].id, "[fix.patch] src/app.py #1");
        assert_eq!(added[0].tokens, vec!["print(\"new\")"]);
        assert_eq!(added[0].ngram_width, 1);
        assert_eq!(stats.empty_hunks, 1);

        let removed = ingestor.fingerprint(&unit, Polarity::Removed, Language::Python, &mut stats);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].tokens, vec!["print(\"old\")"]);
        assert_eq!(stats.empty_hunks, 2);
    }

    #[test]
    fn markup_wraps_selected_lines_and_escapes() {
        let unit = unit("@@ -1 +1,2 @@\n a<b\n-x > y\n+x >= y\n");
        let Ok(hunks) = &unit.hunks else {
            panic!("diff should parse");
        };
        assert_eq!(
            markup(&hunks[0], Polarity::Added),
            " a&lt;b\n<font color=\"#00AA00\">+x &gt;= y</font>"
        );
        assert_eq!(
            markup(&hunks[0], Polarity::Removed),
            " a&lt;b\n<font color=\"#AA0000\">-x &gt; y</font>"
        );
    }

    #[test]
    fn short_hunks_shrink_the_ngram_width() {
        let options = AnalysisOptions {
            ngram_size: 4,
            ..AnalysisOptions::default()
        };
        let ingestor = PatchIngestor::new(&options);
        let mut stats = ScanStats::default();
        let unit = unit("@@ -1 +1 @@\n+foo bar\n");
        let records = ingestor.fingerprint(&unit, Polarity::Added, Language::Java, &mut stats);
        assert_eq!(records[0].ngram_width, 2);
        assert_eq!(records[0].total_ngrams(), 1);
        assert_eq!(records[0].fingerprints[0].ngram, "foo bar");
    }

    #[test]
    fn multi_section_diffs_split_into_units() {
        let text = "--- a/a.c\n+++ b/a.c\n@@ -0,0 +1 @@\n+int a;\n--- a/b.c\n+++ b/b.c\n@@ -0,0 +1 @@\n+int b;\n";
        let units = split_units("pr/1.diff", parse_unified_diff(text));
        let ids: Vec<&str> = units.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["pr/1.diff:a.c", "pr/1.diff:b.c"]);
    }

    #[test]
    fn headerless_units_fall_back_to_file_name() {
        assert_eq!(fallback_target("src/app.py.patch").as_deref(), Some("src/app.py"));
        assert_eq!(fallback_target("notes.txt"), None);
        let units = split_units("lib.rs.diff", parse_unified_diff("@@ -1 +1 @@\n+x\n"));
        assert_eq!(units[0].target.as_deref(), Some("lib.rs"));
    }

    #[test]
    fn broken_diff_becomes_an_error_unit() {
        let units = split_units("bad.patch", parse_unified_diff("--- a/x\n+++ b/x\n+oops\n"));
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].error(), Some(&DiffError::MissingHunkHeader { line: 3 }));
        assert_eq!(units[0].hunk_count(), 0);
    }

    #[test]
    fn directory_ingest_continues_past_a_binary_diff() -> io::Result<()> {
        let root = temp_dir("ingest_dir");
        fs::create_dir_all(&root)?;
        fs::write(
            root.join("a.patch"),
            "--- a/a.py\n+++ b/a.py\n@@ -1 +1 @@\n-x = 1\n+x = 2\n",
        )?;
        fs::write(root.join("b.patch"), b"GIT binary patch\0\x01\x02")?;
        fs::write(
            root.join("c.patch"),
            "--- a/c.py\n+++ b/c.py\n@@ -1 +1 @@\n-y = 1\n+y = 2\n@@ -9,0 +10 @@\n+print(y)\n",
        )?;

        let options = AnalysisOptions::default();
        let ingestor = PatchIngestor::new(&options);
        let outcome = ingestor.ingest_with_stats(&root, Polarity::Added, None)?;
        let result = &outcome.result;

        let ids: Vec<&str> = result.units.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["a.patch", "b.patch", "c.patch"]);
        assert_eq!(result.units[1].error(), Some(&DiffError::Binary));
        assert_eq!(result.count(), 3);
        let record_ids: Vec<&str> = result.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(
            record_ids,
            vec!["[a.patch] a.py #1", "[c.patch] c.py #1", "[c.patch] c.py #2"]
        );
        assert!(result.records.iter().all(|r| r.language == Language::Python));
        assert_eq!(outcome.stats.skipped_binary, 1);
        assert_eq!(outcome.stats.malformed_diffs, 1);

        let forced = ingestor.ingest(&root, Polarity::Removed, Some(Language::Text))?;
        assert_eq!(forced.count(), 2);
        assert!(forced.records.iter().all(|r| r.language == Language::Text));

        fs::remove_dir_all(&root)?;
        Ok(())
    }
}

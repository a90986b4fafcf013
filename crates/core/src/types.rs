use std::collections::HashSet;
use std::fmt;
use std::ops::{Add, AddAssign};
use std::path::PathBuf;

use crate::error::{ConfigError, DiffError};
use crate::language::Language;

/// Which side of a diff is fingerprinted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Polarity {
    /// Added lines: the fixed code.
    #[default]
    Added,
    /// Removed lines: the code before the fix.
    Removed,
}

impl Polarity {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "added" | "add" | "+" => Some(Self::Added),
            "removed" | "remove" | "-" => Some(Self::Removed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
        }
    }
}

/// How diff sections are paired with source files inside one review unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Every diff section against every source file.
    #[default]
    AllFiles,
    /// Each diff section only against the file at its target path.
    ByPath,
}

impl MatchMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" | "all-files" => Some(Self::AllFiles),
            "path" | "by-path" => Some(Self::ByPath),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AllFiles => "all",
            Self::ByPath => "path",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub ngram_size: usize,
    pub bloom_bits: usize,
    pub batch_ratio: usize,
    pub polarity: Polarity,
    pub hunk_match_fraction: f64,
    pub applied_similarity: f64,
    pub priority_rule: bool,
    pub priority_min_chars: usize,
    pub match_mode: MatchMode,
    pub language: Option<Language>,
    pub max_file_size: Option<u64>,
    pub ignore_dirs: HashSet<String>,
    pub respect_gitignore: bool,
    pub patch_dir_name: String,
    pub source_dir_name: String,
}

pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_NGRAM_SIZE: usize = 1;
pub const DEFAULT_BLOOM_BITS: usize = 2_097_152;
pub const DEFAULT_BATCH_RATIO: usize = 32;

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            ngram_size: DEFAULT_NGRAM_SIZE,
            bloom_bits: DEFAULT_BLOOM_BITS,
            batch_ratio: DEFAULT_BATCH_RATIO,
            polarity: Polarity::Added,
            hunk_match_fraction: 0.5,
            applied_similarity: 0.3,
            priority_rule: true,
            priority_min_chars: 8,
            match_mode: MatchMode::AllFiles,
            language: None,
            max_file_size: Some(DEFAULT_MAX_FILE_SIZE_BYTES),
            ignore_dirs: default_ignore_dirs(),
            respect_gitignore: true,
            patch_dir_name: "github".to_string(),
            source_dir_name: "chatgpt".to_string(),
        }
    }
}

impl AnalysisOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ngram_size == 0 {
            return Err(ConfigError::ZeroNgramSize);
        }
        if self.bloom_bits == 0 {
            return Err(ConfigError::ZeroBloomBits);
        }
        if self.batch_ratio == 0 {
            return Err(ConfigError::ZeroBatchRatio);
        }
        if self.batch_ratio > self.bloom_bits {
            return Err(ConfigError::BatchRatioTooLarge {
                ratio: self.batch_ratio,
                bits: self.bloom_bits,
            });
        }
        check_fraction("hunk_match_fraction", self.hunk_match_fraction)?;
        check_fraction("applied_similarity", self.applied_similarity)?;
        Ok(())
    }

    /// Number of source n-grams a BloomIndex may absorb before it is checked and cleared.
    pub fn batch_threshold(&self) -> usize {
        (self.bloom_bits / self.batch_ratio.max(1)).max(1)
    }
}

fn check_fraction(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ThresholdOutOfRange { name, value })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanStats {
    pub candidate_files: u64,
    pub scanned_files: u64,
    pub scanned_bytes: u64,
    pub skipped_not_found: u64,
    pub skipped_permission_denied: u64,
    pub skipped_too_large: u64,
    pub skipped_binary: u64,
    pub skipped_invalid_encoding: u64,
    pub skipped_walk_errors: u64,
    pub malformed_diffs: u64,
    pub empty_hunks: u64,
    pub bloom_batches: u64,
}

impl ScanStats {
    pub fn merge(&mut self, other: &ScanStats) {
        self.candidate_files = self.candidate_files.saturating_add(other.candidate_files);
        self.scanned_files = self.scanned_files.saturating_add(other.scanned_files);
        self.scanned_bytes = self.scanned_bytes.saturating_add(other.scanned_bytes);
        self.skipped_not_found = self
            .skipped_not_found
            .saturating_add(other.skipped_not_found);
        self.skipped_permission_denied = self
            .skipped_permission_denied
            .saturating_add(other.skipped_permission_denied);
        self.skipped_too_large = self
            .skipped_too_large
            .saturating_add(other.skipped_too_large);
        self.skipped_binary = self.skipped_binary.saturating_add(other.skipped_binary);
        self.skipped_invalid_encoding = self
            .skipped_invalid_encoding
            .saturating_add(other.skipped_invalid_encoding);
        self.skipped_walk_errors = self
            .skipped_walk_errors
            .saturating_add(other.skipped_walk_errors);
        self.malformed_diffs = self.malformed_diffs.saturating_add(other.malformed_diffs);
        self.empty_hunks = self.empty_hunks.saturating_add(other.empty_hunks);
        self.bloom_batches = self.bloom_batches.saturating_add(other.bloom_batches);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome<T> {
    pub result: T,
    pub stats: ScanStats,
}

pub fn default_ignore_dirs() -> HashSet<String> {
    [
        ".git",
        ".hg",
        ".svn",
        "node_modules",
        "target",
        "dist",
        "build",
        "out",
        ".next",
        ".turbo",
        ".cache",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

/// Outcome of matching one patch against one source file, or of a whole review unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Classification {
    /// PA: the patch is present in the source.
    Applied,
    /// PN: the source was processed and the patch is absent.
    NotApplied,
    /// NE: the source file does not exist or could not be opened.
    NotExisting,
    /// CC: matching gave mixed signal.
    CannotClassify,
    /// ERROR: the diff could not be processed.
    Error,
}

impl Classification {
    pub const ALL: [Classification; 5] = [
        Classification::Applied,
        Classification::NotApplied,
        Classification::NotExisting,
        Classification::CannotClassify,
        Classification::Error,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::Applied => "PA",
            Self::NotApplied => "PN",
            Self::NotExisting => "NE",
            Self::CannotClassify => "CC",
            Self::Error => "ERROR",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|class| class.code().eq_ignore_ascii_case(code.trim()))
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Per-class tallies.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClassCounts {
    pub applied: u64,
    pub not_applied: u64,
    pub not_existing: u64,
    pub cannot_classify: u64,
    pub error: u64,
}

impl ClassCounts {
    pub fn record(&mut self, class: Classification) {
        let slot = self.slot_mut(class);
        *slot = slot.saturating_add(1);
    }

    pub fn get(&self, class: Classification) -> u64 {
        match class {
            Classification::Applied => self.applied,
            Classification::NotApplied => self.not_applied,
            Classification::NotExisting => self.not_existing,
            Classification::CannotClassify => self.cannot_classify,
            Classification::Error => self.error,
        }
    }

    pub fn total(&self) -> u64 {
        Classification::ALL
            .into_iter()
            .fold(0u64, |acc, class| acc.saturating_add(self.get(class)))
    }

    fn slot_mut(&mut self, class: Classification) -> &mut u64 {
        match class {
            Classification::Applied => &mut self.applied,
            Classification::NotApplied => &mut self.not_applied,
            Classification::NotExisting => &mut self.not_existing,
            Classification::CannotClassify => &mut self.cannot_classify,
            Classification::Error => &mut self.error,
        }
    }
}

impl AddAssign for ClassCounts {
    fn add_assign(&mut self, rhs: Self) {
        for class in Classification::ALL {
            let slot = self.slot_mut(class);
            *slot = slot.saturating_add(rhs.get(class));
        }
    }
}

impl Add for ClassCounts {
    type Output = ClassCounts;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl FromIterator<Classification> for ClassCounts {
    fn from_iter<I: IntoIterator<Item = Classification>>(iter: I) -> Self {
        let mut counts = ClassCounts::default();
        for class in iter {
            counts.record(class);
        }
        counts
    }
}

/// Per-hunk result of the hunk-level rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HunkOutcome {
    Matched,
    Unmatched,
    /// Enough n-grams matched, but none of the high-signal ones did.
    Ambiguous,
    /// The file the hunk targets was not available.
    Missing,
    Error,
}

impl HunkOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::Unmatched => "unmatched",
            Self::Ambiguous => "ambiguous",
            Self::Missing => "missing",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkResult {
    pub record_id: String,
    pub outcome: HunkOutcome,
    pub matched_ngrams: usize,
    pub total_ngrams: usize,
    pub priority_matched: usize,
    pub priority_total: usize,
}

/// Why a file-level classification came out the way it did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassReason {
    Applied,
    NoHunkMatched,
    BelowSimilarity,
    Ambiguous,
    SourceMissing,
    UnsupportedLanguage,
    HunkError,
    Diff(DiffError),
    Source(String),
}

impl fmt::Display for ClassReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => f.write_str("matched hunks above the similarity threshold"),
            Self::NoHunkMatched => f.write_str("no hunk matched"),
            Self::BelowSimilarity => f.write_str("hunks matched but similarity is below threshold"),
            Self::Ambiguous => f.write_str("only ambiguous hunk matches"),
            Self::SourceMissing => f.write_str("source file missing"),
            Self::UnsupportedLanguage => f.write_str("unsupported source language"),
            Self::HunkError => f.write_str("hunk could not be processed"),
            Self::Diff(err) => write!(f, "invalid diff: {err}"),
            Self::Source(msg) => write!(f, "unreadable source: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub class: Classification,
    pub reason: ClassReason,
    pub similarity: f64,
    pub matched_ngrams: usize,
    pub total_ngrams: usize,
    pub hunks: Vec<HunkResult>,
}

/// Classification of one diff section against one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileClassification {
    pub patch: String,
    pub target: Option<String>,
    pub source: Option<String>,
    pub language: Language,
    pub result: ClassificationResult,
}

impl FileClassification {
    /// Identifier used in aggregate listings.
    pub fn label(&self) -> String {
        match &self.source {
            Some(source) => format!("{} -> {}", self.patch, source),
            None => format!("{} -> <missing>", self.patch),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateResult {
    pub unit_id: String,
    pub project: String,
    pub verdict: Classification,
    pub counts: ClassCounts,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewUnitInput {
    pub id: String,
    pub project: String,
    pub patch_dir: PathBuf,
    pub source_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitReport {
    pub aggregate: AggregateResult,
    pub files: Vec<FileClassification>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetReport {
    pub units: Vec<UnitReport>,
    /// Distribution of unit verdicts.
    pub verdict_counts: ClassCounts,
    /// Per-class totals over every file-level classification.
    pub file_counts: ClassCounts,
}

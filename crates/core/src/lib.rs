mod aggregate;
mod bloom;
mod classify;
mod diff;
mod error;
mod fingerprint;
mod language;
mod matcher;
mod patch;
mod pipeline;
mod scan;
mod tokenize;
mod types;
mod util;

pub use aggregate::{aggregate, count_all_classifications, resolve_verdict, total_file_counts};
pub use bloom::BloomIndex;
pub use classify::{Classifier, resolve_patch_class, similarity};
pub use diff::{DiffLine, DiffSection, Hunk, LineKind, parse_unified_diff};
pub use error::{ConfigError, DiffError};
pub use fingerprint::{Fingerprint, HashTriple, HashedNgrams, NgramKind, hash_ngrams};
pub use language::{CommentSyntax, Language, comment_syntax, extension_for};
pub use matcher::{MatchOutcome, MatchRecord, SourceMatcher, SourceScan};
pub use patch::{IngestResult, PatchIngestor, PatchRecord, PatchUnit};
pub use pipeline::{
    analyze_dataset, analyze_dataset_with_stats, analyze_review_unit,
    analyze_review_unit_with_stats, discover_review_units,
};
pub use tokenize::normalize;

pub use types::{
    AggregateResult, AnalysisOptions, ClassCounts, ClassReason, Classification,
    ClassificationResult, DEFAULT_BATCH_RATIO, DEFAULT_BLOOM_BITS, DEFAULT_MAX_FILE_SIZE_BYTES,
    DEFAULT_NGRAM_SIZE, DatasetReport, FileClassification, HunkOutcome, HunkResult, MatchMode,
    Polarity, ReviewUnitInput, ScanOutcome, ScanStats, UnitReport, default_ignore_dirs,
};

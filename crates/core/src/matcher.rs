use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};
use rayon::prelude::*;

use crate::bloom::BloomIndex;
use crate::fingerprint::for_each_ngram_triple;
use crate::language::Language;
use crate::patch::PatchRecord;
use crate::scan::{ReadSkip, collect_files, read_text_file, validate_root};
use crate::tokenize::normalize;
use crate::types::{AnalysisOptions, ScanOutcome, ScanStats};

/// Per record, per n-gram: which of the three hashes were found in the source.
///
/// Monotonic: entries only go from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    found: Vec<Vec<[bool; 3]>>,
}

impl MatchRecord {
    pub fn new(records: &[PatchRecord]) -> Self {
        Self {
            found: records
                .iter()
                .map(|record| vec![[false; 3]; record.fingerprints.len()])
                .collect(),
        }
    }

    /// Marks all three hashes of one n-gram as found.
    pub fn mark(&mut self, record: usize, ngram: usize) {
        if let Some(slot) = self.found.get_mut(record).and_then(|r| r.get_mut(ngram)) {
            *slot = [true; 3];
        }
    }

    pub fn hash_hits(&self, record: usize, ngram: usize) -> [bool; 3] {
        self.found
            .get(record)
            .and_then(|r| r.get(ngram))
            .copied()
            .unwrap_or([false; 3])
    }

    /// An n-gram is found when all three of its hashes are.
    pub fn is_found(&self, record: usize, ngram: usize) -> bool {
        self.hash_hits(record, ngram).iter().all(|&hit| hit)
    }

    pub fn matched_ngrams(&self, record: usize) -> usize {
        self.found
            .get(record)
            .map_or(0, |r| r.iter().filter(|hits| hits.iter().all(|&h| h)).count())
    }

    pub fn total_matches(&self) -> usize {
        (0..self.found.len()).map(|r| self.matched_ngrams(r)).sum()
    }

    /// OR-accumulates another scan over the same records.
    pub fn merge(&mut self, other: &MatchRecord) {
        for (mine, theirs) in self.found.iter_mut().zip(&other.found) {
            for (a, b) in mine.iter_mut().zip(theirs) {
                for (x, y) in a.iter_mut().zip(b) {
                    *x |= *y;
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub record: MatchRecord,
    pub total_matches: usize,
    /// Number of BloomIndex check-and-clear cycles.
    pub batches: u64,
}

/// Result of looking at one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceScan {
    Matched(MatchOutcome),
    /// The file does not exist or could not be opened.
    Missing,
    /// The file exists but has no usable text.
    Unreadable(String),
}

pub struct SourceMatcher<'a> {
    options: &'a AnalysisOptions,
}

impl<'a> SourceMatcher<'a> {
    pub fn new(options: &'a AnalysisOptions) -> Self {
        Self { options }
    }

    /// Streams `tokens` through a bounded BloomIndex, checking pending patch n-grams at
    /// every batch boundary.
    pub fn match_tokens(&self, tokens: &[String], records: &[PatchRecord]) -> MatchOutcome {
        let mut matches = MatchRecord::new(records);
        let threshold = self.options.batch_threshold();
        let mut bloom = BloomIndex::new(self.options.bloom_bits);
        let mut batches = 0u64;

        let mut widths: Vec<usize> = records
            .iter()
            .map(|r| r.ngram_width)
            .filter(|&w| w > 0)
            .collect();
        widths.sort_unstable();
        widths.dedup();

        for width in widths {
            let members: Vec<usize> = records
                .iter()
                .enumerate()
                .filter(|(_, r)| r.ngram_width == width)
                .map(|(idx, _)| idx)
                .collect();
            if tokens.len() < width {
                debug!(
                    "source has {} tokens, shorter than n-gram width {width}",
                    tokens.len()
                );
                continue;
            }

            bloom.clear();
            let mut in_batch = 0usize;
            for_each_ngram_triple(tokens, width, |triple| {
                bloom.insert(&triple);
                in_batch += 1;
                if in_batch > threshold {
                    check_pending(&bloom, records, &members, &mut matches);
                    bloom.clear();
                    batches += 1;
                    in_batch = 0;
                }
            });
            if in_batch > 0 {
                check_pending(&bloom, records, &members, &mut matches);
                batches += 1;
            }
        }

        let total_matches = matches.total_matches();
        MatchOutcome {
            record: matches,
            total_matches,
            batches,
        }
    }

    pub fn match_text(
        &self,
        text: &str,
        language: Language,
        records: &[PatchRecord],
    ) -> MatchOutcome {
        self.match_tokens(&normalize(text, language), records)
    }

    /// Matches one source file. `language` of `None` detects it from the path.
    pub fn match_file(
        &self,
        path: &Path,
        language: Option<Language>,
        records: &[PatchRecord],
        stats: &mut ScanStats,
    ) -> SourceScan {
        match read_text_file(path, self.options.max_file_size, stats) {
            Ok(text) => {
                let language = language.unwrap_or_else(|| Language::from_path(path));
                let outcome = self.match_text(&text, language, records);
                stats.bloom_batches = stats.bloom_batches.saturating_add(outcome.batches);
                debug!(
                    "{}: {} n-grams matched in {} batches",
                    path.display(),
                    outcome.total_matches,
                    outcome.batches
                );
                SourceScan::Matched(outcome)
            }
            Err(skip) => SourceScan::from_skip(skip),
        }
    }

    /// Matches every file under `root` in parallel and OR-merges the results.
    pub fn match_tree(
        &self,
        root: &Path,
        records: &[PatchRecord],
        language: Option<Language>,
    ) -> io::Result<MatchOutcome> {
        Ok(self.match_tree_with_stats(root, records, language)?.result)
    }

    pub fn match_tree_with_stats(
        &self,
        root: &Path,
        records: &[PatchRecord],
        language: Option<Language>,
    ) -> io::Result<ScanOutcome<MatchOutcome>> {
        self.options.validate()?;
        validate_root(root)?;

        let mut stats = ScanStats::default();
        let files: Vec<PathBuf> = collect_files(root, self.options, &mut stats)?;

        let scans: Vec<(ScanStats, SourceScan)> = files
            .par_iter()
            .map(|path| {
                let mut local = ScanStats::default();
                let scan = self.match_file(path, language, records, &mut local);
                (local, scan)
            })
            .collect();

        let mut merged = MatchRecord::new(records);
        let mut batches = 0u64;
        for (local, scan) in &scans {
            stats.merge(local);
            if let SourceScan::Matched(outcome) = scan {
                merged.merge(&outcome.record);
                batches = batches.saturating_add(outcome.batches);
            }
        }

        let total_matches = merged.total_matches();
        info!(
            "matched {total_matches} n-grams across {} files under {}",
            files.len(),
            root.display()
        );
        Ok(ScanOutcome {
            result: MatchOutcome {
                record: merged,
                total_matches,
                batches,
            },
            stats,
        })
    }
}

impl SourceScan {
    fn from_skip(skip: ReadSkip) -> Self {
        if skip.is_missing() {
            Self::Missing
        } else {
            Self::Unreadable(skip.describe().to_string())
        }
    }
}

/// Queries every still-unresolved n-gram of `members` against the live filter.
fn check_pending(
    bloom: &BloomIndex,
    records: &[PatchRecord],
    members: &[usize],
    matches: &mut MatchRecord,
) {
    for &idx in members {
        for (seq, fp) in records[idx].fingerprints.iter().enumerate() {
            if !matches.is_found(idx, seq) && bloom.query(&fp.hashes) {
                matches.mark(idx, seq);
            }
        }
    }
}

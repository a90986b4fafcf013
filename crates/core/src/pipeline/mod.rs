use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::aggregate::{aggregate, count_all_classifications, total_file_counts};
use crate::classify::Classifier;
use crate::language::Language;
use crate::matcher::{SourceMatcher, SourceScan};
use crate::patch::{PatchIngestor, PatchRecord, PatchUnit, unit_language};
use crate::scan::{
    collect_files, ignore_dirs_contains, is_safe_relative_path, make_rel_path, read_text_file,
    validate_root,
};
use crate::tokenize::normalize;
use crate::types::{
    AggregateResult, AnalysisOptions, ClassReason, Classification, ClassificationResult,
    DatasetReport, FileClassification, MatchMode, ReviewUnitInput, ScanOutcome, ScanStats,
    UnitReport,
};


/// A source file read and normalized once, shared by every diff it is paired with.
struct SourceText {
    rel_path: String,
    language: Language,
    /// Normalized tokens, or why the file could not be read.
    tokens: Result<Vec<String>, String>,
}

pub fn analyze_review_unit(
    input: &ReviewUnitInput,
    options: &AnalysisOptions,
) -> io::Result<UnitReport> {
    Ok(analyze_review_unit_with_stats(input, options)?.result)
}

pub fn analyze_review_unit_with_stats(
    input: &ReviewUnitInput,
    options: &AnalysisOptions,
) -> io::Result<ScanOutcome<UnitReport>> {
    options.validate()?;
    let mut stats = ScanStats::default();

    let units = if input.patch_dir.exists() {
        PatchIngestor::new(options).load(&input.patch_dir, &mut stats)?
    } else {
        debug!("{}: no patch directory {}", input.id, input.patch_dir.display());
        Vec::new()
    };

    let files = match options.match_mode {
        MatchMode::AllFiles => classify_against_all_files(&units, input, options, &mut stats)?,
        MatchMode::ByPath => classify_by_target_path(&units, input, options, &mut stats),
    };

    let aggregate = aggregate(&input.id, &input.project, &files);
    info!(
        "{} ({}): {} from {} diff units",
        input.id,
        input.project,
        aggregate.verdict,
        units.len()
    );
    Ok(ScanOutcome {
        result: UnitReport { aggregate, files },
        stats,
    })
}

fn classify_against_all_files(
    units: &[PatchUnit],
    input: &ReviewUnitInput,
    options: &AnalysisOptions,
    stats: &mut ScanStats,
) -> io::Result<Vec<FileClassification>> {
    let sources = load_sources(&input.source_dir, options, stats)?;
    let ingestor = PatchIngestor::new(options);
    let matcher = SourceMatcher::new(options);
    let classifier = Classifier::new(options);

    if sources.is_empty() {
        return Ok(units
            .iter()
            .map(|unit| {
                let language = options.language.unwrap_or_else(|| unit_language(unit));
                let result = match unit.error() {
                    Some(err) => classifier.classify_diff_error(err),
                    None => {
                        let records = ingestor.fingerprint(unit, options.polarity, language, stats);
                        classifier.classify_missing(&records)
                    }
                };
                file_result(unit, None, language, result)
            })
            .collect());
    }

    let mut records: HashMap<(usize, Language), Vec<PatchRecord>> = HashMap::new();
    for (idx, unit) in units.iter().enumerate() {
        if unit.error().is_some() {
            continue;
        }
        for source in sources.iter().filter(|source| source.tokens.is_ok()) {
            records.entry((idx, source.language)).or_insert_with(|| {
                ingestor.fingerprint(unit, options.polarity, source.language, stats)
            });
        }
    }

    let pairs: Vec<(usize, &SourceText)> = (0..units.len())
        .flat_map(|idx| sources.iter().map(move |source| (idx, source)))
        .collect();

    let results: Vec<(FileClassification, u64)> = pairs
        .par_iter()
        .map(|&(idx, source)| {
            let unit = &units[idx];
            let (result, batches) = match (unit.error(), &source.tokens) {
                (Some(err), _) => (classifier.classify_diff_error(err), 0),
                (None, Err(msg)) => (classifier.classify_unreadable_source(msg), 0),
                (None, Ok(_)) if !source.language.is_supported() => {
                    (classifier.classify_unsupported(), 0)
                }
                (None, Ok(tokens)) => {
                    let records = records
                        .get(&(idx, source.language))
                        .map(Vec::as_slice)
                        .unwrap_or_default();
                    let outcome = matcher.match_tokens(tokens, records);
                    (
                        classifier.classify_matches(records, &outcome.record),
                        outcome.batches,
                    )
                }
            };
            (
                file_result(unit, Some(source.rel_path.clone()), source.language, result),
                batches,
            )
        })
        .collect();

    Ok(results
        .into_iter()
        .map(|(file, batches)| {
            stats.bloom_batches = stats.bloom_batches.saturating_add(batches);
            file
        })
        .collect())
}

fn classify_by_target_path(
    units: &[PatchUnit],
    input: &ReviewUnitInput,
    options: &AnalysisOptions,
    stats: &mut ScanStats,
) -> Vec<FileClassification> {
    let ingestor = PatchIngestor::new(options);
    let matcher = SourceMatcher::new(options);
    let classifier = Classifier::new(options);

    units
        .iter()
        .map(|unit| {
            let target = unit
                .target
                .as_deref()
                .filter(|target| is_safe_relative_path(target));
            let path = target.map(|target| input.source_dir.join(target));
            let language = options.language.unwrap_or_else(|| match &path {
                Some(path) => Language::from_path(path),
                None => unit_language(unit),
            });

            let source = target.map(str::to_string);
            if let Some(err) = unit.error() {
                let result = classifier.classify_diff_error(err);
                return file_result(unit, source, language, result);
            }

            let records = ingestor.fingerprint(unit, options.polarity, language, stats);
            let Some(path) = path else {
                debug!("{}: no usable target path", unit.id);
                let result = classifier.classify_missing(&records);
                return file_result(unit, None, language, result);
            };

            let result = match matcher.match_file(&path, Some(language), &records, stats) {
                SourceScan::Missing => classifier.classify_missing(&records),
                SourceScan::Unreadable(msg) => {
                    warn!("{}: {msg}", path.display());
                    classifier.classify_unreadable_source(&msg)
                }
                SourceScan::Matched(_) if !language.is_supported() => {
                    classifier.classify_unsupported()
                }
                SourceScan::Matched(outcome) => {
                    classifier.classify_matches(&records, &outcome.record)
                }
            };
            file_result(unit, source, language, result)
        })
        .collect()
}

/// Reads and normalizes every file under `source_dir`.
///
/// A file that disappeared or cannot be opened is left out. A file that is binary, too large
/// or not UTF-8 is kept with its failure so every diff paired with it reports ERROR.
fn load_sources(
    source_dir: &Path,
    options: &AnalysisOptions,
    stats: &mut ScanStats,
) -> io::Result<Vec<SourceText>> {
    if !source_dir.is_dir() {
        debug!("no source directory {}", source_dir.display());
        return Ok(Vec::new());
    }

    let mut texts = Vec::new();
    for path in collect_files(source_dir, options, stats)? {
        let text = match read_text_file(&path, options.max_file_size, stats) {
            Ok(text) => Ok(text),
            Err(skip) if skip.is_missing() => {
                debug!("skipping {}: {}", path.display(), skip.describe());
                continue;
            }
            Err(skip) => {
                warn!("{}: {}", path.display(), skip.describe());
                Err(skip.describe().to_string())
            }
        };
        let language = options
            .language
            .unwrap_or_else(|| Language::from_path(&path));
        texts.push((make_rel_path(source_dir, &path), language, text));
    }

    Ok(texts
        .into_par_iter()
        .map(|(rel_path, language, text)| SourceText {
            tokens: text.map(|text| normalize(&text, language)),
            rel_path,
            language,
        })
        .collect())
}

fn file_result(
    unit: &PatchUnit,
    source: Option<String>,
    language: Language,
    result: ClassificationResult,
) -> FileClassification {
    FileClassification {
        patch: unit.id.clone(),
        target: unit.target.clone(),
        source,
        language,
        result,
    }
}

/// Finds `<root>/<owner>/<repo>/<unit>/` directories.
pub fn discover_review_units(
    root: &Path,
    options: &AnalysisOptions,
) -> io::Result<Vec<ReviewUnitInput>> {
    validate_root(root)?;
    let mut inputs = Vec::new();
    for (owner, owner_dir) in subdirs(root, options)? {
        for (repo, repo_dir) in nested_subdirs(&owner_dir, options) {
            for (unit, unit_dir) in nested_subdirs(&repo_dir, options) {
                inputs.push(ReviewUnitInput {
                    id: unit,
                    project: format!("{owner}/{repo}"),
                    patch_dir: unit_dir.join(&options.patch_dir_name),
                    source_dir: unit_dir.join(&options.source_dir_name),
                });
            }
        }
    }
    info!("found {} review units under {}", inputs.len(), root.display());
    Ok(inputs)
}

pub fn analyze_dataset(root: &Path, options: &AnalysisOptions) -> io::Result<DatasetReport> {
    Ok(analyze_dataset_with_stats(root, options)?.result)
}

/// Analyzes every review unit under `root`. A unit that cannot be analyzed is reported as
/// ERROR and the run continues.
pub fn analyze_dataset_with_stats(
    root: &Path,
    options: &AnalysisOptions,
) -> io::Result<ScanOutcome<DatasetReport>> {
    options.validate()?;
    let inputs = discover_review_units(root, options)?;

    let mut stats = ScanStats::default();
    let mut units = Vec::with_capacity(inputs.len());
    for input in &inputs {
        match analyze_review_unit_with_stats(input, options) {
            Ok(outcome) => {
                stats.merge(&outcome.stats);
                units.push(outcome.result);
            }
            Err(err) => {
                warn!("{} ({}): {err}", input.id, input.project);
                units.push(failed_unit(input, &err));
            }
        }
    }

    let aggregates: Vec<AggregateResult> = units.iter().map(|u| u.aggregate.clone()).collect();
    let report = DatasetReport {
        verdict_counts: count_all_classifications(&aggregates),
        file_counts: total_file_counts(&aggregates),
        units,
    };
    Ok(ScanOutcome {
        result: report,
        stats,
    })
}

fn failed_unit(input: &ReviewUnitInput, err: &io::Error) -> UnitReport {
    let files = vec![FileClassification {
        patch: input.patch_dir.to_string_lossy().into_owned(),
        target: None,
        source: None,
        language: Language::NonText,
        result: ClassificationResult {
            class: Classification::Error,
            reason: ClassReason::Source(err.to_string()),
            similarity: 0.0,
            matched_ngrams: 0,
            total_ngrams: 0,
            hunks: Vec::new(),
        },
    }];
    UnitReport {
        aggregate: aggregate(&input.id, &input.project, &files),
        files,
    }
}

fn subdirs(dir: &Path, options: &AnalysisOptions) -> io::Result<Vec<(String, PathBuf)>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name.starts_with('.') || ignore_dirs_contains(&options.ignore_dirs, &name) {
            continue;
        }
        out.push((name, entry.path()));
    }
    out.sort();
    Ok(out)
}

/// Like [`subdirs`], but a directory that cannot be listed is logged and skipped.
fn nested_subdirs(dir: &Path, options: &AnalysisOptions) -> Vec<(String, PathBuf)> {
    subdirs(dir, options).unwrap_or_else(|err| {
        warn!("cannot list {}: {err}", dir.display());
        Vec::new()
    })
}

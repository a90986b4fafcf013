use std::io;

use patch_track_core::{
    ClassCounts, DatasetReport, FileClassification, HunkResult, ScanStats, UnitReport,
};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonScanStats {
    pub(crate) candidate_files: u64,
    pub(crate) scanned_files: u64,
    pub(crate) scanned_bytes: u64,
    pub(crate) skipped_not_found: u64,
    pub(crate) skipped_permission_denied: u64,
    pub(crate) skipped_too_large: u64,
    pub(crate) skipped_binary: u64,
    pub(crate) skipped_invalid_encoding: u64,
    pub(crate) skipped_walk_errors: u64,
    pub(crate) malformed_diffs: u64,
    pub(crate) empty_hunks: u64,
    pub(crate) bloom_batches: u64,
}

impl From<ScanStats> for JsonScanStats {
    fn from(stats: ScanStats) -> Self {
        Self {
            candidate_files: stats.candidate_files,
            scanned_files: stats.scanned_files,
            scanned_bytes: stats.scanned_bytes,
            skipped_not_found: stats.skipped_not_found,
            skipped_permission_denied: stats.skipped_permission_denied,
            skipped_too_large: stats.skipped_too_large,
            skipped_binary: stats.skipped_binary,
            skipped_invalid_encoding: stats.skipped_invalid_encoding,
            skipped_walk_errors: stats.skipped_walk_errors,
            malformed_diffs: stats.malformed_diffs,
            empty_hunks: stats.empty_hunks,
            bloom_batches: stats.bloom_batches,
        }
    }
}

/// Keyed by the short class codes used in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct JsonClassCounts {
    #[serde(rename = "PA")]
    pub(crate) applied: u64,
    #[serde(rename = "PN")]
    pub(crate) not_applied: u64,
    #[serde(rename = "NE")]
    pub(crate) not_existing: u64,
    #[serde(rename = "CC")]
    pub(crate) cannot_classify: u64,
    #[serde(rename = "ERROR")]
    pub(crate) error: u64,
}

impl From<ClassCounts> for JsonClassCounts {
    fn from(counts: ClassCounts) -> Self {
        Self {
            applied: counts.applied,
            not_applied: counts.not_applied,
            not_existing: counts.not_existing,
            cannot_classify: counts.cannot_classify,
            error: counts.error,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonHunkResult {
    pub(crate) record_id: String,
    pub(crate) outcome: &'static str,
    pub(crate) matched_ngrams: usize,
    pub(crate) total_ngrams: usize,
    pub(crate) priority_matched: usize,
    pub(crate) priority_total: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonFileClassification {
    pub(crate) patch: String,
    pub(crate) target: Option<String>,
    pub(crate) source: Option<String>,
    pub(crate) language: &'static str,
    pub(crate) language_id: u8,
    pub(crate) class: &'static str,
    pub(crate) reason: String,
    pub(crate) similarity: f64,
    pub(crate) matched_ngrams: usize,
    pub(crate) total_ngrams: usize,
    pub(crate) hunks: Vec<JsonHunkResult>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonUnitReport {
    pub(crate) unit_id: String,
    pub(crate) project: String,
    pub(crate) verdict: &'static str,
    pub(crate) counts: JsonClassCounts,
    pub(crate) files: Vec<JsonFileClassification>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonDatasetReport {
    pub(crate) units: Vec<JsonUnitReport>,
    pub(crate) verdict_counts: JsonClassCounts,
    pub(crate) file_counts: JsonClassCounts,
}

fn map_hunk(hunk: HunkResult) -> JsonHunkResult {
    JsonHunkResult {
        record_id: hunk.record_id,
        outcome: hunk.outcome.as_str(),
        matched_ngrams: hunk.matched_ngrams,
        total_ngrams: hunk.total_ngrams,
        priority_matched: hunk.priority_matched,
        priority_total: hunk.priority_total,
    }
}

fn map_file(file: FileClassification) -> JsonFileClassification {
    JsonFileClassification {
        patch: file.patch,
        target: file.target,
        source: file.source,
        language: file.language.name(),
        language_id: file.language.index(),
        class: file.result.class.code(),
        reason: file.result.reason.to_string(),
        similarity: file.result.similarity,
        matched_ngrams: file.result.matched_ngrams,
        total_ngrams: file.result.total_ngrams,
        hunks: file.result.hunks.into_iter().map(map_hunk).collect(),
    }
}

pub(crate) fn map_unit(report: UnitReport) -> JsonUnitReport {
    JsonUnitReport {
        unit_id: report.aggregate.unit_id,
        project: report.aggregate.project,
        verdict: report.aggregate.verdict.code(),
        counts: report.aggregate.counts.into(),
        files: report.files.into_iter().map(map_file).collect(),
    }
}

pub(crate) fn map_dataset(report: DatasetReport) -> JsonDatasetReport {
    JsonDatasetReport {
        units: report.units.into_iter().map(map_unit).collect(),
        verdict_counts: report.verdict_counts.into(),
        file_counts: report.file_counts.into(),
    }
}

pub(crate) fn write_json<T: Serialize>(value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::other(format!("json encode: {e}")))?;
    println!("{json}");
    Ok(())
}

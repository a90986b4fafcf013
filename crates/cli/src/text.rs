use patch_track_core::{Classification, ScanStats};

use crate::json::{JsonClassCounts, JsonDatasetReport, JsonFileClassification, JsonUnitReport};

/// Skips that mean some input was never looked at.
pub(crate) fn has_fatal_skips(stats: &ScanStats) -> bool {
    stats.skipped_permission_denied > 0 || stats.skipped_walk_errors > 0
}

pub(crate) fn has_error_verdict(units: &[JsonUnitReport]) -> bool {
    units
        .iter()
        .any(|u| u.verdict == Classification::Error.code())
}

pub(crate) fn format_scan_stats(stats: &ScanStats) -> String {
    let mut out = String::new();
    out.push_str("== scan stats ==\n");
    out.push_str(&format!(
        "candidates={} scanned={} bytes={}\n",
        stats.candidate_files, stats.scanned_files, stats.scanned_bytes
    ));
    out.push_str(&format!(
        "malformed_diffs={} empty_hunks={} bloom_batches={}\n",
        stats.malformed_diffs, stats.empty_hunks, stats.bloom_batches
    ));

    let mut skips: Vec<(&str, u64)> = vec![
        ("not_found", stats.skipped_not_found),
        ("permission_denied", stats.skipped_permission_denied),
        ("too_large", stats.skipped_too_large),
        ("binary", stats.skipped_binary),
        ("invalid_encoding", stats.skipped_invalid_encoding),
        ("walk_errors", stats.skipped_walk_errors),
    ];
    skips.retain(|(_, v)| *v > 0);
    if !skips.is_empty() {
        out.push_str("skipped:\n");
        for (k, v) in skips {
            out.push_str(&format!("- {k}={v}\n"));
        }
    }
    out.push('\n');
    out
}

fn format_counts(counts: &JsonClassCounts) -> String {
    format!(
        "PA={} PN={} NE={} CC={} ERROR={}",
        counts.applied,
        counts.not_applied,
        counts.not_existing,
        counts.cannot_classify,
        counts.error
    )
}

fn format_file(file: &JsonFileClassification) -> String {
    let source = file.source.as_deref().unwrap_or("<missing>");
    format!(
        "- {} {} -> {} [{}] similarity={:.3} ngrams={}/{} ({})\n",
        file.class,
        file.patch,
        source,
        file.language,
        file.similarity,
        file.matched_ngrams,
        file.total_ngrams,
        file.reason
    )
}

pub(crate) fn format_unit(unit: &JsonUnitReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} {} ({}) {}\n",
        unit.verdict,
        unit.unit_id,
        unit.project,
        format_counts(&unit.counts)
    ));
    for file in &unit.files {
        out.push_str(&format_file(file));
    }
    out.push('\n');
    out
}

pub(crate) fn format_dataset(report: &JsonDatasetReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("review units: {}\n\n", report.units.len()));
    for unit in &report.units {
        out.push_str(&format_unit(unit));
    }
    out.push_str("== verdicts ==\n");
    out.push_str(&format_counts(&report.verdict_counts));
    out.push_str("\n\n== file classifications ==\n");
    out.push_str(&format_counts(&report.file_counts));
    out.push_str("\n\n");
    out
}

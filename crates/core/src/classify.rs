use crate::error::DiffError;
use crate::fingerprint::NgramKind;
use crate::matcher::MatchRecord;
use crate::patch::PatchRecord;
use crate::types::{
    AnalysisOptions, ClassReason, Classification, ClassificationResult, HunkOutcome, HunkResult,
};

pub struct Classifier<'a> {
    options: &'a AnalysisOptions,
}

impl<'a> Classifier<'a> {
    pub fn new(options: &'a AnalysisOptions) -> Self {
        Self { options }
    }

    /// Applies the hunk rule to `records[index]`.
    ///
    /// A hunk is matched when at least `hunk_match_fraction` of its n-grams were found. With
    /// the priority rule on, a hunk that has priority n-grams but matched none of them is
    /// ambiguous instead.
    pub fn classify_hunk(
        &self,
        records: &[PatchRecord],
        index: usize,
        matches: &MatchRecord,
    ) -> HunkResult {
        let record = &records[index];
        let total_ngrams = record.total_ngrams();
        let mut matched_ngrams = 0usize;
        let mut priority_total = 0usize;
        let mut priority_matched = 0usize;
        for (seq, fp) in record.fingerprints.iter().enumerate() {
            let found = matches.is_found(index, seq);
            if found {
                matched_ngrams += 1;
            }
            if fp.kind == NgramKind::Priority {
                priority_total += 1;
                if found {
                    priority_matched += 1;
                }
            }
        }

        let outcome = if total_ngrams == 0 {
            HunkOutcome::Ambiguous
        } else if (matched_ngrams as f64) < self.options.hunk_match_fraction * total_ngrams as f64
        {
            HunkOutcome::Unmatched
        } else if self.options.priority_rule && priority_total > 0 && priority_matched == 0 {
            HunkOutcome::Ambiguous
        } else {
            HunkOutcome::Matched
        };

        HunkResult {
            record_id: record.id.clone(),
            outcome,
            matched_ngrams,
            total_ngrams,
            priority_matched,
            priority_total,
        }
    }

    /// Rolls hunk results of one diff unit up to a file-level classification.
    pub fn classify_patch(&self, hunks: Vec<HunkResult>) -> ClassificationResult {
        let matched_ngrams: usize = hunks.iter().map(|h| h.matched_ngrams).sum();
        let total_ngrams: usize = hunks.iter().map(|h| h.total_ngrams).sum();
        let similarity = similarity(matched_ngrams, total_ngrams);
        let outcomes: Vec<HunkOutcome> = hunks.iter().map(|h| h.outcome).collect();
        let class = resolve_patch_class(&outcomes, similarity, self.options.applied_similarity);
        let reason = match class {
            Classification::Error => ClassReason::HunkError,
            Classification::NotExisting => ClassReason::SourceMissing,
            Classification::Applied => ClassReason::Applied,
            Classification::NotApplied => ClassReason::NoHunkMatched,
            Classification::CannotClassify => {
                if outcomes.contains(&HunkOutcome::Matched) {
                    ClassReason::BelowSimilarity
                } else {
                    ClassReason::Ambiguous
                }
            }
        };
        ClassificationResult {
            class,
            reason,
            similarity,
            matched_ngrams,
            total_ngrams,
            hunks,
        }
    }

    /// Classifies every record of one unit against a finished match.
    pub fn classify_matches(
        &self,
        records: &[PatchRecord],
        matches: &MatchRecord,
    ) -> ClassificationResult {
        let hunks = (0..records.len())
            .map(|idx| self.classify_hunk(records, idx, matches))
            .collect();
        self.classify_patch(hunks)
    }

    /// Every hunk of the unit is missing its source.
    pub fn classify_missing(&self, records: &[PatchRecord]) -> ClassificationResult {
        let hunks = records
            .iter()
            .map(|record| HunkResult {
                record_id: record.id.clone(),
                outcome: HunkOutcome::Missing,
                matched_ngrams: 0,
                total_ngrams: record.total_ngrams(),
                priority_matched: 0,
                priority_total: record.priority_ngrams(),
            })
            .collect();
        let mut result = self.classify_patch(hunks);
        // A unit without hunks still has no source to compare against.
        result.class = Classification::NotExisting;
        result.reason = ClassReason::SourceMissing;
        result
    }

    pub fn classify_diff_error(&self, error: &DiffError) -> ClassificationResult {
        failure(Classification::Error, ClassReason::Diff(error.clone()))
    }

    pub fn classify_unreadable_source(&self, message: &str) -> ClassificationResult {
        failure(Classification::Error, ClassReason::Source(message.to_string()))
    }

    pub fn classify_unsupported(&self) -> ClassificationResult {
        failure(
            Classification::CannotClassify,
            ClassReason::UnsupportedLanguage,
        )
    }
}

fn failure(class: Classification, reason: ClassReason) -> ClassificationResult {
    ClassificationResult {
        class,
        reason,
        similarity: 0.0,
        matched_ngrams: 0,
        total_ngrams: 0,
        hunks: Vec::new(),
    }
}

/// `matched / total`, or 0 when there is nothing to match.
pub fn similarity(matched: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        matched as f64 / total as f64
    }
}

/// File-level precedence: ERROR > NE > PA > PN > CC.
///
/// PA needs a matched hunk and `similarity >= applied_similarity`. PN needs no matched hunk
/// and at least one clean miss (or no hunks at all). Everything else is CC.
pub fn resolve_patch_class(
    outcomes: &[HunkOutcome],
    similarity: f64,
    applied_similarity: f64,
) -> Classification {
    if outcomes.contains(&HunkOutcome::Error) {
        return Classification::Error;
    }
    if outcomes.contains(&HunkOutcome::Missing) {
        return Classification::NotExisting;
    }
    let any_matched = outcomes.contains(&HunkOutcome::Matched);
    if any_matched && similarity >= applied_similarity {
        return Classification::Applied;
    }
    if !any_matched && (outcomes.is_empty() || outcomes.contains(&HunkOutcome::Unmatched)) {
        return Classification::NotApplied;
    }
    Classification::CannotClassify
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::{Fingerprint, HashTriple};
    use crate::language::Language;

    const ALL_OUTCOMES: [HunkOutcome; 5] = [
        HunkOutcome::Matched,
        HunkOutcome::Unmatched,
        HunkOutcome::Ambiguous,
        HunkOutcome::Missing,
        HunkOutcome::Error,
    ];

    fn record(grams: &[(&str, NgramKind)]) -> PatchRecord {
        PatchRecord {
            id: "[p.patch] a.c #1".to_string(),
            unit: "p.patch".to_string(),
            sequence: 1,
            language: Language::C,
            markup: String::new(),
            tokens: grams.iter().map(|(g, _)| g.to_string()).collect(),
            fingerprints: grams
                .iter()
                .map(|(g, kind)| Fingerprint {
                    ngram: g.to_string(),
                    hashes: HashTriple::of(g),
                    kind: *kind,
                })
                .collect(),
            ngram_width: 1,
        }
    }

    fn hunk(outcome: HunkOutcome, matched: usize, total: usize) -> HunkResult {
        HunkResult {
            record_id: "r".to_string(),
            outcome,
            matched_ngrams: matched,
            total_ngrams: total,
            priority_matched: 0,
            priority_total: 0,
        }
    }

    fn combos(len: usize) -> Vec<Vec<HunkOutcome>> {
        let mut out = vec![Vec::new()];
        for _ in 0..len {
            out = out
                .into_iter()
                .flat_map(|prefix| {
                    ALL_OUTCOMES.into_iter().map(move |o| {
                        let mut next = prefix.clone();
                        next.push(o);
                        next
                    })
                })
                .collect();
        }
        out
    }

    #[test]
    fn hunk_rule_uses_match_fraction() {
        let options = AnalysisOptions {
            priority_rule: false,
            ..AnalysisOptions::default()
        };
        let classifier = Classifier::new(&options);
        let ordinary = NgramKind::Ordinary;
        let records = vec![record(&[("a", ordinary), ("b", ordinary), ("c", ordinary), ("d", ordinary)])];

        let mut matches = MatchRecord::new(&records);
        matches.mark(0, 0);
        assert_eq!(classifier.classify_hunk(&records, 0, &matches).outcome, HunkOutcome::Unmatched);
        matches.mark(0, 1);
        let result = classifier.classify_hunk(&records, 0, &matches);
        assert_eq!(result.outcome, HunkOutcome::Matched);
        assert_eq!((result.matched_ngrams, result.total_ngrams), (2, 4));
    }

    #[test]
    fn priority_rule_demands_a_high_signal_hit() {
        let options = AnalysisOptions::default();
        let classifier = Classifier::new(&options);
        let records = vec![record(&[
            ("x", NgramKind::Ordinary),
            ("y", NgramKind::Ordinary),
            ("validate_user_token", NgramKind::Priority),
        ])];

        let mut matches = MatchRecord::new(&records);
        matches.mark(0, 0);
        matches.mark(0, 1);
        let result = classifier.classify_hunk(&records, 0, &matches);
        assert_eq!(result.outcome, HunkOutcome::Ambiguous);
        assert_eq!((result.priority_matched, result.priority_total), (0, 1));

        matches.mark(0, 2);
        assert_eq!(classifier.classify_hunk(&records, 0, &matches).outcome, HunkOutcome::Matched);

        let relaxed = AnalysisOptions {
            priority_rule: false,
            ..AnalysisOptions::default()
        };
        let mut partial = MatchRecord::new(&records);
        partial.mark(0, 0);
        partial.mark(0, 1);
        assert_eq!(
            Classifier::new(&relaxed).classify_hunk(&records, 0, &partial).outcome,
            HunkOutcome::Matched
        );
    }

    #[test]
    fn similarity_threshold_is_inclusive() {
        let options = AnalysisOptions {
            applied_similarity: 0.5,
            ..AnalysisOptions::default()
        };
        let classifier = Classifier::new(&options);
        let result = classifier.classify_patch(vec![
            hunk(HunkOutcome::Matched, 2, 2),
            hunk(HunkOutcome::Unmatched, 0, 2),
        ]);
        assert_eq!(result.similarity, 0.5);
        assert_eq!(result.class, Classification::Applied);

        let result = classifier.classify_patch(vec![
            hunk(HunkOutcome::Matched, 2, 2),
            hunk(HunkOutcome::Unmatched, 0, 3),
        ]);
        assert_eq!(result.class, Classification::CannotClassify);
        assert_eq!(result.reason, ClassReason::BelowSimilarity);
    }

    #[test]
    fn empty_unit_is_not_applied() {
        let options = AnalysisOptions::default();
        let result = Classifier::new(&options).classify_patch(Vec::new());
        assert_eq!(result.class, Classification::NotApplied);
        assert_eq!(result.similarity, 0.0);
    }

    #[test]
    fn missing_source_wins_over_hunk_content() {
        let options = AnalysisOptions::default();
        let classifier = Classifier::new(&options);
        let records = vec![record(&[("a", NgramKind::Ordinary)])];
        let result = classifier.classify_missing(&records);
        assert_eq!(result.class, Classification::NotExisting);
        assert_eq!(result.hunks[0].outcome, HunkOutcome::Missing);
        assert_eq!(classifier.classify_missing(&[]).class, Classification::NotExisting);
    }

    #[test]
    fn precedence_holds_for_every_mix_of_two_to_four_hunks() {
        for len in 2..=4 {
            for outcomes in combos(len) {
                for similarity in [0.0, 0.3, 1.0] {
                    let class = resolve_patch_class(&outcomes, similarity, 0.3);
                    let has = |o: HunkOutcome| outcomes.contains(&o);
                    let expected = if has(HunkOutcome::Error) {
                        Classification::Error
                    } else if has(HunkOutcome::Missing) {
                        Classification::NotExisting
                    } else if has(HunkOutcome::Matched) && similarity >= 0.3 {
                        Classification::Applied
                    } else if !has(HunkOutcome::Matched) && has(HunkOutcome::Unmatched) {
                        Classification::NotApplied
                    } else {
                        Classification::CannotClassify
                    };
                    assert_eq!(class, expected, "{outcomes:?} at {similarity}");
                }
            }
        }
    }

    #[test]
    fn higher_precedence_outcome_always_dominates() {
        let rank = |c: Classification| match c {
            Classification::Error => 0,
            Classification::NotExisting => 1,
            Classification::Applied => 2,
            Classification::NotApplied => 3,
            Classification::CannotClassify => 4,
        };
        for outcomes in combos(3) {
            let base = resolve_patch_class(&outcomes, 1.0, 0.3);
            for extra in [HunkOutcome::Error, HunkOutcome::Missing] {
                let mut more = outcomes.clone();
                more.push(extra);
                let class = resolve_patch_class(&more, 1.0, 0.3);
                assert!(rank(class) <= rank(base), "{more:?}");
            }
        }
    }
}

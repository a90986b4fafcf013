use crate::types::{AggregateResult, ClassCounts, Classification, FileClassification};

/// Rolls the file-level classifications of one review unit into a verdict.
pub fn aggregate(unit_id: &str, project: &str, files: &[FileClassification]) -> AggregateResult {
    let classes: Vec<Classification> = files.iter().map(|f| f.result.class).collect();
    AggregateResult {
        unit_id: unit_id.to_string(),
        project: project.to_string(),
        verdict: resolve_verdict(&classes),
        counts: classes.iter().copied().collect(),
        files: files.iter().map(FileClassification::label).collect(),
    }
}

/// ERROR if any file errored, else PA if any applied, else PN if all are PN, else NE if all
/// are NE. A unit with no files at all is NE. Anything else is CC.
///
/// PN needs every file to be PN, so a PN file next to a CC file (say a `.txt` answer beside
/// the source) leaves the unit CC.
pub fn resolve_verdict(classes: &[Classification]) -> Classification {
    if classes.is_empty() {
        return Classification::NotExisting;
    }
    if classes.contains(&Classification::Error) {
        return Classification::Error;
    }
    if classes.contains(&Classification::Applied) {
        return Classification::Applied;
    }
    if classes.iter().all(|&c| c == Classification::NotApplied) {
        return Classification::NotApplied;
    }
    if classes.iter().all(|&c| c == Classification::NotExisting) {
        return Classification::NotExisting;
    }
    Classification::CannotClassify
}

/// How many review units ended with each verdict.
pub fn count_all_classifications(results: &[AggregateResult]) -> ClassCounts {
    results.iter().map(|r| r.verdict).collect()
}

/// Per-class file counts summed over every review unit.
pub fn total_file_counts(results: &[AggregateResult]) -> ClassCounts {
    results
        .iter()
        .fold(ClassCounts::default(), |acc, r| acc + r.counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use crate::types::{ClassReason, ClassificationResult};

    fn file(patch: &str, class: Classification) -> FileClassification {
        FileClassification {
            patch: patch.to_string(),
            target: None,
            source: Some("main.py".to_string()),
            language: Language::Python,
            result: ClassificationResult {
                class,
                reason: ClassReason::NoHunkMatched,
                similarity: 0.0,
                matched_ngrams: 0,
                total_ngrams: 0,
                hunks: Vec::new(),
            },
        }
    }

    #[test]
    fn verdict_follows_precedence() {
        use Classification::*;
        assert_eq!(resolve_verdict(&[]), NotExisting);
        assert_eq!(resolve_verdict(&[Applied, Error, NotApplied]), Error);
        assert_eq!(resolve_verdict(&[NotApplied, Applied, CannotClassify]), Applied);
        assert_eq!(resolve_verdict(&[NotApplied, NotApplied]), NotApplied);
        assert_eq!(resolve_verdict(&[NotExisting, NotExisting]), NotExisting);
        assert_eq!(resolve_verdict(&[NotApplied, NotExisting]), CannotClassify);
        assert_eq!(resolve_verdict(&[CannotClassify]), CannotClassify);
        assert_eq!(resolve_verdict(&[NotApplied, CannotClassify]), CannotClassify);
    }

    #[test]
    fn verdict_precedence_for_every_mix() {
        let all = Classification::ALL;
        for a in all {
            for b in all {
                for c in all {
                    let classes = [a, b, c];
                    let verdict = resolve_verdict(&classes);
                    if classes.contains(&Classification::Error) {
                        assert_eq!(verdict, Classification::Error);
                    } else if classes.contains(&Classification::Applied) {
                        assert_eq!(verdict, Classification::Applied);
                    } else if classes.iter().all(|&x| x == a) && a != Classification::CannotClassify {
                        assert_eq!(verdict, a);
                    } else {
                        assert_eq!(verdict, Classification::CannotClassify);
                    }
                }
            }
        }
    }

    #[test]
    fn aggregate_counts_and_labels_files() {
        let files = vec![
            file("a.patch", Classification::Applied),
            file("b.patch", Classification::NotApplied),
            file("c.patch", Classification::NotApplied),
        ];
        let result = aggregate("pr-7", "owner/repo", &files);
        assert_eq!(result.verdict, Classification::Applied);
        assert_eq!(result.counts.applied, 1);
        assert_eq!(result.counts.not_applied, 2);
        assert_eq!(result.counts.total(), 3);
        assert_eq!(result.files[0], "a.patch -> main.py");
    }

    #[test]
    fn dataset_totals_equal_sum_of_units() {
        use Classification::*;
        let units = [
            vec![Applied, NotApplied],
            vec![Error, Applied, CannotClassify],
            vec![],
            vec![NotExisting, NotExisting],
            vec![NotApplied],
        ];
        let results: Vec<AggregateResult> = units
            .iter()
            .enumerate()
            .map(|(i, classes)| {
                let files: Vec<FileClassification> =
                    classes.iter().map(|&c| file("p.patch", c)).collect();
                aggregate(&format!("u{i}"), "o/r", &files)
            })
            .collect();

        let file_totals = total_file_counts(&results);
        let summed = results
            .iter()
            .fold(ClassCounts::default(), |mut acc, r| {
                for class in Classification::ALL {
                    for _ in 0..r.counts.get(class) {
                        acc.record(class);
                    }
                }
                acc
            });
        assert_eq!(file_totals, summed);
        assert_eq!(file_totals.total(), 8);

        let verdicts = count_all_classifications(&results);
        assert_eq!(verdicts.total(), results.len() as u64);
        assert_eq!(verdicts.applied, 1);
        assert_eq!(verdicts.error, 1);
        assert_eq!(verdicts.not_existing, 2);
        assert_eq!(verdicts.not_applied, 1);
    }
}

//! Outcome types for single-source collections and batch runs.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionStatus {
    Success,
    Warning,
    Error,
}

impl std::fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectionStatus::Success => write!(f, "success"),
            CollectionStatus::Warning => write!(f, "warning"),
            CollectionStatus::Error => write!(f, "error"),
        }
    }
}

/// A record that was fetched but not persisted, with its position in the
/// fetched page range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub index: usize,
    pub reason: String,
}

/// Outcome of one fetch-and-save cycle against a single source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionResult {
    pub status: CollectionStatus,
    pub message: String,
    pub collected_count: usize,
    pub saved_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedRecord>,
}

impl CollectionResult {
    /// The page range was valid but upstream returned no rows.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            status: CollectionStatus::Warning,
            message: "No data collected".to_string(),
            collected_count: 0,
            saved_count: 0,
            skipped: Vec::new(),
        }
    }

    #[must_use]
    pub fn saved(collected_count: usize, saved_count: usize, skipped: Vec<SkippedRecord>) -> Self {
        let message = if skipped.is_empty() {
            "Data collected and saved successfully".to_string()
        } else {
            format!(
                "Data collected and saved; {} of {collected_count} records skipped",
                skipped.len()
            )
        };
        Self {
            status: CollectionStatus::Success,
            message,
            collected_count,
            saved_count,
            skipped,
        }
    }

    /// The fetch or the unit of work failed as a whole; nothing is reported as saved.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: CollectionStatus::Error,
            message: message.into(),
            collected_count: 0,
            saved_count: 0,
            skipped: Vec::new(),
        }
    }
}

/// Per-task line of a [`BatchSummary`], tagged with its submission index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDetail {
    pub task_index: usize,
    pub source: String,
    pub status: CollectionStatus,
    pub message: String,
    pub collected_count: usize,
    pub saved_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_tasks: usize,
    pub successful_tasks: usize,
    pub failed_tasks: usize,
    pub total_collected: usize,
    pub total_saved: usize,
    pub details: Vec<TaskDetail>,
}

impl BatchSummary {
    /// Folds task outcomes, given in submission order, into a summary.
    ///
    /// `Err` means the task itself died (panic or cancellation) and counts as a
    /// failed task. Any returned [`CollectionResult`] counts as a successful
    /// task, whatever its own status, and contributes its counts to the totals.
    pub fn from_outcomes<I, S>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = (S, Result<CollectionResult, String>)>,
        S: Into<String>,
    {
        let mut summary = Self::default();

        for (task_index, (source, outcome)) in outcomes.into_iter().enumerate() {
            summary.total_tasks += 1;
            let source = source.into();
            let detail = match outcome {
                Ok(result) => {
                    summary.successful_tasks += 1;
                    summary.total_collected += result.collected_count;
                    summary.total_saved += result.saved_count;
                    TaskDetail {
                        task_index,
                        source,
                        status: result.status,
                        message: result.message,
                        collected_count: result.collected_count,
                        saved_count: result.saved_count,
                    }
                }
                Err(message) => {
                    summary.failed_tasks += 1;
                    TaskDetail {
                        task_index,
                        source,
                        status: CollectionStatus::Error,
                        message,
                        collected_count: 0,
                        saved_count: 0,
                    }
                }
            };
            summary.details.push(detail);
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&CollectionStatus::Warning).expect("serialize");
        assert_eq!(json, "\"warning\"");
    }

    #[test]
    fn empty_result_is_warning_with_zero_counts() {
        let result = CollectionResult::empty();
        assert_eq!(result.status, CollectionStatus::Warning);
        assert_eq!(result.collected_count, 0);
        assert_eq!(result.saved_count, 0);
    }

    #[test]
    fn saved_result_mentions_skipped_records() {
        let result = CollectionResult::saved(
            3,
            2,
            vec![SkippedRecord {
                index: 1,
                reason: "invalid sido".to_string(),
            }],
        );
        assert_eq!(result.status, CollectionStatus::Success);
        assert!(result.message.contains("1 of 3"), "{}", result.message);
    }

    #[test]
    fn summary_counts_returned_results_as_successful_tasks() {
        let summary = BatchSummary::from_outcomes(vec![
            ("a", Ok(CollectionResult::saved(5, 5, Vec::new()))),
            ("b", Ok(CollectionResult::failed("HTTP 503"))),
            ("c", Err("task panicked".to_string())),
        ]);

        assert_eq!(summary.total_tasks, 3);
        assert_eq!(summary.successful_tasks, 2);
        assert_eq!(summary.failed_tasks, 1);
        assert_eq!(summary.total_collected, 5);
        assert_eq!(summary.total_saved, 5);
        assert_eq!(summary.details[1].status, CollectionStatus::Error);
        assert_eq!(summary.details[2].status, CollectionStatus::Error);
        assert_eq!(summary.details[2].message, "task panicked");
    }

    #[test]
    fn summary_totals_match_detail_sums_and_preserve_order() {
        let summary = BatchSummary::from_outcomes(vec![
            ("first", Ok(CollectionResult::saved(10, 7, Vec::new()))),
            ("second", Ok(CollectionResult::empty())),
            ("third", Ok(CollectionResult::saved(4, 4, Vec::new()))),
        ]);

        let saved: usize = summary.details.iter().map(|d| d.saved_count).sum();
        let collected: usize = summary.details.iter().map(|d| d.collected_count).sum();
        assert_eq!(saved, summary.total_saved);
        assert_eq!(collected, summary.total_collected);
        assert_eq!(summary.details.len(), summary.total_tasks);

        let order: Vec<(usize, &str)> = summary
            .details
            .iter()
            .map(|d| (d.task_index, d.source.as_str()))
            .collect();
        assert_eq!(order, vec![(0, "first"), (1, "second"), (2, "third")]);
    }

    #[test]
    fn empty_batch_has_zero_totals() {
        let summary =
            BatchSummary::from_outcomes(Vec::<(String, Result<CollectionResult, String>)>::new());
        assert_eq!(summary, BatchSummary::default());
    }
}

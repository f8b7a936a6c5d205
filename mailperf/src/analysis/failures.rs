use std::collections::HashMap;

use crate::analysis::present;
use crate::records::{RunRecord, RunTable};
use crate::stats;

/// Coarse failure cause derived from the error text.
///
/// Matching is by substring and checked in declaration order: a message containing both "429"
/// and "413" is a rate-limit failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    RateLimit,
    PayloadTooLarge,
    Other,
}

impl FailureCategory {
    pub fn classify(error: Option<&str>) -> Self {
        match error {
            Some(message) if message.contains("429") => FailureCategory::RateLimit,
            Some(message) if message.contains("413") => FailureCategory::PayloadTooLarge,
            _ => FailureCategory::Other,
        }
    }
}

/// Occurrences of one distinct error message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorFrequency {
    pub message: String,
    pub occurrences: usize,
}

/// Mean queue wait of failed versus successful runs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueWaitComparison {
    pub failed_mean_ms: f64,
    /// `None` when there are no successful runs or none recorded a queue wait
    pub succeeded_mean_ms: Option<f64>,
    pub succeeded_runs: usize,
}

/// Report section 7
#[derive(Debug, Clone, PartialEq)]
pub struct FailureAnalysis {
    pub total_failed: usize,
    /// Most frequent first; ties keep first-seen order. Failures without a message are left out.
    pub error_frequencies: Vec<ErrorFrequency>,
    pub rate_limit: usize,
    pub payload_too_large: usize,
    /// Includes failures without an error message
    pub other: usize,
    pub mean_batch_size_failed: Option<f64>,
    pub mean_batch_size_succeeded: Option<f64>,
    /// Present only when some failed run recorded a queue wait
    pub queue_wait: Option<QueueWaitComparison>,
    /// Failed runs (any kind) whose queue wait was above zero
    pub failed_with_queue_wait: usize,
}

impl FailureAnalysis {
    pub fn compute(table: &RunTable) -> Self {
        let failed: Vec<&RunRecord> = table.failed().collect();

        let (mut rate_limit, mut payload_too_large, mut other) = (0, 0, 0);
        for record in &failed {
            match FailureCategory::classify(record.error.as_deref()) {
                FailureCategory::RateLimit => rate_limit += 1,
                FailureCategory::PayloadTooLarge => payload_too_large += 1,
                FailureCategory::Other => other += 1,
            }
        }

        let failed_waits = present(failed.iter().copied(), |r| r.queue_wait_ms);
        let queue_wait = stats::mean(&failed_waits).map(|failed_mean_ms| QueueWaitComparison {
            failed_mean_ms,
            succeeded_mean_ms: stats::mean(&present(table.succeeded(), |r| r.queue_wait_ms)),
            succeeded_runs: table.succeeded().count(),
        });

        Self {
            total_failed: failed.len(),
            error_frequencies: error_frequencies(&failed),
            rate_limit,
            payload_too_large,
            other,
            mean_batch_size_failed: mean_batch_size(failed.iter().copied()),
            mean_batch_size_succeeded: mean_batch_size(table.succeeded()),
            queue_wait,
            failed_with_queue_wait: failed.iter().filter(|r| r.queue_wait_ms.is_some_and(|q| q > 0.0)).count(),
        }
    }
}

fn mean_batch_size<'a>(rows: impl IntoIterator<Item = &'a RunRecord>) -> Option<f64> {
    stats::mean(&rows.into_iter().map(|r| r.batch_size as f64).collect::<Vec<_>>())
}

fn error_frequencies(failed: &[&RunRecord]) -> Vec<ErrorFrequency> {
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut frequencies: Vec<ErrorFrequency> = Vec::new();

    for message in failed.iter().filter_map(|r| r.error.as_deref()) {
        match position.get(message) {
            Some(&i) => frequencies[i].occurrences += 1,
            None => {
                position.insert(message, frequencies.len());
                frequencies.push(ErrorFrequency {
                    message: message.to_string(),
                    occurrences: 1,
                });
            }
        }
    }

    // stable sort keeps first-seen order among equal counts
    frequencies.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
    frequencies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::tests::{cached_run, failed_run, llm_run};

    #[test]
    fn test_classify_order() {
        assert_eq!(FailureCategory::classify(Some("HTTP 429: rate limited")), FailureCategory::RateLimit);
        assert_eq!(FailureCategory::classify(Some("HTTP 413: payload too large")), FailureCategory::PayloadTooLarge);
        // rate-limit check runs first regardless of position in the message
        assert_eq!(FailureCategory::classify(Some("413 after 429 retry")), FailureCategory::RateLimit);
        assert_eq!(FailureCategory::classify(Some("timeout")), FailureCategory::Other);
        assert_eq!(FailureCategory::classify(None), FailureCategory::Other);
    }

    #[test]
    fn test_rate_limit_not_counted_as_other() {
        let table = RunTable::new(vec![failed_run(2, Some("HTTP 429: rate limited"), 1800.0)]);
        let failures = FailureAnalysis::compute(&table);

        assert_eq!(failures.rate_limit, 1);
        assert_eq!(failures.other, 0);
        assert_eq!(failures.rate_limit + failures.payload_too_large + failures.other, failures.total_failed);
    }

    #[test]
    fn test_both_codes_counted_once() {
        let table = RunTable::new(vec![failed_run(2, Some("429 then 413"), 0.0)]);
        let failures = FailureAnalysis::compute(&table);

        assert_eq!((failures.rate_limit, failures.payload_too_large, failures.other), (1, 0, 0));
    }

    #[test]
    fn test_frequencies_sorted_with_first_seen_ties() {
        let table = RunTable::new(vec![
            failed_run(1, Some("timeout"), 0.0),
            failed_run(1, Some("HTTP 429"), 0.0),
            failed_run(1, Some("HTTP 413"), 0.0),
            failed_run(1, Some("HTTP 413"), 0.0),
            failed_run(1, None, 0.0),
        ]);
        let failures = FailureAnalysis::compute(&table);

        let order: Vec<(&str, usize)> = failures.error_frequencies.iter().map(|f| (f.message.as_str(), f.occurrences)).collect();
        assert_eq!(order, vec![("HTTP 413", 2), ("timeout", 1), ("HTTP 429", 1)]);
        assert_eq!(failures.other, 2);
    }

    #[test]
    fn test_batch_size_and_queue_wait_means() {
        let table = RunTable::new(vec![
            failed_run(4, Some("HTTP 429"), 3600.0),
            failed_run(2, Some("HTTP 429"), 0.0),
            llm_run(1, 1000.0, 0.0),
            cached_run(3),
        ]);
        let failures = FailureAnalysis::compute(&table);

        assert_eq!(failures.mean_batch_size_failed, Some(3.0));
        assert_eq!(failures.mean_batch_size_succeeded, Some(2.0));
        assert_eq!(failures.failed_with_queue_wait, 1);

        let queue = failures.queue_wait.unwrap();
        assert_eq!(queue.failed_mean_ms, 1800.0);
        assert_eq!(queue.succeeded_mean_ms, Some(0.0));
        assert_eq!(queue.succeeded_runs, 2);
    }

    #[test]
    fn test_missing_failed_queue_wait_skips_comparison() {
        let mut run = failed_run(1, Some("boom"), 0.0);
        run.queue_wait_ms = None;
        let failures = FailureAnalysis::compute(&RunTable::new(vec![run]));

        assert_eq!(failures.queue_wait, None);
    }

    #[test]
    fn test_no_failures() {
        let failures = FailureAnalysis::compute(&RunTable::new(vec![llm_run(1, 1000.0, 0.0)]));

        assert_eq!(failures.total_failed, 0);
        assert!(failures.error_frequencies.is_empty());
        assert_eq!(failures.mean_batch_size_failed, None);
    }
}

//! Final summary, assembled from the earlier sections rather than recomputed from the table.

use crate::analysis::{CacheRate, Correlation, FailureAnalysis, Overview, QueueBehavior, ScalingTable, SplitAnalysis};

/// Fixed delay the extension inserts between consecutive model calls, echoed in the report
pub const QUEUE_DELAY_MS: u64 = 1800;

/// Single vs multi mean latency, with whatever data exists
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LatencyComparison {
    Both {
        single_ms: f64,
        multi_ms: f64,
        /// `multi - single`, sign preserved
        difference_ms: f64,
        /// Relative to the single-email mean; `None` when that mean is zero
        difference_pct: Option<f64>,
    },
    SingleOnly {
        single_ms: f64,
    },
    MultiOnly {
        multi_ms: f64,
    },
    Insufficient,
}

impl LatencyComparison {
    pub fn new(single_ms: Option<f64>, multi_ms: Option<f64>) -> Self {
        match (single_ms, multi_ms) {
            (Some(single_ms), Some(multi_ms)) => {
                let difference_ms = multi_ms - single_ms;
                LatencyComparison::Both {
                    single_ms,
                    multi_ms,
                    difference_ms,
                    difference_pct: (single_ms != 0.0).then(|| difference_ms / single_ms * 100.0),
                }
            }
            (Some(single_ms), None) => LatencyComparison::SingleOnly { single_ms },
            (None, Some(multi_ms)) => LatencyComparison::MultiOnly { multi_ms },
            (None, None) => LatencyComparison::Insufficient,
        }
    }
}

/// Queued vs unqueued latency; only built when both groups are non-empty
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueingImpact {
    pub latency_queued_ms: Option<f64>,
    pub latency_unqueued_ms: Option<f64>,
    pub mean_queue_wait_ms: Option<f64>,
    pub correlation: Correlation,
}

/// Mean latency change from the smallest to the largest batch size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingDelta {
    pub from_batch_size: i64,
    pub to_batch_size: i64,
    pub latency_change_ms: Option<f64>,
}

/// Report section 9
#[derive(Debug, Clone, PartialEq)]
pub struct FinalSummary {
    pub latency: LatencyComparison,
    pub single_cache: CacheRate,
    pub multi_cache: CacheRate,
    pub overall_cache: CacheRate,
    /// `None` when no run invoked the model
    pub queue: Option<QueueSummary>,
    /// `None` with fewer than two batch sizes in the scaling table
    pub scaling: Option<ScalingDelta>,
    pub total_runs: usize,
    pub total_failures: usize,
    pub rate_limit_errors: usize,
    pub payload_errors: usize,
}

/// Queueing paragraph of the summary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueSummary {
    pub impact: Option<QueueingImpact>,
    pub failures_with_queue_wait: usize,
}

impl FinalSummary {
    pub fn compute(
        overview: &Overview,
        split: &SplitAnalysis,
        queue: Option<&QueueBehavior>,
        scaling: &ScalingTable,
        failures: &FailureAnalysis,
    ) -> Self {
        let queue = queue.map(|q| QueueSummary {
            impact: (q.queued_runs > 0 && q.unqueued_runs > 0).then_some(QueueingImpact {
                latency_queued_ms: q.mean_latency_queued_ms,
                latency_unqueued_ms: q.mean_latency_unqueued_ms,
                mean_queue_wait_ms: q.mean_queue_wait_ms,
                correlation: q.correlation,
            }),
            failures_with_queue_wait: failures.failed_with_queue_wait,
        });

        let scaling = match scaling.rows() {
            [first, .., last] => Some(ScalingDelta {
                from_batch_size: first.batch_size,
                to_batch_size: last.batch_size,
                latency_change_ms: first.mean_latency_ms.zip(last.mean_latency_ms).map(|(from, to)| to - from),
            }),
            _ => None,
        };

        Self {
            latency: LatencyComparison::new(split.single.mean_latency_ms(), split.multi.mean_latency_ms()),
            single_cache: split.single.cache,
            multi_cache: split.multi.cache,
            overall_cache: CacheRate {
                cache_served: overview.cache_served,
                total: overview.total_runs,
            },
            queue,
            scaling,
            total_runs: overview.total_runs,
            total_failures: failures.total_failed,
            rate_limit_errors: failures.rate_limit,
            payload_errors: failures.payload_too_large,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analysis;
    use crate::records::RunTable;
    use crate::records::tests::{cached_run, failed_run, llm_run};

    #[test]
    fn test_negative_difference_kept() {
        match LatencyComparison::new(Some(2000.0), Some(1500.0)) {
            LatencyComparison::Both {
                difference_ms,
                difference_pct,
                ..
            } => {
                assert_eq!(difference_ms, -500.0);
                assert_eq!(difference_pct, Some(-25.0));
            }
            other => panic!("unexpected comparison: {other:?}"),
        }
    }

    #[test]
    fn test_zero_single_mean_has_no_percentage() {
        let comparison = LatencyComparison::new(Some(0.0), Some(1500.0));
        assert!(matches!(comparison, LatencyComparison::Both { difference_pct: None, .. }));
    }

    #[test]
    fn test_one_sided_comparisons() {
        assert_eq!(LatencyComparison::new(Some(1.0), None), LatencyComparison::SingleOnly { single_ms: 1.0 });
        assert_eq!(LatencyComparison::new(None, Some(2.0)), LatencyComparison::MultiOnly { multi_ms: 2.0 });
        assert_eq!(LatencyComparison::new(None, None), LatencyComparison::Insufficient);
    }

    #[test]
    fn test_summary_reuses_sections() {
        let table = RunTable::new(vec![
            llm_run(1, 1000.0, 0.0),
            llm_run(2, 3000.0, 1800.0),
            llm_run(4, 6000.0, 3600.0),
            failed_run(4, Some("HTTP 429: rate limited"), 1800.0),
            cached_run(1),
        ]);
        let analysis = Analysis::compute(&table);
        let summary = &analysis.summary;

        let delta = summary.scaling.unwrap();
        assert_eq!((delta.from_batch_size, delta.to_batch_size), (1, 4));
        assert_eq!(delta.latency_change_ms, Some((6000.0 + 900.0) / 2.0 - 1000.0));

        let queue = summary.queue.unwrap();
        assert_eq!(queue.failures_with_queue_wait, 1);
        let impact = queue.impact.unwrap();
        assert_eq!(impact.correlation, analysis.queue.as_ref().unwrap().correlation);

        assert_eq!(summary.overall_cache, CacheRate { cache_served: 1, total: 5 });
        assert_eq!(summary.rate_limit_errors, 1);
        assert_eq!(summary.total_failures, 1);
    }

    #[test]
    fn test_single_batch_size_has_no_scaling_delta() {
        let analysis = Analysis::compute(&RunTable::new(vec![llm_run(2, 1000.0, 0.0), llm_run(2, 1200.0, 0.0)]));
        assert_eq!(analysis.summary.scaling, None);
        // everything unqueued: no queued/unqueued comparison
        assert_eq!(analysis.summary.queue.unwrap().impact, None);
    }
}

use std::collections::BTreeSet;

use crate::analysis::{CacheRate, present};
use crate::records::RunTable;
use crate::stats;

/// Performance of LLM-invoked runs at one batch size
#[derive(Debug, Clone, PartialEq)]
pub struct ScalingRow {
    pub batch_size: i64,
    pub llm_runs: usize,
    pub mean_latency_ms: Option<f64>,
    pub mean_throughput: Option<f64>,
    /// Failures among the LLM-invoked runs at this size
    pub failures: usize,
    /// Computed against every run at this size, cache-served included
    pub cache: CacheRate,
}

impl ScalingRow {
    pub fn failure_rate_pct(&self) -> Option<f64> {
        stats::percentage(self.failures, self.llm_runs)
    }
}

/// Report section 5: one row per batch size that has LLM-invoked runs, ascending.
///
/// Shared with the final summary and the two line charts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScalingTable {
    rows: Vec<ScalingRow>,
}

impl ScalingTable {
    pub fn compute(table: &RunTable) -> Self {
        let batch_sizes: BTreeSet<i64> = table.llm_invoked().map(|r| r.batch_size).collect();

        let rows = batch_sizes
            .into_iter()
            .map(|batch_size| {
                let llm_runs: Vec<_> = table.with_batch_size(batch_size).filter(|r| r.is_llm_invoked()).collect();
                ScalingRow {
                    batch_size,
                    llm_runs: llm_runs.len(),
                    mean_latency_ms: stats::mean(&present(llm_runs.iter().copied(), |r| r.latency_ms)),
                    mean_throughput: stats::mean(&present(llm_runs.iter().copied(), |r| r.throughput)),
                    failures: llm_runs.iter().filter(|r| !r.success).count(),
                    cache: CacheRate::of(table.with_batch_size(batch_size)),
                }
            })
            .collect();

        Self { rows }
    }

    pub fn rows(&self) -> &[ScalingRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// (batch size, mean latency) for every row with a defined mean
    pub fn latency_series(&self) -> Vec<(f64, f64)> {
        self.rows
            .iter()
            .filter_map(|row| Some((row.batch_size as f64, row.mean_latency_ms?)))
            .collect()
    }

    /// (batch size, mean throughput) for every row with a defined mean
    pub fn throughput_series(&self) -> Vec<(f64, f64)> {
        self.rows
            .iter()
            .filter_map(|row| Some((row.batch_size as f64, row.mean_throughput?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::tests::{cached_run, failed_run, llm_run};

    #[test]
    fn test_rows_ascending_with_cache_over_all_runs() {
        let table = RunTable::new(vec![
            llm_run(5, 9000.0, 1800.0),
            llm_run(1, 1000.0, 0.0),
            cached_run(1),
            llm_run(5, 11000.0, 3600.0),
            failed_run(5, Some("HTTP 429"), 1800.0),
            cached_run(5),
        ]);
        let scaling = ScalingTable::compute(&table);

        let sizes: Vec<i64> = scaling.rows().iter().map(|r| r.batch_size).collect();
        assert_eq!(sizes, vec![1, 5]);

        let five = &scaling.rows()[1];
        assert_eq!(five.llm_runs, 3);
        assert_eq!(five.failures, 1);
        assert_eq!(five.cache, CacheRate { cache_served: 1, total: 4 });
        assert_eq!(five.mean_latency_ms, Some((9000.0 + 11000.0 + 900.0) / 3.0));

        let one = &scaling.rows()[0];
        assert_eq!(one.failure_rate_pct(), Some(0.0));
        assert_eq!(one.cache.pct(), Some(50.0));
    }

    #[test]
    fn test_cache_only_batch_sizes_are_absent() {
        let table = RunTable::new(vec![cached_run(2), llm_run(3, 2000.0, 0.0)]);
        let scaling = ScalingTable::compute(&table);

        assert_eq!(scaling.len(), 1);
        assert_eq!(scaling.rows()[0].batch_size, 3);
    }

    #[test]
    fn test_series_follow_rows() {
        let table = RunTable::new(vec![llm_run(1, 1000.0, 0.0), llm_run(2, 3000.0, 0.0)]);
        let scaling = ScalingTable::compute(&table);

        assert_eq!(scaling.latency_series(), vec![(1.0, 1000.0), (2.0, 3000.0)]);
        assert_eq!(scaling.throughput_series().len(), 2);
    }
}

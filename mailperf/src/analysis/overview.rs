use std::collections::BTreeMap;

use crate::records::RunTable;
use crate::stats::percentage;

/// Number of runs sharing one `batchSize` value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchShare {
    pub batch_size: i64,
    pub runs: usize,
}

/// Dataset-wide counts (report section 1)
#[derive(Debug, Clone, PartialEq)]
pub struct Overview {
    pub total_runs: usize,
    pub successful_runs: usize,
    pub failed_runs: usize,
    /// Ascending by batch size
    pub batch_distribution: Vec<BatchShare>,
    pub cache_served: usize,
    pub llm_invoked: usize,
}

impl Overview {
    pub fn compute(table: &RunTable) -> Self {
        let successful_runs = table.succeeded().count();

        let mut by_size: BTreeMap<i64, usize> = BTreeMap::new();
        for record in table.iter() {
            *by_size.entry(record.batch_size).or_default() += 1;
        }

        Self {
            total_runs: table.len(),
            successful_runs,
            failed_runs: table.len() - successful_runs,
            batch_distribution: by_size.into_iter().map(|(batch_size, runs)| BatchShare { batch_size, runs }).collect(),
            cache_served: table.cache_served().count(),
            llm_invoked: table.llm_invoked().count(),
        }
    }

    /// Share of all runs, `None` for an empty table
    pub fn share_pct(&self, count: usize) -> Option<f64> {
        percentage(count, self.total_runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::tests::{cached_run, failed_run, llm_run};

    #[test]
    fn test_counts_add_up() {
        let table = RunTable::new(vec![
            cached_run(1),
            llm_run(1, 900.0, 0.0),
            llm_run(3, 2400.0, 1800.0),
            failed_run(3, Some("HTTP 429"), 1800.0),
            failed_run(5, None, 0.0),
        ]);
        let overview = Overview::compute(&table);

        assert_eq!(overview.total_runs, 5);
        assert_eq!(overview.successful_runs + overview.failed_runs, overview.total_runs);
        assert_eq!(overview.failed_runs, 2);
        assert_eq!(overview.cache_served + overview.llm_invoked, overview.total_runs);

        let pct_sum = overview.share_pct(overview.successful_runs).unwrap() + overview.share_pct(overview.failed_runs).unwrap();
        assert!((pct_sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_batch_distribution_sorted_ascending() {
        let table = RunTable::new(vec![llm_run(5, 1.0, 0.0), llm_run(1, 1.0, 0.0), llm_run(5, 1.0, 0.0), llm_run(2, 1.0, 0.0)]);
        let overview = Overview::compute(&table);

        assert_eq!(
            overview.batch_distribution,
            vec![
                BatchShare { batch_size: 1, runs: 1 },
                BatchShare { batch_size: 2, runs: 1 },
                BatchShare { batch_size: 5, runs: 2 },
            ]
        );
    }

    #[test]
    fn test_empty_table_has_no_shares() {
        let overview = Overview::compute(&RunTable::default());
        assert_eq!(overview.total_runs, 0);
        assert_eq!(overview.share_pct(0), None);
        assert!(overview.batch_distribution.is_empty());
    }
}

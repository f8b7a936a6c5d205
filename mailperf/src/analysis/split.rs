use crate::analysis::{CacheRate, present};
use crate::records::{EmailCategory, RunTable};
use crate::stats;

/// Performance of the LLM-invoked runs within one category.
///
/// Only built when the category has at least one LLM-invoked run.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmPerformance {
    pub runs: usize,
    pub mean_latency_ms: Option<f64>,
    pub median_latency_ms: Option<f64>,
    pub min_latency_ms: Option<f64>,
    pub max_latency_ms: Option<f64>,
    pub mean_throughput: Option<f64>,
    pub failures: usize,
}

impl LlmPerformance {
    /// Failures over LLM-invoked runs (not over the whole category)
    pub fn failure_rate_pct(&self) -> Option<f64> {
        stats::percentage(self.failures, self.runs)
    }
}

/// One side of the single/multi partition
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryBreakdown {
    pub category: EmailCategory,
    /// All runs in the category, cache-served included
    pub total_runs: usize,
    /// `None` when the category has no LLM-invoked runs
    pub llm: Option<LlmPerformance>,
    /// Computed over the whole category
    pub cache: CacheRate,
}

impl CategoryBreakdown {
    pub fn compute(table: &RunTable, category: EmailCategory) -> Self {
        let llm_runs: Vec<_> = table.in_category(category).filter(|r| r.is_llm_invoked()).collect();

        let llm = (!llm_runs.is_empty()).then(|| {
            let latencies = present(llm_runs.iter().copied(), |r| r.latency_ms);
            let throughputs = present(llm_runs.iter().copied(), |r| r.throughput);
            LlmPerformance {
                runs: llm_runs.len(),
                mean_latency_ms: stats::mean(&latencies),
                median_latency_ms: stats::median(&latencies),
                min_latency_ms: stats::min(&latencies),
                max_latency_ms: stats::max(&latencies),
                mean_throughput: stats::mean(&throughputs),
                failures: llm_runs.iter().filter(|r| !r.success).count(),
            }
        });

        Self {
            category,
            total_runs: table.in_category(category).count(),
            llm,
            cache: CacheRate::of(table.in_category(category)),
        }
    }

    /// Mean latency of LLM-invoked runs, if there is one
    pub fn mean_latency_ms(&self) -> Option<f64> {
        self.llm.as_ref().and_then(|p| p.mean_latency_ms)
    }
}

/// Report section 2
#[derive(Debug, Clone, PartialEq)]
pub struct SplitAnalysis {
    pub single: CategoryBreakdown,
    pub multi: CategoryBreakdown,
}

impl SplitAnalysis {
    pub fn compute(table: &RunTable) -> Self {
        Self {
            single: CategoryBreakdown::compute(table, EmailCategory::Single),
            multi: CategoryBreakdown::compute(table, EmailCategory::Multi),
        }
    }

    pub fn categories(&self) -> [&CategoryBreakdown; 2] {
        [&self.single, &self.multi]
    }
}

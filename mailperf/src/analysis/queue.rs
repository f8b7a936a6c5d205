use crate::analysis::present;
use crate::records::{RunRecord, RunTable};
use crate::stats;

/// Pearson r between queue wait and latency over queued LLM-invoked runs
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correlation {
    Value(f64),
    /// Fewer than two queued runs
    InsufficientRuns { queued: usize },
    /// Enough queued runs, but fewer than two of them recorded a latency
    MissingLatency { with_latency: usize },
    /// One of the two series is constant
    Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationStrength {
    Strong,
    Moderate,
    Weak,
}

impl Correlation {
    /// `queued` counts every queued run, including those whose latency is missing from `pairs`
    pub fn from_pairs(queued: usize, pairs: &[(f64, f64)]) -> Self {
        if queued < 2 {
            return Correlation::InsufficientRuns { queued };
        }
        if pairs.len() < 2 {
            return Correlation::MissingLatency {
                with_latency: pairs.len(),
            };
        }
        stats::pearson(pairs).map_or(Correlation::Undefined, Correlation::Value)
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Correlation::Value(r) => Some(*r),
            _ => None,
        }
    }

    /// Strong above 0.7, moderate above 0.4, weak otherwise (negative r included)
    pub fn strength(&self) -> Option<CorrelationStrength> {
        self.value().map(|r| {
            if r > 0.7 {
                CorrelationStrength::Strong
            } else if r > 0.4 {
                CorrelationStrength::Moderate
            } else {
                CorrelationStrength::Weak
            }
        })
    }
}

/// Report section 4, over LLM-invoked runs only.
///
/// Runs with no recorded queue wait fall in neither group.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueBehavior {
    pub queued_runs: usize,
    pub unqueued_runs: usize,
    /// Mean wait over queued runs
    pub mean_queue_wait_ms: Option<f64>,
    pub mean_latency_queued_ms: Option<f64>,
    pub mean_latency_unqueued_ms: Option<f64>,
    pub correlation: Correlation,
}

impl QueueBehavior {
    /// `None` when no run invoked the model
    pub fn compute(table: &RunTable) -> Option<Self> {
        let llm_runs: Vec<&RunRecord> = table.llm_invoked().collect();
        if llm_runs.is_empty() {
            return None;
        }

        let queued: Vec<&RunRecord> = llm_runs.iter().copied().filter(|r| r.queue_wait_ms.is_some_and(|q| q > 0.0)).collect();
        let unqueued: Vec<&RunRecord> = llm_runs.iter().copied().filter(|r| r.queue_wait_ms == Some(0.0)).collect();

        let pairs: Vec<(f64, f64)> = queued.iter().filter_map(|r| Some((r.queue_wait_ms?, r.latency_ms?))).collect();

        Some(Self {
            queued_runs: queued.len(),
            unqueued_runs: unqueued.len(),
            mean_queue_wait_ms: stats::mean(&present(queued.iter().copied(), |r| r.queue_wait_ms)),
            mean_latency_queued_ms: stats::mean(&present(queued.iter().copied(), |r| r.latency_ms)),
            mean_latency_unqueued_ms: stats::mean(&present(unqueued.iter().copied(), |r| r.latency_ms)),
            correlation: Correlation::from_pairs(queued.len(), &pairs),
        })
    }
}

//! Aggregations behind each numbered report section.
//!
//! Each submodule exposes one pure `compute` over the loaded [`RunTable`]. Empty subsets never
//! fail: statistics come back as `Option`, and sections whose whole input is empty come back as
//! `None` (or an explicitly empty value) for the reporter to print as insufficient data.

pub mod cache;
pub mod failures;
pub mod overview;
pub mod queue;
pub mod scaling;
pub mod split;
pub mod summary;
pub mod tokens;

use tracing::{debug, instrument};

use crate::records::{RunRecord, RunTable};

pub use cache::{CacheImpact, CacheRate, LatencyDistribution};
pub use failures::{ErrorFrequency, FailureAnalysis, FailureCategory, QueueWaitComparison};
pub use overview::{BatchShare, Overview};
pub use queue::{Correlation, CorrelationStrength, QueueBehavior};
pub use scaling::{ScalingRow, ScalingTable};
pub use split::{CategoryBreakdown, LlmPerformance, SplitAnalysis};
pub use summary::{FinalSummary, LatencyComparison, QUEUE_DELAY_MS, QueueSummary, QueueingImpact, ScalingDelta};
pub use tokens::TokenUsage;

/// All section results for one table, computed in report order.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub overview: Overview,
    pub split: SplitAnalysis,
    pub cache: CacheImpact,
    /// `None` when no run invoked the model
    pub queue: Option<QueueBehavior>,
    pub scaling: ScalingTable,
    /// `None` when no run invoked the model
    pub tokens: Option<TokenUsage>,
    pub failures: FailureAnalysis,
    pub summary: FinalSummary,
}

impl Analysis {
    #[instrument(skip_all, fields(records = table.len()))]
    pub fn compute(table: &RunTable) -> Self {
        let overview = Overview::compute(table);
        debug!(total = overview.total_runs, failed = overview.failed_runs, "Computed overview");

        let split = SplitAnalysis::compute(table);
        let cache = CacheImpact::compute(table);

        let queue = QueueBehavior::compute(table);
        debug!(queued = queue.as_ref().map(|q| q.queued_runs), "Computed queue behavior");

        let scaling = ScalingTable::compute(table);
        debug!(batch_sizes = scaling.len(), "Computed scaling table");

        let tokens = TokenUsage::compute(table);
        let failures = FailureAnalysis::compute(table);
        debug!(
            rate_limit = failures.rate_limit,
            payload = failures.payload_too_large,
            other = failures.other,
            "Computed failure breakdown"
        );

        let summary = FinalSummary::compute(&overview, &split, queue.as_ref(), &scaling, &failures);

        Self {
            overview,
            split,
            cache,
            queue,
            scaling,
            tokens,
            failures,
            summary,
        }
    }
}

/// Collect the present values of one optional column, skipping missing entries
pub(crate) fn present<'a>(rows: impl IntoIterator<Item = &'a RunRecord>, column: impl Fn(&RunRecord) -> Option<f64>) -> Vec<f64> {
    rows.into_iter().filter_map(column).collect()
}

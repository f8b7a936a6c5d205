use crate::analysis::present;
use crate::records::{EmailCategory, RunRecord, RunTable};
use crate::stats;

/// Cache-served runs out of a group of runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheRate {
    pub cache_served: usize,
    pub total: usize,
}

impl CacheRate {
    pub fn of<'a>(rows: impl IntoIterator<Item = &'a RunRecord>) -> Self {
        rows.into_iter().fold(Self::default(), |acc, record| Self {
            cache_served: acc.cache_served + usize::from(record.is_cache_served()),
            total: acc.total + 1,
        })
    }

    /// `None` for an empty group
    pub fn pct(&self) -> Option<f64> {
        stats::percentage(self.cache_served, self.total)
    }
}

/// Latency spread of LLM-invoked runs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyDistribution {
    pub mean_ms: Option<f64>,
    pub median_ms: Option<f64>,
    /// Sample standard deviation; needs two runs
    pub std_ms: Option<f64>,
}

/// Report section 3
#[derive(Debug, Clone, PartialEq)]
pub struct CacheImpact {
    pub cache_served: usize,
    pub llm_invoked: usize,
    pub single: CacheRate,
    pub multi: CacheRate,
    /// `None` when nothing invoked the model
    pub llm_latency: Option<LatencyDistribution>,
}

impl CacheImpact {
    pub fn compute(table: &RunTable) -> Self {
        let llm_invoked = table.llm_invoked().count();
        let llm_latency = (llm_invoked > 0).then(|| {
            let latencies = present(table.llm_invoked(), |r| r.latency_ms);
            LatencyDistribution {
                mean_ms: stats::mean(&latencies),
                median_ms: stats::median(&latencies),
                std_ms: stats::std_dev(&latencies),
            }
        });

        Self {
            cache_served: table.cache_served().count(),
            llm_invoked,
            single: CacheRate::of(table.in_category(EmailCategory::Single)),
            multi: CacheRate::of(table.in_category(EmailCategory::Multi)),
            llm_latency,
        }
    }

    pub fn rate(&self, category: EmailCategory) -> CacheRate {
        match category {
            EmailCategory::Single => self.single,
            EmailCategory::Multi => self.multi,
        }
    }
}

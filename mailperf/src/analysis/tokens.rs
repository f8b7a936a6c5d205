use crate::analysis::present;
use crate::records::RunTable;
use crate::stats;

/// Report section 6: `tokensPerEmail` over LLM-invoked runs
#[derive(Debug, Clone, PartialEq)]
pub struct TokenUsage {
    pub runs: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
}

impl TokenUsage {
    /// `None` when no run used tokens
    pub fn compute(table: &RunTable) -> Option<Self> {
        let runs = table.llm_invoked().count();
        if runs == 0 {
            return None;
        }

        let per_email = present(table.llm_invoked(), |r| r.tokens_per_email);
        Some(Self {
            runs,
            mean: stats::mean(&per_email),
            median: stats::median(&per_email),
            min: stats::min(&per_email),
            max: stats::max(&per_email),
            p25: stats::quantile(&per_email, 0.25),
            p50: stats::quantile(&per_email, 0.50),
            p75: stats::quantile(&per_email, 0.75),
        })
    }
}

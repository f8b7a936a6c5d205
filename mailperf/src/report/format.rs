//! Fixed-precision value formatting. Undefined values render as `N/A`.

use crate::stats;

pub(crate) const NOT_AVAILABLE: &str = "N/A";

/// Milliseconds, two decimals
pub(crate) fn ms(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| format!("{v:.2} ms"))
}

/// Plain value, two decimals
pub(crate) fn fixed2(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| format!("{v:.2}"))
}

/// Emails per second, four decimals
pub(crate) fn throughput(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| format!("{v:.4} emails/sec"))
}

/// Percentage, one decimal
pub(crate) fn pct(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| format!("{v:.1}%"))
}

/// `part/whole (pct)`
pub(crate) fn ratio(part: usize, whole: usize) -> String {
    format!("{part}/{whole} ({})", pct(stats::percentage(part, whole)))
}

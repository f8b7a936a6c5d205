//! One writer per numbered report section.
//!
//! Layout is line-oriented and deterministic: the same analysis always produces the same bytes.

use std::io::{self, Write};

use super::format::{fixed2, ms, pct, ratio, throughput};
use crate::analysis::{
    CacheImpact, CategoryBreakdown, Correlation, CorrelationStrength, FailureAnalysis, FinalSummary, LatencyComparison, Overview,
    QUEUE_DELAY_MS, QueueBehavior, ScalingTable, SplitAnalysis, TokenUsage,
};
use crate::charts::ChartOutcome;
use crate::records::EmailCategory;

const WIDTH: usize = 80;

pub(crate) fn banner<W: Write>(out: &mut W, title: &str) -> io::Result<()> {
    writeln!(out, "{}", "=".repeat(WIDTH))?;
    writeln!(out, "{title}")?;
    writeln!(out, "{}", "=".repeat(WIDTH))
}

fn heading<W: Write>(out: &mut W, title: &str) -> io::Result<()> {
    writeln!(out, "{title}")?;
    writeln!(out, "{}", "-".repeat(WIDTH))
}

fn upper_name(category: EmailCategory) -> &'static str {
    match category {
        EmailCategory::Single => "SINGLE-EMAIL",
        EmailCategory::Multi => "MULTI-EMAIL",
    }
}

fn title_name(category: EmailCategory) -> &'static str {
    match category {
        EmailCategory::Single => "Single-email",
        EmailCategory::Multi => "Multi-email",
    }
}

pub(crate) fn overview<W: Write>(out: &mut W, overview: &Overview) -> io::Result<()> {
    heading(out, "1. DATASET OVERVIEW")?;

    let total = overview.total_runs;
    writeln!(out, "Total number of runs: {total}")?;
    writeln!(out, "Successful runs: {} ({})", overview.successful_runs, pct(overview.share_pct(overview.successful_runs)))?;
    writeln!(out, "Failed runs: {} ({})", overview.failed_runs, pct(overview.share_pct(overview.failed_runs)))?;
    writeln!(out)?;

    writeln!(out, "Distribution of batchSize values:")?;
    if overview.batch_distribution.is_empty() {
        writeln!(out, "  (no runs)")?;
    }
    for share in &overview.batch_distribution {
        writeln!(out, "  batchSize={}: {} runs ({})", share.batch_size, share.runs, pct(overview.share_pct(share.runs)))?;
    }
    writeln!(out)?;

    writeln!(
        out,
        "Cache-served runs (tokensTotal == 0): {} ({})",
        overview.cache_served,
        pct(overview.share_pct(overview.cache_served))
    )?;
    writeln!(
        out,
        "LLM-invoked runs (tokensTotal > 0): {} ({})",
        overview.llm_invoked,
        pct(overview.share_pct(overview.llm_invoked))
    )?;
    writeln!(out)
}

pub(crate) fn split<W: Write>(out: &mut W, split: &SplitAnalysis) -> io::Result<()> {
    heading(out, "2. SINGLE vs MULTI-EMAIL ANALYSIS")?;

    writeln!(out, "Single-email runs (batchSize == 1): {}", split.single.total_runs)?;
    writeln!(out, "Multi-email runs (batchSize != 1): {}", split.multi.total_runs)?;
    writeln!(out)?;

    for breakdown in split.categories() {
        category(out, breakdown)?;
    }
    Ok(())
}

fn category<W: Write>(out: &mut W, breakdown: &CategoryBreakdown) -> io::Result<()> {
    writeln!(out, "{} INTERACTIONS:", upper_name(breakdown.category))?;

    match &breakdown.llm {
        Some(llm) => {
            writeln!(out, "  LLM-invoked runs: {}", llm.runs)?;
            writeln!(out, "  Average latency: {}", ms(llm.mean_latency_ms))?;
            writeln!(out, "  Median latency: {}", ms(llm.median_latency_ms))?;
            writeln!(out, "  Min latency: {}", ms(llm.min_latency_ms))?;
            writeln!(out, "  Max latency: {}", ms(llm.max_latency_ms))?;
            writeln!(out, "  Average throughput: {}", throughput(llm.mean_throughput))?;
            writeln!(out, "  Failure rate: {}", ratio(llm.failures, llm.runs))?;
        }
        None => {
            writeln!(out, "  LLM-invoked runs: 0 (insufficient data: no performance metrics available)")?;
        }
    }

    writeln!(out, "  Cache-served rate: {}", ratio(breakdown.cache.cache_served, breakdown.cache.total))?;
    writeln!(out)
}

pub(crate) fn cache<W: Write>(out: &mut W, cache: &CacheImpact) -> io::Result<()> {
    heading(out, "3. CACHE IMPACT ANALYSIS")?;

    writeln!(out, "Overall cache statistics:")?;
    writeln!(out, "  Cache-served: {} runs", cache.cache_served)?;
    writeln!(out, "  LLM-invoked: {} runs", cache.llm_invoked)?;
    writeln!(out)?;

    for category in EmailCategory::ALL {
        let rate = cache.rate(category);
        writeln!(
            out,
            "{} cache-served percentage: {}",
            title_name(category),
            ratio(rate.cache_served, rate.total)
        )?;
    }
    writeln!(out)?;

    match &cache.llm_latency {
        Some(latency) => {
            writeln!(out, "Latency distribution for LLM-invoked runs:")?;
            writeln!(out, "  Mean: {}", ms(latency.mean_ms))?;
            writeln!(out, "  Median: {}", ms(latency.median_ms))?;
            writeln!(out, "  Std: {}", ms(latency.std_ms))?;
        }
        None => writeln!(out, "Latency distribution unavailable: no LLM-invoked runs")?,
    }
    writeln!(out)
}

pub(crate) fn queue<W: Write>(out: &mut W, queue: Option<&QueueBehavior>) -> io::Result<()> {
    heading(out, "4. QUEUE BEHAVIOR ANALYSIS")?;

    let Some(queue) = queue else {
        writeln!(out, "No LLM-invoked runs available for queue analysis")?;
        return writeln!(out);
    };

    writeln!(out, "Runs with queue wait (queueWaitMs > 0): {}", queue.queued_runs)?;
    writeln!(out, "Runs without queue wait (queueWaitMs == 0): {}", queue.unqueued_runs)?;
    writeln!(out)?;

    if queue.queued_runs > 0 {
        writeln!(out, "Average queueWaitMs (when > 0): {}", ms(queue.mean_queue_wait_ms))?;
        writeln!(out, "Average latency when queueWaitMs > 0: {}", ms(queue.mean_latency_queued_ms))?;
    }
    if queue.unqueued_runs > 0 {
        writeln!(out, "Average latency when queueWaitMs == 0: {}", ms(queue.mean_latency_unqueued_ms))?;
    }
    writeln!(out)?;

    match queue.correlation {
        Correlation::Value(r) => {
            writeln!(out, "Correlation coefficient (queueWaitMs vs latencyMs, for queueWaitMs > 0): {r:.4}")?;
        }
        Correlation::InsufficientRuns { .. } => {
            writeln!(out, "Correlation cannot be computed: fewer than 2 runs with queueWaitMs > 0")?;
        }
        Correlation::MissingLatency { with_latency } => {
            writeln!(
                out,
                "Correlation cannot be computed: only {with_latency} of {} queued runs have latencyMs",
                queue.queued_runs
            )?;
        }
        Correlation::Undefined => {
            writeln!(out, "Correlation cannot be computed: queueWaitMs or latencyMs is constant across queued runs")?;
        }
    }
    writeln!(out)
}

pub(crate) fn scaling<W: Write>(out: &mut W, scaling: &ScalingTable) -> io::Result<()> {
    heading(out, "5. MULTI-EMAIL SCALING BEHAVIOR")?;

    if scaling.is_empty() {
        writeln!(out, "No LLM-invoked runs available for scaling analysis")?;
        return writeln!(out);
    }

    writeln!(out, "Performance by batchSize (LLM-invoked runs only):")?;
    writeln!(out)?;

    for row in scaling.rows() {
        writeln!(out, "batchSize = {}:", row.batch_size)?;
        writeln!(out, "  Number of LLM-invoked runs: {}", row.llm_runs)?;
        writeln!(out, "  Average latency: {}", ms(row.mean_latency_ms))?;
        writeln!(out, "  Average throughput: {}", throughput(row.mean_throughput))?;
        writeln!(out, "  Failure rate: {}", ratio(row.failures, row.llm_runs))?;
        writeln!(out, "  Cache-served (all runs): {}", ratio(row.cache.cache_served, row.cache.total))?;
        writeln!(out)?;
    }
    Ok(())
}

pub(crate) fn tokens<W: Write>(out: &mut W, tokens: Option<&TokenUsage>) -> io::Result<()> {
    heading(out, "6. TOKEN USAGE ANALYSIS")?;

    let Some(tokens) = tokens else {
        writeln!(out, "No runs with token usage available")?;
        return writeln!(out);
    };

    writeln!(out, "Runs with token usage: {}", tokens.runs)?;
    writeln!(out, "Average tokensPerEmail: {}", fixed2(tokens.mean))?;
    writeln!(out, "Median tokensPerEmail: {}", fixed2(tokens.median))?;
    writeln!(out, "Max tokensPerEmail: {}", fixed2(tokens.max))?;
    writeln!(out, "Min tokensPerEmail: {}", fixed2(tokens.min))?;
    writeln!(out)?;

    writeln!(out, "Token usage distribution quartiles:")?;
    writeln!(out, "  25th percentile: {}", fixed2(tokens.p25))?;
    writeln!(out, "  50th percentile: {}", fixed2(tokens.p50))?;
    writeln!(out, "  75th percentile: {}", fixed2(tokens.p75))?;
    writeln!(out)
}

pub(crate) fn failures<W: Write>(out: &mut W, failures: &FailureAnalysis) -> io::Result<()> {
    heading(out, "7. ERROR & FAILURE ANALYSIS")?;

    writeln!(out, "Total failed runs: {}", failures.total_failed)?;
    writeln!(out)?;

    if failures.total_failed == 0 {
        writeln!(out, "No failed runs in dataset")?;
        return writeln!(out);
    }

    writeln!(out, "Error frequency:")?;
    if failures.error_frequencies.is_empty() {
        writeln!(out, "  (no error messages recorded)")?;
    }
    for frequency in &failures.error_frequencies {
        writeln!(out, "  '{}': {} occurrences", frequency.message, frequency.occurrences)?;
    }
    writeln!(out)?;

    writeln!(out, "Error categorization:")?;
    writeln!(out, "  Rate-limit errors (HTTP 429): {}", failures.rate_limit)?;
    writeln!(out, "  Payload-size errors (HTTP 413): {}", failures.payload_too_large)?;
    writeln!(out, "  Other failures: {}", failures.other)?;
    writeln!(out)?;

    writeln!(out, "Failure correlation with batchSize:")?;
    writeln!(out, "  Average batchSize for failures: {}", fixed2(failures.mean_batch_size_failed))?;
    writeln!(out, "  Average batchSize for successes: {}", fixed2(failures.mean_batch_size_succeeded))?;
    writeln!(out)?;

    if let Some(queue_wait) = &failures.queue_wait {
        writeln!(out, "Failure correlation with queueWaitMs:")?;
        writeln!(out, "  Average queueWaitMs for failures: {}", ms(Some(queue_wait.failed_mean_ms)))?;
        if queue_wait.succeeded_runs > 0 {
            writeln!(out, "  Average queueWaitMs for successes: {}", ms(queue_wait.succeeded_mean_ms))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub(crate) fn visualizations<W: Write>(out: &mut W, charts: &ChartOutcome) -> io::Result<()> {
    heading(out, "8. GENERATING VISUALIZATIONS")?;

    match charts {
        ChartOutcome::Saved { path, blank } => {
            writeln!(out, "Visualizations saved to '{}'", path.display())?;
            for panel in blank {
                writeln!(out, "  Panel left blank: {} ({})", panel.title, panel.reason)?;
            }
        }
        ChartOutcome::Disabled => writeln!(out, "Chart rendering disabled; no image written")?,
    }
    writeln!(out)
}

pub(crate) fn summary<W: Write>(out: &mut W, summary: &FinalSummary) -> io::Result<()> {
    banner(out, "FINAL SUMMARY")?;
    writeln!(out)?;

    writeln!(out, "SINGLE vs MULTI-EMAIL LATENCY COMPARISON:")?;
    match summary.latency {
        LatencyComparison::Both {
            single_ms,
            multi_ms,
            difference_ms,
            difference_pct,
        } => {
            writeln!(out, "  Single-email average latency: {}", ms(Some(single_ms)))?;
            writeln!(out, "  Multi-email average latency: {}", ms(Some(multi_ms)))?;
            match difference_pct {
                Some(p) => writeln!(out, "  Difference: {difference_ms:.2} ms ({p:.1}% higher for multi-email)")?,
                None => writeln!(out, "  Difference: {difference_ms:.2} ms (N/A relative to a zero single-email mean)")?,
            }
        }
        LatencyComparison::SingleOnly { single_ms } => {
            writeln!(out, "  Single-email average latency: {}", ms(Some(single_ms)))?;
            writeln!(out, "  Multi-email: insufficient LLM-invoked data")?;
        }
        LatencyComparison::MultiOnly { multi_ms } => {
            writeln!(out, "  Single-email: insufficient LLM-invoked data")?;
            writeln!(out, "  Multi-email average latency: {}", ms(Some(multi_ms)))?;
        }
        LatencyComparison::Insufficient => writeln!(out, "  Insufficient LLM-invoked data for comparison")?,
    }
    writeln!(out)?;

    writeln!(out, "CACHE EFFECTIVENESS:")?;
    writeln!(out, "  Single-email cache-served rate: {}", pct(summary.single_cache.pct()))?;
    writeln!(out, "  Multi-email cache-served rate: {}", pct(summary.multi_cache.pct()))?;
    writeln!(out, "  Overall cache-served rate: {}", pct(summary.overall_cache.pct()))?;
    writeln!(out, "  Caching reduces the number of LLM invocations by serving repeated requests locally")?;
    writeln!(out)?;

    writeln!(out, "QUEUEING IMPACT:")?;
    match &summary.queue {
        Some(queue) => {
            if let Some(impact) = &queue.impact {
                writeln!(out, "  Average latency with queue wait: {}", ms(impact.latency_queued_ms))?;
                writeln!(out, "  Average latency without queue wait: {}", ms(impact.latency_unqueued_ms))?;
                writeln!(out, "  Queue wait adds: {} on average", ms(impact.mean_queue_wait_ms))?;

                match (impact.correlation, impact.correlation.strength()) {
                    (Correlation::Value(r), Some(strength)) => {
                        let label = match strength {
                            CorrelationStrength::Strong => "Strong positive correlation",
                            CorrelationStrength::Moderate => "Moderate positive correlation",
                            CorrelationStrength::Weak => "Weak correlation",
                        };
                        writeln!(out, "  {label} (r={r:.3}) between queue wait and total latency")?;
                        writeln!(out, "  Note: correlation indicates association, not causation")?;
                    }
                    (Correlation::Undefined, _) => {
                        writeln!(out, "  Correlation cannot be computed: constant queue wait or latency")?;
                    }
                    _ => {}
                }
            }

            if summary.total_failures > 0 && queue.failures_with_queue_wait > 0 {
                writeln!(
                    out,
                    "  {}/{} failures occurred with queue wait",
                    queue.failures_with_queue_wait, summary.total_failures
                )?;
            }
        }
        None => writeln!(out, "  No LLM-invoked runs available")?,
    }
    writeln!(out)?;

    writeln!(out, "MULTI-EMAIL SCALING BEHAVIOR:")?;
    match &summary.scaling {
        Some(delta) => {
            writeln!(out, "  As batchSize increases from {} to {}:", delta.from_batch_size, delta.to_batch_size)?;
            writeln!(out, "    Average latency changes by {}", ms(delta.latency_change_ms))?;
            writeln!(out, "  This reflects sequential processing of multiple emails in a single user interaction")?;
        }
        None => writeln!(out, "  Insufficient data across multiple batchSize values")?,
    }
    writeln!(out)?;

    writeln!(out, "SYSTEM LIMITATIONS:")?;
    writeln!(out, "  • Sequential execution: All emails are processed one at a time via a queue")?;
    writeln!(out, "  • No parallel processing: batchSize represents user interaction workload, not execution batching")?;
    writeln!(out, "  • Rate limiting: Fixed delay between LLM calls (QUEUE_DELAY_MS = {QUEUE_DELAY_MS}ms)")?;
    writeln!(
        out,
        "  • Failure modes observed: {} failures across {} runs",
        summary.total_failures, summary.total_runs
    )?;
    if summary.rate_limit_errors > 0 {
        writeln!(out, "    - Rate limit errors (429): {} occurrences", summary.rate_limit_errors)?;
    }
    if summary.payload_errors > 0 {
        writeln!(out, "    - Payload size errors (413): {} occurrences", summary.payload_errors)?;
    }
    writeln!(out)
}

//! Text report rendering.
//!
//! Every section writes into a caller-supplied [`Write`] sink, so the same layout serves a file, an
//! in-memory buffer, or a test assertion.

mod format;
mod sections;

use std::io::{self, Write};

use crate::analysis::Analysis;
use crate::charts::ChartOutcome;

pub const TITLE: &str = "EMAIL SUMMARIZATION SYSTEM PERFORMANCE ANALYSIS";

/// Write the full report, title banner through closing banner.
pub fn write_report<W: Write>(out: &mut W, analysis: &Analysis, charts: &ChartOutcome) -> io::Result<()> {
    sections::banner(out, TITLE)?;
    writeln!(out)?;

    sections::overview(out, &analysis.overview)?;
    sections::split(out, &analysis.split)?;
    sections::cache(out, &analysis.cache)?;
    sections::queue(out, analysis.queue.as_ref())?;
    sections::scaling(out, &analysis.scaling)?;
    sections::tokens(out, analysis.tokens.as_ref())?;
    sections::failures(out, &analysis.failures)?;
    sections::visualizations(out, charts)?;
    sections::summary(out, &analysis.summary)?;

    sections::banner(out, "ANALYSIS COMPLETE")
}

/// Render the report into memory
pub fn render_report(analysis: &Analysis, charts: &ChartOutcome) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_report(&mut buffer, analysis, charts)?;
    Ok(buffer)
}

//! # mailperf: Performance Report for Email Summarization Runs
//!
//! `mailperf` reads the run records an email-summarization browser extension collects (one record
//! per summarization attempt) and turns them into two artifacts: a plain-text performance report
//! with nine numbered sections, and a single PNG holding a 3×3 panel of charts. It is an offline,
//! one-shot tool: every invocation reads one JSON file, computes everything in memory, and fully
//! replaces both outputs.
//!
//! ## Overview
//!
//! Each run record says whether the attempt succeeded, how many emails the user selected
//! (`batchSize`), how many tokens the model consumed, and how long the attempt took end to end and
//! in the extension's request queue. A `tokensTotal` of zero marks a response served from the
//! extension's local cache; anything above zero means the model was actually invoked. Most
//! sections of the report only look at model-invoked runs, since cached responses have no
//! comparable latency.
//!
//! ### Pipeline
//!
//! The flow is strictly linear. The [`records`] layer parses and validates the input into an
//! immutable [`RunTable`]; a malformed input aborts the run before anything is written. The
//! [`analysis`] layer computes one structured result per report section from that table. Every
//! aggregation guards its own empty subsets, so a dataset with no multi-email runs, no queued runs
//! or no failures produces explicit "insufficient data" results instead of errors or `NaN`s.
//!
//! The [`charts`] layer turns the same table (plus the per-batch-size scaling table) into a
//! [`ChartPanel`](charts::ChartPanel): nine chart specifications that carry their data but know
//! nothing about drawing. A [`ChartRenderer`](charts::ChartRenderer) rasterizes the panel; the
//! bundled [`PlottersRenderer`](charts::PlottersRenderer) uses `plotters`. Finally the [`report`]
//! layer formats every section into an injected writer.
//!
//! Both outputs go through [`output`], which writes to a temporary sibling file and renames it
//! over the destination, so a failed run leaves the previous outputs as they were.
//!
//! ## Configuration
//!
//! See [`config`]. With no config file and no environment overrides the tool reads
//! `metric analysis/metrics.json` and writes `metric analysis/analysis_report.txt` and
//! `metric analysis/performance_analysis.png` (16×12 inches at 300 DPI).

pub mod analysis;
pub mod charts;
pub mod config;
pub mod errors;
pub mod output;
pub mod records;
pub mod report;
mod stats;
pub mod telemetry;

use std::path::PathBuf;

use tracing::{info, instrument, warn};

use crate::analysis::Analysis;
use crate::charts::{ChartOutcome, ChartRenderer, PlottersRenderer, build_panel};

pub use config::Config;
pub use errors::{Error, Result};
pub use records::{RunRecord, RunTable};

/// What one pipeline run produced
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub records: usize,
    pub failed_runs: usize,
    pub report_path: PathBuf,
    pub charts: ChartOutcome,
}

/// Run the full pipeline with the bundled `plotters` renderer.
pub fn run(config: &Config) -> Result<RunSummary> {
    run_with(config, &PlottersRenderer::new(&config.charts))
}

/// Run the full pipeline, drawing the chart panel with `renderer`.
///
/// The chart image is produced before the report so that section 8 can say where it went. Either
/// output failing aborts the run without touching the report file.
#[instrument(skip_all, fields(input = %config.input.display()), err)]
pub fn run_with(config: &Config, renderer: &impl ChartRenderer) -> Result<RunSummary> {
    let table = RunTable::load(&config.input)?;
    let analysis = Analysis::compute(&table);

    let charts = if config.charts.enabled {
        let panel = build_panel(&table, &analysis.scaling, config.charts.histogram_bins);
        let path = &config.charts.output_path;
        let blank = output::replace_with(path, |temp| renderer.render(&panel, temp))?;
        for panel in &blank {
            warn!(title = %panel.title, reason = %panel.reason, "Chart panel left blank");
        }
        info!(blank = blank.len(), "Visualizations saved to {}", path.display());
        ChartOutcome::Saved {
            path: path.clone(),
            blank,
        }
    } else {
        info!("Chart rendering disabled");
        ChartOutcome::Disabled
    };

    let report = report::render_report(&analysis, &charts).map_err(|e| Error::io(&config.report_path, e))?;
    output::write_file(&config.report_path, &report)?;
    info!(bytes = report.len(), "Report written to {}", config.report_path.display());

    Ok(RunSummary {
        records: table.len(),
        failed_runs: analysis.overview.failed_runs,
        report_path: config.report_path.clone(),
        charts,
    })
}

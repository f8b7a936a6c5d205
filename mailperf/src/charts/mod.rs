//! Chart panel: pure chart specifications plus a swappable renderer.

pub mod render;
pub mod spec;

use std::path::PathBuf;

pub use render::{ChartRenderer, PlottersRenderer};
pub use spec::{Axis, BoxGroup, ChartKind, ChartPanel, ChartSlot, ChartSpec, LabeledValue, Scale, SeriesColor, build_panel};

/// A panel slot that was left empty, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlankPanel {
    pub title: String,
    pub reason: String,
}

/// What happened to the chart image, as reported in section 8
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartOutcome {
    Saved { path: PathBuf, blank: Vec<BlankPanel> },
    Disabled,
}

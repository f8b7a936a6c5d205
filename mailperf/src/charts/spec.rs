//! Backend-independent description of the 3×3 chart panel.
//!
//! [`build_panel`] is a pure function of the run table and the scaling table. Renderers only
//! decide how a [`ChartSpec`] looks; which charts exist, what data they carry and which slots stay
//! blank is settled here.

use crate::analysis::{CacheRate, ScalingTable, present};
use crate::charts::BlankPanel;
use crate::records::{EmailCategory, RunRecord, RunTable};

pub const ROWS: usize = 3;
pub const COLS: usize = 3;

const LATENCY: &str = "Latency (ms)";
const BATCH_SIZE: &str = "User-selected Email Count (batchSize)";
const EMAIL_CATEGORY: &str = "Email Category";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scale {
    #[default]
    Linear,
    Log,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Axis {
    pub label: String,
    pub scale: Scale,
}

impl Axis {
    pub fn linear(label: &str) -> Self {
        Self {
            label: label.to_string(),
            scale: Scale::Linear,
        }
    }

    pub fn log(label: &str) -> Self {
        Self {
            label: label.to_string(),
            scale: Scale::Log,
        }
    }
}

/// Named series colors; renderers pick the actual shade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesColor {
    Blue,
    Orange,
    Green,
    Red,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledValue {
    pub label: String,
    pub value: f64,
    pub color: SeriesColor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxGroup {
    pub label: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartKind {
    /// Bin edges are spaced evenly in the x axis' own scale
    Histogram { values: Vec<f64>, bins: usize },
    Scatter { points: Vec<(f64, f64)>, color: SeriesColor },
    BoxPlot { groups: Vec<BoxGroup> },
    /// Points in ascending x order, drawn with markers
    Line { points: Vec<(f64, f64)>, color: SeriesColor },
    Bar { bars: Vec<LabeledValue> },
    /// Slice labels get a percentage annotation; axes are unused
    Pie { slices: Vec<LabeledValue> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub x: Axis,
    pub y: Axis,
    pub kind: ChartKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartSlot {
    Chart(ChartSpec),
    Blank(BlankPanel),
}

impl ChartSlot {
    pub fn title(&self) -> &str {
        match self {
            ChartSlot::Chart(spec) => &spec.title,
            ChartSlot::Blank(blank) => &blank.title,
        }
    }

    fn blank(title: &str, reason: &str) -> Self {
        ChartSlot::Blank(BlankPanel {
            title: title.to_string(),
            reason: reason.to_string(),
        })
    }
}

/// Nine slots in row-major order
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPanel {
    slots: Vec<ChartSlot>,
}

impl ChartPanel {
    pub fn slots(&self) -> &[ChartSlot] {
        &self.slots
    }

    /// Slots left blank when the panel was built
    pub fn blanks(&self) -> impl Iterator<Item = &BlankPanel> + '_ {
        self.slots.iter().filter_map(|slot| match slot {
            ChartSlot::Blank(blank) => Some(blank),
            ChartSlot::Chart(_) => None,
        })
    }
}

pub fn build_panel(table: &RunTable, scaling: &ScalingTable, bins: usize) -> ChartPanel {
    let llm: Vec<&RunRecord> = table.llm_invoked().collect();

    let slots = vec![
        latency_histogram(&llm, bins),
        scatter(
            &llm,
            "User-selected Email Count vs Latency (LLM-invoked)",
            BATCH_SIZE,
            |r| Some(r.batch_size as f64),
            SeriesColor::Blue,
        ),
        scatter(
            &llm,
            "Queue Wait vs Latency (LLM-invoked)",
            "Queue Wait Time (ms)",
            |r| r.queue_wait_ms,
            SeriesColor::Orange,
        ),
        latency_by_category(&llm),
        scaling_line(
            "Average Latency by User-selected Email Count (LLM-invoked)",
            Axis::log("Average Latency (ms)"),
            scaling.latency_series(),
            SeriesColor::Blue,
        ),
        scaling_line(
            "Average Throughput by User-selected Email Count (LLM-invoked)",
            Axis::linear("Average Throughput (emails/sec)"),
            scaling.throughput_series(),
            SeriesColor::Green,
        ),
        scatter(&llm, "Token Usage vs Latency", "Tokens Per Email", |r| r.tokens_per_email, SeriesColor::Red),
        cache_rate_bars(table),
        outcome_pie(table),
    ];
    debug_assert_eq!(slots.len(), ROWS * COLS);

    ChartPanel { slots }
}

fn latency_histogram(llm: &[&RunRecord], bins: usize) -> ChartSlot {
    let title = "Latency Distribution (LLM-invoked runs only)";
    if llm.is_empty() {
        return ChartSlot::blank(title, "no LLM-invoked runs");
    }

    let values = present(llm.iter().copied(), |r| r.latency_ms);
    if values.is_empty() {
        return ChartSlot::blank(title, "no latency values recorded");
    }

    ChartSlot::Chart(ChartSpec {
        title: title.to_string(),
        x: Axis::log(LATENCY),
        y: Axis::linear("Frequency"),
        kind: ChartKind::Histogram { values, bins },
    })
}

fn scatter(
    llm: &[&RunRecord],
    title: &str,
    x_label: &str,
    x: impl Fn(&RunRecord) -> Option<f64>,
    color: SeriesColor,
) -> ChartSlot {
    if llm.is_empty() {
        return ChartSlot::blank(title, "no LLM-invoked runs");
    }

    let points: Vec<(f64, f64)> = llm.iter().filter_map(|r| Some((x(r)?, r.latency_ms?))).collect();
    if points.is_empty() {
        return ChartSlot::blank(title, "no runs with both values recorded");
    }

    ChartSlot::Chart(ChartSpec {
        title: title.to_string(),
        x: Axis::linear(x_label),
        y: Axis::log(LATENCY),
        kind: ChartKind::Scatter { points, color },
    })
}

fn latency_by_category(llm: &[&RunRecord]) -> ChartSlot {
    let title = "Latency: Single vs Multi-Email (LLM-invoked)";

    let groups: Vec<BoxGroup> = EmailCategory::ALL
        .into_iter()
        .map(|category| BoxGroup {
            label: category.label().to_string(),
            values: present(llm.iter().copied().filter(|r| r.category() == category), |r| r.latency_ms),
        })
        .filter(|group| !group.values.is_empty())
        .collect();
    if groups.is_empty() {
        return ChartSlot::blank(title, "no LLM-invoked runs");
    }

    ChartSlot::Chart(ChartSpec {
        title: title.to_string(),
        x: Axis::linear(EMAIL_CATEGORY),
        y: Axis::linear(LATENCY),
        kind: ChartKind::BoxPlot { groups },
    })
}

fn scaling_line(title: &str, y: Axis, points: Vec<(f64, f64)>, color: SeriesColor) -> ChartSlot {
    if points.is_empty() {
        return ChartSlot::blank(title, "no LLM-invoked runs");
    }

    ChartSlot::Chart(ChartSpec {
        title: title.to_string(),
        x: Axis::linear(BATCH_SIZE),
        y,
        kind: ChartKind::Line { points, color },
    })
}

fn cache_rate_bars(table: &RunTable) -> ChartSlot {
    let title = "Cache Effectiveness by Category";

    let bars: Vec<LabeledValue> = EmailCategory::ALL
        .into_iter()
        .zip([SeriesColor::Blue, SeriesColor::Orange])
        .filter_map(|(category, color)| {
            Some(LabeledValue {
                label: category.label().to_string(),
                value: CacheRate::of(table.in_category(category)).pct()?,
                color,
            })
        })
        .collect();
    if bars.is_empty() {
        return ChartSlot::blank(title, "no runs");
    }

    ChartSlot::Chart(ChartSpec {
        title: title.to_string(),
        x: Axis::linear(EMAIL_CATEGORY),
        y: Axis::linear("Cache-Served Rate (%)"),
        kind: ChartKind::Bar { bars },
    })
}

fn outcome_pie(table: &RunTable) -> ChartSlot {
    let title = "Overall Success Rate";

    let succeeded = table.succeeded().count();
    let failed = table.failed().count();

    // larger share first; successes lead on a tie
    let mut slices = vec![
        LabeledValue {
            label: "Success".to_string(),
            value: succeeded as f64,
            color: SeriesColor::Green,
        },
        LabeledValue {
            label: "Failure".to_string(),
            value: failed as f64,
            color: SeriesColor::Red,
        },
    ];
    slices.retain(|slice| slice.value > 0.0);
    slices.sort_by(|a, b| b.value.total_cmp(&a.value));
    if slices.is_empty() {
        return ChartSlot::blank(title, "no runs");
    }

    ChartSlot::Chart(ChartSpec {
        title: title.to_string(),
        x: Axis::default(),
        y: Axis::default(),
        kind: ChartKind::Pie { slices },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::tests::{cached_run, failed_run, llm_run};

    fn panel(table: &RunTable) -> ChartPanel {
        build_panel(table, &ScalingTable::compute(table), 20)
    }

    fn chart<'a>(panel: &'a ChartPanel, index: usize) -> &'a ChartSpec {
        match &panel.slots()[index] {
            ChartSlot::Chart(spec) => spec,
            ChartSlot::Blank(blank) => panic!("slot {index} blank: {}", blank.reason),
        }
    }

    #[test]
    fn test_panel_has_nine_slots_in_order() {
        let table = RunTable::new(vec![llm_run(1, 1000.0, 0.0), llm_run(3, 2400.0, 1800.0), cached_run(1)]);
        let panel = panel(&table);

        let titles: Vec<&str> = panel.slots().iter().map(ChartSlot::title).collect();
        assert_eq!(titles.len(), ROWS * COLS);
        assert_eq!(titles[0], "Latency Distribution (LLM-invoked runs only)");
        assert_eq!(titles[3], "Latency: Single vs Multi-Email (LLM-invoked)");
        assert_eq!(titles[8], "Overall Success Rate");
        assert_eq!(panel.blanks().count(), 0);
    }

    #[test]
    fn test_log_axes() {
        let table = RunTable::new(vec![llm_run(2, 1500.0, 1800.0)]);
        let panel = panel(&table);

        assert_eq!(chart(&panel, 0).x.scale, Scale::Log);
        for index in [1, 2, 4, 6] {
            assert_eq!(chart(&panel, index).y.scale, Scale::Log, "slot {index}");
        }
        assert_eq!(chart(&panel, 5).y.scale, Scale::Linear);
    }

    #[test]
    fn test_cache_only_table_blanks_llm_charts() {
        let table = RunTable::new(vec![cached_run(1), cached_run(2)]);
        let panel = panel(&table);

        let blank: Vec<&str> = panel.blanks().map(|b| b.title.as_str()).collect();
        assert_eq!(blank.len(), 7);
        assert!(!blank.contains(&"Cache Effectiveness by Category"));
        assert!(!blank.contains(&"Overall Success Rate"));
    }

    #[test]
    fn test_empty_table_blanks_everything() {
        let panel = panel(&RunTable::new(vec![]));
        assert_eq!(panel.blanks().count(), ROWS * COLS);
    }

    #[test]
    fn test_box_groups_skip_empty_category() {
        let table = RunTable::new(vec![llm_run(1, 1000.0, 0.0), llm_run(1, 1200.0, 0.0), cached_run(4)]);
        let panel = panel(&table);

        match &chart(&panel, 3).kind {
            ChartKind::BoxPlot { groups } => {
                assert_eq!(groups.len(), 1);
                assert_eq!(groups[0].label, "Single");
                assert_eq!(groups[0].values, vec![1000.0, 1200.0]);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_cache_bars_and_pie() {
        let table = RunTable::new(vec![
            cached_run(1),
            llm_run(1, 1000.0, 0.0),
            llm_run(2, 1000.0, 0.0),
            failed_run(2, Some("HTTP 413"), 0.0),
            failed_run(3, Some("HTTP 429"), 0.0),
            failed_run(3, None, 0.0),
        ]);
        let panel = panel(&table);

        match &chart(&panel, 7).kind {
            ChartKind::Bar { bars } => {
                let values: Vec<(&str, f64)> = bars.iter().map(|b| (b.label.as_str(), b.value)).collect();
                assert_eq!(values, vec![("Single", 50.0), ("Multi", 0.0)]);
            }
            other => panic!("unexpected kind: {other:?}"),
        }

        match &chart(&panel, 8).kind {
            ChartKind::Pie { slices } => {
                let values: Vec<(&str, f64)> = slices.iter().map(|s| (s.label.as_str(), s.value)).collect();
                assert_eq!(values, vec![("Success", 3.0), ("Failure", 3.0)]);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_scatter_skips_missing_values() {
        let mut missing = llm_run(2, 1000.0, 0.0);
        missing.tokens_per_email = None;
        let table = RunTable::new(vec![missing, llm_run(1, 800.0, 0.0)]);
        let panel = panel(&table);

        match &chart(&panel, 6).kind {
            ChartKind::Scatter { points, color } => {
                assert_eq!(points, &vec![(300.0, 800.0)]);
                assert_eq!(*color, SeriesColor::Red);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_scaling_lines_follow_table() {
        let table = RunTable::new(vec![llm_run(1, 1000.0, 0.0), llm_run(4, 4000.0, 0.0), llm_run(4, 6000.0, 0.0)]);
        let panel = panel(&table);

        match &chart(&panel, 4).kind {
            ChartKind::Line { points, .. } => assert_eq!(points, &vec![(1.0, 1000.0), (4.0, 5000.0)]),
            other => panic!("unexpected kind: {other:?}"),
        }
    }
}

//! Rasterizing a [`ChartPanel`] with `plotters`.
//!
//! Log axes are drawn as linear axes over `log10` of the data with tick labels mapped back, so
//! every chart shares one coordinate type. Values that have no place on a log axis are dropped
//! here, and a chart left with nothing to draw turns into a blank slot.

use std::ops::Range;
use std::path::Path;

use anyhow::Context;
use plotters::coord::Shift;
use plotters::coord::types::RangedCoordf64;
use plotters::element::Pie;
use plotters::prelude::*;
use tracing::{debug, instrument};

use crate::charts::BlankPanel;
use crate::charts::spec::{BoxGroup, COLS, ChartKind, ChartPanel, ChartSlot, ChartSpec, LabeledValue, ROWS, Scale, SeriesColor};
use crate::config::ChartConfig;
use crate::errors::{Error, Result};

const FONT: &str = "sans-serif";
const NOTHING_DRAWABLE: &str = "no values drawable on this axis scale";

/// Turns a chart panel into an image file.
pub trait ChartRenderer {
    /// Draw `panel` to `path` and return every slot that ended up blank.
    fn render(&self, panel: &ChartPanel, path: &Path) -> Result<Vec<BlankPanel>>;
}

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

enum Drawn {
    Chart,
    Blank(&'static str),
}

/// PNG renderer; sizes are given in inches and points and scaled by the configured DPI
#[derive(Debug, Clone)]
pub struct PlottersRenderer {
    size: (u32, u32),
    px_per_point: f64,
}

impl PlottersRenderer {
    pub fn new(config: &ChartConfig) -> Self {
        Self {
            size: config.pixel_size(),
            px_per_point: config.font_px(1.0),
        }
    }

    fn px(&self, points: f64) -> f64 {
        points * self.px_per_point
    }

    fn px_u32(&self, points: f64) -> u32 {
        self.px(points).round().max(1.0) as u32
    }

    fn draw_panel(&self, panel: &ChartPanel, path: &Path) -> anyhow::Result<Vec<BlankPanel>> {
        let root = BitMapBackend::new(path, self.size).into_drawing_area();
        root.fill(&WHITE)?;

        let areas = root.split_evenly((ROWS, COLS));
        let mut blank = Vec::new();

        for (slot, area) in panel.slots().iter().zip(areas.iter()) {
            match slot {
                ChartSlot::Blank(panel) => blank.push(panel.clone()),
                ChartSlot::Chart(spec) => {
                    let drawn = self.draw_chart(area, spec).with_context(|| format!("drawing '{}'", spec.title))?;
                    if let Drawn::Blank(reason) = drawn {
                        debug!(title = %spec.title, reason, "Chart left blank");
                        blank.push(BlankPanel {
                            title: spec.title.clone(),
                            reason: reason.to_string(),
                        });
                    }
                }
            }
        }

        root.present().with_context(|| format!("writing {}", path.display()))?;
        Ok(blank)
    }

    fn draw_chart(&self, area: &Area<'_>, spec: &ChartSpec) -> anyhow::Result<Drawn> {
        match &spec.kind {
            ChartKind::Histogram { values, bins } => self.histogram(area, spec, values, *bins),
            ChartKind::Scatter { points, color } => self.points(area, spec, points, *color, false),
            ChartKind::Line { points, color } => self.points(area, spec, points, *color, true),
            ChartKind::BoxPlot { groups } => self.boxplot(area, spec, groups),
            ChartKind::Bar { bars } => self.bars(area, spec, bars),
            ChartKind::Pie { slices } => self.pie(area, spec, slices),
        }
    }

    fn cartesian<'a, 'p>(&self, area: &'a Area<'p>, title: &str) -> ChartBuilder<'a, 'static, BitMapBackend<'p>> {
        let mut builder = ChartBuilder::on(area);
        builder
            .caption(title, (FONT, self.px(10.0)))
            .margin(self.px_u32(6.0))
            .x_label_area_size(self.px_u32(26.0))
            .y_label_area_size(self.px_u32(38.0));
        builder
    }

    fn numeric_mesh(
        &self,
        chart: &mut ChartContext<'_, BitMapBackend<'_>, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
        spec: &ChartSpec,
    ) -> anyhow::Result<()> {
        let (x_scale, y_scale) = (spec.x.scale, spec.y.scale);
        let x_ticks = move |v: &f64| tick_label(*v, x_scale);
        let y_ticks = move |v: &f64| tick_label(*v, y_scale);

        chart
            .configure_mesh()
            .x_desc(spec.x.label.as_str())
            .y_desc(spec.y.label.as_str())
            .x_label_formatter(&x_ticks)
            .y_label_formatter(&y_ticks)
            .label_style((FONT, self.px(7.0)))
            .axis_desc_style((FONT, self.px(8.0)))
            .light_line_style(WHITE)
            .bold_line_style(BLACK.mix(0.15))
            .draw()?;
        Ok(())
    }

    fn histogram(&self, area: &Area<'_>, spec: &ChartSpec, values: &[f64], bins: usize) -> anyhow::Result<Drawn> {
        let projected: Vec<f64> = values.iter().filter_map(|&v| project(v, spec.x.scale)).collect();
        let Some((edges, counts)) = bin_counts(&projected, bins) else {
            return Ok(Drawn::Blank(NOTHING_DRAWABLE));
        };

        let tallest = counts.iter().copied().max().unwrap_or(0) as f64;
        let width = (edges.end - edges.start) / counts.len() as f64;
        let pad = (edges.end - edges.start) * 0.02;

        let mut chart = self
            .cartesian(area, &spec.title)
            .build_cartesian_2d(edges.start - pad..edges.end + pad, 0.0..(tallest * 1.1).max(1.0))?;
        self.numeric_mesh(&mut chart, spec)?;

        let fill = rgb(SeriesColor::Blue).mix(0.7).filled();
        let outline = BLACK.stroke_width(1);
        for (i, &count) in counts.iter().enumerate() {
            let left = edges.start + width * i as f64;
            let corners = [(left, 0.0), (left + width, count as f64)];
            chart.draw_series([Rectangle::new(corners, fill), Rectangle::new(corners, outline)])?;
        }
        Ok(Drawn::Chart)
    }

    fn points(
        &self,
        area: &Area<'_>,
        spec: &ChartSpec,
        points: &[(f64, f64)],
        color: SeriesColor,
        connect: bool,
    ) -> anyhow::Result<Drawn> {
        let projected: Vec<(f64, f64)> = points
            .iter()
            .filter_map(|&(x, y)| Some((project(x, spec.x.scale)?, project(y, spec.y.scale)?)))
            .collect();
        let (Some(x_range), Some(y_range)) = (
            padded_range(projected.iter().map(|p| p.0)),
            padded_range(projected.iter().map(|p| p.1)),
        ) else {
            return Ok(Drawn::Blank(NOTHING_DRAWABLE));
        };

        let mut chart = self.cartesian(area, &spec.title).build_cartesian_2d(x_range, y_range)?;
        self.numeric_mesh(&mut chart, spec)?;

        let color = rgb(color);
        let radius = self.px_u32(2.0) as i32;
        if connect {
            chart.draw_series(LineSeries::new(projected.iter().copied(), color.stroke_width(self.px_u32(1.2))))?;
            chart.draw_series(projected.iter().map(|&p| Circle::new(p, radius, color.filled())))?;
        } else {
            chart.draw_series(projected.iter().map(|&p| Circle::new(p, radius, color.mix(0.6).filled())))?;
        }
        Ok(Drawn::Chart)
    }

    fn boxplot(&self, area: &Area<'_>, spec: &ChartSpec, groups: &[BoxGroup]) -> anyhow::Result<Drawn> {
        let projected: Vec<(&str, Vec<f64>)> = groups
            .iter()
            .map(|group| {
                let values = group.values.iter().filter_map(|&v| project(v, spec.y.scale)).collect::<Vec<_>>();
                (group.label.as_str(), values)
            })
            .filter(|(_, values)| !values.is_empty())
            .collect();
        let Some(y_range) = padded_range(projected.iter().flat_map(|(_, values)| values.iter().copied())) else {
            return Ok(Drawn::Blank(NOTHING_DRAWABLE));
        };

        // box plots are drawn on an f32 value axis
        let mut chart = self
            .cartesian(area, &spec.title)
            .build_cartesian_2d((0..projected.len() as i32).into_segmented(), y_range.start as f32..y_range.end as f32)?;

        let y_scale = spec.y.scale;
        let x_ticks = |v: &SegmentValue<i32>| segment_label(v, |i| projected.get(i).map(|(label, _)| *label));
        let y_ticks = move |v: &f32| tick_label(f64::from(*v), y_scale);
        chart
            .configure_mesh()
            .x_desc(spec.x.label.as_str())
            .y_desc(spec.y.label.as_str())
            .x_label_formatter(&x_ticks)
            .y_label_formatter(&y_ticks)
            .label_style((FONT, self.px(7.0)))
            .axis_desc_style((FONT, self.px(8.0)))
            .light_line_style(WHITE)
            .bold_line_style(BLACK.mix(0.15))
            .draw()?;

        let style = rgb(SeriesColor::Blue).stroke_width(self.px_u32(0.8));
        chart.draw_series(projected.iter().enumerate().map(|(i, (_, values))| {
            Boxplot::new_vertical(SegmentValue::CenterOf(i as i32), &Quartiles::new(values))
                .width(self.px_u32(28.0))
                .style(style)
        }))?;
        Ok(Drawn::Chart)
    }

    fn bars(&self, area: &Area<'_>, spec: &ChartSpec, bars: &[LabeledValue]) -> anyhow::Result<Drawn> {
        if bars.is_empty() {
            return Ok(Drawn::Blank(NOTHING_DRAWABLE));
        }
        let top = bars.iter().map(|bar| bar.value).fold(0.0, f64::max).max(1.0) * 1.1;

        let mut chart = self
            .cartesian(area, &spec.title)
            .build_cartesian_2d((0..bars.len() as i32).into_segmented(), 0.0..top)?;

        let x_ticks = |v: &SegmentValue<i32>| segment_label(v, |i| bars.get(i).map(|bar| bar.label.as_str()));
        let y_ticks = |v: &f64| tick_label(*v, Scale::Linear);
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc(spec.x.label.as_str())
            .y_desc(spec.y.label.as_str())
            .x_label_formatter(&x_ticks)
            .y_label_formatter(&y_ticks)
            .label_style((FONT, self.px(7.0)))
            .axis_desc_style((FONT, self.px(8.0)))
            .light_line_style(WHITE)
            .bold_line_style(BLACK.mix(0.15))
            .draw()?;

        let margin = self.px_u32(10.0);
        chart.draw_series(bars.iter().enumerate().map(|(i, bar)| {
            let i = i as i32;
            let mut rect = Rectangle::new(
                [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), bar.value)],
                rgb(bar.color).filled(),
            );
            rect.set_margin(0, 0, margin, margin);
            rect
        }))?;
        Ok(Drawn::Chart)
    }

    fn pie(&self, area: &Area<'_>, spec: &ChartSpec, slices: &[LabeledValue]) -> anyhow::Result<Drawn> {
        let slices: Vec<&LabeledValue> = slices.iter().filter(|s| s.value > 0.0 && s.value.is_finite()).collect();
        if slices.is_empty() {
            return Ok(Drawn::Blank(NOTHING_DRAWABLE));
        }

        let area = area.titled(&spec.title, (FONT, self.px(10.0)))?;
        let (width, height) = area.dim_in_pixel();
        let center = ((width / 2) as i32, (height / 2) as i32);
        let radius = f64::from(width.min(height)) * 0.35;

        let sizes: Vec<f64> = slices.iter().map(|s| s.value).collect();
        let colors: Vec<RGBColor> = slices.iter().map(|s| rgb(s.color)).collect();
        let labels: Vec<&str> = slices.iter().map(|s| s.label.as_str()).collect();

        let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
        pie.label_style((FONT, self.px(8.0)).into_font().color(&BLACK));
        pie.percentages((FONT, self.px(7.0)).into_font().color(&WHITE));
        area.draw(&pie)?;
        Ok(Drawn::Chart)
    }
}

impl ChartRenderer for PlottersRenderer {
    #[instrument(skip_all, fields(path = %path.display(), width = self.size.0, height = self.size.1))]
    fn render(&self, panel: &ChartPanel, path: &Path) -> Result<Vec<BlankPanel>> {
        self.draw_panel(panel, path).map_err(|e| Error::from(format!("{e:#}")))
    }
}

fn rgb(color: SeriesColor) -> RGBColor {
    match color {
        SeriesColor::Blue => RGBColor(31, 119, 180),
        SeriesColor::Orange => RGBColor(255, 127, 14),
        SeriesColor::Green => RGBColor(44, 160, 44),
        SeriesColor::Red => RGBColor(214, 39, 40),
    }
}

/// Map a data value onto the drawing axis; `None` when it has no position there
fn project(value: f64, scale: Scale) -> Option<f64> {
    match scale {
        Scale::Linear => value.is_finite().then_some(value),
        Scale::Log => (value.is_finite() && value > 0.0).then(|| value.log10()),
    }
}

/// Data range with a 5% margin, or a unit-wide window around a single value
fn padded_range(values: impl IntoIterator<Item = f64>) -> Option<Range<f64>> {
    let (lo, hi) = values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo > hi {
        return None;
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 0.5 };
    Some(lo - pad..hi + pad)
}

/// Equal-width bins spanning the data; the last bin includes its upper edge
fn bin_counts(values: &[f64], bins: usize) -> Option<(Range<f64>, Vec<usize>)> {
    let bins = bins.max(1);
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if lo > hi {
        return None;
    }
    let (lo, hi) = if hi > lo { (lo, hi) } else { (lo - 0.5, hi + 0.5) };

    let width = (hi - lo) / bins as f64;
    let mut counts = vec![0; bins];
    for &v in values {
        let index = (((v - lo) / width) as usize).min(bins - 1);
        counts[index] += 1;
    }
    Some((lo..hi, counts))
}

fn tick_label(value: f64, scale: Scale) -> String {
    let value = match scale {
        Scale::Linear => value,
        Scale::Log => 10f64.powf(value),
    };
    let magnitude = value.abs();
    if magnitude >= 100.0 || magnitude == 0.0 {
        format!("{value:.0}")
    } else if magnitude >= 1.0 {
        format!("{value:.1}")
    } else {
        format!("{value:.3}")
    }
}

fn segment_label<'a>(value: &SegmentValue<i32>, label: impl Fn(usize) -> Option<&'a str>) -> String {
    match value {
        SegmentValue::CenterOf(i) => usize::try_from(*i).ok().and_then(label).unwrap_or_default().to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ScalingTable;
    use crate::charts::build_panel;
    use crate::records::RunTable;
    use crate::records::tests::{cached_run, failed_run, llm_run};

    fn small_renderer() -> PlottersRenderer {
        PlottersRenderer::new(&ChartConfig {
            width_inches: 6.0,
            height_inches: 4.5,
            dpi: 40,
            ..ChartConfig::default()
        })
    }

    fn render_table(table: &RunTable, path: &Path) -> Vec<BlankPanel> {
        let panel = build_panel(table, &ScalingTable::compute(table), 20);
        small_renderer().render(&panel, path).unwrap()
    }

    #[test]
    fn test_project_drops_non_positive_on_log() {
        assert_eq!(project(1000.0, Scale::Log), Some(3.0));
        assert_eq!(project(0.0, Scale::Log), None);
        assert_eq!(project(-5.0, Scale::Log), None);
        assert_eq!(project(0.0, Scale::Linear), Some(0.0));
        assert_eq!(project(f64::NAN, Scale::Linear), None);
    }

    #[test]
    fn test_padded_range() {
        assert_eq!(padded_range([0.0, 10.0]), Some(-0.5..10.5));
        assert_eq!(padded_range([2.0]), Some(1.5..2.5));
        assert_eq!(padded_range([]), None);
    }

    #[test]
    fn test_bin_counts_cover_all_values() {
        let (edges, counts) = bin_counts(&[0.0, 1.0, 2.0, 3.0, 4.0], 4).unwrap();
        assert_eq!(edges, 0.0..4.0);
        // the maximum lands in the last bin
        assert_eq!(counts, vec![1, 1, 1, 2]);

        let (edges, counts) = bin_counts(&[3.0, 3.0], 20).unwrap();
        assert_eq!(edges, 2.5..3.5);
        assert_eq!(counts.iter().sum::<usize>(), 2);

        assert!(bin_counts(&[], 20).is_none());
    }

    #[test]
    fn test_tick_labels_undo_log() {
        assert_eq!(tick_label(3.0, Scale::Log), "1000");
        assert_eq!(tick_label(0.0, Scale::Log), "1.0");
        assert_eq!(tick_label(0.25, Scale::Linear), "0.250");
    }

    #[test_log::test]
    fn test_blank_panel_renders_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel.png");
        let config = ChartConfig {
            width_inches: 2.0,
            height_inches: 2.0,
            dpi: 30,
            ..ChartConfig::default()
        };

        let table = RunTable::new(vec![]);
        let panel = build_panel(&table, &ScalingTable::compute(&table), 20);
        let blank = PlottersRenderer::new(&config).render(&panel, &path).unwrap();

        assert_eq!(blank.len(), ROWS * COLS);
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test_log::test]
    fn test_populated_panel_draws_every_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel.png");
        let table = RunTable::new(vec![
            llm_run(1, 1000.0, 0.0),
            llm_run(1, 1300.0, 1800.0),
            llm_run(2, 2500.0, 1800.0),
            llm_run(4, 4200.0, 3600.0),
            cached_run(1),
            cached_run(3),
            failed_run(2, Some("HTTP 429: rate limited"), 1800.0),
        ]);

        let blank = render_table(&table, &path);

        assert!(blank.is_empty(), "{blank:?}");
        let png = std::fs::read(&path).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
    }

    #[test_log::test]
    fn test_zero_latency_blanks_log_axis_charts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel.png");
        let mut run = llm_run(1, 0.0, 0.0);
        run.throughput = Some(0.0);
        let table = RunTable::new(vec![run]);

        let blank = render_table(&table, &path);

        let titles: Vec<&str> = blank.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Latency Distribution (LLM-invoked runs only)",
                "User-selected Email Count vs Latency (LLM-invoked)",
                "Queue Wait vs Latency (LLM-invoked)",
                "Average Latency by User-selected Email Count (LLM-invoked)",
                "Token Usage vs Latency",
            ]
        );
        assert!(blank.iter().all(|b| b.reason == NOTHING_DRAWABLE));
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}

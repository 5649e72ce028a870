//! SVG charts of the shaped balance sheet.
//!
//! Each function renders one chart into an SVG document held in a `String`; writing the files is
//! left to `output`. Dates are plotted as day offsets from the first row so that the x axis is a
//! plain `f64` range.

use crate::model::{AssetBreakdownLongTable, BalanceSheetTable, Point, Series};
use crate::Result;
use anyhow::{ensure, Context};
use chrono::NaiveDate;
use format_num::format_num;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::ops::Range;

const SIZE: (u32, u32) = (1024, 640);
const FONT: &str = "sans-serif";

/// The charts produced for every report.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Chart {
    NetWorth,
    Change,
    PercentChange,
    AssetBreakdown,
}

impl Chart {
    pub const ALL: [Chart; 4] = [
        Chart::NetWorth,
        Chart::Change,
        Chart::PercentChange,
        Chart::AssetBreakdown,
    ];

    /// The file name without the date prefix.
    pub fn file_name(self) -> &'static str {
        match self {
            Chart::NetWorth => "net-worth.svg",
            Chart::Change => "change.svg",
            Chart::PercentChange => "percent-change.svg",
            Chart::AssetBreakdown => "asset-breakdown.svg",
        }
    }

    pub fn render(
        self,
        table: &BalanceSheetTable,
        breakdown: &AssetBreakdownLongTable,
    ) -> Result<String> {
        match self {
            Chart::NetWorth => net_worth(table),
            Chart::Change => change(table),
            Chart::PercentChange => percent_change(table),
            Chart::AssetBreakdown => asset_breakdown(breakdown),
        }
    }
}

type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;

struct Line {
    label: String,
    points: Vec<Point>,
    color: RGBColor,
}

/// Line of the total column over time.
pub fn net_worth(table: &BalanceSheetTable) -> Result<String> {
    let lines = [Line {
        label: table.label(Series::Total),
        points: table.points(Series::Total),
        color: BLUE,
    }];
    render(|root| line_chart(root, "Net Worth", &lines, dollars))
        .context("Unable to render the net worth chart")
}

/// Period-over-period change with its trailing mean on top.
pub fn change(table: &BalanceSheetTable) -> Result<String> {
    let lines = [
        Line {
            label: table.label(Series::Change),
            points: table.points(Series::Change),
            color: BLUE,
        },
        Line {
            label: table.label(Series::MeanChange),
            points: table.points(Series::MeanChange),
            color: RED,
        },
    ];
    render(|root| line_chart(root, "Change", &lines, dollars))
        .context("Unable to render the change chart")
}

pub fn percent_change(table: &BalanceSheetTable) -> Result<String> {
    let lines = [Line {
        label: table.label(Series::PercentChange),
        points: table.points(Series::PercentChange),
        color: BLUE,
    }];
    render(|root| line_chart(root, "Percent Change", &lines, percent))
        .context("Unable to render the percent change chart")
}

/// Stacked areas, one per asset category, in sheet order from the bottom up.
pub fn asset_breakdown(breakdown: &AssetBreakdownLongTable) -> Result<String> {
    let layers = stack(breakdown)?;
    render(|root| area_chart(root, "Asset Breakdown", &layers))
        .context("Unable to render the asset breakdown chart")
}

/// One band of the stacked area chart: `(date, lower, upper)` for each row.
#[derive(Debug, Clone, PartialEq)]
struct Layer {
    label: String,
    bands: Vec<(NaiveDate, f64, f64)>,
}

fn stack(breakdown: &AssetBreakdownLongTable) -> Result<Vec<Layer>> {
    let mut layers: Vec<Layer> = Vec::with_capacity(breakdown.categories().len());
    for category in breakdown.categories() {
        let points: Vec<_> = breakdown.category(category).collect();
        let bands = match layers.last() {
            None => points.iter().map(|p| (p.x, 0.0, p.y)).collect(),
            Some(below) => {
                ensure!(
                    below.bands.len() == points.len(),
                    "The category '{category}' does not have a value for every date"
                );
                below
                    .bands
                    .iter()
                    .zip(points)
                    .map(|(&(x, _, lower), p)| (x, lower, lower + p.y))
                    .collect()
            }
        };
        layers.push(Layer {
            label: category.clone(),
            bands,
        });
    }
    Ok(layers)
}

fn render<F>(draw: F) -> Result<String>
where
    F: FnOnce(&Area) -> Result<()>,
{
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        draw(&root)?;
        root.present()?;
    }
    Ok(svg)
}

fn line_chart(
    root: &Area,
    title: &str,
    lines: &[Line],
    y_format: fn(f64) -> String,
) -> Result<()> {
    let dates: Vec<NaiveDate> = lines
        .iter()
        .flat_map(|l| l.points.iter().map(|p| p.x))
        .collect();
    let values: Vec<f64> = lines
        .iter()
        .flat_map(|l| l.points.iter().map(|p| p.y))
        .collect();
    let start = dates.iter().min().copied().unwrap_or_default();
    let x_range = x_range(start, &dates);
    let y_range = y_range(values);

    let mut chart = ChartBuilder::on(root)
        .caption(title, (FONT, 28))
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(90)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_labels(8)
        .y_labels(8)
        .x_label_formatter(&|x| day_label(start, *x))
        .y_label_formatter(&|y| y_format(*y))
        .draw()?;

    for line in lines {
        let color = line.color;
        let coords = line.points.iter().map(|p| (days(start, p.x), p.y));
        chart
            .draw_series(LineSeries::new(coords, color.stroke_width(2)))?
            .label(line.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

fn area_chart(root: &Area, title: &str, layers: &[Layer]) -> Result<()> {
    let dates: Vec<NaiveDate> = layers
        .iter()
        .flat_map(|l| l.bands.iter().map(|b| b.0))
        .collect();
    let values = layers
        .iter()
        .flat_map(|l| l.bands.iter().flat_map(|b| [b.1, b.2]))
        .collect();
    let start = dates.iter().min().copied().unwrap_or_default();

    let mut chart = ChartBuilder::on(root)
        .caption(title, (FONT, 28))
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(90)
        .build_cartesian_2d(x_range(start, &dates), y_range(values))?;

    chart
        .configure_mesh()
        .x_labels(8)
        .y_labels(8)
        .x_label_formatter(&|x| day_label(start, *x))
        .y_label_formatter(&|y| dollars(*y))
        .draw()?;

    for (i, layer) in layers.iter().enumerate() {
        if layer.bands.is_empty() {
            continue;
        }
        let color = Palette99::pick(i).to_rgba();
        let upper = layer.bands.iter().map(|&(x, _, hi)| (days(start, x), hi));
        let lower = layer.bands.iter().rev().map(|&(x, lo, _)| (days(start, x), lo));
        let outline: Vec<(f64, f64)> = upper.chain(lower).collect();
        chart
            .draw_series(std::iter::once(Polygon::new(
                outline,
                color.mix(0.7).filled(),
            )))?
            .label(layer.label.as_str())
            .legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled())
            });
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

fn days(start: NaiveDate, date: NaiveDate) -> f64 {
    (date - start).num_days() as f64
}

fn day_label(start: NaiveDate, offset: f64) -> String {
    let date = start + chrono::Duration::days(offset.round() as i64);
    date.format("%Y-%m-%d").to_string()
}

fn x_range(start: NaiveDate, dates: &[NaiveDate]) -> Range<f64> {
    let end = dates.iter().map(|d| days(start, *d)).fold(0.0, f64::max);
    0.0..end.max(1.0)
}

/// Spans the values with a 5% margin, and never collapses to an empty range.
fn y_range(values: Vec<f64>) -> Range<f64> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        return 0.0..1.0;
    }
    let pad = if hi > lo {
        (hi - lo) * 0.05
    } else {
        lo.abs().max(1.0) * 0.05
    };
    (lo - pad)..(hi + pad)
}

fn dollars(y: f64) -> String {
    let sign = if y < 0.0 { "-" } else { "" };
    format!("{sign}${}", format_num!(",.0", y.abs()))
}

fn percent(y: f64) -> String {
    format!("{:.1}%", y * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{shape, PipelineConfig, Shaped};

    fn shaped() -> Shaped {
        let grid = vec![
            vec!["group", "", "", "", ""],
            vec!["Date", "Checking", "Brokerage", "Total", "Notes"],
            vec!["01/31/2024", "$100.00", "$1,000.00", "$1,100.00", ""],
            vec!["02/29/2024", "$150.00", "$1,050.00", "$1,200.00", "raise"],
            vec!["03/31/2024", "$90.00", "$1,060.00", "$1,150.00", ""],
        ];
        shape(&grid, &PipelineConfig::default()).unwrap()
    }

    #[test]
    fn test_stack() {
        let shaped = shaped();
        let layers = stack(shaped.breakdown()).unwrap();
        assert_eq!(2, layers.len());
        assert_eq!("Checking", layers[0].label);
        let jan = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!((jan, 0.0, 100.0), layers[0].bands[0]);
        assert_eq!((jan, 100.0, 1100.0), layers[1].bands[0]);
        assert_eq!(3, layers[1].bands.len());
    }

    #[test]
    fn test_render_all() {
        let shaped = shaped();
        for chart in Chart::ALL {
            let svg = chart.render(shaped.table(), shaped.breakdown()).unwrap();
            assert!(svg.contains("<svg"), "{chart:?}");
            assert!(svg.trim_end().ends_with("</svg>"), "{chart:?}");
        }
    }

    #[test]
    fn test_change_chart_has_both_labels() {
        let svg = change(shaped().table()).unwrap();
        assert!(svg.contains("Change"));
        assert!(svg.contains("SixPeriodMeanChange"));
    }

    #[test]
    fn test_render_empty_table() {
        let grid = vec![
            vec!["group", "", ""],
            vec!["Date", "Checking", "Total"],
            vec!["", "$1.00", ""],
        ];
        let shaped = shape(&grid, &PipelineConfig::default()).unwrap();
        assert!(shaped.table().is_empty());
        for chart in Chart::ALL {
            assert!(chart.render(shaped.table(), shaped.breakdown()).is_ok());
        }
    }

    #[test]
    fn test_y_range() {
        assert_eq!(0.0..1.0, y_range(vec![]));
        assert_eq!(0.0..1.0, y_range(vec![f64::NAN]));
        let r = y_range(vec![100.0, 200.0]);
        assert!((r.start - 95.0).abs() < 1e-9);
        assert!((r.end - 205.0).abs() < 1e-9);
        let r = y_range(vec![50.0]);
        assert!(r.start < 50.0 && r.end > 50.0);
    }

    #[test]
    fn test_labels() {
        assert_eq!("$1,235", dollars(1234.6));
        assert_eq!("-$5", dollars(-5.0));
        assert_eq!("12.5%", percent(0.125));
        let start = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!("2024-03-01", day_label(start, 30.2));
    }
}

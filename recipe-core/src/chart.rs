//! Aggregate charts over a filtered result set.
//!
//! Charts are drawn with the plotters SVG backend and returned base64 encoded,
//! ready to embed as `data:image/svg+xml;base64,...`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use std::collections::HashMap;
use tracing::debug;

use crate::common::error::{CatalogError, Result};
use crate::domain::MAX_COOKING_TIME;
use crate::search::{ChartType, ReportRow};

pub const CHART_SIZE: (u32, u32) = (800, 500);
pub const UNRATED_LABEL: &str = "Unrated";

const FONT: &str = "sans-serif";
const PALETTE: [RGBColor; 5] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
];

type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;

fn chart_err<E: std::error::Error>(e: E) -> CatalogError {
    CatalogError::Chart(e.to_string())
}

/// Renders the requested chart, or `None` when there is nothing to draw.
pub fn render_chart(chart_type: ChartType, rows: &[ReportRow]) -> Result<Option<String>> {
    if chart_type == ChartType::None || rows.is_empty() {
        return Ok(None);
    }

    let svg = render_svg(chart_type, rows)?;
    debug!(chart = chart_type.label(), rows = rows.len(), bytes = svg.len(), "Rendered chart");
    Ok(Some(STANDARD.encode(svg.as_bytes())))
}

fn render_svg(chart_type: ChartType, rows: &[ReportRow]) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        match chart_type {
            ChartType::Bar => draw_bar(&root, rows)?,
            ChartType::Pie => draw_pie(&root, rows)?,
            ChartType::Line => draw_line(&root, rows)?,
            ChartType::None => {}
        }

        root.present().map_err(chart_err)?;
    }
    Ok(svg)
}

/// Cooking time as drawn on the y axis.
fn plotted_time(row: &ReportRow) -> i64 {
    row.cooking_time.clamp(0, MAX_COOKING_TIME)
}

fn y_upper_bound(rows: &[ReportRow]) -> i64 {
    let max = rows.iter().map(plotted_time).max().unwrap_or(0).max(1);
    max.saturating_add(max / 10).saturating_add(1)
}

fn draw_bar(root: &Area<'_>, rows: &[ReportRow]) -> Result<()> {
    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();

    let mut chart = ChartBuilder::on(root)
        .caption("Cooking Time by Recipe", (FONT, 24))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d((0..rows.len() as i32).into_segmented(), 0i64..y_upper_bound(rows))
        .map_err(chart_err)?;

    let label_for = |v: &SegmentValue<i32>| match v {
        SegmentValue::CenterOf(i) => usize::try_from(*i)
            .ok()
            .and_then(|i| names.get(i))
            .map(|n| n.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(rows.len())
        .x_label_formatter(&label_for)
        .x_desc("Recipe")
        .y_desc("Cooking Time (minutes)")
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(
            Histogram::vertical(&chart)
                .style(PALETTE[0].filled())
                .margin(10)
                .data(rows.iter().enumerate().map(|(i, r)| (i as i32, plotted_time(r)))),
        )
        .map_err(chart_err)?;

    Ok(())
}

/// Recipe counts per difficulty label, largest first.
pub fn difficulty_counts(rows: &[ReportRow]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for row in rows {
        let label = match row.difficulty_label() {
            "" => UNRATED_LABEL,
            label => label,
        };
        *counts.entry(label).or_default() += 1;
    }

    let mut counts: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(label, n)| (label.to_string(), n))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

fn draw_pie(root: &Area<'_>, rows: &[ReportRow]) -> Result<()> {
    let counts = difficulty_counts(rows);
    let total = rows.len() as f64;

    let area = root
        .titled("Recipes by Difficulty", (FONT, 24))
        .map_err(chart_err)?;
    let (width, height) = area.dim_in_pixel();
    let center = ((width / 2) as i32, (height / 2) as i32);
    let radius = f64::from(width.min(height)) * 0.35;

    let sizes: Vec<f64> = counts.iter().map(|(_, n)| *n as f64).collect();
    let labels: Vec<String> = counts
        .iter()
        .map(|(label, n)| format!("{label} ({:.1}%)", *n as f64 * 100.0 / total))
        .collect();
    let colors: Vec<RGBColor> = (0..counts.len())
        .map(|i| PALETTE[i % PALETTE.len()])
        .collect();

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.label_style((FONT, 16).into_font().color(&BLACK));
    area.draw(&pie).map_err(chart_err)?;

    Ok(())
}

/// (ingredient count, cooking time) pairs in ascending ingredient count.
fn line_points(rows: &[ReportRow]) -> Vec<(i32, i64)> {
    let mut points: Vec<(i32, i64)> = rows
        .iter()
        .map(|r| (i32::try_from(r.ingredient_count).unwrap_or(i32::MAX), plotted_time(r)))
        .collect();
    points.sort_by_key(|p| p.0);
    points
}

fn draw_line(root: &Area<'_>, rows: &[ReportRow]) -> Result<()> {
    let points = line_points(rows);

    let max_x = points.last().map_or(1, |p| p.0).max(1);

    let mut chart = ChartBuilder::on(root)
        .caption("Cooking Time vs Number of Ingredients", (FONT, 24))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(0..max_x.saturating_add(1), 0i64..y_upper_bound(rows))
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .x_desc("Number of Ingredients")
        .y_desc("Cooking Time (minutes)")
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(LineSeries::new(points.iter().copied(), &PALETTE[0]))
        .map_err(chart_err)?;
    chart
        .draw_series(
            points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 4, PALETTE[0].filled())),
        )
        .map_err(chart_err)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Difficulty;

    fn row(id: i64, name: &str, cooking_time: i64, difficulty: Option<Difficulty>, count: usize) -> ReportRow {
        ReportRow {
            id,
            name: name.to_string(),
            cooking_time,
            difficulty,
            ingredient_count: count,
        }
    }

    fn sample() -> Vec<ReportRow> {
        vec![
            row(1, "Scrambled Eggs", 5, Some(Difficulty::Easy), 3),
            row(2, "Fruit Salad", 5, Some(Difficulty::Medium), 4),
            row(3, "Beef Stew", 60, Some(Difficulty::Hard), 5),
            row(4, "Toast", 3, Some(Difficulty::Easy), 2),
        ]
    }

    fn decode(encoded: &str) -> String {
        String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap()
    }

    #[test]
    fn test_none_and_empty_render_nothing() {
        assert_eq!(render_chart(ChartType::None, &sample()).unwrap(), None);
        assert_eq!(render_chart(ChartType::Bar, &[]).unwrap(), None);
    }

    #[test]
    fn test_each_chart_type_renders_svg_with_title() {
        let cases = [
            (ChartType::Bar, "Cooking Time by Recipe"),
            (ChartType::Pie, "Recipes by Difficulty"),
            (ChartType::Line, "Cooking Time vs Number of Ingredients"),
        ];
        for (chart_type, title) in cases {
            let encoded = render_chart(chart_type, &sample()).unwrap().unwrap();
            let svg = decode(&encoded);
            assert!(svg.contains("<svg"), "{chart_type:?} did not produce svg");
            assert!(svg.contains(title), "{chart_type:?} missing title");
        }
    }

    #[test]
    fn test_pie_labels_carry_percentages() {
        let svg = decode(&render_chart(ChartType::Pie, &sample()).unwrap().unwrap());
        assert!(svg.contains("Easy (50.0%)"));
        assert!(svg.contains("Hard (25.0%)"));
    }

    #[test]
    fn test_line_points_sorted_by_ingredient_count() {
        let points = line_points(&sample());
        assert_eq!(points, vec![(2, 3), (3, 5), (4, 5), (5, 60)]);
    }

    #[test]
    fn test_huge_cooking_times_still_render() {
        let rows = vec![
            row(1, "Forever Stew", i64::MAX, Some(Difficulty::Hard), 5),
            row(2, "Toast", 3, Some(Difficulty::Easy), 2),
        ];
        assert_eq!(y_upper_bound(&rows), MAX_COOKING_TIME + MAX_COOKING_TIME / 10 + 1);
        for chart_type in [ChartType::Bar, ChartType::Line] {
            let encoded = render_chart(chart_type, &rows).unwrap();
            assert!(encoded.is_some(), "{chart_type:?}");
        }
    }

    #[test]
    fn test_difficulty_counts_order_and_unrated() {
        let mut rows = sample();
        rows.push(row(5, "Mystery", 0, None, 1));
        let counts = difficulty_counts(&rows);
        assert_eq!(counts[0], ("Easy".to_string(), 2));
        assert_eq!(
            counts[1..].iter().map(|(l, _)| l.as_str()).collect::<Vec<_>>(),
            vec!["Hard", "Medium", UNRATED_LABEL]
        );
    }
}

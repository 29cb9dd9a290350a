//! SVG Chart Generator for Training Curves
//!
//! Renders the loss and accuracy curves recorded during training as
//! standalone SVG files for visual inspection.

use std::fs;
use std::path::{Path, PathBuf};

use crate::training::history::TrainingHistory;

/// Chart styling constants
const CHART_WIDTH: f64 = 800.0;
const CHART_HEIGHT: f64 = 500.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_RIGHT: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 80.0;
const MARGIN_LEFT: f64 = 80.0;

pub const COLOR_TRAIN: &str = "#3498db";
pub const COLOR_VALIDATION: &str = "#e67e22";
const COLOR_GRID: &str = "#ecf0f1";
const COLOR_AXIS: &str = "#2c3e50";
const COLOR_TEXT: &str = "#2c3e50";

/// File name of the rendered loss chart
pub const LOSS_CHART_FILE: &str = "loss.svg";
/// File name of the rendered accuracy chart
pub const ACCURACY_CHART_FILE: &str = "accuracy.svg";

/// A data point for a line chart
#[derive(Debug, Clone)]
pub struct DataPoint {
    pub x: f64,
    pub y: f64,
}

/// A data series for charts
#[derive(Debug, Clone)]
pub struct DataSeries {
    pub name: String,
    pub points: Vec<DataPoint>,
    pub color: String,
}

impl DataSeries {
    /// Build a series from per-epoch values, numbering epochs from 1
    pub fn from_epochs(name: &str, values: &[f64], color: &str) -> Self {
        Self {
            name: name.to_string(),
            points: values
                .iter()
                .enumerate()
                .map(|(i, &y)| DataPoint {
                    x: (i + 1) as f64,
                    y,
                })
                .collect(),
            color: color.to_string(),
        }
    }
}

/// How the vertical axis is scaled and labelled
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum YAxis {
    /// Fractions in [0, 1], labelled as percentages
    Fraction,
    /// From zero up to the largest value (plus headroom)
    Auto,
}

impl YAxis {
    fn bounds(&self, y_max: f64) -> (f64, f64) {
        match self {
            YAxis::Fraction => (0.0, 1.0),
            YAxis::Auto => {
                let top = if y_max.is_finite() && y_max > 0.0 {
                    y_max * 1.1
                } else {
                    1.0
                };
                (0.0, top)
            }
        }
    }

    fn tick_label(&self, value: f64) -> String {
        match self {
            YAxis::Fraction => format!("{:.0}%", value * 100.0),
            YAxis::Auto => format!("{:.2}", value),
        }
    }
}

/// Generate a line chart SVG
pub fn generate_line_chart(
    title: &str,
    x_label: &str,
    y_label: &str,
    series: &[DataSeries],
    y_axis: YAxis,
    output_path: &Path,
) -> std::io::Result<()> {
    fs::write(
        output_path,
        render_line_chart(title, x_label, y_label, series, y_axis),
    )
}

/// Render a line chart to an SVG string
pub fn render_line_chart(
    title: &str,
    x_label: &str,
    y_label: &str,
    series: &[DataSeries],
    y_axis: YAxis,
) -> String {
    let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

    let (x_min, x_max, _, y_max) = find_ranges(series);
    let (y_min, y_max) = y_axis.bounds(y_max);

    // A single epoch still needs a non-zero span
    let x_span = if x_max > x_min { x_max - x_min } else { 1.0 };
    let x_min = if x_min.is_finite() { x_min } else { 0.0 };

    let to_x = |x: f64| MARGIN_LEFT + ((x - x_min) / x_span) * plot_width;
    let to_y = |y: f64| {
        let clamped = y.clamp(y_min, y_max);
        MARGIN_TOP + plot_height - ((clamped - y_min) / (y_max - y_min)) * plot_height
    };

    let mut svg = String::new();

    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}" width="{}" height="{}">"#,
        CHART_WIDTH, CHART_HEIGHT, CHART_WIDTH, CHART_HEIGHT
    ));

    svg.push_str(&format!(
        r#"<rect width="{}" height="{}" fill="white"/>"#,
        CHART_WIDTH, CHART_HEIGHT
    ));

    svg.push_str(&format!(
        r#"<text x="{}" y="35" text-anchor="middle" font-family="Arial, sans-serif" font-size="18" font-weight="bold" fill="{}">{}</text>"#,
        CHART_WIDTH / 2.0, COLOR_TEXT, escape_xml(title)
    ));

    // Grid lines
    for i in 0..=5 {
        let y = MARGIN_TOP + plot_height - (i as f64 / 5.0) * plot_height;
        let value = y_min + (i as f64 / 5.0) * (y_max - y_min);

        svg.push_str(&format!(
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="1"/>"#,
            MARGIN_LEFT, y, MARGIN_LEFT + plot_width, y, COLOR_GRID
        ));

        svg.push_str(&format!(
            r#"<text x="{}" y="{}" text-anchor="end" font-family="Arial, sans-serif" font-size="12" fill="{}">{}</text>"#,
            MARGIN_LEFT - 10.0, y + 4.0, COLOR_TEXT, y_axis.tick_label(value)
        ));
    }

    // Axes
    svg.push_str(&format!(
        r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="2"/>"#,
        MARGIN_LEFT, MARGIN_TOP + plot_height, MARGIN_LEFT + plot_width, MARGIN_TOP + plot_height, COLOR_AXIS
    ));
    svg.push_str(&format!(
        r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="2"/>"#,
        MARGIN_LEFT, MARGIN_TOP, MARGIN_LEFT, MARGIN_TOP + plot_height, COLOR_AXIS
    ));

    svg.push_str(&format!(
        r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="14" fill="{}">{}</text>"#,
        MARGIN_LEFT + plot_width / 2.0, CHART_HEIGHT - 20.0, COLOR_TEXT, escape_xml(x_label)
    ));
    svg.push_str(&format!(
        r#"<text x="20" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="14" fill="{}" transform="rotate(-90 20 {})">{}</text>"#,
        CHART_HEIGHT / 2.0, COLOR_TEXT, CHART_HEIGHT / 2.0, escape_xml(y_label)
    ));

    for series_data in series {
        if series_data.points.is_empty() {
            continue;
        }

        let mut path = String::new();
        for (i, point) in series_data.points.iter().enumerate() {
            let command = if i == 0 { "M" } else { " L" };
            path.push_str(&format!("{} {} {}", command, to_x(point.x), to_y(point.y)));
        }

        svg.push_str(&format!(
            r#"<path d="{}" fill="none" stroke="{}" stroke-width="3"/>"#,
            path, series_data.color
        ));

        for point in &series_data.points {
            svg.push_str(&format!(
                r#"<circle cx="{}" cy="{}" r="5" fill="{}" stroke="white" stroke-width="2"/>"#,
                to_x(point.x),
                to_y(point.y),
                series_data.color
            ));
        }
    }

    // X-axis tick labels (taken from the first series)
    if let Some(first) = series.first() {
        for point in &first.points {
            svg.push_str(&format!(
                r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="11" fill="{}">{:.0}</text>"#,
                to_x(point.x), MARGIN_TOP + plot_height + 20.0, COLOR_TEXT, point.x
            ));
        }
    }

    // Legend
    let mut legend_y = MARGIN_TOP + 10.0;
    for series_data in series {
        svg.push_str(&format!(
            r#"<rect x="{}" y="{}" width="15" height="15" fill="{}"/>"#,
            CHART_WIDTH - MARGIN_RIGHT - 160.0, legend_y, series_data.color
        ));
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" font-family="Arial, sans-serif" font-size="12" fill="{}">{}</text>"#,
            CHART_WIDTH - MARGIN_RIGHT - 140.0, legend_y + 12.0, COLOR_TEXT, escape_xml(&series_data.name)
        ));
        legend_y += 25.0;
    }

    svg.push_str("</svg>");
    svg
}

/// Write the loss and accuracy curves of a training run into `output_dir`
///
/// Returns the paths of the loss chart and the accuracy chart.
pub fn plot_history(
    history: &TrainingHistory,
    output_dir: &Path,
) -> std::io::Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(output_dir)?;

    let loss_path = output_dir.join(LOSS_CHART_FILE);
    generate_line_chart(
        "Loss",
        "Epoch",
        "Loss",
        &[
            DataSeries::from_epochs("train loss", &history.loss, COLOR_TRAIN),
            DataSeries::from_epochs("validation loss", &history.val_loss, COLOR_VALIDATION),
        ],
        YAxis::Auto,
        &loss_path,
    )?;

    let accuracy_path = output_dir.join(ACCURACY_CHART_FILE);
    generate_line_chart(
        "Accuracy",
        "Epoch",
        "Accuracy",
        &[
            DataSeries::from_epochs("train accuracy", &history.accuracy, COLOR_TRAIN),
            DataSeries::from_epochs(
                "validation accuracy",
                &history.val_accuracy,
                COLOR_VALIDATION,
            ),
        ],
        YAxis::Fraction,
        &accuracy_path,
    )?;

    Ok((loss_path, accuracy_path))
}

fn find_ranges(series: &[DataSeries]) -> (f64, f64, f64, f64) {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;

    for s in series {
        for p in &s.points {
            x_min = x_min.min(p.x);
            x_max = x_max.max(p.x);
            y_min = y_min.min(p.y);
            y_max = y_max.max(p.y);
        }
    }

    (x_min, x_max, y_min, y_max)
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::history::EpochMetrics;

    fn sample_history() -> TrainingHistory {
        let mut history = TrainingHistory::default();
        history.push(EpochMetrics {
            loss: 0.62,
            accuracy: 0.68,
            val_loss: 0.41,
            val_accuracy: 0.83,
        });
        history.push(EpochMetrics {
            loss: 0.35,
            accuracy: 0.86,
            val_loss: 0.29,
            val_accuracy: 0.89,
        });
        history
    }

    #[test]
    fn test_render_line_chart_contains_series() {
        let series = vec![DataSeries::from_epochs("train loss", &[0.7, 0.4, 0.2], COLOR_TRAIN)];
        let svg = render_line_chart("Loss", "Epoch", "Loss", &series, YAxis::Auto);

        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("train loss"));
        assert_eq!(svg.matches("<circle").count(), 3);
    }

    #[test]
    fn test_single_epoch_renders_finite_coordinates() {
        let series = vec![DataSeries::from_epochs("acc", &[0.5], COLOR_TRAIN)];
        let svg = render_line_chart("Accuracy", "Epoch", "Accuracy", &series, YAxis::Fraction);
        assert!(!svg.contains("NaN"));
        assert!(svg.contains("100%"));
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a < b & c"), "a &lt; b &amp; c");
    }

    #[test]
    fn test_plot_history_writes_both_charts() {
        let dir = tempfile::tempdir().unwrap();
        let (loss, accuracy) = plot_history(&sample_history(), dir.path()).unwrap();

        assert!(loss.ends_with(LOSS_CHART_FILE));
        assert!(accuracy.ends_with(ACCURACY_CHART_FILE));

        let loss_svg = fs::read_to_string(loss).unwrap();
        assert!(loss_svg.contains("validation loss"));
        let accuracy_svg = fs::read_to_string(accuracy).unwrap();
        assert!(accuracy_svg.contains("validation accuracy"));
    }
}

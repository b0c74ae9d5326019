//! Line chart rendering with `plotters`
//!
//! The bitmap backend writes PNG to a temporary file, which is read back
//! into memory and removed when the handle drops.

use super::TEMPERATURE_UNIT;
use crate::config::CurrentMarker;
use chrono::{DateTime, Duration, Utc};
use plotters::prelude::*;
use thiserror::Error;

/// Fewest points a line needs to be drawn
pub const MIN_CHART_POINTS: usize = 2;

const LINE_COLORS: [RGBColor; 2] = [BLUE, GREEN];

/// Errors raised while producing a chart image
#[derive(Debug, Error)]
pub enum ChartError {
    /// A series is too short to draw
    #[error("Series '{label}' has {got} points, need at least {min}", min = MIN_CHART_POINTS)]
    InsufficientData {
        /// Series label
        label: String,
        /// Number of points available
        got: usize,
    },
    /// Drawing backend failure
    #[error("Render error: {0}")]
    Render(String),
    /// Temp file handling failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One plotted series
#[derive(Debug, Clone, PartialEq)]
pub struct ChartLine {
    /// Legend label
    pub label: String,
    /// Points in chronological order
    pub points: Vec<(DateTime<Utc>, f64)>,
}

/// Everything needed to draw one chart
#[derive(Debug, Clone, PartialEq)]
pub struct ChartInput {
    /// Caption
    pub title: String,
    /// Series to overlay
    pub lines: Vec<ChartLine>,
    /// Current measured value, if known
    pub current: Option<f64>,
    /// How to draw `current`
    pub marker: CurrentMarker,
    /// Image size in pixels
    pub size: (u32, u32),
}

impl ChartInput {
    fn validate(&self) -> Result<(), ChartError> {
        if self.lines.is_empty() {
            return Err(ChartError::InsufficientData {
                label: "<none>".to_string(),
                got: 0,
            });
        }
        for line in &self.lines {
            if line.points.len() < MIN_CHART_POINTS {
                return Err(ChartError::InsufficientData {
                    label: line.label.clone(),
                    got: line.points.len(),
                });
            }
        }
        Ok(())
    }
}

/// Earliest and latest timestamp across all lines, widened when equal
pub(crate) fn time_range(lines: &[ChartLine]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let mut stamps = lines.iter().flat_map(|l| l.points.iter().map(|p| p.0));
    let first = stamps.next()?;
    let (min, max) = stamps.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t)));
    if min == max {
        Some((min - Duration::minutes(1), max + Duration::minutes(1)))
    } else {
        Some((min, max))
    }
}

/// Value bounds with 10% padding; flat data gets a fixed half-degree margin
pub(crate) fn value_range(lines: &[ChartLine], current: Option<f64>) -> Option<(f64, f64)> {
    let mut values = lines
        .iter()
        .flat_map(|l| l.points.iter().map(|p| p.1))
        .chain(current);
    let first = values.next()?;
    let (min, max) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let padding = if max > min { (max - min) * 0.1 } else { 0.5 };
    Some((min - padding, max + padding))
}

fn render_err(e: impl std::fmt::Display) -> ChartError {
    ChartError::Render(e.to_string())
}

/// Draw the chart and return PNG bytes.
///
/// # Errors
///
/// Returns `ChartError::InsufficientData` when any line has fewer than
/// [`MIN_CHART_POINTS`] points, `ChartError::Render` on drawing failures and
/// `ChartError::Io` if the temporary image cannot be written or read.
pub fn render_chart(input: &ChartInput) -> Result<Vec<u8>, ChartError> {
    input.validate()?;
    let (x_min, x_max) = time_range(&input.lines).ok_or_else(|| render_err("empty time range"))?;
    let (y_min, y_max) =
        value_range(&input.lines, input.current).ok_or_else(|| render_err("empty value range"))?;

    let file = tempfile::Builder::new()
        .prefix("tempcast_chart_")
        .suffix(".png")
        .tempfile()?;
    let path = file.path().to_path_buf();

    {
        let root = BitMapBackend::new(&path, input.size).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&input.title, ("sans-serif", 30).into_font())
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)
            .map_err(render_err)?;

        chart
            .configure_mesh()
            .x_desc("Time (UTC)")
            .y_desc(format!("Temperature ({TEMPERATURE_UNIT})"))
            .x_label_formatter(&|t: &DateTime<Utc>| t.format("%H:%M").to_string())
            .draw()
            .map_err(render_err)?;

        for (idx, line) in input.lines.iter().enumerate() {
            let color = LINE_COLORS[idx % LINE_COLORS.len()];
            chart
                .draw_series(LineSeries::new(
                    line.points.iter().copied(),
                    color.stroke_width(2),
                ))
                .map_err(render_err)?
                .label(line.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            chart
                .draw_series(
                    line.points
                        .iter()
                        .map(|&point| Circle::new(point, 3, color.filled())),
                )
                .map_err(render_err)?;
        }

        if let Some(current) = input.current {
            let label = format!("Current {current:.2} {TEMPERATURE_UNIT}");
            match input.marker {
                CurrentMarker::Line => {
                    chart
                        .draw_series(LineSeries::new(
                            vec![(x_min, current), (x_max, current)],
                            RED.stroke_width(2),
                        ))
                        .map_err(render_err)?
                        .label(label)
                        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
                }
                CurrentMarker::Point => {
                    chart
                        .draw_series(std::iter::once(Circle::new(
                            (x_max, current),
                            6,
                            RED.filled(),
                        )))
                        .map_err(render_err)?
                        .label(label)
                        .legend(|(x, y)| Circle::new((x + 10, y), 4, RED.filled()));
                }
            }
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
    }

    Ok(std::fs::read(&path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, minute, 0)
            .single()
            .expect("valid timestamp")
    }

    fn line(label: &str, points: &[(u32, f64)]) -> ChartLine {
        ChartLine {
            label: label.to_string(),
            points: points.iter().map(|&(m, v)| (at(m), v)).collect(),
        }
    }

    #[test]
    fn test_short_series_is_rejected_before_rendering() {
        let input = ChartInput {
            title: "t".to_string(),
            lines: vec![
                line("Polynomial", &[(0, 20.0), (5, 21.0)]),
                line("LSTM", &[(0, 20.0)]),
            ],
            current: None,
            marker: CurrentMarker::Line,
            size: (200, 100),
        };
        match render_chart(&input) {
            Err(ChartError::InsufficientData { label, got }) => {
                assert_eq!(label, "LSTM");
                assert_eq!(got, 1);
            }
            other => panic!("expected InsufficientData, got {other:?}"),
        }
    }

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

    fn sample_input(current: Option<f64>, marker: CurrentMarker) -> ChartInput {
        ChartInput {
            title: "Temperature Predictions".to_string(),
            lines: vec![
                line("Polynomial", &[(0, 20.1), (15, 20.9), (30, 21.4)]),
                line("LSTM", &[(0, 19.8), (15, 20.2), (30, 20.0)]),
            ],
            current,
            marker,
            size: (480, 320),
        }
    }

    #[test]
    fn test_renders_png_for_each_marker() {
        for marker in [CurrentMarker::Line, CurrentMarker::Point] {
            let png = render_chart(&sample_input(Some(20.6), marker)).expect("chart renders");
            assert!(png.starts_with(PNG_MAGIC), "{marker:?} did not produce a PNG");
        }
    }

    #[test]
    fn test_renders_png_without_current_value() {
        let png = render_chart(&sample_input(None, CurrentMarker::Line)).expect("chart renders");
        assert!(png.starts_with(PNG_MAGIC));
    }

    #[test]
    fn test_no_lines_is_rejected() {
        let input = ChartInput {
            title: "t".to_string(),
            lines: vec![],
            current: Some(20.0),
            marker: CurrentMarker::Point,
            size: (200, 100),
        };
        assert!(matches!(
            render_chart(&input),
            Err(ChartError::InsufficientData { got: 0, .. })
        ));
    }

    #[test]
    fn test_time_range_spans_all_lines() {
        let lines = vec![line("a", &[(5, 1.0), (10, 2.0)]), line("b", &[(0, 1.0), (7, 2.0)])];
        assert_eq!(time_range(&lines), Some((at(0), at(10))));
    }

    #[test]
    fn test_time_range_widens_single_instant() {
        let lines = vec![line("a", &[(5, 1.0), (5, 2.0)])];
        let (lo, hi) = time_range(&lines).expect("range");
        assert_eq!(hi - lo, Duration::minutes(2));
    }

    #[test]
    fn test_value_range_includes_current() {
        let lines = vec![line("a", &[(0, 20.0), (1, 30.0)])];
        let (lo, hi) = value_range(&lines, Some(40.0)).expect("range");
        assert!((lo - 18.0).abs() < 1e-9);
        assert!((hi - 42.0).abs() < 1e-9);
    }

    #[test]
    fn test_value_range_flat_data() {
        let lines = vec![line("a", &[(0, 20.0), (1, 20.0)])];
        assert_eq!(value_range(&lines, None), Some((19.5, 20.5)));
    }
}

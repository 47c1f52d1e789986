use std::fmt::Display;
use std::ops::Range;
use std::path::Path;

use log::debug;
use plotters::prelude::*;

use crate::color::generate_palette;
use crate::config::ImageConfig;
use crate::error::{AnalysisError, Result};

const LINE_WIDTH: u32 = 2;
const LINE_WIDTH_LEGEND: u32 = 3;

// ---------------------------------------------------------------------------
// Chart – pure description of one image
// ---------------------------------------------------------------------------

/// Labeled series drawn against a shared x axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chart {
    pub x: Vec<f64>,
    pub series: Vec<Vec<f64>>,
    pub labels: Vec<String>,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
}

impl Chart {
    pub fn new(
        title: impl Into<String>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
        x: Vec<f64>,
    ) -> Self {
        Self {
            x,
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, label: impl Into<String>, values: Vec<f64>) {
        self.labels.push(label.into());
        self.series.push(values);
    }

    /// Every series needs a label and one value per x position.
    pub fn validate(&self) -> Result<()> {
        if self.series.len() != self.labels.len() {
            return Err(AnalysisError::Validation(format!(
                "{} series but {} labels",
                self.series.len(),
                self.labels.len()
            )));
        }
        if self.series.is_empty() || self.x.is_empty() {
            return Err(AnalysisError::Validation("nothing to draw".to_string()));
        }
        if let Some((label, s)) = self
            .labels
            .iter()
            .zip(&self.series)
            .find(|(_, s)| s.len() != self.x.len())
        {
            return Err(AnalysisError::Validation(format!(
                "series '{label}' has {} points, x axis has {}",
                s.len(),
                self.x.len()
            )));
        }
        Ok(())
    }

    pub fn x_range(&self) -> Range<f64> {
        padded_range(self.x.iter().copied(), 0.0)
    }

    pub fn y_range(&self) -> Range<f64> {
        padded_range(self.series.iter().flatten().copied(), 0.05)
    }
}

/// Finite min..max of `values` widened by `pad` of the span.  A flat or
/// empty input gets a unit-wide range so the axis can still be drawn.
pub fn padded_range(values: impl Iterator<Item = f64>, pad: f64) -> Range<f64> {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if min > max {
        return 0.0..1.0;
    }
    let span = max - min;
    if span < 1e-9 {
        return (min - 0.5)..(max + 0.5);
    }
    (min - span * pad)..(max + span * pad)
}

// ---------------------------------------------------------------------------
// Plotter – renders a Chart to an image file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct Plotter {
    image: ImageConfig,
}

fn render_error(e: impl Display) -> AnalysisError {
    AnalysisError::Render(e.to_string())
}

impl Plotter {
    pub fn new(image: ImageConfig) -> Self {
        Self { image }
    }

    /// Draw `chart` with legend, title, axis labels and grid, and write it to
    /// `path` (created or overwritten).  The format follows the extension.
    pub fn render(&self, path: &Path, chart: &Chart) -> Result<()> {
        chart.validate()?;

        let (width, height) = (self.image.width, self.image.height);
        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        self.draw(&mut buffer, chart)?;

        image::save_buffer(path, &buffer, width, height, image::ColorType::Rgb8)
            .map_err(render_error)?;
        debug!("Wrote {} ({} series)", path.display(), chart.series.len());
        Ok(())
    }

    fn draw(&self, buffer: &mut [u8], chart: &Chart) -> Result<()> {
        let size = self.image.font_size;
        let font = f64::from(size);
        let root = BitMapBackend::with_buffer(buffer, (self.image.width, self.image.height))
            .into_drawing_area();
        root.fill(&WHITE).map_err(render_error)?;

        let mut ctx = ChartBuilder::on(&root)
            .caption(&chart.title, ("sans-serif", font * 1.5))
            .margin(size * 2)
            .x_label_area_size(size * 4)
            .y_label_area_size(size * 6)
            .build_cartesian_2d(chart.x_range(), chart.y_range())
            .map_err(render_error)?;

        ctx.configure_mesh()
            .x_desc(chart.x_label.as_str())
            .y_desc(chart.y_label.as_str())
            .label_style(("sans-serif", font))
            .axis_desc_style(("sans-serif", font))
            .draw()
            .map_err(render_error)?;

        let colors = generate_palette(chart.series.len());
        for ((values, label), color) in chart.series.iter().zip(&chart.labels).zip(colors) {
            let points = chart
                .x
                .iter()
                .zip(values)
                .filter(|(_, y)| y.is_finite())
                .map(|(&x, &y)| (x, y));
            ctx.draw_series(LineSeries::new(points, color.stroke_width(LINE_WIDTH)))
                .map_err(render_error)?
                .label(label.as_str())
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(LINE_WIDTH_LEGEND))
                });
        }

        ctx.configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .label_font(("sans-serif", font))
            .draw()
            .map_err(render_error)?;

        root.present().map_err(render_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart() -> Chart {
        let mut c = Chart::new("t", "time", "temp, °C", vec![0.0, 1.0, 2.0]);
        c.push("T#1", vec![1.0, 2.0, 3.0]);
        c
    }

    #[test]
    fn valid_chart() {
        assert!(chart().validate().is_ok());
    }

    #[test]
    fn label_count_mismatch() {
        let mut c = chart();
        c.labels.push("extra".to_string());
        assert!(matches!(c.validate(), Err(AnalysisError::Validation(_))));
    }

    #[test]
    fn series_length_mismatch() {
        let mut c = chart();
        c.push("dT#1", vec![1.0, 2.0]);
        assert!(matches!(c.validate(), Err(AnalysisError::Validation(_))));
    }

    #[test]
    fn empty_chart_is_rejected() {
        let c = Chart::new("t", "x", "y", vec![0.0]);
        assert!(matches!(c.validate(), Err(AnalysisError::Validation(_))));
    }

    #[test]
    fn render_validates_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.png");
        let mut c = chart();
        c.labels.clear();
        let err = Plotter::new(ImageConfig::default()).render(&path, &c).unwrap_err();
        assert!(matches!(err, AnalysisError::Validation(_)));
        assert!(!path.exists());
    }

    #[test]
    fn render_writes_readable_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.png");
        let plotter = Plotter::new(ImageConfig {
            width: 300,
            height: 200,
            font_size: 8,
        });

        let mut c = chart();
        c.push("T#2", vec![f64::NAN, 2.5, 1.0]);
        plotter.render(&path, &c).unwrap();
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (300, 200));

        // A second render replaces the file.
        let before = std::fs::read(&path).unwrap();
        plotter.render(&path, &chart()).unwrap();
        assert_ne!(std::fs::read(&path).unwrap(), before);
        assert!(image::open(&path).is_ok());
    }

    #[test]
    fn ranges() {
        let c = chart();
        assert_eq!(c.x_range(), 0.0..2.0);
        let y = c.y_range();
        assert!(y.start < 1.0 && y.end > 3.0);

        assert_eq!(padded_range([5.0, 5.0].into_iter(), 0.1), 4.5..5.5);
        assert_eq!(padded_range([f64::NAN].into_iter(), 0.1), 0.0..1.0);
    }
}

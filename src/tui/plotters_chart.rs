//! Plotters-powered development chart widget for Ratatui.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// A lightweight, render-only chart description.
///
/// All series and bounds are computed outside the render call.
pub struct AcphPlottersChart<'a> {
    /// Line series for the fitted curve (empty when there is no fit).
    pub curve: &'a [(f64, f64)],
    /// Rows that feed the pattern.
    pub included: &'a [(f64, f64)],
    /// Rows the user has excluded.
    pub excluded: &'a [(f64, f64)],
    /// Per-year pattern averages.
    pub pattern: &'a [(f64, f64)],
    /// Row under the cursor.
    pub cursor: Option<(f64, f64)>,
    /// X bounds (development years).
    pub x_bounds: [f64; 2],
    /// Y bounds (ACPH).
    pub y_bounds: [f64; 2],
    pub x_label: &'a str,
    pub y_label: &'a str,
    pub fmt_x: fn(f64) -> String,
    pub fmt_y: fn(f64) -> String,
}

impl<'a> Widget for AcphPlottersChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // When the available area is too small, Plotters may fail to build a chart.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let x0 = self.x_bounds[0];
        let x1 = self.x_bounds[1];
        let y0 = self.y_bounds[0];
        let y1 = self.y_bounds[1];

        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                // Terminal cells are low-res, so keep label areas compact.
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label)
                .y_desc(self.y_label)
                .x_labels(6)
                .y_labels(5)
                .x_label_formatter(&|v| (self.fmt_x)(*v))
                .y_label_formatter(&|v| (self.fmt_y)(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            let curve_color = RGBColor(0, 255, 255); // cyan
            let included_color = WHITE;
            let excluded_color = RGBColor(255, 0, 0); // red
            let pattern_color = RGBColor(0, 255, 0); // green
            let cursor_color = RGBColor(255, 255, 0); // yellow

            if self.curve.len() >= 2 {
                chart.draw_series(LineSeries::new(self.curve.iter().copied(), &curve_color))?;
            }

            // Pixels rather than `Circle` markers: the backend maps circle radii
            // to canvas units incorrectly and draws huge circles.
            chart.draw_series(
                self.included
                    .iter()
                    .map(|&(x, y)| Pixel::new((x, y), included_color)),
            )?;
            chart.draw_series(
                self.excluded
                    .iter()
                    .map(|&(x, y)| Pixel::new((x, y), excluded_color)),
            )?;
            chart.draw_series(
                self.pattern
                    .iter()
                    .map(|&(x, y)| Pixel::new((x, y), pattern_color)),
            )?;
            chart.draw_series(self.cursor.into_iter().map(|(x, y)| Pixel::new((x, y), cursor_color)))?;

            Ok(())
        });

        widget.render(area, buf);
    }
}

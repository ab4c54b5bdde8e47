//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - included rows: `o`
//! - excluded rows: `x`
//! - fitted curve: `-` line

use crate::domain::{DEV_HORIZON, FittedParameters, LabeledRow, PointStatus};
use crate::io::curve::CurveFile;
use crate::models::sample_curve;

/// Render the product view (and the curve, if fitted) on one grid.
pub fn render_ascii_plot(
    rows: &[LabeledRow],
    params: Option<&FittedParameters>,
    width: usize,
    height: usize,
) -> String {
    let (t_min, t_max) = dev_range(rows);
    let curve = params.map(|p| sample_curve(p, 0.0, f64::from(DEV_HORIZON), width.max(2) * 2));
    let points: Vec<(f64, f64, PointStatus)> = rows
        .iter()
        .map(|r| (f64::from(r.row.dev_year), r.row.acph, r.status))
        .collect();
    render_plot(&points, curve.as_deref(), t_min, t_max, width, height)
}

/// Render a plot from a saved curve JSON file (curve only).
pub fn render_ascii_plot_from_curve_file(curve: &CurveFile, width: usize, height: usize) -> String {
    let curve_points: Vec<(f64, f64)> = curve
        .grid
        .dev_year
        .iter()
        .zip(curve.grid.acph.iter())
        .map(|(&t, &y)| (t, y))
        .collect();
    let (t_min, t_max) = curve_dev_range(&curve_points).unwrap_or((0.0, f64::from(DEV_HORIZON)));

    let mut out = format!(
        "{} | A={:.4} B={:.4} C={:.4} | {} excluded points\n",
        curve.product,
        curve.parameters.a,
        curve.parameters.b,
        curve.parameters.c,
        curve.excluded_points.len()
    );
    out.push_str(&render_plot(&[], Some(&curve_points), t_min, t_max, width, height));
    out
}

fn render_plot(
    points: &[(f64, f64, PointStatus)],
    curve_points: Option<&[(f64, f64)]>,
    t_min: f64,
    t_max: f64,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (y_min, y_max) = y_range(points, curve_points).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Draw curve first (so points can overlay).
    if let Some(curve) = curve_points {
        draw_curve(&mut grid, curve, t_min, t_max, y_min, y_max);
    }

    for &(t, y, status) in points {
        if !y.is_finite() {
            continue;
        }
        let x = map_x(t, t_min, t_max, width);
        let yy = map_y(y, y_min, y_max, height);
        grid[yy][x] = match status {
            PointStatus::Included => 'o',
            PointStatus::Excluded => 'x',
        };
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: dev_year=[{t_min:.1}, {t_max:.1}] | acph=[{y_min:.2}, {y_max:.2}]\n"
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

/// Always covers `[0, DEV_HORIZON]`, widened to include early or late rows.
fn dev_range(rows: &[LabeledRow]) -> (f64, f64) {
    let mut min_t = 0.0_f64;
    let mut max_t = f64::from(DEV_HORIZON);
    for r in rows {
        min_t = min_t.min(f64::from(r.row.dev_year));
        max_t = max_t.max(f64::from(r.row.dev_year));
    }
    (min_t, max_t)
}

fn curve_dev_range(curve: &[(f64, f64)]) -> Option<(f64, f64)> {
    let mut min_t = f64::INFINITY;
    let mut max_t = f64::NEG_INFINITY;
    for &(t, _) in curve {
        min_t = min_t.min(t);
        max_t = max_t.max(t);
    }
    if min_t.is_finite() && max_t.is_finite() && max_t > min_t {
        Some((min_t, max_t))
    } else {
        None
    }
}

fn y_range(points: &[(f64, f64, PointStatus)], curve: Option<&[(f64, f64)]>) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    let curve_ys = curve.into_iter().flatten().map(|&(_, y)| y);
    for y in points.iter().map(|&(_, y, _)| y).chain(curve_ys) {
        if y.is_finite() {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], t_min: f64, t_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(t, y) in curve.iter().filter(|(_, y)| y.is_finite()) {
        let x = map_x(t, t_min, t_max, width);
        let yy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, x, yy, '-');
        } else {
            grid[yy][x] = '-';
        }
        prev = Some((x, yy));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

//! Ratatui-based terminal UI: the interactive excluder.
//!
//! Left: the product view, one row per `(CohortYear, DevYear)` bucket, with a
//! cursor. Right: the chart (included/excluded rows, pattern, fitted curve)
//! and the parameter panel. Every key that changes state goes through the
//! `Session`, which recomputes the analysis before the next draw.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};
use tracing::debug;

use crate::app::pipeline::Analysis;
use crate::app::session::Session;
use crate::domain::{DEV_HORIZON, PointStatus};
use crate::error::AppError;
use crate::fit::FitOutcome;
use crate::models::sample_curve;

mod plotters_chart;

use plotters_chart::AcphPlottersChart;

/// Start the TUI on an already-built session.
pub fn run(session: Session) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::internal(format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(session);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::internal(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::internal(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    session: Session,
    cursor: usize,
    status: String,
}

impl App {
    fn new(session: Session) -> Self {
        let status = if session.dataset().table().is_empty() {
            "No data found. Run `acph demo --out <dir>` and pass --data-dir.".to_string()
        } else {
            format!("{} rows loaded.", session.dataset().table().len())
        };
        Self {
            session,
            cursor: 0,
            status,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::internal(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::internal(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::internal(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Apply one key press; returns `true` to quit.
    ///
    /// Persistence failures land in the status line; they never end the session.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        let rows = self.session.analysis().view.len();
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Left | KeyCode::Right => {
                let current = self.session.product();
                let next = if code == KeyCode::Right { current.next() } else { current.prev() };
                self.session.select_product(next);
                self.cursor = 0;
                self.status = format!("product: {next}");
            }
            KeyCode::Up => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.cursor + 1 < rows {
                    self.cursor += 1;
                }
            }
            KeyCode::PageUp => {
                self.cursor = self.cursor.saturating_sub(10);
            }
            KeyCode::PageDown => {
                self.cursor = (self.cursor + 10).min(rows.saturating_sub(1));
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                if rows > 0 {
                    let excluded = self.session.toggle_row(self.cursor);
                    self.status = format!(
                        "row {} {}",
                        self.cursor,
                        if excluded { "excluded" } else { "included" }
                    );
                }
            }
            KeyCode::Char('c') => {
                self.session.clear_mask();
                self.status = "exclusions cleared".to_string();
            }
            KeyCode::Char('s') => {
                self.status = match self.session.save_exclusions() {
                    Ok(report) => format!("{}!", report.message()),
                    Err(err) => format!("Save failed: {err}"),
                };
            }
            KeyCode::Char('l') => {
                self.status = match self.session.load_saved_exclusions() {
                    Ok(report) if report.missing.is_empty() => {
                        format!("Loaded {} saved exclusions for {}", report.restored, report.product)
                    }
                    Ok(report) => format!(
                        "Loaded {} saved exclusions for {} ({} no longer match a row)",
                        report.restored,
                        report.product,
                        report.missing.len()
                    ),
                    Err(err) => format!("Load failed: {err}"),
                };
            }
            _ => {}
        }
        debug!(?code, cursor = self.cursor, product = %self.session.product(), "key handled");
        false
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let analysis = self.session.analysis();
        let source = self
            .session
            .dataset()
            .summary()
            .data_dir
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| "no data".to_string());

        let lines = vec![
            Line::from(vec![
                Span::styled("acph", Style::default().fg(Color::Cyan)),
                Span::raw(" · claims development curves · "),
                Span::styled(
                    analysis.product.display_name(),
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(Span::styled(
                format!(
                    "data: {source} | rows: {} | included: {} | pattern points: {} | fit: {}",
                    analysis.view.len(),
                    analysis.included_count(),
                    analysis.pattern.len(),
                    analysis.fit.status_label(),
                ),
                Style::default().fg(Color::Gray),
            )),
        ];

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(44), Constraint::Min(0)])
            .split(area);

        self.draw_rows(frame, columns[0]);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(7)])
            .split(columns[1]);

        self.draw_chart(frame, right[0]);
        self.draw_parameters(frame, right[1]);
    }

    fn draw_rows(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let analysis = self.session.analysis();
        let items: Vec<ListItem> = analysis
            .labeled
            .iter()
            .map(|r| {
                let style = match r.status {
                    PointStatus::Included => Style::default(),
                    PointStatus::Excluded => Style::default().fg(Color::Red).add_modifier(Modifier::CROSSED_OUT),
                };
                ListItem::new(format!(
                    "{:>3} {} d{:<3} {:>10.3} {}",
                    r.position,
                    r.row.cohort_year,
                    r.row.dev_year,
                    r.row.acph,
                    if r.status == PointStatus::Excluded { "x" } else { " " },
                ))
                .style(style)
            })
            .collect();

        let title = format!("Rows ({} excluded)", analysis.mask.in_range(analysis.view.len()).count());
        let list = List::new(items)
            .block(Block::default().title(title).borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        if !analysis.view.is_empty() {
            state.select(Some(self.cursor.min(analysis.view.len() - 1)));
        }
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("ACPH by development year").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let analysis = self.session.analysis();
        if analysis.view.is_empty() {
            let msg = Paragraph::new("No rows for this product.")
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default());
            frame.render_widget(msg, inner);
            return;
        }

        let series = chart_series(analysis, self.cursor);

        let (chart_rect, insets) = chart_layout(inner);
        let widget = AcphPlottersChart {
            curve: &series.curve,
            included: &series.included,
            excluded: &series.excluded,
            pattern: &series.pattern,
            cursor: series.cursor,
            x_bounds: series.x_bounds,
            y_bounds: series.y_bounds,
            x_label: "dev year",
            y_label: "acph",
            fmt_x: fmt_axis_x,
            fmt_y: fmt_axis_y,
        };

        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, series.x_bounds, series.y_bounds);
        }
    }

    fn draw_parameters(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let analysis = self.session.analysis();
        let lines: Vec<Line> = match &analysis.fit {
            FitOutcome::Fitted { params, .. } => vec![
                Line::from(format!("A = {:.4}", params.a)),
                Line::from(format!("B = {:.4}", params.b)),
                Line::from(format!("C = {:.4}", params.c)),
                Line::from(Span::styled(analysis.fit.status_label(), Style::default().fg(Color::Green))),
            ],
            FitOutcome::InsufficientPoints { .. } => vec![Line::from(Span::styled(
                analysis.fit.status_label(),
                Style::default().fg(Color::Yellow),
            ))],
            FitOutcome::Failed(reason) => vec![
                Line::from(Span::styled(
                    analysis.fit.status_label(),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(reason.to_string(), Style::default().fg(Color::Gray))),
            ],
        };

        let p = Paragraph::new(Text::from(lines))
            .block(Block::default().title("Parameters").borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "←/→ product  ↑/↓ row  space toggle  c clear  s save  l load saved  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Series and bounds for the chart widget.
struct ChartSeries {
    curve: Vec<(f64, f64)>,
    included: Vec<(f64, f64)>,
    excluded: Vec<(f64, f64)>,
    pattern: Vec<(f64, f64)>,
    cursor: Option<(f64, f64)>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

fn chart_series(analysis: &Analysis, cursor: usize) -> ChartSeries {
    let mut included = Vec::new();
    let mut excluded = Vec::new();
    for r in &analysis.labeled {
        let pt = (f64::from(r.row.dev_year), r.row.acph);
        match r.status {
            PointStatus::Included => included.push(pt),
            PointStatus::Excluded => excluded.push(pt),
        }
    }
    let pattern: Vec<(f64, f64)> = analysis
        .pattern
        .points()
        .iter()
        .map(|p| (f64::from(p.dev_year), p.avg_acph))
        .collect();
    let cursor = analysis
        .labeled
        .get(cursor)
        .map(|r| (f64::from(r.row.dev_year), r.row.acph));
    let curve = analysis
        .fit
        .params()
        .map(|p| sample_curve(p, 0.0, f64::from(DEV_HORIZON), 200))
        .unwrap_or_default();

    let (mut x_min, mut x_max) = (0.0_f64, f64::from(DEV_HORIZON));
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(x, y) in included.iter().chain(&excluded).chain(&curve) {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        if y.is_finite() {
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
    }

    if !y_min.is_finite() || !y_max.is_finite() || y_max <= y_min {
        y_min = 0.0;
        y_max = 1.0;
    }
    let pad = ((y_max - y_min).abs() * 0.05).max(1e-12);

    ChartSeries {
        curve,
        included,
        excluded,
        pattern,
        cursor,
        x_bounds: [x_min - 0.25, x_max + 0.25],
        y_bounds: [y_min - pad, y_max + pad],
    }
}

fn fmt_axis_x(v: f64) -> String {
    format!("{v:.0}")
}

fn fmt_axis_y(v: f64) -> String {
    format!("{v:.1}")
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10 || inner.height <= insets.top + insets.bottom + 5 {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x_val = x_bounds[0] + u * (x_bounds[1] - x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = format!("{x_val:.1}");
        let label_len = label.len() as u16;
        let start = x.saturating_sub((label.len() / 2) as u16);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = format!("{y_val:.1}");
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label.len() as u16);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new("development year")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }

    let y_label = Paragraph::new("acph").style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: insets.left.saturating_sub(1),
        height: 1,
    };
    frame.render_widget(y_label, y_rect);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::data::Dataset;
    use crate::domain::{AcphRow, ProductType};
    use crate::engine::AcphTable;
    use crate::fit::FitOptions;
    use crate::io::assumptions::AssumptionStore;

    fn app(dir: &tempfile::TempDir) -> App {
        let table = AcphTable::from_rows(
            [40.0, 55.0, 48.0, 30.0, 15.0]
                .iter()
                .enumerate()
                .map(|(i, &acph)| AcphRow {
                    cohort_year: 2015,
                    dev_year: i as i32 + 1,
                    product_type: ProductType::Detached,
                    total_claims: acph * 10.0,
                    total_homes: 10.0,
                    acph,
                })
                .collect(),
        );
        let dataset = Arc::new(Dataset::from_table(table));
        let store = AssumptionStore::new(dir.path().join("assumptions.json"));
        App::new(Session::new(dataset, store, FitOptions::default()))
    }

    #[test]
    fn cursor_stays_inside_the_view() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        app.handle_key(KeyCode::Up);
        assert_eq!(app.cursor, 0);
        for _ in 0..10 {
            app.handle_key(KeyCode::Down);
        }
        assert_eq!(app.cursor, 4);
    }

    #[test]
    fn space_toggles_and_s_saves() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        app.handle_key(KeyCode::Char(' '));
        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Char(' '));
        assert_eq!(app.session.mask().len(), 2);

        app.handle_key(KeyCode::Char('s'));
        assert_eq!(app.status, "Saved 2 exclusions for Detached!");

        app.handle_key(KeyCode::Char('c'));
        assert!(app.session.mask().is_empty());
        app.handle_key(KeyCode::Char('l'));
        assert_eq!(app.session.mask().len(), 2);
    }

    #[test]
    fn product_switch_resets_cursor_and_quit_key_quits() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        app.handle_key(KeyCode::Down);
        assert!(!app.handle_key(KeyCode::Right));
        assert_eq!(app.session.product(), ProductType::SemiDetached);
        assert_eq!(app.cursor, 0);
        assert!(app.session.analysis().view.is_empty());
        // Toggling on an empty view is a no-op.
        app.handle_key(KeyCode::Char(' '));
        assert!(app.session.mask().is_empty());
        assert!(app.handle_key(KeyCode::Char('q')));
    }

    #[test]
    fn chart_series_splits_by_status() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        app.handle_key(KeyCode::Char(' '));
        let series = chart_series(app.session.analysis(), 0);
        assert_eq!(series.included.len(), 4);
        assert_eq!(series.excluded, vec![(1.0, 40.0)]);
        assert_eq!(series.cursor, Some((1.0, 40.0)));
        assert!(series.x_bounds[0] < 0.0 && series.x_bounds[1] > 10.0);
    }
}

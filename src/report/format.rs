//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the aggregation/fitting code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::Analysis;
use crate::data::Dataset;
use crate::domain::{FittedParameters, LabeledRow, PatternPoint};
use crate::fit::FitOutcome;
use crate::models::predict;

/// Header block: data source, product and mask summary.
pub fn format_run_summary(dataset: &Dataset, analysis: &Analysis) -> String {
    let mut out = String::new();
    let summary = dataset.summary();
    let stats = dataset.stats();

    out.push_str("=== acph - Claims Development Curve ===\n");
    match &summary.data_dir {
        Some(dir) => out.push_str(&format!(
            "Data: {} | policies={}/{} claims={}/{} (used/read)\n",
            dir.display(),
            summary.policies_used,
            summary.policies_read,
            summary.claims_used,
            summary.claims_read,
        )),
        None => out.push_str("Data: none found (empty table)\n"),
    }
    if !summary.row_errors.is_empty() {
        out.push_str(&format!("Skipped rows: {}\n", summary.row_errors.len()));
    }
    if stats.orphan_claims > 0 || !stats.zero_exposure_cohorts.is_empty() {
        out.push_str(&format!(
            "Dropped: {} orphan claims, {} zero-exposure cohorts\n",
            stats.orphan_claims,
            stats.zero_exposure_cohorts.len()
        ));
    }
    out.push_str(&format!("Product: {}\n", analysis.product));
    out.push_str(&format!(
        "Rows: {} | included={} excluded={}\n",
        analysis.view.len(),
        analysis.included_count(),
        analysis.view.len() - analysis.included_count(),
    ));
    out.push('\n');
    out
}

/// The product view with each row's position and status.
pub fn format_rows(rows: &[LabeledRow]) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!(
            "{:>4} {:>6} {:>4} {:>14} {:>10} {:>10} {:<8}",
            "#", "cohort", "dev", "claims", "homes", "acph", "status"
        ),
    );
    push_line(
        &mut out,
        format!("{:-<4} {:-<6} {:-<4} {:-<14} {:-<10} {:-<10} {:-<8}", "", "", "", "", "", "", ""),
    );

    if rows.is_empty() {
        out.push_str("(no rows)\n");
        return out;
    }

    for r in rows {
        push_line(
            &mut out,
            format!(
                "{:>4} {:>6} {:>4} {:>14.2} {:>10.1} {:>10.4} {:<8}",
                r.position,
                r.row.cohort_year,
                r.row.dev_year,
                r.row.total_claims,
                r.row.total_homes,
                r.row.acph,
                r.status.label(),
            ),
        );
    }
    out
}

/// Average pattern, with fitted values when a curve exists.
pub fn format_pattern(points: &[PatternPoint], params: Option<&FittedParameters>) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!("{:>4} {:>12} {:>8} {:>12}", "dev", "avg_acph", "cohorts", "fitted"),
    );
    push_line(&mut out, format!("{:-<4} {:-<12} {:-<8} {:-<12}", "", "", "", ""));

    for p in points {
        let fitted = params
            .map(|params| format!("{:.4}", predict(params, f64::from(p.dev_year))))
            .unwrap_or_default();
        push_line(
            &mut out,
            format!("{:>4} {:>12.4} {:>8} {:>12}", p.dev_year, p.avg_acph, p.cohorts, fitted),
        );
    }
    out
}

/// Parameter table, or the reason there is none.
pub fn format_parameters(fit: &FitOutcome) -> String {
    let mut out = String::new();
    match fit {
        FitOutcome::Fitted { params, .. } => {
            out.push_str("Parameters: f(t) = A * t^B * exp(-C * t), t floored at 0.1\n");
            out.push_str(&format!("  A = {:.6}\n", params.a));
            out.push_str(&format!("  B = {:.6}\n", params.b));
            out.push_str(&format!("  C = {:.6}\n", params.c));
        }
        FitOutcome::InsufficientPoints { .. } => {
            out.push_str(&format!("Parameters: {}\n", fit.status_label()));
        }
        FitOutcome::Failed(reason) => {
            out.push_str(&format!("Parameters: {} ({reason})\n", fit.status_label()));
        }
    }
    out
}

/// Everything `acph fit` prints before the optional plot.
pub fn format_analysis(dataset: &Dataset, analysis: &Analysis) -> String {
    let mut out = format_run_summary(dataset, analysis);
    out.push_str("Rows:\n");
    out.push_str(&format_rows(&analysis.labeled));
    out.push_str("\nPattern (DevYear <= 10, included rows):\n");
    out.push_str(&format_pattern(analysis.pattern.points(), analysis.fit.params()));
    out.push('\n');
    out.push_str(&format_parameters(&analysis.fit));
    out
}

fn push_line(out: &mut String, line: String) {
    out.push_str(line.trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AcphRow, PointStatus, ProductType};
    use crate::fit::FitFailure;

    fn labeled(position: usize, status: PointStatus) -> LabeledRow {
        LabeledRow {
            position,
            row: AcphRow {
                cohort_year: 2015,
                dev_year: position as i32,
                product_type: ProductType::Flat,
                total_claims: 1234.5,
                total_homes: 100.0,
                acph: 12.345,
            },
            status,
        }
    }

    #[test]
    fn rows_table_shows_status() {
        let table = format_rows(&[labeled(0, PointStatus::Included), labeled(1, PointStatus::Excluded)]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].ends_with("Included"));
        assert!(lines[3].ends_with("Excluded"));
        assert!(lines[3].contains("12.3450"));
    }

    #[test]
    fn empty_rows_table_says_so() {
        assert!(format_rows(&[]).contains("(no rows)"));
    }

    #[test]
    fn parameters_report_absence() {
        let failed = format_parameters(&FitOutcome::Failed(FitFailure::Stalled));
        assert!(failed.contains("Fit Failed"));
        let short = format_parameters(&FitOutcome::InsufficientPoints { found: 2 });
        assert!(short.contains("Not enough points"));
    }

    #[test]
    fn parameters_table_lists_abc() {
        let fit = FitOutcome::Fitted {
            params: FittedParameters { a: 108.6, b: 1.99, c: 1.015 },
            sse: 12.0,
            evaluations: 29,
        };
        let text = format_parameters(&fit);
        assert!(text.contains("A = 108.600000"));
        assert!(text.contains("C = 1.015000"));
        assert!(!text.contains("SSE"));
        assert!(!text.contains("evaluations"));
    }

    #[test]
    fn pattern_without_fit_leaves_columns_blank() {
        let points = [PatternPoint { dev_year: 3, avg_acph: 4.5, cohorts: 2 }];
        let text = format_pattern(&points, None);
        assert_eq!(text.lines().nth(2), Some("   3       4.5000        2"));
    }
}

//! Export labelled ACPH rows to CSV.
//!
//! One line per row of the product view, in view order, so the file can be
//! reviewed in a spreadsheet alongside the exclusions that produced a curve.

use std::path::Path;

use serde::Serialize;

use crate::domain::LabeledRow;
use crate::error::AppError;

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    product: &'a str,
    cohort_year: i32,
    dev_year: i32,
    acph: f64,
    status: &'a str,
}

/// Write labelled rows to a CSV file.
pub fn write_rows_csv(path: &Path, rows: &[LabeledRow]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::input(format!("Failed to create export CSV '{}': {e}", path.display())))?;

    for r in rows {
        writer
            .serialize(ExportRow {
                product: r.row.product_type.display_name(),
                cohort_year: r.row.cohort_year,
                dev_year: r.row.dev_year,
                acph: r.row.acph,
                status: r.status.label(),
            })
            .map_err(|e| AppError::input(format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::input(format!("Failed to write export CSV: {e}")))?;
    Ok(())
}

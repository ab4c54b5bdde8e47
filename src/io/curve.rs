//! Read/write curve JSON files.
//!
//! Curve JSON is the portable form of one fitted development curve:
//! - product and parameters `(A, B, C)`
//! - the exclusions in force when it was fitted
//! - a precomputed grid over `DevYear ∈ [0, 10]` for quick plotting

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{DEV_HORIZON, ExcludedPoint, FittedParameters, ProductType};
use crate::error::AppError;
use crate::models::sample_curve;

/// Points written to the grid.
pub const CURVE_GRID_POINTS: usize = 101;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveGrid {
    pub dev_year: Vec<f64>,
    pub acph: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveFile {
    pub tool: String,
    pub product: ProductType,
    pub parameters: FittedParameters,
    pub excluded_points: Vec<ExcludedPoint>,
    pub grid: CurveGrid,
}

impl CurveFile {
    pub fn new(product: ProductType, parameters: FittedParameters, excluded_points: Vec<ExcludedPoint>) -> Self {
        let (dev_year, acph) = sample_curve(&parameters, 0.0, f64::from(DEV_HORIZON), CURVE_GRID_POINTS)
            .into_iter()
            .unzip();
        Self {
            tool: "acph".to_string(),
            product,
            parameters,
            excluded_points,
            grid: CurveGrid { dev_year, acph },
        }
    }
}

/// Write a curve JSON file.
pub fn write_curve_json(path: &Path, curve: &CurveFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create curve JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, curve)
        .map_err(|e| AppError::input(format!("Failed to write curve JSON: {e}")))?;

    Ok(())
}

/// Read a curve JSON file.
pub fn read_curve_json(path: &Path) -> Result<CurveFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open curve JSON '{}': {e}", path.display())))?;
    let curve: CurveFile =
        serde_json::from_reader(file).map_err(|e| AppError::input(format!("Invalid curve JSON: {e}")))?;
    if curve.grid.dev_year.len() != curve.grid.acph.len() {
        return Err(AppError::input("Invalid curve JSON: grid columns differ in length"));
    }
    Ok(curve)
}

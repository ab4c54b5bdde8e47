//! The assumption file: persisted exclusions keyed by product.
//!
//! Layout (pretty-printed JSON):
//!
//! ```json
//! {
//!   "products": {
//!     "Detached": {
//!       "excluded_points": [{ "CohortYear": 2015, "DevYear": 0 }]
//!     }
//!   }
//! }
//! ```
//!
//! Keys this tool does not know about (top level or per product) are kept
//! verbatim on rewrite. A save writes the whole document to a sibling temp
//! file and renames it over the target, so a failed write leaves the previous
//! file intact.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::domain::{ExcludedPoint, ProductType};
use crate::error::AppError;

pub const DEFAULT_ASSUMPTIONS_FILE: &str = "assumptions.json";

/// Persisted settings for one product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductAssumptions {
    #[serde(default)]
    pub excluded_points: Vec<ExcludedPoint>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The whole assumption document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssumptionFile {
    #[serde(default)]
    pub products: BTreeMap<String, ProductAssumptions>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AssumptionFile {
    pub fn excluded_for(&self, product: ProductType) -> &[ExcludedPoint] {
        self.products
            .get(product.display_name())
            .map(|p| p.excluded_points.as_slice())
            .unwrap_or(&[])
    }

    /// Replace one product's exclusion list, leaving everything else alone.
    pub fn set_excluded(&mut self, product: ProductType, points: Vec<ExcludedPoint>) {
        self.products
            .entry(product.display_name().to_string())
            .or_default()
            .excluded_points = points;
    }
}

/// Handle on the assumption file location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumptionStore {
    path: PathBuf,
}

impl AssumptionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document, or a fresh empty one if the file does not exist yet.
    pub fn load(&self) -> Result<AssumptionFile, AppError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no assumption file yet");
                return Ok(AssumptionFile::default());
            }
            Err(e) => {
                return Err(AppError::input(format!(
                    "Failed to read assumptions '{}': {e}",
                    self.path.display()
                )));
            }
        };

        if text.trim().is_empty() {
            return Ok(AssumptionFile::default());
        }

        serde_json::from_str(&text).map_err(|e| {
            AppError::input(format!("Invalid assumptions JSON '{}': {e}", self.path.display()))
        })
    }

    /// Persisted exclusions for `product` (empty if none were ever saved).
    pub fn excluded_for(&self, product: ProductType) -> Result<Vec<ExcludedPoint>, AppError> {
        Ok(self.load()?.excluded_for(product).to_vec())
    }

    /// Replace `product`'s exclusions and write the document back.
    ///
    /// Returns the number of points saved; zero is a valid save that clears
    /// the product's list.
    pub fn save(&self, product: ProductType, points: Vec<ExcludedPoint>) -> Result<usize, AppError> {
        let mut doc = self.load()?;
        let count = points.len();
        doc.set_excluded(product, points);
        self.write(&doc)?;
        info!(%product, count, path = %self.path.display(), "saved exclusions");
        Ok(count)
    }

    fn write(&self, doc: &AssumptionFile) -> Result<(), AppError> {
        let tmp = self.temp_path();
        let write_err =
            |e: std::io::Error| AppError::input(format!("Failed to write assumptions '{}': {e}", tmp.display()));

        {
            let file = File::create(&tmp).map_err(write_err)?;
            let mut out = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut out, doc)
                .map_err(|e| AppError::input(format!("Failed to serialize assumptions: {e}")))?;
            out.write_all(b"\n").map_err(write_err)?;
            out.flush().map_err(write_err)?;
        }

        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            AppError::input(format!("Failed to replace assumptions '{}': {e}", self.path.display()))
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_ASSUMPTIONS_FILE.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

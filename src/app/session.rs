//! One user's working state: selected product, exclusion mask, cached analysis.
//!
//! Every mutating call recomputes the analysis before returning, so readers
//! never see a mask and a fit that disagree.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::app::pipeline::{Analysis, analyze};
use crate::data::Dataset;
use crate::domain::{ExcludedPoint, ProductType};
use crate::engine::{ExclusionMask, excluded_points, mask_from_points};
use crate::error::AppError;
use crate::fit::FitOptions;
use crate::io::assumptions::AssumptionStore;

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub product: ProductType,
    pub count: usize,
    pub path: PathBuf,
}

impl SaveReport {
    pub fn message(&self) -> String {
        format!("Saved {} exclusions for {}", self.count, self.product)
    }
}

/// Result of restoring persisted exclusions into the current view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub product: ProductType,
    pub restored: usize,
    /// Persisted points that no longer match a row.
    pub missing: Vec<ExcludedPoint>,
}

#[derive(Debug)]
pub struct Session {
    dataset: Arc<Dataset>,
    store: AssumptionStore,
    opts: FitOptions,
    analysis: Analysis,
}

impl Session {
    /// Start on the first product that has data (or the first product at all).
    pub fn new(dataset: Arc<Dataset>, store: AssumptionStore, opts: FitOptions) -> Self {
        let product = dataset
            .table()
            .products()
            .first()
            .copied()
            .unwrap_or(ProductType::ALL[0]);
        let analysis = analyze(dataset.table(), product, &ExclusionMask::new(), &opts);
        Self {
            dataset,
            store,
            opts,
            analysis,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn store(&self) -> &AssumptionStore {
        &self.store
    }

    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    pub fn product(&self) -> ProductType {
        self.analysis.product
    }

    pub fn mask(&self) -> &ExclusionMask {
        &self.analysis.mask
    }

    /// Switch product. Positions mean nothing in another view, so the mask is reset.
    pub fn select_product(&mut self, product: ProductType) {
        self.recompute(product, ExclusionMask::new());
    }

    /// Flip one row; returns `true` if it is now excluded.
    ///
    /// Positions outside the view are ignored and return `false`.
    pub fn toggle_row(&mut self, position: usize) -> bool {
        if position >= self.analysis.view.len() {
            return false;
        }
        let mut mask = self.analysis.mask.clone();
        let excluded = mask.toggle(position);
        self.recompute(self.product(), mask);
        excluded
    }

    /// Replace the mask wholesale. Out-of-range positions are dropped.
    pub fn set_mask(&mut self, mut mask: ExclusionMask) {
        mask.retain_in_range(self.analysis.view.len());
        self.recompute(self.product(), mask);
    }

    pub fn clear_mask(&mut self) {
        self.recompute(self.product(), ExclusionMask::new());
    }

    /// Persist the current exclusions for the current product.
    ///
    /// A failed write is returned as an error and nothing reports success.
    pub fn save_exclusions(&self) -> Result<SaveReport, AppError> {
        let points = excluded_points(&self.analysis.view, &self.analysis.mask);
        let count = self.store.save(self.product(), points)?;
        Ok(SaveReport {
            product: self.product(),
            count,
            path: self.store.path().to_path_buf(),
        })
    }

    /// Replace the mask with the persisted exclusions for the current product.
    pub fn load_saved_exclusions(&mut self) -> Result<LoadReport, AppError> {
        let points = self.store.excluded_for(self.product())?;
        let restored = mask_from_points(&self.analysis.view, &points);
        if !restored.missing.is_empty() {
            warn!(
                product = %self.product(),
                missing = restored.missing.len(),
                "saved exclusions no longer match rows; ignored"
            );
        }
        let report = LoadReport {
            product: self.product(),
            restored: restored.mask.len(),
            missing: restored.missing,
        };
        self.recompute(self.product(), restored.mask);
        info!(product = %report.product, restored = report.restored, "loaded saved exclusions");
        Ok(report)
    }

    fn recompute(&mut self, product: ProductType, mask: ExclusionMask) {
        self.analysis = analyze(self.dataset.table(), product, &mask, &self.opts);
    }
}

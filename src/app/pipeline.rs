//! Shared analysis pipeline used by the CLI commands, the session and the TUI.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! product view -> mask -> clean rows -> pattern -> fit
//!
//! Front-ends only decide how to present an `Analysis`.

use tracing::debug;

use crate::domain::{DEV_HORIZON, LabeledRow, ProductType};
use crate::engine::{AcphTable, ExclusionMask, Pattern, ProductView, label_rows, reduce_pattern, select_included};
use crate::fit::{FitOptions, FitOutcome, fit_pattern};
use crate::models::sample_curve;

/// Everything derived from one `(product, mask)` state.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub product: ProductType,
    pub view: ProductView,
    pub mask: ExclusionMask,
    pub labeled: Vec<LabeledRow>,
    pub pattern: Pattern,
    pub fit: FitOutcome,
}

impl Analysis {
    pub fn included_count(&self) -> usize {
        self.view.len() - self.mask.in_range(self.view.len()).count()
    }

    /// Sampled fitted curve over `[0, DEV_HORIZON]`, if there is one.
    pub fn overlay(&self, n: usize) -> Option<Vec<(f64, f64)>> {
        self.fit
            .params()
            .map(|p| sample_curve(p, 0.0, f64::from(DEV_HORIZON), n))
    }
}

/// Recompute every derived value for `product` under `mask`.
pub fn analyze(table: &AcphTable, product: ProductType, mask: &ExclusionMask, opts: &FitOptions) -> Analysis {
    let view = table.product_view(product);
    let labeled = label_rows(&view, mask);
    let included = select_included(&view, mask);
    let pattern = reduce_pattern(&included);
    let fit = fit_pattern(pattern.points(), opts);

    debug!(
        %product,
        rows = view.len(),
        included = included.len(),
        pattern_points = pattern.len(),
        status = %fit.status_label(),
        "analysis recomputed"
    );

    Analysis {
        product,
        view,
        mask: mask.clone(),
        labeled,
        pattern,
        fit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AcphRow, FittedParameters, PointStatus};
    use crate::models::predict;

    fn table_from(product: ProductType, truth: FittedParameters, cohorts: i32) -> AcphTable {
        let mut rows = Vec::new();
        for cohort in 0..cohorts {
            for dev in 0..=(12 - cohort) {
                let acph = predict(&truth, f64::from(dev));
                rows.push(AcphRow {
                    cohort_year: 2010 + cohort,
                    dev_year: dev,
                    product_type: product,
                    total_claims: acph * 100.0,
                    total_homes: 100.0,
                    acph,
                });
            }
        }
        AcphTable::from_rows(rows)
    }

    #[test]
    fn clean_data_recovers_its_curve() {
        let truth = FittedParameters { a: 120.0, b: 1.5, c: 0.8 };
        let table = table_from(ProductType::Detached, truth, 4);
        let analysis = analyze(&table, ProductType::Detached, &ExclusionMask::new(), &FitOptions::default());

        assert_eq!(analysis.pattern.len(), 11, "dev years 0..=10");
        let params = analysis.fit.params().expect("exact data should fit");
        assert!((params.a - truth.a).abs() < 1e-3);
        assert!((params.c - truth.c).abs() < 1e-6);
        assert_eq!(analysis.overlay(50).map(|c| c.len()), Some(50));
    }

    #[test]
    fn other_products_are_not_in_the_view() {
        let table = table_from(ProductType::Flat, FittedParameters { a: 60.0, b: 1.2, c: 0.7 }, 2);
        let analysis = analyze(&table, ProductType::Detached, &ExclusionMask::new(), &FitOptions::default());
        assert!(analysis.view.is_empty());
        assert!(analysis.pattern.is_empty());
        assert_eq!(analysis.fit, FitOutcome::InsufficientPoints { found: 0 });
        assert!(analysis.overlay(10).is_none());
    }

    #[test]
    fn mask_changes_labels_and_pattern() {
        let truth = FittedParameters { a: 90.0, b: 1.8, c: 0.9 };
        let table = table_from(ProductType::SemiDetached, truth, 3);
        let mask = ExclusionMask::from_positions([0, 1, 999]);
        let analysis = analyze(&table, ProductType::SemiDetached, &mask, &FitOptions::default());

        assert_eq!(analysis.labeled[0].status, PointStatus::Excluded);
        assert_eq!(analysis.labeled[2].status, PointStatus::Included);
        assert_eq!(analysis.included_count(), analysis.view.len() - 2);
        let first = analysis.pattern.points().iter().find(|p| p.dev_year == 0).unwrap();
        assert_eq!(first.cohorts, 2);
    }
}

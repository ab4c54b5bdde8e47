//! Exclusion masks and the clean (included) subset of a product view.
//!
//! A mask is a set of row positions in the current `ProductView`. Positions can
//! go stale when the view changes underneath them (e.g. after a product switch);
//! stale positions are ignored everywhere rather than treated as errors.

use std::collections::BTreeSet;

use crate::domain::{AcphRow, ExcludedPoint, LabeledRow, PointStatus};
use crate::engine::aggregate::ProductView;

/// Row positions to exclude from the current product view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionMask {
    positions: BTreeSet<usize>,
}

impl ExclusionMask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_positions(positions: impl IntoIterator<Item = usize>) -> Self {
        Self {
            positions: positions.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn contains(&self, position: usize) -> bool {
        self.positions.contains(&position)
    }

    pub fn insert(&mut self, position: usize) {
        self.positions.insert(position);
    }

    pub fn remove(&mut self, position: usize) {
        self.positions.remove(&position);
    }

    /// Flip a position; returns `true` if it is now excluded.
    pub fn toggle(&mut self, position: usize) -> bool {
        if self.positions.remove(&position) {
            false
        } else {
            self.positions.insert(position);
            true
        }
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.positions.iter().copied()
    }

    /// Positions that actually address a row in a view of `len` rows.
    pub fn in_range(&self, len: usize) -> impl Iterator<Item = usize> + '_ {
        self.positions.range(..len).copied()
    }

    /// Drop positions that do not address a row in a view of `len` rows.
    pub fn retain_in_range(&mut self, len: usize) {
        self.positions.retain(|&p| p < len);
    }
}

/// Rows of `view` whose position is not excluded.
pub fn select_included(view: &ProductView, mask: &ExclusionMask) -> Vec<AcphRow> {
    view.rows
        .iter()
        .enumerate()
        .filter(|(i, _)| !mask.contains(*i))
        .map(|(_, r)| *r)
        .collect()
}

/// Every row of `view`, tagged Included/Excluded.
pub fn label_rows(view: &ProductView, mask: &ExclusionMask) -> Vec<LabeledRow> {
    view.rows
        .iter()
        .enumerate()
        .map(|(position, row)| LabeledRow {
            position,
            row: *row,
            status: if mask.contains(position) {
                PointStatus::Excluded
            } else {
                PointStatus::Included
            },
        })
        .collect()
}

/// Translate a mask into persisted `(CohortYear, DevYear)` identities, in row order.
pub fn excluded_points(view: &ProductView, mask: &ExclusionMask) -> Vec<ExcludedPoint> {
    mask.in_range(view.len()).map(|i| view.rows[i].point()).collect()
}

/// A mask rebuilt from persisted identities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoredMask {
    pub mask: ExclusionMask,
    /// Persisted points with no matching row in the current view.
    pub missing: Vec<ExcludedPoint>,
}

/// Translate persisted identities back into positions of `view`.
pub fn mask_from_points(view: &ProductView, points: &[ExcludedPoint]) -> RestoredMask {
    let mut restored = RestoredMask::default();
    for point in points {
        match view.rows.iter().position(|r| r.point() == *point) {
            Some(i) => restored.mask.insert(i),
            None => restored.missing.push(*point),
        }
    }
    restored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProductType;

    fn view(n: usize) -> ProductView {
        let rows = (0..n)
            .map(|i| AcphRow {
                cohort_year: 2015 + (i / 3) as i32,
                dev_year: (i % 3) as i32,
                product_type: ProductType::Flat,
                total_claims: 10.0 * (i + 1) as f64,
                total_homes: 10.0,
                acph: (i + 1) as f64,
            })
            .collect();
        ProductView { product: ProductType::Flat, rows }
    }

    #[test]
    fn empty_mask_keeps_every_row() {
        let v = view(5);
        assert_eq!(select_included(&v, &ExclusionMask::new()), v.rows);
    }

    #[test]
    fn excluded_positions_are_removed() {
        let v = view(5);
        let mask = ExclusionMask::from_positions([0, 3]);
        let kept: Vec<f64> = select_included(&v, &mask).iter().map(|r| r.acph).collect();
        assert_eq!(kept, vec![2.0, 3.0, 5.0]);
    }

    #[test]
    fn stale_positions_are_ignored() {
        let v = view(3);
        let mask = ExclusionMask::from_positions([1, 7, 42]);
        assert_eq!(select_included(&v, &mask).len(), 2);
        assert_eq!(excluded_points(&v, &mask).len(), 1);

        let labels = label_rows(&v, &mask);
        assert_eq!(labels.len(), 3);
        assert_eq!(labels[1].status, PointStatus::Excluded);

        let mut trimmed = mask.clone();
        trimmed.retain_in_range(v.len());
        assert_eq!(trimmed, ExclusionMask::from_positions([1]));
    }

    #[test]
    fn toggle_flips_membership() {
        let mut mask = ExclusionMask::new();
        assert!(mask.toggle(2));
        assert!(mask.contains(2));
        assert!(!mask.toggle(2));
        assert!(mask.is_empty());
    }

    #[test]
    fn points_round_trip_through_positions() {
        let v = view(5);
        let mask = ExclusionMask::from_positions([0, 1]);
        let points = excluded_points(&v, &mask);
        assert_eq!(
            points,
            vec![
                ExcludedPoint { cohort_year: 2015, dev_year: 0 },
                ExcludedPoint { cohort_year: 2015, dev_year: 1 },
            ]
        );

        let restored = mask_from_points(&v, &points);
        assert_eq!(restored.mask, mask);
        assert!(restored.missing.is_empty());
    }

    #[test]
    fn unknown_points_are_reported_missing() {
        let v = view(2);
        let gone = ExcludedPoint { cohort_year: 1999, dev_year: 4 };
        let restored = mask_from_points(&v, &[gone]);
        assert!(restored.mask.is_empty());
        assert_eq!(restored.missing, vec![gone]);
    }
}

//! Pattern reduction: clean rows → average ACPH per development year.

use std::collections::BTreeMap;

use crate::domain::{AcphRow, DEV_HORIZON, MIN_PATTERN_POINTS, PatternPoint};

/// The average development pattern for one product and mask.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pattern {
    points: Vec<PatternPoint>,
}

impl Pattern {
    pub fn points(&self) -> &[PatternPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// `false` means "no curve to show"; it is a normal state, not an error.
    pub fn is_sufficient(&self) -> bool {
        self.points.len() >= MIN_PATTERN_POINTS
    }
}

/// Mean ACPH by development year, dropping `DevYear > DEV_HORIZON`.
pub fn reduce_pattern(rows: &[AcphRow]) -> Pattern {
    let mut groups: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
    for r in rows.iter().filter(|r| r.dev_year <= DEV_HORIZON) {
        let entry = groups.entry(r.dev_year).or_insert((0.0, 0));
        entry.0 += r.acph;
        entry.1 += 1;
    }

    let points = groups
        .into_iter()
        .map(|(dev_year, (sum, count))| PatternPoint {
            dev_year,
            avg_acph: sum / count as f64,
            cohorts: count,
        })
        .collect();
    Pattern { points }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProductType;

    fn row(cohort_year: i32, dev_year: i32, acph: f64) -> AcphRow {
        AcphRow {
            cohort_year,
            dev_year,
            product_type: ProductType::Detached,
            total_claims: acph,
            total_homes: 1.0,
            acph,
        }
    }

    #[test]
    fn averages_across_cohorts() {
        let rows = vec![row(2015, 1, 10.0), row(2016, 1, 20.0), row(2015, 2, 5.0)];
        let pattern = reduce_pattern(&rows);
        assert_eq!(pattern.len(), 2);
        assert_eq!(pattern.points()[0].dev_year, 1);
        assert!((pattern.points()[0].avg_acph - 15.0).abs() < 1e-12);
        assert_eq!(pattern.points()[0].cohorts, 2);
        assert!(!pattern.is_sufficient());
    }

    #[test]
    fn horizon_is_inclusive_and_later_years_dropped() {
        let rows: Vec<AcphRow> = (-1..=14).map(|d| row(2010, d, 1.0)).collect();
        let pattern = reduce_pattern(&rows);
        let years: Vec<i32> = pattern.points().iter().map(|p| p.dev_year).collect();
        assert_eq!(years, (-1..=10).collect::<Vec<_>>());
        assert!(pattern.is_sufficient());
    }

    #[test]
    fn ordered_by_dev_year() {
        let rows = vec![row(2015, 3, 1.0), row(2015, 0, 1.0), row(2016, 2, 1.0)];
        let years: Vec<i32> = reduce_pattern(&rows).points().iter().map(|p| p.dev_year).collect();
        assert_eq!(years, vec![0, 2, 3]);
    }

    #[test]
    fn empty_input_gives_empty_pattern() {
        let pattern = reduce_pattern(&[]);
        assert!(pattern.is_empty());
        assert!(!pattern.is_sufficient());
    }
}

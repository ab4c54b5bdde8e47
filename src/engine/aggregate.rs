//! Aggregation: policy book + claim transactions → ACPH table.
//!
//! Steps:
//! 1. exposure: total homes per cohort (all products together)
//! 2. development: claims joined to policies, bucketed by
//!    `(CohortYear, DevYear, ProductType)` with `DevYear = year(ReportDate) - CohortYear`
//! 3. ACPH: development buckets joined to exposure, `TotalClaims / TotalHomes`
//!
//! Cohorts with no exposed homes never produce a row, so a ratio is never
//! computed against a zero denominator.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Datelike;
use tracing::{debug, warn};

use crate::domain::{AcphRow, ClaimRecord, ClaimsDevRecord, ExposureRecord, PolicyRecord, ProductType};

/// The full ACPH table, ordered by `(ProductType, CohortYear, DevYear)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcphTable {
    rows: Vec<AcphRow>,
}

impl AcphTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from arbitrary rows, establishing the canonical order.
    pub fn from_rows(mut rows: Vec<AcphRow>) -> Self {
        rows.sort_by_key(|r| (r.product_type, r.cohort_year, r.dev_year));
        Self { rows }
    }

    pub fn rows(&self) -> &[AcphRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Products that have at least one row.
    pub fn products(&self) -> Vec<ProductType> {
        let mut out: Vec<ProductType> = self.rows.iter().map(|r| r.product_type).collect();
        out.dedup();
        out
    }

    /// Rows for one product, in `(CohortYear, DevYear)` order.
    ///
    /// Row positions in the returned view are what exclusion masks refer to.
    pub fn product_view(&self, product: ProductType) -> ProductView {
        ProductView {
            product,
            rows: self.rows.iter().filter(|r| r.product_type == product).copied().collect(),
        }
    }
}

/// The product-filtered, sorted slice of the ACPH table.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductView {
    pub product: ProductType,
    pub rows: Vec<AcphRow>,
}

impl ProductView {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Bookkeeping from one aggregation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationStats {
    pub policies: usize,
    pub claims: usize,
    /// Claims whose PolicyID has no policy record.
    pub orphan_claims: usize,
    /// PolicyIDs that appear more than once in the policy book.
    pub duplicate_policies: usize,
    /// Cohorts dropped from the join because they have no exposed homes.
    pub zero_exposure_cohorts: Vec<i32>,
    pub rows: usize,
}

/// Aggregation output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub table: AcphTable,
    pub stats: AggregationStats,
}

/// Total homes per cohort, ordered by cohort.
pub fn build_exposure(policies: &[PolicyRecord]) -> Vec<ExposureRecord> {
    let mut homes: BTreeMap<i32, f64> = BTreeMap::new();
    for p in policies {
        *homes.entry(p.cohort_year).or_insert(0.0) += p.num_homes;
    }
    homes
        .into_iter()
        .map(|(cohort_year, total_homes)| ExposureRecord { cohort_year, total_homes })
        .collect()
}

/// Claims development buckets plus the number of claims with no matching policy.
pub fn build_claims_dev(policies: &[PolicyRecord], claims: &[ClaimRecord]) -> (Vec<ClaimsDevRecord>, usize) {
    let mut lookup: HashMap<&str, (i32, ProductType)> = HashMap::with_capacity(policies.len());
    for p in policies {
        lookup
            .entry(p.policy_id.as_str())
            .or_insert((p.cohort_year, p.product_type));
    }

    let mut buckets: BTreeMap<(i32, i32, ProductType), f64> = BTreeMap::new();
    let mut orphans = 0usize;
    for c in claims {
        let Some(&(cohort_year, product)) = lookup.get(c.policy_id.as_str()) else {
            orphans += 1;
            continue;
        };
        let dev_year = c.report_date.year() - cohort_year;
        *buckets.entry((cohort_year, dev_year, product)).or_insert(0.0) += c.payment_amount;
    }

    let dev = buckets
        .into_iter()
        .map(|((cohort_year, dev_year, product_type), total_claims)| ClaimsDevRecord {
            cohort_year,
            dev_year,
            product_type,
            total_claims,
        })
        .collect();
    (dev, orphans)
}

/// Join development buckets to exposure and compute ACPH.
///
/// Returns the rows plus the cohorts that were dropped for lack of exposure.
pub fn join_acph(dev: &[ClaimsDevRecord], exposure: &[ExposureRecord]) -> (Vec<AcphRow>, Vec<i32>) {
    let homes: HashMap<i32, f64> = exposure.iter().map(|e| (e.cohort_year, e.total_homes)).collect();

    let mut rows = Vec::with_capacity(dev.len());
    let mut dropped: Vec<i32> = Vec::new();
    for d in dev {
        let Some(&total_homes) = homes.get(&d.cohort_year) else {
            continue;
        };
        if !(total_homes.is_finite() && total_homes > 0.0) {
            dropped.push(d.cohort_year);
            continue;
        }
        rows.push(AcphRow {
            cohort_year: d.cohort_year,
            dev_year: d.dev_year,
            product_type: d.product_type,
            total_claims: d.total_claims,
            total_homes,
            acph: d.total_claims / total_homes,
        });
    }
    dropped.sort_unstable();
    dropped.dedup();
    (rows, dropped)
}

/// Run the full aggregation.
pub fn aggregate(policies: &[PolicyRecord], claims: &[ClaimRecord]) -> Aggregation {
    if policies.is_empty() || claims.is_empty() {
        debug!(
            policies = policies.len(),
            claims = claims.len(),
            "nothing to aggregate"
        );
        return Aggregation {
            table: AcphTable::empty(),
            stats: AggregationStats {
                policies: policies.len(),
                claims: claims.len(),
                ..AggregationStats::default()
            },
        };
    }

    let exposure = build_exposure(policies);
    let (dev, orphan_claims) = build_claims_dev(policies, claims);
    let (rows, zero_exposure_cohorts) = join_acph(&dev, &exposure);

    let unique: HashSet<&str> = policies.iter().map(|p| p.policy_id.as_str()).collect();
    let duplicate_policies = policies.len() - unique.len();

    if orphan_claims > 0 {
        warn!(orphan_claims, "claims without a matching policy were ignored");
    }
    if duplicate_policies > 0 {
        warn!(duplicate_policies, "duplicate PolicyIDs; the first record of each was used for claims");
    }
    if !zero_exposure_cohorts.is_empty() {
        warn!(cohorts = ?zero_exposure_cohorts, "cohorts with zero homes were excluded");
    }

    let table = AcphTable::from_rows(rows);
    debug!(rows = table.len(), cohorts = exposure.len(), "aggregated ACPH table");

    Aggregation {
        stats: AggregationStats {
            policies: policies.len(),
            claims: claims.len(),
            orphan_claims,
            duplicate_policies,
            zero_exposure_cohorts,
            rows: table.len(),
        },
        table,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn policy(id: &str, cohort_year: i32, product_type: ProductType, num_homes: f64) -> PolicyRecord {
        PolicyRecord {
            policy_id: id.to_string(),
            cohort_year,
            product_type,
            num_homes,
        }
    }

    fn claim(id: &str, y: i32, m: u32, d: u32, amount: f64) -> ClaimRecord {
        ClaimRecord {
            policy_id: id.to_string(),
            report_date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            payment_amount: amount,
        }
    }

    #[test]
    fn exposure_sums_homes_across_products() {
        let policies = vec![
            policy("P1", 2015, ProductType::Flat, 10.0),
            policy("P2", 2015, ProductType::Detached, 5.0),
            policy("P3", 2016, ProductType::Flat, 4.0),
        ];
        let exposure = build_exposure(&policies);
        assert_eq!(
            exposure,
            vec![
                ExposureRecord { cohort_year: 2015, total_homes: 15.0 },
                ExposureRecord { cohort_year: 2016, total_homes: 4.0 },
            ]
        );
    }

    #[test]
    fn acph_is_claims_over_cohort_homes() {
        let policies = vec![
            policy("P1", 2015, ProductType::Flat, 10.0),
            policy("P2", 2015, ProductType::Detached, 10.0),
        ];
        let claims = vec![
            claim("P1", 2016, 3, 1, 100.0),
            claim("P1", 2016, 9, 1, 60.0),
            claim("P2", 2017, 1, 5, 40.0),
        ];
        let agg = aggregate(&policies, &claims);
        let rows = agg.table.rows();
        assert_eq!(rows.len(), 2);

        // Detached sorts before Flat.
        assert_eq!(rows[0].product_type, ProductType::Detached);
        assert_eq!(rows[0].dev_year, 2);
        assert!((rows[0].acph - 2.0).abs() < 1e-12);

        assert_eq!(rows[1].product_type, ProductType::Flat);
        assert_eq!(rows[1].dev_year, 1);
        assert!((rows[1].total_claims - 160.0).abs() < 1e-12);
        assert!((rows[1].acph - 8.0).abs() < 1e-12);
    }

    #[test]
    fn early_reports_have_negative_dev_year() {
        let policies = vec![policy("P1", 2018, ProductType::Flat, 2.0)];
        let claims = vec![claim("P1", 2017, 12, 30, 10.0)];
        let agg = aggregate(&policies, &claims);
        assert_eq!(agg.table.rows()[0].dev_year, -1);
    }

    #[test]
    fn zero_home_cohorts_produce_no_rows() {
        let policies = vec![
            policy("P1", 2015, ProductType::Flat, 0.0),
            policy("P2", 2016, ProductType::Flat, 3.0),
        ];
        let claims = vec![claim("P1", 2015, 6, 1, 50.0), claim("P2", 2016, 6, 1, 30.0)];
        let agg = aggregate(&policies, &claims);
        assert_eq!(agg.table.len(), 1);
        assert_eq!(agg.table.rows()[0].cohort_year, 2016);
        assert_eq!(agg.stats.zero_exposure_cohorts, vec![2015]);
    }

    #[test]
    fn orphan_claims_are_counted_and_dropped() {
        let policies = vec![policy("P1", 2015, ProductType::Flat, 1.0)];
        let claims = vec![claim("P1", 2015, 6, 1, 5.0), claim("NOPE", 2015, 6, 1, 9.0)];
        let agg = aggregate(&policies, &claims);
        assert_eq!(agg.stats.orphan_claims, 1);
        assert_eq!(agg.table.len(), 1);
    }

    #[test]
    fn missing_inputs_yield_empty_table() {
        let policies = vec![policy("P1", 2015, ProductType::Flat, 1.0)];
        assert!(aggregate(&policies, &[]).table.is_empty());
        assert!(aggregate(&[], &[claim("P1", 2015, 1, 1, 1.0)]).table.is_empty());
    }

    #[test]
    fn product_view_keeps_cohort_dev_order() {
        let policies = vec![
            policy("P1", 2016, ProductType::Flat, 1.0),
            policy("P2", 2015, ProductType::Flat, 1.0),
        ];
        let claims = vec![
            claim("P1", 2018, 1, 1, 1.0),
            claim("P1", 2017, 1, 1, 1.0),
            claim("P2", 2016, 1, 1, 1.0),
        ];
        let table = aggregate(&policies, &claims).table;
        let view = table.product_view(ProductType::Flat);
        let keys: Vec<(i32, i32)> = view.rows.iter().map(|r| (r.cohort_year, r.dev_year)).collect();
        assert_eq!(keys, vec![(2015, 1), (2016, 1), (2016, 2)]);
        assert!(table.product_view(ProductType::Detached).is_empty());
        assert_eq!(table.products(), vec![ProductType::Flat]);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn product(i: u8) -> ProductType {
        ProductType::ALL[usize::from(i) % ProductType::ALL.len()]
    }

    proptest! {
        #[test]
        fn acph_is_claims_over_cohort_homes(
            homes in prop::collection::vec((2015i32..2019, 0u8..4, 1u32..50), 1..20),
            claims in prop::collection::vec((0usize..20, 0i32..8, 0u32..5000), 1..60),
        ) {
            let policies: Vec<PolicyRecord> = homes
                .iter()
                .enumerate()
                .map(|(i, &(cohort_year, p, h))| PolicyRecord {
                    policy_id: format!("P{i}"),
                    cohort_year,
                    product_type: product(p),
                    num_homes: f64::from(h),
                })
                .collect();
            let claims: Vec<ClaimRecord> = claims
                .iter()
                .map(|&(idx, lag, amount)| {
                    let p = &policies[idx % policies.len()];
                    ClaimRecord {
                        policy_id: p.policy_id.clone(),
                        report_date: NaiveDate::from_ymd_opt(p.cohort_year + lag, 3, 1).unwrap(),
                        payment_amount: f64::from(amount),
                    }
                })
                .collect();

            let out = aggregate(&policies, &claims);
            prop_assert_eq!(out.stats.orphan_claims, 0);
            for row in out.table.rows() {
                let cohort_homes: f64 = policies
                    .iter()
                    .filter(|p| p.cohort_year == row.cohort_year)
                    .map(|p| p.num_homes)
                    .sum();
                prop_assert!((row.total_homes - cohort_homes).abs() < 1e-9);
                prop_assert!((row.acph - row.total_claims / row.total_homes).abs() < 1e-9);
            }
            let total: f64 = out.table.rows().iter().map(|r| r.total_claims).sum();
            let paid: f64 = claims.iter().map(|c| c.payment_amount).sum();
            prop_assert!((total - paid).abs() < 1e-6);
        }
    }
}

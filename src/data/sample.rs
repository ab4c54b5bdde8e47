//! Synthetic policy book and claims generation.
//!
//! Claims follow a known development shape per product, so the fitted curves
//! of a demo dataset can be eyeballed against the truth. The generator is
//! fully determined by `SampleConfig` (including the seed).

use std::path::Path;

use chrono::NaiveDate;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{LogNormal, Poisson};
use tracing::info;

use crate::domain::{ClaimRecord, DEV_HORIZON, FittedParameters, PolicyRecord, ProductType};
use crate::error::AppError;
use crate::io::ingest::{CLAIMS_FILE, POLICY_FILE};
use crate::models::predict;

/// Mean payment per claim; claim frequency is scaled so the expected ACPH
/// equals the product's true curve.
const MEAN_SEVERITY: f64 = 500.0;

/// Log-scale dispersion of claim payments.
const SEVERITY_SIGMA: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleConfig {
    pub seed: u64,
    pub policies: usize,
    pub first_cohort: i32,
    pub cohorts: usize,
    /// Claims reported after this year have not happened yet.
    pub valuation_year: i32,
    /// Mean homes per policy (plus one, so no policy is empty).
    pub mean_homes: f64,
    /// Share of claims reported the year before the cohort starts.
    pub early_report_prob: f64,
    pub jump_prob: f64,
    pub jump_k: f64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            policies: 400,
            first_cohort: 2012,
            cohorts: 10,
            valuation_year: 2022,
            mean_homes: 20.0,
            early_report_prob: 0.01,
            jump_prob: 0.005,
            jump_k: 6.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleData {
    pub policies: Vec<PolicyRecord>,
    pub claims: Vec<ClaimRecord>,
}

/// The development curve each product's claims are drawn from.
pub fn true_curve(product: ProductType) -> FittedParameters {
    match product {
        ProductType::Detached => FittedParameters { a: 120.0, b: 1.5, c: 0.8 },
        ProductType::SemiDetached => FittedParameters { a: 90.0, b: 1.8, c: 0.9 },
        ProductType::Flat => FittedParameters { a: 60.0, b: 1.2, c: 0.7 },
        ProductType::SocialHousing => FittedParameters { a: 150.0, b: 2.0, c: 1.0 },
    }
}

pub fn generate_sample(config: &SampleConfig) -> Result<SampleData, AppError> {
    if config.policies == 0 || config.cohorts == 0 {
        return Err(AppError::input("Sample needs at least one policy and one cohort."));
    }
    if !(config.mean_homes.is_finite() && config.mean_homes > 0.0) {
        return Err(AppError::input("Mean homes per policy must be > 0."));
    }
    if !(0.0..1.0).contains(&config.early_report_prob) || !(0.0..1.0).contains(&config.jump_prob) {
        return Err(AppError::input("Early-report and jump probabilities must lie in [0, 1)."));
    }
    if !(config.jump_k.is_finite() && config.jump_k > 0.0) {
        return Err(AppError::input("Jump magnitude must be > 0."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let homes_dist = Poisson::new(config.mean_homes)
        .map_err(|e| AppError::internal(format!("Home count distribution error: {e}")))?;
    let mu = MEAN_SEVERITY.ln() - 0.5 * SEVERITY_SIGMA * SEVERITY_SIGMA;
    let severity = LogNormal::new(mu, SEVERITY_SIGMA)
        .map_err(|e| AppError::internal(format!("Severity distribution error: {e}")))?;

    let mut policies = Vec::with_capacity(config.policies);
    let mut claims = Vec::new();

    for i in 0..config.policies {
        let cohort_year = config.first_cohort + (i % config.cohorts) as i32;
        let product = ProductType::ALL[rng.gen_range(0..ProductType::ALL.len())];
        let homes: f64 = homes_dist.sample(&mut rng);
        let num_homes = 1.0 + homes.floor();
        let policy_id = format!("POL-{:05}", i + 1);
        let truth = true_curve(product);

        for dev_year in 0..=DEV_HORIZON + 2 {
            let report_year = cohort_year + dev_year;
            if report_year > config.valuation_year {
                break;
            }

            let lambda = num_homes * predict(&truth, f64::from(dev_year)) / MEAN_SEVERITY;
            if !(lambda.is_finite() && lambda > 0.0) {
                continue;
            }
            let count_dist = Poisson::new(lambda)
                .map_err(|e| AppError::internal(format!("Claim count distribution error: {e}")))?;
            let count: f64 = count_dist.sample(&mut rng);

            for _ in 0..count as usize {
                let early = rng.r#gen::<f64>() < config.early_report_prob;
                let year = if early { cohort_year - 1 } else { report_year };
                let mut amount = severity.sample(&mut rng);
                if rng.r#gen::<f64>() < config.jump_prob {
                    amount *= config.jump_k;
                }
                claims.push(ClaimRecord {
                    policy_id: policy_id.clone(),
                    report_date: random_date(&mut rng, year)?,
                    payment_amount: (amount * 100.0).round() / 100.0,
                });
            }
        }

        policies.push(PolicyRecord {
            policy_id,
            cohort_year,
            product_type: product,
            num_homes,
        });
    }

    Ok(SampleData { policies, claims })
}

fn random_date(rng: &mut StdRng, year: i32) -> Result<NaiveDate, AppError> {
    let month = rng.gen_range(1..=12);
    let day = rng.gen_range(1..=28);
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| AppError::internal(format!("Invalid sample date {year}-{month}-{day}")))
}

/// Write the sample as `Policy_Book.csv` and `Claims_Transaction.csv` in `dir`.
pub fn write_sample(dir: &Path, sample: &SampleData) -> Result<(), AppError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::input(format!("Failed to create '{}': {e}", dir.display())))?;

    write_records(&dir.join(POLICY_FILE), &sample.policies)?;
    write_records(&dir.join(CLAIMS_FILE), &sample.claims)?;

    info!(
        dir = %dir.display(),
        policies = sample.policies.len(),
        claims = sample.claims.len(),
        "wrote synthetic dataset"
    );
    Ok(())
}

fn write_records<T: serde::Serialize>(path: &Path, records: &[T]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::input(format!("Failed to create '{}': {e}", path.display())))?;
    for r in records {
        writer
            .serialize(r)
            .map_err(|e| AppError::input(format!("Failed to write '{}': {e}", path.display())))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::input(format!("Failed to write '{}': {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn small() -> SampleConfig {
        SampleConfig {
            policies: 80,
            ..SampleConfig::default()
        }
    }

    #[test]
    fn same_seed_same_data() {
        let a = generate_sample(&small()).unwrap();
        let b = generate_sample(&small()).unwrap();
        assert_eq!(a, b);

        let c = generate_sample(&SampleConfig { seed: 7, ..small() }).unwrap();
        assert_ne!(a.claims, c.claims);
    }

    #[test]
    fn claims_respect_valuation_year() {
        let cfg = small();
        let sample = generate_sample(&cfg).unwrap();
        assert!(!sample.claims.is_empty());
        assert!(sample.claims.iter().all(|c| c.report_date.year() <= cfg.valuation_year));
        assert!(sample.policies.iter().all(|p| p.num_homes >= 1.0));
    }

    #[test]
    fn rejects_bad_config() {
        assert!(generate_sample(&SampleConfig { policies: 0, ..small() }).is_err());
        assert!(generate_sample(&SampleConfig { jump_prob: 1.5, ..small() }).is_err());
    }

    #[test]
    fn written_files_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let sample = generate_sample(&small()).unwrap();
        write_sample(dir.path(), &sample).unwrap();

        let source = crate::io::ingest::load_source(Some(dir.path())).unwrap();
        assert_eq!(source.policies.len(), sample.policies.len());
        assert_eq!(source.claims.len(), sample.claims.len());
        assert!(source.summary.row_errors.is_empty());
    }
}

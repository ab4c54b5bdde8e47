//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - read straight from the policy/claims CSV files
//! - used in-memory by the aggregation and fitting stages
//! - written to the assumption store and curve exports

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Development years above this value never enter a pattern.
pub const DEV_HORIZON: i32 = 10;

/// Minimum number of pattern points before a curve fit is attempted.
pub const MIN_PATTERN_POINTS: usize = 3;

/// Product segment.
///
/// Variant order is the order products are offered for selection, and also the
/// primary sort key of the ACPH table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum)]
pub enum ProductType {
    #[serde(rename = "Detached")]
    #[value(name = "detached")]
    Detached,
    #[serde(rename = "Semi-detached")]
    #[value(name = "semi-detached")]
    SemiDetached,
    #[serde(rename = "Flat")]
    #[value(name = "flat")]
    Flat,
    #[serde(rename = "Social Housing")]
    #[value(name = "social-housing")]
    SocialHousing,
}

impl ProductType {
    pub const ALL: [ProductType; 4] = [
        ProductType::Detached,
        ProductType::SemiDetached,
        ProductType::Flat,
        ProductType::SocialHousing,
    ];

    /// Name as it appears in the source data and the assumption file.
    pub fn display_name(self) -> &'static str {
        match self {
            ProductType::Detached => "Detached",
            ProductType::SemiDetached => "Semi-detached",
            ProductType::Flat => "Flat",
            ProductType::SocialHousing => "Social Housing",
        }
    }

    pub fn from_display_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.display_name() == name.trim())
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|p| *p == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|p| *p == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One row of the policy book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    #[serde(rename = "PolicyID")]
    pub policy_id: String,
    #[serde(rename = "CohortYear")]
    pub cohort_year: i32,
    #[serde(rename = "ProductType")]
    pub product_type: ProductType,
    #[serde(rename = "NumHomes")]
    pub num_homes: f64,
}

/// One claim payment transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRecord {
    #[serde(rename = "PolicyID")]
    pub policy_id: String,
    #[serde(rename = "ReportDate")]
    pub report_date: NaiveDate,
    #[serde(rename = "PaymentAmount")]
    pub payment_amount: f64,
}

/// Homes exposed per cohort (all products together).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureRecord {
    pub cohort_year: i32,
    pub total_homes: f64,
}

/// Claims paid per (cohort, development year, product) bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClaimsDevRecord {
    pub cohort_year: i32,
    /// `year(ReportDate) - CohortYear`; negative for early reports.
    pub dev_year: i32,
    pub product_type: ProductType,
    pub total_claims: f64,
}

/// Actual claims per home for one bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcphRow {
    pub cohort_year: i32,
    pub dev_year: i32,
    pub product_type: ProductType,
    pub total_claims: f64,
    pub total_homes: f64,
    pub acph: f64,
}

impl AcphRow {
    pub fn point(&self) -> ExcludedPoint {
        ExcludedPoint {
            cohort_year: self.cohort_year,
            dev_year: self.dev_year,
        }
    }
}

/// Inclusion status of a row in the current product view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointStatus {
    Included,
    Excluded,
}

impl PointStatus {
    pub fn label(self) -> &'static str {
        match self {
            PointStatus::Included => "Included",
            PointStatus::Excluded => "Excluded",
        }
    }
}

/// A view row tagged with its position and inclusion status (for display).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabeledRow {
    pub position: usize,
    pub row: AcphRow,
    pub status: PointStatus,
}

/// Average ACPH at one development year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternPoint {
    pub dev_year: i32,
    pub avg_acph: f64,
    /// Number of included cohorts averaged into this point.
    pub cohorts: usize,
}

/// Parameters of `A * t^B * exp(-C t)` (with `t` floored at 0.1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FittedParameters {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

/// A persisted excluded point, identified independently of row position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExcludedPoint {
    #[serde(rename = "CohortYear")]
    pub cohort_year: i32,
    #[serde(rename = "DevYear")]
    pub dev_year: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_names_round_trip() {
        for p in ProductType::ALL {
            assert_eq!(ProductType::from_display_name(p.display_name()), Some(p));
        }
        assert_eq!(ProductType::from_display_name("Bungalow"), None);
    }

    #[test]
    fn product_cycle_wraps() {
        assert_eq!(ProductType::SocialHousing.next(), ProductType::Detached);
        assert_eq!(ProductType::Detached.prev(), ProductType::SocialHousing);
        assert_eq!(ProductType::SemiDetached.next(), ProductType::Flat);
    }

    #[test]
    fn product_serializes_with_source_names() {
        let json = serde_json::to_string(&ProductType::SocialHousing).unwrap();
        assert_eq!(json, "\"Social Housing\"");
        let back: ProductType = serde_json::from_str("\"Semi-detached\"").unwrap();
        assert_eq!(back, ProductType::SemiDetached);
    }
}

//! CSV ingest for the policy book and claims transactions.
//!
//! Missing files are not an error: the caller gets an empty source and the
//! rest of the pipeline renders an empty table. Files that exist but cannot be
//! read (permissions, broken header) are input errors with exit code 2.
//!
//! Bad rows are skipped and reported, never fatal.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::{debug, info, warn};

use crate::domain::{ClaimRecord, PolicyRecord};
use crate::error::AppError;

pub const POLICY_FILE: &str = "Policy_Book.csv";
pub const CLAIMS_FILE: &str = "Claims_Transaction.csv";

/// Directories searched (relative to the working directory) when no data
/// directory is configured.
pub const SEARCH_DIRS: [&str; 3] = [".", "..", "../.."];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub file: &'static str,
    pub line: usize,
    pub message: String,
}

/// What the loader found, for logs and report headers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadSummary {
    /// Directory the files were read from; `None` when no data was found.
    pub data_dir: Option<PathBuf>,
    pub policies_read: usize,
    pub policies_used: usize,
    pub claims_read: usize,
    pub claims_used: usize,
    pub row_errors: Vec<RowError>,
}

impl LoadSummary {
    pub fn is_missing(&self) -> bool {
        self.data_dir.is_none()
    }
}

/// Raw records ready for aggregation.
#[derive(Debug, Clone, Default)]
pub struct SourceData {
    pub policies: Vec<PolicyRecord>,
    pub claims: Vec<ClaimRecord>,
    pub summary: LoadSummary,
}

/// Pick the directory holding both CSV files.
///
/// An explicit directory is used as-is; otherwise the first of `SEARCH_DIRS`
/// containing `Policy_Book.csv` wins.
pub fn locate_data_dir(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(dir) => dir.join(POLICY_FILE).is_file().then(|| dir.to_path_buf()),
        None => SEARCH_DIRS
            .iter()
            .map(PathBuf::from)
            .find(|dir| dir.join(POLICY_FILE).is_file()),
    }
}

/// Load both datasets, or an empty source when they are not there.
pub fn load_source(explicit: Option<&Path>) -> Result<SourceData, AppError> {
    let Some(dir) = locate_data_dir(explicit) else {
        warn!(
            dir = ?explicit,
            file = POLICY_FILE,
            "no policy book found; continuing with an empty table"
        );
        return Ok(SourceData::default());
    };

    let claims_path = dir.join(CLAIMS_FILE);
    if !claims_path.is_file() {
        warn!(path = %claims_path.display(), "claims file missing; continuing with an empty table");
        return Ok(SourceData::default());
    }

    let mut row_errors = Vec::new();
    let (policies, policies_read) = read_policies(&dir.join(POLICY_FILE), &mut row_errors)?;
    let (claims, claims_read) = read_claims(&claims_path, &mut row_errors)?;

    for err in row_errors.iter().take(5) {
        debug!(file = err.file, line = err.line, message = %err.message, "skipped row");
    }
    info!(
        dir = %dir.display(),
        policies = policies.len(),
        claims = claims.len(),
        rejected = row_errors.len(),
        "loaded source data"
    );

    Ok(SourceData {
        summary: LoadSummary {
            data_dir: Some(dir),
            policies_read,
            policies_used: policies.len(),
            claims_read,
            claims_used: claims.len(),
            row_errors,
        },
        policies,
        claims,
    })
}

/// Read `Policy_Book.csv`. Returns the valid records and the number of rows read.
pub fn read_policies(path: &Path, errors: &mut Vec<RowError>) -> Result<(Vec<PolicyRecord>, usize), AppError> {
    read_records(path, POLICY_FILE, errors, |p: &PolicyRecord| {
        if !p.num_homes.is_finite() || p.num_homes < 0.0 {
            return Err(format!("NumHomes must be a finite, non-negative number (got {})", p.num_homes));
        }
        Ok(())
    })
}

/// Read `Claims_Transaction.csv`. Returns the valid records and the number of rows read.
pub fn read_claims(path: &Path, errors: &mut Vec<RowError>) -> Result<(Vec<ClaimRecord>, usize), AppError> {
    read_records(path, CLAIMS_FILE, errors, |c: &ClaimRecord| {
        if !c.payment_amount.is_finite() {
            return Err("PaymentAmount must be finite".to_string());
        }
        Ok(())
    })
}

fn read_records<T, V>(
    path: &Path,
    file_label: &'static str,
    errors: &mut Vec<RowError>,
    validate: V,
) -> Result<(Vec<T>, usize), AppError>
where
    T: serde::de::DeserializeOwned,
    V: Fn(&T) -> Result<(), String>,
{
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read CSV headers of '{}': {e}", path.display())))?;
    let cleaned = clean_headers(headers);
    reader.set_headers(cleaned);

    let mut out = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.deserialize::<T>().enumerate() {
        // Line 1 is the header.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                errors.push(RowError {
                    file: file_label,
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match validate(&record) {
            Ok(()) => out.push(record),
            Err(message) => errors.push(RowError {
                file: file_label,
                line,
                message,
            }),
        }
    }

    Ok((out, rows_read))
}

fn clean_headers(headers: &StringRecord) -> StringRecord {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM,
    // which would otherwise fail to match `PolicyID`.
    headers
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProductType;
    use chrono::NaiveDate;
    use std::fs;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn reads_both_files() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            POLICY_FILE,
            "\u{feff}PolicyID,CohortYear,ProductType,NumHomes\nP1,2015,Detached,10\nP2,2016,Social Housing,4.5\n",
        );
        write(
            dir.path(),
            CLAIMS_FILE,
            "PolicyID,ReportDate,PaymentAmount\nP1,2016-03-01,250.0\nP2,2016-12-31,-20\n",
        );

        let src = load_source(Some(dir.path())).unwrap();
        assert_eq!(src.policies.len(), 2);
        assert_eq!(src.policies[1].product_type, ProductType::SocialHousing);
        assert_eq!(src.claims.len(), 2);
        assert_eq!(src.claims[0].report_date, NaiveDate::from_ymd_opt(2016, 3, 1).unwrap());
        assert_eq!(src.summary.data_dir.as_deref(), Some(dir.path()));
        assert!(src.summary.row_errors.is_empty());
    }

    #[test]
    fn bad_rows_are_skipped_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            POLICY_FILE,
            "PolicyID,CohortYear,ProductType,NumHomes\nP1,2015,Detached,10\nP2,2015,Bungalow,3\nP3,2015,Flat,-1\nP4,2015,Flat,NaN\n",
        );
        write(
            dir.path(),
            CLAIMS_FILE,
            "PolicyID,ReportDate,PaymentAmount\nP1,2016/03/01,1\nP1,2016-03-01,inf\nP1,2017-01-01,5\n",
        );

        let src = load_source(Some(dir.path())).unwrap();
        assert_eq!(src.policies.len(), 1);
        assert_eq!(src.claims.len(), 1);
        assert_eq!(src.summary.policies_read, 4);
        assert_eq!(src.summary.claims_read, 3);

        let lines: Vec<(&str, usize)> = src.summary.row_errors.iter().map(|e| (e.file, e.line)).collect();
        assert_eq!(
            lines,
            vec![(POLICY_FILE, 3), (POLICY_FILE, 4), (POLICY_FILE, 5), (CLAIMS_FILE, 2), (CLAIMS_FILE, 3)]
        );
    }

    #[test]
    fn missing_files_give_empty_source() {
        let dir = tempfile::tempdir().unwrap();
        let src = load_source(Some(dir.path())).unwrap();
        assert!(src.policies.is_empty());
        assert!(src.summary.is_missing());

        write(dir.path(), POLICY_FILE, "PolicyID,CohortYear,ProductType,NumHomes\nP1,2015,Flat,1\n");
        let src = load_source(Some(dir.path())).unwrap();
        assert!(src.policies.is_empty(), "claims file still missing");
    }
}

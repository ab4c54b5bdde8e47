//! The immutable, shared dataset every session reads from.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::engine::{AcphTable, AggregationStats, aggregate};
use crate::error::AppError;
use crate::io::ingest::{LoadSummary, SourceData, load_source};

/// ACPH table plus what it took to build it.
///
/// Built once at startup and handed out as `Arc<Dataset>`; nothing mutates it
/// afterwards.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    table: AcphTable,
    stats: AggregationStats,
    summary: LoadSummary,
}

impl Dataset {
    /// A dataset with no rows (the "missing data" state).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_source(source: SourceData) -> Self {
        let aggregation = aggregate(&source.policies, &source.claims);
        Self {
            table: aggregation.table,
            stats: aggregation.stats,
            summary: source.summary,
        }
    }

    /// Wrap an already-aggregated table.
    pub fn from_table(table: AcphTable) -> Self {
        let stats = AggregationStats {
            rows: table.len(),
            ..AggregationStats::default()
        };
        Self {
            table,
            stats,
            summary: LoadSummary::default(),
        }
    }

    /// Read the CSV files (see `io::ingest`) and aggregate them.
    pub fn load(data_dir: Option<&Path>) -> Result<Arc<Self>, AppError> {
        let dataset = Self::from_source(load_source(data_dir)?);
        info!(
            rows = dataset.table.len(),
            products = dataset.table.products().len(),
            "dataset ready"
        );
        Ok(Arc::new(dataset))
    }

    pub fn table(&self) -> &AcphTable {
        &self.table
    }

    pub fn stats(&self) -> &AggregationStats {
        &self.stats
    }

    pub fn summary(&self) -> &LoadSummary {
        &self.summary
    }
}

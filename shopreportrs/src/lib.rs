pub mod backend;
pub mod catalog;
pub mod compiler;
pub mod config;
pub mod error;
pub mod executor;
pub mod report;
pub mod runtime;
pub mod schema_cache;
pub mod sql;
pub mod store;
pub mod tenant;
pub mod validation;

use std::path::Path;

use crate::error::Result;

/// Load a catalog from disk and validate it against the live schema with
/// the provided validator.
pub async fn load_catalog_and_validate<P: AsRef<Path>>(
    catalog_dir: P,
    validator: &validation::CatalogValidator<'_>,
) -> Result<catalog::Catalog> {
    let catalog = catalog::Catalog::load_from_dir(catalog_dir)?;
    validator.validate_catalog(&catalog).await?;
    Ok(catalog)
}

pub use crate::backend::{AnalyticsBackend, PostgresBackend};
pub use crate::catalog::{Aggregation, BaseRecordType, Catalog, Dimension, Metric, Relation};
pub use crate::compiler::{CompiledReport, ReportCompiler};
pub use crate::config::ServiceConfig;
pub use crate::error::ReportError;
pub use crate::executor::{normalize_rows, CellValue, QueryResult};
pub use crate::report::{Filter, FilterOp, ReportConfig, StoredReport};
pub use crate::runtime::{execute_report, ReportOutcome};
pub use crate::schema_cache::TableSchema;
pub use crate::store::{MemoryReportStore, PostgresReportStore, ReportStore};
pub use crate::tenant::OrgContext;
pub use crate::validation::CatalogValidator;

//! Startup validation of the hand-authored catalog against the live schema.
//!
//! The catalog is configuration, not introspection; this is the drift check
//! that catches a renamed or dropped column before a report query fails at
//! run time.

use std::sync::Mutex;

use crate::backend::AnalyticsBackend;
use crate::catalog::{fk_column, BaseRecordType, Catalog, Dimension, Metric, Relation, RelationKind};
use crate::config::ServiceConfig;
use crate::error::{ReportError, Result};
use crate::schema_cache::{SchemaCache, TableSchema};

pub struct CatalogValidator<'b> {
    backend: &'b dyn AnalyticsBackend,
    cache: Mutex<SchemaCache>,
    warn_only: bool,
}

impl<'b> CatalogValidator<'b> {
    pub fn new(backend: &'b dyn AnalyticsBackend, warn_only: bool) -> Self {
        Self {
            backend,
            cache: Mutex::new(SchemaCache::new()),
            warn_only,
        }
    }

    /// Validator with cache TTL/size and strictness taken from service
    /// configuration.
    pub fn from_config(backend: &'b dyn AnalyticsBackend, config: &ServiceConfig) -> Self {
        Self {
            backend,
            cache: Mutex::new(SchemaCache::with_config(&config.schema_cache)),
            warn_only: config.validation.warn_only,
        }
    }

    pub async fn validate_catalog(&self, catalog: &Catalog) -> Result<()> {
        for record in catalog.records.values() {
            self.validate_base_record(record).await?;
        }
        Ok(())
    }

    async fn validate_base_record(&self, record: &BaseRecordType) -> Result<()> {
        let schema = self.ensure_schema(&record.table).await?;

        // Tenant scoping depends on this column existing; its absence is
        // never downgraded to a warning.
        if !schema.has_column("org_id") {
            return Err(ReportError::Validation(format!(
                "table {} has no org_id column; cannot scope queries to a tenant",
                record.table
            )));
        }

        for metric in &record.metrics {
            self.check_metric(metric, &schema)?;
        }
        for dim in &record.dimensions {
            self.check_dimension(dim, &schema)?;
        }

        for relation in &record.relations {
            self.validate_relation(record, relation, &schema).await?;
        }
        Ok(())
    }

    async fn validate_relation(
        &self,
        record: &BaseRecordType,
        relation: &Relation,
        base_schema: &TableSchema,
    ) -> Result<()> {
        match &relation.kind {
            RelationKind::Direct { join_field } => {
                self.check(
                    base_schema.has_column(join_field),
                    format!(
                        "join field {} missing on table {} (relation to {})",
                        join_field, record.table, relation.table
                    ),
                )?;
            }
            RelationKind::Through { join_through } => {
                let through_schema = self.ensure_schema(join_through).await?;
                for key in [fk_column(&record.table), fk_column(&relation.table)] {
                    self.check(
                        through_schema.has_column(&key),
                        format!("join table {join_through} missing key column {key}"),
                    )?;
                }
            }
        }

        let target_schema = self.ensure_schema(&relation.table).await?;
        self.check(
            target_schema.has_column("id"),
            format!("relation target {} has no id column", relation.table),
        )?;
        for metric in &relation.metrics {
            self.check_metric(metric, &target_schema)?;
        }
        for dim in &relation.dimensions {
            self.check_dimension(dim, &target_schema)?;
        }
        Ok(())
    }

    fn check_metric(&self, metric: &Metric, schema: &TableSchema) -> Result<()> {
        self.check(
            schema.has_column(&metric.column),
            format!(
                "metric {} references missing column {}.{}",
                metric.id, metric.table, metric.column
            ),
        )
    }

    fn check_dimension(&self, dim: &Dimension, schema: &TableSchema) -> Result<()> {
        for column in dim.field.columns() {
            self.check(
                schema.has_column(column),
                format!(
                    "dimension {} references missing column {}.{}",
                    dim.id, dim.table, column
                ),
            )?;
        }
        Ok(())
    }

    async fn ensure_schema(&self, table: &str) -> Result<TableSchema> {
        if let Some(schema) = self.cache.lock().unwrap().get(table).cloned() {
            return Ok(schema);
        }
        let schema = self.backend.fetch_schema(table).await?;
        self.cache
            .lock()
            .unwrap()
            .insert(table.to_string(), schema.clone());
        Ok(schema)
    }

    fn check(&self, condition: bool, message: String) -> Result<()> {
        if condition {
            return Ok(());
        }
        if self.warn_only {
            tracing::warn!("{message}");
            Ok(())
        } else {
            Err(ReportError::Validation(message))
        }
    }
}

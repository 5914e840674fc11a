//! Access to persisted report records.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::backend::create_pool;
use crate::error::{ReportError, Result};
use crate::report::{ReportConfig, StoredReport};
use crate::tenant::OrgContext;

/// Report persistence boundary. Lookups are org-scoped: a report belonging
/// to another organization is indistinguishable from a missing one.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn fetch_report(&self, org: &OrgContext, report_id: &str)
        -> Result<Option<StoredReport>>;
    /// Record that the report just ran. Called after a successful execution.
    async fn touch_last_run(&self, org: &OrgContext, report_id: &str) -> Result<()>;
}

pub struct PostgresReportStore {
    pool: deadpool_postgres::Pool,
}

impl PostgresReportStore {
    pub fn new(connection_string: &str) -> Result<Self> {
        Ok(Self {
            pool: create_pool(connection_string)?,
        })
    }
}

#[async_trait]
impl ReportStore for PostgresReportStore {
    async fn fetch_report(
        &self,
        org: &OrgContext,
        report_id: &str,
    ) -> Result<Option<StoredReport>> {
        let client = self.pool.get().await.map_err(|e| {
            tracing::error!(error = %e, "failed to get postgres connection");
            ReportError::Execution(format!("get postgres connection: {e}"))
        })?;

        let rows = client
            .query(
                r#"SELECT id, name, config FROM "Report" WHERE org_id = $1 AND id = $2"#,
                &[&org.org_id(), &report_id],
            )
            .await?;

        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let config_json: serde_json::Value = row.try_get(2)?;
        let config: ReportConfig = serde_json::from_value(config_json)?;
        Ok(Some(StoredReport {
            id: row.try_get(0)?,
            name: row.try_get(1)?,
            config,
        }))
    }

    async fn touch_last_run(&self, org: &OrgContext, report_id: &str) -> Result<()> {
        let client = self.pool.get().await.map_err(|e| {
            ReportError::Execution(format!("get postgres connection: {e}"))
        })?;
        client
            .execute(
                r#"UPDATE "Report" SET last_run_at = now() WHERE org_id = $1 AND id = $2"#,
                &[&org.org_id(), &report_id],
            )
            .await?;
        Ok(())
    }
}

/// In-memory store for tests and demos, keyed by (org, report id).
#[derive(Default)]
pub struct MemoryReportStore {
    reports: Mutex<HashMap<(String, String), StoredReport>>,
    touched: Mutex<Vec<(String, String)>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, org_id: &str, report: StoredReport) {
        self.reports
            .lock()
            .unwrap()
            .insert((org_id.to_string(), report.id.clone()), report);
    }

    /// (org, report id) pairs whose last-run timestamp was touched.
    pub fn touched(&self) -> Vec<(String, String)> {
        self.touched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn fetch_report(
        &self,
        org: &OrgContext,
        report_id: &str,
    ) -> Result<Option<StoredReport>> {
        Ok(self
            .reports
            .lock()
            .unwrap()
            .get(&(org.org_id().to_string(), report_id.to_string()))
            .cloned())
    }

    async fn touch_last_run(&self, org: &OrgContext, report_id: &str) -> Result<()> {
        self.touched
            .lock()
            .unwrap()
            .push((org.org_id().to_string(), report_id.to_string()));
        Ok(())
    }
}

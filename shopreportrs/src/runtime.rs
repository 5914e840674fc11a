use serde_json::{Map, Value};

use crate::backend::AnalyticsBackend;
use crate::catalog::Catalog;
use crate::compiler::ReportCompiler;
use crate::error::{ReportError, Result};
use crate::executor::normalize_rows;
use crate::store::ReportStore;
use crate::tenant::OrgContext;

/// What a report execution hands back to the presentation layer. Failures
/// surface as strings; no error crosses this boundary as a panic or a raw
/// error value.
#[derive(Debug, Clone, Default)]
pub struct ReportOutcome {
    pub data: Option<Vec<Map<String, Value>>>,
    pub error: Option<String>,
    pub warnings: Vec<String>,
}

/// Execute a stored report: look it up (org-scoped), compile its config,
/// run the query, normalize the rows, and touch the last-run timestamp.
/// Each call is a fully independent request/response cycle.
pub async fn execute_report(
    org: &OrgContext,
    catalog: &Catalog,
    store: &dyn ReportStore,
    backend: &dyn AnalyticsBackend,
    report_id: &str,
) -> ReportOutcome {
    match run(org, catalog, store, backend, report_id).await {
        Ok((data, warnings)) => ReportOutcome {
            data: Some(data),
            error: None,
            warnings,
        },
        Err(err) => ReportOutcome {
            data: None,
            error: Some(err.to_string()),
            warnings: Vec::new(),
        },
    }
}

async fn run(
    org: &OrgContext,
    catalog: &Catalog,
    store: &dyn ReportStore,
    backend: &dyn AnalyticsBackend,
    report_id: &str,
) -> Result<(Vec<Map<String, Value>>, Vec<String>)> {
    let report = store
        .fetch_report(org, report_id)
        .await?
        .ok_or(ReportError::ReportNotFound)?;

    let compiled =
        ReportCompiler.compile_with_dialect(catalog, org, &report.config, backend.dialect())?;
    for warning in &compiled.warnings {
        tracing::warn!(report = report_id, "{warning}");
    }

    let result = backend
        .execute(&compiled.sql, &compiled.params)
        .await
        .map_err(|err| {
            // Full query in the log so a malformed report is diagnosable.
            tracing::error!(
                report = report_id,
                sql = compiled.sql.as_str(),
                error = %err,
                "report query failed"
            );
            err
        })?;

    let data = normalize_rows(&result);

    if let Err(err) = store.touch_last_run(org, report_id).await {
        tracing::warn!(report = report_id, error = %err, "failed to record last run");
    }

    Ok((data, compiled.warnings))
}

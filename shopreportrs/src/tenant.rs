use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

/// Tenant scope for a single execution. Every report lookup and every
/// compiled query is bound to exactly one organization; callers construct
/// the context once per request and pass it explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgContext {
    org_id: String,
}

impl OrgContext {
    /// An absent or blank organization code is fatal for any operation in
    /// this component, so it is rejected at construction time.
    pub fn new(org_id: impl Into<String>) -> Result<Self> {
        let org_id = org_id.into();
        if org_id.trim().is_empty() {
            return Err(ReportError::MissingOrg);
        }
        Ok(Self { org_id })
    }

    pub fn org_id(&self) -> &str {
        &self.org_id
    }
}

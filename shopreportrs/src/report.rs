use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Persisted report definition as authored by the report builder UI.
/// The compiler treats it as an immutable snapshot per execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    pub base_record: String,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub visualization: Option<Visualization>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub operator: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Equals,
    Contains,
    GreaterThan,
    LessThan,
}

/// Rendering hint for the presentation layer; carried through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visualization {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub options: Value,
}

/// A report row as read back from the store: identity plus its JSON config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredReport {
    pub id: String,
    pub name: String,
    pub config: ReportConfig,
}

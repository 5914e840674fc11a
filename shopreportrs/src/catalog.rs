use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use glob::glob;
use once_cell::sync::Lazy;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{ReportError, Result};

/// Aggregation applied to a metric column. Fixed per metric definition,
/// never chosen by the report author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Sum,
    Avg,
    Count,
    Min,
}

/// An aggregatable numeric column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    pub id: String,
    pub label: String,
    pub table: String,
    pub column: String,
    pub agg: Aggregation,
}

/// One column, or several columns concatenated with a single space
/// ("full name" style dimensions). Authored either as a comma-separated
/// string or as a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec(Vec<String>);

impl FieldSpec {
    pub fn single(column: impl Into<String>) -> Self {
        Self(vec![column.into()])
    }

    pub fn parse(spec: &str) -> Self {
        Self(
            spec.split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
        )
    }

    pub fn columns(&self) -> &[String] {
        &self.0
    }

    pub fn is_compound(&self) -> bool {
        self.0.len() > 1
    }
}

impl Serialize for FieldSpec {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.join(","))
    }
}

impl<'de> Deserialize<'de> for FieldSpec {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::String(s) => Ok(FieldSpec::parse(&s)),
            Value::Array(items) => {
                let mut columns = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => columns.push(s),
                        other => {
                            return Err(de::Error::custom(format!(
                                "field spec entries must be strings, got {other}"
                            )))
                        }
                    }
                }
                Ok(FieldSpec(columns))
            }
            other => Err(de::Error::custom(format!(
                "field spec must be a string or list of strings, got {other}"
            ))),
        }
    }
}

/// A groupable column (or concatenation of columns).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dimension {
    pub id: String,
    pub label: String,
    pub table: String,
    pub field: FieldSpec,
}

/// How a base record type reaches a secondary table: directly through a
/// foreign key on the base table, or through an intermediate join table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationKind {
    Direct { join_field: String },
    Through { join_through: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub table: String,
    #[serde(flatten)]
    pub kind: RelationKind,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
}

/// Foreign-key naming convention used by join-through tables.
pub fn fk_column(table: &str) -> String {
    format!("{}_id", table.to_lowercase())
}

/// A root entity reports are built around (Transactions, Items, Customers).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseRecordType {
    pub id: String,
    pub label: String,
    pub table: String,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl BaseRecordType {
    /// Resolve a metric id: native metrics first, then the first relation
    /// exposing one with that id.
    pub fn resolve_metric(&self, id: &str) -> Option<(&Metric, Option<&Relation>)> {
        if let Some(metric) = self.metrics.iter().find(|m| m.id == id) {
            return Some((metric, None));
        }
        for relation in &self.relations {
            if let Some(metric) = relation.metrics.iter().find(|m| m.id == id) {
                return Some((metric, Some(relation)));
            }
        }
        None
    }

    /// Resolve a dimension id, native-first then relations.
    pub fn resolve_dimension(&self, id: &str) -> Option<(&Dimension, Option<&Relation>)> {
        if let Some(dim) = self.dimensions.iter().find(|d| d.id == id) {
            return Some((dim, None));
        }
        for relation in &self.relations {
            if let Some(dim) = relation.dimensions.iter().find(|d| d.id == id) {
                return Some((dim, Some(relation)));
            }
        }
        None
    }
}

/// Static, in-memory catalog of everything queryable. Hand-authored
/// configuration, not inferred from the live database schema; the
/// validator checks it against the real schema at startup.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    pub records: HashMap<String, BaseRecordType>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(records: Vec<BaseRecordType>) -> Self {
        let mut catalog = Catalog::new();
        for record in records {
            catalog.records.insert(record.id.clone(), record);
        }
        catalog
    }

    /// Load base record descriptors from a directory of YAML files.
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Err(ReportError::Validation(format!(
                "catalog directory not found: {}",
                dir.display()
            )));
        }
        let mut catalog = Catalog::new();
        for pattern in ["*.yml", "*.yaml"] {
            for entry in glob(&format!("{}/{pattern}", dir.display()))
                .map_err(|e| ReportError::Other(e.into()))?
                .flatten()
            {
                catalog.load_record_file(&entry)?;
            }
        }
        Ok(catalog)
    }

    fn load_record_file(&mut self, path: &PathBuf) -> Result<()> {
        let contents = fs::read_to_string(path)?;
        let record: BaseRecordType = serde_yaml::from_str(&contents)?;
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    pub fn base_record(&self, id: &str) -> Option<&BaseRecordType> {
        self.records.get(id)
    }

    /// The hand-authored back-office catalog: Transactions, Items, Customers.
    pub fn builtin() -> Self {
        Self::from_parts(vec![transactions(), items(), customers()])
    }

    pub fn shared() -> &'static Catalog {
        static BUILTIN: Lazy<Catalog> = Lazy::new(Catalog::builtin);
        &BUILTIN
    }
}

fn metric(id: &str, label: &str, table: &str, column: &str, agg: Aggregation) -> Metric {
    Metric {
        id: id.to_string(),
        label: label.to_string(),
        table: table.to_string(),
        column: column.to_string(),
        agg,
    }
}

fn dimension(id: &str, label: &str, table: &str, field: &str) -> Dimension {
    Dimension {
        id: id.to_string(),
        label: label.to_string(),
        table: table.to_string(),
        field: FieldSpec::parse(field),
    }
}

fn transactions() -> BaseRecordType {
    BaseRecordType {
        id: "transactions".to_string(),
        label: "Transactions".to_string(),
        table: "Transaction".to_string(),
        metrics: vec![
            metric("total", "Total revenue", "Transaction", "total", Aggregation::Sum),
            metric("tax", "Tax collected", "Transaction", "tax", Aggregation::Sum),
            metric(
                "transaction_count",
                "Transactions",
                "Transaction",
                "id",
                Aggregation::Count,
            ),
            metric(
                "average_total",
                "Average order value",
                "Transaction",
                "total",
                Aggregation::Avg,
            ),
            metric(
                "min_total",
                "Smallest order",
                "Transaction",
                "total",
                Aggregation::Min,
            ),
        ],
        dimensions: vec![
            dimension("status", "Status", "Transaction", "status"),
            dimension("currency", "Currency", "Transaction", "currency"),
            dimension("created_date", "Date", "Transaction", "created_at"),
        ],
        relations: vec![
            Relation {
                table: "Customer".to_string(),
                kind: RelationKind::Direct {
                    join_field: "customer_id".to_string(),
                },
                metrics: vec![],
                dimensions: vec![
                    dimension(
                        "customer_name",
                        "Customer",
                        "Customer",
                        "first_name,last_name",
                    ),
                    dimension("customer_email", "Customer email", "Customer", "email"),
                    dimension(
                        "customer_location",
                        "Customer location",
                        "Customer",
                        "city,state,country",
                    ),
                ],
            },
            Relation {
                table: "Item".to_string(),
                kind: RelationKind::Through {
                    join_through: "TransactionItem".to_string(),
                },
                metrics: vec![
                    metric("item_count", "Items sold", "Item", "id", Aggregation::Count),
                    metric(
                        "average_item_price",
                        "Average item price",
                        "Item",
                        "price",
                        Aggregation::Avg,
                    ),
                ],
                dimensions: vec![
                    dimension("item_name", "Item", "Item", "name"),
                    dimension("item_category", "Item category", "Item", "category"),
                ],
            },
        ],
    }
}

fn items() -> BaseRecordType {
    BaseRecordType {
        id: "items".to_string(),
        label: "Items".to_string(),
        table: "Item".to_string(),
        metrics: vec![
            metric("stock", "Units in stock", "Item", "stock", Aggregation::Sum),
            metric("item_count", "Items", "Item", "id", Aggregation::Count),
            metric("average_price", "Average price", "Item", "price", Aggregation::Avg),
            metric("min_price", "Lowest price", "Item", "price", Aggregation::Min),
        ],
        dimensions: vec![
            dimension("name", "Name", "Item", "name"),
            dimension("category", "Category", "Item", "category"),
            dimension("created_date", "Listed on", "Item", "created_at"),
        ],
        relations: vec![Relation {
            table: "Transaction".to_string(),
            kind: RelationKind::Through {
                join_through: "TransactionItem".to_string(),
            },
            metrics: vec![
                metric("revenue", "Revenue", "Transaction", "total", Aggregation::Sum),
                metric(
                    "transaction_count",
                    "Transactions",
                    "Transaction",
                    "id",
                    Aggregation::Count,
                ),
            ],
            dimensions: vec![
                dimension("transaction_status", "Transaction status", "Transaction", "status"),
                dimension("transaction_date", "Sold on", "Transaction", "created_at"),
            ],
        }],
    }
}

fn customers() -> BaseRecordType {
    BaseRecordType {
        id: "customers".to_string(),
        label: "Customers".to_string(),
        table: "Customer".to_string(),
        metrics: vec![metric(
            "customer_count",
            "Customers",
            "Customer",
            "id",
            Aggregation::Count,
        )],
        dimensions: vec![
            dimension("customer_name", "Name", "Customer", "first_name,last_name"),
            dimension("email", "Email", "Customer", "email"),
            dimension("location", "Location", "Customer", "city,state,country"),
            dimension("signup_date", "Signed up", "Customer", "created_at"),
        ],
        relations: vec![Relation {
            table: "Store".to_string(),
            kind: RelationKind::Direct {
                join_field: "store_id".to_string(),
            },
            metrics: vec![],
            dimensions: vec![dimension("store_name", "Store", "Store", "name")],
        }],
    }
}

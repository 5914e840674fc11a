use serde_json::{Map, Value};

#[derive(Debug, Clone)]
pub struct ColumnMeta {
    pub name: String,
}

/// A single result cell as it came off the wire, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    /// 64-bit integer, e.g. a COUNT.
    Int(i64),
    Float(f64),
    /// Arbitrary-precision decimal carried as text, e.g. SUM/AVG over a
    /// currency column.
    Decimal(String),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct QueryResult {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<CellValue>>,
}

/// Normalize raw rows for client consumption: 64-bit integers and decimals
/// become plain floating-point JSON numbers, everything else passes through.
/// Each row is keyed by the SELECT aliases (dimension/metric ids).
pub fn normalize_rows(result: &QueryResult) -> Vec<Map<String, Value>> {
    result
        .rows
        .iter()
        .map(|row| {
            let mut object = Map::new();
            for (column, cell) in result.columns.iter().zip(row) {
                object.insert(column.name.clone(), normalize_cell(cell));
            }
            object
        })
        .collect()
}

fn normalize_cell(cell: &CellValue) -> Value {
    match cell {
        CellValue::Null => Value::Null,
        CellValue::Bool(b) => Value::Bool(*b),
        CellValue::Int(i) => float_value(*i as f64),
        CellValue::Float(f) => float_value(*f),
        CellValue::Decimal(text) => match text.parse::<f64>() {
            Ok(f) => float_value(f),
            Err(_) => {
                tracing::warn!(value = text.as_str(), "unparseable decimal in result row");
                Value::Null
            }
        },
        CellValue::Text(s) => Value::String(s.clone()),
    }
}

fn float_value(f: f64) -> Value {
    // NaN and infinities have no JSON representation.
    serde_json::Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

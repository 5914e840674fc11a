use serde_json::Value;

use crate::catalog::Aggregation;

/// Dialects render identifiers, placeholders and aggregation wrappers.
/// Structure assembly lives in the compiler; the dialect only maps logical
/// constructs to SQL fragments.
pub trait Dialect {
    fn quote_ident(&self, ident: &str) -> String;
    /// Placeholder for the `idx`-th bound parameter (1-based).
    fn placeholder(&self, _idx: usize) -> String {
        "?".to_string()
    }
    fn render_aggregation(&self, agg: Aggregation, expr: &str) -> String {
        match agg {
            Aggregation::Sum => format!("SUM({expr})"),
            Aggregation::Avg => format!("AVG({expr})"),
            Aggregation::Count => format!("COUNT({expr})"),
            Aggregation::Min => format!("MIN({expr})"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn placeholder(&self, idx: usize) -> String {
        format!("${idx}")
    }
}

#[derive(Debug, Clone)]
pub enum SqlExpr {
    Column {
        table: String,
        name: String,
    },
    /// A bound value. Rendered as a placeholder; the value itself travels in
    /// the parameter list, never in the SQL text.
    Literal(Value),
    /// Space-separated concatenation of the argument expressions.
    Concat(Vec<SqlExpr>),
    Aggregate {
        agg: Aggregation,
        expr: Box<SqlExpr>,
    },
    BinaryOp {
        op: SqlBinaryOperator,
        left: Box<SqlExpr>,
        right: Box<SqlExpr>,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum SqlBinaryOperator {
    Eq,
    Gt,
    Lt,
    Like,
}

#[derive(Debug, Clone)]
pub struct SelectItem {
    pub expr: SqlExpr,
    pub alias: String,
}

/// One LEFT JOIN step. The compiler only ever emits left joins so the
/// aggregation keeps unmatched base rows.
#[derive(Debug, Clone)]
pub struct Join {
    pub table: String,
    pub on: Vec<SqlExpr>,
}

#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    pub select: Vec<SelectItem>,
    pub from: String,
    pub joins: Vec<Join>,
    pub filters: Vec<SqlExpr>,
    pub group_by: Vec<SqlExpr>,
    /// Alias to order ascending by, when a date-like dimension is selected.
    pub order_by: Option<String>,
}

/// Rendered SQL plus its bound parameters, positionally matched to the
/// dialect placeholders in the text.
#[derive(Debug, Clone)]
pub struct RenderedQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

pub struct SqlRenderer<'d> {
    dialect: &'d dyn Dialect,
}

impl<'d> SqlRenderer<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self { dialect }
    }

    pub fn render_select(&self, query: &SelectQuery) -> RenderedQuery {
        let mut params = Vec::new();

        let select_items: Vec<String> = query
            .select
            .iter()
            .map(|item| {
                let expr_sql = self.render_expr(&item.expr, &mut params);
                format!("{expr_sql} AS {}", self.dialect.quote_ident(&item.alias))
            })
            .collect();

        let mut sql = format!(
            "SELECT {} FROM {}",
            select_items.join(", "),
            self.dialect.quote_ident(&query.from)
        );

        for join in &query.joins {
            let on_clause: Vec<String> = join
                .on
                .iter()
                .map(|e| self.render_expr(e, &mut params))
                .collect();
            sql.push_str(&format!(
                " LEFT JOIN {} ON {}",
                self.dialect.quote_ident(&join.table),
                on_clause.join(" AND ")
            ));
        }

        if !query.filters.is_empty() {
            let filters: Vec<String> = query
                .filters
                .iter()
                .map(|f| self.render_expr(f, &mut params))
                .collect();
            sql.push_str(&format!(" WHERE {}", filters.join(" AND ")));
        }

        if !query.group_by.is_empty() {
            let groups: Vec<String> = query
                .group_by
                .iter()
                .map(|g| self.render_expr(g, &mut params))
                .collect();
            sql.push_str(&format!(" GROUP BY {}", groups.join(", ")));
        }

        if let Some(alias) = &query.order_by {
            sql.push_str(&format!(" ORDER BY {} ASC", self.dialect.quote_ident(alias)));
        }

        RenderedQuery { sql, params }
    }

    fn render_expr(&self, expr: &SqlExpr, params: &mut Vec<Value>) -> String {
        match expr {
            SqlExpr::Column { table, name } => format!(
                "{}.{}",
                self.dialect.quote_ident(table),
                self.dialect.quote_ident(name)
            ),
            SqlExpr::Literal(value) => {
                params.push(value.clone());
                self.dialect.placeholder(params.len())
            }
            SqlExpr::Concat(parts) => {
                let mut rendered = Vec::with_capacity(parts.len() * 2);
                for (idx, part) in parts.iter().enumerate() {
                    if idx > 0 {
                        rendered.push("' '".to_string());
                    }
                    rendered.push(self.render_expr(part, params));
                }
                format!("CONCAT({})", rendered.join(", "))
            }
            SqlExpr::Aggregate { agg, expr } => {
                let inner = self.render_expr(expr, params);
                self.dialect.render_aggregation(*agg, &inner)
            }
            SqlExpr::BinaryOp { op, left, right } => {
                let op_sql = match op {
                    SqlBinaryOperator::Eq => "=",
                    SqlBinaryOperator::Gt => ">",
                    SqlBinaryOperator::Lt => "<",
                    SqlBinaryOperator::Like => "LIKE",
                };
                format!(
                    "{} {} {}",
                    self.render_expr(left, params),
                    op_sql,
                    self.render_expr(right, params)
                )
            }
        }
    }
}

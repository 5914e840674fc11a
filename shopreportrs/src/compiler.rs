use std::collections::HashSet;

use serde_json::Value;

use crate::catalog::{
    fk_column, BaseRecordType, Catalog, Dimension, Metric, Relation, RelationKind,
};
use crate::error::{ReportError, Result};
use crate::report::{Filter, FilterOp, ReportConfig};
use crate::sql::{
    Dialect, Join, PostgresDialect, SelectItem, SelectQuery, SqlBinaryOperator, SqlExpr,
    SqlRenderer,
};
use crate::tenant::OrgContext;

/// A compiled report: the SQL text, its bound parameters, and any warnings
/// raised while resolving the configuration (stale field ids and the like).
#[derive(Debug, Clone)]
pub struct CompiledReport {
    pub sql: String,
    pub params: Vec<Value>,
    pub warnings: Vec<String>,
}

/// Pure translation from (catalog, org, report config) to a single
/// parameterized aggregate query. No I/O.
#[derive(Debug, Default)]
pub struct ReportCompiler;

impl ReportCompiler {
    pub fn compile(
        &self,
        catalog: &Catalog,
        org: &OrgContext,
        config: &ReportConfig,
    ) -> Result<CompiledReport> {
        self.compile_with_dialect(catalog, org, config, &PostgresDialect)
    }

    pub fn compile_with_dialect(
        &self,
        catalog: &Catalog,
        org: &OrgContext,
        config: &ReportConfig,
        dialect: &dyn Dialect,
    ) -> Result<CompiledReport> {
        let base = catalog
            .base_record(&config.base_record)
            .ok_or(ReportError::BaseRecordNotFound)?;

        // At least one of each is mandatory; rejected before any assembly.
        if config.metrics.is_empty() {
            return Err(ReportError::Validation("No metrics selected".to_string()));
        }
        if config.dimensions.is_empty() {
            return Err(ReportError::Validation("No dimensions selected".to_string()));
        }

        let mut warnings = Vec::new();
        let mut used_relations = RelationTracker::default();

        let dimensions: Vec<&Dimension> = config
            .dimensions
            .iter()
            .filter_map(|id| match base.resolve_dimension(id) {
                Some((dim, relation)) => {
                    used_relations.mark(relation);
                    Some(dim)
                }
                None => {
                    drop_field(&mut warnings, "dimension", id);
                    None
                }
            })
            .collect();

        let metrics: Vec<&Metric> = config
            .metrics
            .iter()
            .filter_map(|id| match base.resolve_metric(id) {
                Some((metric, relation)) => {
                    used_relations.mark(relation);
                    Some(metric)
                }
                None => {
                    drop_field(&mut warnings, "metric", id);
                    None
                }
            })
            .collect();

        if dimensions.is_empty() && metrics.is_empty() {
            return Err(ReportError::Validation(
                "report has no resolvable metrics or dimensions".to_string(),
            ));
        }

        let mut resolved_filters = Vec::new();
        for filter in &config.filters {
            match resolve_filter_expr(base, &used_relations, &filter.field) {
                Some(expr) => resolved_filters.push((expr, filter)),
                None => drop_field(&mut warnings, "filter field", &filter.field),
            }
        }

        let mut query = SelectQuery {
            from: base.table.clone(),
            ..Default::default()
        };

        // Dimensions precede metrics in column order.
        for dim in &dimensions {
            query.select.push(SelectItem {
                expr: dimension_expr(dim),
                alias: dim.id.clone(),
            });
            // Multi-column dimensions group by every underlying column,
            // not the aliased CONCAT expression.
            for column in dim.field.columns() {
                query.group_by.push(column_expr(&dim.table, column));
            }
            if query.order_by.is_none() && is_date_like(&dim.id) {
                query.order_by = Some(dim.id.clone());
            }
        }

        for metric in &metrics {
            query.select.push(SelectItem {
                expr: SqlExpr::Aggregate {
                    agg: metric.agg,
                    expr: Box::new(column_expr(&metric.table, &metric.column)),
                },
                alias: metric.id.clone(),
            });
        }

        for relation in used_relations.in_order() {
            push_relation_joins(&mut query, base, relation);
        }

        // Tenant isolation comes first in WHERE; every query is scoped to
        // the caller's organization.
        query.filters.push(SqlExpr::BinaryOp {
            op: SqlBinaryOperator::Eq,
            left: Box::new(column_expr(&base.table, "org_id")),
            right: Box::new(SqlExpr::Literal(Value::String(org.org_id().to_string()))),
        });
        for (expr, filter) in resolved_filters {
            query.filters.push(render_filter_expr(expr, filter));
        }

        let rendered = SqlRenderer::new(dialect).render_select(&query);
        tracing::debug!(
            base_record = base.id.as_str(),
            params = rendered.params.len(),
            sql = rendered.sql.as_str(),
            "compiled report query"
        );

        Ok(CompiledReport {
            sql: rendered.sql,
            params: rendered.params,
            warnings,
        })
    }
}

/// Insertion-ordered set of relations pulled into the query. A relation is
/// joined iff something resolved into it, and at most once.
#[derive(Default)]
struct RelationTracker<'a> {
    seen: HashSet<&'a str>,
    ordered: Vec<&'a Relation>,
}

impl<'a> RelationTracker<'a> {
    fn mark(&mut self, relation: Option<&'a Relation>) {
        if let Some(relation) = relation {
            if self.seen.insert(relation.table.as_str()) {
                self.ordered.push(relation);
            }
        }
    }

    fn in_order(&self) -> impl Iterator<Item = &'a Relation> + '_ {
        self.ordered.iter().copied()
    }
}

fn drop_field(warnings: &mut Vec<String>, kind: &str, id: &str) {
    let message = format!("unknown {kind} \"{id}\" dropped from report");
    tracing::warn!(field = id, kind, "dropping unresolvable report field");
    warnings.push(message);
}

fn column_expr(table: &str, name: &str) -> SqlExpr {
    SqlExpr::Column {
        table: table.to_string(),
        name: name.to_string(),
    }
}

fn dimension_expr(dim: &Dimension) -> SqlExpr {
    match dim.field.columns() {
        [] => column_expr(&dim.table, &dim.id),
        [column] => column_expr(&dim.table, column),
        columns => SqlExpr::Concat(
            columns
                .iter()
                .map(|c| column_expr(&dim.table, c))
                .collect(),
        ),
    }
}

fn is_date_like(id: &str) -> bool {
    id.contains("date") || id.contains("created_at")
}

/// Filter ids resolve against native fields, then against relations already
/// joined for a selected metric or dimension. A filter never widens the join
/// set: an extra LEFT JOIN would duplicate base rows under aggregation.
/// Metric ids resolve to their raw column, keeping the predicate row-level.
fn resolve_filter_expr(
    base: &BaseRecordType,
    used: &RelationTracker<'_>,
    field: &str,
) -> Option<SqlExpr> {
    if let Some(dim) = base.dimensions.iter().find(|d| d.id == field) {
        return Some(dimension_expr(dim));
    }
    if let Some(metric) = base.metrics.iter().find(|m| m.id == field) {
        return Some(column_expr(&metric.table, &metric.column));
    }
    for relation in used.in_order() {
        if let Some(dim) = relation.dimensions.iter().find(|d| d.id == field) {
            return Some(dimension_expr(dim));
        }
        if let Some(metric) = relation.metrics.iter().find(|m| m.id == field) {
            return Some(column_expr(&metric.table, &metric.column));
        }
    }
    None
}

fn render_filter_expr(column: SqlExpr, filter: &Filter) -> SqlExpr {
    let (op, value) = match filter.operator {
        FilterOp::Equals => (SqlBinaryOperator::Eq, filter.value.clone()),
        FilterOp::GreaterThan => (SqlBinaryOperator::Gt, filter.value.clone()),
        FilterOp::LessThan => (SqlBinaryOperator::Lt, filter.value.clone()),
        FilterOp::Contains => {
            let needle = match &filter.value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (SqlBinaryOperator::Like, Value::String(format!("%{needle}%")))
        }
    };
    SqlExpr::BinaryOp {
        op,
        left: Box::new(column),
        right: Box::new(SqlExpr::Literal(value)),
    }
}

fn push_relation_joins(query: &mut SelectQuery, base: &BaseRecordType, relation: &Relation) {
    match &relation.kind {
        RelationKind::Direct { join_field } => {
            query.joins.push(Join {
                table: relation.table.clone(),
                on: vec![SqlExpr::BinaryOp {
                    op: SqlBinaryOperator::Eq,
                    left: Box::new(column_expr(&base.table, join_field)),
                    right: Box::new(column_expr(&relation.table, "id")),
                }],
            });
        }
        RelationKind::Through { join_through } => {
            query.joins.push(Join {
                table: join_through.clone(),
                on: vec![SqlExpr::BinaryOp {
                    op: SqlBinaryOperator::Eq,
                    left: Box::new(column_expr(&base.table, "id")),
                    right: Box::new(column_expr(join_through, &fk_column(&base.table))),
                }],
            });
            query.joins.push(Join {
                table: relation.table.clone(),
                on: vec![SqlExpr::BinaryOp {
                    op: SqlBinaryOperator::Eq,
                    left: Box::new(column_expr(join_through, &fk_column(&relation.table))),
                    right: Box::new(column_expr(&relation.table, "id")),
                }],
            });
        }
    }
}

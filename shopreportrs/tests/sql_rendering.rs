//! Rendering tests for the SQL AST: quoting, placeholder numbering, and
//! clause layout.

use serde_json::json;
use shopreport::catalog::Aggregation;
use shopreport::sql::{
    Join, PostgresDialect, SelectItem, SelectQuery, SqlBinaryOperator, SqlExpr, SqlRenderer,
};

fn col(table: &str, name: &str) -> SqlExpr {
    SqlExpr::Column {
        table: table.to_string(),
        name: name.to_string(),
    }
}

fn eq(left: SqlExpr, right: SqlExpr) -> SqlExpr {
    SqlExpr::BinaryOp {
        op: SqlBinaryOperator::Eq,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[test]
fn renders_joins_grouping_and_ordering() {
    let query = SelectQuery {
        select: vec![
            SelectItem {
                expr: col("Transaction", "status"),
                alias: "status".to_string(),
            },
            SelectItem {
                expr: SqlExpr::Aggregate {
                    agg: Aggregation::Sum,
                    expr: Box::new(col("Transaction", "total")),
                },
                alias: "total".to_string(),
            },
        ],
        from: "Transaction".to_string(),
        joins: vec![Join {
            table: "Customer".to_string(),
            on: vec![eq(col("Transaction", "customer_id"), col("Customer", "id"))],
        }],
        filters: vec![eq(
            col("Transaction", "org_id"),
            SqlExpr::Literal(json!("org_1")),
        )],
        group_by: vec![col("Transaction", "status")],
        order_by: Some("status".to_string()),
    };

    let rendered = SqlRenderer::new(&PostgresDialect).render_select(&query);
    assert!(rendered.sql.starts_with("SELECT \"Transaction\".\"status\" AS \"status\""));
    assert!(rendered.sql.contains("SUM(\"Transaction\".\"total\") AS \"total\""));
    assert!(rendered.sql.contains(
        "LEFT JOIN \"Customer\" ON \"Transaction\".\"customer_id\" = \"Customer\".\"id\""
    ));
    assert!(rendered.sql.contains("WHERE \"Transaction\".\"org_id\" = $1"));
    assert!(rendered.sql.contains("GROUP BY \"Transaction\".\"status\""));
    assert!(rendered.sql.ends_with("ORDER BY \"status\" ASC"));
    assert_eq!(rendered.params, vec![json!("org_1")]);
}

#[test]
fn placeholders_number_in_render_order() {
    let query = SelectQuery {
        select: vec![SelectItem {
            expr: col("Transaction", "status"),
            alias: "status".to_string(),
        }],
        from: "Transaction".to_string(),
        filters: vec![
            eq(col("Transaction", "org_id"), SqlExpr::Literal(json!("org_1"))),
            eq(col("Transaction", "status"), SqlExpr::Literal(json!("PENDING"))),
            SqlExpr::BinaryOp {
                op: SqlBinaryOperator::Gt,
                left: Box::new(col("Transaction", "total")),
                right: Box::new(SqlExpr::Literal(json!(10))),
            },
        ],
        ..Default::default()
    };

    let rendered = SqlRenderer::new(&PostgresDialect).render_select(&query);
    assert!(rendered.sql.contains("= $1 AND"));
    assert!(rendered.sql.contains("= $2 AND"));
    assert!(rendered.sql.contains("> $3"));
    assert_eq!(rendered.params, vec![json!("org_1"), json!("PENDING"), json!(10)]);
}

#[test]
fn concat_interleaves_space_separators() {
    let query = SelectQuery {
        select: vec![SelectItem {
            expr: SqlExpr::Concat(vec![
                col("Customer", "city"),
                col("Customer", "state"),
                col("Customer", "country"),
            ]),
            alias: "location".to_string(),
        }],
        from: "Customer".to_string(),
        ..Default::default()
    };

    let rendered = SqlRenderer::new(&PostgresDialect).render_select(&query);
    assert!(rendered.sql.contains(
        "CONCAT(\"Customer\".\"city\", ' ', \"Customer\".\"state\", ' ', \"Customer\".\"country\") AS \"location\""
    ));
    assert!(rendered.params.is_empty());
}

#[test]
fn quotes_embedded_double_quotes() {
    let query = SelectQuery {
        select: vec![SelectItem {
            expr: col("Odd\"Table", "col"),
            alias: "value".to_string(),
        }],
        from: "Odd\"Table".to_string(),
        ..Default::default()
    };
    let rendered = SqlRenderer::new(&PostgresDialect).render_select(&query);
    assert!(rendered.sql.contains("\"Odd\"\"Table\""));
}

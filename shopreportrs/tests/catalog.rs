//! Catalog tests: builtin registry lookups, resolution order, YAML loading.

use std::fs;

use shopreport::catalog::{fk_column, Aggregation, Catalog, FieldSpec};

#[test]
fn builtin_exposes_the_three_base_record_types() {
    let catalog = Catalog::builtin();
    for id in ["transactions", "items", "customers"] {
        assert!(catalog.base_record(id).is_some(), "missing {id}");
    }
    assert!(catalog.base_record("warehouses").is_none());
}

#[test]
fn builtin_transactions_shape() {
    let catalog = Catalog::builtin();
    let transactions = catalog.base_record("transactions").unwrap();
    assert_eq!(transactions.table, "Transaction");

    let (total, relation) = transactions.resolve_metric("total").unwrap();
    assert!(relation.is_none());
    assert_eq!(total.agg, Aggregation::Sum);

    let (item_count, relation) = transactions.resolve_metric("item_count").unwrap();
    assert_eq!(item_count.agg, Aggregation::Count);
    assert_eq!(relation.unwrap().table, "Item");

    let (name, relation) = transactions.resolve_dimension("customer_name").unwrap();
    assert!(name.field.is_compound());
    assert_eq!(relation.unwrap().table, "Customer");
}

#[test]
fn resolution_prefers_native_over_relations() {
    let catalog = Catalog::builtin();
    let items = catalog.base_record("items").unwrap();
    // created_date exists natively; transaction_date only through the
    // Transaction relation.
    let (_, native) = items.resolve_dimension("created_date").unwrap();
    assert!(native.is_none());
    let (_, related) = items.resolve_dimension("transaction_date").unwrap();
    assert_eq!(related.unwrap().table, "Transaction");
}

#[test]
fn fk_naming_convention() {
    assert_eq!(fk_column("Transaction"), "transaction_id");
    assert_eq!(fk_column("Item"), "item_id");
}

#[test]
fn field_spec_parsing() {
    assert_eq!(FieldSpec::parse("status").columns(), ["status"]);
    let spec = FieldSpec::parse("first_name, last_name");
    assert!(spec.is_compound());
    assert_eq!(spec.columns(), ["first_name", "last_name"]);
}

#[test]
fn loads_records_from_yaml_dir() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("orders.yml"),
        r#"
id: orders
label: Orders
table: Order
metrics:
  - id: amount
    label: Amount
    table: Order
    column: amount
    agg: sum
dimensions:
  - id: channel
    label: Channel
    table: Order
    field: channel
relations:
  - table: Buyer
    join_field: buyer_id
    dimensions:
      - id: buyer_name
        label: Buyer
        table: Buyer
        field: first_name,last_name
      - id: buyer_location
        label: Location
        table: Buyer
        field: [city, state, country]
  - table: Sku
    join_through: OrderSku
    metrics:
      - id: sku_count
        label: SKUs
        table: Sku
        column: id
        agg: count
"#,
    )
    .unwrap();

    let catalog = Catalog::load_from_dir(dir.path()).unwrap();
    let orders = catalog.base_record("orders").unwrap();
    assert_eq!(orders.table, "Order");
    assert_eq!(orders.resolve_metric("amount").unwrap().0.agg, Aggregation::Sum);

    // Both field spec spellings parse to the same column list.
    let (name, _) = orders.resolve_dimension("buyer_name").unwrap();
    assert_eq!(name.field.columns(), ["first_name", "last_name"]);
    let (location, _) = orders.resolve_dimension("buyer_location").unwrap();
    assert_eq!(location.field.columns(), ["city", "state", "country"]);

    let (_, through) = orders.resolve_metric("sku_count").unwrap();
    assert_eq!(through.unwrap().table, "Sku");
}

#[test]
fn missing_catalog_dir_errors() {
    let err = Catalog::load_from_dir("/definitely/not/here").unwrap_err();
    assert!(err.to_string().contains("catalog directory not found"));
}

#[test]
fn shared_catalog_is_stable() {
    assert_eq!(
        Catalog::shared().records.len(),
        Catalog::builtin().records.len()
    );
}

use dbt_lens_model::{
    Catalog, Column, CoverageDiff, CoverageError, CoverageReport, CoverageType, Table,
};
use std::collections::BTreeMap;

fn orders_catalog(id_doc: bool, total_doc: bool) -> Catalog {
    let columns = BTreeMap::from([
        (
            "id".to_string(),
            Column::new("id".to_string(), id_doc, true),
        ),
        (
            "total".to_string(),
            Column::new("total".to_string(), total_doc, false),
        ),
    ]);
    let orders = Table::new(
        "model.jaffle_shop.orders".to_string(),
        "public.orders".to_string(),
        "models/marts/orders.sql".to_string(),
        columns,
    );
    Catalog::new(BTreeMap::from([(orders.unique_id.clone(), orders)]))
}

#[test]
fn diff_against_itself_has_no_new_misses() {
    let report = CoverageReport::from_catalog(&orders_catalog(true, false), CoverageType::Doc);
    let diff = CoverageDiff::new(Some(&report), &report).expect("diff");
    assert!(diff.new_misses.is_empty());
}

#[test]
fn an_introduced_regression_is_reported_per_table_and_column() {
    let baseline =
        CoverageReport::from_catalog(&orders_catalog(true, true), CoverageType::Doc);
    let current =
        CoverageReport::from_catalog(&orders_catalog(true, false), CoverageType::Doc);

    let diff = CoverageDiff::new(Some(&baseline), &current).expect("diff");
    let table_keys: Vec<&String> = diff.new_misses.keys().collect();
    assert_eq!(table_keys, vec!["public.orders"]);

    let orders_diff = &diff.new_misses["public.orders"];
    let column_keys: Vec<&String> = orders_diff.new_misses.keys().collect();
    assert_eq!(column_keys, vec!["total"]);

    let total_diff = &orders_diff.new_misses["total"];
    assert!(total_diff.new_misses.is_empty());
}

#[test]
fn preexisting_misses_are_not_new_misses() {
    // `total` is a miss on both sides; only `id` regressed.
    let baseline =
        CoverageReport::from_catalog(&orders_catalog(true, false), CoverageType::Doc);
    let current =
        CoverageReport::from_catalog(&orders_catalog(false, false), CoverageType::Doc);

    let diff = CoverageDiff::new(Some(&baseline), &current).expect("diff");
    let orders_diff = &diff.new_misses["public.orders"];
    let column_keys: Vec<&String> = orders_diff.new_misses.keys().collect();
    assert_eq!(column_keys, vec!["id"]);
}

#[test]
fn unchanged_misses_leave_new_misses_empty() {
    let baseline =
        CoverageReport::from_catalog(&orders_catalog(true, false), CoverageType::Doc);
    let current =
        CoverageReport::from_catalog(&orders_catalog(true, false), CoverageType::Doc);
    let diff = CoverageDiff::new(Some(&baseline), &current).expect("diff");
    assert!(diff.new_misses.is_empty());
}

#[test]
fn absent_baseline_counts_every_miss_as_new() {
    let current =
        CoverageReport::from_catalog(&orders_catalog(true, false), CoverageType::Doc);
    let diff = CoverageDiff::new(None, &current).expect("diff");
    let table_keys: Vec<&String> = diff.new_misses.keys().collect();
    assert_eq!(table_keys, vec!["public.orders"]);
    assert!(diff.new_misses["public.orders"].before.is_none());
}

#[test]
fn mismatched_coverage_types_are_incompatible() {
    let doc = CoverageReport::from_catalog(&orders_catalog(true, false), CoverageType::Doc);
    let test = CoverageReport::from_catalog(&orders_catalog(true, false), CoverageType::Test);
    let err = CoverageDiff::new(Some(&doc), &test).expect_err("must fail");
    assert!(matches!(err, CoverageError::IncompatibleReports(_)));
}

#[test]
fn mismatched_entity_kinds_are_incompatible() {
    let catalog = orders_catalog(true, false);
    let catalog_report = CoverageReport::from_catalog(&catalog, CoverageType::Doc);
    let table_report = CoverageReport::from_table(
        catalog.table("model.jaffle_shop.orders").expect("orders"),
        CoverageType::Doc,
    );
    let err = CoverageDiff::new(Some(&table_report), &catalog_report).expect_err("must fail");
    assert!(matches!(err, CoverageError::IncompatibleReports(_)));
}

#[test]
fn rehydrated_snapshot_diffs_by_counts() {
    let baseline =
        CoverageReport::from_catalog(&orders_catalog(true, true), CoverageType::Doc);
    let encoded = serde_json::to_string(&baseline.to_document()).expect("encode");
    let rehydrated = CoverageReport::from_json(&encoded).expect("decode");

    let current =
        CoverageReport::from_catalog(&orders_catalog(true, false), CoverageType::Doc);
    let diff = CoverageDiff::new(Some(&rehydrated), &current).expect("diff");
    assert_eq!(diff.new_misses.len(), 1);
    assert!(diff.new_misses.contains_key("public.orders"));
}

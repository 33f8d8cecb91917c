use dbt_lens_model::{
    Catalog, Column, CoverageDiff, CoverageFormat, CoverageReport, CoverageType, Table,
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
fn plain_table_layout_is_stable() {
    let report = CoverageReport::from_catalog(&orders_catalog(true, false), CoverageType::Doc);
    let separator = "=".repeat(69);
    let expected = format!(
        "Coverage report (doc)\n\
         {separator}\n\
         public.orders                                          1/2      50.0%\n\
         {separator}\n\
         Total                                                  1/2      50.0%\n"
    );
    assert_eq!(report.to_formatted_string(), expected);
    assert_eq!(report.render(CoverageFormat::StringTable), expected);
}

#[test]
fn markdown_table_layout_is_stable() {
    let report = CoverageReport::from_catalog(&orders_catalog(true, false), CoverageType::Doc);
    let expected = "\
# Coverage report (doc)
| Model | Columns Covered | % |
|:------|----------------:|:-:|
| public.orders                                                          |     1/2     |  50.0% |
| Total                                                                  |     1/2     |  50.0% |
";
    assert_eq!(report.to_markdown_table(), expected);
    assert_eq!(report.render(CoverageFormat::MarkdownTable), expected);
}

#[test]
fn self_diff_summary_shows_zero_deltas() {
    let report = CoverageReport::from_catalog(&orders_catalog(true, false), CoverageType::Doc);
    let diff = CoverageDiff::new(Some(&report), &report).expect("diff");
    let separator = "=".repeat(45);
    let expected = format!(
        "              before     after            +/-\n\
         {separator}\n\
         Coverage      50.00%    50.00%         +0.00%\n\
         {separator}\n\
         Tables             1         1          +0/-0\n\
         Columns            2         2          +0/-0\n\
         Hits               1         1          +0/-0\n\
         Misses             1         1          +0/-0\n\
         {separator}\n"
    );
    assert_eq!(diff.summary(), expected);
}

#[test]
fn self_diff_gap_listing_contains_only_the_catalog_row() {
    let report = CoverageReport::from_catalog(&orders_catalog(true, false), CoverageType::Doc);
    let diff = CoverageDiff::new(Some(&report), &report).expect("diff");
    let separator = "=".repeat(94);
    let expected = format!(
        "{separator}\n\
         Catalog                                               1/2    (50.00%)  ->     1/2    (50.00%) \n\
         {separator}\n"
    );
    assert_eq!(diff.new_misses_summary(), expected);
}

#[test]
fn regression_summary_reports_coverage_drop_and_miss_delta() {
    let baseline = CoverageReport::from_catalog(&orders_catalog(true, true), CoverageType::Doc);
    let current = CoverageReport::from_catalog(&orders_catalog(true, false), CoverageType::Doc);
    let diff = CoverageDiff::new(Some(&baseline), &current).expect("diff");

    let summary = diff.summary();
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines[2], "Coverage     100.00%    50.00%        -50.00%");
    assert_eq!(lines[4], "Tables             1         1          +0/-0");
    assert_eq!(lines[5], "Columns            2         2          +0/-0");
    assert_eq!(lines[6], "Hits               2         1          +0/-1");
    assert_eq!(lines[7], "Misses             0         1          +1/-0");
}

#[test]
fn regression_gap_listing_walks_catalog_table_and_column() {
    let baseline = CoverageReport::from_catalog(&orders_catalog(true, true), CoverageType::Doc);
    let current = CoverageReport::from_catalog(&orders_catalog(true, false), CoverageType::Doc);
    let diff = CoverageDiff::new(Some(&baseline), &current).expect("diff");

    let separator = "=".repeat(94);
    let expected = format!(
        "{separator}\n\
         Catalog                                               2/2    (100.00%) ->     1/2    (50.00%) \n\
         {separator}\n\
         - public.orders                                       2/2    (100.00%) ->     1/2    (50.00%) \n\
         -- total                                              1/1    (100.00%) ->     0/1     (0.00%) \n\
         {separator}\n"
    );
    assert_eq!(diff.new_misses_summary(), expected);
}

#[test]
fn gap_listing_renders_dashes_without_a_baseline_side() {
    let current = CoverageReport::from_catalog(&orders_catalog(true, false), CoverageType::Doc);
    let diff = CoverageDiff::new(None, &current).expect("diff");
    let listing = diff.new_misses_summary();
    assert!(listing.contains(
        "-- total                                              -/-       (-)    ->     0/1     (0.00%) "
    ));
}

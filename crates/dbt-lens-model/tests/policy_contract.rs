use dbt_lens_model::{
    check_minimum_coverage, check_no_regression, Catalog, Column, CoverageDiff, CoverageError,
    CoverageReport, CoverageType, Table,
};
use std::collections::BTreeMap;

fn catalog_with_coverage(documented: usize, total: usize) -> Catalog {
    let columns: BTreeMap<String, Column> = (0..total)
        .map(|i| {
            let name = format!("column_{i}");
            (name.clone(), Column::new(name, i < documented, false))
        })
        .collect();
    let table = Table::new(
        "model.project.wide".to_string(),
        "public.wide".to_string(),
        "models/wide.sql".to_string(),
        columns,
    );
    Catalog::new(BTreeMap::from([(table.unique_id.clone(), table)]))
}

#[test]
fn coverage_below_the_threshold_fails_with_context() {
    let report = CoverageReport::from_catalog(&catalog_with_coverage(1, 4), CoverageType::Doc);
    let err = check_minimum_coverage(&report, 0.75).expect_err("must fail");
    match err {
        CoverageError::BelowThreshold { measured, minimum } => {
            assert_eq!(measured, 0.25);
            assert_eq!(minimum, 0.75);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn coverage_meeting_the_threshold_passes() {
    let report = CoverageReport::from_catalog(&catalog_with_coverage(3, 4), CoverageType::Doc);
    assert!(check_minimum_coverage(&report, 0.75).is_ok());
    assert!(check_minimum_coverage(&report, 0.0).is_ok());
}

#[test]
fn decreased_coverage_is_a_regression() {
    let baseline = CoverageReport::from_catalog(&catalog_with_coverage(3, 4), CoverageType::Doc);
    let current = CoverageReport::from_catalog(&catalog_with_coverage(2, 4), CoverageType::Doc);
    let diff = CoverageDiff::new(Some(&baseline), &current).expect("diff");
    let err = check_no_regression(&diff).expect_err("must fail");
    match err {
        CoverageError::CoverageRegressed { before, after } => {
            assert_eq!(before, 0.75);
            assert_eq!(after, 0.5);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn stable_or_improved_coverage_is_not_a_regression() {
    let baseline = CoverageReport::from_catalog(&catalog_with_coverage(2, 4), CoverageType::Doc);
    let improved = CoverageReport::from_catalog(&catalog_with_coverage(3, 4), CoverageType::Doc);

    let same = CoverageDiff::new(Some(&baseline), &baseline).expect("diff");
    assert!(check_no_regression(&same).is_ok());

    let better = CoverageDiff::new(Some(&baseline), &improved).expect("diff");
    assert!(check_no_regression(&better).is_ok());
}

#[test]
fn regression_check_without_a_baseline_passes() {
    let current = CoverageReport::from_catalog(&catalog_with_coverage(1, 4), CoverageType::Doc);
    let diff = CoverageDiff::new(None, &current).expect("diff");
    assert!(check_no_regression(&diff).is_ok());
}

use crate::diff::CoverageDiff;
use crate::error::CoverageError;
use crate::report::CoverageReport;

pub fn check_minimum_coverage(
    report: &CoverageReport,
    min_coverage: f64,
) -> Result<(), CoverageError> {
    if report.coverage < min_coverage {
        return Err(CoverageError::BelowThreshold {
            measured: report.coverage,
            minimum: min_coverage,
        });
    }
    Ok(())
}

pub fn check_no_regression(diff: &CoverageDiff<'_>) -> Result<(), CoverageError> {
    let Some(before) = diff.before else {
        return Ok(());
    };
    if diff.after.coverage < before.coverage {
        return Err(CoverageError::CoverageRegressed {
            before: before.coverage,
            after: diff.after.coverage,
        });
    }
    Ok(())
}

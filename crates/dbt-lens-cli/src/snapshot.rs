use crate::CliError;
use dbt_lens_model::CoverageReport;
use std::fs;
use std::path::Path;

pub(crate) fn read_report(path: &Path) -> Result<CoverageReport, CliError> {
    let raw = fs::read_to_string(path).map_err(|e| {
        CliError::dependency(&format!("failed to read {}: {e}", path.display()))
    })?;
    CoverageReport::from_json(&raw).map_err(CliError::from)
}

pub(crate) fn write_report(report: &CoverageReport, path: &Path) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(&report.to_document())
        .map_err(|e| CliError::internal(&e.to_string()))?;
    fs::write(path, payload).map_err(|e| {
        CliError::internal(&format!("failed to write {}: {e}", path.display()))
    })
}

pub(crate) fn render_document(report: &CoverageReport) -> Result<String, CliError> {
    serde_json::to_string(&report.to_document()).map_err(|e| CliError::internal(&e.to_string()))
}

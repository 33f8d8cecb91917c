#![forbid(unsafe_code)]
//! Coverage model SSOT: the entity model supplied by ingestion, the
//! three-level `CoverageReport` tree, its persisted document form, and the
//! `CoverageDiff` regression engine.

mod catalog;
mod diff;
mod document;
mod error;
mod policy;
mod report;

pub use catalog::{Catalog, Column, Table};
pub use diff::CoverageDiff;
pub use document::{CatalogDocument, ColumnDocument, ReportDocument, TableDocument};
pub use error::CoverageError;
pub use policy::{check_minimum_coverage, check_no_regression};
pub use report::{
    ColumnRef, CoverageFormat, CoverageReport, CoverageType, EntityKind, ReportEntity,
};

pub const CRATE_NAME: &str = "dbt-lens-model";

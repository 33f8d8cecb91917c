use crate::error::CoverageError;
use crate::report::{ColumnRef, CoverageReport, CoverageType, ReportEntity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Persisted snapshot node. The three shapes are distinguished by the keys
/// they carry (`tables` for a catalog, `columns` for a table, neither for a
/// column), matching the documents this tool has always written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportDocument {
    Catalog(CatalogDocument),
    Table(TableDocument),
    Column(ColumnDocument),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogDocument {
    pub cov_type: String,
    pub covered: u64,
    pub total: u64,
    pub coverage: f64,
    pub tables: Vec<TableDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableDocument {
    pub name: String,
    pub covered: u64,
    pub total: u64,
    pub coverage: f64,
    pub columns: Vec<ColumnDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnDocument {
    pub name: String,
    pub covered: u64,
    pub total: u64,
    pub coverage: f64,
}

impl CoverageReport {
    /// Converts the report into its persisted form. The document stores
    /// counts and names only; individual `ColumnRef` identities beyond the
    /// stored names do not survive a round trip, cardinalities and coverage
    /// values do.
    #[must_use]
    pub fn to_document(&self) -> ReportDocument {
        let covered = self.covered.len() as u64;
        let total = self.total.len() as u64;
        match &self.entity {
            ReportEntity::Catalog { tables } => ReportDocument::Catalog(CatalogDocument {
                cov_type: self.cov_type.to_string(),
                covered,
                total,
                coverage: self.coverage,
                tables: tables
                    .values()
                    .filter_map(|table| match table.to_document() {
                        ReportDocument::Table(doc) => Some(doc),
                        _ => None,
                    })
                    .collect(),
            }),
            ReportEntity::Table { name, columns } => ReportDocument::Table(TableDocument {
                name: name.clone(),
                covered,
                total,
                coverage: self.coverage,
                columns: columns
                    .values()
                    .filter_map(|column| match column.to_document() {
                        ReportDocument::Column(doc) => Some(doc),
                        _ => None,
                    })
                    .collect(),
            }),
            ReportEntity::Column { name } => ReportDocument::Column(ColumnDocument {
                name: name.clone(),
                covered,
                total,
                coverage: self.coverage,
            }),
        }
    }

    /// Rebuilds a report from its persisted form, reconstructing placeholder
    /// refs bottom-up from the stored names.
    #[must_use]
    pub fn from_document(doc: &ReportDocument, cov_type: CoverageType) -> Self {
        match doc {
            ReportDocument::Catalog(catalog) => {
                let tables: BTreeMap<String, CoverageReport> = catalog
                    .tables
                    .iter()
                    .map(|table| (table.name.clone(), from_table_document(table, cov_type)))
                    .collect();
                let covered = tables
                    .values()
                    .flat_map(|report| report.covered.iter().cloned())
                    .collect();
                let total = tables
                    .values()
                    .flat_map(|report| report.total.iter().cloned())
                    .collect();
                Self::assemble(cov_type, ReportEntity::Catalog { tables }, covered, total)
            }
            ReportDocument::Table(table) => from_table_document(table, cov_type),
            ReportDocument::Column(column) => from_column_document(column, cov_type),
        }
    }

    /// Parses a serialized snapshot, deriving the coverage type from the
    /// document's own `cov_type` field.
    pub fn from_json(raw: &str) -> Result<Self, CoverageError> {
        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| CoverageError::MalformedDocument(e.to_string()))?;
        let cov_type_raw = value
            .get("cov_type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| CoverageError::MalformedDocument("missing cov_type".to_string()))?;
        let cov_type = CoverageType::from_str(cov_type_raw)?;
        let doc: ReportDocument = serde_json::from_value(value)
            .map_err(|e| CoverageError::MalformedDocument(e.to_string()))?;
        Ok(Self::from_document(&doc, cov_type))
    }
}

fn from_table_document(doc: &TableDocument, cov_type: CoverageType) -> CoverageReport {
    let columns: BTreeMap<String, CoverageReport> = doc
        .columns
        .iter()
        .map(|column| (column.name.clone(), from_column_document(column, cov_type)))
        .collect();
    let covered = columns
        .values()
        .flat_map(|report| report.covered.iter())
        .map(|reference| reference.with_table(&doc.name))
        .collect();
    let total = columns
        .values()
        .flat_map(|report| report.total.iter())
        .map(|reference| reference.with_table(&doc.name))
        .collect();
    CoverageReport::assemble(
        cov_type,
        ReportEntity::Table {
            name: doc.name.clone(),
            columns,
        },
        covered,
        total,
    )
}

fn from_column_document(doc: &ColumnDocument, cov_type: CoverageType) -> CoverageReport {
    let reference = ColumnRef::new(None, doc.name.clone());
    let covered = if doc.covered > 0 {
        BTreeSet::from([reference.clone()])
    } else {
        BTreeSet::new()
    };
    let total = BTreeSet::from([reference]);
    CoverageReport::assemble(
        cov_type,
        ReportEntity::Column {
            name: doc.name.clone(),
        },
        covered,
        total,
    )
}

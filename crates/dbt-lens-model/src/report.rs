use crate::catalog::{Catalog, Column, Table};
use crate::error::CoverageError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter, Write as _};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageType {
    Doc,
    Test,
}

impl CoverageType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Doc => "doc",
            Self::Test => "test",
        }
    }
}

impl Display for CoverageType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CoverageType {
    type Err = CoverageError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "doc" => Ok(Self::Doc),
            "test" => Ok(Self::Test),
            other => Err(CoverageError::UnsupportedCoverageType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageFormat {
    StringTable,
    MarkdownTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Catalog,
    Table,
    Column,
}

impl EntityKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Catalog => "catalog",
            Self::Table => "table",
            Self::Column => "column",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity of a column within coverage bookkeeping. `table` is `None` on
/// column-level reports and filled in as refs are propagated upward.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub column: String,
}

impl ColumnRef {
    #[must_use]
    pub fn new(table: Option<String>, column: String) -> Self {
        Self { table, column }
    }

    #[must_use]
    pub fn with_table(&self, table: &str) -> Self {
        Self {
            table: Some(table.to_string()),
            column: self.column.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportEntity {
    Catalog {
        tables: BTreeMap<String, CoverageReport>,
    },
    Table {
        name: String,
        columns: BTreeMap<String, CoverageReport>,
    },
    Column {
        name: String,
    },
}

/// One node of the fixed catalog -> table -> column coverage tree. Built
/// once, never mutated; `misses` and `coverage` are derived eagerly at
/// construction so a report is always internally consistent.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct CoverageReport {
    pub cov_type: CoverageType,
    pub entity: ReportEntity,
    pub covered: BTreeSet<ColumnRef>,
    pub total: BTreeSet<ColumnRef>,
    pub misses: BTreeSet<ColumnRef>,
    pub coverage: f64,
}

impl CoverageReport {
    pub(crate) fn assemble(
        cov_type: CoverageType,
        entity: ReportEntity,
        covered: BTreeSet<ColumnRef>,
        total: BTreeSet<ColumnRef>,
    ) -> Self {
        let misses = total.difference(&covered).cloned().collect();
        let coverage = if total.is_empty() {
            0.0
        } else {
            covered.len() as f64 / total.len() as f64
        };
        Self {
            cov_type,
            entity,
            covered,
            total,
            misses,
            coverage,
        }
    }

    #[must_use]
    pub fn from_catalog(catalog: &Catalog, cov_type: CoverageType) -> Self {
        let tables: BTreeMap<String, CoverageReport> = catalog
            .tables
            .values()
            .map(|table| (table.name.clone(), Self::from_table(table, cov_type)))
            .collect();
        // Table names are already embedded in the refs, no further rewriting.
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

    #[must_use]
    pub fn from_table(table: &Table, cov_type: CoverageType) -> Self {
        let columns: BTreeMap<String, CoverageReport> = table
            .columns
            .values()
            .map(|column| (column.name.clone(), Self::from_column(column, cov_type)))
            .collect();
        let covered = columns
            .values()
            .flat_map(|report| report.covered.iter())
            .map(|reference| reference.with_table(&table.name))
            .collect();
        let total = columns
            .values()
            .flat_map(|report| report.total.iter())
            .map(|reference| reference.with_table(&table.name))
            .collect();
        Self::assemble(
            cov_type,
            ReportEntity::Table {
                name: table.name.clone(),
                columns,
            },
            covered,
            total,
        )
    }

    #[must_use]
    pub fn from_column(column: &Column, cov_type: CoverageType) -> Self {
        let is_covered = match cov_type {
            CoverageType::Doc => column.doc,
            CoverageType::Test => column.test,
        };
        let reference = ColumnRef::new(None, column.name.clone());
        let mut covered = BTreeSet::new();
        if is_covered {
            covered.insert(reference.clone());
        }
        let total = BTreeSet::from([reference]);
        Self::assemble(
            cov_type,
            ReportEntity::Column {
                name: column.name.clone(),
            },
            covered,
            total,
        )
    }

    #[must_use]
    pub fn entity_kind(&self) -> EntityKind {
        match &self.entity {
            ReportEntity::Catalog { .. } => EntityKind::Catalog,
            ReportEntity::Table { .. } => EntityKind::Table,
            ReportEntity::Column { .. } => EntityKind::Column,
        }
    }

    #[must_use]
    pub fn entity_name(&self) -> Option<&str> {
        match &self.entity {
            ReportEntity::Catalog { .. } => None,
            ReportEntity::Table { name, .. } | ReportEntity::Column { name } => Some(name),
        }
    }

    #[must_use]
    pub fn subentities(&self) -> Option<&BTreeMap<String, CoverageReport>> {
        match &self.entity {
            ReportEntity::Catalog { tables } => Some(tables),
            ReportEntity::Table { columns, .. } => Some(columns),
            ReportEntity::Column { .. } => None,
        }
    }

    #[must_use]
    pub fn subentity(&self, key: &str) -> Option<&CoverageReport> {
        self.subentities().and_then(|children| children.get(key))
    }

    #[must_use]
    pub fn render(&self, format: CoverageFormat) -> String {
        match format {
            CoverageFormat::StringTable => self.to_formatted_string(),
            CoverageFormat::MarkdownTable => self.to_markdown_table(),
        }
    }

    #[must_use]
    pub fn to_formatted_string(&self) -> String {
        match &self.entity {
            ReportEntity::Table { name, .. } | ReportEntity::Column { name } => {
                self.plain_row(name)
            }
            ReportEntity::Catalog { tables } => {
                let mut out = String::new();
                let _ = writeln!(out, "Coverage report ({})", self.cov_type);
                let _ = writeln!(out, "{}", "=".repeat(69));
                for table in tables.values() {
                    out.push_str(&table.to_formatted_string());
                    out.push('\n');
                }
                let _ = writeln!(out, "{}", "=".repeat(69));
                let _ = writeln!(out, "{}", self.plain_row("Total"));
                out
            }
        }
    }

    #[must_use]
    pub fn to_markdown_table(&self) -> String {
        match &self.entity {
            ReportEntity::Table { name, .. } | ReportEntity::Column { name } => {
                self.markdown_row(name)
            }
            ReportEntity::Catalog { tables } => {
                let mut out = String::new();
                let _ = writeln!(out, "# Coverage report ({})", self.cov_type);
                let _ = writeln!(out, "| Model | Columns Covered | % |");
                let _ = writeln!(out, "|:------|----------------:|:-:|");
                for table in tables.values() {
                    out.push_str(&table.to_markdown_table());
                    out.push('\n');
                }
                let _ = writeln!(out, "{}", self.markdown_row("Total"));
                out
            }
        }
    }

    fn plain_row(&self, name: &str) -> String {
        format!(
            "{:<50} {:>5}/{:<5} {:>5.1}%",
            name,
            self.covered.len(),
            self.total.len(),
            self.coverage * 100.0
        )
    }

    fn markdown_row(&self, name: &str) -> String {
        format!(
            "| {:<70} | {:>5}/{:<5} | {:>5.1}% |",
            name,
            self.covered.len(),
            self.total.len(),
            self.coverage * 100.0
        )
    }
}

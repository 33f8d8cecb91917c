use crate::error::CoverageError;
use crate::report::{CoverageReport, EntityKind, ReportEntity};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

/// Comparison of two coverage snapshots of the same shape. `new_misses`
/// holds, per child key, the subtree of entities that own at least one
/// regressed column; children whose misses all pre-exist in `before` are
/// omitted. Built once, immutable afterwards.
#[derive(Debug)]
pub struct CoverageDiff<'a> {
    pub before: Option<&'a CoverageReport>,
    pub after: &'a CoverageReport,
    pub new_misses: BTreeMap<String, CoverageDiff<'a>>,
}

impl<'a> CoverageDiff<'a> {
    pub fn new(
        before: Option<&'a CoverageReport>,
        after: &'a CoverageReport,
    ) -> Result<Self, CoverageError> {
        if let Some(before) = before {
            if before.cov_type != after.cov_type {
                return Err(CoverageError::IncompatibleReports(format!(
                    "coverage types do not match: {} vs {}",
                    before.cov_type, after.cov_type
                )));
            }
            if before.entity_kind() != after.entity_kind() {
                return Err(CoverageError::IncompatibleReports(format!(
                    "entity types do not match: {} vs {}",
                    before.entity_kind(),
                    after.entity_kind()
                )));
            }
        }
        let new_misses = Self::find_new_misses(before, after)?;
        Ok(Self {
            before,
            after,
            new_misses,
        })
    }

    fn find_new_misses(
        before: Option<&'a CoverageReport>,
        after: &'a CoverageReport,
    ) -> Result<BTreeMap<String, CoverageDiff<'a>>, CoverageError> {
        if matches!(after.entity, ReportEntity::Column { .. }) {
            return Ok(BTreeMap::new());
        }
        let mut result = BTreeMap::new();
        for miss in &after.misses {
            if before.is_some_and(|b| b.misses.contains(miss)) {
                continue;
            }
            let key = match &after.entity {
                ReportEntity::Catalog { .. } => miss.table.as_deref().ok_or_else(|| {
                    CoverageError::MalformedDocument(
                        "catalog-level column ref is missing its owning table".to_string(),
                    )
                })?,
                _ => miss.column.as_str(),
            };
            if result.contains_key(key) {
                continue;
            }
            let after_child = after.subentity(key).ok_or_else(|| {
                CoverageError::MalformedDocument(format!(
                    "regressed column resolves to unknown subentity {key:?}"
                ))
            })?;
            let before_child = before.and_then(|b| b.subentity(key));
            result.insert(key.to_string(), CoverageDiff::new(before_child, after_child)?);
        }
        Ok(result)
    }

    /// Fixed-width before/after/delta table over the aggregate metrics.
    /// Count deltas are two-sided set differences rendered `+added/-removed`,
    /// so a rename shows on both sides instead of cancelling out.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{:<10}{:>10}{:>10}{:>15}", "", "before", "after", "+/-");
        let _ = writeln!(out, "{}", "=".repeat(45));
        let before_coverage = self.before.map(|b| b.coverage);
        let _ = writeln!(
            out,
            "{:<10}{:>10}{:>10}{:>15}",
            "Coverage",
            before_coverage.map_or_else(|| "-".to_string(), |c| format!("{:.2}%", c * 100.0)),
            format!("{:.2}%", self.after.coverage * 100.0),
            format!(
                "{:+.2}%",
                (self.after.coverage - before_coverage.unwrap_or(0.0)) * 100.0
            )
        );
        let _ = writeln!(out, "{}", "=".repeat(45));

        let after_tables: BTreeSet<&String> = self
            .after
            .subentities()
            .map(|children| children.keys().collect())
            .unwrap_or_default();
        let before_tables: Option<BTreeSet<&String>> = self.before.map(|b| {
            b.subentities()
                .map(|children| children.keys().collect())
                .unwrap_or_default()
        });
        out.push_str(&count_row("Tables", before_tables.as_ref(), &after_tables));
        out.push_str(&count_row(
            "Columns",
            self.before.map(|b| &b.total),
            &self.after.total,
        ));
        out.push_str(&count_row(
            "Hits",
            self.before.map(|b| &b.covered),
            &self.after.covered,
        ));
        out.push_str(&count_row(
            "Misses",
            self.before.map(|b| &b.misses),
            &self.after.misses,
        ));
        let _ = writeln!(out, "{}", "=".repeat(45));
        out
    }

    /// Recursive indented listing of every entity touched by `new_misses`.
    #[must_use]
    pub fn new_misses_summary(&self) -> String {
        match &self.after.entity {
            ReportEntity::Column { .. } => self.new_miss_summary_row(),
            ReportEntity::Table { .. } => {
                let mut out = self.new_miss_summary_row();
                for column in self.new_misses.values() {
                    out.push_str(&column.new_misses_summary());
                }
                out
            }
            ReportEntity::Catalog { .. } => {
                let separator = "=".repeat(94);
                let mut out = String::new();
                let _ = writeln!(out, "{separator}");
                out.push_str(&self.new_miss_summary_row());
                let _ = writeln!(out, "{separator}");
                for table in self.new_misses.values() {
                    out.push_str(&table.new_misses_summary());
                    let _ = writeln!(out, "{separator}");
                }
                out
            }
        }
    }

    fn new_miss_summary_row(&self) -> String {
        let prefix = match self.after.entity_kind() {
            EntityKind::Catalog => "",
            EntityKind::Table => "- ",
            EntityKind::Column => "-- ",
        };
        let title = format!("{prefix}{}", self.after.entity_name().unwrap_or("Catalog"));
        let before_covered = self
            .before
            .map_or_else(|| "-".to_string(), |b| b.covered.len().to_string());
        let before_total = self
            .before
            .map_or_else(|| "-".to_string(), |b| b.total.len().to_string());
        let before_pct = self
            .before
            .map_or_else(|| "(-)".to_string(), |b| format!("({:.2}%)", b.coverage * 100.0));
        format!(
            "{:<50}{:>5}/{:<5}{:^9} -> {:>5}/{:<5}{:^9}\n",
            title,
            before_covered,
            before_total,
            before_pct,
            self.after.covered.len(),
            self.after.total.len(),
            format!("({:.2}%)", self.after.coverage * 100.0)
        )
    }
}

fn delta_cell<T: Ord>(before: Option<&BTreeSet<T>>, after: &BTreeSet<T>) -> String {
    let added = before.map_or(after.len(), |b| after.difference(b).count());
    let removed = before.map_or(0, |b| b.difference(after).count());
    format!("+{added}/-{removed}")
}

fn count_row<T: Ord>(label: &str, before: Option<&BTreeSet<T>>, after: &BTreeSet<T>) -> String {
    format!(
        "{:<10}{:>10}{:>10}{:>15}\n",
        label,
        before.map_or_else(|| "-".to_string(), |b| b.len().to_string()),
        after.len(),
        delta_cell(before, after)
    )
}

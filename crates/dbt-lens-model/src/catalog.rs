use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Column {
    pub name: String,
    pub doc: bool,
    pub test: bool,
}

impl Column {
    #[must_use]
    pub fn new(name: String, doc: bool, test: bool) -> Self {
        Self { name, doc, test }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Table {
    pub unique_id: String,
    pub name: String,
    pub original_file_path: String,
    pub columns: BTreeMap<String, Column>,
}

impl Table {
    #[must_use]
    pub fn new(
        unique_id: String,
        name: String,
        original_file_path: String,
        columns: BTreeMap<String, Column>,
    ) -> Self {
        Self {
            unique_id,
            name,
            original_file_path,
            columns,
        }
    }

    #[must_use]
    pub fn column(&self, column_name: &str) -> Option<&Column> {
        self.columns.get(column_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    pub tables: BTreeMap<String, Table>,
}

impl Catalog {
    #[must_use]
    pub fn new(tables: BTreeMap<String, Table>) -> Self {
        Self { tables }
    }

    #[must_use]
    pub fn table(&self, table_id: &str) -> Option<&Table> {
        self.tables.get(table_id)
    }

    #[must_use]
    pub fn filter_by_path(&self, path_prefixes: &[String]) -> Catalog {
        let tables = self
            .tables
            .iter()
            .filter(|(_, table)| {
                path_prefixes
                    .iter()
                    .any(|prefix| table.original_file_path.starts_with(prefix.as_str()))
            })
            .map(|(id, table)| (id.clone(), table.clone()))
            .collect();
        Catalog { tables }
    }
}

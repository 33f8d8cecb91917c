// SPDX-License-Identifier: Apache-2.0

use crate::logging::{IngestLog, IngestStage};
use crate::manifest::{merged_nodes, Manifest};
use crate::IngestError;
use dbt_lens_model::{Catalog, Column, Table};
use serde_json::Value;
use std::collections::BTreeMap;

pub(crate) fn parse_catalog(
    catalog_json: &Value,
    manifest: &Manifest,
    log: &mut IngestLog,
) -> Result<Catalog, IngestError> {
    let nodes = merged_nodes(catalog_json, "catalog.json")?;

    let mut tables = BTreeMap::new();
    for (node_id, node) in &nodes {
        // Tables storing test failures are not part of the project surface.
        if node_id.starts_with("test.") {
            continue;
        }
        let unique_id = node
            .get("unique_id")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                IngestError(format!("catalog node {node_id} is missing unique_id"))
            })?;
        let manifest_table = manifest.table(unique_id)?.ok_or_else(|| {
            IngestError(format!("unique_id {unique_id} not found in manifest.json"))
        })?;

        let mut columns = BTreeMap::new();
        if let Some(raw_columns) = node.get("columns").and_then(Value::as_object) {
            for column in raw_columns.values() {
                let column_name = column
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        IngestError(format!(
                            "catalog node {unique_id} has a column without a name"
                        ))
                    })?
                    .to_lowercase();
                let doc = manifest_table
                    .columns
                    .get(&column_name)
                    .is_some_and(|manifest_column| !manifest_column.description.trim().is_empty());
                let test = manifest.column_test_count(unique_id, &column_name) > 0;
                columns.insert(column_name.clone(), Column::new(column_name, doc, test));
            }
        }

        tables.insert(
            unique_id.to_string(),
            Table::new(
                unique_id.to_string(),
                manifest_table.name.clone(),
                manifest_table.original_file_path.clone(),
                columns,
            ),
        );
    }

    log.emit(
        IngestStage::Catalog,
        "catalog.tables.loaded",
        BTreeMap::from([("count".to_string(), tables.len().to_string())]),
    );
    Ok(Catalog::new(tables))
}

// SPDX-License-Identifier: Apache-2.0

use crate::logging::{IngestLog, IngestStage};
use crate::IngestError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const SUPPORTED_MANIFEST_SCHEMA_VERSIONS: [&str; 9] = [
    "https://schemas.getdbt.com/dbt/manifest/v4.json",
    "https://schemas.getdbt.com/dbt/manifest/v5.json",
    "https://schemas.getdbt.com/dbt/manifest/v6.json",
    "https://schemas.getdbt.com/dbt/manifest/v7.json",
    "https://schemas.getdbt.com/dbt/manifest/v8.json",
    "https://schemas.getdbt.com/dbt/manifest/v9.json",
    "https://schemas.getdbt.com/dbt/manifest/v10.json",
    "https://schemas.getdbt.com/dbt/manifest/v11.json",
    "https://schemas.getdbt.com/dbt/manifest/v12.json",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestColumn {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestTable {
    pub unique_id: String,
    pub name: String,
    pub original_file_path: String,
    pub columns: BTreeMap<String, ManifestColumn>,
}

/// dbt manifest content reduced to what coverage needs: table records
/// partitioned by resource type, and the per-table, per-column test index.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Manifest {
    pub sources: BTreeMap<String, ManifestTable>,
    pub models: BTreeMap<String, ManifestTable>,
    pub seeds: BTreeMap<String, ManifestTable>,
    pub snapshots: BTreeMap<String, ManifestTable>,
    pub tests: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl Manifest {
    pub fn table(&self, table_id: &str) -> Result<Option<&ManifestTable>, IngestError> {
        let candidates: Vec<&ManifestTable> = [
            self.sources.get(table_id),
            self.models.get(table_id),
            self.seeds.get(table_id),
            self.snapshots.get(table_id),
        ]
        .into_iter()
        .flatten()
        .collect();
        if candidates.len() > 1 {
            return Err(IngestError(format!(
                "duplicate unique_id across manifest resource types: {table_id}"
            )));
        }
        Ok(candidates.into_iter().next())
    }

    #[must_use]
    pub fn column_test_count(&self, table_id: &str, column_name: &str) -> usize {
        self.tests
            .get(table_id)
            .and_then(|columns| columns.get(column_name))
            .map_or(0, Vec::len)
    }
}

pub(crate) fn parse_manifest(
    manifest_json: &Value,
    log: &mut IngestLog,
) -> Result<Manifest, IngestError> {
    check_schema_version(manifest_json, log)?;
    let nodes = merged_nodes(manifest_json, "manifest.json")?;

    let mut manifest = Manifest::default();
    for (node_id, node) in &nodes {
        let resource_type = node
            .get("resource_type")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let partition = match resource_type {
            "source" => &mut manifest.sources,
            "model" => &mut manifest.models,
            "seed" => &mut manifest.seeds,
            "snapshot" => &mut manifest.snapshots,
            _ => continue,
        };
        let table = parse_manifest_table(node_id, node, log)?;
        partition.insert(table.unique_id.clone(), table);
    }
    manifest.tests = parse_tests(&nodes);

    log.emit(
        IngestStage::Manifest,
        "manifest.tables.loaded",
        BTreeMap::from([(
            "count".to_string(),
            (manifest.sources.len()
                + manifest.models.len()
                + manifest.seeds.len()
                + manifest.snapshots.len())
            .to_string(),
        )]),
    );
    Ok(manifest)
}

pub(crate) fn merged_nodes(
    artifact_json: &Value,
    artifact_name: &str,
) -> Result<Map<String, Value>, IngestError> {
    let mut merged = Map::new();
    for section in ["sources", "nodes"] {
        let entries = artifact_json
            .get(section)
            .and_then(Value::as_object)
            .ok_or_else(|| {
                IngestError(format!("{artifact_name} is missing the {section} section"))
            })?;
        for (id, node) in entries {
            merged.insert(id.clone(), node.clone());
        }
    }
    Ok(merged)
}

fn check_schema_version(manifest_json: &Value, log: &mut IngestLog) -> Result<(), IngestError> {
    let version = manifest_json
        .get("metadata")
        .and_then(|metadata| metadata.get("dbt_schema_version"))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            IngestError("manifest.json is missing metadata.dbt_schema_version".to_string())
        })?;
    if !SUPPORTED_MANIFEST_SCHEMA_VERSIONS.contains(&version) {
        log.emit(
            IngestStage::Manifest,
            "manifest.schema_version.unsupported",
            BTreeMap::from([
                ("version".to_string(), version.to_string()),
                (
                    "supported".to_string(),
                    SUPPORTED_MANIFEST_SCHEMA_VERSIONS.join(", "),
                ),
            ]),
        );
    }
    Ok(())
}

fn parse_manifest_table(
    node_id: &str,
    node: &Value,
    log: &mut IngestLog,
) -> Result<ManifestTable, IngestError> {
    let unique_id = require_str(node, "unique_id", node_id)?.to_string();
    let schema = require_str(node, "schema", node_id)?;
    let name = require_str(node, "name", node_id)?;
    let original_file_path = match node.get("original_file_path").and_then(Value::as_str) {
        Some(path) => normalize_path(path),
        None => {
            log.emit(
                IngestStage::Manifest,
                "manifest.original_file_path.missing",
                BTreeMap::from([("unique_id".to_string(), unique_id.clone())]),
            );
            String::new()
        }
    };
    let mut columns = BTreeMap::new();
    if let Some(raw_columns) = node.get("columns").and_then(Value::as_object) {
        for column in raw_columns.values() {
            let column_name = require_str(column, "name", node_id)?.to_lowercase();
            let description = column
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            columns.insert(
                column_name.clone(),
                ManifestColumn {
                    name: column_name,
                    description,
                },
            );
        }
    }
    Ok(ManifestTable {
        unique_id,
        name: format!("{schema}.{name}").to_lowercase(),
        original_file_path,
        columns,
    })
}

fn parse_tests(nodes: &Map<String, Value>) -> BTreeMap<String, BTreeMap<String, Vec<String>>> {
    let mut tests: BTreeMap<String, BTreeMap<String, Vec<String>>> = BTreeMap::new();
    for (node_id, node) in nodes {
        if node.get("resource_type").and_then(Value::as_str) != Some("test") {
            continue;
        }
        let Some(test_metadata) = node.get("test_metadata") else {
            continue;
        };
        let depends_on: Vec<&str> = node
            .get("depends_on")
            .and_then(|deps| deps.get("nodes"))
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        if depends_on.is_empty() {
            continue;
        }
        // Relationship tests list the referenced table first; the table
        // under test is the last dependency.
        let table_id = if test_metadata.get("name").and_then(Value::as_str) == Some("relationships")
        {
            depends_on[depends_on.len() - 1]
        } else {
            depends_on[0]
        };
        let kwargs = test_metadata.get("kwargs");
        let column_name = node
            .get("column_name")
            .and_then(Value::as_str)
            .or_else(|| kwargs.and_then(|k| k.get("column_name")).and_then(Value::as_str))
            .or_else(|| kwargs.and_then(|k| k.get("arg")).and_then(Value::as_str));
        let Some(column_name) = column_name else {
            continue;
        };
        tests
            .entry(table_id.to_string())
            .or_default()
            .entry(column_name.to_lowercase())
            .or_default()
            .push(node_id.clone());
    }
    tests
}

fn require_str<'a>(node: &'a Value, key: &str, node_id: &str) -> Result<&'a str, IngestError> {
    node.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| IngestError(format!("manifest node {node_id} is missing {key}")))
}

fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

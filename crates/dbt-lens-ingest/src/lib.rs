// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod catalog;
mod logging;
mod manifest;

use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::PathBuf;

pub const CRATE_NAME: &str = "dbt-lens-ingest";

pub use logging::{IngestEvent, IngestLog, IngestStage};
pub use manifest::{
    Manifest, ManifestColumn, ManifestTable, SUPPORTED_MANIFEST_SCHEMA_VERSIONS,
};

#[derive(Debug)]
pub struct IngestError(pub String);
impl Display for IngestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for IngestError {}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub project_dir: PathBuf,
    pub run_artifacts_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub manifest: PathBuf,
    pub catalog: PathBuf,
}

#[must_use]
pub fn artifact_paths(opts: &LoadOptions) -> ArtifactPaths {
    let dir = opts
        .run_artifacts_dir
        .clone()
        .unwrap_or_else(|| opts.project_dir.join("target"));
    ArtifactPaths {
        manifest: dir.join("manifest.json"),
        catalog: dir.join("catalog.json"),
    }
}

#[derive(Debug)]
pub struct LoadResult {
    pub manifest: Manifest,
    pub catalog: dbt_lens_model::Catalog,
    pub events: Vec<IngestEvent>,
}

/// Loads and merges the two dbt artifacts into the entity model. One-shot,
/// synchronous; either a complete result or an error, never partial state.
pub fn load_artifacts(opts: &LoadOptions) -> Result<LoadResult, IngestError> {
    let paths = artifact_paths(opts);
    let mut log = IngestLog::default();

    if !paths.manifest.exists() {
        return Err(IngestError(format!(
            "manifest.json not found at {}. Run a dbt command to generate the manifest.",
            paths.manifest.display()
        )));
    }
    if !paths.catalog.exists() {
        return Err(IngestError(format!(
            "catalog.json not found at {}. Before using dbt-lens, run: dbt docs generate",
            paths.catalog.display()
        )));
    }

    let manifest_json = read_artifact(&paths.manifest)?;
    let manifest = manifest::parse_manifest(&manifest_json, &mut log)?;

    let catalog_json = read_artifact(&paths.catalog)?;
    let catalog = catalog::parse_catalog(&catalog_json, &manifest, &mut log)?;

    Ok(LoadResult {
        manifest,
        catalog,
        events: log.events().to_vec(),
    })
}

fn read_artifact(path: &PathBuf) -> Result<Value, IngestError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| IngestError(format!("failed to read {}: {e}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|e| IngestError(format!("failed to parse {}: {e}", path.display())))
}

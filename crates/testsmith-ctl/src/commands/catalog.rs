//! `testsmith catalog`: list operations with their components.

use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use testsmith_core::catalog::load_catalog;
use testsmith_core::{classify, HttpMethod};

use crate::output;
use crate::CatalogArgs;

#[derive(Debug, Serialize)]
struct CatalogEntry<'a> {
    method: HttpMethod,
    path: &'a str,
    operation_id: &'a str,
    component: String,
    parameters: usize,
    responses: &'a [String],
}

pub(crate) fn handle_catalog_command(args: CatalogArgs) -> anyhow::Result<()> {
    list_operations(&args.spec, args.json)
}

fn list_operations(spec: &Path, json: bool) -> anyhow::Result<()> {
    let catalog = load_catalog(spec)
        .with_context(|| format!("failed to load OpenAPI document '{}'", spec.display()))?;

    let entries: Vec<CatalogEntry<'_>> = catalog
        .operations
        .iter()
        .map(|op| CatalogEntry {
            method: op.method,
            path: &op.path,
            operation_id: &op.operation_id,
            component: classify(op).to_string(),
            parameters: op.parameters.len(),
            responses: &op.responses,
        })
        .collect();

    if json {
        output::plain(serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    output::header(format!(
        "{} {}",
        catalog.info.title.as_deref().unwrap_or("Untitled API"),
        catalog.info.version.as_deref().unwrap_or("")
    ));
    for entry in &entries {
        output::operation(entry.method, entry.path, &entry.component, entry.operation_id);
    }
    output::blank();
    output::label("Operations", entries.len());
    Ok(())
}

// src/process/project.rs

use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;

use crate::error::MissingColumnError;

/// Resolve `required` against `available`, returning source indices in the
/// order of `required`. Every absent name is reported at once.
pub fn resolve_columns(
    available: &[String],
    required: &[String],
) -> Result<Vec<usize>, MissingColumnError> {
    let mut indices = Vec::with_capacity(required.len());
    let mut missing = Vec::new();

    for name in required {
        match available.iter().position(|a| a == name) {
            Some(idx) => indices.push(idx),
            None => missing.push(name.clone()),
        }
    }

    if missing.is_empty() {
        Ok(indices)
    } else {
        Err(MissingColumnError {
            missing,
            available: available.to_vec(),
        })
    }
}

/// Project an already materialized batch down to `required`, by name.
pub fn project_batch(batch: &RecordBatch, required: &[String]) -> Result<RecordBatch> {
    let schema = batch.schema();
    let available: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();
    let indices = resolve_columns(&available, required)?;
    batch
        .project(&indices)
        .context("projecting record batch")
}

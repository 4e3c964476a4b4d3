// src/sink/inspect.rs

use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use deltalake::{DeltaOps, DeltaTable};
use futures::TryStreamExt;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::info;

use super::{partition_values, register_handlers, table_files};

/// What a Delta table holds right now.
#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub uri: String,
    pub version: i64,
    pub rows: usize,
    pub files: usize,
    pub columns: Vec<String>,
    pub partition_columns: Vec<String>,
    pub partitions: BTreeSet<String>,
}

/// Open the table at `uri` and load every row of its current version.
pub async fn read_table(
    uri: &str,
    storage_options: HashMap<String, String>,
) -> Result<(DeltaTable, Vec<RecordBatch>)> {
    register_handlers(uri);
    let table = deltalake::open_table_with_storage_options(uri, storage_options)
        .await
        .with_context(|| format!("opening delta table {}", uri))?;

    let (table, stream) = DeltaOps(table)
        .load()
        .await
        .with_context(|| format!("scanning delta table {}", uri))?;
    let batches: Vec<RecordBatch> = stream
        .try_collect()
        .await
        .with_context(|| format!("reading batches from {}", uri))?;

    Ok((table, batches))
}

#[tracing::instrument(level = "info", skip(storage_options))]
pub async fn inspect_table(
    uri: &str,
    storage_options: HashMap<String, String>,
) -> Result<TableReport> {
    let (table, batches) = read_table(uri, storage_options).await?;

    let snapshot = table.snapshot().context("reading table snapshot")?;
    let columns: Vec<String> = snapshot
        .schema()
        .fields()
        .map(|f| f.name().to_string())
        .collect();
    let partition_columns = snapshot.metadata().partition_columns.clone();
    let files = table_files(&table)?;

    let report = TableReport {
        uri: uri.to_string(),
        version: snapshot.version(),
        rows: batches.iter().map(|b| b.num_rows()).sum(),
        files: files.len(),
        columns,
        partitions: partition_values(&files, &partition_columns),
        partition_columns,
    };
    info!(
        version = report.version,
        rows = report.rows,
        files = report.files,
        "inspected"
    );
    Ok(report)
}

// src/sink/mod.rs

use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use deltalake::{protocol::SaveMode, DeltaOps, DeltaTable};
use parquet::{
    basic::{Compression, ZstdLevel},
    file::properties::WriterProperties,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeSet, HashMap},
    sync::Once,
    time::Instant,
};
use tracing::{debug, info};
use url::Url;

pub mod inspect;

pub use inspect::{inspect_table, read_table, TableReport};

/// How a write treats data already in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    Append,
    Overwrite,
}

impl From<WriteMode> for SaveMode {
    fn from(mode: WriteMode) -> Self {
        match mode {
            WriteMode::Append => SaveMode::Append,
            WriteMode::Overwrite => SaveMode::Overwrite,
        }
    }
}

/// Parquet codec for data files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Codec {
    Snappy,
    Zstd,
    Uncompressed,
}

impl Codec {
    fn writer_properties(self) -> WriterProperties {
        let compression = match self {
            Codec::Snappy => Compression::SNAPPY,
            Codec::Zstd => Compression::ZSTD(ZstdLevel::default()),
            Codec::Uncompressed => Compression::UNCOMPRESSED,
        };
        WriterProperties::builder()
            .set_compression(compression)
            .build()
    }
}

#[derive(Debug, Clone)]
pub struct SinkOptions {
    pub mode: WriteMode,
    /// Hive-style partition columns; empty writes an unpartitioned table.
    pub partition_by: Vec<String>,
    /// Passed through to the object store (credentials, region, endpoint...).
    pub storage_options: HashMap<String, String>,
    pub codec: Codec,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            mode: WriteMode::Append,
            partition_by: Vec::new(),
            storage_options: HashMap::new(),
            codec: Codec::Snappy,
        }
    }
}

impl SinkOptions {
    pub fn partitioned_by(mut self, column: impl Into<String>) -> Self {
        self.partition_by = vec![column.into()];
        self
    }
}

/// Result of a single committed write.
#[derive(Debug, Clone, Serialize)]
pub struct WriteOutcome {
    pub uri: String,
    pub version: i64,
    pub rows: usize,
    /// Data files referenced by the table after the commit.
    pub files: usize,
    /// Distinct values of the partition columns, as `col=value`.
    pub partitions: BTreeSet<String>,
}

static REGISTER_HANDLERS: Once = Once::new();

/// Register object-store handlers for remote schemes. Local paths and
/// `file://` URIs need none.
pub fn register_handlers(uri: &str) {
    let remote = Url::parse(uri)
        .map(|u| matches!(u.scheme(), "s3" | "s3a" | "gs"))
        .unwrap_or(false);
    if remote {
        REGISTER_HANDLERS.call_once(|| {
            deltalake::aws::register_handlers(None);
            deltalake::gcp::register_handlers(None);
            debug!("registered s3 and gcs handlers");
        });
    }
}

/// Collect `col=value` segments from table-relative file paths.
pub fn partition_values<I, S>(paths: I, partition_by: &[String]) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = BTreeSet::new();
    for path in paths {
        for segment in path.as_ref().split('/') {
            if let Some((col, _)) = segment.split_once('=') {
                if partition_by.iter().any(|p| p == col) {
                    out.insert(segment.to_string());
                }
            }
        }
    }
    out
}

/// Table-relative paths of every data file in the current version.
pub(crate) fn table_files(table: &DeltaTable) -> Result<Vec<String>> {
    Ok(table
        .get_files_iter()
        .context("listing table files")?
        .map(|p| p.to_string())
        .collect())
}

/// Writes record batches to one Delta table location.
pub struct DeltaSink {
    uri: String,
    options: SinkOptions,
}

impl DeltaSink {
    pub fn new(uri: impl Into<String>, options: SinkOptions) -> Self {
        Self {
            uri: uri.into(),
            options,
        }
    }

    /// Create the table if needed, then commit `batches` in one transaction.
    #[tracing::instrument(level = "info", skip(self, batches), fields(uri = %self.uri, partition_by = ?self.options.partition_by))]
    pub async fn write(&self, batches: Vec<RecordBatch>) -> Result<WriteOutcome> {
        register_handlers(&self.uri);
        let start = Instant::now();
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();

        let ops = DeltaOps::try_from_uri_with_storage_options(
            &self.uri,
            self.options.storage_options.clone(),
        )
        .await
        .with_context(|| format!("opening delta table {}", self.uri))?;

        let mut builder = ops
            .write(batches)
            .with_save_mode(self.options.mode.into())
            .with_writer_properties(self.options.codec.writer_properties());
        if !self.options.partition_by.is_empty() {
            builder = builder.with_partition_columns(self.options.partition_by.clone());
        }

        let table = builder
            .await
            .with_context(|| format!("writing delta table {}", self.uri))?;

        let version = table.snapshot().context("reading table snapshot")?.version();
        let files = table_files(&table)?;
        let partitions = partition_values(&files, &self.options.partition_by);

        info!(
            rows,
            version,
            files = files.len(),
            partitions = partitions.len(),
            elapsed = ?start.elapsed(),
            "committed"
        );

        Ok(WriteOutcome {
            uri: self.uri.clone(),
            version,
            rows,
            files: files.len(),
            partitions,
        })
    }
}

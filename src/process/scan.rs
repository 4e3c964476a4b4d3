// src/process/scan.rs

use anyhow::{bail, Context, Result};
use arrow::{
    array::ArrayRef,
    datatypes::SchemaRef,
    record_batch::{RecordBatch, RecordBatchOptions},
};
use csv::{ReaderBuilder, StringRecord, Trim};
use rayon::prelude::*;
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use crate::error::MissingColumnError;
use crate::process::{
    infer::{build_array, infer_kind},
    project::resolve_columns,
};
use crate::schema::{build_arrow_schema, Column};

/// Reader settings for a CSV scan.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    pub delimiter: u8,
    /// Rows per emitted RecordBatch.
    pub batch_size: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            batch_size: 65_536,
        }
    }
}

/// A CSV file that has been scanned but not read.
///
/// Only the header is parsed up front; `select` narrows the plan and
/// `collect` reads the rows. Records whose field count differs from the
/// header are kept: missing trailing fields become null, extra fields are
/// dropped.
#[derive(Debug, Clone)]
pub struct LazyCsv {
    path: PathBuf,
    options: CsvOptions,
    headers: Vec<String>,
    /// Source column indices to keep, in output order. `None` keeps all.
    projection: Option<Vec<usize>>,
}

/// Materialized, typed result of a `LazyCsv::collect`.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub columns: Vec<Column>,
    pub schema: SchemaRef,
    pub batches: Vec<RecordBatch>,
}

impl Dataset {
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// All batches merged into one.
    pub fn concat(&self) -> Result<RecordBatch> {
        arrow::compute::concat_batches(&self.schema, &self.batches).context("concatenating batches")
    }
}

fn open_reader(path: &Path, options: &CsvOptions) -> Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("opening CSV {}", path.display()))?;
    Ok(ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .flexible(true) // records with different field-counts are accepted
        .trim(Trim::All)
        .from_reader(BufReader::new(file)))
}

impl LazyCsv {
    /// Open `path` and read its header row.
    #[tracing::instrument(level = "debug", skip(path, options), fields(path = %path.as_ref().display()))]
    pub fn scan(path: impl AsRef<Path>, options: CsvOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut rdr = open_reader(&path, &options)?;
        let headers: Vec<String> = rdr
            .headers()
            .with_context(|| format!("reading CSV header of {}", path.display()))?
            .iter()
            .map(str::to_string)
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            bail!("CSV {} has no header row", path.display());
        }
        debug!(columns = headers.len(), "scanned header");

        Ok(Self {
            path,
            options,
            headers,
            projection: None,
        })
    }

    /// Every column named in the file header.
    pub fn source_columns(&self) -> &[String] {
        &self.headers
    }

    /// Columns `collect` will produce, in order.
    pub fn columns(&self) -> Vec<String> {
        match &self.projection {
            Some(idx) => idx.iter().map(|&i| self.headers[i].clone()).collect(),
            None => self.headers.clone(),
        }
    }

    /// Restrict the plan to `columns`, in the given order.
    pub fn select(self, columns: &[String]) -> Result<Self, MissingColumnError> {
        let current = self.columns();
        let picked = resolve_columns(&current, columns)?;
        let projection = match &self.projection {
            Some(prev) => picked.iter().map(|&i| prev[i]).collect(),
            None => picked,
        };
        Ok(Self {
            projection: Some(projection),
            ..self
        })
    }

    /// Read every record and build typed batches for the selected columns.
    #[tracing::instrument(level = "info", skip(self), fields(path = %self.path.display()))]
    pub fn collect(&self) -> Result<Dataset> {
        let names = self.columns();
        let indices: Vec<usize> = match &self.projection {
            Some(idx) => idx.clone(),
            None => (0..self.headers.len()).collect(),
        };

        let mut rdr = open_reader(&self.path, &self.options)?;
        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); indices.len()];
        let mut record = StringRecord::new();
        let mut rows = 0usize;
        let mut ragged = 0usize;

        while rdr.read_record(&mut record).with_context(|| {
            format!(
                "CSV parse error in {} at record {}",
                self.path.display(),
                rows
            )
        })? {
            if record.len() != self.headers.len() {
                ragged += 1;
            }
            for (column, &idx) in cells.iter_mut().zip(&indices) {
                // already trimmed by the reader
                let value = record
                    .get(idx)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
                column.push(value);
            }
            rows += 1;
        }

        if ragged > 0 {
            warn!(ragged, rows, "records with a field count different from the header");
        }

        let (columns, arrays): (Vec<Column>, Vec<ArrayRef>) = names
            .par_iter()
            .zip(cells.par_iter())
            .map(|(name, values)| {
                let kind = infer_kind(values.iter().map(|v| v.as_deref()));
                (Column::new(name.clone(), kind), build_array(kind, values))
            })
            .unzip();

        let schema = build_arrow_schema(&columns);
        let batch = RecordBatch::try_new_with_options(
            schema.clone(),
            arrays,
            &RecordBatchOptions::new().with_row_count(Some(rows)),
        )
        .context("building record batch from CSV columns")?;

        let batch_size = self.options.batch_size.max(1);
        let batches = if rows == 0 {
            vec![batch]
        } else {
            (0..rows)
                .step_by(batch_size)
                .map(|offset| batch.slice(offset, batch_size.min(rows - offset)))
                .collect()
        };

        info!(rows, columns = columns.len(), batches = batches.len(), "read CSV");
        Ok(Dataset {
            columns,
            schema,
            batches,
        })
    }
}

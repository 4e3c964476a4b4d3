// src/pipeline.rs

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::config::LoadConfig;
use crate::process::{CsvOptions, Dataset, LazyCsv};
use crate::sink::{DeltaSink, WriteOutcome};

/// What one load did.
#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub csv_path: String,
    pub rows: usize,
    pub columns: Vec<String>,
    pub unpartitioned: Option<WriteOutcome>,
    pub partitioned: Option<WriteOutcome>,
    pub elapsed_seconds: f64,
}

/// Scan the CSV, narrow it to the configured columns, materialize.
///
/// Fails with `MissingColumnError` before reading any rows if the header
/// lacks a configured column.
#[instrument(level = "info", skip(config), fields(path = %config.csv_path.display()))]
pub fn read_projected(config: &LoadConfig) -> Result<Dataset> {
    let options = CsvOptions {
        batch_size: config.batch_size,
        ..CsvOptions::default()
    };
    let lazy = LazyCsv::scan(&config.csv_path, options)?;
    debug!(source_columns = ?lazy.source_columns(), "scanned");

    let projected = lazy.select(&config.columns)?;
    let dataset = projected.collect()?;
    debug!(schema = ?dataset.schema, "projected");
    Ok(dataset)
}

/// Read, project, then write the unpartitioned and the partitioned table,
/// in that order. A failure in the second write leaves the first committed.
#[instrument(level = "info", skip(config))]
pub async fn run(config: &LoadConfig) -> Result<LoadSummary> {
    let start = Instant::now();

    if config.partitioned_table_uri.is_some()
        && !config.columns.contains(&config.partition_column)
    {
        bail!(
            "partition column `{}` is not among the selected columns",
            config.partition_column
        );
    }

    // CSV parsing is CPU bound
    let dataset = tokio::task::spawn_blocking({
        let config = config.clone();
        move || read_projected(&config)
    })
    .await
    .context("CSV reader task panicked")??;
    let rows = dataset.num_rows();
    info!(rows, "dataset ready");

    let unpartitioned = match &config.table_uri {
        Some(uri) => {
            let sink = DeltaSink::new(uri, config.sink_options());
            Some(sink.write(dataset.batches.clone()).await?)
        }
        None => {
            info!("skipping unpartitioned write");
            None
        }
    };

    let partitioned = match &config.partitioned_table_uri {
        Some(uri) => {
            let options = config
                .sink_options()
                .partitioned_by(config.partition_column.clone());
            let sink = DeltaSink::new(uri, options);
            Some(sink.write(dataset.batches.clone()).await?)
        }
        None => {
            info!("skipping partitioned write");
            None
        }
    };

    Ok(LoadSummary {
        csv_path: config.csv_path.display().to_string(),
        rows,
        columns: dataset.column_names(),
        unpartitioned,
        partitioned,
        elapsed_seconds: start.elapsed().as_secs_f64(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MissingColumnError;
    use crate::process::project_batch;
    use crate::schema::types::drive_stats_columns;
    use crate::sink::read_table;
    use arrow::array::Int64Array;
    use arrow::record_batch::RecordBatch;
    use arrow::util::display::array_value_to_string;
    use glob::glob;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::collections::HashMap;
    use std::fs::File;
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,drivelake=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    const DRIVE_STATS: &str = "\
date,serial_number,model,capacity_bytes,failure,datacenter,cluster_id,vault_id,pod_id,pod_slot_num,is_legacy_format,smart_1_normalized
2024-12-30,ZA10JDYK,ST4000DM000,4000787030016,0,sac0,0,1030,0,12,0,117
2024-12-31,ZCT0KTQ5,ST8000DM002,8001563222016,1,sac2,1,1043,7,3,0
";

    /// Scratch dir holding `data.csv` plus two table locations.
    fn setup(csv: &str) -> (TempDir, LoadConfig) {
        let dir = TempDir::new().unwrap();
        let csv_path = dir.path().join("data.csv");
        File::create(&csv_path)
            .unwrap()
            .write_all(csv.as_bytes())
            .unwrap();

        let config = LoadConfig {
            csv_path,
            table_uri: Some(dir.path().join("ducklamb").display().to_string()),
            partitioned_table_uri: Some(
                dir.path()
                    .join("ducklambcummulative")
                    .display()
                    .to_string(),
            ),
            ..LoadConfig::default()
        };
        (dir, config)
    }

    /// Row-wise string rendering, sorted, for order-insensitive comparison.
    fn sorted_rows(batches: &[RecordBatch]) -> Vec<String> {
        let mut rows = Vec::new();
        for batch in batches {
            for r in 0..batch.num_rows() {
                let cells: Vec<String> = batch
                    .columns()
                    .iter()
                    .map(|c| array_value_to_string(c.as_ref(), r).unwrap())
                    .collect();
                rows.push(cells.join("|"));
            }
        }
        rows.sort();
        rows
    }

    fn parquet_files(dir: &Path) -> Vec<std::path::PathBuf> {
        let pattern = format!("{}/*.parquet", dir.display());
        glob(&pattern).unwrap().filter_map(|e| e.ok()).collect()
    }

    #[test]
    fn test_read_projected_columns_in_order() -> Result<()> {
        let (_dir, config) = setup(DRIVE_STATS);
        let ds = read_projected(&config)?;
        assert_eq!(ds.column_names(), drive_stats_columns());
        // second row is short by one field and still counted
        assert_eq!(ds.num_rows(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_column_writes_nothing() -> Result<()> {
        init_test_logging();
        let (dir, config) = setup("date,serial_number,model\n2024-12-30,ZA10JDYK,ST4000DM000\n");

        let err = run(&config).await.unwrap_err();
        let missing = err
            .downcast_ref::<MissingColumnError>()
            .expect("MissingColumnError");
        assert!(missing.missing.contains(&"capacity_bytes".to_string()));
        assert!(!dir.path().join("ducklamb").exists());
        assert!(!dir.path().join("ducklambcummulative").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_run_writes_both_tables() -> Result<()> {
        init_test_logging();
        let (dir, config) = setup(DRIVE_STATS);

        let summary = run(&config).await?;
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.columns, drive_stats_columns());

        let unpartitioned = summary.unpartitioned.expect("unpartitioned outcome");
        assert_eq!(unpartitioned.version, 0);
        assert!(unpartitioned.partitions.is_empty());

        let partitioned = summary.partitioned.expect("partitioned outcome");
        assert_eq!(
            partitioned.partitions.into_iter().collect::<Vec<_>>(),
            vec!["date=2024-12-30".to_string(), "date=2024-12-31".to_string()]
        );

        let root = dir.path().join("ducklambcummulative");
        let pattern = format!("{}/date=*", root.display());
        let partition_dirs: Vec<_> = glob(&pattern)?.filter_map(|e| e.ok()).collect();
        assert_eq!(partition_dirs.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_header_only_commits_empty_tables() -> Result<()> {
        init_test_logging();
        let header = DRIVE_STATS.lines().next().unwrap();
        let (dir, config) = setup(&format!("{header}\n"));

        let summary = run(&config).await?;
        assert_eq!(summary.rows, 0);
        assert_eq!(summary.columns, drive_stats_columns());

        for outcome in [summary.unpartitioned, summary.partitioned] {
            let outcome = outcome.expect("write outcome");
            assert_eq!(outcome.version, 0);
            assert_eq!(outcome.rows, 0);
            assert!(outcome.partitions.is_empty());
        }
        assert!(dir.path().join("ducklamb/_delta_log").is_dir());
        assert!(dir.path().join("ducklambcummulative/_delta_log").is_dir());
        Ok(())
    }

    #[tokio::test]
    async fn test_each_partition_holds_its_row() -> Result<()> {
        init_test_logging();
        let (dir, config) = setup(DRIVE_STATS);
        run(&config).await?;

        let root = dir.path().join("ducklambcummulative");
        for (date, model, failure) in [
            ("2024-12-30", "ST4000DM000", 0),
            ("2024-12-31", "ST8000DM002", 1),
        ] {
            let files = parquet_files(&root.join(format!("date={}", date)));
            assert!(!files.is_empty(), "no data file for {}", date);

            let mut seen = Vec::new();
            for path in files {
                let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path)?)?.build()?;
                for batch in reader {
                    let batch = batch?;
                    let schema = batch.schema();
                    let models = batch.column(schema.index_of("model")?);
                    let failures = batch.column(schema.index_of("failure")?);
                    for i in 0..batch.num_rows() {
                        seen.push((
                            array_value_to_string(models.as_ref(), i)?,
                            array_value_to_string(failures.as_ref(), i)?,
                        ));
                    }
                }
            }
            assert_eq!(seen, vec![(model.to_string(), failure.to_string())]);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_unpartitioned_round_trip() -> Result<()> {
        init_test_logging();
        let (_dir, config) = setup(DRIVE_STATS);
        let expected = read_projected(&config)?;
        run(&config).await?;

        let uri = config.table_uri.clone().unwrap();
        let (_, batches) = read_table(&uri, HashMap::new()).await?;
        let projected = batches
            .iter()
            .map(|b| project_batch(b, &config.columns))
            .collect::<Result<Vec<_>>>()?;

        assert_eq!(sorted_rows(&projected), sorted_rows(&expected.batches));
        Ok(())
    }

    #[test]
    fn test_short_row_keeps_projected_fields() -> Result<()> {
        let (_dir, config) = setup(DRIVE_STATS);
        let ds = read_projected(&config)?;
        let batch = ds.concat()?;
        let pod_slot = batch
            .column(9)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(pod_slot.value(0), 12);
        assert_eq!(pod_slot.value(1), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_skip_partitioned() -> Result<()> {
        let (dir, mut config) = setup(DRIVE_STATS);
        config.partitioned_table_uri = None;

        let summary = run(&config).await?;
        assert!(summary.unpartitioned.is_some());
        assert!(summary.partitioned.is_none());
        assert!(!dir.path().join("ducklambcummulative").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_partition_column_must_be_selected() {
        let (_dir, mut config) = setup(DRIVE_STATS);
        config.partition_column = "smart_1_normalized".to_string();
        let err = run(&config).await.unwrap_err();
        assert!(err.to_string().contains("partition column"));
    }
}

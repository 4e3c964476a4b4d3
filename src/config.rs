// src/config.rs

use anyhow::{anyhow, Result};
use clap::Parser;
use std::{collections::HashMap, path::PathBuf};

use crate::schema::{types::drive_stats_columns, PARTITION_COLUMN};
use crate::sink::{Codec, SinkOptions, WriteMode};

pub const DEFAULT_CSV_PATH: &str = "data.csv";
pub const DEFAULT_TABLE_URI: &str = "s3://confessions-of-a-data-guy/ducklamb";
pub const DEFAULT_PARTITIONED_TABLE_URI: &str =
    "s3://confessions-of-a-data-guy/ducklambcummulative";
pub const DEFAULT_BATCH_SIZE: usize = 65_536;

/// Everything one load needs. Built from `Args` by the binary, directly by tests.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub csv_path: PathBuf,
    /// Columns kept, in output order.
    pub columns: Vec<String>,
    /// Unpartitioned destination; `None` skips that write.
    pub table_uri: Option<String>,
    /// Destination partitioned by `partition_column`; `None` skips that write.
    pub partitioned_table_uri: Option<String>,
    pub partition_column: String,
    pub mode: WriteMode,
    pub codec: Codec,
    pub batch_size: usize,
    pub storage_options: HashMap<String, String>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
            columns: drive_stats_columns(),
            table_uri: Some(DEFAULT_TABLE_URI.to_string()),
            partitioned_table_uri: Some(DEFAULT_PARTITIONED_TABLE_URI.to_string()),
            partition_column: PARTITION_COLUMN.to_string(),
            mode: WriteMode::Append,
            codec: Codec::Snappy,
            batch_size: DEFAULT_BATCH_SIZE,
            storage_options: HashMap::new(),
        }
    }
}

impl LoadConfig {
    /// Sink settings shared by both writes, unpartitioned.
    pub fn sink_options(&self) -> SinkOptions {
        SinkOptions {
            mode: self.mode,
            partition_by: Vec::new(),
            storage_options: self.storage_options.clone(),
            codec: self.codec,
        }
    }
}

/// Load a drive-stats CSV into an unpartitioned and a date-partitioned Delta table.
#[derive(Parser, Debug)]
#[command(name = "drivelake", version)]
pub struct Args {
    /// CSV file to load
    #[arg(long, env = "DRIVELAKE_CSV_PATH", default_value = DEFAULT_CSV_PATH)]
    pub csv_path: PathBuf,

    /// Unpartitioned Delta table
    #[arg(long, env = "DRIVELAKE_TABLE_URI", default_value = DEFAULT_TABLE_URI)]
    pub table_uri: String,

    /// Partitioned Delta table
    #[arg(
        long,
        env = "DRIVELAKE_PARTITIONED_TABLE_URI",
        default_value = DEFAULT_PARTITIONED_TABLE_URI
    )]
    pub partitioned_table_uri: String,

    #[arg(long, env = "DRIVELAKE_PARTITION_COLUMN", default_value = PARTITION_COLUMN)]
    pub partition_column: String,

    #[arg(long, env = "DRIVELAKE_MODE", value_enum, default_value_t = WriteMode::Append)]
    pub mode: WriteMode,

    #[arg(long, value_enum, default_value_t = Codec::Snappy)]
    pub compression: Codec,

    /// Rows per record batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Object store option, e.g. AWS_REGION=us-east-1 (repeatable)
    #[arg(long = "storage-option", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub storage_options: Vec<(String, String)>,

    #[arg(long)]
    pub skip_unpartitioned: bool,

    #[arg(long)]
    pub skip_partitioned: bool,
}

impl From<Args> for LoadConfig {
    fn from(args: Args) -> Self {
        Self {
            csv_path: args.csv_path,
            columns: drive_stats_columns(),
            table_uri: (!args.skip_unpartitioned).then_some(args.table_uri),
            partitioned_table_uri: (!args.skip_partitioned).then_some(args.partitioned_table_uri),
            partition_column: args.partition_column,
            mode: args.mode,
            codec: args.compression,
            batch_size: args.batch_size,
            storage_options: args.storage_options.into_iter().collect(),
        }
    }
}

/// Parse a `KEY=VALUE` pair.
pub fn parse_key_val(s: &str) -> Result<(String, String)> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got `{}`", s))?;
    if key.is_empty() {
        return Err(anyhow!("empty key in `{}`", s));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_hardcoded_locations() {
        let cfg = LoadConfig::from(Args::parse_from(["drivelake"]));
        assert_eq!(cfg.csv_path, PathBuf::from("data.csv"));
        assert_eq!(cfg.table_uri.as_deref(), Some(DEFAULT_TABLE_URI));
        assert_eq!(
            cfg.partitioned_table_uri.as_deref(),
            Some(DEFAULT_PARTITIONED_TABLE_URI)
        );
        assert_eq!(cfg.partition_column, "date");
        assert_eq!(cfg.mode, WriteMode::Append);
        assert_eq!(cfg.columns.len(), 10);
    }

    #[test]
    fn flags_override_defaults() {
        let cfg = LoadConfig::from(Args::parse_from([
            "drivelake",
            "--csv-path",
            "/tmp/in.csv",
            "--mode",
            "overwrite",
            "--compression",
            "zstd",
            "--storage-option",
            "AWS_REGION=us-east-1",
            "--storage-option",
            "AWS_ALLOW_HTTP=true",
            "--skip-partitioned",
        ]));
        assert_eq!(cfg.csv_path, PathBuf::from("/tmp/in.csv"));
        assert_eq!(cfg.mode, WriteMode::Overwrite);
        assert_eq!(cfg.codec, Codec::Zstd);
        assert!(cfg.partitioned_table_uri.is_none());
        assert!(cfg.table_uri.is_some());
        assert_eq!(
            cfg.storage_options.get("AWS_REGION").map(String::as_str),
            Some("us-east-1")
        );
        assert_eq!(cfg.storage_options.len(), 2);
    }

    #[test]
    fn key_val_parsing() {
        assert_eq!(
            parse_key_val("A=b=c").unwrap(),
            ("A".to_string(), "b=c".to_string())
        );
        assert!(parse_key_val("novalue").is_err());
        assert!(parse_key_val("=x").is_err());
    }
}

// src/schema/types.rs

use serde::{Deserialize, Serialize};

/// Columns kept from a drive-stats CSV, in output order.
pub const DRIVE_STATS_COLUMNS: [&str; 10] = [
    "date",
    "serial_number",
    "model",
    "capacity_bytes",
    "failure",
    "datacenter",
    "cluster_id",
    "vault_id",
    "pod_id",
    "pod_slot_num",
];

/// Column the second table is partitioned by.
pub const PARTITION_COLUMN: &str = "date";

/// Value kind inferred for a CSV column.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Int64,
    Float64,
    Date,
    Utf8,
}

/// A single column definition as inferred from CSV content.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq, Hash)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// The default column list, owned, for APIs that take `&[String]`.
pub fn drive_stats_columns() -> Vec<String> {
    DRIVE_STATS_COLUMNS.iter().map(|c| c.to_string()).collect()
}

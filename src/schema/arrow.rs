// src/schema/arrow.rs

use arrow::datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema};
use std::sync::Arc;

use super::types::{Column, ColumnKind};

/// Map an inferred column kind into an Arrow DataType.
///
/// - Int64   → Int64
/// - Float64 → Float64
/// - Date    → Date32 (days since epoch)
/// - Utf8    → Utf8
pub fn map_to_arrow_type(kind: ColumnKind) -> DataType {
    match kind {
        ColumnKind::Int64 => DataType::Int64,
        ColumnKind::Float64 => DataType::Float64,
        ColumnKind::Date => DataType::Date32,
        ColumnKind::Utf8 => DataType::Utf8,
    }
}

/// Build an ArrowSchema (inside an Arc) from a slice of inferred `Column`s.
/// Every field is nullable: short CSV rows leave trailing columns empty.
pub fn build_arrow_schema(cols: &[Column]) -> Arc<ArrowSchema> {
    let fields: Vec<ArrowField> = cols
        .iter()
        .map(|col| ArrowField::new(&col.name, map_to_arrow_type(col.kind), true))
        .collect();

    Arc::new(ArrowSchema::new(fields))
}

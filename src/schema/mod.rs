pub mod arrow;
pub mod types;

pub use self::arrow::{build_arrow_schema, map_to_arrow_type};
pub use types::{Column, ColumnKind, DRIVE_STATS_COLUMNS, PARTITION_COLUMN};

// src/process/mod.rs
pub mod infer;
pub mod project;
pub mod scan;

pub use project::{project_batch, resolve_columns};
pub use scan::{CsvOptions, Dataset, LazyCsv};

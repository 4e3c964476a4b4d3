pub mod config;
pub mod error;
pub mod pipeline;
pub mod process;
pub mod schema;
pub mod sink;

pub use config::LoadConfig;
pub use error::MissingColumnError;
pub use pipeline::{run, LoadSummary};

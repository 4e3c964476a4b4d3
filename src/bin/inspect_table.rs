use anyhow::Result;
use clap::Parser;
use drivelake::{config::parse_key_val, sink::inspect_table};
use tracing_subscriber::{fmt, EnvFilter};

/// Print version, row count, files and partitions of a Delta table.
#[derive(Parser, Debug)]
struct Args {
    /// Table location (local path, s3://, gs://)
    uri: String,

    /// Object store option, e.g. AWS_REGION=us-east-1 (repeatable)
    #[arg(long = "storage-option", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    storage_options: Vec<(String, String)>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let storage_options = args.storage_options.into_iter().collect();
    let report = inspect_table(&args.uri, storage_options).await?;

    println!("=== Delta table: {} ===", report.uri);
    println!("Version:           {}", report.version);
    println!("Rows:              {}", report.rows);
    println!("Data files:        {}", report.files);
    println!("Columns:           {}", report.columns.join(", "));
    if !report.partition_columns.is_empty() {
        println!("Partitioned by:    {}", report.partition_columns.join(", "));
        println!("Partitions:        {}", report.partitions.len());
        for p in &report.partitions {
            println!("  - {}", p);
        }
    }
    Ok(())
}

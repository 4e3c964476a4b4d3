use anyhow::Result;
use clap::Parser;
use drivelake::{
    config::{Args, LoadConfig},
    pipeline,
};
use std::env;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(log_level.parse().unwrap_or(Level::INFO.into())),
        )
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    // ─── 2) configure ────────────────────────────────────────────────
    let config = LoadConfig::from(Args::parse());
    info!(
        csv = %config.csv_path.display(),
        table = ?config.table_uri,
        partitioned_table = ?config.partitioned_table_uri,
        mode = ?config.mode,
        "startup"
    );

    // ─── 3) read → project → write ×2 ────────────────────────────────
    match pipeline::run(&config).await {
        Ok(summary) => {
            info!(
                rows = summary.rows,
                elapsed = %format!("{:.3}s", summary.elapsed_seconds),
                "all done"
            );
            println!("{}", serde_json::to_string(&summary)?);
            Ok(())
        }
        Err(e) => {
            error!("load failed: {:#}", e);
            Err(e)
        }
    }
}

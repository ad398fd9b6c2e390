use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use database::{Database, NewUsageRecord};
use tracing::{info, warn};

/// Records committed per transaction
const BATCH_SIZE: usize = 100;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore errors if not found)
    let _ = dotenvy::dotenv();

    // Initialize tracing for CLI output
    tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    let csv_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("Usage: load_usage_csv <path/to/dataset.csv>"))?;

    let db_config = config::DatabaseConfig::from_env()
        .map_err(|e| anyhow!("Failed to load database config: {e}"))?;

    let database = Database::from_config(&db_config)
        .await
        .context("Failed to connect to database")?;

    database
        .run_migrations()
        .await
        .context("Failed to run migrations")?;

    let inserted = load_csv(&database, &csv_path).await?;
    info!("Done. Inserted {} records", inserted);
    Ok(())
}

async fn load_csv(database: &Database, csv_path: &Path) -> Result<u64> {
    let mut reader = csv::Reader::from_path(csv_path)
        .context(format!("Failed to open CSV file: {}", csv_path.display()))?;

    info!(path = %csv_path.display(), "Insert begins");

    let mut batch = Vec::with_capacity(BATCH_SIZE);
    let mut inserted = 0;
    let mut skipped = 0;

    for (index, result) in reader.deserialize::<NewUsageRecord>().enumerate() {
        // Header is line 1
        let line = index + 2;
        let record = result.context(format!("Failed to parse CSV line {line}"))?;

        if let Err(reason) = record.validate() {
            warn!(line, %reason, "Skipping invalid record");
            skipped += 1;
            continue;
        }

        batch.push(record);
        if batch.len() == BATCH_SIZE {
            inserted += database
                .usage_info
                .insert_batch(&batch)
                .await
                .context(format!("Failed to insert batch ending at line {line}"))?;
            batch.clear();
            info!(inserted, "Committed batch");
        }
    }

    if !batch.is_empty() {
        inserted += database
            .usage_info
            .insert_batch(&batch)
            .await
            .context("Failed to insert final batch")?;
    }

    if skipped > 0 {
        warn!(skipped, "Some records were skipped");
    }

    Ok(inserted)
}

use serde_json::json;

use crate::cli::utils::{connect, output_success};
use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::DatabaseManager;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = connect().await?;
    DatabaseManager::run_migrations(&pool).await?;

    output_success(
        &output_format,
        &format!("Migrations applied to {}", config().database.name),
        Some(json!({ "database": config().database.name })),
    )
}

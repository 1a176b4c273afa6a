//! Ping command - check that the database answers through the pool

use anyhow::{Context, Result};
use scribe_orm::Database;
use serde_json::json;

use super::print_json;

pub async fn run_ping(db: &Database) -> Result<()> {
    let rows = db
        .select("select 1 as ok", &[], Some(1))
        .await
        .context("Database did not answer")?;

    print_json(&json!({
        "ok": !rows.is_empty(),
        "backend": db.backend().to_string(),
        "pool_size": db.size(),
        "idle": db.idle(),
    }))
}

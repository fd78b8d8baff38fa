// Migration Runner

use crate::error::map_sqlx_error;
use netloc_core::error::Result;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::info;

/// Versioned schema steps, applied in order
const MIGRATIONS: &[(i64, &str, &str)] = &[(
    1,
    "location cache",
    include_str!("../migrations/001_location_cache.sql"),
)];

/// Bring the location cache schema up to date (idempotent)
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await
    .map_err(map_sqlx_error)?;

    let current: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
        .fetch_one(pool)
        .await
        .map_err(map_sqlx_error)?;

    for &(version, name, sql) in MIGRATIONS.iter().filter(|(v, _, _)| *v > current) {
        info!(version, name, "Applying location cache migration");

        let mut tx = pool.begin().await.map_err(map_sqlx_error)?;
        for statement in statements(sql) {
            execute(&mut tx, &statement).await?;
        }
        sqlx::query(
            "INSERT INTO schema_version (version, applied_at)
             VALUES (?, CAST(strftime('%s', 'now') AS INTEGER) * 1000)",
        )
        .bind(version)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;
    }

    Ok(())
}

async fn execute(tx: &mut Transaction<'_, Sqlite>, statement: &str) -> Result<()> {
    sqlx::query(statement)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;
    Ok(())
}

/// Split a migration file into statements, dropping `--` comment lines
fn statements(sql: &str) -> Vec<String> {
    let stripped: String = sql
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .map(|line| format!("{}\n", line))
        .collect();

    stripped
        .split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .map(str::to_string)
        .collect()
}

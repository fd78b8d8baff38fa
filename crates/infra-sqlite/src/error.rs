// sqlx::Error -> AppError::Cache

use netloc_core::error::AppError;

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            // SQLite result codes: https://www.sqlite.org/rescode.html
            Some(code) => match code.as_ref() {
                "5" => AppError::Cache(format!(
                    "Database locked (SQLITE_BUSY): {}",
                    db_err.message()
                )),
                "13" => AppError::Cache(format!("Database full: {}", db_err.message())),
                other => AppError::Cache(format!(
                    "Database error [{}]: {}",
                    other,
                    db_err.message()
                )),
            },
            None => AppError::Cache(format!("Database error: {}", db_err.message())),
        },
        sqlx::Error::ColumnNotFound(col) => AppError::Cache(format!("Column not found: {}", col)),
        sqlx::Error::PoolTimedOut => AppError::Cache("Connection pool timed out".to_string()),
        // Connection, pool, protocol errors
        _ => AppError::Cache(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_become_cache_errors() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            AppError::Cache(msg) if msg.contains("timed out")
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::ColumnNotFound("latitude".into())),
            AppError::Cache(msg) if msg.contains("latitude")
        ));
    }
}

// SQLite LocationCache Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use netloc_core::domain::{Identifier, IdentifierKind, Location, ResolutionResult};
use netloc_core::error::{AppError, Result};
use netloc_core::port::{LocationCache, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::trace;

pub struct SqliteLocationCache {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteLocationCache {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }

    /// Number of stored outcomes, optionally restricted to one kind
    pub async fn count(&self, kind: Option<IdentifierKind>) -> Result<i64> {
        let count: std::result::Result<i64, sqlx::Error> = match kind {
            Some(kind) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM location_cache WHERE kind = ?")
                    .bind(kind.as_str())
                    .fetch_one(&self.pool)
                    .await
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM location_cache")
                    .fetch_one(&self.pool)
                    .await
            }
        };
        count.map_err(map_sqlx_error)
    }
}

#[async_trait]
impl LocationCache for SqliteLocationCache {
    async fn get(&self, identifier: &Identifier) -> Result<Option<ResolutionResult>> {
        let row = sqlx::query_as::<_, LocationRow>(
            r#"
            SELECT kind, key, latitude, longitude, accuracy, located_at
            FROM location_cache
            WHERE kind = ? AND key = ?
            "#,
        )
        .bind(identifier.kind().as_str())
        .bind(identifier.key())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(LocationRow::into_result).transpose()
    }

    async fn put(&self, result: &ResolutionResult) -> Result<()> {
        let identifier = &result.identifier;
        let location = result.location.as_ref();
        if let Some(location) = location {
            location.validate()?;
        }

        sqlx::query(
            r#"
            INSERT INTO location_cache (
                kind, key, latitude, longitude, accuracy, located_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (kind, key) DO UPDATE SET
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                accuracy = excluded.accuracy,
                located_at = excluded.located_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(identifier.kind().as_str())
        .bind(identifier.key())
        .bind(location.map(|l| l.latitude))
        .bind(location.map(|l| l.longitude))
        .bind(location.map(|l| l.accuracy))
        .bind(location.map(|l| l.time))
        .bind(self.time_provider.now_millis())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        trace!(identifier = %identifier, resolved = result.is_resolved(), "Cached outcome");
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LocationRow {
    kind: String,
    key: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    accuracy: Option<f64>,
    located_at: Option<i64>,
}

impl LocationRow {
    fn into_result(self) -> Result<ResolutionResult> {
        let kind: IdentifierKind = self.kind.parse()?;
        let identifier = Identifier::from_key(kind, &self.key)?;

        match (self.latitude, self.longitude, self.accuracy, self.located_at) {
            (Some(latitude), Some(longitude), Some(accuracy), Some(time)) => {
                let location = Location::new(latitude, longitude, accuracy, time)?;
                Ok(ResolutionResult::resolved(identifier, location))
            }
            (None, None, None, None) => Ok(ResolutionResult::unresolved(identifier)),
            _ => Err(AppError::Cache(format!(
                "Partial location stored for {}",
                identifier
            ))),
        }
    }
}

//! SQLite backend.

use super::{
    ColumnSpec, ColumnType, ImageRecord, PendingSelection, PredictedRecord, PredictionStore,
    TableLayout, redact_url, stored_prediction,
};
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::inference::PredictionResult;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use tracing::{debug, warn};

/// Image table in a SQLite database file.
pub struct SqliteStore {
    pool: SqlitePool,
    layout: TableLayout,
    batch: Option<Transaction<'static, Sqlite>>,
}

impl SqliteStore {
    /// Open the database named by `config.url`. The file must already exist.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let url = config.url.trim();
        let connection_error = |reason: String| Error::StoreConnection {
            url: redact_url(url),
            reason,
        };

        let in_memory = url.contains(":memory:");
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| connection_error(e.to_string()))?
            .create_if_missing(in_memory);

        // Every in-memory connection is a separate database.
        let max_connections = if in_memory { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| connection_error(e.to_string()))?;

        Ok(Self::from_pool(pool, config))
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: SqlitePool, config: &StoreConfig) -> Self {
        Self {
            pool,
            layout: TableLayout::from_config(config),
            batch: None,
        }
    }

    fn sql_type(column_type: ColumnType) -> &'static str {
        match column_type {
            ColumnType::Text => "TEXT",
            ColumnType::Float => "REAL",
        }
    }

    fn migration_error(&self, source: sqlx::Error) -> Error {
        Error::SchemaMigration {
            table: self.layout.table_name.clone(),
            source,
        }
    }
}

#[async_trait]
impl PredictionStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "SQLite"
    }

    async fn column_exists(&mut self, column: &str) -> Result<bool> {
        // SQLite column names are case-insensitive.
        let sql = "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2 COLLATE NOCASE";
        let count: i64 = sqlx::query_scalar(sql)
            .bind(&self.layout.table_name)
            .bind(column)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| self.migration_error(e))?;
        Ok(count > 0)
    }

    async fn add_columns(&mut self, columns: &[ColumnSpec]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| self.migration_error(e))?;

        for column in columns {
            let sql = format!(
                "ALTER TABLE {} ADD COLUMN \"{}\" {}",
                self.layout.table,
                column.name,
                Self::sql_type(column.column_type)
            );
            debug!("{sql}");
            sqlx::query(&sql)
                .execute(&mut *tx)
                .await
                .map_err(|e| self.migration_error(e))?;
        }

        tx.commit().await.map_err(|e| self.migration_error(e))
    }

    async fn fetch_pending(&mut self, selection: PendingSelection) -> Result<Vec<ImageRecord>> {
        let sql = format!(
            "SELECT CAST({id} AS INTEGER), {path} FROM {table}{clause}",
            id = self.layout.id,
            path = self.layout.path,
            table = self.layout.table,
            clause = self.layout.pending_clause(selection),
        );
        let query_error = |source| Error::StoreQuery {
            context: "fetching pending records".to_string(),
            source,
        };

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;

        rows.iter()
            .map(|row| {
                Ok(ImageRecord {
                    id: row.try_get(0).map_err(query_error)?,
                    file_path: row
                        .try_get::<Option<String>, _>(1)
                        .map_err(query_error)?
                        .unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn update_prediction(&mut self, id: i64, prediction: &PredictionResult) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET {} = ?1, {} = ?2, {} = ?3, {} = ?4 WHERE {} = ?5",
            self.layout.table,
            self.layout.weather,
            self.layout.weather_percent,
            self.layout.snow,
            self.layout.snow_percent,
            self.layout.id,
        );
        let write_error = |source| Error::StoreWrite { id, source };

        let tx = match &mut self.batch {
            Some(tx) => tx,
            batch @ None => batch.insert(self.pool.begin().await.map_err(write_error)?),
        };

        let result = sqlx::query(&sql)
            .bind(prediction.weather.as_str())
            .bind(f64::from(prediction.weather_confidence))
            .bind(prediction.snow.as_str())
            .bind(f64::from(prediction.snow_confidence))
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(write_error)?;

        if result.rows_affected() == 0 {
            return Err(write_error(sqlx::Error::RowNotFound));
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        if let Some(tx) = self.batch.take() {
            tx.commit()
                .await
                .map_err(|source| Error::StoreCommit { source })?;
        }
        Ok(())
    }

    async fn fetch_predicted(&mut self) -> Result<Vec<PredictedRecord>> {
        let layout = &self.layout;
        let sql = format!(
            "SELECT CAST({} AS INTEGER), {}, {}, CAST({} AS REAL), {}, CAST({} AS REAL) \
             FROM {} WHERE {} ORDER BY {}",
            layout.id,
            layout.path,
            layout.weather,
            layout.weather_percent,
            layout.snow,
            layout.snow_percent,
            layout.table,
            layout.set_predicate(),
            layout.id,
        );
        let query_error = |source| Error::StoreQuery {
            context: "fetching predicted records".to_string(),
            source,
        };

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.try_get(0).map_err(query_error)?;
            let file_path: Option<String> = row.try_get(1).map_err(query_error)?;
            let weather: String = row.try_get(2).map_err(query_error)?;
            let snow: String = row.try_get(4).map_err(query_error)?;

            match stored_prediction(
                &weather,
                row.try_get(3).map_err(query_error)?,
                &snow,
                row.try_get(5).map_err(query_error)?,
            ) {
                Some(prediction) => records.push(PredictedRecord {
                    id,
                    file_path: file_path.unwrap_or_default(),
                    prediction,
                }),
                None => warn!("Record {id}: unrecognized labels '{weather}' / '{snow}', ignored"),
            }
        }

        Ok(records)
    }
}

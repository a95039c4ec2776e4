//! PostgreSQL backend.
//!
//! Identifiers are quoted, so table and column names must match the
//! database exactly, including case.

use super::{
    ColumnSpec, ColumnType, ImageRecord, PendingSelection, PredictedRecord, PredictionStore,
    TableLayout, redact_url, stored_prediction,
};
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::inference::PredictionResult;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, PgPool, Postgres, Row, Transaction};
use tracing::{debug, warn};

/// Image table in a PostgreSQL database.
pub struct PostgresStore {
    pool: PgPool,
    layout: TableLayout,
    batch: Option<Transaction<'static, Postgres>>,
}

impl PostgresStore {
    /// Connect to the server named by `config.url`.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let url = config.url.trim();
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(url)
            .await
            .map_err(|e| Error::StoreConnection {
                url: redact_url(url),
                reason: e.to_string(),
            })?;

        Ok(Self {
            pool,
            layout: TableLayout::from_config(config),
            batch: None,
        })
    }

    fn sql_type(column_type: ColumnType) -> &'static str {
        match column_type {
            ColumnType::Text => "TEXT",
            ColumnType::Float => "DOUBLE PRECISION",
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
impl PredictionStore for PostgresStore {
    fn backend(&self) -> &'static str {
        "PostgreSQL"
    }

    async fn column_exists(&mut self, column: &str) -> Result<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1 AND column_name = $2)",
        )
        .bind(&self.layout.table_name)
        .bind(column)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| self.migration_error(e))
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
            "SELECT CAST({id} AS BIGINT), CAST({path} AS TEXT) FROM {table}{clause}",
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
            "UPDATE {} SET {} = $1, {} = $2, {} = $3, {} = $4 WHERE {} = $5",
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

        // A failed statement poisons the whole PostgreSQL transaction, so each
        // update runs inside its own savepoint.
        let mut savepoint = tx.begin().await.map_err(write_error)?;
        let result = sqlx::query(&sql)
            .bind(prediction.weather.as_str())
            .bind(f64::from(prediction.weather_confidence))
            .bind(prediction.snow.as_str())
            .bind(f64::from(prediction.snow_confidence))
            .bind(id)
            .execute(&mut *savepoint)
            .await
            .map_err(write_error)?;

        if result.rows_affected() == 0 {
            return Err(write_error(sqlx::Error::RowNotFound));
        }
        savepoint.commit().await.map_err(write_error)
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
            "SELECT CAST({} AS BIGINT), CAST({} AS TEXT), CAST({} AS TEXT), \
             CAST({} AS DOUBLE PRECISION), CAST({} AS TEXT), CAST({} AS DOUBLE PRECISION) \
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

//! Prediction store access.
//!
//! The image table lives in an external relational database. Each backend
//! implements [`PredictionStore`]; [`connect`] picks one from the URL
//! scheme in the configuration.

mod migrator;
mod postgres;
mod sqlite;

pub use migrator::{ensure_columns, prediction_columns};
pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

use crate::config::StoreConfig;
use crate::constants::columns;
use crate::error::{Error, Result};
use crate::inference::PredictionResult;
use async_trait::async_trait;
use tracing::info;

/// Logical type of an added column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Variable-length string.
    Text,
    /// Double-precision float.
    Float,
}

/// A column the pipeline needs on the image table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Column type.
    pub column_type: ColumnType,
}

impl ColumnSpec {
    /// Create a column spec.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Identity fields of an image row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    /// Row id.
    pub id: i64,
    /// File path as stored; empty when the column is NULL.
    pub file_path: String,
}

/// A row with all four prediction fields set.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictedRecord {
    /// Row id.
    pub id: i64,
    /// File path as stored.
    pub file_path: String,
    /// Stored prediction.
    pub prediction: PredictionResult,
}

/// Which rows a prediction run fetches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingSelection {
    /// Maximum number of rows.
    pub limit: Option<u64>,
    /// Include rows that already carry predictions.
    pub reprocess: bool,
}

/// Capabilities the pipeline needs from a backend.
///
/// Updates are buffered in an open transaction until [`commit`] is called;
/// anything not committed is lost when the store is dropped.
///
/// [`commit`]: PredictionStore::commit
#[async_trait]
pub trait PredictionStore: Send {
    /// Backend name for logs.
    fn backend(&self) -> &'static str;

    /// Whether `column` exists on the image table.
    async fn column_exists(&mut self, column: &str) -> Result<bool>;

    /// Add all `columns` to the image table as one unit.
    async fn add_columns(&mut self, columns: &[ColumnSpec]) -> Result<()>;

    /// Fetch id and path of the rows to classify, ordered by id.
    async fn fetch_pending(&mut self, selection: PendingSelection) -> Result<Vec<ImageRecord>>;

    /// Write all four prediction fields of one row in a single statement.
    async fn update_prediction(&mut self, id: i64, prediction: &PredictionResult) -> Result<()>;

    /// Commit buffered updates.
    async fn commit(&mut self) -> Result<()>;

    /// Fetch every row with a complete prediction, ordered by id.
    async fn fetch_predicted(&mut self) -> Result<Vec<PredictedRecord>>;
}

/// Open the store named by `config.url`.
pub async fn connect(config: &StoreConfig) -> Result<Box<dyn PredictionStore>> {
    let url = config.url.trim();

    let store: Box<dyn PredictionStore> = if url.starts_with("sqlite:") {
        Box::new(SqliteStore::connect(config).await?)
    } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        Box::new(PostgresStore::connect(config).await?)
    } else {
        return Err(Error::UnsupportedStore {
            url: redact_url(url),
        });
    };

    info!("Connected to {} store {}", store.backend(), redact_url(url));
    Ok(store)
}

/// Quoted identifiers for the image table.
#[derive(Debug, Clone)]
pub(crate) struct TableLayout {
    pub(crate) table_name: String,
    pub(crate) table: String,
    pub(crate) id: String,
    pub(crate) path: String,
    pub(crate) weather: String,
    pub(crate) weather_percent: String,
    pub(crate) snow: String,
    pub(crate) snow_percent: String,
}

impl TableLayout {
    pub(crate) fn from_config(config: &StoreConfig) -> Self {
        Self {
            table_name: config.table.clone(),
            table: quote_ident(&config.table),
            id: quote_ident(&config.id_column),
            path: quote_ident(&config.path_column),
            weather: quote_ident(columns::WEATHER),
            weather_percent: quote_ident(columns::WEATHER_PERCENT),
            snow: quote_ident(columns::SNOW),
            snow_percent: quote_ident(columns::SNOW_PERCENT),
        }
    }

    /// `WHERE` clause matching rows missing any prediction field.
    pub(crate) fn unset_predicate(&self) -> String {
        format!(
            "{} IS NULL OR {} IS NULL OR {} IS NULL OR {} IS NULL",
            self.weather, self.weather_percent, self.snow, self.snow_percent
        )
    }

    /// `WHERE` clause matching rows with every prediction field set.
    pub(crate) fn set_predicate(&self) -> String {
        format!(
            "{} IS NOT NULL AND {} IS NOT NULL AND {} IS NOT NULL AND {} IS NOT NULL",
            self.weather, self.weather_percent, self.snow, self.snow_percent
        )
    }

    /// Shared tail of the pending-rows query.
    pub(crate) fn pending_clause(&self, selection: PendingSelection) -> String {
        let mut clause = String::new();
        if !selection.reprocess {
            clause.push_str(&format!(" WHERE {}", self.unset_predicate()));
        }
        clause.push_str(&format!(" ORDER BY {}", self.id));
        if let Some(limit) = selection.limit {
            clause.push_str(&format!(" LIMIT {limit}"));
        }
        clause
    }
}

/// Quote an identifier already checked by config validation.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Build a typed prediction from stored fields, if the labels are known.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn stored_prediction(
    weather: &str,
    weather_confidence: f64,
    snow: &str,
    snow_confidence: f64,
) -> Option<PredictionResult> {
    use crate::inference::{SnowLabel, WeatherLabel};

    Some(PredictionResult {
        weather: WeatherLabel::from_stored(weather.trim())?,
        weather_confidence: weather_confidence as f32,
        snow: SnowLabel::from_stored(snow.trim())?,
        snow_confidence: snow_confidence as f32,
    })
}

/// Strip the password from a connection URL.
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.split_once('@') {
        Some((credentials, host)) => {
            let user = credentials.split(':').next().unwrap_or_default();
            format!("{scheme}://{user}:***@{host}")
        }
        None => url.to_string(),
    }
}

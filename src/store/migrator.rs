//! Idempotent addition of prediction columns.

use super::{ColumnSpec, ColumnType, PredictionStore};
use crate::constants::columns;
use crate::error::Result;
use tracing::info;

/// The four columns a prediction run writes.
pub fn prediction_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new(columns::WEATHER, ColumnType::Text),
        ColumnSpec::new(columns::WEATHER_PERCENT, ColumnType::Float),
        ColumnSpec::new(columns::SNOW, ColumnType::Text),
        ColumnSpec::new(columns::SNOW_PERCENT, ColumnType::Float),
    ]
}

/// Add whichever of `specs` the image table lacks.
///
/// Returns the names of the columns added; empty when the schema was
/// already complete. All additions commit together.
pub async fn ensure_columns<S>(store: &mut S, specs: &[ColumnSpec]) -> Result<Vec<String>>
where
    S: PredictionStore + ?Sized,
{
    let mut missing = Vec::new();
    for spec in specs {
        if !store.column_exists(&spec.name).await? {
            missing.push(spec.clone());
        }
    }

    if missing.is_empty() {
        info!("Schema up to date, no columns added");
        return Ok(Vec::new());
    }

    store.add_columns(&missing).await?;

    let added: Vec<String> = missing.into_iter().map(|spec| spec.name).collect();
    info!("Added columns: {}", added.join(", "));
    Ok(added)
}

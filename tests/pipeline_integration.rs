//! End-to-end tests for predict and export against a SQLite archive.
//!
//! A stub classifier stands in for the ONNX model so the tests run without
//! the ONNX Runtime library.

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use image::{Rgb, RgbImage};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tempfile::TempDir;
use wxlabel::archive::PathResolver;
use wxlabel::config::StoreConfig;
use wxlabel::device::Device;
use wxlabel::error::SkipReason;
use wxlabel::export::{Category, ConfidenceExporter, ExportThreshold};
use wxlabel::inference::{ImageClassifier, ImageTensor, PredictionResult, SnowLabel, WeatherLabel};
use wxlabel::pipeline::{BatchInferenceRunner, PipelineContext, RunOptions};
use wxlabel::store::{SqliteStore, ensure_columns, prediction_columns};

/// Bright frames are confidently sunny with snow, dark frames are
/// overcast and bare.
struct BrightnessClassifier;

impl ImageClassifier for BrightnessClassifier {
    fn classify(&mut self, tensor: &ImageTensor) -> wxlabel::Result<PredictionResult> {
        let data = tensor.data();
        let mean = data.iter().sum::<f32>() / data.len() as f32;
        Ok(if mean > 0.0 {
            PredictionResult {
                weather: WeatherLabel::Sunny,
                weather_confidence: 95.0,
                snow: SnowLabel::Snow,
                snow_confidence: 93.0,
            }
        } else {
            PredictionResult {
                weather: WeatherLabel::Cloudy,
                weather_confidence: 60.0,
                snow: SnowLabel::NoSnow,
                snow_confidence: 70.0,
            }
        })
    }
}

struct Fixture {
    _dir: TempDir,
    archive: std::path::PathBuf,
    output: std::path::PathBuf,
    pool: SqlitePool,
}

fn write_frame(path: &Path, value: u8) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_pixel(64, 48, Rgb([value, value, value]))
        .save(path)
        .unwrap();
}

async fn fixture(rows: &[(i64, &str)]) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("archive");
    let output = dir.path().join("labeled");

    write_frame(&archive.join("cams").join("x1.jpg"), 250);
    write_frame(&archive.join("cams").join("x2.jpg"), 10);

    let options = SqliteConnectOptions::new()
        .filename(dir.path().join("images.db"))
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(2)
        .connect_with(options)
        .await
        .unwrap();

    sqlx::query(r#"CREATE TABLE "Images" ("Id" INTEGER PRIMARY KEY, "FilePath" TEXT)"#)
        .execute(&pool)
        .await
        .unwrap();
    for (id, path) in rows {
        sqlx::query(r#"INSERT INTO "Images" ("Id", "FilePath") VALUES (?, ?)"#)
            .bind(*id)
            .bind(*path)
            .execute(&pool)
            .await
            .unwrap();
    }

    Fixture {
        _dir: dir,
        archive,
        output,
        pool,
    }
}

fn resolver(archive: &Path) -> PathResolver {
    PathResolver::new(archive, &["/app".to_string()])
}

fn context(archive: &Path) -> PipelineContext<BrightnessClassifier> {
    PipelineContext::new(Device::cpu(), BrightnessClassifier, resolver(archive), 256, 224)
}

const ROWS: &[(i64, &str)] = &[
    (1, "/app/cams/x1.jpg"),
    (2, "/app/cams/missing.jpg"),
    (3, r"\app\cams\x2.jpg"),
];

#[tokio::test]
async fn test_missing_file_is_skipped_and_others_are_written() {
    let fx = fixture(ROWS).await;
    let mut store = SqliteStore::from_pool(fx.pool.clone(), &StoreConfig::default());
    let added = ensure_columns(&mut store, &prediction_columns()).await.unwrap();
    assert_eq!(added.len(), 4);

    let runner = BatchInferenceRunner::new(RunOptions {
        commit_interval: 1,
        ..RunOptions::default()
    });
    let report = runner.run(&mut context(&fx.archive), &mut store).await.unwrap();

    assert_eq!(report.fetched, 3);
    assert_eq!(report.updated, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.skips_for(SkipReason::PathResolution), 1);
    assert_eq!(report.skipped_records[0].id, 2);

    let rows = sqlx::query(
        r#"SELECT "Id", "weatherPrediction", "weatherPredictionPercent",
                  "snowPrediction", "snowPredictionPercent"
           FROM "Images" ORDER BY "Id""#,
    )
    .fetch_all(&fx.pool)
    .await
    .unwrap();

    let weather: Vec<Option<String>> = rows.iter().map(|r| r.get(1)).collect();
    assert_eq!(
        weather,
        vec![Some("Sunny".to_string()), None, Some("Cloudy".to_string())]
    );
    let snow: Option<String> = rows[2].get(3);
    assert_eq!(snow.as_deref(), Some("No Snow"));
    let percent: Option<f64> = rows[0].get(2);
    assert_eq!(percent, Some(95.0));
    let missing_percent: Option<f64> = rows[1].get(4);
    assert_eq!(missing_percent, None);
}

#[tokio::test]
async fn test_rerun_only_fetches_unfinished_records() {
    let fx = fixture(ROWS).await;
    let mut store = SqliteStore::from_pool(fx.pool.clone(), &StoreConfig::default());
    ensure_columns(&mut store, &prediction_columns()).await.unwrap();

    let runner = BatchInferenceRunner::default();
    runner.run(&mut context(&fx.archive), &mut store).await.unwrap();

    let second = runner.run(&mut context(&fx.archive), &mut store).await.unwrap();
    assert_eq!(second.fetched, 1);
    assert_eq!(second.updated, 0);
    assert_eq!(second.skips_for(SkipReason::PathResolution), 1);

    let added = ensure_columns(&mut store, &prediction_columns()).await.unwrap();
    assert!(added.is_empty());
}

#[tokio::test]
async fn test_predicted_records_export_into_category_folder() {
    let fx = fixture(ROWS).await;
    let mut store = SqliteStore::from_pool(fx.pool.clone(), &StoreConfig::default());
    ensure_columns(&mut store, &prediction_columns()).await.unwrap();
    BatchInferenceRunner::default()
        .run(&mut context(&fx.archive), &mut store)
        .await
        .unwrap();

    let exporter = ConfidenceExporter::new(
        vec![(
            Category::SunnyWithSnow,
            ExportThreshold {
                weather_min: 90.0,
                snow_min: 90.0,
                max_count: 10,
            },
        )],
        fx.output.clone(),
        resolver(&fx.archive),
    );
    let report = exporter.run(&mut store).await.unwrap();

    assert_eq!(report.examined, 2);
    assert_eq!(report.copied(), 1);
    assert_eq!(report.unmatched, 1);
    assert!(fx.output.join("Sunny_With_Snow").join("x1.jpg").is_file());
    assert!(!fx.output.join("Sunny_With_Snow").join("x2.jpg").exists());

    let again = exporter.run(&mut store).await.unwrap();
    assert_eq!(again.copied(), 0);
    let counts = again.category(Category::SunnyWithSnow).unwrap();
    assert_eq!(counts.preexisting, 1);
    assert_eq!(counts.already_present, 1);
}

#[tokio::test]
async fn test_limit_caps_fetched_records() {
    let fx = fixture(ROWS).await;
    let mut store = SqliteStore::from_pool(fx.pool.clone(), &StoreConfig::default());
    ensure_columns(&mut store, &prediction_columns()).await.unwrap();

    let mut options = RunOptions::default();
    options.selection.limit = Some(1);
    let report = BatchInferenceRunner::new(options)
        .run(&mut context(&fx.archive), &mut store)
        .await
        .unwrap();

    assert_eq!(report.fetched, 1);
    assert_eq!(report.updated, 1);
}

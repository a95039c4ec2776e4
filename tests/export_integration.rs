//! Exporter tests driven directly from predicted records.

#![allow(clippy::unwrap_used)]

use std::path::Path;
use wxlabel::archive::PathResolver;
use wxlabel::config::ExportConfig;
use wxlabel::export::{Category, ConfidenceExporter, ExportThreshold};
use wxlabel::inference::{PredictionResult, SnowLabel, WeatherLabel};
use wxlabel::store::PredictedRecord;

fn record(id: i64, name: &str, weather: WeatherLabel, snow: SnowLabel, conf: f32) -> PredictedRecord {
    PredictedRecord {
        id,
        file_path: format!("/app/frames/{name}"),
        prediction: PredictionResult {
            weather,
            weather_confidence: conf,
            snow,
            snow_confidence: conf,
        },
    }
}

fn write_frames(archive: &Path, names: &[&str]) {
    let frames = archive.join("frames");
    std::fs::create_dir_all(&frames).unwrap();
    for name in names {
        std::fs::write(frames.join(name), name.as_bytes()).unwrap();
    }
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_each_record_lands_in_at_most_one_folder() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("archive");
    let output = dir.path().join("out");
    write_frames(&archive, &["a.jpg", "b.jpg", "c.jpg", "d.jpg"]);

    let records = vec![
        record(1, "a.jpg", WeatherLabel::Sunny, SnowLabel::Snow, 99.0),
        record(2, "b.jpg", WeatherLabel::Sunny, SnowLabel::NoSnow, 99.0),
        record(3, "c.jpg", WeatherLabel::Cloudy, SnowLabel::Snow, 99.0),
        record(4, "d.jpg", WeatherLabel::Cloudy, SnowLabel::NoSnow, 10.0),
    ];

    let exporter = ConfidenceExporter::new(
        ExportConfig::default().rules(),
        output.clone(),
        PathResolver::new(&archive, &["/app".to_string()]),
    );
    let report = exporter.export_records(&records).unwrap();

    assert_eq!(report.copied(), 4);
    assert_eq!(files_in(&output.join("Sunny_With_Snow")), vec!["a.jpg"]);
    assert_eq!(files_in(&output.join("Sunny_No_Snow")), vec!["b.jpg"]);
    assert_eq!(files_in(&output.join("Cloudy_With_Snow")), vec!["c.jpg"]);
    assert_eq!(files_in(&output.join("Cloudy_No_Snow")), vec!["d.jpg"]);
}

#[test]
fn test_thresholds_and_caps_apply_per_category() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("archive");
    let output = dir.path().join("out");
    write_frames(&archive, &["s1.jpg", "s2.jpg", "s3.jpg", "low.jpg", "c1.jpg"]);

    let rules = vec![
        (
            Category::SunnyWithSnow,
            ExportThreshold {
                weather_min: 90.0,
                snow_min: 90.0,
                max_count: 2,
            },
        ),
        (
            Category::CloudyNoSnow,
            ExportThreshold {
                weather_min: 0.0,
                snow_min: 0.0,
                max_count: 0,
            },
        ),
    ];
    let records = vec![
        record(1, "low.jpg", WeatherLabel::Sunny, SnowLabel::Snow, 89.9),
        record(2, "s1.jpg", WeatherLabel::Sunny, SnowLabel::Snow, 90.0),
        record(3, "s2.jpg", WeatherLabel::Sunny, SnowLabel::Snow, 97.0),
        record(4, "s3.jpg", WeatherLabel::Sunny, SnowLabel::Snow, 99.0),
        record(5, "c1.jpg", WeatherLabel::Cloudy, SnowLabel::NoSnow, 99.0),
    ];

    let exporter = ConfidenceExporter::new(
        rules,
        output.clone(),
        PathResolver::new(&archive, &["/app".to_string()]),
    );
    let report = exporter.export_records(&records).unwrap();

    assert_eq!(report.below_threshold, 1);
    assert_eq!(report.over_cap, 2);
    assert_eq!(
        files_in(&output.join("Sunny_With_Snow")),
        vec!["s1.jpg", "s2.jpg"]
    );
    assert!(files_in(&output.join("Cloudy_No_Snow")).is_empty());
    assert_eq!(report.category(Category::CloudyNoSnow).unwrap().copied, 0);
}

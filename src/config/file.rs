//! Configuration file loading.

use crate::config::Config;
use crate::error::{Error, Result};
use std::path::Path;

/// Load configuration from a TOML file.
///
/// Returns default config if the file does not exist.
pub fn load_config_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| Error::ConfigParse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load configuration from the default platform-specific path.
///
/// Returns default config if no config file exists.
pub fn load_default_config() -> Result<Config> {
    super::config_file_path().map_or_else(|_| Ok(Config::default()), |path| load_config_file(&path))
}

/// Save configuration to a TOML file.
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::ConfigWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let contents = toml::to_string_pretty(config).map_err(|e| Error::ConfigSerialize { source: e })?;

    std::fs::write(path, contents).map_err(|e| Error::ConfigWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::config::InferenceDevice;
    use crate::export::Category;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_nonexistent_file_returns_default() {
        let path = Path::new("/nonexistent/path/config.toml");
        let config = load_config_file(path).unwrap();
        assert_eq!(config.store.table, "Images");
        assert_eq!(config.export.categories.len(), 4);
    }

    #[test]
    fn test_load_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[store]
url = "postgres://wx@localhost/images"

[archive]
root = "/mnt/archive"
stale_prefixes = ["/app", "/data/app"]

[model]
path = "/models/best_model.onnx"

[inference]
device = "gpu"
commit_interval = 50

[export]
output_dir = "/tmp/labeled"

[[export.categories]]
category = "Sunny_With_Snow"
weather_min = 90.0
snow_min = 90.0
max_count = 10
"#
        )
        .unwrap();

        let config = load_config_file(file.path()).unwrap();
        assert_eq!(config.store.url, "postgres://wx@localhost/images");
        assert_eq!(config.store.table, "Images");
        assert_eq!(config.archive.stale_prefixes.len(), 2);
        assert_eq!(config.inference.device, InferenceDevice::Gpu);
        assert_eq!(config.inference.commit_interval, 50);
        assert_eq!(config.export.categories.len(), 1);
        assert_eq!(
            config.export.categories[0].category,
            Category::SunnyWithSnow
        );
        assert_eq!(config.export.categories[0].weather_min, 90.0);
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "this is not valid toml {{{{").unwrap();

        let config = load_config_file(file.path());
        assert!(matches!(config, Err(Error::ConfigParse { .. })));
    }

    #[test]
    fn test_save_then_load_preserves_rules() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.export.categories.truncate(2);
        save_config(&config, &path).unwrap();

        let loaded = load_config_file(&path).unwrap();
        assert_eq!(loaded.export.categories.len(), 2);
        assert_eq!(
            loaded.export.categories[1].category,
            Category::SunnyNoSnow
        );
    }
}

//! Configuration validation.

use crate::config::Config;
use crate::constants::confidence;
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::path::Path;

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_store(config)?;
    validate_inference(config)?;
    validate_export(config)?;
    Ok(())
}

/// Validate store identifiers, which are interpolated into SQL.
fn validate_store(config: &Config) -> Result<()> {
    let store = &config.store;

    if store.url.trim().is_empty() {
        return Err(Error::ConfigValidation {
            message: "store.url must not be empty".to_string(),
        });
    }

    for (field, value) in [
        ("store.table", &store.table),
        ("store.id_column", &store.id_column),
        ("store.path_column", &store.path_column),
    ] {
        if !is_sql_identifier(value) {
            return Err(Error::ConfigValidation {
                message: format!("{field} must be a plain SQL identifier, got '{value}'"),
            });
        }
    }

    Ok(())
}

/// Validate inference run settings.
fn validate_inference(config: &Config) -> Result<()> {
    let inference = &config.inference;

    if inference.commit_interval == 0 {
        return Err(Error::ConfigValidation {
            message: "inference.commit_interval must be at least 1".to_string(),
        });
    }

    if inference.log_interval == 0 {
        return Err(Error::ConfigValidation {
            message: "inference.log_interval must be at least 1".to_string(),
        });
    }

    if config.model.crop == 0 || config.model.crop > config.model.resize {
        return Err(Error::ConfigValidation {
            message: format!(
                "model.crop must be between 1 and model.resize ({}), got {}",
                config.model.resize, config.model.crop
            ),
        });
    }

    Ok(())
}

/// Validate export category rules.
fn validate_export(config: &Config) -> Result<()> {
    let mut seen = HashSet::new();

    for rule in &config.export.categories {
        if !seen.insert(rule.category) {
            return Err(Error::ConfigValidation {
                message: format!("export category {} declared more than once", rule.category),
            });
        }

        for (name, value) in [("weather_min", rule.weather_min), ("snow_min", rule.snow_min)] {
            if !(confidence::MIN..=confidence::MAX).contains(&value) {
                return Err(Error::ConfigValidation {
                    message: format!(
                        "{}.{name} must be between {} and {}, got {value}",
                        rule.category,
                        confidence::MIN,
                        confidence::MAX
                    ),
                });
            }
        }
    }

    Ok(())
}

/// Require the archive root for commands that touch image files.
pub fn require_archive_root(config: &Config) -> Result<&Path> {
    let root = config
        .archive
        .root
        .as_deref()
        .ok_or_else(|| Error::ConfigValidation {
            message: "no archive root configured (use --archive-root or set archive.root)"
                .to_string(),
        })?;

    if !root.is_dir() {
        return Err(Error::ConfigValidation {
            message: format!("archive root is not a directory: {}", root.display()),
        });
    }

    Ok(root)
}

/// Require the model checkpoint for the predict command.
pub fn require_model_path(config: &Config) -> Result<&Path> {
    config
        .model
        .path
        .as_deref()
        .ok_or_else(|| Error::ConfigValidation {
            message: "no model checkpoint configured (use --model or set model.path)".to_string(),
        })
}

/// Require the export output directory.
pub fn require_export_dir(config: &Config) -> Result<&Path> {
    config
        .export
        .output_dir
        .as_deref()
        .ok_or_else(|| Error::ConfigValidation {
            message: "no export directory configured (use --output-dir or set export.output_dir)"
                .to_string(),
        })
}

/// Check that a name is safe to splice into SQL as an identifier.
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CategoryRuleConfig;
    use crate::export::Category;

    #[test]
    fn test_validate_default_config() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_rejects_injected_table_name() {
        let mut config = Config::default();
        config.store.table = "Images; DROP TABLE Images".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(Error::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_validate_zero_commit_interval() {
        let mut config = Config::default();
        config.inference.commit_interval = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_crop_larger_than_resize() {
        let mut config = Config::default();
        config.model.crop = 300;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_threshold_out_of_range() {
        let mut config = Config::default();
        config.export.categories[0].snow_min = 120.0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_duplicate_category() {
        let mut config = Config::default();
        config.export.categories.push(CategoryRuleConfig {
            category: Category::SunnyWithSnow,
            weather_min: 50.0,
            snow_min: 50.0,
            max_count: 1,
        });
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_is_sql_identifier() {
        assert!(is_sql_identifier("Images"));
        assert!(is_sql_identifier("_file_path2"));
        assert!(!is_sql_identifier("2images"));
        assert!(!is_sql_identifier("file-path"));
        assert!(!is_sql_identifier(""));
    }

    #[test]
    fn test_require_archive_root_missing() {
        let config = Config::default();
        assert!(require_archive_root(&config).is_err());
    }

    #[test]
    fn test_require_archive_root_present() {
        let dir = tempfile::tempdir();
        assert!(dir.is_ok());
        if let Ok(dir) = dir {
            let mut config = Config::default();
            config.archive.root = Some(dir.path().to_path_buf());
            assert!(require_archive_root(&config).is_ok());
        }
    }
}

//! Configuration loading and management.

mod file;
mod paths;
mod types;
mod validate;

pub use file::{load_config_file, load_default_config, save_config};
pub use paths::{config_dir, config_file_path};
pub use types::{
    ArchiveConfig, CategoryRuleConfig, Config, ExportConfig, InferenceConfig, InferenceDevice,
    ModelConfig, StoreConfig,
};
pub use validate::{
    is_sql_identifier, require_archive_root, require_export_dir, require_model_path,
    validate_config,
};

//! CLI argument parsing and config overrides.

mod args;
mod validators;

pub use args::{
    ArchiveArgs, Cli, Command, ConfigAction, ExportArgs, GlobalArgs, PredictArgs, StoreArgs,
};

use crate::config::{Config, InferenceDevice};

/// Apply store flags on top of the loaded configuration.
pub fn apply_store_args(config: &mut Config, args: &StoreArgs) {
    if let Some(url) = &args.db_url {
        config.store.url.clone_from(url);
    }
    if let Some(table) = &args.table {
        config.store.table.clone_from(table);
    }
}

/// Apply archive flags on top of the loaded configuration.
pub fn apply_archive_args(config: &mut Config, args: &ArchiveArgs) {
    if let Some(root) = &args.archive_root {
        config.archive.root = Some(root.clone());
    }
}

/// Apply predict flags on top of the loaded configuration.
pub fn apply_predict_args(config: &mut Config, args: &PredictArgs) {
    apply_store_args(config, &args.store);
    apply_archive_args(config, &args.archive);

    if let Some(model) = &args.model {
        config.model.path = Some(model.clone());
    }
    if args.gpu {
        config.inference.device = InferenceDevice::Gpu;
    } else if args.cpu {
        config.inference.device = InferenceDevice::Cpu;
    }
    if args.yes {
        config.inference.confirm_cpu_fallback = false;
    }
    if let Some(limit) = args.limit {
        config.inference.limit = Some(limit);
    }
    if args.reprocess {
        config.inference.reprocess = true;
    }
    if let Some(interval) = args.commit_interval {
        config.inference.commit_interval = interval;
    }
}

/// Apply export flags on top of the loaded configuration.
pub fn apply_export_args(config: &mut Config, args: &ExportArgs) {
    apply_store_args(config, &args.store);
    apply_archive_args(config, &args.archive);

    if let Some(dir) = &args.output_dir {
        config.export.output_dir = Some(dir.clone());
    }
}

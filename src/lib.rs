//! wxlabel - weather and snow-cover classification for webcam image archives.
//!
//! Predictions are written back into the image table of a relational store
//! and confident matches can be exported into one folder per category.

#![warn(missing_docs)]

pub mod archive;
pub mod cli;
pub mod config;
pub mod constants;
pub mod device;
pub mod error;
pub mod export;
pub mod inference;
pub mod output;
pub mod pipeline;
pub mod store;

use archive::PathResolver;
use clap::Parser;
use cli::{Cli, Command, ConfigAction};
use config::{
    Config, config_file_path, load_config_file, load_default_config, require_archive_root,
    require_export_dir, require_model_path, save_config, validate_config,
};
use device::{DeviceSelector, prompt_cpu_fallback};
use export::ConfidenceExporter;
use pipeline::{BatchInferenceRunner, PipelineContext, RunOptions};
use std::path::{Path, PathBuf};
use store::{PendingSelection, ensure_columns, prediction_columns};

pub use error::{Error, Result};

/// Main entry point for the wxlabel CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet);

    let config_path = cli.global.config.clone();
    let mut config = match &config_path {
        Some(path) => load_config_file(path)?,
        None => load_default_config()?,
    };
    let show_progress = cli.global.show_progress();

    match cli.command {
        Command::Config { action } => handle_config_command(action, config_path.as_deref()),
        Command::Devices => {
            handle_devices_command(&config);
            Ok(())
        }
        Command::Migrate(args) => {
            cli::apply_store_args(&mut config, &args);
            validate_config(&config)?;
            block_on(migrate(&config))
        }
        Command::Predict(args) => {
            cli::apply_predict_args(&mut config, &args);
            validate_config(&config)?;
            block_on(predict(&config, args.report.as_deref(), show_progress))
        }
        Command::Export(args) => {
            cli::apply_export_args(&mut config, &args);
            validate_config(&config)?;
            block_on(export(&config, args.report.as_deref(), show_progress))
        }
    }
}

/// Run the prediction pipeline with a fully resolved configuration.
pub async fn predict(config: &Config, report_path: Option<&Path>, show_progress: bool) -> Result<()> {
    require_archive_root(config)?;
    require_model_path(config)?;

    let device = DeviceSelector::new(
        config.inference.device,
        config.inference.confirm_cpu_fallback,
    )
    .select(prompt_cpu_fallback)?;
    let mut ctx = PipelineContext::load(config, device)?;

    let mut store = store::connect(&config.store).await?;
    ensure_columns(store.as_mut(), &prediction_columns()).await?;

    let runner = BatchInferenceRunner::new(RunOptions {
        selection: PendingSelection {
            limit: config.inference.limit,
            reprocess: config.inference.reprocess,
        },
        commit_interval: config.inference.commit_interval,
        log_interval: config.inference.log_interval,
        show_progress,
    });
    let report = runner.run(&mut ctx, store.as_mut()).await?;

    if let Some(path) = report_path {
        output::write_json_report(path, &report)?;
    }
    Ok(())
}

/// Add missing prediction columns and print what changed.
#[allow(clippy::print_stdout)]
pub async fn migrate(config: &Config) -> Result<()> {
    let mut store = store::connect(&config.store).await?;
    let added = ensure_columns(store.as_mut(), &prediction_columns()).await?;

    if added.is_empty() {
        println!("Schema up to date on table {}.", config.store.table);
    } else {
        println!("Added to table {}:", config.store.table);
        for column in &added {
            println!("  {column}");
        }
    }
    Ok(())
}

/// Export confident predictions with a fully resolved configuration.
#[allow(clippy::print_stdout)]
pub async fn export(config: &Config, report_path: Option<&Path>, show_progress: bool) -> Result<()> {
    let archive_root = require_archive_root(config)?;
    let output_dir = require_export_dir(config)?;

    let exporter = ConfidenceExporter::new(
        config.export.rules(),
        output_dir,
        PathResolver::new(archive_root, &config.archive.stale_prefixes),
    )
    .with_progress(show_progress);

    let mut store = store::connect(&config.store).await?;
    let report = exporter.run(store.as_mut()).await?;

    println!("Images per category:");
    for category in &report.categories {
        println!(
            "  {}: {} ({} new)",
            category.category,
            category.total(),
            category.copied
        );
    }

    if let Some(path) = report_path {
        output::write_json_report(path, &report)?;
    }
    Ok(())
}

fn block_on<F: std::future::Future<Output = Result<()>>>(future: F) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().map_err(|e| Error::Internal {
        message: format!("Failed to create async runtime: {e}"),
    })?;
    runtime.block_on(future)
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    // ORT is noisy about provider fallbacks; only surface it with -v and above.
    let filter_str = if quiet {
        "warn,ort=off"
    } else {
        match verbose {
            0 => "info,ort=off",
            1 => "debug,ort=warn",
            2 => "trace,ort=info",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str));

    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[allow(clippy::print_stdout)]
fn handle_devices_command(config: &Config) {
    let selector = DeviceSelector::new(config.inference.device, false);

    println!("Compute devices (in priority order):");
    println!();
    for (kind, available) in selector.survey() {
        let marker = if available { "✓" } else { "✗" };
        println!("  {marker} {}", kind.description());
    }
    println!();
    println!("Device selection:");
    println!("  (default)   Best available GPU, falling back to CPU");
    println!("  --gpu       Require a GPU, fail otherwise");
    println!("  --cpu       CPU only");
}

#[allow(clippy::print_stdout)]
fn handle_config_command(action: ConfigAction, override_path: Option<&Path>) -> Result<()> {
    let path: PathBuf = match override_path {
        Some(path) => path.to_path_buf(),
        None => config_file_path()?,
    };

    match action {
        ConfigAction::Init => {
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                save_config(&Config::default(), &path)?;
                println!("Created configuration file: {}", path.display());
                println!("\nNext steps: set store.url, archive.root and model.path.");
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_config_file(&path)?;
            let contents = toml::to_string_pretty(&config)
                .map_err(|source| Error::ConfigSerialize { source })?;
            println!("{contents}");
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_requires_output_dir() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let mut config = Config::default();
        config.archive.root = Some(dir.path().to_path_buf());

        let result = block_on(export(&config, None, false));
        assert!(matches!(result, Err(Error::ConfigValidation { .. })));
    }

    #[test]
    fn test_predict_requires_archive_root() {
        let result = block_on(predict(&Config::default(), None, false));
        assert!(matches!(result, Err(Error::ConfigValidation { .. })));
    }
}

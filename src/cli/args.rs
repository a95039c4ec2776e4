//! CLI argument definitions.

use super::validators::parse_positive;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Weather and snow-cover classification for webcam image archives.
#[derive(Debug, Parser)]
#[command(name = "wxlabel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Options shared by every command.
    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Options shared by every command.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Configuration file (default: platform config directory).
    #[arg(long, global = true, env = "WXLABEL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v: debug, -vv: trace+ORT info, -vvv: full trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors; hides progress bars.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Hide progress bars.
    #[arg(long, global = true)]
    pub no_progress: bool,
}

impl GlobalArgs {
    /// Whether progress bars should be drawn.
    pub const fn show_progress(&self) -> bool {
        !self.quiet && !self.no_progress
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Classify pending images and store their predictions.
    Predict(PredictArgs),
    /// Add missing prediction columns to the image table.
    Migrate(StoreArgs),
    /// Copy confident predictions into category folders.
    Export(ExportArgs),
    /// Show which compute devices are usable.
    Devices,
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Store connection overrides.
#[derive(Debug, Clone, Args)]
pub struct StoreArgs {
    /// Store URL (`sqlite://...` or `postgres://...`).
    #[arg(long, env = "WXLABEL_DB_URL")]
    pub db_url: Option<String>,

    /// Image table name.
    #[arg(long, env = "WXLABEL_TABLE")]
    pub table: Option<String>,
}

/// Archive location override.
#[derive(Debug, Clone, Args)]
pub struct ArchiveArgs {
    /// Directory stored paths are resolved against.
    #[arg(long, env = "WXLABEL_ARCHIVE_ROOT")]
    pub archive_root: Option<PathBuf>,
}

/// Arguments for the predict command.
#[derive(Debug, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct PredictArgs {
    /// Store connection.
    #[command(flatten)]
    pub store: StoreArgs,

    /// Archive location.
    #[command(flatten)]
    pub archive: ArchiveArgs,

    /// Path to the ONNX checkpoint (overrides config).
    #[arg(short, long, env = "WXLABEL_MODEL")]
    pub model: Option<PathBuf>,

    /// Require a GPU; fail if none is usable.
    #[arg(long, conflicts_with = "cpu")]
    pub gpu: bool,

    /// Force CPU inference.
    #[arg(long, conflicts_with = "gpu")]
    pub cpu: bool,

    /// Process at most this many records.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub limit: Option<u64>,

    /// Also re-classify records that already have predictions.
    #[arg(long)]
    pub reprocess: bool,

    /// Records between commits.
    #[arg(long, value_parser = parse_positive)]
    pub commit_interval: Option<usize>,

    /// Continue on CPU without asking when no GPU is found.
    #[arg(short, long)]
    pub yes: bool,

    /// Write a JSON run report to this file.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

/// Arguments for the export command.
#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Store connection.
    #[command(flatten)]
    pub store: StoreArgs,

    /// Archive location.
    #[command(flatten)]
    pub archive: ArchiveArgs,

    /// Directory receiving the category folders.
    #[arg(short, long, env = "WXLABEL_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Write a JSON export report to this file.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_predict_with_options() {
        let cli = Cli::try_parse_from([
            "wxlabel",
            "predict",
            "--db-url",
            "sqlite://images.db",
            "--archive-root",
            "/mnt/archive",
            "--model",
            "model.onnx",
            "--limit",
            "50",
            "--commit-interval",
            "10",
            "--cpu",
            "-q",
        ])
        .unwrap();

        assert!(cli.global.quiet);
        assert!(!cli.global.show_progress());
        match cli.command {
            Command::Predict(args) => {
                assert_eq!(args.store.db_url.as_deref(), Some("sqlite://images.db"));
                assert_eq!(args.archive.archive_root, Some(PathBuf::from("/mnt/archive")));
                assert_eq!(args.limit, Some(50));
                assert_eq!(args.commit_interval, Some(10));
                assert!(args.cpu);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_gpu_and_cpu_conflict() {
        assert!(Cli::try_parse_from(["wxlabel", "predict", "--gpu", "--cpu"]).is_err());
    }

    #[test]
    fn test_zero_commit_interval_rejected() {
        assert!(Cli::try_parse_from(["wxlabel", "predict", "--commit-interval", "0"]).is_err());
        assert!(Cli::try_parse_from(["wxlabel", "predict", "--limit", "0"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["wxlabel", "export", "-o", "out", "-vv"]).unwrap();
        assert_eq!(cli.global.verbose, 2);
        assert!(matches!(cli.command, Command::Export(_)));
    }

    #[test]
    fn test_parse_config_subcommand() {
        let cli = Cli::try_parse_from(["wxlabel", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::Show
            }
        ));
    }
}

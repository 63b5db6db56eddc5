use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sheetcopy_core::config::DEFAULT_CONFIG_FILE;
use sheetcopy_core::{FileRole, Session, SheetCopyConfig, load_file, load_pair};
use std::path::{Path, PathBuf};

mod formatter;
mod logging;

#[derive(Parser)]
#[command(name = "sheetcopy")]
#[command(about = "Copy a column from one Excel workbook into another", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the sheets of a workbook and the column labels of each sheet
    Inspect {
        /// Path to the Excel file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Copy a source column into a target column, row by row
    Copy {
        /// Workbook to copy from
        #[arg(long, value_name = "FILE")]
        source: PathBuf,

        /// Sheet in the source workbook
        #[arg(long, value_name = "SHEET")]
        source_sheet: String,

        /// Header label of the source column
        #[arg(long, value_name = "LABEL")]
        source_column: String,

        /// Workbook to copy into
        #[arg(long, value_name = "FILE")]
        target: PathBuf,

        /// Sheet in the target workbook
        #[arg(long, value_name = "SHEET")]
        target_sheet: String,

        /// Header label of the target column
        #[arg(long, value_name = "LABEL")]
        target_column: String,

        /// Output file (defaults to the configured output_file_name)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Show what would be done without writing the output
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON output for scripting
    Json,
}

fn load_config(config_path: Option<&Path>) -> Result<SheetCopyConfig> {
    let config = if let Some(config_path) = config_path {
        SheetCopyConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        // Try to load default config from current directory if it exists
        let default_config_path = PathBuf::from(DEFAULT_CONFIG_FILE);
        if default_config_path.exists() {
            SheetCopyConfig::from_file(&default_config_path).with_context(|| {
                format!(
                    "Failed to load config from {}",
                    default_config_path.display()
                )
            })?
        } else {
            SheetCopyConfig::default()
        }
    };

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    logging::init_logging(&config.log_level)?;
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Command::Inspect { file } => {
            let loaded = load_file(FileRole::Source, &file).await?;
            match cli.format {
                OutputFormat::Human => formatter::print_headers_human(&file, &loaded.headers),
                OutputFormat::Json => formatter::print_headers_json(&file, &loaded.headers)?,
            }
        }
        Command::Copy {
            source,
            source_sheet,
            source_column,
            target,
            target_sheet,
            target_column,
            output,
            dry_run,
        } => {
            let output_path = output.unwrap_or_else(|| PathBuf::from(&config.output_file_name));

            let mut session = Session::new(config);
            let (source, target) = load_pair(&source, &target).await?;
            session.apply_load(FileRole::Source, Ok(source))?;
            session.apply_load(FileRole::Target, Ok(target))?;

            session.select_sheet(FileRole::Source, &source_sheet)?;
            session.select_column(FileRole::Source, &source_column)?;
            session.select_sheet(FileRole::Target, &target_sheet)?;
            session.select_column(FileRole::Target, &target_column)?;

            let file = session.process().await?;

            if !dry_run {
                tokio::fs::write(&output_path, &file.bytes)
                    .await
                    .with_context(|| format!("Failed to write file: {}", output_path.display()))?;
            }

            match cli.format {
                OutputFormat::Human => formatter::print_copy_human(file, &output_path, dry_run),
                OutputFormat::Json => formatter::print_copy_json(file, &output_path, dry_run)?,
            }
        }
    }

    Ok(())
}

//! Command-line interface for dbutils
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and command-line overrides
//! - Resolution of raw arguments into engine option structs
//!
//! Option combinations that cannot run are rejected here, before any
//! connection is made or output file is opened.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::{Config, LogLevel};
use crate::error::{ConfigError, DbUtilsError, Result};
use crate::export::{ExportOptions, OutputTarget};
use crate::formatter::ExportFormat;
use crate::reconcile::{ComparisonFieldSet, ReconcileOptions, TimestampPolicy};
use crate::utils::parse::{parse_bool, parse_query_pair, split_fields};

/// Reconcile JSON lines into a MongoDB collection, or export it
#[derive(Parser, Debug)]
#[command(
    name = "dbutils",
    version,
    about = "Insert/update and export MongoDB documents",
    long_about = "Reconciles newline-delimited JSON records against a MongoDB collection
(insert, update or skip), and exports collections as JSON lines or CSV to stdout,
a file or fixed-size chunk files."
)]
pub struct CliArgs {
    /// MongoDB connection URI (overrides config and DBUTILS_URI)
    #[arg(long, global = true, value_name = "URI")]
    pub uri: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long = "config", global = true, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv", global = true)]
    pub very_verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Do not draw a progress spinner
    #[arg(long, global = true)]
    pub no_progress: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Operation modes
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Insert or update records from a JSON lines file
    Insert(InsertArgs),

    /// Export documents matching regex filters
    Query(QueryArgs),
}

/// Arguments of `dbutils insert`
#[derive(Args, Debug)]
pub struct InsertArgs {
    /// Database name
    #[arg(long, value_name = "NAME")]
    pub database: String,

    /// Collection name
    #[arg(long, value_name = "NAME")]
    pub collection: String,

    /// Newline-delimited JSON input
    #[arg(long, value_name = "FILE")]
    pub input_file: PathBuf,

    /// Field used to find the existing document for a record
    #[arg(long, value_name = "FIELD")]
    pub id_field: Option<String>,

    /// Update documents matching on the id field instead of always inserting
    #[arg(long)]
    pub create_or_update: bool,

    /// Manage created/updated timestamp fields
    #[arg(
        long,
        value_name = "BOOL",
        default_value = "true",
        value_parser = parse_bool,
        action = clap::ArgAction::Set
    )]
    pub auto_manage_timestamps: bool,

    /// Comma-separated fields deciding whether a record changed
    #[arg(long, value_name = "FIELDS")]
    pub compare_fields: Option<String>,

    /// Comma-separated fields ignored when deciding whether a record changed
    #[arg(long, value_name = "FIELDS")]
    pub compare_ignore_fields: Option<String>,
}

/// Arguments of `dbutils query`
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Database name
    #[arg(long, value_name = "NAME")]
    pub database: String,

    /// Collection name
    #[arg(long, value_name = "NAME")]
    pub collection: String,

    /// Comma-separated fields to export (default: whole documents)
    #[arg(long, value_name = "FIELDS")]
    pub columns: Option<String>,

    /// Documents per batch, and per file in file-chunks mode
    #[arg(long, value_name = "N")]
    pub batch_size: Option<u32>,

    /// Maximum number of documents to export
    #[arg(long, value_name = "N")]
    pub limit: Option<u64>,

    /// Where the output goes
    #[arg(long, value_enum, value_name = "MODE")]
    pub output_mode: OutputMode,

    /// Output serialization
    #[arg(long, value_enum, value_name = "TYPE")]
    pub output_file_type: ExportFormat,

    /// Write a CSV header at the top of each output
    #[arg(
        long,
        value_name = "BOOL",
        default_value = "false",
        value_parser = parse_bool,
        action = clap::ArgAction::Set
    )]
    pub include_header: bool,

    /// Output file (file mode) or directory (file-chunks mode)
    #[arg(long, value_name = "PATH")]
    pub output_path: Option<PathBuf>,

    /// Chunk file name prefix (file-chunks mode)
    #[arg(long, value_name = "PREFIX")]
    pub output_file_prefix: Option<String>,

    /// Chunk file extension (file-chunks mode)
    #[arg(long, value_name = "EXT")]
    pub output_file_extension: Option<String>,

    /// Regex filters, ANDed. Patterns use Rust regex syntax, so lookaround
    /// and backreferences are not supported
    #[arg(long, num_args = 1.., value_name = "KEY=REGEX")]
    pub queries: Vec<String>,
}

/// Output placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    Stdout,
    File,
    FileChunks,
}

impl InsertArgs {
    /// Resolve into engine options
    pub fn reconcile_options(&self, config: &Config) -> Result<ReconcileOptions> {
        let compare = ComparisonFieldSet::from_lists(
            self.compare_fields.as_deref().map(split_fields).unwrap_or_default(),
            self.compare_ignore_fields
                .as_deref()
                .map(split_fields)
                .unwrap_or_default(),
        )?;

        let options = ReconcileOptions {
            key_field: self
                .id_field
                .as_deref()
                .map(str::trim)
                .filter(|field| !field.is_empty())
                .map(str::to_string),
            create_or_update: self.create_or_update,
            compare,
            timestamps: TimestampPolicy::from_config(&config.timestamps, self.auto_manage_timestamps),
        };
        options.validate()?;
        Ok(options)
    }
}

impl QueryArgs {
    /// Resolve into export options
    ///
    /// # Arguments
    /// * `config` - Loaded configuration supplying defaults
    /// * `progress` - Whether a progress spinner may be drawn
    pub fn export_options(&self, config: &Config, progress: bool) -> Result<ExportOptions> {
        let batch_size = self.batch_size.unwrap_or(config.export.batch_size);
        if batch_size == 0 {
            return Err(invalid_value("batch-size", "0"));
        }
        if self.limit == Some(0) {
            return Err(invalid_value("limit", "0"));
        }

        let filters = self
            .queries
            .iter()
            .map(|query| parse_query_pair(query).map_err(|_| invalid_value("queries", query)))
            .collect::<Result<Vec<_>>>()?;

        Ok(ExportOptions {
            columns: self.columns.as_deref().map(split_fields).unwrap_or_default(),
            filters,
            batch_size,
            limit: self.limit,
            format: self.output_file_type,
            include_header: self.include_header,
            target: self.output_target(config)?,
            progress,
        })
    }

    fn output_target(&self, config: &Config) -> Result<OutputTarget> {
        match self.output_mode {
            OutputMode::Stdout => Ok(OutputTarget::Stdout),
            OutputMode::File => Ok(OutputTarget::File {
                path: self.required_path("file")?,
            }),
            OutputMode::FileChunks => {
                let dir = self.required_path("file-chunks")?;
                let prefix = self
                    .output_file_prefix
                    .clone()
                    .filter(|prefix| !prefix.trim().is_empty())
                    .ok_or_else(|| {
                        missing("--output-file-prefix is required with --output-mode file-chunks")
                    })?;
                let extension = self
                    .output_file_extension
                    .clone()
                    .unwrap_or_else(|| config.export.output_file_extension.clone());
                Ok(OutputTarget::Chunks {
                    dir,
                    prefix,
                    extension,
                })
            }
        }
    }

    fn required_path(&self, mode: &str) -> Result<PathBuf> {
        self.output_path
            .clone()
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or_else(|| missing(&format!("--output-path is required with --output-mode {mode}")))
    }
}

fn invalid_value(field: &str, value: &str) -> DbUtilsError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}

fn missing(message: &str) -> DbUtilsError {
    ConfigError::MissingRequiredConfig(message.to_string()).into()
}

/// CLI interface handler
pub struct CliInterface {
    args: CliArgs,
    config: Config,
}

impl CliInterface {
    /// Parse the process arguments and load configuration
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    /// Load configuration for already-parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let config = Config::load(args.config_file.as_deref())?;
        Self::with_config(args, config)
    }

    /// Apply command-line overrides to `config` and validate the result
    pub fn with_config(args: CliArgs, mut config: Config) -> Result<Self> {
        if let Some(uri) = &args.uri {
            config.connection.uri = uri.clone();
        }
        if args.no_progress {
            config.export.progress = false;
        }
        config.validate()?;

        Ok(Self { args, config })
    }

    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Connection URI after all overrides
    pub fn connection_uri(&self) -> &str {
        &self.config.connection.uri
    }

    /// Effective log level
    pub fn log_level(&self) -> LogLevel {
        if self.args.very_verbose {
            LogLevel::Trace
        } else if self.args.verbose {
            LogLevel::Debug
        } else if self.args.quiet {
            LogLevel::Error
        } else {
            self.config.logging.level
        }
    }

    /// Whether a progress spinner may be drawn
    pub fn show_progress(&self) -> bool {
        self.config.export.progress && !self.args.quiet
    }
}

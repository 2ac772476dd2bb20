//! dbutils command-line entry point
//!
//! ```bash
//! # Upsert records keyed on `name`
//! dbutils insert --database app --collection items \
//!     --input-file items.jsonl --id-field name --create-or-update
//!
//! # Export matching documents as CSV chunks of 1000
//! dbutils query --database app --collection items \
//!     --output-mode file-chunks --output-file-type csv --include-header yes \
//!     --output-path out --output-file-prefix items --batch-size 1000 \
//!     --queries 'name=^(a|c)$'
//! ```

use std::sync::Arc;

use dbutils::cli::{CliInterface, Commands, InsertArgs, QueryArgs};
use dbutils::connection::ConnectionManager;
use dbutils::error::Result;
use dbutils::export::{ProgressTracker, run_query};
use dbutils::reconcile::{JsonLinesReader, Reconciler};
use dbutils::store::MongoStore;
use dbutils::utils::time::format_duration;
use tracing::{info, warn};

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Parse arguments, set up logging and dispatch the subcommand
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;
    initialize_logging(&cli);

    match &cli.args().command {
        Commands::Insert(args) => run_insert(&cli, args).await,
        Commands::Query(args) => run_export(&cli, args).await,
    }
}

/// Reconcile the input file into the target collection
async fn run_insert(cli: &CliInterface, args: &InsertArgs) -> Result<()> {
    let options = args.reconcile_options(cli.config())?;
    let mut input = JsonLinesReader::open(&args.input_file).await?;

    let mut manager = connect(cli).await?;
    let store = Arc::new(MongoStore::new(
        manager.collection(&args.database, &args.collection)?,
    ));
    info!(namespace = %store.namespace(), input = %args.input_file.display(), "Reconciling");

    let progress = ProgressTracker::new("records", cli.show_progress());
    let outcome = Reconciler::new(store, options)?
        .run(&mut input, &progress)
        .await;
    manager.disconnect().await?;

    let summary = outcome?;
    if summary.has_errors() {
        warn!("{} records could not be reconciled", summary.errored);
    }
    eprintln!("{summary}");
    Ok(())
}

/// Export matching documents from the target collection
async fn run_export(cli: &CliInterface, args: &QueryArgs) -> Result<()> {
    let options = args.export_options(cli.config(), cli.show_progress())?;

    let mut manager = connect(cli).await?;
    let store = Arc::new(MongoStore::new(
        manager.collection(&args.database, &args.collection)?,
    ));
    info!(namespace = %store.namespace(), "Exporting");

    let outcome = run_query(store, &options).await;
    manager.disconnect().await?;

    let result = outcome?;
    eprintln!(
        "exported={} files={} elapsed={}",
        result.documents_exported,
        result.files.len(),
        format_duration(std::time::Duration::from_millis(result.elapsed_ms))
    );
    for file in &result.files {
        eprintln!("  {}", file.display());
    }
    Ok(())
}

async fn connect(cli: &CliInterface) -> Result<ConnectionManager> {
    let mut manager = ConnectionManager::new(
        cli.connection_uri().to_string(),
        cli.config().connection.clone(),
    );
    manager.connect().await?;
    Ok(manager)
}

/// Initialize logging on stderr so stdout stays clean for exported data
fn initialize_logging(cli: &CliInterface) {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(cli.log_level().to_tracing_level())
        .with_target(false);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}

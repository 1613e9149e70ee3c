/// CLI interface for findash-data: argument parsing and the async `run` entrypoint.
///
/// All connector, envelope and orchestration logic lives in [`findash-data-core`]; this
/// module only loads the configuration, wires the built-in connectors and the JSON file
/// writer together, and maps the run result to success or failure.
///
/// Exit status is non-zero only when the configuration cannot be loaded or `--source`
/// names a source that is not configured. Per-source failures are logged and the run
/// still succeeds.
///
/// [`findash-data-core`]: ../../findash-data-core/
use crate::load_config::load_config;
use anyhow::Result;
use clap::{Parser, Subcommand};
use findash_data_core::factory::ConnectorFactory;
use findash_data_core::output::JsonFileWriter;
use findash_data_core::pipeline::{run_pipeline, RunOptions, SourceOutcome};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_PATH: &str = "data/config.yaml";

/// CLI for findash-data: fetch data from configured sources into JSON files.
#[derive(Parser)]
#[clap(
    name = "findash-data",
    version,
    about = "FinDash data layer - fetch data from CSV files and spreadsheets into JSON snapshots"
)]
pub struct Cli {
    /// Enable debug logging
    #[clap(long, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch every configured source and write one JSON file per output unit
    Run {
        /// Path to the YAML config file
        #[clap(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Run only this specific source
        #[clap(long)]
        source: Option<String>,

        /// Validate config without fetching data
        #[clap(long)]
        dry_run: bool,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Run {
            config,
            source,
            dry_run,
        } => {
            let config = load_config(config)?;
            config.trace_loaded();

            let options = RunOptions {
                source_filter: source,
                dry_run,
            };
            let factory = ConnectorFactory::with_builtin_connectors();
            let writer = JsonFileWriter::new();

            let report = match run_pipeline(&config, &options, &factory, &writer).await {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!(command = "run", error = %e, "Run aborted");
                    return Err(anyhow::Error::new(e));
                }
            };

            for failed in report.failed() {
                if let SourceOutcome::Failed { kind, message, .. } = &failed.outcome {
                    tracing::warn!(
                        source = %failed.name,
                        %kind,
                        error = %message,
                        "Source skipped"
                    );
                }
            }
            tracing::info!(
                command = "run",
                dry_run,
                succeeded = report.succeeded(),
                failed = report.failed().count(),
                "Run complete"
            );
            tracing::debug!(?report, "Run report");
            Ok(())
        }
    }
}

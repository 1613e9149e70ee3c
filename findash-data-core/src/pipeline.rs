//! Orchestration of one run: every configured source, in order, through
//! build → connect → fetch → write → disconnect.
//!
//! # Failure isolation
//! Anything that goes wrong for one source (missing `type`, unknown tag, bad settings,
//! connection, fetch or write failures) is logged and recorded in the [`RunReport`];
//! the run moves on to the next source. Only a `source_filter` naming an absent source
//! ends the run with an error. An empty source list ends it with a warning.
//!
//! # Navigation
//! - Entrypoint: [`run_pipeline`]
//! - Inputs: [`PipelineConfig`], [`RunOptions`]
//! - Output: [`RunReport`]

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::{PipelineConfig, SourceEntry};
use crate::contract::{Connector, EnvelopeSink};
use crate::error::{ConnectorError, ErrorKind, OutputError, PipelineError};
use crate::factory::ConnectorFactory;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Process only this named source.
    pub source_filter: Option<String>,
    /// Build connectors only; no connect, fetch or write.
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    /// Fetched and written; one file per envelope.
    Written { files: Vec<PathBuf> },
    /// Dry run: the connector could be constructed.
    Validated,
    /// `files` lists what was written before the failure, if anything.
    Failed {
        kind: ErrorKind,
        message: String,
        files: Vec<PathBuf>,
    },
}

impl SourceOutcome {
    pub fn files(&self) -> &[PathBuf] {
        match self {
            SourceOutcome::Written { files } | SourceOutcome::Failed { files, .. } => files.as_slice(),
            SourceOutcome::Validated => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub name: String,
    pub source_type: Option<String>,
    pub outcome: SourceOutcome,
}

impl SourceReport {
    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, SourceOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub dry_run: bool,
    pub sources: Vec<SourceReport>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.sources.iter().filter(|s| s.is_success()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources.iter().filter(|s| !s.is_success())
    }

    /// All artifacts written during the run, in write order, including those of
    /// sources that failed part way.
    pub fn files(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .flat_map(|s| s.outcome.files())
            .map(PathBuf::as_path)
            .collect()
    }

    pub fn source(&self, name: &str) -> Option<&SourceReport> {
        self.sources.iter().find(|s| s.name == name)
    }
}

#[derive(Debug)]
enum SourceFailure {
    MissingType,
    Connector(ConnectorError),
    Output(OutputError),
}

impl SourceFailure {
    fn kind(&self) -> ErrorKind {
        match self {
            SourceFailure::MissingType => ErrorKind::ConfigurationFailure,
            SourceFailure::Connector(e) => e.kind(),
            SourceFailure::Output(_) => ErrorKind::OutputFailure,
        }
    }

    fn message(&self) -> String {
        match self {
            SourceFailure::MissingType => "missing 'type' field".to_string(),
            SourceFailure::Connector(e) => e.to_string(),
            SourceFailure::Output(e) => e.to_string(),
        }
    }
}

impl From<ConnectorError> for SourceFailure {
    fn from(e: ConnectorError) -> Self {
        SourceFailure::Connector(e)
    }
}

impl From<OutputError> for SourceFailure {
    fn from(e: OutputError) -> Self {
        SourceFailure::Output(e)
    }
}

/// Runs every selected source sequentially and reports per-source outcomes.
pub async fn run_pipeline<S>(
    config: &PipelineConfig,
    options: &RunOptions,
    factory: &ConnectorFactory,
    sink: &S,
) -> Result<RunReport, PipelineError>
where
    S: EnvelopeSink + ?Sized,
{
    let mut report = RunReport {
        dry_run: options.dry_run,
        sources: Vec::new(),
    };

    if config.sources.is_empty() {
        warn!("No sources configured");
        return Ok(report);
    }

    let selected: Vec<&SourceEntry> = match &options.source_filter {
        Some(name) => match config.source(name) {
            Some(entry) => vec![entry],
            None => {
                error!(source = %name, "Source not found in config");
                return Err(PipelineError::SourceNotFound { name: name.clone() });
            }
        },
        None => config.sources.iter().collect(),
    };

    info!(count = selected.len(), dry_run = options.dry_run, "Processing source(s)");

    for entry in selected {
        info!(source = %entry.name, "Processing source");
        let mut files = Vec::new();
        let outcome = match process_source(
            entry,
            options,
            factory,
            sink,
            &config.output.directory,
            &mut files,
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(failure) => {
                error!(
                    source = %entry.name,
                    kind = %failure.kind(),
                    error = %failure.message(),
                    written = files.len(),
                    "Failed to process source"
                );
                SourceOutcome::Failed {
                    kind: failure.kind(),
                    message: failure.message(),
                    files,
                }
            }
        };
        report.sources.push(SourceReport {
            name: entry.name.clone(),
            source_type: entry.source_type.clone(),
            outcome,
        });
    }

    let failed = report.failed().count();
    if options.dry_run {
        info!(validated = report.succeeded(), failed, "[DRY RUN] Config validation finished");
        if failed == 0 {
            info!("[DRY RUN] Config validation successful");
        }
    } else {
        info!(
            succeeded = report.succeeded(),
            failed,
            files = report.files().len(),
            "ETL pipeline completed"
        );
    }
    Ok(report)
}

async fn process_source<S>(
    entry: &SourceEntry,
    options: &RunOptions,
    factory: &ConnectorFactory,
    sink: &S,
    output_dir: &Path,
    files: &mut Vec<PathBuf>,
) -> Result<SourceOutcome, SourceFailure>
where
    S: EnvelopeSink + ?Sized,
{
    let source_type = entry.source_type.as_deref().ok_or(SourceFailure::MissingType)?;
    let mut connector = factory.build(source_type, entry)?;

    if options.dry_run {
        info!(source = %entry.name, source_type, "[DRY RUN] Would fetch from source");
        return Ok(SourceOutcome::Validated);
    }

    let result = fetch_and_write(connector.as_mut(), sink, output_dir, files).await;
    connector.disconnect().await;
    result?;
    Ok(SourceOutcome::Written {
        files: std::mem::take(files),
    })
}

/// Pushes each written path onto `files` as it lands, so a later failure keeps the earlier ones.
async fn fetch_and_write<S>(
    connector: &mut dyn Connector,
    sink: &S,
    output_dir: &Path,
    files: &mut Vec<PathBuf>,
) -> Result<(), SourceFailure>
where
    S: EnvelopeSink + ?Sized,
{
    connector.connect().await?;
    let envelopes = connector.fetch().await?;

    for mut envelope in envelopes {
        envelope.stamp_fetched_at(Utc::now());
        files.push(sink.write(&envelope, output_dir).await?);
    }
    Ok(())
}

//! Error kinds raised by connectors, the output stage and the orchestrator.
//!
//! Connector-level errors never escape a run: the orchestrator downgrades them to
//! a logged warning per source. Only [`PipelineError`] ends a run early.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Stable tag for each connector failure, used in run reports and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConnectionFailure,
    NotFoundFailure,
    FetchFailure,
    UnknownSourceType,
    ConfigurationFailure,
    OutputFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::ConnectionFailure => "ConnectionFailure",
            ErrorKind::NotFoundFailure => "NotFoundFailure",
            ErrorKind::FetchFailure => "FetchFailure",
            ErrorKind::UnknownSourceType => "UnknownSourceType",
            ErrorKind::ConfigurationFailure => "ConfigurationFailure",
            ErrorKind::OutputFailure => "OutputFailure",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectorError {
    /// Source unreachable or credentials rejected.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A referenced file or remote resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The source was reached but its content could not be read or parsed.
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("unknown source type: {tag}. Available types: {}", known.join(", "))]
    UnknownSourceType { tag: String, known: Vec<String> },

    /// A source entry is missing a required field or has one of the wrong shape.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl ConnectorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConnectorError::Connection(_) => ErrorKind::ConnectionFailure,
            ConnectorError::NotFound(_) => ErrorKind::NotFoundFailure,
            ConnectorError::Fetch(_) => ErrorKind::FetchFailure,
            ConnectorError::UnknownSourceType { .. } => ErrorKind::UnknownSourceType,
            ConnectorError::Configuration(_) => ErrorKind::ConfigurationFailure,
        }
    }
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize envelope for {output_key}: {source}")]
    Serialize {
        output_key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Conditions that abort a whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source '{name}' not found in config")]
    SourceNotFound { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_source_type_names_tag_and_known_types() {
        let err = ConnectorError::UnknownSourceType {
            tag: "parquet".into(),
            known: vec!["csv".into(), "google_sheets".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("parquet"), "{msg}");
        assert!(msg.contains("csv, google_sheets"), "{msg}");
        assert_eq!(err.kind(), ErrorKind::UnknownSourceType);
    }

    #[test]
    fn kinds_display_as_their_names() {
        assert_eq!(
            ConnectorError::NotFound("x.csv".into()).kind().to_string(),
            "NotFoundFailure"
        );
        assert_eq!(ErrorKind::OutputFailure.to_string(), "OutputFailure");
    }
}

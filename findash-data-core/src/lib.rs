#![doc = "findash-data-core: connectors, envelopes and the orchestration loop of the FinDash data layer."]

//! Every data source implements the [`contract::Connector`] lifecycle and produces
//! [`envelope::Envelope`]s. The [`factory::ConnectorFactory`] maps a configured type tag to
//! a connector, and [`pipeline::run_pipeline`] drives all configured sources through it,
//! handing each envelope to an [`contract::EnvelopeSink`].
//!
//! Configuration loading and the command line live in the `findash-data` crate.

pub mod config;
pub mod connectors;
pub mod contract;
pub mod envelope;
pub mod error;
pub mod factory;
pub mod output;
pub mod pipeline;

pub use config::{OutputConfig, PipelineConfig, SourceEntry};
pub use contract::{Connector, EnvelopeSink};
pub use envelope::{Envelope, EnvelopeMetadata, Record};
pub use error::{ConnectorError, ErrorKind, OutputError, PipelineError};
pub use factory::ConnectorFactory;
pub use output::JsonFileWriter;
pub use pipeline::{run_pipeline, RunOptions, RunReport, SourceOutcome, SourceReport};

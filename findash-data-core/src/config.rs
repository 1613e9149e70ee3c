use std::path::PathBuf;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::ConnectorError;

pub const DEFAULT_OUTPUT_DIR: &str = "./data/output";

/// Validated run configuration handed to the orchestrator.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Sources in configured order; names are unique.
    pub sources: Vec<SourceEntry>,
    pub output: OutputConfig,
}

impl PipelineConfig {
    pub fn source(&self, name: &str) -> Option<&SourceEntry> {
        self.sources.iter().find(|s| s.name == name)
    }

    pub fn trace_loaded(&self) {
        info!(
            output_dir = %self.output.directory.display(),
            sources_count = self.sources.len(),
            "Loaded pipeline config"
        );
        debug!(?self, "Pipeline config loaded (full debug)");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

/// One named source. The `type` tag is split off; everything else stays in `params`.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEntry {
    pub name: String,
    pub source_type: Option<String>,
    pub params: Map<String, Value>,
}

impl SourceEntry {
    /// Builds an entry from the raw mapping of a source, taking `type` out of it.
    /// A non-string `type` counts as absent.
    pub fn from_mapping(name: impl Into<String>, mut params: Map<String, Value>) -> Self {
        let source_type = match params.remove("type") {
            Some(Value::String(tag)) => Some(tag),
            _ => None,
        };
        Self {
            name: name.into(),
            source_type,
            params,
        }
    }

    /// Deserializes the type-specific parameters into a connector's settings struct.
    pub fn settings<T: DeserializeOwned>(&self) -> Result<T, ConnectorError> {
        serde_json::from_value(Value::Object(self.params.clone())).map_err(|e| {
            ConnectorError::Configuration(format!("source '{}': {e}", self.name))
        })
    }
}

/// Reads a name or key that YAML may have typed as a number or bool (`name: 2024`).
pub fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(D::Error::custom(format!(
            "invalid type: {other}, expected a string or number"
        ))),
    }
}

pub fn optional_scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_string(value).map(Some).map_err(D::Error::custom),
    }
}

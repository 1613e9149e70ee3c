//! JSON file output: one `{output_key}.json` per envelope.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::contract::EnvelopeSink;
use crate::envelope::Envelope;
use crate::error::OutputError;

/// Writes each envelope as pretty-printed JSON. An existing file with the same
/// output key is overwritten.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFileWriter;

impl JsonFileWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn artifact_path(envelope: &Envelope, output_dir: &Path) -> PathBuf {
        output_dir.join(format!("{}.json", envelope.output_key()))
    }
}

#[async_trait]
impl EnvelopeSink for JsonFileWriter {
    async fn write(&self, envelope: &Envelope, output_dir: &Path) -> Result<PathBuf, OutputError> {
        fs::create_dir_all(output_dir).map_err(|source| OutputError::Io {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let path = Self::artifact_path(envelope, output_dir);
        let json = serde_json::to_string_pretty(envelope).map_err(|source| OutputError::Serialize {
            output_key: envelope.output_key().to_string(),
            source,
        })?;
        fs::write(&path, json).map_err(|source| OutputError::Io {
            path: path.clone(),
            source,
        })?;

        info!(path = %path.display(), rows = envelope.row_count(), "Wrote output file");
        Ok(path)
    }
}

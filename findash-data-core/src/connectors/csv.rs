//! Delimited-file connector: one file in, one envelope out.

use std::fs::{self, File};
use std::io::ErrorKind as IoErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::{scalar_string, SourceEntry};
use crate::contract::Connector;
use crate::envelope::{Envelope, Record};
use crate::error::ConnectorError;

pub const SOURCE_TYPE: &str = "csv";
pub const DEFAULT_OUTPUT_KEY: &str = "csv_data";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CsvSettings {
    pub path: PathBuf,
    #[serde(default = "default_output_key", deserialize_with = "scalar_string")]
    pub output_key: String,
}

fn default_output_key() -> String {
    DEFAULT_OUTPUT_KEY.to_string()
}

#[derive(Debug)]
pub struct CsvConnector {
    settings: CsvSettings,
    connected: bool,
}

impl CsvConnector {
    pub fn new(settings: CsvSettings) -> Self {
        Self {
            settings,
            connected: false,
        }
    }

    pub fn from_entry(entry: &SourceEntry) -> Result<Self, ConnectorError> {
        Ok(Self::new(entry.settings()?))
    }

    pub fn settings(&self) -> &CsvSettings {
        &self.settings
    }

    fn source_label(&self) -> String {
        self.settings.path.display().to_string()
    }
}

#[async_trait]
impl Connector for CsvConnector {
    fn source_type(&self) -> &'static str {
        SOURCE_TYPE
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    async fn connect(&mut self) -> Result<(), ConnectorError> {
        let path = &self.settings.path;
        if !path.exists() {
            error!(path = %path.display(), "CSV file not found");
            return Err(ConnectorError::NotFound(format!(
                "CSV file not found: {}",
                path.display()
            )));
        }
        if let Err(e) = File::open(path) {
            error!(error = ?e, path = %path.display(), "CSV file not readable");
            return Err(match e.kind() {
                IoErrorKind::NotFound => {
                    ConnectorError::NotFound(format!("CSV file not found: {}", path.display()))
                }
                _ => ConnectorError::Connection(format!(
                    "CSV file not readable: {}: {e}",
                    path.display()
                )),
            });
        }
        self.connected = true;
        info!(path = %path.display(), "CSV file verified");
        Ok(())
    }

    async fn fetch(&mut self) -> Result<Vec<Envelope>, ConnectorError> {
        self.ensure_connected().await?;

        let path = &self.settings.path;
        let bytes = fs::read(path).map_err(|e| {
            error!(error = ?e, path = %path.display(), "Failed to read CSV file");
            ConnectorError::Fetch(format!("Failed to read CSV file {}: {e}", path.display()))
        })?;

        let text = decode_text(bytes, &self.source_label());
        let table = parse_table(&text).map_err(|reason| {
            error!(path = %path.display(), %reason, "Failed to parse CSV file");
            ConnectorError::Fetch(format!(
                "Failed to read CSV file {}: {reason}",
                path.display()
            ))
        })?;

        let envelope = match table {
            Some((columns, data)) => {
                info!(path = %path.display(), rows = data.len(), "Loaded rows from CSV file");
                Envelope::tabular(self.source_label(), &self.settings.output_key, Some(columns), data)
            }
            None => {
                warn!(path = %path.display(), "CSV file is empty");
                Envelope::tabular(self.source_label(), &self.settings.output_key, None, Vec::new())
            }
        };
        Ok(vec![envelope])
    }

}

/// UTF-8 first; Latin-1 when the bytes are not valid UTF-8. Latin-1 cannot fail.
pub(crate) fn decode_text(bytes: Vec<u8>, source: &str) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => match text.strip_prefix('\u{feff}') {
            Some(stripped) => stripped.to_string(),
            None => text,
        },
        Err(e) => {
            warn!(source, "UTF-8 decoding failed, trying latin-1");
            e.into_bytes().iter().map(|&b| char::from(b)).collect()
        }
    }
}

/// Parses header plus rows. `Ok(None)` when the text holds no header at all.
pub(crate) fn parse_table(text: &str) -> Result<Option<(Vec<String>, Vec<Record>)>, String> {
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = reader.records();
    let header = match rows.next() {
        Some(Ok(header)) => header,
        Some(Err(e)) => return Err(e.to_string()),
        None => return Ok(None),
    };
    let columns = dedupe_columns(header.iter());

    let mut data = Vec::new();
    for row in rows {
        let row = row.map_err(|e| e.to_string())?;
        if row.len() > columns.len() {
            let line = row.position().map(|p| p.line()).unwrap_or_default();
            return Err(format!(
                "Expected {} fields in line {line}, saw {}",
                columns.len(),
                row.len()
            ));
        }
        let record: Record = columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let value = match row.get(i) {
                    Some(cell) if !cell.is_empty() => Value::String(cell.to_string()),
                    _ => Value::Null,
                };
                (column.clone(), value)
            })
            .collect();
        data.push(record);
    }
    Ok(Some((columns, data)))
}

/// Repeated header names get a `.N` suffix so no column is lost.
fn dedupe_columns<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for name in names {
        let mut candidate = name.to_string();
        let mut n = 0;
        while columns.contains(&candidate) {
            n += 1;
            candidate = format!("{name}.{n}");
        }
        columns.push(candidate);
    }
    columns
}

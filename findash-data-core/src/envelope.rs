//! The normalized `{metadata, data}` unit every connector emits.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// One row: field name to scalar value, in header order. Absent cells are `null`.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvelopeMetadata {
    /// Origin identifier: file path or spreadsheet id.
    pub source: String,
    /// Logical name of the output artifact, `{output_key}.json`.
    pub output_key: String,
    row_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl EnvelopeMetadata {
    pub fn row_count(&self) -> usize {
        self.row_count
    }
}

/// Records are only reachable through accessors, so `row_count` always equals `data.len()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    metadata: EnvelopeMetadata,
    data: Vec<Record>,
}

impl Envelope {
    /// Envelope for a delimited file. `columns` is `None` when the file had no header at all.
    pub fn tabular(
        source: impl Into<String>,
        output_key: impl Into<String>,
        columns: Option<Vec<String>>,
        data: Vec<Record>,
    ) -> Self {
        Self {
            metadata: EnvelopeMetadata {
                source: source.into(),
                output_key: output_key.into(),
                row_count: data.len(),
                columns,
                sheet: None,
                fetched_at: None,
            },
            data,
        }
    }

    /// Envelope for one sheet range of a spreadsheet.
    pub fn sheet(
        spreadsheet_id: impl Into<String>,
        sheet: impl Into<String>,
        output_key: impl Into<String>,
        data: Vec<Record>,
    ) -> Self {
        Self {
            metadata: EnvelopeMetadata {
                source: spreadsheet_id.into(),
                output_key: output_key.into(),
                row_count: data.len(),
                columns: None,
                sheet: Some(sheet.into()),
                fetched_at: None,
            },
            data,
        }
    }

    pub fn metadata(&self) -> &EnvelopeMetadata {
        &self.metadata
    }

    pub fn data(&self) -> &[Record] {
        &self.data
    }

    pub fn output_key(&self) -> &str {
        &self.metadata.output_key
    }

    pub fn row_count(&self) -> usize {
        self.metadata.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn stamp_fetched_at(&mut self, at: DateTime<Utc>) {
        self.metadata.fetched_at = Some(at);
    }
}

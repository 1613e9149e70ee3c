//! Maps a source-type tag to a connector constructor.
//!
//! The registry is filled in code, never from configuration. Building a connector does
//! no I/O, so a dry run can construct every source without touching files or the network.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::SourceEntry;
use crate::connectors::csv::{self as csv_connector, CsvConnector};
use crate::connectors::google_sheets::{self as sheets_connector, GoogleSheetsConnector, HttpSheetsApi};
use crate::contract::Connector;
use crate::error::ConnectorError;

pub type ConnectorBuilder =
    Box<dyn Fn(&SourceEntry) -> Result<Box<dyn Connector>, ConnectorError> + Send + Sync>;

pub struct ConnectorFactory {
    builders: BTreeMap<String, ConnectorBuilder>,
}

impl ConnectorFactory {
    /// An empty registry. Mostly useful in tests.
    pub fn empty() -> Self {
        Self {
            builders: BTreeMap::new(),
        }
    }

    /// Registry with `csv` and `google_sheets`, the latter talking HTTP with
    /// credentials from the environment.
    pub fn with_builtin_connectors() -> Self {
        let mut factory = Self::empty();
        factory.register(csv_connector::SOURCE_TYPE, |entry| {
            Ok(Box::new(CsvConnector::from_entry(entry)?) as Box<dyn Connector>)
        });
        factory.register(sheets_connector::SOURCE_TYPE, |entry| {
            let api = Arc::new(HttpSheetsApi::from_env());
            Ok(Box::new(GoogleSheetsConnector::from_entry(entry, api)?) as Box<dyn Connector>)
        });
        factory
    }

    /// Adds a variant, replacing any builder already registered under `tag`.
    pub fn register<F>(&mut self, tag: impl Into<String>, builder: F) -> &mut Self
    where
        F: Fn(&SourceEntry) -> Result<Box<dyn Connector>, ConnectorError> + Send + Sync + 'static,
    {
        self.builders.insert(tag.into(), Box::new(builder));
        self
    }

    /// Registered tags, sorted.
    pub fn known_types(&self) -> Vec<String> {
        self.builders.keys().cloned().collect()
    }

    pub fn build(&self, source_type: &str, entry: &SourceEntry) -> Result<Box<dyn Connector>, ConnectorError> {
        let builder = self
            .builders
            .get(source_type)
            .ok_or_else(|| ConnectorError::UnknownSourceType {
                tag: source_type.to_string(),
                known: self.known_types(),
            })?;
        debug!(source = %entry.name, source_type, "Building connector");
        builder(entry)
    }
}

impl Default for ConnectorFactory {
    fn default() -> Self {
        Self::with_builtin_connectors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(v: serde_json::Value) -> SourceEntry {
        SourceEntry::from_mapping("src", v.as_object().cloned().unwrap())
    }

    #[test]
    fn builtin_registry_knows_csv_and_sheets() {
        let factory = ConnectorFactory::with_builtin_connectors();
        assert_eq!(factory.known_types(), vec!["csv", "google_sheets"]);
    }

    #[test]
    fn builds_csv_connector_without_io() {
        let factory = ConnectorFactory::with_builtin_connectors();
        let e = entry(json!({"type": "csv", "path": "/definitely/not/here.csv"}));
        let connector = factory.build("csv", &e).expect("construction does not touch the file");
        assert_eq!(connector.source_type(), "csv");
        assert!(!connector.is_connected());
    }

    #[test]
    fn unknown_tag_lists_known_types() {
        let factory = ConnectorFactory::with_builtin_connectors();
        let e = entry(json!({"type": "parquet"}));
        match factory.build("parquet", &e) {
            Err(ConnectorError::UnknownSourceType { tag, known }) => {
                assert_eq!(tag, "parquet");
                assert_eq!(known, vec!["csv", "google_sheets"]);
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("parquet must not be registered"),
        }
    }

    #[test]
    fn missing_required_fields_fail_construction() {
        let factory = ConnectorFactory::with_builtin_connectors();
        let csv = factory.build("csv", &entry(json!({"type": "csv"})));
        assert!(matches!(csv, Err(ConnectorError::Configuration(_))));
        let sheets = factory.build("google_sheets", &entry(json!({"type": "google_sheets"})));
        assert!(matches!(sheets, Err(ConnectorError::Configuration(_))));
    }

    #[test]
    fn register_replaces_existing_variant() {
        let mut factory = ConnectorFactory::with_builtin_connectors();
        factory.register("csv", |e| {
            Err(ConnectorError::Configuration(format!("replaced for {}", e.name)))
        });
        let err = factory.build("csv", &entry(json!({"path": "x.csv"}))).err().unwrap();
        assert_eq!(err, ConnectorError::Configuration("replaced for src".into()));
    }
}

/// `load_config` module: reads the YAML configuration file and adapts it into the core
/// [`PipelineConfig`].
///
/// # Responsibilities
/// - Parse the user-supplied YAML (`sources` mapping and `output` section)
/// - Keep sources in file order, splitting each entry's `type` tag from its parameters
/// - Apply the default output directory when none is configured
///
/// Type-specific parameters are not validated here; connectors check their own required
/// fields when the factory builds them, so one bad entry cannot fail the whole load.
///
/// # Errors
/// Unreadable files, invalid YAML and non-string source names are fatal and reported
/// through `anyhow::Error`.
use anyhow::{bail, Context, Result};
use findash_data_core::config::{OutputConfig, PipelineConfig, SourceEntry};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    sources: Option<serde_yaml::Mapping>,
    #[serde(default)]
    output: Option<RawOutput>,
}

#[derive(Debug, Default, Deserialize)]
struct RawOutput {
    #[serde(default)]
    directory: Option<PathBuf>,
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let mut sources = Vec::new();
    for (key, value) in raw.sources.unwrap_or_default() {
        let Some(name) = key.as_str() else {
            bail!("Failed to parse config YAML: source names must be strings, got {key:?}");
        };
        sources.push(source_entry(name, value)?);
    }

    let output = match raw.output.and_then(|o| o.directory) {
        Some(directory) => OutputConfig { directory },
        None => OutputConfig::default(),
    };

    Ok(PipelineConfig { sources, output })
}

fn source_entry(name: &str, value: serde_yaml::Value) -> Result<SourceEntry> {
    let params = match value {
        serde_yaml::Value::Mapping(_) => {
            match serde_json::to_value(&value)
                .with_context(|| format!("Failed to parse config YAML for source '{name}'"))?
            {
                Value::Object(map) => map,
                _ => serde_json::Map::new(),
            }
        }
        other => {
            warn!(source = name, value = ?other, "Source entry is not a mapping");
            serde_json::Map::new()
        }
    };
    Ok(SourceEntry::from_mapping(name, params))
}

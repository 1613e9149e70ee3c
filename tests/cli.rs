use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Writes a CSV file and a config pointing at it (plus an unknown-type source) into `dir`.
fn write_fixture(dir: &TempDir) -> std::path::PathBuf {
    let csv = dir.path().join("x.csv");
    fs::write(&csv, "id,name\n1,foo\n2,bar\n").expect("write csv");
    let out = dir.path().join("out");
    let config = dir.path().join("config.yaml");
    fs::write(
        &config,
        format!(
            "sources:\n  a:\n    type: csv\n    path: {}\n  b:\n    type: parquet\n    path: y.parquet\noutput:\n  directory: {}\n",
            csv.display(),
            out.display()
        ),
    )
    .expect("write config");
    config
}

fn bin() -> Command {
    let mut cmd = Command::cargo_bin("findash-data").expect("Binary exists");
    cmd.env_remove("GOOGLE_SHEETS_ACCESS_TOKEN")
        .env_remove("GOOGLE_SHEETS_API_KEY");
    cmd
}

#[test]
fn run_writes_output_and_skips_unknown_types() {
    let dir = TempDir::new().unwrap();
    let config = write_fixture(&dir);

    bin()
        .arg("run")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("ETL pipeline completed"));

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("out/csv_data.json")).unwrap())
            .unwrap();
    assert_eq!(written["metadata"]["row_count"], 2);
    assert_eq!(written["data"][1]["name"], "bar");
}

#[test]
fn unknown_source_filter_exits_non_zero() {
    let dir = TempDir::new().unwrap();
    let config = write_fixture(&dir);

    bin()
        .args(["run", "--source", "missing", "--config"])
        .arg(&config)
        .assert()
        .failure();
    assert!(!dir.path().join("out").exists());
}

#[test]
fn source_filter_runs_only_that_source() {
    let dir = TempDir::new().unwrap();
    let config = write_fixture(&dir);

    bin()
        .args(["run", "--source", "a", "--config"])
        .arg(&config)
        .assert()
        .success();
    assert!(dir.path().join("out/csv_data.json").exists());
}

#[test]
fn missing_config_exits_non_zero() {
    bin()
        .args(["run", "--config", "/definitely/not/here.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn dry_run_touches_no_files() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");
    let config = dir.path().join("config.yaml");
    fs::write(
        &config,
        format!(
            "sources:\n  a:\n    type: csv\n    path: /does/not/exist.csv\n  s:\n    type: google_sheets\n    spreadsheet_id: abc\n    sheets:\n      - name: Revenue\n        range: A1:B2\noutput:\n  directory: {}\n",
            out.display()
        ),
    )
    .unwrap();

    bin()
        .args(["run", "--dry-run", "--verbose", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("[DRY RUN] Config validation successful"));
    assert!(!Path::new(&out).exists());
}

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
async fn run_emits_error_event_for_unknown_source_filter() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use findash_data::cli::{run, Cli, Commands};

    let dir = TempDir::new().unwrap();
    let config = write_fixture(&dir);
    let cli = Cli {
        verbose: false,
        command: Commands::Run {
            config,
            source: Some("missing".into()),
            dry_run: false,
        },
    };

    let result = run(cli).await;
    assert!(result.is_err());

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
    assert!(
        event_msgs.iter().any(|msg| msg.contains("Source not found in config")),
        "Expected a 'Source not found' event, got: {:?}",
        event_msgs
    );
}

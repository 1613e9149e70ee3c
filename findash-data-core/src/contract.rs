//! # contract: the seams of the pipeline
//!
//! Two traits are defined here:
//! - [`Connector`]: lifecycle every data source implements (`connect`, `fetch`, `disconnect`).
//! - [`EnvelopeSink`]: the output collaborator the orchestrator hands each envelope to.
//!
//! Both are annotated for `mockall` so the orchestrator can be exercised without
//! touching files or the network. Mocks are exported under the default
//! `test-export-mocks` feature for integration tests in other crates.
//!
//! ## Adding a source type
//! - Implement [`Connector`] for the new variant, owning its own I/O and record normalization.
//! - Register a builder for its tag in [`crate::factory::ConnectorFactory`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use tracing::debug;

use crate::envelope::Envelope;
use crate::error::{ConnectorError, OutputError};

/// A stateful connector bound to one configured source.
///
/// Lifecycle: `unconnected -> connected` on a successful [`connect`](Connector::connect),
/// back to `unconnected` on [`disconnect`](Connector::disconnect). An instance serves
/// exactly one source for one run and is dropped afterwards.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Connector: Send {
    /// Registered tag of this variant, e.g. `csv`.
    fn source_type(&self) -> &'static str;

    fn is_connected(&self) -> bool;

    /// Records the session state. The provided [`disconnect`](Connector::disconnect) clears it.
    fn set_connected(&mut self, connected: bool);

    /// Establishes readiness to fetch. Calling it again after success is safe.
    ///
    /// Fails with `Connection` when the source is unreachable or credentials are
    /// rejected, and with `NotFound` when the referenced file or resource is absent.
    async fn connect(&mut self) -> Result<(), ConnectorError>;

    /// Returns zero or more envelopes.
    ///
    /// Precondition: the connector is connected. Implementations call
    /// [`ensure_connected`](Connector::ensure_connected) first, so an unconnected
    /// instance connects implicitly instead of failing. Empty sources produce an
    /// envelope with `row_count = 0`, never an error.
    async fn fetch(&mut self) -> Result<Vec<Envelope>, ConnectorError>;

    /// Releases held session resources and clears the connected state. Never fails;
    /// release problems are logged by the implementation.
    ///
    /// The default only clears the connected state. Variants holding a session override it.
    async fn disconnect(&mut self) {
        self.set_connected(false);
        debug!(source_type = self.source_type(), "Connector disconnected");
    }

    async fn ensure_connected(&mut self) -> Result<(), ConnectorError> {
        if !self.is_connected() {
            self.connect().await?;
        }
        Ok(())
    }
}

/// Persists envelopes, one artifact per envelope.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait EnvelopeSink: Send + Sync {
    /// Writes the envelope verbatim into `output_dir`, returning the artifact path.
    async fn write(&self, envelope: &Envelope, output_dir: &Path) -> Result<PathBuf, OutputError>;
}

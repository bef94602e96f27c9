use std::sync::{Arc, Once};

use fluxline_core::{WriteErrorHandler, WriteFailure};
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;
use wiremock::MockServer;

static TRACING: Once = Once::new();

/// Install a test subscriber once per binary; honours `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Start a mock server and return it with a connection string for `db`.
pub async fn mock_influx(db: &str) -> (MockServer, String) {
    init_tracing();
    let server = MockServer::start().await;
    let url = format!("{}/?db={}", server.uri(), db);
    (server, url)
}

/// Error handler that keeps every failure it receives.
#[derive(Default, Clone)]
pub struct CapturingHandler {
    failures: Arc<Mutex<Vec<WriteFailure>>>,
}

impl CapturingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<WriteFailure> {
        self.failures.lock().clone()
    }

    pub fn sequences(&self) -> Vec<u64> {
        self.failures.lock().iter().map(|f| f.sequence).collect()
    }
}

impl WriteErrorHandler for CapturingHandler {
    fn on_write_failure(&self, failure: WriteFailure) {
        self.failures.lock().push(failure);
    }
}

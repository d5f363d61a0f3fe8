// Test-only harness for multiplayer integration tests.
//
// Wraps the real `TableClient` (from `tabletop_client`) with a synchronous,
// test-friendly API for exercising the full pipeline:
// client A command → server authority → forward → client B dispatcher →
// model worker → verify both mirrors.
//
// The only test-specific code here is the blocking wait loops around the
// shared model and stores. All networking, dispatch and model code is the
// same as a real client's.
//
// See also: `tests/full_pipeline.rs` for the integration test scenarios.

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tabletop_client::{ClientConfig, ClientModel, NoUi, ServerCommands, Stores, TableClient};
use tabletop_model::Role;

/// Default timeout for blocking wait operations.
const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Sleep duration between polls.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A test client wrapping a real `TableClient`.
pub struct TestTableClient {
    client: TableClient,
}

impl TestTableClient {
    /// Connect and perform the Hello handshake.
    pub fn connect(addr: SocketAddr, name: &str, role: Role) -> Self {
        let config = ClientConfig {
            coalesce_interval_ms: 20,
            ..ClientConfig::new(name, role)
        };
        let client = TableClient::connect(addr, &config, Arc::new(NoUi))
            .expect("TestTableClient::connect failed");
        Self { client }
    }

    pub fn commands(&self) -> &ServerCommands {
        self.client.commands()
    }

    pub fn stores(&self) -> &Stores {
        self.client.stores()
    }

    /// Run `f` on the current model.
    pub fn read<R>(&self, f: impl FnOnce(&ClientModel) -> R) -> R {
        f(&*self.client.model().lock())
    }

    /// Block until `pred` holds on the model. Panics after the timeout with
    /// `what` in the message.
    pub fn wait_until(&self, what: &str, pred: impl Fn(&ClientModel) -> bool) {
        let start = Instant::now();
        loop {
            self.client.sync();
            if self.read(&pred) {
                return;
            }
            assert!(start.elapsed() < WAIT_TIMEOUT, "timed out waiting for {what}");
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Block until `pred` holds on the thread-safe stores.
    pub fn wait_for_stores(&self, what: &str, pred: impl Fn(&Stores) -> bool) {
        let start = Instant::now();
        while !pred(self.client.stores()) {
            assert!(start.elapsed() < WAIT_TIMEOUT, "timed out waiting for {what}");
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Send Goodbye and close the connection.
    pub fn disconnect(&self) {
        self.client.disconnect();
    }
}

// Test doubles shared by the unit tests of this crate.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tabletop_model::{AssetId, Guid, TextMessage, Zone};
use tabletop_protocol::{Command, CommandKind};

use crate::error::ClientError;
use crate::net::CommandSink;
use crate::ui::UiHooks;

/// A sink that records every command instead of sending it.
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    sent: Mutex<Vec<Command>>,
    closed: Mutex<bool>,
}

impl RecordingSink {
    pub(crate) fn sent(&self) -> Vec<Command> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn kinds(&self) -> Vec<CommandKind> {
        self.sent().iter().map(Command::kind).collect()
    }

    pub(crate) fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Poll until at least `n` commands were sent or two seconds pass.
    pub(crate) fn wait_for(&self, n: usize) -> Vec<Command> {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let sent = self.sent();
            if sent.len() >= n || Instant::now() > deadline {
                return sent;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}

impl CommandSink for RecordingSink {
    fn send(&self, command: &Command) -> Result<(), ClientError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command.clone());
        Ok(())
    }

    fn close(&self) {
        *self.closed.lock().unwrap_or_else(PoisonError::into_inner) = true;
    }
}

/// A UI that records the notifications it receives.
#[derive(Debug, Default)]
pub(crate) struct RecordingUi {
    events: Mutex<Vec<String>>,
}

impl RecordingUi {
    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, event: String) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl UiHooks for RecordingUi {
    fn refresh(&self) {
        self.record("refresh".into());
    }

    fn zone_added(&self, zone: &Zone) {
        self.record(format!("zone_added {}", zone.name));
    }

    fn zone_removed(&self, _zone_id: Guid) {
        self.record("zone_removed".into());
    }

    fn asset_available(&self, asset_id: &AssetId) {
        self.record(format!("asset {asset_id}"));
    }

    fn expose_pc_area(&self, _zone_id: Guid) {
        self.record("expose_pc_area".into());
    }

    fn show_message(&self, message: &TextMessage) {
        self.record(format!("message {}", message.text));
    }

    fn enforce_notification(&self, enabled: bool) {
        self.record(format!("notification {enabled}"));
    }

    fn run_macro(&self, _source: &str, function: &str) {
        self.record(format!("macro {function}"));
    }

    fn run_link(&self, _source: &str, link: &str) {
        self.record(format!("link {link}"));
    }

    fn disconnected(&self, reason: &str) {
        self.record(format!("disconnected {reason}"));
    }
}

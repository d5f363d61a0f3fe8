// Coalescing queue for superseding, high-frequency commands.
//
// Dragging a token emits a position update for every mouse move. Only the
// latest one matters, so the queue keeps a single pending slot:
// `enqueue` overwrites it and a timer thread sends whatever is pending once
// per interval. Nothing is sent while the slot is empty.
//
// `flush` holds the slot lock for the whole send. That makes the slot the
// single critical section for enqueue, timer flush and explicit flush, so an
// explicit flush (before `stopTokenMove` or a waypoint toggle) can never be
// overtaken by a stale timer flush of an older value.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tabletop_protocol::Command;
use tracing::warn;

use crate::net::CommandSink;

struct Shared {
    pending: Mutex<Option<Command>>,
    sink: Arc<dyn CommandSink>,
    keep_running: AtomicBool,
}

impl Shared {
    fn flush(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(command) = pending.take() else {
            return;
        };
        if let Err(e) = self.sink.send(&command) {
            warn!("coalesced {} not sent: {e}", command.kind());
        }
    }
}

pub struct CoalescingQueue {
    shared: Arc<Shared>,
    timer: Option<JoinHandle<()>>,
}

impl CoalescingQueue {
    /// Start the queue and its flush timer.
    pub fn new(sink: Arc<dyn CommandSink>, interval: Duration) -> Self {
        let shared = Arc::new(Shared {
            pending: Mutex::new(None),
            sink,
            keep_running: AtomicBool::new(true),
        });
        let timer_shared = Arc::clone(&shared);
        let timer = thread::spawn(move || {
            loop {
                thread::park_timeout(interval);
                if !timer_shared.keep_running.load(Ordering::SeqCst) {
                    break;
                }
                timer_shared.flush();
            }
        });
        Self {
            shared,
            timer: Some(timer),
        }
    }

    /// Replace the pending command.
    pub fn enqueue(&self, command: Command) {
        *self
            .shared
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(command);
    }

    /// Send the pending command now, if there is one.
    pub fn flush(&self) {
        self.shared.flush();
    }

    pub fn is_pending(&self) -> bool {
        self.shared
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl Drop for CoalescingQueue {
    fn drop(&mut self) {
        self.shared.keep_running.store(false, Ordering::SeqCst);
        if let Some(timer) = self.timer.take() {
            timer.thread().unpark();
            let _ = timer.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use tabletop_model::Guid;
    use tabletop_protocol::{Arg, CommandKind};

    use super::*;
    use crate::testing::RecordingSink;

    const LONG: Duration = Duration::from_secs(3600);

    fn drag(zone: Guid, token: Guid, x: i32) -> Command {
        Command::new(
            CommandKind::UpdateTokenMove,
            vec![Arg::Guid(zone), Arg::Guid(token), Arg::Int(x), Arg::Int(0)],
        )
        .unwrap()
    }

    #[test]
    fn last_write_wins() {
        let sink = Arc::new(RecordingSink::default());
        let queue = CoalescingQueue::new(sink.clone(), LONG);
        let (zone, token) = (Guid::new(), Guid::new());
        for x in 1..=3 {
            queue.enqueue(drag(zone, token, x));
        }
        assert!(queue.is_pending());
        queue.flush();
        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].get::<i32>(2).unwrap(), 3);
        assert!(!queue.is_pending());
    }

    #[test]
    fn flush_of_empty_slot_sends_nothing() {
        let sink = Arc::new(RecordingSink::default());
        let queue = CoalescingQueue::new(sink.clone(), LONG);
        queue.flush();
        queue.flush();
        assert!(sink.sent().is_empty());
    }

    #[test]
    fn timer_flushes_pending_command() {
        let sink = Arc::new(RecordingSink::default());
        let queue = CoalescingQueue::new(sink.clone(), Duration::from_millis(10));
        queue.enqueue(drag(Guid::new(), Guid::new(), 7));
        let sent = sink.wait_for(1);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].get::<i32>(2).unwrap(), 7);
    }

    #[test]
    fn explicit_flush_precedes_later_commands() {
        let sink = Arc::new(RecordingSink::default());
        let queue = CoalescingQueue::new(sink.clone(), LONG);
        let (zone, token) = (Guid::new(), Guid::new());
        queue.enqueue(drag(zone, token, 4));
        queue.flush();
        let stop = Command::new(
            CommandKind::StopTokenMove,
            vec![Arg::Guid(zone), Arg::Guid(token)],
        )
        .unwrap();
        sink.send(&stop).unwrap();
        assert_eq!(
            sink.kinds(),
            vec![CommandKind::UpdateTokenMove, CommandKind::StopTokenMove]
        );
    }

    #[test]
    fn drop_stops_the_timer() {
        let sink = Arc::new(RecordingSink::default());
        let queue = CoalescingQueue::new(sink.clone(), LONG);
        drop(queue);
        assert_eq!(Arc::strong_count(&sink), 1);
    }
}

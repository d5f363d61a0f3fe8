// The model worker: the single serialized context for model mutations.
//
// Every command that mutates the `ClientModel` (received from the server
// or applied optimistically by the local command API) is queued here and
// applied by one thread, in queue order. Per connection that is receipt
// order, because the receive thread enqueues as it decodes.
//
// For each task the worker locks the model, runs the handler, releases the
// lock, performs the handler's effects (UI notifications, sends), then asks
// the UI to refresh. The UI is never waited on.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tabletop_protocol::Command;
use tracing::{debug, warn};

use crate::apply::{Effect, Effects, handler_for};
use crate::model::SharedModel;
use crate::net::CommandSink;
use crate::ui::UiHooks;

enum ModelTask {
    Apply(Command),
    /// Reply once every earlier task has been applied.
    Barrier(Sender<()>),
}

/// Handle for queueing work on the model worker. Cheap to clone.
#[derive(Clone)]
pub struct ModelQueue {
    tx: Sender<ModelTask>,
}

impl ModelQueue {
    pub fn submit(&self, command: Command) {
        if self.tx.send(ModelTask::Apply(command)).is_err() {
            warn!("model worker has stopped; command dropped");
        }
    }

    /// Block until everything queued so far has been applied. Returns
    /// false if the worker is gone.
    pub fn sync(&self) -> bool {
        let (tx, rx) = mpsc::channel();
        if self.tx.send(ModelTask::Barrier(tx)).is_err() {
            return false;
        }
        rx.recv().is_ok()
    }
}

/// Start the worker. It runs until every `ModelQueue` clone is dropped.
pub fn spawn(
    model: SharedModel,
    ui: Arc<dyn UiHooks>,
    sink: Arc<dyn CommandSink>,
) -> (ModelQueue, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || run(rx, &model, ui.as_ref(), sink.as_ref()));
    (ModelQueue { tx }, handle)
}

fn run(rx: Receiver<ModelTask>, model: &SharedModel, ui: &dyn UiHooks, sink: &dyn CommandSink) {
    for task in rx {
        match task {
            ModelTask::Apply(command) => {
                apply(model, ui, sink, &command);
            }
            ModelTask::Barrier(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("model worker exiting");
}

fn apply(model: &SharedModel, ui: &dyn UiHooks, sink: &dyn CommandSink, command: &Command) {
    let Some(handler) = handler_for(command.kind()) else {
        debug!("no client handler for {}", command.kind());
        return;
    };
    let mut effects = Effects::default();
    let result = handler(&mut model.lock(), command, &mut effects);
    if let Err(e) = result {
        warn!("{} from {} not applied: {e}", command.kind(), command.sender());
        return;
    }
    for effect in effects.into_vec() {
        perform(effect, ui, sink);
    }
    ui.refresh();
}

fn perform(effect: Effect, ui: &dyn UiHooks, sink: &dyn CommandSink) {
    match effect {
        Effect::Send(command) => {
            if let Err(e) = sink.send(&command) {
                warn!("{} not sent: {e}", command.kind());
            }
        }
        Effect::ZoneAdded(zone) => ui.zone_added(&zone),
        Effect::ZoneRemoved(zone_id) => ui.zone_removed(zone_id),
        Effect::ExposePcArea(zone_id) => ui.expose_pc_area(zone_id),
        Effect::ShowMessage(msg) => ui.show_message(&msg),
        Effect::EnforceNotification(enabled) => ui.enforce_notification(enabled),
        Effect::RunMacro { source, function } => ui.run_macro(&source, &function),
        Effect::RunLink { source, link } => ui.run_link(&source, &link),
        Effect::Booted => {
            ui.disconnected("you have been disconnected by the GM");
            sink.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use tabletop_model::{Player, Role, Zone};
    use tabletop_protocol::{Arg, CommandKind, ConnectionId};

    use super::*;
    use crate::model::ClientModel;
    use crate::testing::{RecordingSink, RecordingUi};

    fn setup(name: &str) -> (SharedModel, Arc<RecordingUi>, Arc<RecordingSink>, ModelQueue) {
        let model = SharedModel::new(ClientModel::new(
            Player::new(name, Role::Player),
            ConnectionId::new("c1"),
            Vec::new(),
        ));
        let ui = Arc::new(RecordingUi::default());
        let sink = Arc::new(RecordingSink::default());
        let (queue, _) = spawn(model.clone(), ui.clone(), sink.clone());
        (model, ui, sink, queue)
    }

    #[test]
    fn applies_in_order_then_refreshes() {
        let (model, ui, _, queue) = setup("Ann");
        let zone = Zone::new("Cellar");
        let zone_id = zone.id;
        queue.submit(Command::new(CommandKind::PutZone, vec![Arg::zone(zone)]).unwrap());
        queue.submit(
            Command::new(CommandKind::RenameZone, vec![Arg::Guid(zone_id), Arg::str("Attic")])
                .unwrap(),
        );
        assert!(queue.sync());
        assert_eq!(model.lock().campaign.zone(zone_id).unwrap().name, "Attic");
        assert_eq!(ui.events(), vec!["zone_added Cellar", "refresh", "refresh"]);
    }

    #[test]
    fn boot_notifies_and_closes() {
        let (model, ui, sink, queue) = setup("Ann");
        queue.submit(Command::new(CommandKind::BootPlayer, vec![Arg::str("Ann")]).unwrap());
        assert!(queue.sync());
        assert!(model.lock().booted);
        assert!(sink.is_closed());
        assert!(ui.events()[0].starts_with("disconnected"));
    }

    #[test]
    fn server_bound_kinds_are_ignored() {
        let (_, ui, sink, queue) = setup("Ann");
        queue.submit(Command::new(CommandKind::GetZone, vec![Arg::Guid(Default::default())]).unwrap());
        assert!(queue.sync());
        assert!(ui.events().is_empty());
        assert!(sink.sent().is_empty());
    }
}

// The rendering/UI collaborator.
//
// The client core never draws anything. It tells the UI what happened
// through `UiHooks`; every method is a fire-and-forget notification with a
// no-op default, so an embedder implements only what it renders. Hooks are
// called from the model worker (after model mutations) or from the receive
// thread (asset arrivals), never while the model lock is held.

use tabletop_model::{AssetId, Guid, TextMessage, Zone};

pub trait UiHooks: Send + Sync {
    /// Model state changed; repaint when convenient.
    fn refresh(&self) {}

    fn zone_added(&self, _zone: &Zone) {}

    fn zone_removed(&self, _zone_id: Guid) {}

    /// An asset finished arriving and is in the store.
    fn asset_available(&self, _asset_id: &AssetId) {}

    /// Reveal what the player-controlled tokens of a zone can see.
    fn expose_pc_area(&self, _zone_id: Guid) {}

    fn show_message(&self, _message: &TextMessage) {}

    fn enforce_notification(&self, _enabled: bool) {}

    /// Run a macro function on this client.
    fn run_macro(&self, _source: &str, _function: &str) {}

    /// Follow a macro link on this client.
    fn run_link(&self, _source: &str, _link: &str) {}

    /// The connection ended; `reason` is shown to the user.
    fn disconnected(&self, _reason: &str) {}
}

/// A UI that ignores every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoUi;

impl UiHooks for NoUi {}

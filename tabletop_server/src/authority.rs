// The authoritative copy of the session and the command registry that
// mutates it.
//
// `Authority` owns the canonical `Campaign`, the asset store, the replicated
// server policy and the transfer pump. Each incoming command is looked up in
// a registry (`CommandKind` -> handler function, built in `handlers/`) and
// run with an explicit `CallContext`; the handler mutates canonical state and
// records where the command (or a derived one) should go next.
//
// Locking: the campaign sits behind one mutex held only for the duration of
// a single mutation. Z-order assignment additionally takes a per-zone
// ordering lock so that reading the current extremes and writing new values
// happen atomically with respect to other ordering operations on the same
// zone. Ordering locks are created on first use and never removed; a zone id
// that disappears leaves a lock nobody contends for.
//
// Failures stop at `handle`: protocol errors are logged at `warn`, missing
// handlers and missing entities at `debug`, and nothing is forwarded.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tabletop_model::{AssetStore, Campaign, Guid, ServerPolicy, Zone};
use tabletop_protocol::{Command, CommandKind, ProtocolError};
use tracing::{debug, warn};

use crate::context::CallContext;
use crate::handlers;
use crate::pump::TransferPump;

/// A registered command handler.
pub type Handler = fn(&Authority, &mut CallContext, &Command) -> Result<(), ProtocolError>;

pub struct Authority {
    campaign: Mutex<Campaign>,
    ordering: Mutex<BTreeMap<Guid, Arc<Mutex<()>>>>,
    policy: Mutex<ServerPolicy>,
    assets: Arc<AssetStore>,
    transfers: TransferPump,
    handlers: BTreeMap<CommandKind, Handler>,
}

impl Authority {
    pub fn new(campaign: Campaign, assets: Arc<AssetStore>, chunk_size: usize) -> Self {
        Self {
            campaign: Mutex::new(campaign),
            ordering: Mutex::new(BTreeMap::new()),
            policy: Mutex::new(ServerPolicy::default()),
            assets,
            transfers: TransferPump::new(chunk_size),
            handlers: handlers::registry(),
        }
    }

    /// Run the handler registered for `command`'s kind.
    pub fn handle(&self, ctx: &mut CallContext, command: &Command) {
        debug!("from {} got {}", command.sender(), command.kind());
        let Some(handler) = self.handlers.get(&command.kind()) else {
            debug!("no server handler for {}, dropped", command.kind());
            return;
        };
        if let Err(e) = handler(self, ctx, command) {
            warn!("{} from {} dropped: {e}", command.kind(), command.sender());
        }
    }

    pub fn has_handler(&self, kind: CommandKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn campaign(&self) -> MutexGuard<'_, Campaign> {
        self.campaign.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the canonical campaign, for clients that join.
    pub fn snapshot(&self) -> Campaign {
        self.campaign().clone()
    }

    /// Run `f` on the canonical zone, or log and return `None` if the zone
    /// does not exist.
    pub fn with_zone<R>(&self, zone_id: Guid, f: impl FnOnce(&mut Zone) -> R) -> Option<R> {
        let mut campaign = self.campaign();
        match campaign.zone_mut(zone_id) {
            Some(zone) => Some(f(zone)),
            None => {
                debug!("zone {zone_id} not found, ignoring");
                None
            }
        }
    }

    /// The ordering lock of one zone.
    pub fn ordering_lock(&self, zone_id: Guid) -> Arc<Mutex<()>> {
        let mut locks = self.ordering.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(zone_id).or_default())
    }

    pub fn policy(&self) -> ServerPolicy {
        self.policy
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_policy(&self, policy: ServerPolicy) {
        *self.policy.lock().unwrap_or_else(PoisonError::into_inner) = policy;
    }

    pub fn assets(&self) -> &Arc<AssetStore> {
        &self.assets
    }

    pub fn transfers(&self) -> &TransferPump {
        &self.transfers
    }
}

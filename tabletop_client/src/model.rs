// The client's mirror of the session.
//
// `ClientModel` is the UI-owned state: the campaign document plus the
// session-level values that only matter for display (pointers, who is
// typing, chat, in-progress token drags, view requests). It is mutated only
// by the model worker (`worker.rs`), one command at a time, so an embedder
// reading it under `SharedModel`'s lock always sees a state between two
// whole commands.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tabletop_model::{Campaign, Guid, Player, Pointer, ServerPolicy, TextMessage, Zone, ZonePoint};
use tabletop_protocol::ConnectionId;

/// A token drag another player is performing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenMove {
    pub player: String,
    pub zone_id: Guid,
    pub selection: BTreeSet<Guid>,
    /// Last reported position of the lead token.
    pub at: Option<ZonePoint>,
    pub waypoints: Vec<ZonePoint>,
}

/// A view change the GM asked every client to make.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewRequest {
    Enforce {
        zone_id: Guid,
        x: i32,
        y: i32,
        scale: f64,
        width: i32,
        height: i32,
    },
    Restore {
        zone_id: Guid,
    },
}

#[derive(Clone, Debug)]
pub struct ClientModel {
    pub me: Player,
    pub connection_id: ConnectionId,
    pub campaign: Campaign,
    pub current_zone: Option<Guid>,
    pub players: Vec<Player>,
    pub policy: ServerPolicy,
    pub pointers: BTreeMap<String, Pointer>,
    pub typing: BTreeSet<String>,
    pub chat: Vec<TextMessage>,
    /// In-progress drags keyed by lead token.
    pub moves: BTreeMap<Guid, TokenMove>,
    pub view_request: Option<ViewRequest>,
    pub notifications_enforced: bool,
    pub booted: bool,
}

impl ClientModel {
    pub fn new(me: Player, connection_id: ConnectionId, players: Vec<Player>) -> Self {
        Self {
            me,
            connection_id,
            campaign: Campaign::default(),
            current_zone: None,
            players,
            policy: ServerPolicy::default(),
            pointers: BTreeMap::new(),
            typing: BTreeSet::new(),
            chat: Vec::new(),
            moves: BTreeMap::new(),
            view_request: None,
            notifications_enforced: false,
            booted: false,
        }
    }

    pub fn is_gm(&self) -> bool {
        self.me.is_gm()
    }

    /// Whether this client may look at `zone`.
    pub fn can_view(&self, zone: &Zone) -> bool {
        zone.visible || self.is_gm()
    }

    /// The zone being displayed, if any.
    pub fn zone(&self) -> Option<&Zone> {
        self.current_zone.and_then(|id| self.campaign.zone(id))
    }

    /// Pick the first viewable zone when nothing (or something no longer
    /// viewable) is displayed.
    pub(crate) fn ensure_current_zone(&mut self) {
        let still_valid = self
            .zone()
            .is_some_and(|zone| self.can_view(zone));
        if !still_valid {
            self.current_zone = self
                .campaign
                .zones()
                .find(|zone| self.can_view(zone))
                .map(|zone| zone.id);
        }
    }
}

/// `ClientModel` shared between the worker and readers.
#[derive(Clone, Debug)]
pub struct SharedModel(Arc<Mutex<ClientModel>>);

impl SharedModel {
    pub fn new(model: ClientModel) -> Self {
        Self(Arc::new(Mutex::new(model)))
    }

    pub fn lock(&self) -> MutexGuard<'_, ClientModel> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> ClientModel {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use tabletop_model::Role;

    use super::*;

    fn model(role: Role) -> ClientModel {
        ClientModel::new(
            Player::new("Ann", role),
            ConnectionId::new("c1"),
            Vec::new(),
        )
    }

    #[test]
    fn hidden_zones_are_skipped_for_players() {
        let mut hidden = Zone::new("Hidden");
        hidden.visible = false;
        let open = Zone::new("Open");
        let open_id = open.id;

        let mut player = model(Role::Player);
        player.campaign.put_zone(hidden.clone());
        player.campaign.put_zone(open.clone());
        player.ensure_current_zone();
        assert_eq!(player.current_zone, Some(open_id));

        let mut gm = model(Role::Gm);
        gm.campaign.put_zone(hidden);
        gm.ensure_current_zone();
        assert!(gm.current_zone.is_some());
    }

    #[test]
    fn current_zone_survives_while_viewable() {
        let mut m = model(Role::Player);
        let a = Zone::new("A");
        let b = Zone::new("B");
        let b_id = b.id;
        m.campaign.put_zone(a);
        m.campaign.put_zone(b);
        m.current_zone = Some(b_id);
        m.ensure_current_zone();
        assert_eq!(m.current_zone, Some(b_id));
    }
}

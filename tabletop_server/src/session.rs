// Session state for the tabletop server.
//
// `Session` is the central data structure that `server.rs` drives. It owns
// the roster of connected players and the `Authority`, and turns the
// authority's outgoing effects into writes on client connections. All calls
// come from the server's single-threaded main loop.
//
// Key responsibilities:
// - Player management: admit players (password per role, capacity, unique
//   names), assign connection ids, announce arrivals and departures.
// - Command handling: run each decoded command through the authority and
//   deliver what it produced.
// - Transfer pumping: send the next chunk of every active asset transfer.
//
// Write errors on one connection are logged and otherwise ignored; the
// reader thread for that connection will see the broken pipe and report the
// disconnect. Removing a player closes its connection, and anything its
// reader still delivers afterwards is dropped.

use std::collections::BTreeMap;

use tabletop_model::{Player, Role};
use tabletop_protocol::{Arg, Command, CommandKind, ConnectionId, ServerMessage};
use tracing::{debug, info, warn};

use crate::authority::Authority;
use crate::context::CallContext;
use crate::forward::{Outgoing, Target};
use crate::outbound::Outbound;

pub struct Session {
    pub name: String,
    gm_password: Option<String>,
    player_password: Option<String>,
    max_players: u32,
    next_connection: u64,
    peers: BTreeMap<ConnectionId, Peer>,
    authority: Authority,
}

struct Peer {
    player: Player,
    out: Box<dyn Outbound>,
}

impl Session {
    pub fn new(
        name: String,
        gm_password: Option<String>,
        player_password: Option<String>,
        max_players: u32,
        authority: Authority,
    ) -> Self {
        Self {
            name,
            gm_password,
            player_password,
            max_players,
            next_connection: 1,
            peers: BTreeMap::new(),
            authority,
        }
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Admit a player. On success the newcomer receives `Welcome` and the
    /// current campaign, and everyone (the newcomer included) receives
    /// `playerConnected`. On failure the reason is returned for a `Rejected`.
    pub fn add_player(
        &mut self,
        player_name: String,
        role: Role,
        password: Option<String>,
        out: Box<dyn Outbound>,
    ) -> Result<ConnectionId, String> {
        let required = match role {
            Role::Gm => &self.gm_password,
            Role::Player => &self.player_password,
        };
        if required.is_some() && password != *required {
            return Err("incorrect password".into());
        }
        if self.peers.len() >= usize::try_from(self.max_players).unwrap_or(usize::MAX) {
            return Err("session is full".into());
        }
        if self.connection_of(&player_name).is_some() {
            return Err(format!("a player named {player_name} is already connected"));
        }

        let id = ConnectionId::new(format!("c{}", self.next_connection));
        self.next_connection += 1;
        let player = Player::new(player_name, role);
        info!("{} joined as {id} ({:?})", player.name, player.role);

        self.peers.insert(
            id.clone(),
            Peer {
                player: player.clone(),
                out,
            },
        );
        let welcome = ServerMessage::Welcome {
            connection_id: id.clone(),
            session_name: self.name.clone(),
            players: self.players(),
        };
        self.write(&id, &welcome);

        let snapshot = Arg::campaign(self.authority.snapshot());
        self.send_command(Target::Only(id.clone()), CommandKind::SetCampaign, vec![snapshot]);
        self.send_command(Target::All, CommandKind::PlayerConnected, vec![Arg::Player(player)]);
        Ok(id)
    }

    /// Remove a connection, discard its transfers and announce the departure.
    pub fn remove_player(&mut self, id: &ConnectionId) {
        let Some(mut peer) = self.peers.remove(id) else {
            return;
        };
        peer.out.close();
        info!("{} ({id}) left", peer.player.name);
        self.authority.transfers().drop_connection(id);
        self.send_command(
            Target::All,
            CommandKind::PlayerDisconnected,
            vec![Arg::Player(peer.player)],
        );
    }

    /// Run one command from `sender` and deliver its effects.
    /// Commands from a connection no longer on the roster (booted, or
    /// already reported gone) are dropped.
    pub fn handle_command(&mut self, sender: &ConnectionId, command: Command) {
        if !self.peers.contains_key(sender) {
            debug!("dropping {} from departed connection {sender}", command.kind());
            return;
        }
        let mut ctx = CallContext::new(sender.clone());
        self.authority.handle(&mut ctx, &command);
        for outgoing in ctx.into_outgoing() {
            self.deliver(outgoing);
        }
    }

    /// Send the next chunk of every active asset transfer.
    pub fn pump_transfers(&mut self) {
        for (id, chunk) in self.authority.transfers().tick() {
            self.send_command(
                Target::Only(id),
                CommandKind::UpdateAssetTransfer,
                vec![Arg::AssetChunk(chunk)],
            );
        }
    }

    pub fn player_count(&self) -> usize {
        self.peers.len()
    }

    pub fn players(&self) -> Vec<Player> {
        self.peers.values().map(|p| p.player.clone()).collect()
    }

    pub fn connection_of(&self, player_name: &str) -> Option<ConnectionId> {
        self.peers
            .iter()
            .find(|(_, p)| p.player.name == player_name)
            .map(|(id, _)| id.clone())
    }

    fn deliver(&mut self, outgoing: Outgoing) {
        match outgoing {
            Outgoing::Send { target, command } => self.broadcast(&target, &command),
            Outgoing::Boot { player_name } => match self.connection_of(&player_name) {
                Some(id) => self.remove_player(&id),
                None => debug!("boot of {player_name}: not connected"),
            },
        }
    }

    fn send_command(&mut self, target: Target, kind: CommandKind, args: Vec<Arg>) {
        match Command::new(kind, args) {
            Ok(command) => self.broadcast(&target, &command),
            Err(e) => warn!("could not build {kind}: {e}"),
        }
    }

    fn broadcast(&mut self, target: &Target, command: &Command) {
        let msg = match ServerMessage::call(command) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("could not encode {}: {e}", command.kind());
                return;
            }
        };
        let ids: Vec<ConnectionId> = self
            .peers
            .keys()
            .filter(|id| target.includes(id))
            .cloned()
            .collect();
        for id in ids {
            self.write(&id, &msg);
        }
    }

    fn write(&mut self, id: &ConnectionId, msg: &ServerMessage) {
        let Some(peer) = self.peers.get_mut(id) else {
            return;
        };
        if let Err(e) = peer.out.send(msg) {
            debug!("write to {id} failed: {e}");
        }
    }
}

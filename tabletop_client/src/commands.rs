// The command-sending API.
//
// Every method builds a typed `Command` and writes it to the server. For
// optimistic kinds (`CommandKind::is_optimistic`) the same command is first
// queued on the model worker, stamped with this client's connection id, so
// the local mirror changes immediately. The server never echoes these back
// to their sender. When it has to correct one (a new token's z-order) it
// sends a separate command that the worker applies after the local change.
//
// Drag updates go through the coalescing queue. `stop_token_move` and
// `toggle_token_move_waypoint` flush it first so the final position is on
// the wire before the drag ends or the waypoint is recorded.

use std::collections::BTreeSet;
use std::sync::Arc;

use tabletop_model::{
    Area, Asset, AssetId, Campaign, Drawable, Guid, InitiativeList, Label, Layer, Pen, Pointer,
    ServerPolicy, TextMessage, Token, TokenUpdate, Zone, ZonePoint,
};
use tabletop_protocol::{Arg, Command, CommandKind, ConnectionId, encode_update};

use crate::coalesce::CoalescingQueue;
use crate::error::ClientError;
use crate::net::CommandSink;
use crate::worker::ModelQueue;

pub struct ServerCommands {
    me: ConnectionId,
    player_name: String,
    sink: Arc<dyn CommandSink>,
    model: ModelQueue,
    drag: CoalescingQueue,
}

impl ServerCommands {
    pub fn new(
        me: ConnectionId,
        player_name: impl Into<String>,
        sink: Arc<dyn CommandSink>,
        model: ModelQueue,
        drag: CoalescingQueue,
    ) -> Self {
        Self {
            me,
            player_name: player_name.into(),
            sink,
            model,
            drag,
        }
    }

    /// Send any command, applying it locally first if it is optimistic.
    pub fn call(&self, kind: CommandKind, args: Vec<Arg>) -> Result<(), ClientError> {
        let command = Command::new(kind, args)?;
        if kind.is_optimistic() {
            self.model.submit(command.clone().with_sender(self.me.clone()));
        }
        self.sink.send(&command)
    }

    // -- Tokens -------------------------------------------------------------

    pub fn put_token(&self, zone_id: Guid, token: Token) -> Result<(), ClientError> {
        self.call(CommandKind::PutToken, vec![Arg::Guid(zone_id), Arg::token(token)])
    }

    pub fn edit_token(&self, zone_id: Guid, token: Token) -> Result<(), ClientError> {
        self.call(CommandKind::EditToken, vec![Arg::Guid(zone_id), Arg::token(token)])
    }

    pub fn remove_token(&self, zone_id: Guid, token_id: Guid) -> Result<(), ClientError> {
        self.call(CommandKind::RemoveToken, vec![Arg::Guid(zone_id), Arg::Guid(token_id)])
    }

    pub fn remove_tokens(&self, zone_id: Guid, token_ids: Vec<Guid>) -> Result<(), ClientError> {
        self.call(
            CommandKind::RemoveTokens,
            vec![Arg::Guid(zone_id), Arg::GuidList(token_ids)],
        )
    }

    pub fn update_token_property(
        &self,
        zone_id: Guid,
        token_id: Guid,
        update: &TokenUpdate,
    ) -> Result<(), ClientError> {
        let (kind, args) = encode_update(update);
        self.call(
            CommandKind::UpdateTokenProperty,
            vec![
                Arg::Guid(zone_id),
                Arg::Guid(token_id),
                Arg::TokenUpdateKind(kind),
                Arg::List(args),
            ],
        )
    }

    pub fn bring_tokens_to_front(
        &self,
        zone_id: Guid,
        token_ids: BTreeSet<Guid>,
    ) -> Result<(), ClientError> {
        self.call(
            CommandKind::BringTokensToFront,
            vec![Arg::Guid(zone_id), Arg::GuidSet(token_ids)],
        )
    }

    pub fn send_tokens_to_back(
        &self,
        zone_id: Guid,
        token_ids: BTreeSet<Guid>,
    ) -> Result<(), ClientError> {
        self.call(
            CommandKind::SendTokensToBack,
            vec![Arg::Guid(zone_id), Arg::GuidSet(token_ids)],
        )
    }

    pub fn set_token_location(
        &self,
        zone_id: Guid,
        token_id: Guid,
        x: i32,
        y: i32,
    ) -> Result<(), ClientError> {
        self.call(
            CommandKind::SetTokenLocation,
            vec![Arg::Guid(zone_id), Arg::Guid(token_id), Arg::Int(x), Arg::Int(y)],
        )
    }

    // -- Token drags --------------------------------------------------------

    pub fn start_token_move(
        &self,
        zone_id: Guid,
        lead: Guid,
        selection: BTreeSet<Guid>,
    ) -> Result<(), ClientError> {
        self.call(
            CommandKind::StartTokenMove,
            vec![
                Arg::str(self.player_name.as_str()),
                Arg::Guid(zone_id),
                Arg::Guid(lead),
                Arg::GuidSet(selection),
            ],
        )
    }

    /// Queue a drag position. Only the latest position per interval is sent.
    pub fn update_token_move(
        &self,
        zone_id: Guid,
        lead: Guid,
        x: i32,
        y: i32,
    ) -> Result<(), ClientError> {
        let command = Command::new(
            CommandKind::UpdateTokenMove,
            vec![Arg::Guid(zone_id), Arg::Guid(lead), Arg::Int(x), Arg::Int(y)],
        )?;
        self.drag.enqueue(command);
        Ok(())
    }

    pub fn stop_token_move(&self, zone_id: Guid, lead: Guid) -> Result<(), ClientError> {
        self.drag.flush();
        self.call(CommandKind::StopTokenMove, vec![Arg::Guid(zone_id), Arg::Guid(lead)])
    }

    pub fn toggle_token_move_waypoint(
        &self,
        zone_id: Guid,
        lead: Guid,
        point: ZonePoint,
    ) -> Result<(), ClientError> {
        self.drag.flush();
        self.call(
            CommandKind::ToggleTokenMoveWaypoint,
            vec![Arg::Guid(zone_id), Arg::Guid(lead), Arg::ZonePoint(point)],
        )
    }

    // -- Zones --------------------------------------------------------------

    pub fn get_zone(&self, zone_id: Guid) -> Result<(), ClientError> {
        self.call(CommandKind::GetZone, vec![Arg::Guid(zone_id)])
    }

    pub fn put_zone(&self, zone: Zone) -> Result<(), ClientError> {
        self.call(CommandKind::PutZone, vec![Arg::zone(zone)])
    }

    pub fn remove_zone(&self, zone_id: Guid) -> Result<(), ClientError> {
        self.call(CommandKind::RemoveZone, vec![Arg::Guid(zone_id)])
    }

    pub fn rename_zone(&self, zone_id: Guid, name: &str) -> Result<(), ClientError> {
        self.call(CommandKind::RenameZone, vec![Arg::Guid(zone_id), Arg::str(name)])
    }

    pub fn set_zone_visibility(&self, zone_id: Guid, visible: bool) -> Result<(), ClientError> {
        self.call(
            CommandKind::SetZoneVisibility,
            vec![Arg::Guid(zone_id), Arg::Bool(visible)],
        )
    }

    /// Set a zone's background. The asset goes to the server first so it
    /// can serve it to everyone else.
    pub fn set_board(
        &self,
        zone_id: Guid,
        board: Option<&Asset>,
        x: i32,
        y: i32,
    ) -> Result<(), ClientError> {
        if let Some(asset) = board {
            self.put_asset(asset.clone())?;
        }
        let asset_id = board.map_or(Arg::Null, |asset| Arg::AssetId(asset.id.clone()));
        self.call(
            CommandKind::SetBoard,
            vec![Arg::Guid(zone_id), asset_id, Arg::Int(x), Arg::Int(y)],
        )
    }

    pub fn enforce_zone(&self, zone_id: Guid) -> Result<(), ClientError> {
        self.call(CommandKind::EnforceZone, vec![Arg::Guid(zone_id)])
    }

    // -- Fog ----------------------------------------------------------------

    fn fog(
        &self,
        kind: CommandKind,
        zone_id: Guid,
        area: Area,
        tokens: Option<BTreeSet<Guid>>,
    ) -> Result<(), ClientError> {
        let tokens = tokens.map_or(Arg::Null, Arg::GuidSet);
        self.call(kind, vec![Arg::Guid(zone_id), Arg::Area(area), tokens])
    }

    pub fn expose_fow(
        &self,
        zone_id: Guid,
        area: Area,
        tokens: Option<BTreeSet<Guid>>,
    ) -> Result<(), ClientError> {
        self.fog(CommandKind::ExposeFoW, zone_id, area, tokens)
    }

    pub fn hide_fow(
        &self,
        zone_id: Guid,
        area: Area,
        tokens: Option<BTreeSet<Guid>>,
    ) -> Result<(), ClientError> {
        self.fog(CommandKind::HideFoW, zone_id, area, tokens)
    }

    pub fn set_fow(
        &self,
        zone_id: Guid,
        area: Area,
        tokens: Option<BTreeSet<Guid>>,
    ) -> Result<(), ClientError> {
        self.fog(CommandKind::SetFoW, zone_id, area, tokens)
    }

    // -- Drawings and labels ------------------------------------------------

    pub fn draw(&self, zone_id: Guid, pen: Pen, drawable: Drawable) -> Result<(), ClientError> {
        self.call(
            CommandKind::Draw,
            vec![Arg::Guid(zone_id), Arg::Pen(pen), Arg::Drawable(drawable)],
        )
    }

    pub fn undo_draw(&self, zone_id: Guid, drawable_id: Guid) -> Result<(), ClientError> {
        self.call(CommandKind::UndoDraw, vec![Arg::Guid(zone_id), Arg::Guid(drawable_id)])
    }

    pub fn clear_all_drawings(&self, zone_id: Guid, layer: Layer) -> Result<(), ClientError> {
        self.call(CommandKind::ClearAllDrawings, vec![Arg::Guid(zone_id), Arg::Layer(layer)])
    }

    pub fn put_label(&self, zone_id: Guid, label: Label) -> Result<(), ClientError> {
        self.call(CommandKind::PutLabel, vec![Arg::Guid(zone_id), Arg::Label(label)])
    }

    pub fn remove_label(&self, zone_id: Guid, label_id: Guid) -> Result<(), ClientError> {
        self.call(CommandKind::RemoveLabel, vec![Arg::Guid(zone_id), Arg::Guid(label_id)])
    }

    // -- Assets -------------------------------------------------------------

    pub fn get_asset(&self, asset_id: AssetId) -> Result<(), ClientError> {
        self.call(CommandKind::GetAsset, vec![Arg::AssetId(asset_id)])
    }

    pub fn put_asset(&self, asset: Asset) -> Result<(), ClientError> {
        self.call(CommandKind::PutAsset, vec![Arg::asset(asset)])
    }

    // -- Session ------------------------------------------------------------

    pub fn message(&self, message: TextMessage) -> Result<(), ClientError> {
        self.call(CommandKind::Message, vec![Arg::TextMessage(message)])
    }

    pub fn show_pointer(&self, pointer: Pointer) -> Result<(), ClientError> {
        self.call(
            CommandKind::ShowPointer,
            vec![Arg::str(self.player_name.as_str()), Arg::Pointer(pointer)],
        )
    }

    pub fn move_pointer(&self, x: i32, y: i32) -> Result<(), ClientError> {
        self.call(
            CommandKind::MovePointer,
            vec![Arg::str(self.player_name.as_str()), Arg::Int(x), Arg::Int(y)],
        )
    }

    pub fn hide_pointer(&self) -> Result<(), ClientError> {
        self.call(CommandKind::HidePointer, vec![Arg::str(self.player_name.as_str())])
    }

    pub fn set_live_typing(&self, typing: bool) -> Result<(), ClientError> {
        self.call(
            CommandKind::SetLiveTypingLabel,
            vec![Arg::str(self.player_name.as_str()), Arg::Bool(typing)],
        )
    }

    pub fn exec_function(
        &self,
        target: Option<&str>,
        function: &str,
        args: Vec<Arg>,
    ) -> Result<(), ClientError> {
        self.call(
            CommandKind::ExecFunction,
            vec![
                Arg::opt_str(target),
                Arg::str(self.player_name.as_str()),
                Arg::str(function),
                Arg::List(args),
            ],
        )
    }

    pub fn exec_link(&self, link: &str, target: Option<&str>) -> Result<(), ClientError> {
        self.call(
            CommandKind::ExecLink,
            vec![
                Arg::str(link),
                Arg::opt_str(target),
                Arg::str(self.player_name.as_str()),
            ],
        )
    }

    pub fn heartbeat(&self) -> Result<(), ClientError> {
        self.call(CommandKind::Heartbeat, vec![Arg::str(self.player_name.as_str())])
    }

    pub fn boot_player(&self, player_name: &str) -> Result<(), ClientError> {
        self.call(CommandKind::BootPlayer, vec![Arg::str(player_name)])
    }

    // -- Campaign -----------------------------------------------------------

    pub fn set_campaign(&self, campaign: Campaign) -> Result<(), ClientError> {
        self.call(CommandKind::SetCampaign, vec![Arg::campaign(campaign)])
    }

    pub fn set_campaign_name(&self, name: &str) -> Result<(), ClientError> {
        self.call(CommandKind::SetCampaignName, vec![Arg::str(name)])
    }

    pub fn set_server_policy(&self, policy: ServerPolicy) -> Result<(), ClientError> {
        self.call(CommandKind::SetServerPolicy, vec![Arg::ServerPolicy(policy)])
    }

    pub fn update_initiative(&self, list: InitiativeList) -> Result<(), ClientError> {
        self.call(
            CommandKind::UpdateInitiative,
            vec![Arg::InitiativeList(list), Arg::Null],
        )
    }

    pub fn set_initiative_owner_permissions(&self, enabled: bool) -> Result<(), ClientError> {
        self.call(
            CommandKind::UpdateInitiative,
            vec![Arg::Null, Arg::Bool(enabled)],
        )
    }

    pub fn update_token_initiative(
        &self,
        zone_id: Guid,
        token_id: Guid,
        holding: bool,
        state: Option<&str>,
        index: usize,
    ) -> Result<(), ClientError> {
        let index = i32::try_from(index).unwrap_or(-1);
        self.call(
            CommandKind::UpdateTokenInitiative,
            vec![
                Arg::Guid(zone_id),
                Arg::Guid(token_id),
                Arg::Bool(holding),
                Arg::opt_str(state),
                Arg::Int(index),
            ],
        )
    }
}

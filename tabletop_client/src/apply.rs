// Model-mutating command handlers, run by the model worker.
//
// Same shape as the server's handler table: one plain function per command
// kind, looked up by `handler_for`. A handler mutates the `ClientModel` it
// is given and pushes any follow-up work (UI notifications, commands to
// send) as `Effect`s. The worker performs effects after releasing the model
// lock, so UI hooks never run while the model is locked.
//
// Commands naming an absent zone, token or drawing are no-ops. Kinds the
// client never receives (server-bound requests such as `getZone` or
// `bringTokensToFront`) have no handler.

use std::collections::BTreeSet;

use tabletop_model::{
    Area, AssetId, Campaign, CampaignProperties, Drawable, DrawnElement, ExposedAreaMeta, Guid,
    InitiativeList, Label, Layer, MacroButton, Pen, Player, Pointer, ServerPolicy, TextMessage,
    Token, TokenUpdateKind, TopologyType, VisionType, Zone, ZonePoint,
};
use tabletop_protocol::{Arg, Command, CommandKind, ProtocolError, decode_update};
use tracing::{debug, warn};

use crate::model::{ClientModel, TokenMove, ViewRequest};

/// Name of the shared-screen client that owns `setTokenLocation`.
pub const TABLE_PLAYER: &str = "Table";

/// Work a handler asks for once the model lock is released.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    Send(Command),
    ZoneAdded(Zone),
    ZoneRemoved(Guid),
    ExposePcArea(Guid),
    ShowMessage(TextMessage),
    EnforceNotification(bool),
    RunMacro { source: String, function: String },
    RunLink { source: String, link: String },
    Booted,
}

/// Effects collected while applying one command.
#[derive(Debug, Default)]
pub struct Effects(Vec<Effect>);

impl Effects {
    pub fn push(&mut self, effect: Effect) {
        self.0.push(effect);
    }

    pub fn into_vec(self) -> Vec<Effect> {
        self.0
    }
}

pub type ApplyFn = fn(&mut ClientModel, &Command, &mut Effects) -> Result<(), ProtocolError>;

pub fn handler_for(kind: CommandKind) -> Option<ApplyFn> {
    use CommandKind as K;
    let handler: ApplyFn = match kind {
        K::BootPlayer => boot_player,
        K::Draw => draw,
        K::UpdateDrawing => update_drawing,
        K::UndoDraw => undo_draw,
        K::ClearAllDrawings => clear_all_drawings,
        K::EnforceZoneView => enforce_zone_view,
        K::RestoreZoneView => restore_zone_view,
        K::EnforceZone => enforce_zone,
        K::ExposeFoW => expose_fog,
        K::HideFoW => hide_fog,
        K::SetFoW => set_fog,
        K::ExposePcArea => expose_pc_area,
        K::ClearExposedArea => clear_exposed,
        K::UpdateExposedAreaMeta => update_exposed_meta,
        K::PutZone => put_zone,
        K::RemoveZone => remove_zone,
        K::RenameZone => rename_zone,
        K::ChangeZoneDispName => change_display_name,
        K::SetZoneGridSize => set_grid_size,
        K::SetZoneVisibility => set_visibility,
        K::SetZoneHasFoW => set_has_fog,
        K::SetUseVision | K::SetVisionType => set_vision,
        K::SetBoard => set_board,
        K::AddTopology => add_topology,
        K::RemoveTopology => remove_topology,
        K::PutToken | K::EditToken => put_token,
        K::RemoveToken => remove_token,
        K::RemoveTokens => remove_tokens,
        K::UpdateTokenProperty => update_token_property,
        K::SetTokenLocation => set_token_location,
        K::StartTokenMove => start_token_move,
        K::UpdateTokenMove => update_token_move,
        K::StopTokenMove => stop_token_move,
        K::ToggleTokenMoveWaypoint => toggle_waypoint,
        K::PutLabel => put_label,
        K::RemoveLabel => remove_label,
        K::ShowPointer => show_pointer,
        K::HidePointer => hide_pointer,
        K::MovePointer => move_pointer,
        K::Message => message,
        K::ExecFunction => exec_function,
        K::ExecLink => exec_link,
        K::SetLiveTypingLabel => set_typing,
        K::EnforceNotification => enforce_notification,
        K::SetCampaign => set_campaign,
        K::SetCampaignName => set_campaign_name,
        K::UpdateCampaign => update_campaign,
        K::UpdateCampaignMacros => update_macros,
        K::UpdateGmMacros => update_gm_macros,
        K::SetServerPolicy => set_server_policy,
        K::UpdateInitiative => update_initiative,
        K::UpdateTokenInitiative => update_token_initiative,
        K::PlayerConnected => player_connected,
        K::PlayerDisconnected => player_disconnected,
        _ => return None,
    };
    Some(handler)
}

/// Run `f` on a zone of the mirror; `None` if the zone is unknown.
fn with_zone<R>(model: &mut ClientModel, zone_id: Guid, f: impl FnOnce(&mut Zone) -> R) -> Option<R> {
    let Some(zone) = model.campaign.zone_mut(zone_id) else {
        debug!("zone {zone_id} not present, ignoring");
        return None;
    };
    Some(f(zone))
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

fn boot_player(model: &mut ClientModel, cmd: &Command, fx: &mut Effects) -> Result<(), ProtocolError> {
    let name: &str = cmd.get(0)?;
    if name == model.me.name {
        model.booted = true;
        fx.push(Effect::Booted);
    }
    Ok(())
}

fn player_connected(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let player: &Player = cmd.get(0)?;
    if !model.players.contains(player) {
        model.players.push(player.clone());
    }
    Ok(())
}

fn player_disconnected(
    model: &mut ClientModel,
    cmd: &Command,
    _: &mut Effects,
) -> Result<(), ProtocolError> {
    let player: &Player = cmd.get(0)?;
    model.players.retain(|p| p.name != player.name);
    model.pointers.remove(&player.name);
    model.typing.remove(&player.name);
    Ok(())
}

fn show_pointer(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let player: &str = cmd.get(0)?;
    let pointer: &Pointer = cmd.get(1)?;
    model.pointers.insert(player.to_owned(), pointer.clone());
    Ok(())
}

fn hide_pointer(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let player: &str = cmd.get(0)?;
    model.pointers.remove(player);
    Ok(())
}

fn move_pointer(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let player: &str = cmd.get(0)?;
    let x: i32 = cmd.get(1)?;
    let y: i32 = cmd.get(2)?;
    if let Some(pointer) = model.pointers.get_mut(player) {
        pointer.x = x;
        pointer.y = y;
    }
    Ok(())
}

fn message(model: &mut ClientModel, cmd: &Command, fx: &mut Effects) -> Result<(), ProtocolError> {
    let msg: &TextMessage = cmd.get(0)?;
    if msg.is_visible_to(&model.me) {
        model.chat.push(msg.clone());
        fx.push(Effect::ShowMessage(msg.clone()));
    }
    Ok(())
}

/// Whether a macro call addressed to `target` should run here. A null or
/// empty target addresses everyone.
fn addressed_to_me(model: &ClientModel, target: Option<&str>) -> bool {
    target.is_none_or(|t| t.is_empty() || t.eq_ignore_ascii_case(&model.me.name))
}

fn exec_function(model: &mut ClientModel, cmd: &Command, fx: &mut Effects) -> Result<(), ProtocolError> {
    let target: Option<&str> = cmd.get(0)?;
    let source: &str = cmd.get(1)?;
    let function: &str = cmd.get(2)?;
    if addressed_to_me(model, target) {
        fx.push(Effect::RunMacro {
            source: source.to_owned(),
            function: function.to_owned(),
        });
    }
    Ok(())
}

fn exec_link(model: &mut ClientModel, cmd: &Command, fx: &mut Effects) -> Result<(), ProtocolError> {
    let link: &str = cmd.get(0)?;
    let target: Option<&str> = cmd.get(1)?;
    let source: &str = cmd.get(2)?;
    if addressed_to_me(model, target) {
        fx.push(Effect::RunLink {
            source: source.to_owned(),
            link: link.to_owned(),
        });
    }
    Ok(())
}

fn set_typing(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let player: &str = cmd.get(0)?;
    let typing: bool = cmd.get(1)?;
    if typing {
        model.typing.insert(player.to_owned());
    } else {
        model.typing.remove(player);
    }
    Ok(())
}

fn enforce_notification(
    model: &mut ClientModel,
    cmd: &Command,
    fx: &mut Effects,
) -> Result<(), ProtocolError> {
    let enabled: bool = cmd.get(0)?;
    model.notifications_enforced = enabled;
    fx.push(Effect::EnforceNotification(enabled));
    Ok(())
}

fn set_server_policy(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let policy: &ServerPolicy = cmd.get(0)?;
    model.policy = policy.clone();
    Ok(())
}

// ---------------------------------------------------------------------------
// Campaign and zones
// ---------------------------------------------------------------------------

fn set_campaign(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let campaign: &Campaign = cmd.get(0)?;
    model.campaign = campaign.clone();
    model.moves.clear();
    model.ensure_current_zone();
    Ok(())
}

fn set_campaign_name(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let name: &str = cmd.get(0)?;
    model.campaign.name = name.to_owned();
    Ok(())
}

fn update_campaign(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let properties: &CampaignProperties = cmd.get(0)?;
    model.campaign.properties = properties.clone();
    Ok(())
}

fn update_macros(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let macros: &[MacroButton] = cmd.get(0)?;
    model.campaign.macros = macros.to_vec();
    Ok(())
}

fn update_gm_macros(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let macros: &[MacroButton] = cmd.get(0)?;
    model.campaign.gm_macros = macros.to_vec();
    Ok(())
}

fn put_zone(model: &mut ClientModel, cmd: &Command, fx: &mut Effects) -> Result<(), ProtocolError> {
    let zone: &Zone = cmd.get(0)?;
    model.campaign.put_zone(zone.clone());
    model.ensure_current_zone();
    fx.push(Effect::ZoneAdded(zone.clone()));
    Ok(())
}

fn remove_zone(model: &mut ClientModel, cmd: &Command, fx: &mut Effects) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    if model.campaign.remove_zone(zone_id).is_some() {
        model.moves.retain(|_, m| m.zone_id != zone_id);
        model.ensure_current_zone();
        fx.push(Effect::ZoneRemoved(zone_id));
    }
    Ok(())
}

fn rename_zone(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let name: &str = cmd.get(1)?;
    with_zone(model, zone_id, |zone| zone.name = name.to_owned());
    Ok(())
}

fn change_display_name(
    model: &mut ClientModel,
    cmd: &Command,
    _: &mut Effects,
) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let alias: Option<&str> = cmd.get(1)?;
    with_zone(model, zone_id, |zone| zone.player_alias = alias.map(str::to_owned));
    Ok(())
}

fn set_grid_size(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let offset_x: i32 = cmd.get(1)?;
    let offset_y: i32 = cmd.get(2)?;
    let size: i32 = cmd.get(3)?;
    let color: i32 = cmd.get(4)?;
    let size = u32::try_from(size)
        .map_err(|_| ProtocolError::Malformed(format!("grid size {size}")))?;
    with_zone(model, zone_id, |zone| {
        zone.grid.offset_x = offset_x;
        zone.grid.offset_y = offset_y;
        zone.grid.size = size;
        zone.grid.color = u32::from_ne_bytes(color.to_ne_bytes());
    });
    Ok(())
}

fn set_visibility(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let visible: bool = cmd.get(1)?;
    if with_zone(model, zone_id, |zone| zone.visible = visible).is_some() {
        model.ensure_current_zone();
    }
    Ok(())
}

fn set_has_fog(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let has_fog: bool = cmd.get(1)?;
    with_zone(model, zone_id, |zone| zone.has_fog = has_fog);
    Ok(())
}

fn set_vision(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let vision: VisionType = cmd.get(1)?;
    with_zone(model, zone_id, |zone| zone.vision_type = vision);
    Ok(())
}

fn set_board(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let asset: Option<&AssetId> = cmd.get(1)?;
    let x: i32 = cmd.get(2)?;
    let y: i32 = cmd.get(3)?;
    with_zone(model, zone_id, |zone| {
        zone.board.asset = asset.cloned();
        zone.board.x = x;
        zone.board.y = y;
    });
    Ok(())
}

fn add_topology(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let area: &Area = cmd.get(1)?;
    let kind: TopologyType = cmd.get(2)?;
    with_zone(model, zone_id, |zone| zone.add_topology(kind, area));
    Ok(())
}

fn remove_topology(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let area: &Area = cmd.get(1)?;
    let kind: TopologyType = cmd.get(2)?;
    with_zone(model, zone_id, |zone| zone.remove_topology(kind, area));
    Ok(())
}

fn enforce_zone(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let viewable = model.campaign.zone(zone_id).is_some_and(|zone| model.can_view(zone));
    if viewable {
        model.current_zone = Some(zone_id);
    }
    Ok(())
}

fn enforce_zone_view(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    model.view_request = Some(ViewRequest::Enforce {
        zone_id: cmd.get(0)?,
        x: cmd.get(1)?,
        y: cmd.get(2)?,
        scale: cmd.get(3)?,
        width: cmd.get(4)?,
        height: cmd.get(5)?,
    });
    Ok(())
}

fn restore_zone_view(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    model.view_request = Some(ViewRequest::Restore {
        zone_id: cmd.get(0)?,
    });
    Ok(())
}

// ---------------------------------------------------------------------------
// Fog of war
// ---------------------------------------------------------------------------

fn fog_args(cmd: &Command) -> Result<(Guid, &Area, BTreeSet<Guid>), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let area: &Area = cmd.get(1)?;
    let tokens: Option<&BTreeSet<Guid>> = cmd.get(2)?;
    Ok((zone_id, area, tokens.cloned().unwrap_or_default()))
}

fn expose_fog(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let (zone_id, area, tokens) = fog_args(cmd)?;
    with_zone(model, zone_id, |zone| zone.expose(area, &tokens));
    Ok(())
}

fn hide_fog(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let (zone_id, area, tokens) = fog_args(cmd)?;
    with_zone(model, zone_id, |zone| zone.hide(area, &tokens));
    Ok(())
}

fn set_fog(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let (zone_id, area, tokens) = fog_args(cmd)?;
    with_zone(model, zone_id, |zone| zone.set_fog(area.clone(), &tokens));
    Ok(())
}

fn expose_pc_area(model: &mut ClientModel, cmd: &Command, fx: &mut Effects) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    if model.campaign.zone(zone_id).is_some() {
        fx.push(Effect::ExposePcArea(zone_id));
    }
    Ok(())
}

fn clear_exposed(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let global_only: bool = cmd.get(1)?;
    with_zone(model, zone_id, |zone| zone.clear_exposed(global_only));
    Ok(())
}

fn update_exposed_meta(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let token_id: Guid = cmd.get(1)?;
    let meta: &ExposedAreaMeta = cmd.get(2)?;
    with_zone(model, zone_id, |zone| zone.set_exposed_meta(token_id, meta.clone()));
    Ok(())
}

// ---------------------------------------------------------------------------
// Drawings and labels
// ---------------------------------------------------------------------------

fn draw(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let pen: &Pen = cmd.get(1)?;
    let drawable: &Drawable = cmd.get(2)?;
    with_zone(model, zone_id, |zone| {
        zone.add_drawable(DrawnElement {
            drawable: drawable.clone(),
            pen: pen.clone(),
        });
    });
    Ok(())
}

fn update_drawing(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let pen: &Pen = cmd.get(1)?;
    let element: &DrawnElement = cmd.get(2)?;
    with_zone(model, zone_id, |zone| {
        zone.update_drawable(element.drawable.clone(), pen.clone())
    });
    Ok(())
}

fn undo_draw(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let drawable_id: Guid = cmd.get(1)?;
    with_zone(model, zone_id, |zone| zone.remove_drawable(drawable_id));
    Ok(())
}

fn clear_all_drawings(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let layer: Layer = cmd.get(1)?;
    with_zone(model, zone_id, |zone| zone.clear_drawables(layer));
    Ok(())
}

fn put_label(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let label: &Label = cmd.get(1)?;
    with_zone(model, zone_id, |zone| zone.put_label(label.clone()));
    Ok(())
}

fn remove_label(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let label_id: Guid = cmd.get(1)?;
    with_zone(model, zone_id, |zone| zone.remove_label(label_id));
    Ok(())
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

fn put_token(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let token: &Token = cmd.get(1)?;
    with_zone(model, zone_id, |zone| zone.put_token(token.clone()));
    Ok(())
}

fn remove_token(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let token_id: Guid = cmd.get(1)?;
    with_zone(model, zone_id, |zone| zone.remove_token(token_id));
    model.moves.remove(&token_id);
    Ok(())
}

fn remove_tokens(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let ids: &[Guid] = cmd.get(1)?;
    with_zone(model, zone_id, |zone| {
        for id in ids {
            zone.remove_token(*id);
        }
    });
    for id in ids {
        model.moves.remove(id);
    }
    Ok(())
}

fn update_token_property(
    model: &mut ClientModel,
    cmd: &Command,
    _: &mut Effects,
) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let token_id: Guid = cmd.get(1)?;
    let kind: TokenUpdateKind = cmd.get(2)?;
    let args: &[Arg] = cmd.get(3)?;
    let update = decode_update(kind, args)?;
    if with_zone(model, zone_id, |zone| zone.update_token(token_id, update)) == Some(false) {
        debug!("token {token_id} not in zone {zone_id}");
    }
    Ok(())
}

/// Only the shared-screen "Table" client acts on this: it snaps the token
/// to the grid and publishes the result as a `putToken`.
fn set_token_location(model: &mut ClientModel, cmd: &Command, fx: &mut Effects) -> Result<(), ProtocolError> {
    if !model.me.name.eq_ignore_ascii_case(TABLE_PLAYER) {
        return Ok(());
    }
    let zone_id: Guid = cmd.get(0)?;
    let token_id: Guid = cmd.get(1)?;
    let x: i32 = cmd.get(2)?;
    let y: i32 = cmd.get(3)?;
    let moved = with_zone(model, zone_id, |zone| {
        let (x, y) = zone.grid.snap(x, y);
        let token = zone.token_mut(token_id)?;
        token.x = x;
        token.y = y;
        Some(token.clone())
    });
    if let Some(Some(token)) = moved {
        fx.push(Effect::Send(Command::new(
            CommandKind::PutToken,
            vec![Arg::Guid(zone_id), Arg::token(token)],
        )?));
    }
    Ok(())
}

fn start_token_move(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let player: &str = cmd.get(0)?;
    let zone_id: Guid = cmd.get(1)?;
    let lead: Guid = cmd.get(2)?;
    let selection: &BTreeSet<Guid> = cmd.get(3)?;
    if model.campaign.zone(zone_id).is_none() {
        return Ok(());
    }
    model.moves.insert(
        lead,
        TokenMove {
            player: player.to_owned(),
            zone_id,
            selection: selection.clone(),
            at: None,
            waypoints: Vec::new(),
        },
    );
    Ok(())
}

fn update_token_move(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let lead: Guid = cmd.get(1)?;
    let x: i32 = cmd.get(2)?;
    let y: i32 = cmd.get(3)?;
    match model.moves.get_mut(&lead) {
        Some(m) if m.zone_id == zone_id => m.at = Some(ZonePoint::new(x, y)),
        _ => debug!("no drag in progress for {lead}"),
    }
    Ok(())
}

fn stop_token_move(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let lead: Guid = cmd.get(1)?;
    model.moves.remove(&lead);
    Ok(())
}

fn toggle_waypoint(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let lead: Guid = cmd.get(1)?;
    let point: ZonePoint = cmd.get(2)?;
    if let Some(m) = model.moves.get_mut(&lead) {
        match m.waypoints.iter().position(|p| *p == point) {
            Some(i) => {
                m.waypoints.remove(i);
            }
            None => m.waypoints.push(point),
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Initiative
// ---------------------------------------------------------------------------

fn update_initiative(model: &mut ClientModel, cmd: &Command, _: &mut Effects) -> Result<(), ProtocolError> {
    let list: Option<&InitiativeList> = cmd.get(0)?;
    let owner_permission: Option<bool> = cmd.get(1)?;
    match (list, owner_permission) {
        (Some(list), _) => {
            with_zone(model, list.zone_id, |zone| zone.initiative = list.clone());
        }
        (None, Some(flag)) => model.campaign.properties.initiative_owner_permissions = flag,
        (None, None) => {}
    }
    Ok(())
}

fn update_token_initiative(
    model: &mut ClientModel,
    cmd: &Command,
    _: &mut Effects,
) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let token_id: Guid = cmd.get(1)?;
    let holding: bool = cmd.get(2)?;
    let state: Option<&str> = cmd.get(3)?;
    let index: i32 = cmd.get(4)?;
    let index = usize::try_from(index).unwrap_or(usize::MAX);
    let result = with_zone(model, zone_id, |zone| {
        zone.initiative
            .update_entry(token_id, index, holding, state.map(str::to_owned))
    });
    if let Some(Err(e)) = result {
        warn!("initiative update skipped: {e}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tabletop_model::{Grid, MessageChannel, PointerKind, Rect, Role, TokenUpdate};
    use tabletop_protocol::{ConnectionId, encode_update};

    use super::*;

    fn model_named(name: &str) -> (ClientModel, Guid) {
        let mut model = ClientModel::new(
            Player::new(name, Role::Player),
            ConnectionId::new("c1"),
            Vec::new(),
        );
        let zone = Zone::new("Cellar");
        let zone_id = zone.id;
        model.campaign.put_zone(zone);
        model.ensure_current_zone();
        (model, zone_id)
    }

    fn run(model: &mut ClientModel, kind: CommandKind, args: Vec<Arg>) -> Vec<Effect> {
        let cmd = Command::new(kind, args).unwrap();
        let handler = handler_for(kind).unwrap();
        let mut fx = Effects::default();
        handler(model, &cmd, &mut fx).unwrap();
        fx.into_vec()
    }

    #[test]
    fn server_bound_kinds_have_no_handler() {
        for kind in [
            CommandKind::GetZone,
            CommandKind::GetAsset,
            CommandKind::BringTokensToFront,
            CommandKind::SendTokensToBack,
            CommandKind::Heartbeat,
            CommandKind::UpdateAssetTransfer,
        ] {
            assert!(handler_for(kind).is_none(), "{kind}");
        }
    }

    #[test]
    fn z_order_correction_updates_the_mirror() {
        let (mut model, zone_id) = model_named("Ann");
        let token = Token::new("Elf");
        let token_id = token.id;
        run(&mut model, CommandKind::PutToken, vec![Arg::Guid(zone_id), Arg::token(token)]);

        let (kind, args) = encode_update(&TokenUpdate::SetZOrder(5));
        run(
            &mut model,
            CommandKind::UpdateTokenProperty,
            vec![
                Arg::Guid(zone_id),
                Arg::Guid(token_id),
                Arg::TokenUpdateKind(kind),
                Arg::List(args),
            ],
        );
        let zone = model.campaign.zone(zone_id).unwrap();
        assert_eq!(zone.token(token_id).unwrap().z_order, 5);
    }

    #[test]
    fn missing_zone_is_a_no_op() {
        let (mut model, _) = model_named("Ann");
        let before = model.campaign.clone();
        let fx = run(
            &mut model,
            CommandKind::PutToken,
            vec![Arg::Guid(Guid::new()), Arg::token(Token::new("Ghost"))],
        );
        assert!(fx.is_empty());
        assert_eq!(model.campaign, before);
    }

    #[test]
    fn only_the_table_client_republishes_locations() {
        let (mut model, zone_id) = model_named("Ann");
        let token = Token::new("Orc");
        let token_id = token.id;
        run(&mut model, CommandKind::PutToken, vec![Arg::Guid(zone_id), Arg::token(token.clone())]);
        let args = vec![Arg::Guid(zone_id), Arg::Guid(token_id), Arg::Int(73), Arg::Int(120)];
        assert!(run(&mut model, CommandKind::SetTokenLocation, args.clone()).is_empty());

        let (mut table, zone_id) = model_named("table");
        table.campaign.zone_mut(zone_id).unwrap().grid = Grid::default();
        run(&mut table, CommandKind::PutToken, vec![Arg::Guid(zone_id), Arg::token(token)]);
        let args = vec![Arg::Guid(zone_id), Arg::Guid(token_id), Arg::Int(73), Arg::Int(120)];
        let fx = run(&mut table, CommandKind::SetTokenLocation, args);
        let [Effect::Send(put)] = fx.as_slice() else {
            panic!("expected one send, got {fx:?}");
        };
        assert_eq!(put.kind(), CommandKind::PutToken);
        let sent: &Token = put.get(1).unwrap();
        assert_eq!((sent.x, sent.y), (50, 100));
    }

    #[test]
    fn boot_only_affects_the_named_player() {
        let (mut model, _) = model_named("Ann");
        assert!(run(&mut model, CommandKind::BootPlayer, vec![Arg::str("Bob")]).is_empty());
        assert!(!model.booted);
        let fx = run(&mut model, CommandKind::BootPlayer, vec![Arg::str("Ann")]);
        assert_eq!(fx, vec![Effect::Booted]);
        assert!(model.booted);
    }

    #[test]
    fn pointers_typing_and_chat() {
        let (mut model, zone_id) = model_named("Ann");
        let pointer = Pointer {
            zone_id,
            x: 1,
            y: 2,
            direction: 0,
            kind: PointerKind::Arrow,
        };
        run(&mut model, CommandKind::ShowPointer, vec![Arg::str("Bob"), Arg::Pointer(pointer)]);
        run(
            &mut model,
            CommandKind::MovePointer,
            vec![Arg::str("Bob"), Arg::Int(30), Arg::Int(40)],
        );
        assert_eq!(model.pointers["Bob"].x, 30);
        run(&mut model, CommandKind::HidePointer, vec![Arg::str("Bob")]);
        assert!(model.pointers.is_empty());

        run(
            &mut model,
            CommandKind::SetLiveTypingLabel,
            vec![Arg::str("Bob"), Arg::Bool(true)],
        );
        assert!(model.typing.contains("Bob"));

        let whisper = TextMessage {
            channel: MessageChannel::Whisper,
            source: "Bob".into(),
            target: Some("Cid".into()),
            text: "secret".into(),
        };
        assert!(run(&mut model, CommandKind::Message, vec![Arg::TextMessage(whisper)]).is_empty());
        let fx = run(
            &mut model,
            CommandKind::Message,
            vec![Arg::TextMessage(TextMessage::say("Bob", "hi"))],
        );
        assert_eq!(fx.len(), 1);
        assert_eq!(model.chat.len(), 1);
    }

    #[test]
    fn drag_lifecycle() {
        let (mut model, zone_id) = model_named("Ann");
        let lead = Guid::new();
        run(
            &mut model,
            CommandKind::StartTokenMove,
            vec![
                Arg::str("Bob"),
                Arg::Guid(zone_id),
                Arg::Guid(lead),
                Arg::GuidSet(BTreeSet::from([lead])),
            ],
        );
        run(
            &mut model,
            CommandKind::UpdateTokenMove,
            vec![Arg::Guid(zone_id), Arg::Guid(lead), Arg::Int(10), Arg::Int(20)],
        );
        let waypoint = Arg::ZonePoint(ZonePoint::new(5, 5));
        let toggle = vec![Arg::Guid(zone_id), Arg::Guid(lead), waypoint];
        run(&mut model, CommandKind::ToggleTokenMoveWaypoint, toggle.clone());
        assert_eq!(model.moves[&lead].at, Some(ZonePoint::new(10, 20)));
        assert_eq!(model.moves[&lead].waypoints.len(), 1);
        run(&mut model, CommandKind::ToggleTokenMoveWaypoint, toggle);
        assert!(model.moves[&lead].waypoints.is_empty());
        run(
            &mut model,
            CommandKind::StopTokenMove,
            vec![Arg::Guid(zone_id), Arg::Guid(lead)],
        );
        assert!(model.moves.is_empty());
    }

    #[test]
    fn removing_the_current_zone_moves_the_view() {
        let (mut model, first) = model_named("Ann");
        let second = Zone::new("Attic");
        let second_id = second.id;
        run(&mut model, CommandKind::PutZone, vec![Arg::zone(second)]);
        assert_eq!(model.current_zone, Some(first));
        let fx = run(&mut model, CommandKind::RemoveZone, vec![Arg::Guid(first)]);
        assert_eq!(fx, vec![Effect::ZoneRemoved(first)]);
        assert_eq!(model.current_zone, Some(second_id));
    }

    #[test]
    fn fog_with_null_token_set_is_global() {
        let (mut model, zone_id) = model_named("Ann");
        let area = Area::from_rects([Rect::new(0, 0, 10, 10)]);
        run(
            &mut model,
            CommandKind::ExposeFoW,
            vec![Arg::Guid(zone_id), Arg::Area(area), Arg::Null],
        );
        let zone = model.campaign.zone(zone_id).unwrap();
        assert!(zone.exposed_area().contains_point(ZonePoint::new(3, 3)));
    }

    #[test]
    fn macro_calls_respect_their_target() {
        let (mut model, _) = model_named("Ann");
        let call = |target: Arg| {
            vec![target, Arg::str("lib:token"), Arg::str("heal"), Arg::List(vec![])]
        };
        assert_eq!(run(&mut model, CommandKind::ExecFunction, call(Arg::str("Bob"))), vec![]);
        let fx = run(&mut model, CommandKind::ExecFunction, call(Arg::Null));
        assert!(matches!(&fx[..], [Effect::RunMacro { function, .. }] if function == "heal"));
    }
}

// Zone lifecycle and zone-wide settings.

use std::collections::BTreeMap;

use tabletop_model::{Area, AssetId, Guid, TopologyType, VisionType, Zone};
use tabletop_protocol::{Arg, Command, CommandKind, ProtocolError};

use super::relay_to_others;
use crate::authority::{Authority, Handler};
use crate::context::CallContext;

pub(super) fn register(table: &mut BTreeMap<CommandKind, Handler>) {
    table.insert(CommandKind::GetZone, get_zone);
    table.insert(CommandKind::PutZone, put_zone);
    table.insert(CommandKind::RemoveZone, remove_zone);
    table.insert(CommandKind::RenameZone, rename_zone);
    table.insert(CommandKind::ChangeZoneDispName, change_display_name);
    table.insert(CommandKind::SetZoneGridSize, set_grid_size);
    table.insert(CommandKind::SetZoneVisibility, set_visibility);
    table.insert(CommandKind::SetZoneHasFoW, set_has_fog);
    table.insert(CommandKind::SetVisionType, set_vision_type);
    table.insert(CommandKind::SetBoard, set_board);
    table.insert(CommandKind::AddTopology, add_topology);
    table.insert(CommandKind::RemoveTopology, remove_topology);
    for kind in [
        CommandKind::EnforceZone,
        CommandKind::EnforceZoneView,
        CommandKind::RestoreZoneView,
    ] {
        table.insert(kind, relay_to_others);
    }
}

fn get_zone(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    if let Some(zone) = auth.with_zone(zone_id, |zone| zone.clone()) {
        ctx.reply(Command::new(CommandKind::PutZone, vec![Arg::zone(zone)])?);
    }
    Ok(())
}

fn put_zone(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let zone: &Zone = cmd.get(0)?;
    auth.campaign().put_zone(zone.clone());
    ctx.forward_to_others(cmd);
    Ok(())
}

fn remove_zone(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    auth.campaign().remove_zone(zone_id);
    ctx.forward_to_others(cmd);
    Ok(())
}

fn rename_zone(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let name: &str = cmd.get(1)?;
    if auth.with_zone(zone_id, |zone| zone.name = name.to_owned()).is_some() {
        ctx.forward_to_all(cmd);
    }
    Ok(())
}

fn change_display_name(
    auth: &Authority,
    ctx: &mut CallContext,
    cmd: &Command,
) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let alias: Option<&str> = cmd.get(1)?;
    if auth
        .with_zone(zone_id, |zone| zone.player_alias = alias.map(str::to_owned))
        .is_some()
    {
        ctx.forward_to_all(cmd);
    }
    Ok(())
}

fn set_grid_size(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let offset_x: i32 = cmd.get(1)?;
    let offset_y: i32 = cmd.get(2)?;
    let size: i32 = cmd.get(3)?;
    let color: i32 = cmd.get(4)?;
    let size = u32::try_from(size)
        .ok()
        .filter(|s| *s > 0)
        .ok_or_else(|| ProtocolError::Malformed(format!("grid size {size}")))?;
    auth.with_zone(zone_id, |zone| {
        zone.grid.offset_x = offset_x;
        zone.grid.offset_y = offset_y;
        zone.grid.size = size;
        zone.grid.color = u32::from_ne_bytes(color.to_ne_bytes());
    });
    ctx.forward_to_all(cmd);
    Ok(())
}

fn set_visibility(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let visible: bool = cmd.get(1)?;
    auth.with_zone(zone_id, |zone| zone.visible = visible);
    ctx.forward_to_all(cmd);
    Ok(())
}

fn set_has_fog(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let has_fog: bool = cmd.get(1)?;
    auth.with_zone(zone_id, |zone| zone.has_fog = has_fog);
    ctx.forward_to_all(cmd);
    Ok(())
}

/// Clients learn the new vision type as `setUseVision`.
fn set_vision_type(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let vision: VisionType = cmd.get(1)?;
    auth.with_zone(zone_id, |zone| zone.vision_type = vision);
    let use_vision = Command::received(
        cmd.sender().clone(),
        CommandKind::SetUseVision,
        vec![Arg::Guid(zone_id), Arg::VisionType(vision)],
    )?;
    ctx.forward_to_all(&use_vision);
    Ok(())
}

fn set_board(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let asset: Option<&AssetId> = cmd.get(1)?;
    let x: i32 = cmd.get(2)?;
    let y: i32 = cmd.get(3)?;
    if auth
        .with_zone(zone_id, |zone| {
            zone.board.asset = asset.cloned();
            zone.board.x = x;
            zone.board.y = y;
        })
        .is_some()
    {
        ctx.forward_to_others(cmd);
    }
    Ok(())
}

fn add_topology(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    topology(auth, ctx, cmd, true)
}

fn remove_topology(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    topology(auth, ctx, cmd, false)
}

fn topology(
    auth: &Authority,
    ctx: &mut CallContext,
    cmd: &Command,
    add: bool,
) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let area: &Area = cmd.get(1)?;
    let kind: TopologyType = cmd.get(2)?;
    let applied = auth.with_zone(zone_id, |zone| {
        if add {
            zone.add_topology(kind, area);
        } else {
            zone.remove_topology(kind, area);
        }
    });
    if applied.is_some() {
        ctx.forward_to_others(cmd);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tabletop_model::Rect;

    use super::super::testing::{authority_with_zone, call, only_sender, others, sends};
    use super::*;
    use crate::forward::Target;

    #[test]
    fn get_zone_replies_to_requester_only() {
        let (auth, zone_id) = authority_with_zone();
        let out = call(&auth, CommandKind::GetZone, vec![Arg::Guid(zone_id)]);
        let sends = sends(&out);
        assert_eq!(sends.len(), 1);
        assert_eq!(*sends[0].0, only_sender());
        assert_eq!(sends[0].1.kind(), CommandKind::PutZone);
        assert_eq!(sends[0].1.get::<&Zone>(0).unwrap().id, zone_id);
    }

    #[test]
    fn get_unknown_zone_sends_nothing() {
        let (auth, _) = authority_with_zone();
        assert!(call(&auth, CommandKind::GetZone, vec![Arg::Guid(Guid::new())]).is_empty());
    }

    #[test]
    fn rename_includes_sender_only_when_zone_exists() {
        let (auth, zone_id) = authority_with_zone();
        let out = call(&auth, CommandKind::RenameZone, vec![Arg::Guid(zone_id), Arg::str("Attic")]);
        assert_eq!(*sends(&out)[0].0, Target::All);
        assert_eq!(auth.with_zone(zone_id, |z| z.name.clone()).as_deref(), Some("Attic"));

        let out = call(&auth, CommandKind::RenameZone, vec![Arg::Guid(Guid::new()), Arg::str("x")]);
        assert!(out.is_empty());
    }

    #[test]
    fn vision_type_is_reemitted_as_use_vision() {
        let (auth, zone_id) = authority_with_zone();
        let out = call(
            &auth,
            CommandKind::SetVisionType,
            vec![Arg::Guid(zone_id), Arg::VisionType(VisionType::Night)],
        );
        let sends = sends(&out);
        assert_eq!(*sends[0].0, Target::All);
        assert_eq!(sends[0].1.kind(), CommandKind::SetUseVision);
        assert_eq!(auth.with_zone(zone_id, |z| z.vision_type), Some(VisionType::Night));
    }

    #[test]
    fn grid_size_rejects_non_positive_size() {
        let (auth, zone_id) = authority_with_zone();
        let args = |size| vec![Arg::Guid(zone_id), Arg::Int(0), Arg::Int(0), Arg::Int(size), Arg::Int(0)];
        assert!(call(&auth, CommandKind::SetZoneGridSize, args(0)).is_empty());
        let out = call(&auth, CommandKind::SetZoneGridSize, args(70));
        assert_eq!(*sends(&out)[0].0, Target::All);
        assert_eq!(auth.with_zone(zone_id, |z| z.grid.size), Some(70));
    }

    #[test]
    fn put_and_remove_zone_exclude_sender() {
        let (auth, _) = authority_with_zone();
        let zone = Zone::new("Tower");
        let id = zone.id;
        let out = call(&auth, CommandKind::PutZone, vec![Arg::zone(zone)]);
        assert_eq!(*sends(&out)[0].0, others());
        assert!(auth.campaign().zone(id).is_some());

        let out = call(&auth, CommandKind::RemoveZone, vec![Arg::Guid(id)]);
        assert_eq!(*sends(&out)[0].0, others());
        assert!(auth.campaign().zone(id).is_none());
    }

    #[test]
    fn board_and_topology_update_canonical_zone() {
        let (auth, zone_id) = authority_with_zone();
        let board = AssetId::digest(b"board");
        call(
            &auth,
            CommandKind::SetBoard,
            vec![Arg::Guid(zone_id), Arg::AssetId(board.clone()), Arg::Int(5), Arg::Int(6)],
        );
        assert_eq!(auth.with_zone(zone_id, |z| z.board.asset.clone()), Some(Some(board)));

        let wall = Area::from_rects([Rect::new(0, 0, 10, 1)]);
        let out = call(
            &auth,
            CommandKind::AddTopology,
            vec![Arg::Guid(zone_id), Arg::Area(wall), Arg::TopologyType(TopologyType::Wall)],
        );
        assert_eq!(*sends(&out)[0].0, others());
        let has_wall = auth.with_zone(zone_id, |z| z.topology(TopologyType::Wall).is_some_and(|a| !a.is_empty()));
        assert_eq!(has_wall, Some(true));
    }
}

// Fog of war: exposed areas, global and per token.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use tabletop_model::{Area, ExposedAreaMeta, Guid};
use tabletop_protocol::{Command, CommandKind, ProtocolError};

use super::relay_to_all;
use crate::authority::{Authority, Handler};
use crate::context::CallContext;

pub(super) fn register(table: &mut BTreeMap<CommandKind, Handler>) {
    table.insert(CommandKind::ExposeFoW, expose);
    table.insert(CommandKind::HideFoW, hide);
    table.insert(CommandKind::SetFoW, set_fog);
    table.insert(CommandKind::ClearExposedArea, clear_exposed);
    table.insert(CommandKind::UpdateExposedAreaMeta, update_meta);
    table.insert(CommandKind::ExposePcArea, relay_to_all);
}

/// `(zone, area, tokens)`; a null token set means the global area.
fn fog_args(cmd: &Command) -> Result<(Guid, &Area, BTreeSet<Guid>), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let area: &Area = cmd.get(1)?;
    let tokens: Option<&BTreeSet<Guid>> = cmd.get(2)?;
    Ok((zone_id, area, tokens.cloned().unwrap_or_default()))
}

fn expose(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let (zone_id, area, tokens) = fog_args(cmd)?;
    if auth.with_zone(zone_id, |zone| zone.expose(area, &tokens)).is_some() {
        ctx.forward_to_others(cmd);
    }
    Ok(())
}

fn hide(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let (zone_id, area, tokens) = fog_args(cmd)?;
    auth.with_zone(zone_id, |zone| zone.hide(area, &tokens));
    ctx.forward_to_all(cmd);
    Ok(())
}

fn set_fog(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let (zone_id, area, tokens) = fog_args(cmd)?;
    auth.with_zone(zone_id, |zone| zone.set_fog(area.clone(), &tokens));
    ctx.forward_to_all(cmd);
    Ok(())
}

fn clear_exposed(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let global_only: bool = cmd.get(1)?;
    if auth.with_zone(zone_id, |zone| zone.clear_exposed(global_only)).is_some() {
        ctx.forward_to_others(cmd);
    }
    Ok(())
}

fn update_meta(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let token_id: Guid = cmd.get(1)?;
    let meta: &ExposedAreaMeta = cmd.get(2)?;
    if auth
        .with_zone(zone_id, |zone| zone.set_exposed_meta(token_id, meta.clone()))
        .is_some()
    {
        ctx.forward_to_others(cmd);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tabletop_model::{Rect, ZonePoint};
    use tabletop_protocol::Arg;

    use super::super::testing::{authority_with_zone, call, others, sends};
    use super::*;
    use crate::forward::Target;

    fn square() -> Area {
        Area::from_rects([Rect::new(0, 0, 10, 10)])
    }

    #[test]
    fn expose_excludes_sender_and_hide_includes() {
        let (auth, zone_id) = authority_with_zone();
        let out = call(
            &auth,
            CommandKind::ExposeFoW,
            vec![Arg::Guid(zone_id), Arg::Area(square()), Arg::Null],
        );
        assert_eq!(*sends(&out)[0].0, others());
        assert_eq!(
            auth.with_zone(zone_id, |z| z.exposed_area().contains_point(ZonePoint::new(5, 5))),
            Some(true)
        );

        let out = call(
            &auth,
            CommandKind::HideFoW,
            vec![Arg::Guid(zone_id), Arg::Area(square()), Arg::Null],
        );
        assert_eq!(*sends(&out)[0].0, Target::All);
        assert_eq!(auth.with_zone(zone_id, |z| z.exposed_area().is_empty()), Some(true));
    }

    #[test]
    fn per_token_exposure_leaves_global_area() {
        let (auth, zone_id) = authority_with_zone();
        let token = Guid::from_u128(9);
        call(
            &auth,
            CommandKind::SetFoW,
            vec![Arg::Guid(zone_id), Arg::Area(square()), Arg::GuidSet([token].into())],
        );
        let (global_empty, has_meta) = auth
            .with_zone(zone_id, |z| (z.exposed_area().is_empty(), z.exposed_meta(token).is_some()))
            .unwrap();
        assert!(global_empty);
        assert!(has_meta);
    }

    #[test]
    fn expose_pc_area_is_broadcast() {
        let (auth, zone_id) = authority_with_zone();
        let out = call(&auth, CommandKind::ExposePcArea, vec![Arg::Guid(zone_id)]);
        assert_eq!(*sends(&out)[0].0, Target::All);
    }
}

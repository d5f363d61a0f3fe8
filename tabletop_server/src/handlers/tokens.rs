// Token placement, removal, property updates and z-order.
//
// `putToken` for a token the zone has not seen gets the next z-order above
// the zone's current maximum. The sender is told only the new z-order (an
// `updateTokenProperty` carrying `SetZOrder`), everyone else gets the full
// token with the corrected value. Bring-to-front and send-to-back rewrite
// the z-order of the named tokens and send each one back out as a `putToken`
// to everyone, the requester included. When a zone's z-orders run into the
// `i32` bounds it is compacted to 1..=n first and every renumbered token is
// sent to everyone as well.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::PoisonError;

use tabletop_model::{Guid, Token, TokenUpdate, TokenUpdateKind};
use tabletop_protocol::{Arg, Command, CommandKind, ProtocolError, decode_update, encode_update};
use tracing::info;

use super::relay_to_others;
use crate::authority::{Authority, Handler};
use crate::context::CallContext;

pub(super) fn register(table: &mut BTreeMap<CommandKind, Handler>) {
    table.insert(CommandKind::PutToken, put_token);
    table.insert(CommandKind::EditToken, put_token);
    table.insert(CommandKind::RemoveToken, remove_token);
    table.insert(CommandKind::RemoveTokens, remove_tokens);
    table.insert(CommandKind::UpdateTokenProperty, update_token_property);
    table.insert(CommandKind::BringTokensToFront, bring_to_front);
    table.insert(CommandKind::SendTokensToBack, send_to_back);
    for kind in [
        CommandKind::SetTokenLocation,
        CommandKind::StartTokenMove,
        CommandKind::UpdateTokenMove,
        CommandKind::StopTokenMove,
        CommandKind::ToggleTokenMoveWaypoint,
    ] {
        table.insert(kind, relay_to_others);
    }
}

/// `updateTokenProperty(zone, token, SetZOrder, [z])`.
fn z_order_update(zone_id: Guid, token_id: Guid, z: i32) -> Result<Command, ProtocolError> {
    let (kind, args) = encode_update(&TokenUpdate::SetZOrder(z));
    Command::new(
        CommandKind::UpdateTokenProperty,
        vec![
            Arg::Guid(zone_id),
            Arg::Guid(token_id),
            Arg::TokenUpdateKind(kind),
            Arg::List(args),
        ],
    )
}

fn put_token(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let token: &Token = cmd.get(1)?;

    let lock = auth.ordering_lock(zone_id);
    let _ordering = lock.lock().unwrap_or_else(PoisonError::into_inner);
    let Some(assigned) = auth.with_zone(zone_id, |zone| {
        let mut token = token.clone();
        let fresh = zone.token(token.id).is_none();
        let mut renumbered = Vec::new();
        if fresh {
            (token.z_order, renumbered) = zone.claim_next_z_order();
        }
        let z = token.z_order;
        zone.put_token(token);
        fresh.then_some((z, renumbered))
    }) else {
        return Ok(());
    };

    match assigned {
        Some((z, renumbered)) => {
            if !renumbered.is_empty() {
                info!("z-orders exhausted in zone {zone_id}; renumbered {} tokens", renumbered.len());
            }
            broadcast_tokens(ctx, zone_id, renumbered)?;
            ctx.reply(z_order_update(zone_id, token.id, z)?);
            let mut corrected = token.clone();
            corrected.z_order = z;
            let forward = Command::received(
                cmd.sender().clone(),
                cmd.kind(),
                vec![Arg::Guid(zone_id), Arg::token(corrected)],
            )?;
            ctx.forward_to_others(&forward);
        }
        None => ctx.forward_to_others(cmd),
    }
    Ok(())
}

fn remove_token(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let token_id: Guid = cmd.get(1)?;
    if auth.with_zone(zone_id, |zone| zone.remove_token(token_id)).is_some() {
        ctx.forward_to_others(cmd);
    }
    Ok(())
}

fn remove_tokens(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let ids: &[Guid] = cmd.get(1)?;
    let removed = auth.with_zone(zone_id, |zone| {
        ids.iter().filter(|id| zone.remove_token(**id).is_some()).count()
    });
    if removed.is_some() {
        ctx.forward_to_others(cmd);
    }
    Ok(())
}

fn update_token_property(
    auth: &Authority,
    ctx: &mut CallContext,
    cmd: &Command,
) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let token_id: Guid = cmd.get(1)?;
    let kind: TokenUpdateKind = cmd.get(2)?;
    let args: &[Arg] = cmd.get(3)?;
    let update = decode_update(kind, args)?;
    if auth.with_zone(zone_id, |zone| zone.update_token(token_id, update)) == Some(true) {
        ctx.forward_to_others(cmd);
    }
    Ok(())
}

fn bring_to_front(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    reorder(auth, ctx, cmd, true)
}

fn send_to_back(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    reorder(auth, ctx, cmd, false)
}

fn reorder(
    auth: &Authority,
    ctx: &mut CallContext,
    cmd: &Command,
    to_front: bool,
) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let ids: &BTreeSet<Guid> = cmd.get(1)?;

    let lock = auth.ordering_lock(zone_id);
    let _ordering = lock.lock().unwrap_or_else(PoisonError::into_inner);
    let Some(updated) = auth.with_zone(zone_id, |zone| {
        if to_front {
            zone.bring_to_front(ids)
        } else {
            zone.send_to_back(ids)
        }
    }) else {
        return Ok(());
    };
    broadcast_tokens(ctx, zone_id, updated)
}

/// Send each token's new state to everyone as a server-built `putToken`.
fn broadcast_tokens(
    ctx: &mut CallContext,
    zone_id: Guid,
    tokens: Vec<Token>,
) -> Result<(), ProtocolError> {
    for token in tokens {
        let put = Command::new(CommandKind::PutToken, vec![Arg::Guid(zone_id), Arg::token(token)])?;
        ctx.forward_to_all(&put);
    }
    Ok(())
}

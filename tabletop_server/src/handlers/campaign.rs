// Campaign-wide state: the campaign itself, its properties and macros, the
// server policy, and initiative.

use std::collections::BTreeMap;

use tabletop_model::{Campaign, CampaignProperties, Guid, InitiativeList, MacroButton, ServerPolicy};
use tabletop_protocol::{Command, CommandKind, ProtocolError};
use tracing::warn;

use super::relay_to_others;
use crate::authority::{Authority, Handler};
use crate::context::CallContext;

pub(super) fn register(table: &mut BTreeMap<CommandKind, Handler>) {
    table.insert(CommandKind::SetCampaign, set_campaign);
    table.insert(CommandKind::SetCampaignName, set_campaign_name);
    table.insert(CommandKind::UpdateCampaign, update_campaign);
    table.insert(CommandKind::UpdateCampaignMacros, update_macros);
    table.insert(CommandKind::UpdateGmMacros, update_gm_macros);
    table.insert(CommandKind::SetServerPolicy, set_server_policy);
    table.insert(CommandKind::UpdateInitiative, update_initiative);
    table.insert(CommandKind::UpdateTokenInitiative, update_token_initiative);
    table.insert(CommandKind::EnforceNotification, relay_to_others);
}

fn set_campaign(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let campaign: &Campaign = cmd.get(0)?;
    *auth.campaign() = campaign.clone();
    ctx.forward_to_others(cmd);
    Ok(())
}

fn set_campaign_name(
    auth: &Authority,
    ctx: &mut CallContext,
    cmd: &Command,
) -> Result<(), ProtocolError> {
    let name: &str = cmd.get(0)?;
    auth.campaign().name = name.to_owned();
    ctx.forward_to_others(cmd);
    Ok(())
}

fn update_campaign(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let properties: &CampaignProperties = cmd.get(0)?;
    auth.campaign().properties = properties.clone();
    ctx.forward_to_others(cmd);
    Ok(())
}

fn update_macros(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let macros: &[MacroButton] = cmd.get(0)?;
    auth.campaign().macros = macros.to_vec();
    ctx.forward_to_others(cmd);
    Ok(())
}

fn update_gm_macros(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let macros: &[MacroButton] = cmd.get(0)?;
    auth.campaign().gm_macros = macros.to_vec();
    ctx.forward_to_others(cmd);
    Ok(())
}

fn set_server_policy(
    auth: &Authority,
    ctx: &mut CallContext,
    cmd: &Command,
) -> Result<(), ProtocolError> {
    let policy: &ServerPolicy = cmd.get(0)?;
    auth.set_policy(policy.clone());
    ctx.forward_to_others(cmd);
    Ok(())
}

/// Replace a zone's initiative list, or (with a null list) change the
/// campaign's owner-permission flag.
fn update_initiative(
    auth: &Authority,
    ctx: &mut CallContext,
    cmd: &Command,
) -> Result<(), ProtocolError> {
    let list: Option<&InitiativeList> = cmd.get(0)?;
    let owner_permission: Option<bool> = cmd.get(1)?;
    match (list, owner_permission) {
        (Some(list), _) => {
            auth.with_zone(list.zone_id, |zone| zone.initiative = list.clone());
        }
        (None, Some(flag)) => {
            auth.campaign().properties.initiative_owner_permissions = flag;
        }
        (None, None) => {}
    }
    ctx.forward_to_all(cmd);
    Ok(())
}

/// Update one initiative entry. When the token appears more than once and
/// the index no longer identifies it, the update is abandoned rather than
/// applied to a guess.
fn update_token_initiative(
    auth: &Authority,
    ctx: &mut CallContext,
    cmd: &Command,
) -> Result<(), ProtocolError> {
    let zone_id: Guid = cmd.get(0)?;
    let token_id: Guid = cmd.get(1)?;
    let holding: bool = cmd.get(2)?;
    let state: Option<&str> = cmd.get(3)?;
    let index: i32 = cmd.get(4)?;
    let index = usize::try_from(index).unwrap_or(usize::MAX);

    let result = auth.with_zone(zone_id, |zone| {
        zone.initiative
            .update_entry(token_id, index, holding, state.map(str::to_owned))
    });
    match result {
        Some(Ok(true)) => ctx.forward_to_all(cmd),
        Some(Ok(false)) | None => {}
        Some(Err(e)) => warn!("initiative update skipped: {e}"),
    }
    Ok(())
}

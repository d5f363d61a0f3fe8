// Asset requests and uploads.
//
// `getAsset` starts a chunked transfer to the requester: the header goes out
// at once and the transfer pump sends the chunks on later ticks. An unknown
// asset is answered with a placeholder `putAsset` so the requester stops
// waiting. Uploads are stored after their bytes are checked against the id;
// nothing about assets is forwarded, since other clients fetch on demand.

use std::collections::BTreeMap;

use tabletop_model::{Asset, AssetId};
use tabletop_protocol::{Arg, Command, CommandKind, ProtocolError};
use tracing::{debug, warn};

use crate::authority::{Authority, Handler};
use crate::context::CallContext;

pub(super) fn register(table: &mut BTreeMap<CommandKind, Handler>) {
    table.insert(CommandKind::GetAsset, get_asset);
    table.insert(CommandKind::PutAsset, put_asset);
    table.insert(CommandKind::RemoveAsset, remove_asset);
}

fn get_asset(auth: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let id: &AssetId = cmd.get(0)?;
    match auth.assets().get(id) {
        Some(asset) => {
            let header = auth.transfers().register(ctx.sender().clone(), asset);
            ctx.reply(Command::new(
                CommandKind::StartAssetTransfer,
                vec![Arg::AssetHeader(header)],
            )?);
        }
        None => {
            debug!("{} asked for unknown asset {id}", ctx.sender());
            ctx.reply(Command::new(
                CommandKind::PutAsset,
                vec![Arg::asset(Asset::placeholder(id.clone()))],
            )?);
        }
    }
    Ok(())
}

fn put_asset(auth: &Authority, _: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let asset: &Asset = cmd.get(0)?;
    if !asset.verify() {
        return Err(ProtocolError::HashMismatch {
            expected: asset.id.clone(),
            actual: AssetId::digest(&asset.data),
        });
    }
    auth.assets().put(asset.clone());
    Ok(())
}

fn remove_asset(auth: &Authority, _: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let id: &AssetId = cmd.get(0)?;
    if !auth.assets().remove(id) {
        warn!("remove of unknown asset {id}");
    }
    Ok(())
}

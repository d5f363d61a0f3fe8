// Server command handlers, grouped by the part of the session they touch.
//
// Every handler has the `Handler` shape: it reads its positional arguments
// with `Command::get`, applies the mutation to canonical state through
// `Authority`, and records its forward policy on the `CallContext`:
//
// - `forward_to_others`: the sender already applied the change locally.
// - `forward_to_all`: the server's copy is what counts, or the sender did
//   not apply anything locally.
// - `reply`: a distinct response to the requester only.
//
// A missing zone or token makes the handler return early without
// forwarding. Kinds that only ever travel server-to-client
// (`startAssetTransfer`, `setUseVision`, `playerConnected`, ...) have no
// entry, so a client sending one is logged and ignored.

use std::collections::BTreeMap;

use tabletop_protocol::{Command, CommandKind, ProtocolError};

use crate::authority::{Authority, Handler};
use crate::context::CallContext;

mod assets;
mod campaign;
mod drawing;
mod fog;
mod session;
mod tokens;
mod zones;

pub(crate) fn registry() -> BTreeMap<CommandKind, Handler> {
    let mut table = BTreeMap::new();
    assets::register(&mut table);
    campaign::register(&mut table);
    drawing::register(&mut table);
    fog::register(&mut table);
    session::register(&mut table);
    tokens::register(&mut table);
    zones::register(&mut table);
    table
}

/// Forward unchanged to everyone but the sender; no canonical state.
fn relay_to_others(_: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    ctx.forward_to_others(cmd);
    Ok(())
}

/// Forward unchanged to everyone; no canonical state.
fn relay_to_all(_: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    ctx.forward_to_all(cmd);
    Ok(())
}

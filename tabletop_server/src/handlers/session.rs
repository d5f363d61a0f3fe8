// Player-to-player traffic the server passes through without keeping state:
// chat, macro calls, typing indicators, pointers, add-on libraries, game
// data. Plus the two commands that concern connections themselves,
// `heartbeat` and `bootPlayer`.

use std::collections::BTreeMap;

use tabletop_protocol::{Command, CommandKind, ProtocolError};
use tracing::{debug, info};

use super::{relay_to_all, relay_to_others};
use crate::authority::{Authority, Handler};
use crate::context::CallContext;

pub(super) fn register(table: &mut BTreeMap<CommandKind, Handler>) {
    for kind in [
        CommandKind::Message,
        CommandKind::ExecFunction,
        CommandKind::ExecLink,
        CommandKind::SetLiveTypingLabel,
        CommandKind::AddAddOnLibrary,
        CommandKind::RemoveAddOnLibrary,
        CommandKind::RemoveAllAddOnLibraries,
        CommandKind::UpdateDataStore,
        CommandKind::UpdateDataNamespace,
        CommandKind::UpdateData,
        CommandKind::RemoveDataStore,
        CommandKind::RemoveDataNamespace,
        CommandKind::RemoveData,
    ] {
        table.insert(kind, relay_to_others);
    }
    for kind in [
        CommandKind::ShowPointer,
        CommandKind::HidePointer,
        CommandKind::MovePointer,
    ] {
        table.insert(kind, relay_to_all);
    }
    table.insert(CommandKind::Heartbeat, heartbeat);
    table.insert(CommandKind::BootPlayer, boot_player);
}

fn heartbeat(_: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let name: &str = cmd.get(0)?;
    debug!("heartbeat from {name} on {}", ctx.sender());
    Ok(())
}

/// Tell everyone else, then release the booted player's connection.
fn boot_player(_: &Authority, ctx: &mut CallContext, cmd: &Command) -> Result<(), ProtocolError> {
    let name: &str = cmd.get(0)?;
    info!("{} boots {name}", ctx.sender());
    ctx.forward_to_others(cmd);
    ctx.boot(name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use tabletop_protocol::Arg;

    use super::super::testing::{authority_with_zone, call, others, sends};
    use super::*;
    use crate::forward::{Outgoing, Target};

    #[test]
    fn heartbeat_goes_nowhere() {
        let (auth, _) = authority_with_zone();
        assert!(call(&auth, CommandKind::Heartbeat, vec![Arg::str("Ann")]).is_empty());
    }

    #[test]
    fn boot_forwards_then_releases() {
        let (auth, _) = authority_with_zone();
        let out = call(&auth, CommandKind::BootPlayer, vec![Arg::str("Bo")]);
        assert_eq!(out.len(), 2);
        assert_eq!(*sends(&out)[0].0, others());
        assert_eq!(
            out[1],
            Outgoing::Boot {
                player_name: "Bo".into()
            }
        );
    }

    #[test]
    fn pointers_include_sender() {
        let (auth, _) = authority_with_zone();
        let out = call(&auth, CommandKind::HidePointer, vec![Arg::str("Ann")]);
        assert_eq!(*sends(&out)[0].0, Target::All);
    }

    #[test]
    fn data_store_updates_exclude_sender() {
        let (auth, _) = authority_with_zone();
        let out = call(
            &auth,
            CommandKind::RemoveData,
            vec![Arg::str("game"), Arg::str("loot"), Arg::str("gold")],
        );
        assert_eq!(*sends(&out)[0].0, others());
    }
}

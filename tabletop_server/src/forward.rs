// Forward targets and outgoing effects.
//
// Handlers never write to connections themselves. They describe what should
// go out as a list of `Outgoing` values, and the session delivers them to the
// roster after the handler returns. `Target` is the only addressing mode:
// everyone, everyone but some connections, or exactly one connection.

use tabletop_protocol::{Command, ConnectionId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    All,
    AllExcept(Vec<ConnectionId>),
    Only(ConnectionId),
}

impl Target {
    pub fn includes(&self, connection: &ConnectionId) -> bool {
        match self {
            Self::All => true,
            Self::AllExcept(excluded) => !excluded.contains(connection),
            Self::Only(only) => only == connection,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Outgoing {
    Send { target: Target, command: Command },
    /// Release the connection of the named player.
    Boot { player_name: String },
}

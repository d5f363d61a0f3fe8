// Session messages exchanged between clients and the server.
//
// Two enums define the full envelope vocabulary:
// - `ClientMessage`: sent by clients to the server.
// - `ServerMessage`: sent by the server to clients.
//
// Handshake (`Hello` / `Welcome` / `Rejected`) and departure (`Goodbye`) are
// session plumbing. Everything else travels as `Call`: a command kind name
// plus its arguments in tagged JSON form. Arguments stay as raw
// `serde_json::Value` nodes here so the receiving side can run the
// allow-list gate (see `codec.rs`) before any argument is materialized.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabletop_model::{Player, Role};

use crate::codec::encode_args;
use crate::command::Command;
use crate::error::ProtocolError;
use crate::types::ConnectionId;

/// Bumped whenever the envelope or argument encoding changes incompatibly.
pub const PROTOCOL_VERSION: u32 = 1;

/// Messages sent by a client to the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Join the session (handshake).
    Hello {
        protocol_version: u32,
        player_name: String,
        role: Role,
        password: Option<String>,
    },
    /// One command invocation.
    Call { kind: String, args: Vec<Value> },
    /// Player is leaving gracefully.
    Goodbye,
}

/// Messages sent by the server to a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Handshake accepted.
    Welcome {
        connection_id: ConnectionId,
        session_name: String,
        players: Vec<Player>,
    },
    /// Handshake rejected.
    Rejected { reason: String },
    /// One command invocation, stamped with the connection that caused it.
    Call {
        kind: String,
        sender: ConnectionId,
        args: Vec<Value>,
    },
}

impl ClientMessage {
    pub fn call(command: &Command) -> Result<Self, ProtocolError> {
        Ok(Self::Call {
            kind: command.kind().as_str().to_owned(),
            args: encode_args(command.args())?,
        })
    }
}

impl ServerMessage {
    pub fn call(command: &Command) -> Result<Self, ProtocolError> {
        Ok(Self::Call {
            kind: command.kind().as_str().to_owned(),
            sender: command.sender().clone(),
            args: encode_args(command.args())?,
        })
    }
}

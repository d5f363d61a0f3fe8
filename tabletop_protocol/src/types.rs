// Connection identity.
//
// The server assigns every accepted connection an opaque `ConnectionId`
// string. It is the unit of inclusion/exclusion when the server forwards a
// command, and it is stamped on every command the server relays so that a
// client can tell its own echoes apart from other peers' commands. The
// reserved id `server` marks commands the server synthesizes itself.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sender id carried by commands the server originates.
pub const SERVER_CONNECTION: &str = "server";

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The reserved id of the server itself.
    pub fn server() -> Self {
        Self(SERVER_CONNECTION.into())
    }

    pub fn is_server(&self) -> bool {
        self.0 == SERVER_CONNECTION
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

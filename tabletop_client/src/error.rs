// Client-level errors. Only connection setup and sends surface these; a
// command that fails to decode or apply on receipt is logged and dropped.

use std::io;

use tabletop_protocol::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connect failed: {0}")]
    Connect(#[source] io::Error),

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("unexpected handshake response: {0}")]
    UnexpectedResponse(String),

    #[error("connection closed")]
    Closed,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

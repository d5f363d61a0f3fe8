// Protocol-level errors.
//
// Every variant is fatal to one message only. The dispatch boundaries on both
// sides log the error and drop the message; nothing here tears down a
// connection except `Io`, which comes from the transport itself.

use std::io;

use tabletop_model::AssetId;
use thiserror::Error;

use crate::command::CommandKind;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown command kind {0:?}")]
    UnknownCommand(String),

    #[error("{kind}: expected {expected} arguments, got {found}")]
    Arity {
        kind: CommandKind,
        expected: usize,
        found: usize,
    },

    #[error("{kind}: argument {index} should be {expected}, got {found}")]
    ArgType {
        kind: CommandKind,
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("type {0:?} is not on the allow-list")]
    Denied(String),

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("no transfer in progress for asset {0}")]
    UnknownTransfer(AssetId),

    #[error("chunk for {asset} at {offset}+{len} exceeds declared size {total}")]
    ChunkOutOfRange {
        asset: AssetId,
        offset: u64,
        len: usize,
        total: u64,
    },

    #[error("asset {asset} declares {total} bytes, limit is {limit}")]
    AssetTooLarge { asset: AssetId, total: u64, limit: u64 },

    #[error("transfer of {0} finished before every byte arrived")]
    IncompleteTransfer(AssetId),

    #[error("asset bytes hash to {actual}, expected {expected}")]
    HashMismatch { expected: AssetId, actual: AssetId },

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io: {0}")]
    Io(#[from] io::Error),
}

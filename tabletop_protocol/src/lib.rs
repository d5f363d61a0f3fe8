// tabletop_protocol — wire protocol for the shared tabletop session.
//
// This crate defines everything that crosses the connection between the
// authoritative server (`tabletop_server`) and its clients
// (`tabletop_client`). It depends only on `tabletop_model` for the payload
// types and has no networking of its own beyond stream framing.
//
// Module overview:
// - `types.rs`:     `ConnectionId`, the server-assigned identity of a peer.
// - `arg.rs`:       `Arg`, the closed set of argument types a command may
//                   carry, each with a stable wire type name.
// - `command.rs`:   `CommandKind` (the command vocabulary with fixed
//                   positional signatures) and the `Command` envelope.
// - `allowlist.rs`: `AllowList`, the type-name gate applied before any
//                   argument is materialized.
// - `codec.rs`:     Gated decoding of calls into `Command`s.
// - `update.rs`:    Wire form of `TokenUpdate`s for `updateTokenProperty`.
// - `transfer.rs`:  Chunked asset transfer: header, chunks, producer and
//                   consumer.
// - `message.rs`:   Client-to-server and server-to-client envelopes.
// - `framing.rs`:   Length-delimited framing over any `Read`/`Write` stream:
//                   4-byte big-endian length prefix, then JSON payload.
// - `error.rs`:     `ProtocolError`.
//
// Design decisions:
// - **Closed argument set.** Decoding never constructs a type chosen by the
//   peer; a type name either maps to an `Arg` variant or the message is
//   refused. The allow-list is checked first so that a denied name is
//   reported as a security event rather than a parse failure.
// - **Positional signatures.** Each command kind has one fixed parameter list,
//   checked on construction and on decode, so handlers extract arguments by
//   index with `Command::get` and never see a wrong-typed value.
// - **No async runtime.** Framing uses `std::io::Read`/`Write`, compatible
//   with blocking TCP streams and buffered wrappers.

pub mod allowlist;
pub mod arg;
pub mod codec;
pub mod command;
pub mod error;
pub mod framing;
pub mod message;
pub mod transfer;
pub mod types;
pub mod update;

pub use allowlist::AllowList;
pub use arg::{Arg, ArgType, FromArg, Param};
pub use codec::{decode_call, encode_args, gate};
pub use command::{Command, CommandKind, check_signature};
pub use error::ProtocolError;
pub use framing::{MAX_MESSAGE_SIZE, read_json, read_message, write_json, write_message};
pub use message::{ClientMessage, PROTOCOL_VERSION, ServerMessage};
pub use transfer::{
    AssetChunk, AssetConsumer, AssetHeader, AssetProducer, DEFAULT_CHUNK_SIZE, MAX_ASSET_SIZE,
};
pub use types::{ConnectionId, SERVER_CONNECTION};
pub use update::{decode_update, encode_update};

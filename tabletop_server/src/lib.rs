// tabletop_server — authoritative sync server for shared tabletop sessions.
//
// The server holds the canonical campaign. Clients send commands; the server
// applies each one to its copy, resolves ordering conflicts (z-order), and
// forwards the command (or a derived one) to the right set of connections.
//
// Module overview:
// - `authority.rs`: `Authority`, the canonical state plus the command
//                   registry and per-zone ordering locks.
// - `handlers/`:    One handler function per command kind, grouped by
//                   concern, each choosing its forward policy.
// - `context.rs`:   `CallContext`, the explicit per-call sender identity and
//                   effect list.
// - `forward.rs`:   `Target` (all / all-except / only) and `Outgoing`.
// - `pump.rs`:      `TransferPump`, active chunked asset transfers.
// - `session.rs`:   `Session`, the roster of connected players; turns
//                   handler effects into writes.
// - `outbound.rs`:  `Outbound`, the write half of a connection (TCP or, in
//                   tests, a channel).
// - `server.rs`:    TCP listener, reader threads (one per client), and the
//                   main event loop.
// - `config.rs`:    `ServerConfig`.
// - `error.rs`:     `ServerError`.
//
// The server can run as a standalone binary (`main.rs`) or be embedded via
// `start_server` (the integration tests do this).

pub mod authority;
pub mod config;
pub mod context;
pub mod error;
pub mod forward;
mod handlers;
pub mod outbound;
pub mod pump;
pub mod server;
pub mod session;

pub use authority::{Authority, Handler};
pub use config::ServerConfig;
pub use context::CallContext;
pub use error::ServerError;
pub use forward::{Outgoing, Target};
pub use server::{ServerHandle, start_server, start_server_with};
pub use session::Session;

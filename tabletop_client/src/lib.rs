// tabletop_client — client side of the tabletop sync protocol.
//
// A client keeps a mirror of the session (`ClientModel`) that the server's
// command stream keeps eventually consistent, and offers a command API
// (`ServerCommands`) that sends mutations to the server.
//
// Module overview:
// - `net.rs`:        TCP transport, handshake, receive thread, `CommandSink`.
// - `dispatcher.rs`: Routes received commands: background-safe kinds are
//                    applied on the receive thread, the rest are queued on
//                    the model worker. Skips echoes of own optimistic sends.
// - `worker.rs`:     The single serialized context that mutates the model.
// - `apply.rs`:      Per-kind model handlers and their `Effect`s.
// - `model.rs`:      `ClientModel` and the `SharedModel` handle.
// - `commands.rs`:   The command-sending API with optimistic local apply.
// - `coalesce.rs`:   Last-write-wins queue for drag updates.
// - `transfer.rs`:   Reassembly of chunked asset transfers.
// - `ui.rs`:         `UiHooks`, the rendering collaborator.
// - `client.rs`:     `TableClient`, everything above wired together.
// - `config.rs`:     `ClientConfig`.
// - `error.rs`:      `ClientError`.
//
// Threads: one receive thread, one model worker, one coalescing timer. The
// embedder's own thread calls the command API and reads the model.

pub mod apply;
pub mod client;
pub mod coalesce;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod model;
pub mod net;
pub mod transfer;
pub mod ui;
pub mod worker;

#[cfg(test)]
mod testing;

pub use client::TableClient;
pub use coalesce::CoalescingQueue;
pub use commands::ServerCommands;
pub use config::ClientConfig;
pub use dispatcher::{Dispatcher, Stores};
pub use error::ClientError;
pub use model::{ClientModel, SharedModel, TokenMove, ViewRequest};
pub use net::{CommandSink, NetClient, TcpSink, WelcomeInfo};
pub use ui::{NoUi, UiHooks};
pub use worker::ModelQueue;

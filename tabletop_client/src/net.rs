// TCP transport to the tabletop server.
//
// Architecture:
// - `NetClient::connect()` performs TCP connect + Hello handshake on the
//   calling thread and returns the `Welcome` details.
// - `NetClient::spawn_reader()` starts the background receive thread. It
//   reads framed `ServerMessage`s, runs every `Call` through the allow-list
//   gate and the codec, and hands the decoded `Command` to a callback
//   (normally `Dispatcher::handle`). A call that fails to decode is logged
//   and dropped; the connection stays up.
// - Sending goes through `CommandSink`. The TCP implementation keeps the
//   `BufWriter<TcpStream>` behind a mutex because three parties write: the
//   embedder's thread (the command API), the coalescing queue's timer
//   thread, and the model worker (re-sends such as the "Table" client's
//   `putToken`). Each frame is written and flushed under the lock, so
//   frames never interleave.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tabletop_model::Player;
use tabletop_protocol::{
    AllowList, ClientMessage, Command, ConnectionId, PROTOCOL_VERSION, ServerMessage, decode_call,
    read_json, write_json,
};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Outbound half of a connection.
pub trait CommandSink: Send + Sync {
    fn send(&self, command: &Command) -> Result<(), ClientError>;

    /// End the session. Further sends fail with `ClientError::Closed`.
    fn close(&self);
}

/// Information returned by a successful handshake.
#[derive(Clone, Debug)]
pub struct WelcomeInfo {
    pub connection_id: ConnectionId,
    pub session_name: String,
    pub players: Vec<Player>,
}

/// `CommandSink` over the TCP stream.
#[derive(Debug)]
pub struct TcpSink {
    writer: Mutex<BufWriter<TcpStream>>,
    closed: AtomicBool,
}

impl TcpSink {
    fn new(stream: TcpStream) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(stream)),
            closed: AtomicBool::new(false),
        }
    }

    fn write(&self, msg: &ClientMessage) -> Result<(), ClientError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::Closed);
        }
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        write_json(&mut *writer, msg)?;
        Ok(())
    }
}

impl CommandSink for TcpSink {
    fn send(&self, command: &Command) -> Result<(), ClientError> {
        debug!("sending {}", command.kind());
        self.write(&ClientMessage::call(command)?)
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = write_json(&mut *writer, &ClientMessage::Goodbye);
        let _ = writer.get_ref().shutdown(Shutdown::Both);
    }
}

/// A connected, welcomed client whose receive thread has not started yet.
pub struct NetClient {
    sink: Arc<TcpSink>,
    reader: Option<BufReader<TcpStream>>,
}

impl NetClient {
    /// Connect, send Hello and wait for Welcome or Rejected.
    pub fn connect(
        addr: impl ToSocketAddrs,
        config: &ClientConfig,
    ) -> Result<(Self, WelcomeInfo), ClientError> {
        let stream = TcpStream::connect(addr).map_err(ClientError::Connect)?;
        stream.set_nodelay(true).ok();
        stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT)).ok();

        let reader_stream = stream.try_clone().map_err(ClientError::Connect)?;
        let sink = TcpSink::new(stream);
        sink.write(&ClientMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
            player_name: config.player_name.clone(),
            role: config.role,
            password: config.password.clone(),
        })?;

        let mut reader = BufReader::new(reader_stream);
        let welcome = match read_json::<_, ServerMessage>(&mut reader)? {
            ServerMessage::Welcome {
                connection_id,
                session_name,
                players,
            } => WelcomeInfo {
                connection_id,
                session_name,
                players,
            },
            ServerMessage::Rejected { reason } => return Err(ClientError::Rejected(reason)),
            other => return Err(ClientError::UnexpectedResponse(format!("{other:?}"))),
        };
        info!(
            "joined session {:?} as {} ({})",
            welcome.session_name, config.player_name, welcome.connection_id
        );

        // Clear the handshake timeout for the long-lived reader loop.
        reader.get_ref().set_read_timeout(None).ok();

        Ok((
            Self {
                sink: Arc::new(sink),
                reader: Some(reader),
            },
            welcome,
        ))
    }

    pub fn sink(&self) -> Arc<TcpSink> {
        Arc::clone(&self.sink)
    }

    /// Start the receive thread. `on_command` runs on that thread for every
    /// decoded command; `on_closed` runs once when the stream ends.
    pub fn spawn_reader<F, G>(&mut self, on_command: F, on_closed: G) -> Option<JoinHandle<()>>
    where
        F: FnMut(Command) + Send + 'static,
        G: FnOnce() + Send + 'static,
    {
        let reader = self.reader.take()?;
        Some(thread::spawn(move || {
            reader_loop(reader, AllowList::standard(), on_command);
            on_closed();
        }))
    }
}

/// Receive thread: read framed messages until the stream ends.
fn reader_loop<F>(mut reader: BufReader<TcpStream>, allow: AllowList, mut on_command: F)
where
    F: FnMut(Command),
{
    loop {
        let msg = match read_json::<_, ServerMessage>(&mut reader) {
            Ok(msg) => msg,
            Err(e) => {
                debug!("connection ended: {e}");
                return;
            }
        };
        match msg {
            ServerMessage::Call { kind, sender, args } => {
                match decode_call(sender.clone(), &kind, &args, &allow) {
                    Ok(command) => on_command(command),
                    Err(e) => warn!("dropping {kind} from {sender}: {e}"),
                }
            }
            other => warn!("unexpected message after handshake: {other:?}"),
        }
    }
}

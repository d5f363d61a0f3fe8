// TCP server and main event loop.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread** (`TcpListener::accept()` loop): accepts new TCP
//   connections and starts a reader thread for each.
// - **Reader threads** (one per client): read the `Hello` handshake (with a
//   timeout) and hand it to the main thread as `InternalEvent::Joining`,
//   then wait for the admission verdict. Once admitted they read framed
//   `ClientMessage`s, run each `Call` through the allow-list gate and the
//   codec, and send the decoded `Command` to the main thread. A call that
//   fails to decode is logged and dropped; the connection stays up. A frame
//   that is not a `ClientMessage` at all, EOF, or `Goodbye` ends the
//   connection. A silent client therefore only ever stalls its own thread.
// - **Main thread**: owns the `Session`, receives events from the channel and
//   dispatches them. `recv_timeout` with the pump interval doubles as the
//   transfer pump timer; the pump also runs after event handling whenever
//   the interval has elapsed, so steady traffic cannot starve transfers.
//
// The main thread is the only writer to admitted client streams. Reader
// threads write only the `Rejected` for a protocol version mismatch, before
// the connection reaches the session. Shutdown: the main thread checks a `keep_running` flag (cleared by
// `ServerHandle::stop`) and breaks out of the event loop.

use std::io::{BufReader, BufWriter};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tabletop_model::{AssetStore, Campaign, Role};
use tabletop_protocol::{
    AllowList, ClientMessage, Command, ConnectionId, PROTOCOL_VERSION, ServerMessage, decode_call,
    read_json, write_json,
};
use tracing::{debug, info, warn};

use crate::authority::Authority;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::session::Session;

/// How long a new connection may take to send its `Hello`.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Events sent from reader threads to the main thread.
enum InternalEvent {
    /// A connection completed its `Hello`. The main thread answers on
    /// `admitted` with the new id, or drops it after sending `Rejected`.
    Joining {
        stream: TcpStream,
        player_name: String,
        role: Role,
        password: Option<String>,
        admitted: Sender<ConnectionId>,
    },
    Command { connection: ConnectionId, command: Command },
    Disconnected { connection: ConnectionId },
}

/// Handle returned by `start_server` to control the running server.
pub struct ServerHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ServerHandle {
    /// Signal the server to stop and wait for it to shut down.
    pub fn stop(mut self) {
        self.keep_running.store(false, Ordering::SeqCst);
        self.join();
    }

    /// Block until the server thread exits.
    pub fn wait(mut self) {
        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Start a server with an empty campaign and asset store.
pub fn start_server(config: ServerConfig) -> Result<(ServerHandle, SocketAddr), ServerError> {
    start_server_with(config, Campaign::default(), Arc::new(AssetStore::new()))
}

/// Start the server on a background thread, seeded with `campaign` and
/// `assets`. Returns a handle for stopping it and the bound address (useful
/// when port 0 lets the OS pick a free port).
pub fn start_server_with(
    config: ServerConfig,
    campaign: Campaign,
    assets: Arc<AssetStore>,
) -> Result<(ServerHandle, SocketAddr), ServerError> {
    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr).map_err(|source| ServerError::Bind {
        addr: addr.clone(),
        source,
    })?;
    let local = listener.local_addr()?;
    listener.set_nonblocking(true)?;
    info!("session {:?} listening on {local}", config.session_name);

    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();
    let authority = Authority::new(campaign, assets, config.chunk_size);
    let thread = thread::spawn(move || {
        run_server(listener, config, authority, keep_running_clone);
    });

    Ok((
        ServerHandle {
            keep_running,
            thread: Some(thread),
        },
        local,
    ))
}

/// Main server loop. Runs until `keep_running` is set to false.
fn run_server(
    listener: TcpListener,
    config: ServerConfig,
    authority: Authority,
    keep_running: Arc<AtomicBool>,
) {
    let pump_interval = config.pump_interval();
    let mut session = Session::new(
        config.session_name,
        config.gm_password,
        config.player_password,
        config.max_players,
        authority,
    );

    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();

    // Listener thread: accepts new connections.
    let keep_running_listener = keep_running.clone();
    let tx_listener = tx.clone();
    thread::spawn(move || {
        while keep_running_listener.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    debug!("connection from {peer}");
                    stream.set_nonblocking(false).ok();
                    let tx_reader = tx_listener.clone();
                    let keep_running_reader = keep_running_listener.clone();
                    thread::spawn(move || {
                        connection_thread(stream, tx_reader, keep_running_reader);
                    });
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    warn!("accept failed: {e}");
                    break;
                }
            }
        }
    });

    let mut last_pump = Instant::now();
    while keep_running.load(Ordering::SeqCst) {
        match rx.recv_timeout(pump_interval) {
            Ok(event) => {
                handle_event(&mut session, event);
                while let Ok(event) = rx.try_recv() {
                    handle_event(&mut session, event);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
        if last_pump.elapsed() >= pump_interval {
            session.pump_transfers();
            last_pump = Instant::now();
        }
    }
    info!("server stopped");
}

fn handle_event(session: &mut Session, event: InternalEvent) {
    match event {
        InternalEvent::Joining {
            stream,
            player_name,
            role,
            password,
            admitted,
        } => admit(session, &stream, player_name, role, password, &admitted),
        InternalEvent::Command {
            connection,
            command,
        } => session.handle_command(&connection, command),
        InternalEvent::Disconnected { connection } => session.remove_player(&connection),
    }
}

fn reject(stream: &TcpStream, reason: String) {
    debug!("rejecting connection: {reason}");
    let mut writer = BufWriter::new(stream);
    let _ = write_json(&mut writer, &ServerMessage::Rejected { reason });
}

/// Add a player who completed the handshake, or tell them why not.
fn admit(
    session: &mut Session,
    stream: &TcpStream,
    player_name: String,
    role: Role,
    password: Option<String>,
    admitted: &Sender<ConnectionId>,
) {
    let write_stream = match stream.try_clone() {
        Ok(s) => s,
        Err(e) => {
            debug!("could not clone stream for {player_name}: {e}");
            return;
        }
    };
    match session.add_player(player_name, role, password, Box::new(BufWriter::new(write_stream))) {
        Ok(connection) => {
            if admitted.send(connection.clone()).is_err() {
                session.remove_player(&connection);
            }
        }
        Err(reason) => reject(stream, reason),
    }
}

/// Per-connection thread: handshake, then the reader loop once admitted.
fn connection_thread(stream: TcpStream, tx: Sender<InternalEvent>, keep_running: Arc<AtomicBool>) {
    let Some((reader, player_name, role, password)) = read_hello(&stream) else {
        return;
    };
    let (admitted, verdict) = mpsc::channel();
    let joining = InternalEvent::Joining {
        stream,
        player_name,
        role,
        password,
        admitted,
    };
    if tx.send(joining).is_err() {
        return;
    }
    // A rejected or abandoned join drops the sender without a verdict.
    let Ok(connection) = verdict.recv() else {
        return;
    };
    reader_loop(reader, connection, tx, keep_running);
}

/// Read and check the `Hello`. `None` means the connection is finished.
fn read_hello(
    stream: &TcpStream,
) -> Option<(BufReader<TcpStream>, String, Role, Option<String>)> {
    stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT)).ok();
    let mut reader = BufReader::new(stream.try_clone().ok()?);
    let hello: ClientMessage = match read_json(&mut reader) {
        Ok(msg) => msg,
        Err(e) => {
            debug!("handshake failed: {e}");
            return None;
        }
    };
    let ClientMessage::Hello {
        protocol_version,
        player_name,
        role,
        password,
    } = hello
    else {
        debug!("first message was not Hello, dropping connection");
        return None;
    };
    if protocol_version != PROTOCOL_VERSION {
        reject(
            stream,
            format!("protocol version {protocol_version}, server speaks {PROTOCOL_VERSION}"),
        );
        return None;
    }
    // The long-lived reader loop blocks without a timeout.
    stream.set_read_timeout(None).ok();
    Some((reader, player_name, role, password))
}

/// Reader loop for a single client. Runs in its own thread.
fn reader_loop(
    mut reader: BufReader<TcpStream>,
    connection: ConnectionId,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
) {
    let allow = AllowList::standard();
    while keep_running.load(Ordering::SeqCst) {
        match read_json::<_, ClientMessage>(&mut reader) {
            Ok(ClientMessage::Call { kind, args }) => {
                match decode_call(connection.clone(), &kind, &args, &allow) {
                    Ok(command) => {
                        let event = InternalEvent::Command {
                            connection: connection.clone(),
                            command,
                        };
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("dropped {kind:?} from {connection}: {e}"),
                }
            }
            Ok(ClientMessage::Goodbye) => break,
            Ok(ClientMessage::Hello { .. }) => {
                debug!("{connection} sent a second Hello, ignoring");
            }
            Err(e) => {
                debug!("{connection} read ended: {e}");
                break;
            }
        }
    }
    let _ = tx.send(InternalEvent::Disconnected { connection });
}

// Write halves of client connections.
//
// The session writes through `Outbound` so the same roster logic drives real
// sockets and, in tests, plain channels.

use std::io::{self, BufWriter, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::mpsc::Sender;

use tabletop_protocol::{ProtocolError, ServerMessage, write_json};

pub trait Outbound: Send {
    fn send(&mut self, msg: &ServerMessage) -> Result<(), ProtocolError>;

    /// End the connection. For sockets this also stops the reader thread,
    /// which sees EOF.
    fn close(&mut self) {}
}

impl Outbound for BufWriter<TcpStream> {
    fn send(&mut self, msg: &ServerMessage) -> Result<(), ProtocolError> {
        write_json(self, msg)
    }

    fn close(&mut self) {
        let _ = self.flush();
        let _ = self.get_ref().shutdown(Shutdown::Both);
    }
}

impl Outbound for Sender<ServerMessage> {
    fn send(&mut self, msg: &ServerMessage) -> Result<(), ProtocolError> {
        Sender::send(self, msg.clone())
            .map_err(|_| io::Error::from(io::ErrorKind::BrokenPipe).into())
    }
}

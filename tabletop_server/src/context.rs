// Per-call context passed explicitly to every handler.
//
// Carries the identity of the connection that sent the command and collects
// the handler's outgoing effects. One context exists per handled command, so
// concurrent calls on different connections never share state through it.

use tabletop_protocol::{Command, ConnectionId};

use crate::forward::{Outgoing, Target};

#[derive(Debug)]
pub struct CallContext {
    sender: ConnectionId,
    outgoing: Vec<Outgoing>,
}

impl CallContext {
    pub fn new(sender: ConnectionId) -> Self {
        Self {
            sender,
            outgoing: Vec::new(),
        }
    }

    pub fn sender(&self) -> &ConnectionId {
        &self.sender
    }

    pub fn send(&mut self, target: Target, command: Command) {
        self.outgoing.push(Outgoing::Send { target, command });
    }

    /// Rebroadcast to every connection except the sender.
    pub fn forward_to_others(&mut self, command: &Command) {
        let target = Target::AllExcept(vec![self.sender.clone()]);
        self.send(target, command.clone());
    }

    /// Rebroadcast to every connection, the sender included.
    pub fn forward_to_all(&mut self, command: &Command) {
        self.send(Target::All, command.clone());
    }

    /// Send a server-originated response to the sender only.
    pub fn reply(&mut self, command: Command) {
        let target = Target::Only(self.sender.clone());
        self.send(target, command.with_sender(ConnectionId::server()));
    }

    pub fn boot(&mut self, player_name: impl Into<String>) {
        self.outgoing.push(Outgoing::Boot {
            player_name: player_name.into(),
        });
    }

    pub fn outgoing(&self) -> &[Outgoing] {
        &self.outgoing
    }

    pub fn into_outgoing(self) -> Vec<Outgoing> {
        self.outgoing
    }
}

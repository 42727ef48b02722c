// The seam between client logic and the network.
//
// `Transport` is the bidirectional event channel the match logic talks
// through: `send` a request, `poll` whatever the server has said since the
// last poll. The controller is generic over it, so the same code runs over
// TCP (`NetClient` in `net.rs`) and over `MemoryTransport`, an in-process
// stand-in that records what was sent and replays scripted replies.

use std::collections::VecDeque;

use flow_pvp_protocol::{ClientMessage, ServerMessage};

use crate::error::TransportError;

pub trait Transport {
    /// Queue one request for the server.
    fn send(&mut self, msg: &ClientMessage) -> Result<(), TransportError>;

    /// Drain every server message received so far. Never blocks.
    fn poll(&mut self) -> Vec<ServerMessage>;
}

/// In-memory transport for driving client logic without a server.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    sent: Vec<ClientMessage>,
    inbox: VecDeque<ServerMessage>,
    closed: bool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `msg` the next thing `poll` returns.
    pub fn push(&mut self, msg: ServerMessage) {
        self.inbox.push_back(msg);
    }

    /// Everything sent so far, oldest first.
    pub fn sent(&self) -> &[ClientMessage] {
        &self.sent
    }

    pub fn take_sent(&mut self) -> Vec<ClientMessage> {
        std::mem::take(&mut self.sent)
    }

    /// Fail every later `send`.
    pub fn close(&mut self) {
        self.closed = true;
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, msg: &ClientMessage) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.sent.push(msg.clone());
        Ok(())
    }

    fn poll(&mut self) -> Vec<ServerMessage> {
        self.inbox.drain(..).collect()
    }
}

// TCP client for connecting to the session server.
//
// Provides a non-blocking interface for the caller's thread:
// - `connect()` opens the socket on the calling thread and spawns a
//   background reader thread. There is no handshake; the first request is
//   usually `generate_user_id`.
// - The reader thread calls `recv_json()` in a loop and pushes each
//   `ServerMessage` into an `mpsc` channel.
// - The caller holds a `BufWriter<TcpStream>` for sending; writes flush
//   synchronously (messages are small).
// - `poll()` drains the inbox without blocking.
//
// The caller never blocks on network reads. Once the reader thread exits
// (server closed the socket, or sent something unparseable) `is_connected`
// turns false and sends fail with `TransportError::Closed`.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use flow_pvp_protocol::{ClientMessage, ServerMessage, recv_json, send_json};
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::transport::Transport;

/// TCP client for server communication.
pub struct NetClient {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<ServerMessage>,
    connected: Arc<AtomicBool>,
    _reader_thread: Option<JoinHandle<()>>,
}

impl NetClient {
    /// Connect to a server and spawn the reader thread.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).map_err(TransportError::Connect)?;
        stream.set_nodelay(true).ok();
        let reader_stream = stream.try_clone().map_err(TransportError::Connect)?;

        let (tx, rx) = mpsc::channel();
        let connected = Arc::new(AtomicBool::new(true));
        let connected_reader = connected.clone();
        let reader_thread = thread::spawn(move || {
            reader_loop(BufReader::new(reader_stream), tx, connected_reader);
        });

        Ok(Self {
            writer: BufWriter::new(stream),
            inbox: rx,
            connected,
            _reader_thread: Some(reader_thread),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Close both directions. The reader thread exits on its own.
    pub fn disconnect(&mut self) {
        self.connected.store(false, Ordering::SeqCst);
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
    }
}

impl Transport for NetClient {
    fn send(&mut self, msg: &ClientMessage) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Closed);
        }
        send_json(&mut self.writer, msg)?;
        Ok(())
    }

    fn poll(&mut self) -> Vec<ServerMessage> {
        self.inbox.try_iter().collect()
    }
}

impl Drop for NetClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Reader thread: read framed messages in a loop, push to channel.
fn reader_loop(
    mut reader: BufReader<TcpStream>,
    tx: Sender<ServerMessage>,
    connected: Arc<AtomicBool>,
) {
    loop {
        match recv_json::<_, ServerMessage>(&mut reader) {
            Ok(msg) => {
                if tx.send(msg).is_err() {
                    break; // Client dropped the receiver.
                }
            }
            Err(e) if e.is_disconnect() => {
                debug!("server closed the connection");
                break;
            }
            Err(e) => {
                if connected.load(Ordering::SeqCst) {
                    warn!(error = %e, "dropping server connection");
                }
                break;
            }
        }
    }
    connected.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::time::{Duration, Instant};

    use flow_pvp_protocol::LobbyCode;

    use super::*;

    fn poll_one(client: &mut NetClient) -> ServerMessage {
        let start = Instant::now();
        loop {
            if let Some(msg) = client.poll().into_iter().next() {
                return msg;
            }
            assert!(start.elapsed() < Duration::from_secs(5), "timed out");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn sends_and_receives_frames() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = NetClient::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        let mut server_reader = BufReader::new(server.try_clone().unwrap());
        let mut server_writer = BufWriter::new(server);

        client.send(&ClientMessage::CreateLobby).unwrap();
        let got: ClientMessage = recv_json(&mut server_reader).unwrap();
        assert_eq!(got, ClientMessage::CreateLobby);

        let reply = ServerMessage::LobbyCreated {
            lobby_id: LobbyCode::new("C0FFEE"),
        };
        send_json(&mut server_writer, &reply).unwrap();
        assert_eq!(poll_one(&mut client), reply);
    }

    #[test]
    fn server_hangup_marks_disconnected() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = NetClient::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        drop(server);

        let start = Instant::now();
        while client.is_connected() {
            assert!(start.elapsed() < Duration::from_secs(5), "timed out");
            thread::sleep(Duration::from_millis(5));
        }
        assert!(matches!(
            client.send(&ClientMessage::GenerateUserId),
            Err(TransportError::Closed)
        ));
    }
}

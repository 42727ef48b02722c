// TCP server and main event loop for the session authority.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread** (`TcpListener::accept()` loop): accepts connections
//   and sends `InternalEvent::NewConnection` to the main thread.
// - **Reader threads** (one per client): call `recv_json()` in a loop and
//   send `InternalEvent::MessageFrom` to the main thread. A frame that is
//   not a valid `ClientMessage` becomes `InternalEvent::Malformed`; the
//   framing is still intact, so the reader keeps going. On EOF or a read
//   error it sends `InternalEvent::Disconnected` and exits.
// - **Main thread**: owns the `Authority` and every write half. It receives
//   events with `recv_timeout(tick_interval)`; when nothing arrives in time,
//   or a full interval has passed since the last sweep, it calls
//   `Authority::tick` so rounds end on time without a separate timer thread.
//
// The main thread is the only writer to client streams; reader threads only
// read. A write failure drops that client's writer; its reader thread then
// observes the closed socket and reports the disconnect.
//
// Shutdown: `ServerHandle::stop` clears `keep_running`; the main loop exits,
// shuts down every client socket (unblocking the readers), and returns.

use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use flow_pvp_protocol::{ClientMessage, FramingError, ServerMessage, recv_json, send_json};
use flow_pvp_puzzle::BoardCatalog;
use tracing::{debug, info, warn};

use crate::authority::{Authority, ConnId, Outbound};
use crate::config::ServerConfig;
use crate::error::ServerError;

/// Events sent from listener/reader threads to the main thread.
enum InternalEvent {
    NewConnection {
        stream: TcpStream,
        peer: SocketAddr,
    },
    MessageFrom {
        conn: ConnId,
        message: ClientMessage,
    },
    Malformed {
        conn: ConnId,
        error: String,
    },
    Disconnected {
        conn: ConnId,
    },
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
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }

    /// Block until the server stops on its own.
    pub fn wait(mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Start the server on a background thread. Returns a handle for stopping
/// it and the bound address (useful when `bind_addr` uses port 0).
pub fn start_server(
    config: ServerConfig,
    catalog: BoardCatalog,
) -> Result<(ServerHandle, SocketAddr), ServerError> {
    config.validate()?;
    let listener = TcpListener::bind(&config.bind_addr)?;
    let addr = listener.local_addr()?;
    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();
    let tick_interval = Duration::from_millis(config.tick_interval_ms);
    let authority = Authority::new(config, catalog);

    let thread = thread::spawn(move || {
        run_server(listener, authority, tick_interval, keep_running_clone);
    });
    info!(%addr, "server listening");

    Ok((
        ServerHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Write halves of every live connection.
struct Clients {
    writers: BTreeMap<ConnId, BufWriter<TcpStream>>,
    next_id: u64,
}

impl Clients {
    fn deliver(&mut self, outbound: Vec<Outbound>) {
        for Outbound { to, message } in outbound {
            let Some(writer) = self.writers.get_mut(&to) else {
                continue;
            };
            if let Err(e) = send_json(writer, &message) {
                warn!(conn = %to, error = %e, "write failed, dropping client");
                if let Some(writer) = self.writers.remove(&to) {
                    let _ = writer.get_ref().shutdown(Shutdown::Both);
                }
            }
        }
    }

    fn shutdown_all(&mut self) {
        for writer in self.writers.values() {
            let _ = writer.get_ref().shutdown(Shutdown::Both);
        }
        self.writers.clear();
    }
}

/// Main loop. Runs until `keep_running` is set to false.
fn run_server(
    listener: TcpListener,
    mut authority: Authority,
    tick_interval: Duration,
    keep_running: Arc<AtomicBool>,
) {
    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();

    // Non-blocking so the accept thread can check keep_running periodically.
    listener.set_nonblocking(true).ok();

    let keep_running_listener = keep_running.clone();
    let tx_listener = tx.clone();
    thread::spawn(move || {
        while keep_running_listener.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    stream.set_nonblocking(false).ok();
                    let _ = tx_listener.send(InternalEvent::NewConnection { stream, peer });
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(20));
                }
                Err(e) => {
                    warn!(error = %e, "accept failed, listener stopping");
                    break;
                }
            }
        }
    });

    let mut clients = Clients {
        writers: BTreeMap::new(),
        next_id: 1,
    };
    let mut last_tick = Instant::now();

    while keep_running.load(Ordering::SeqCst) {
        match rx.recv_timeout(tick_interval) {
            Ok(event) => {
                handle_event(&mut authority, &mut clients, event, &tx);
                while let Ok(event) = rx.try_recv() {
                    handle_event(&mut authority, &mut clients, event, &tx);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
        let now = Instant::now();
        if now.duration_since(last_tick) >= tick_interval {
            last_tick = now;
            let outbound = authority.tick(now);
            clients.deliver(outbound);
        }
    }

    clients.shutdown_all();
    info!("server stopped");
}

fn handle_event(
    authority: &mut Authority,
    clients: &mut Clients,
    event: InternalEvent,
    tx: &Sender<InternalEvent>,
) {
    match event {
        InternalEvent::NewConnection { stream, peer } => {
            let conn = ConnId(clients.next_id);
            clients.next_id += 1;
            let read_stream = match stream.try_clone() {
                Ok(s) => s,
                Err(e) => {
                    warn!(%peer, error = %e, "could not clone stream, dropping connection");
                    return;
                }
            };
            clients.writers.insert(conn, BufWriter::new(stream));
            authority.connect(conn);
            info!(%conn, %peer, "client connected");

            let tx_reader = tx.clone();
            thread::spawn(move || {
                reader_loop(BufReader::new(read_stream), conn, tx_reader);
            });
        }
        InternalEvent::MessageFrom { conn, message } => {
            debug!(%conn, ?message, "request");
            let outbound = authority.handle(conn, message, Instant::now());
            clients.deliver(outbound);
        }
        InternalEvent::Malformed { conn, error } => {
            debug!(%conn, %error, "malformed request");
            clients.deliver(vec![Outbound {
                to: conn,
                message: ServerMessage::Error {
                    message: format!("Malformed message: {error}"),
                },
            }]);
        }
        InternalEvent::Disconnected { conn } => {
            info!(%conn, "client disconnected");
            if let Some(writer) = clients.writers.remove(&conn) {
                let _ = writer.get_ref().shutdown(Shutdown::Both);
            }
            let outbound = authority.disconnect(conn);
            clients.deliver(outbound);
        }
    }
}

/// Reader loop for a single client. Runs in its own thread.
fn reader_loop(mut reader: BufReader<TcpStream>, conn: ConnId, tx: Sender<InternalEvent>) {
    loop {
        let event = match recv_json::<_, ClientMessage>(&mut reader) {
            Ok(message) => InternalEvent::MessageFrom { conn, message },
            Err(FramingError::Json(e)) => InternalEvent::Malformed {
                conn,
                error: e.to_string(),
            },
            Err(err) => {
                if !err.is_disconnect() {
                    warn!(%conn, error = %err, "read failed");
                }
                let _ = tx.send(InternalEvent::Disconnected { conn });
                break;
            }
        };
        if tx.send(event).is_err() {
            // Main loop has exited.
            break;
        }
    }
}

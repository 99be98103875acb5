//! Single-threaded control server multiplexing clients with mio.

use std::collections::HashMap;
use std::io::{ErrorKind, Read};
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use indexmap::IndexSet;
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token, Waker};
use smol_str::SmolStr;
use tracing::{debug, info, warn};

use crate::dispatch::DispatchTable;
use crate::driver::ActuatorDriver;
use crate::error::ControlError;

use super::framing::{lossy_text, FrameBuffer, Framing};

const LISTENER: Token = Token(0);
const WAKER: Token = Token(1);
const FIRST_CLIENT: usize = 2;

/// Listening socket settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: SmolStr,
    pub port: u16,
    pub read_chunk: usize,
    pub framing: Framing,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SmolStr::new("0.0.0.0"),
            port: 61234,
            read_chunk: 1024,
            framing: Framing::Chunk,
        }
    }
}

impl ServerConfig {
    /// `host:port` text for diagnostics.
    #[must_use]
    pub fn address(&self) -> String {
        if self.bind.contains(':') {
            format!("[{}]:{}", self.bind, self.port)
        } else {
            format!("{}:{}", self.bind, self.port)
        }
    }
}

struct Client {
    stream: TcpStream,
    peer: SocketAddr,
    frames: FrameBuffer,
}

/// Result of reading one chunk from a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadOutcome {
    /// The socket may hold more data.
    More,
    /// The socket is drained until the next readiness event.
    Drained,
    /// The peer closed or the read failed.
    Closed,
}

/// Control server: accepts any number of clients and dispatches every
/// received batch into one driver, all on the calling thread.
pub struct ControlServer {
    poll: Poll,
    listener: TcpListener,
    waker: Arc<Waker>,
    stop: Arc<AtomicBool>,
    clients: HashMap<Token, Client>,
    readable: IndexSet<Token>,
    next_token: usize,
    framing: Framing,
    buf: Vec<u8>,
    dispatch: &'static DispatchTable,
}

impl std::fmt::Debug for ControlServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlServer")
            .field("local_addr", &self.listener.local_addr().ok())
            .field("clients", &self.clients.len())
            .field("framing", &self.framing)
            .finish()
    }
}

impl ControlServer {
    /// Bind the listening socket. Failure here is the one fatal control
    /// error.
    pub fn bind(config: &ServerConfig) -> Result<Self, ControlError> {
        let address = config.address();
        let bind_error = |reason: String| ControlError::Bind {
            address: SmolStr::new(&address),
            reason: reason.into(),
        };
        let addr = address
            .to_socket_addrs()
            .map_err(|err| bind_error(err.to_string()))?
            .next()
            .ok_or_else(|| bind_error("address did not resolve".to_string()))?;
        let mut listener = TcpListener::bind(addr).map_err(|err| bind_error(err.to_string()))?;

        let poll = Poll::new().map_err(|err| ControlError::io("create poller", &err))?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)
            .map_err(|err| ControlError::io("register listener", &err))?;
        let waker = Waker::new(poll.registry(), WAKER)
            .map_err(|err| ControlError::io("create waker", &err))?;

        let server = Self {
            poll,
            listener,
            waker: Arc::new(waker),
            stop: Arc::new(AtomicBool::new(false)),
            clients: HashMap::new(),
            readable: IndexSet::new(),
            next_token: FIRST_CLIENT,
            framing: config.framing,
            buf: vec![0; config.read_chunk.max(1)],
            dispatch: DispatchTable::standard(),
        };
        info!(
            address = %server.local_addr()?,
            framing = %server.framing,
            "control server listening"
        );
        Ok(server)
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ControlError> {
        self.listener
            .local_addr()
            .map_err(|err| ControlError::io("listener address", &err))
    }

    /// Connected client count.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Serve until stopped through a [`ServerHandle`].
    pub fn run(&mut self, driver: &mut dyn ActuatorDriver) -> Result<(), ControlError> {
        while !self.stop.load(Ordering::SeqCst) {
            self.poll_once(driver, None)?;
        }
        info!("control server stopped");
        Ok(())
    }

    /// Wait for readiness once (or until `timeout`), then read one chunk
    /// from every client with data. Clients that may hold more data are
    /// kept for the next call, which then does not wait. Returns the number
    /// of events and reads handled.
    pub fn poll_once(
        &mut self,
        driver: &mut dyn ActuatorDriver,
        timeout: Option<Duration>,
    ) -> Result<usize, ControlError> {
        let timeout = if self.readable.is_empty() {
            timeout
        } else {
            Some(Duration::ZERO)
        };
        let mut events = Events::with_capacity(128);
        match self.poll.poll(&mut events, timeout) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::Interrupted => return Ok(0),
            Err(err) => return Err(ControlError::io("poll", &err)),
        }
        let mut handled = 0;
        for event in events.iter() {
            handled += 1;
            match event.token() {
                LISTENER => self.accept_clients(),
                WAKER => debug!("control server woken"),
                token => {
                    self.readable.insert(token);
                }
            }
        }
        let ready: Vec<Token> = self.readable.drain(..).collect();
        for token in ready {
            handled += 1;
            match self.read_client(token, driver) {
                ReadOutcome::More => {
                    self.readable.insert(token);
                }
                ReadOutcome::Drained => {}
                ReadOutcome::Closed => self.disconnect(token),
            }
        }
        Ok(handled)
    }

    /// Run on a named thread, returning a handle that stops it.
    pub fn spawn<D>(mut self, mut driver: D) -> Result<ServerHandle, ControlError>
    where
        D: ActuatorDriver + Send + 'static,
    {
        let local_addr = self.local_addr()?;
        let stop = self.stop.clone();
        let waker = self.waker.clone();
        let join = thread::Builder::new()
            .name("robohand-server".into())
            .spawn(move || self.run(&mut driver))
            .map_err(|err| ControlError::io("spawn server thread", &err))?;
        Ok(ServerHandle {
            local_addr,
            stop,
            waker,
            join: Some(join),
        })
    }

    fn accept_clients(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((mut stream, peer)) => {
                    let token = Token(self.next_token);
                    self.next_token += 1;
                    if let Err(err) =
                        self.poll
                            .registry()
                            .register(&mut stream, token, Interest::READABLE)
                    {
                        warn!(%peer, error = %err, "client registration failed");
                        continue;
                    }
                    info!(%peer, "client connected");
                    self.clients.insert(
                        token,
                        Client {
                            stream,
                            peer,
                            frames: FrameBuffer::new(),
                        },
                    );
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    warn!(error = %err, "accept failed");
                    break;
                }
            }
        }
    }

    fn read_client(&mut self, token: Token, driver: &mut dyn ActuatorDriver) -> ReadOutcome {
        let Some(client) = self.clients.get_mut(&token) else {
            return ReadOutcome::Drained;
        };
        match client.stream.read(&mut self.buf) {
            Ok(0) => ReadOutcome::Closed,
            Ok(len) => {
                let chunk = &self.buf[..len];
                let text = match self.framing {
                    Framing::Chunk => Some(lossy_text(chunk).into_owned()),
                    Framing::Delimited => client.frames.push(chunk),
                };
                if let Some(text) = text {
                    debug!(peer = %client.peer, raw = %text, "received");
                    self.dispatch.dispatch_text(driver, &text);
                }
                ReadOutcome::More
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => ReadOutcome::Drained,
            Err(err) if err.kind() == ErrorKind::Interrupted => ReadOutcome::More,
            Err(err) => {
                warn!(peer = %client.peer, error = %err, "client read failed");
                ReadOutcome::Closed
            }
        }
    }

    fn disconnect(&mut self, token: Token) {
        self.readable.shift_remove(&token);
        if let Some(mut client) = self.clients.remove(&token) {
            let _ = self.poll.registry().deregister(&mut client.stream);
            if client.frames.buffered() > 0 {
                debug!(
                    peer = %client.peer,
                    bytes = client.frames.buffered(),
                    "partial command discarded on disconnect"
                );
            }
            info!(peer = %client.peer, "client disconnected");
        }
    }
}

/// Handle to a server running on its own thread.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    stop: Arc<AtomicBool>,
    waker: Arc<Waker>,
    join: Option<thread::JoinHandle<Result<(), ControlError>>>,
}

impl ServerHandle {
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Ask the server loop to exit after its current wait.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Err(err) = self.waker.wake() {
            warn!(error = %err, "server wake failed");
        }
    }

    /// Stop the server and wait for its thread.
    pub fn join(mut self) -> Result<(), ControlError> {
        self.stop();
        self.wait()
    }

    fn wait(&mut self) -> Result<(), ControlError> {
        match self.join.take() {
            Some(join) => join
                .join()
                .map_err(|_| ControlError::Io("server thread panicked".into()))?,
            None => Ok(()),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if self.join.is_some() {
            self.stop();
            let _ = self.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::driver::{ActuatorCall, RecordingDriver};

    fn loopback(framing: Framing) -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1".into(),
            port: 0,
            framing,
            ..ServerConfig::default()
        }
    }

    fn pump_until(
        server: &mut ControlServer,
        driver: &mut RecordingDriver,
        done: impl Fn(&RecordingDriver) -> bool,
    ) {
        for _ in 0..200 {
            if done(driver) {
                return;
            }
            server
                .poll_once(driver, Some(Duration::from_millis(10)))
                .unwrap();
        }
    }

    #[test]
    fn second_bind_on_same_port_fails() {
        let first = ControlServer::bind(&loopback(Framing::Chunk)).unwrap();
        let port = first.local_addr().unwrap().port();
        let err = ControlServer::bind(&ServerConfig {
            port,
            ..loopback(Framing::Chunk)
        })
        .unwrap_err();
        assert!(matches!(err, ControlError::Bind { .. }), "{err}");
    }

    #[test]
    fn one_read_dispatches_every_command_in_order() {
        let mut server = ControlServer::bind(&loopback(Framing::Chunk)).unwrap();
        let mut driver = RecordingDriver::new();
        let mut stream = std::net::TcpStream::connect(server.local_addr().unwrap()).unwrap();
        stream.write_all(b"claw|-10;led|255|0|0;").unwrap();
        pump_until(&mut server, &mut driver, |d| d.calls().len() >= 2);
        assert_eq!(
            driver.calls(),
            vec![ActuatorCall::Claw(-10), ActuatorCall::Led(255, 0, 0)]
        );
    }

    #[test]
    fn disconnect_removes_the_client() {
        let mut server = ControlServer::bind(&loopback(Framing::Chunk)).unwrap();
        let mut driver = RecordingDriver::new();
        let stream = std::net::TcpStream::connect(server.local_addr().unwrap()).unwrap();
        for _ in 0..100 {
            server
                .poll_once(&mut driver, Some(Duration::from_millis(10)))
                .unwrap();
            if server.client_count() == 1 {
                break;
            }
        }
        assert_eq!(server.client_count(), 1);
        drop(stream);
        for _ in 0..100 {
            server
                .poll_once(&mut driver, Some(Duration::from_millis(10)))
                .unwrap();
            if server.client_count() == 0 {
                break;
            }
        }
        assert_eq!(server.client_count(), 0);
    }

    #[test]
    fn delimited_framing_joins_split_commands() {
        let mut server = ControlServer::bind(&loopback(Framing::Delimited)).unwrap();
        let mut driver = RecordingDriver::new();
        let mut stream = std::net::TcpStream::connect(server.local_addr().unwrap()).unwrap();
        stream.write_all(b"rotation|4").unwrap();
        stream.flush().unwrap();
        for _ in 0..20 {
            server
                .poll_once(&mut driver, Some(Duration::from_millis(5)))
                .unwrap();
        }
        assert!(driver.calls().is_empty());
        stream.write_all(b"5;").unwrap();
        pump_until(&mut server, &mut driver, |d| !d.calls().is_empty());
        assert_eq!(driver.calls(), vec![ActuatorCall::Rotation(45)]);
    }

    #[test]
    fn spawned_server_stops_on_request() {
        let server = ControlServer::bind(&loopback(Framing::Chunk)).unwrap();
        let driver = RecordingDriver::new();
        let handle = server.spawn(driver.clone()).unwrap();
        let mut stream = std::net::TcpStream::connect(handle.local_addr()).unwrap();
        stream.write_all(b"rotation|10;").unwrap();
        for _ in 0..200 {
            if !driver.calls().is_empty() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        handle.join().unwrap();
        assert_eq!(driver.calls(), vec![ActuatorCall::Rotation(10)]);
    }
}

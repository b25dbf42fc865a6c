//! [`IrBoxClient`]: connection management and the command API.
//!
//! # How a command travels (for beginners)
//!
//! 1. The command is encoded first, so malformed input fails before any I/O.
//! 2. The link lock is taken.  If no connection is live, one is opened (the
//!    device greets it with `+`, which the handshake entry consumes).
//! 3. A ledger entry is registered and the bytes are written *under the same
//!    lock*, so ledger order always equals wire order.
//! 4. The lock is released and the caller awaits its entry's `oneshot`
//!    receiver for at most the response timeout.  Meanwhile the reader task
//!    resolves entries in FIFO order as lines arrive.
//!
//! Many tasks may share one client behind an `Arc`; each gets exactly the
//! response that belongs to its own command.

use std::fmt;
use std::io;
use std::sync::{Arc, Mutex};

use irbox_core::{Command, Response, SequenceCounter};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::domain::error::is_broken_link;
use crate::domain::{CommandOutcome, ConnectionState, DeviceError};

use super::reader::{run_reader, ReaderCommand};
use super::state::{lock, RxClaim, Shared};
use super::DeviceConfig;

/// Host and port of an IR box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Write side of the current connection.  Guarded by an async mutex that is
/// held from ledger registration until the bytes are on the wire.
#[derive(Debug, Default)]
struct Link {
    writer: Option<OwnedWriteHalf>,
    generation: u64,
    /// The line that greeted this connection.
    greeting: String,
}

/// Withdraws an rx listener entry when its poll ends, whether it finished,
/// timed out, or was cancelled.
struct ListenerGuard<'a> {
    shared: &'a Shared,
    sequence: u16,
}

impl Drop for ListenerGuard<'_> {
    fn drop(&mut self) {
        self.shared.withdraw_listener(self.sequence);
    }
}

/// Client for one IR box.
///
/// # Example
///
/// ```rust,no_run
/// use irbox_client::infrastructure::network::{DeviceConfig, IrBoxClient};
///
/// # async fn demo() -> Result<(), irbox_client::domain::DeviceError> {
/// let client = IrBoxClient::new(DeviceConfig::default());
/// client.connect("192.168.1.50", 333, true).await?;
/// let outcome = client.tx(["0x08", "0x04", "0x10"]).await?;
/// println!("{}", outcome.message());
/// # Ok(())
/// # }
/// ```
pub struct IrBoxClient {
    config: DeviceConfig,
    endpoint: Mutex<Option<Endpoint>>,
    link: tokio::sync::Mutex<Link>,
    shared: Arc<Shared>,
    sequence: SequenceCounter,
    last_response: Mutex<Option<String>>,
    reader_tx: mpsc::UnboundedSender<ReaderCommand>,
    /// Taken when the reader task is spawned on first connect.
    reader_rx: Mutex<Option<mpsc::UnboundedReceiver<ReaderCommand>>>,
}

impl IrBoxClient {
    /// Creates a disconnected client.  No task is spawned until the first
    /// connection opens, so this may be called outside a runtime.
    pub fn new(config: DeviceConfig) -> Self {
        let (reader_tx, reader_rx) = mpsc::unbounded_channel();
        Self {
            config,
            endpoint: Mutex::new(None),
            link: tokio::sync::Mutex::new(Link::default()),
            shared: Arc::new(Shared::new()),
            sequence: SequenceCounter::new(),
            last_response: Mutex::new(None),
            reader_tx,
            reader_rx: Mutex::new(Some(reader_rx)),
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    // ── Connection management ───────────────────────────────────────────────

    /// Records `host:port` and, unless `soft` is set, connects immediately.
    ///
    /// Any existing connection is closed first.  A soft connect opens the
    /// socket lazily on the first command.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Connection`] when the socket cannot be opened
    /// within the connect timeout or the device does not greet with `+`.
    pub async fn connect(
        &self,
        host: impl Into<String>,
        port: u16,
        soft: bool,
    ) -> Result<(), DeviceError> {
        let endpoint = Endpoint {
            host: host.into(),
            port,
        };
        let mut link = self.link.lock().await;
        self.shutdown_locked(&mut link).await;
        *lock(&self.endpoint) = Some(endpoint.clone());

        if soft {
            self.shared.set_soft_connected();
            info!(%endpoint, "soft-connected; the socket opens on the first command");
            return Ok(());
        }
        self.establish_locked(&mut link, &endpoint).await
    }

    /// Closes the socket and fails every pending request with a message
    /// timeout.  The endpoint is kept, so the next command reconnects.
    ///
    /// Safe to call repeatedly.
    pub async fn close(&self) {
        let mut link = self.link.lock().await;
        self.shutdown_locked(&mut link).await;
        self.shared.leave_soft_connected();
    }

    /// Closes and reopens the connection to the recorded endpoint.
    ///
    /// # Errors
    ///
    /// [`DeviceError::NotConfigured`] before any `connect`, otherwise as for
    /// [`IrBoxClient::connect`].
    pub async fn reconnect(&self) -> Result<(), DeviceError> {
        let mut link = self.link.lock().await;
        self.reconnect_locked(&mut link, false).await
    }

    // ── Commands ────────────────────────────────────────────────────────────

    /// Sends `nop`.
    pub async fn nop(&self) -> Result<CommandOutcome, DeviceError> {
        self.send(&Command::Nop).await
    }

    /// Sends `tx(arg1,arg2,...)`.
    ///
    /// # Errors
    ///
    /// [`DeviceError::MalformedArguments`] when the arguments cannot be
    /// framed; nothing is written in that case.
    pub async fn tx<I, S>(&self, args: I) -> Result<CommandOutcome, DeviceError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let command = Command::tx(args)?;
        self.send(&command).await
    }

    /// Sends `rx`, putting the device into receive mode.
    pub async fn rx(&self) -> Result<CommandOutcome, DeviceError> {
        self.send(&Command::Rx).await
    }

    /// Sends `norx`, taking the device out of receive mode.
    pub async fn norx(&self) -> Result<CommandOutcome, DeviceError> {
        self.send(&Command::Norx).await
    }

    /// Sends `invalid`; a healthy device rejects it.
    pub async fn invalid(&self) -> Result<CommandOutcome, DeviceError> {
        self.send(&Command::Invalid).await
    }

    /// Sends arbitrary message text.
    pub async fn send_raw(&self, message: impl Into<String>) -> Result<CommandOutcome, DeviceError> {
        self.send(&Command::raw(message)).await
    }

    /// Sends `command` and waits for its response line.
    ///
    /// Timeouts are reported as [`CommandOutcome::MessageTimeout`] or
    /// [`CommandOutcome::ResponseTimeout`], not as errors.
    ///
    /// The empty command ([`Command::Handshake`] or `send_raw("")`) writes
    /// nothing.  It opens the connection if none is live and answers with
    /// the greeting of the current connection.
    ///
    /// # Errors
    ///
    /// - [`DeviceError::MalformedArguments`] if the text is not one ASCII line.
    /// - [`DeviceError::Connection`] if a lazy (re)connect fails.
    /// - [`DeviceError::Transport`] if a write to a broken socket cannot be
    ///   repeated on a fresh connection.
    pub async fn send(&self, command: &Command) -> Result<CommandOutcome, DeviceError> {
        let bytes = command.encode()?;
        if bytes.is_empty() {
            let outcome = self.probe().await?;
            self.record(outcome.message());
            return Ok(outcome);
        }
        let outcome = match self.dispatch(command, &bytes).await? {
            Some(receiver) => self.await_response(receiver).await,
            None => CommandOutcome::MessageTimeout,
        };
        self.record(outcome.message());
        Ok(outcome)
    }

    /// Returns the next line the device sent while no command was waiting
    /// (an `rx` capture), waiting up to the response timeout for one.
    ///
    /// Returns `None` on timeout or when no connection is open.  Dropping
    /// the future mid-wait withdraws the poll, so it never holds up the
    /// next command's response.
    pub async fn get_rx_message(&self) -> Option<String> {
        let sequence = self.sequence.next();
        let line = match self.shared.claim_rx(sequence) {
            RxClaim::Ready(line) => Ok(line),
            RxClaim::NotConnected => Err(CommandOutcome::MessageTimeout),
            RxClaim::Waiting(receiver) => {
                let _listener = ListenerGuard {
                    shared: &self.shared,
                    sequence,
                };
                match timeout(self.config.response_timeout, receiver).await {
                    Ok(Ok(line)) => Ok(line),
                    Ok(Err(_)) => Err(CommandOutcome::MessageTimeout),
                    Err(_) => Err(CommandOutcome::ResponseTimeout),
                }
            }
        };
        match line {
            Ok(line) => {
                debug!(sequence, "Received({sequence}): {line}");
                self.record(&line);
                Some(line)
            }
            Err(outcome) => {
                self.record(outcome.message());
                None
            }
        }
    }

    // ── Diagnostics ─────────────────────────────────────────────────────────

    /// Text of the most recent response, or the timeout message.
    pub fn last_response(&self) -> Option<String> {
        lock(&self.last_response).clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// The recorded endpoint, if `connect` was ever called.
    pub fn endpoint(&self) -> Option<Endpoint> {
        lock(&self.endpoint).clone()
    }

    /// Number of ledger entries still waiting for a line.  Includes entries
    /// whose callers already gave up.
    pub fn pending_requests(&self) -> usize {
        self.shared.pending_requests()
    }

    /// How many late responses resolved an abandoned entry.
    pub fn stale_responses(&self) -> u64 {
        self.shared.stale_responses()
    }

    // ── Internals ───────────────────────────────────────────────────────────

    /// Answers the empty command without registering a ledger entry: no
    /// line is owed for bytes that were never written.
    async fn probe(&self) -> Result<CommandOutcome, DeviceError> {
        let mut link = self.link.lock().await;
        if !self.shared.is_live(link.generation) {
            self.reconnect_locked(&mut link, self.config.retry_connect)
                .await?;
        }
        debug!(generation = link.generation, "Message: <handshake>");
        Ok(CommandOutcome::from_response(Response::from(
            link.greeting.clone(),
        )))
    }

    /// Registers a ledger entry and writes the command, reconnecting as
    /// needed.  Returns `None` when the connection vanished before the entry
    /// could be registered.
    async fn dispatch(
        &self,
        command: &Command,
        bytes: &[u8],
    ) -> Result<Option<oneshot::Receiver<String>>, DeviceError> {
        let mut link = self.link.lock().await;
        if !self.shared.is_live(link.generation) {
            self.reconnect_locked(&mut link, self.config.retry_connect)
                .await?;
        }

        let sequence = self.sequence.next();
        let Some(receiver) = self.shared.register(link.generation, sequence) else {
            return Ok(None);
        };
        debug!(sequence, "Message({sequence}): {command}");

        match self.write_locked(&mut link, bytes).await {
            Ok(()) => Ok(Some(receiver)),
            Err(e) if is_broken_link(&e) => {
                warn!(sequence, "write failed ({e}); reconnecting once");
                if let Err(reconnect) = self.reconnect_locked(&mut link, false).await {
                    warn!(sequence, "reconnect failed: {reconnect}");
                    return Err(DeviceError::Transport(e));
                }
                let Some(receiver) = self.shared.register(link.generation, sequence) else {
                    return Ok(None);
                };
                if let Err(e) = self.write_locked(&mut link, bytes).await {
                    self.shutdown_locked(&mut link).await;
                    return Err(DeviceError::Transport(e));
                }
                Ok(Some(receiver))
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                // A partial line may be on the wire; the stream is unusable.
                warn!(sequence, "write timed out; closing connection");
                self.shutdown_locked(&mut link).await;
                Ok(Some(receiver))
            }
            Err(e) => {
                self.shutdown_locked(&mut link).await;
                Err(DeviceError::Transport(e))
            }
        }
    }

    async fn await_response(&self, receiver: oneshot::Receiver<String>) -> CommandOutcome {
        match timeout(self.config.response_timeout, receiver).await {
            Ok(Ok(line)) => CommandOutcome::from_response(Response::from(line)),
            Ok(Err(_)) => {
                debug!("Message timeout");
                CommandOutcome::MessageTimeout
            }
            Err(_) => {
                debug!("Response timeout");
                CommandOutcome::ResponseTimeout
            }
        }
    }

    fn record(&self, message: &str) {
        *lock(&self.last_response) = Some(message.to_string());
    }

    async fn write_locked(&self, link: &mut Link, bytes: &[u8]) -> io::Result<()> {
        let writer = link
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?;
        match timeout(self.config.write_timeout, writer.write_all(bytes)).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "write timed out")),
        }
    }

    async fn reconnect_locked(&self, link: &mut Link, retry: bool) -> Result<(), DeviceError> {
        self.shutdown_locked(link).await;
        let endpoint = self.endpoint().ok_or(DeviceError::NotConfigured)?;
        match self.establish_locked(link, &endpoint).await {
            Err(e) if retry => {
                warn!(%endpoint, "connect failed ({e}); retrying once");
                self.establish_locked(link, &endpoint).await
            }
            result => result,
        }
    }

    /// Opens a socket, hands its read half to the reader task, and waits for
    /// the device's `+` greeting.
    async fn establish_locked(&self, link: &mut Link, endpoint: &Endpoint) -> Result<(), DeviceError> {
        info!(%endpoint, "connecting to IR box");
        let connecting = TcpStream::connect((endpoint.host.as_str(), endpoint.port));
        let stream = match timeout(self.config.connect_timeout, connecting).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                warn!(%endpoint, "connect failed: {e}");
                return Err(DeviceError::from_connect_io(e));
            }
            Err(_) => {
                warn!(%endpoint, "connect timed out");
                return Err(DeviceError::timeout());
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            debug!("could not set TCP_NODELAY: {e}");
        }

        let (read_half, write_half) = stream.into_split();
        let generation = self.shared.open_generation();
        let sequence = self.sequence.next();
        let greeting = self
            .shared
            .register(generation, sequence)
            .ok_or_else(|| DeviceError::handshake("Connection closed during handshake"))?;
        self.attach_reader(generation, read_half);
        link.writer = Some(write_half);
        link.generation = generation;
        debug!(sequence, "Message({sequence}): <handshake>");

        let failure = match timeout(self.config.response_timeout, greeting).await {
            Ok(Ok(line)) if Response::new(line.as_str()).is_success() => {
                info!(%endpoint, generation, "connected");
                link.greeting = line;
                return Ok(());
            }
            Ok(Ok(line)) => DeviceError::handshake(format!("unexpected greeting: {line}")),
            Ok(Err(_)) => DeviceError::handshake("Connection closed during handshake"),
            Err(_) => DeviceError::timeout(),
        };
        warn!(%endpoint, "handshake failed: {failure}");
        self.shutdown_locked(link).await;
        Err(failure)
    }

    fn attach_reader(&self, generation: u64, half: OwnedReadHalf) {
        if let Some(commands) = lock(&self.reader_rx).take() {
            tokio::spawn(run_reader(Arc::clone(&self.shared), commands));
        }
        if self
            .reader_tx
            .send(ReaderCommand::Attach { generation, half })
            .is_err()
        {
            warn!(generation, "reader task is gone; closing connection");
            self.shared.close_generation(generation);
        }
    }

    /// Closes the current connection, if any.  Pending entries are dropped.
    async fn shutdown_locked(&self, link: &mut Link) {
        if let Some(mut writer) = link.writer.take() {
            if let Err(e) = writer.shutdown().await {
                debug!("shutdown of write half failed: {e}");
            }
            // The reader may already have exited; nothing to detach then.
            let _ = self.reader_tx.send(ReaderCommand::Detach);
        }
        if let Some(dropped) = self.shared.close_generation(link.generation) {
            info!(generation = link.generation, dropped, "connection closed");
        }
    }
}

impl fmt::Debug for IrBoxClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IrBoxClient")
            .field("endpoint", &self.endpoint())
            .field("state", &self.state())
            .field("pending_requests", &self.pending_requests())
            .finish()
    }
}

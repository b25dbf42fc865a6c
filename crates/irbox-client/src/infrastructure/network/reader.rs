//! Background task that reads response lines from the device.
//!
//! One reader task lives for the lifetime of an
//! [`IrBoxClient`](super::IrBoxClient).  The client hands it the read half of
//! every new socket over an `mpsc` channel; the task splits incoming bytes
//! into lines and routes each line through [`Shared::deliver`].  A line too
//! long to buffer is replaced with [`OVERSIZED_LINE`].
//!
//! When the device closes the socket (read returns `0`) or a read fails, the
//! task closes that generation, which fails every pending request, and waits
//! for the next read half.  The task ends when the client is dropped.

use std::io;
use std::sync::Arc;

use irbox_core::LineDecoder;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::state::Shared;

const READ_CHUNK: usize = 1024;

/// Delivered in place of a line too long to buffer.  It still resolves one
/// ledger entry, so the responses after it stay with their own callers.
const OVERSIZED_LINE: &str = "-response too long";

/// Instructions from the client to its reader task.
#[derive(Debug)]
pub(crate) enum ReaderCommand {
    /// Start reading from a new connection.
    Attach { generation: u64, half: OwnedReadHalf },
    /// Stop reading; the connection was closed locally.
    Detach,
}

enum Event {
    Command(Option<ReaderCommand>),
    Read(io::Result<usize>),
}

/// Runs until the command channel closes.
pub(crate) async fn run_reader(
    shared: Arc<Shared>,
    mut commands: mpsc::UnboundedReceiver<ReaderCommand>,
) {
    let mut decoder = LineDecoder::new();
    let mut buf = vec![0u8; READ_CHUNK];
    let mut current: Option<(u64, OwnedReadHalf)> = None;

    loop {
        let (generation, half) = match current.as_mut() {
            Some((generation, half)) => (*generation, half),
            None => {
                match commands.recv().await {
                    Some(command) => current = apply(command, &mut decoder),
                    None => break,
                }
                continue;
            }
        };

        let event = tokio::select! {
            biased;
            command = commands.recv() => Event::Command(command),
            read = half.read(&mut buf) => Event::Read(read),
        };

        match event {
            Event::Command(Some(command)) => current = apply(command, &mut decoder),
            Event::Command(None) => break,
            Event::Read(Ok(0)) => {
                if let Some(dropped) = shared.close_generation(generation) {
                    info!(generation, dropped, "device closed the connection");
                }
                current = None;
            }
            Event::Read(Ok(n)) => {
                decoder.feed(&buf[..n]);
                drain_lines(&shared, generation, &mut decoder);
            }
            Event::Read(Err(e)) => {
                if is_teardown(&e) {
                    debug!(generation, "read ended: {e}");
                } else {
                    error!(generation, "read from device failed: {e}");
                }
                if let Some(dropped) = shared.close_generation(generation) {
                    info!(generation, dropped, "connection closed after read error");
                }
                current = None;
            }
        }
    }

    debug!("reader task stopped");
}

fn apply(command: ReaderCommand, decoder: &mut LineDecoder) -> Option<(u64, OwnedReadHalf)> {
    decoder.clear();
    match command {
        ReaderCommand::Attach { generation, half } => {
            debug!(generation, "reader attached");
            Some((generation, half))
        }
        ReaderCommand::Detach => None,
    }
}

fn drain_lines(shared: &Shared, generation: u64, decoder: &mut LineDecoder) {
    loop {
        match decoder.next_line() {
            Ok(Some(line)) => shared.deliver(generation, line),
            Ok(None) => break,
            Err(e) => {
                warn!(generation, "discarding oversized response: {e}");
                shared.deliver(generation, OVERSIZED_LINE.to_string());
            }
        }
    }
}

/// Errors that just mean the socket was torn down underneath us.
fn is_teardown(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
    )
}

//! Output channel abstraction.
//!
//! The application writes a finished response through this trait: the
//! serialized head once, then body chunks until the stream runs dry or the
//! channel reports the downstream connection severed.

use crate::protocol::SendError;
use std::io::Write;

/// Where a response goes. Implementations track whether the head went out
/// and whether the downstream connection is still open.
pub trait OutputChannel {
    /// True once the status line and header block have been transmitted.
    /// The application never sends the head twice.
    fn headers_sent(&self) -> bool;

    /// Transmits the serialized status line and header block.
    fn send_head(&mut self, head: &[u8]) -> Result<(), SendError>;

    /// Transmits one body chunk.
    fn send_chunk(&mut self, chunk: &[u8]) -> Result<(), SendError>;

    /// Whether the downstream connection is still open. The application
    /// stops copying body chunks as soon as this turns false.
    fn is_connected(&self) -> bool;
}

/// An output channel over any [`Write`] target. A write failure marks the
/// connection severed; later sends fail fast with
/// [`SendError::ConnectionClosed`].
#[derive(Debug)]
pub struct WriteChannel<W: Write> {
    inner: W,
    headers_sent: bool,
    connected: bool,
}

impl<W: Write> WriteChannel<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, headers_sent: false, connected: true }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), SendError> {
        if !self.connected {
            return Err(SendError::ConnectionClosed);
        }

        if let Err(cause) = self.inner.write_all(bytes).and_then(|()| self.inner.flush()) {
            self.connected = false;
            return Err(SendError::io(cause));
        }

        Ok(())
    }
}

impl<W: Write> OutputChannel for WriteChannel<W> {
    fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    fn send_head(&mut self, head: &[u8]) -> Result<(), SendError> {
        self.send(head)?;
        self.headers_sent = true;
        Ok(())
    }

    fn send_chunk(&mut self, chunk: &[u8]) -> Result<(), SendError> {
        self.send(chunk)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

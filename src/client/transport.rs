//! The seam between the engine and whatever owns the socket.
//!
//! The engine only ever needs to hand finished lines to someone. Framing, flood control and the
//! connection life-cycle belong to the owner of the other end of a [`Transport`].
use std::sync::Arc;

use futures_util::stream::{Stream, StreamExt};
use parking_lot::RwLock;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::error::{Error, Result};
use crate::proto::{Command, Event};

/// Something outbound lines can be written to. Sends are fire-and-forget.
pub trait Transport {
    /// Queues a command for sending.
    fn send(&self, command: Command) -> Result<()>;
}

impl Transport for UnboundedSender<String> {
    fn send(&self, command: Command) -> Result<()> {
        UnboundedSender::send(self, command.to_string()).map_err(|e| Error::Transport { line: e.0 })
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, command: Command) -> Result<()> {
        (**self).send(command)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, command: Command) -> Result<()> {
        (**self).send(command)
    }
}

/// A view of the lines sent through a particular `Logged` transport.
#[derive(Clone, Debug, Default)]
pub struct LogView {
    sent: Arc<RwLock<Vec<String>>>,
}

impl LogView {
    /// Gets a copy of every line sent so far.
    pub fn sent(&self) -> Vec<String> {
        self.sent.read().clone()
    }

    /// Takes the lines sent so far, leaving the log empty.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.sent.write())
    }
}

/// A transport that traces and records every line before passing it on.
#[derive(Debug)]
pub struct Logged<T> {
    inner: T,
    view: LogView,
}

impl<T: Transport> Logged<T> {
    /// Wraps the given transport in logging.
    pub fn wrap(inner: T) -> Logged<T> {
        Logged {
            inner,
            view: LogView::default(),
        }
    }

    /// Gets a view of the logging for this transport.
    pub fn view(&self) -> LogView {
        self.view.clone()
    }

    /// Gets the wrapped transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: Transport> Transport for Logged<T> {
    fn send(&self, command: Command) -> Result<()> {
        let line = command.to_string();
        trace!("[SENT] {}", line);
        self.inner.send(command)?;
        self.view.sent.write().push(line);
        Ok(())
    }
}

/// Turns raw lines from the connection owner into events. Lines that do not parse are logged and
/// skipped.
pub fn event_stream(lines: UnboundedReceiver<String>) -> impl Stream<Item = Event> {
    UnboundedReceiverStream::new(lines).filter_map(|line| async move {
        trace!("[RECV] {}", line);
        match Event::parse(&line) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!("dropping unparsable line {:?}: {}", line, e);
                None
            }
        }
    })
}

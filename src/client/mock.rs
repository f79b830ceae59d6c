//! A fake transport and event source for testing code built on the engine.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::stream::{self, Stream};
use parking_lot::Mutex;

use crate::client::transport::Transport;
use crate::error::{Error, Result};
use crate::proto::{Command, Event};

/// A transport that accepts every line, until it is closed.
#[derive(Clone, Debug, Default)]
pub struct MockTransport {
    written: Arc<Mutex<Vec<Command>>>,
    closed: Arc<AtomicBool>,
}

impl MockTransport {
    /// Creates an open transport.
    pub fn new() -> MockTransport {
        MockTransport::default()
    }

    /// Gets the commands written so far.
    pub fn written(&self) -> Vec<Command> {
        self.written.lock().clone()
    }

    /// Makes every further send fail, as if the connection owner hung up.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl Transport for MockTransport {
    fn send(&self, command: Command) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Transport {
                line: command.to_string(),
            });
        }
        self.written.lock().push(command);
        Ok(())
    }
}

/// Creates a finite stream of events from raw lines, skipping any that do not parse.
pub fn events(lines: &[&str]) -> impl Stream<Item = Event> + Unpin {
    let parsed: Vec<Event> = lines.iter().filter_map(|l| Event::parse(l).ok()).collect();
    stream::iter(parsed)
}

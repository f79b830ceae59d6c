//! The client side of the engine.
//!
//! A [`Client`](struct.Client.html) owns everything the engine knows about a connection: the
//! configuration, the server's advertised capabilities, channel membership and any SASL
//! handshake in progress. The connection owner feeds it [`Event`](../proto/struct.Event.html)s
//! and gives it a [`Transport`](transport/trait.Transport.html) to write to.
//!
//! # Examples
//!
//! Events can be handed over one at a time.
//!
//! ```
//! # extern crate irc_engine;
//! use irc_engine::client::mock::MockTransport;
//! use irc_engine::client::prelude::*;
//!
//! # fn main() -> irc_engine::error::Result<()> {
//! let config = Config {
//!     nickname: Some("athena".to_owned()),
//!     ..Config::default()
//! };
//! let mut client = Client::new(config, MockTransport::new())?;
//! client.handle_event(&Event::parse("PING :irc.example.com")?)?;
//! assert_eq!(client.log_view().sent(), vec!["PONG :irc.example.com"]);
//! # Ok(())
//! # }
//! ```
//!
//! Or the client can drive a whole stream, which also enforces the SASL deadline.
//!
//! ```no_run
//! # extern crate irc_engine;
//! use irc_engine::client::prelude::*;
//! use tokio::sync::mpsc::unbounded_channel;
//!
//! # async fn run() -> irc_engine::error::Result<()> {
//! let (outbound, _lines_to_write) = unbounded_channel::<String>();
//! let (_lines_read, inbound) = unbounded_channel::<String>();
//! let mut client = Client::new(Config::load("config.toml")?, outbound)?;
//! client.identify()?;
//! client.run(event_stream(inbound)).await
//! # }
//! # fn main() {}
//! ```
use std::collections::{BTreeMap, HashMap};

use futures_util::stream::{Stream, StreamExt};
use tokio::time::Instant;

use crate::client::data::{CapabilityRegistry, Config};
use crate::client::plugins::{OwnerPermissions, PluginRegistry, Plugins};
use crate::client::router::Router;
use crate::client::sasl::SaslSession;
use crate::client::state::MembershipStore;
use crate::client::transport::{LogView, Logged, Transport};
use crate::error::{Error, Result};
use crate::proto::{CapSubCommand, Command, Event};

pub mod data;
pub mod mock;
pub mod plugins;
pub mod prelude;
pub mod router;
pub mod sasl;
pub mod state;
pub mod transport;

/// What the client knows about the server it is talking to.
#[derive(Clone, Debug, Default)]
pub struct ServerState {
    /// The client's current nickname.
    pub nickname: String,
    /// The server's ISUPPORT advertisement.
    pub registry: CapabilityRegistry,
    /// Capabilities offered in `CAP LS`, with their values.
    pub offered: BTreeMap<String, Option<String>>,
}

/// The protocol engine for one connection.
pub struct Client<T: Transport> {
    config: Config,
    transport: Logged<T>,
    server: ServerState,
    store: MembershipStore,
    sasl: Option<SaslSession>,
    plugins: Box<dyn Plugins + Send + Sync>,
    router: Router<T>,
    /// Nicks we sent a WHO for after their JOIN, and the channel they joined.
    pending_who: HashMap<String, String>,
}

impl<T: Transport> Client<T> {
    /// Creates a client with no commands or hooks.
    pub fn new(config: Config, transport: T) -> Result<Client<T>> {
        Client::with_plugins(config, transport, PluginRegistry::new(OwnerPermissions))
    }

    /// Creates a client that hands messages to the given plugins.
    pub fn with_plugins<P>(config: Config, transport: T, plugins: P) -> Result<Client<T>>
    where
        P: Plugins + Send + Sync + 'static,
    {
        let nickname = config.nickname()?.to_owned();
        Ok(Client {
            config,
            transport: Logged::wrap(transport),
            server: ServerState {
                nickname,
                ..ServerState::default()
            },
            store: MembershipStore::new(),
            sasl: None,
            plugins: Box::new(plugins),
            router: Router::new(),
            pending_who: HashMap::new(),
        })
    }

    /// Starts registration: `CAP LS 302`, `NICK` and `USER`.
    pub fn identify(&self) -> Result<()> {
        self.send(Command::CAP(CapSubCommand::LS, Some("302".to_owned())))?;
        self.send(Command::NICK(self.server.nickname.clone()))?;
        self.send(Command::USER(
            self.config.username().to_owned(),
            self.config.real_name().to_owned(),
        ))
    }

    /// Sends a command through the transport.
    pub fn send(&self, command: Command) -> Result<()> {
        self.transport.send(command)
    }

    /// Handles one event. Only fatal errors are returned; everything else is logged and, when an
    /// admin channel is configured, reported there.
    pub fn handle_event(&mut self, event: &Event) -> Result<()> {
        let handler = match self.router.get(&event.verb) {
            Some(handler) => handler,
            None => {
                trace!("no handler for {}", event.verb);
                return Ok(());
            }
        };
        let result = handler(self, event);
        self.drop_finished_sasl();
        match result {
            Ok(()) => Ok(()),
            Err(e) => self.recover(&event.verb, e),
        }
    }

    /// Aborts a SASL handshake whose deadline has passed.
    pub fn check_sasl_timeout(&mut self, now: Instant) -> Result<()> {
        let result = match self.sasl {
            Some(ref mut session) => session.check_deadline(now, &self.transport),
            None => Ok(()),
        };
        self.drop_finished_sasl();
        result
    }

    /// Handles events until the stream ends or a fatal error occurs.
    pub async fn run<S>(&mut self, events: S) -> Result<()>
    where
        S: Stream<Item = Event>,
    {
        futures_util::pin_mut!(events);
        loop {
            let next = match self.sasl.as_ref().and_then(SaslSession::deadline) {
                Some(deadline) => tokio::select! {
                    event = events.next() => event,
                    _ = tokio::time::sleep_until(deadline) => {
                        self.check_sasl_timeout(Instant::now())?;
                        continue;
                    }
                },
                None => events.next().await,
            };
            match next {
                Some(event) => self.handle_event(&event)?,
                None => return Ok(()),
            }
        }
    }

    /// Gets the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Gets the client's current nickname.
    pub fn current_nickname(&self) -> &str {
        &self.server.nickname
    }

    /// Gets what is known about the server.
    pub fn server(&self) -> &ServerState {
        &self.server
    }

    /// Gets the membership store.
    pub fn store(&self) -> &MembershipStore {
        &self.store
    }

    /// Gets the SASL handshake in progress, if any.
    pub fn sasl(&self) -> Option<&SaslSession> {
        self.sasl.as_ref()
    }

    /// Gets a view of every line sent so far.
    pub fn log_view(&self) -> LogView {
        self.transport.view()
    }

    /// Gets the wrapped transport.
    pub fn transport(&self) -> &T {
        self.transport.inner()
    }

    fn is_me(&self, nick: &str) -> bool {
        nick.eq_ignore_ascii_case(&self.server.nickname)
    }

    fn drop_finished_sasl(&mut self) {
        if self.sasl.as_ref().map_or(false, SaslSession::is_terminal) {
            self.sasl = None;
        }
    }

    /// Passes fatal errors on; logs and reports the rest.
    fn recover(&self, verb: &str, err: Error) -> Result<()> {
        if err.is_fatal() {
            error!("{} failed: {}", verb, err);
            return Err(err);
        }
        match err {
            Error::State(ref e) => {
                debug!("{}: {}", verb, e);
                return Ok(());
            }
            Error::PermissionDenied { .. } => {
                info!("{}", err);
                return Ok(());
            }
            _ => error!("{} handler failed: {}", verb, err),
        }
        match self.config.admin_channel() {
            Some(admin) => self.send(Command::PRIVMSG(
                admin.to_owned(),
                format!("Error handling {}: {}", verb, err),
            )),
            None => Ok(()),
        }
    }
}

//! The protocol engine of an IRC client.
//!
//! The engine negotiates capabilities and SASL authentication, keeps a model of what the server
//! supports (ISUPPORT) and of who is in which channel, and routes inbound events to their
//! handlers. It does not own a socket: lines come in as [`Event`](proto/event/struct.Event.html)s
//! and go out through a [`Transport`](client/transport/trait.Transport.html).
//!
//! # Example
//!
//! ```no_run
//! # extern crate irc_engine;
//! use irc_engine::client::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> irc_engine::error::Result<()> {
//! let config = Config::load("config.toml")?;
//! let (tx, _rx) = tokio::sync::mpsc::unbounded_channel::<String>();
//! let (_lines, events) = tokio::sync::mpsc::unbounded_channel::<String>();
//!
//! let mut client = Client::new(config, tx)?;
//! client.identify()?;
//! client.run(event_stream(events)).await
//! # }
//! ```

#![warn(missing_docs)]

#[macro_use]
extern crate log;

pub extern crate irc_proto as proto;

pub mod client;
pub mod error;

#[cfg(feature = "ctcp")]
const VERSION_STR: &str = concat!(
    env!("CARGO_PKG_NAME"),
    ":",
    env!("CARGO_PKG_VERSION"),
    ":Compiled with rustc",
);

//! Protocol primitives consumed and produced by the `irc-engine` client core.

#![warn(missing_docs)]

pub mod caps;
pub mod chan;
pub mod colors;
pub mod command;
pub mod error;
pub mod event;
pub mod message;
pub mod prefix;
pub mod response;

pub use self::caps::Capability;
pub use self::chan::ChannelExt;
pub use self::colors::FormattedStringExt;
pub use self::command::{CapSubCommand, Command};
pub use self::event::{Event, Source};
pub use self::message::{Message, Tag};
pub use self::prefix::Prefix;
pub use self::response::Response;

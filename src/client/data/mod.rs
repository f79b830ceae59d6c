//! Data related to IRC functionality.

pub use crate::client::data::channel::Channel;
pub use crate::client::data::config::{ChannelConfig, Config, SaslConfig};
pub use crate::client::data::isupport::{
    CapabilityRegistry, IsupportValue, PrefixLevel, PrefixMode, PrefixTable,
};
pub use crate::client::data::user::{SeenEntry, User, UserAttr};

pub mod channel;
pub mod config;
pub mod isupport;
pub mod user;

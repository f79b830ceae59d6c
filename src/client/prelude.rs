//! A client-side prelude, re-exporting what most users of the engine need.
//!
//! # Structure
//! A [`Client`] is created from a [`Config`] and a [`Transport`], the owner of the actual
//! connection. Raw lines from the connection become [`Event`]s, either one at a time with
//! `Event::parse` or as a whole stream with [`event_stream`], and outbound traffic is made of
//! [`Command`]s. Commands and message hooks are supplied up front through a [`PluginRegistry`].

pub use crate::{
    client::{
        data::{CapabilityRegistry, Channel, Config, PrefixTable, SaslConfig, User},
        plugins::{
            CommandContext, CommandDescriptor, OwnerPermissions, Permissions, PluginRegistry,
            Plugins,
        },
        sasl::{SaslMechanism, SaslSession, SaslState},
        state::MembershipStore,
        transport::{event_stream, Transport},
        Client,
    },
    proto::{Capability, ChannelExt, Command, Event, FormattedStringExt, Source},
};

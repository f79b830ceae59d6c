//! Errors for the `irc-engine` crate using `thiserror`.

use std::io::Error as IoError;

use thiserror::Error;

use crate::proto::error::ProtocolError;

/// A specialized `Result` type for the engine.
pub type Result<T, E = Error> = ::std::result::Result<T, E>;

/// The main crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration asks for something the server or the engine cannot do, such as an
    /// unsupported SASL mechanism. Fatal.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// SASL authentication gave up. Fatal.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// An operation referenced a channel or user the engine does not know.
    #[error("state inconsistency")]
    State(#[source] StateError),

    /// A line or token could not be parsed.
    #[error("protocol error")]
    Protocol(#[source] ProtocolError),

    /// A user tried to run a command they are not allowed to.
    #[error("permission denied: {} may not use {}", hostmask, command)]
    PermissionDenied {
        /// The hostmask of the caller.
        hostmask: String,
        /// The command that was refused.
        command: String,
    },

    /// The configuration file could not be loaded.
    #[error("invalid config: {}", path)]
    InvalidConfig {
        /// The path of the offending file.
        path: String,
        /// The detailed configuration error.
        #[source]
        cause: ConfigError,
    },

    /// An internal I/O error.
    #[error("an io error occurred")]
    Io(#[source] IoError),

    /// The transport refused a line, typically because the connection owner hung up.
    #[error("transport closed: could not send {:?}", line)]
    Transport {
        /// The line that was not sent.
        line: String,
    },
}

impl Error {
    /// Whether this error must unwind to the connection owner rather than being reported and
    /// swallowed by the router.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_) | Error::Authentication(_) | Error::Transport { .. }
        )
    }
}

impl From<IoError> for Error {
    fn from(e: IoError) -> Error {
        Error::Io(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Error {
        Error::Protocol(e)
    }
}

impl From<StateError> for Error {
    fn from(e: StateError) -> Error {
        Error::State(e)
    }
}

/// Lookups in the membership store that did not find their subject.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    /// The channel is not tracked, so the client has not joined it.
    #[error("unknown channel {}", channel)]
    UnknownChannel {
        /// The channel name.
        channel: String,
    },

    /// No user in the channel matches.
    #[error("no user matching {} in {}", mask, channel)]
    UnknownUser {
        /// The channel that was searched.
        channel: String,
        /// The nick or hostmask that was looked for.
        mask: String,
    },
}

/// Errors that occur with configurations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse as TOML.
    #[cfg(feature = "toml_config")]
    #[error("invalid toml")]
    InvalidToml(#[source] toml::de::Error),

    /// Failed to parse as JSON.
    #[cfg(feature = "json_config")]
    #[error("invalid json")]
    InvalidJson(#[source] serde_json::Error),

    /// The format is known but was compiled out.
    #[error("config format {} disabled", format)]
    ConfigFormatDisabled {
        /// The disabled file format.
        format: &'static str,
    },

    /// The file extension is not a known format.
    #[error("config format {} not supported", format)]
    UnknownConfigFormat {
        /// The unknown file extension.
        format: String,
    },

    /// The file has no extension to pick a format from.
    #[error("missing format extension")]
    MissingExtension,

    /// A required field is missing.
    #[error("{} was not specified", field)]
    MissingField {
        /// The field name.
        field: &'static str,
    },
}

#[cfg(test)]
mod test {
    use super::{Error, StateError};

    #[test]
    fn fatal_kinds() {
        assert!(Error::Configuration("x".into()).is_fatal());
        assert!(Error::Authentication("x".into()).is_fatal());
        assert!(!Error::State(StateError::UnknownChannel {
            channel: "#a".into()
        })
        .is_fatal());
        assert!(!Error::PermissionDenied {
            hostmask: "a!b@c".into(),
            command: "kick".into()
        }
        .is_fatal());
    }
}

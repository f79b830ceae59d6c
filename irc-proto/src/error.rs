//! IRC protocol errors using `thiserror`.

use thiserror::Error;

/// A `Result` type for IRC `ProtocolErrors`.
pub type Result<T, E = ProtocolError> = ::std::result::Result<T, E>;

/// An IRC protocol error.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Error for invalid messages.
    #[error("invalid message: {}", string)]
    InvalidMessage {
        /// The string that failed to parse.
        string: String,
        /// The detailed message parsing error.
        #[source]
        cause: MessageParseError,
    },

    /// Error for an ISUPPORT token that could not be understood.
    #[error("invalid ISUPPORT token: {}", token)]
    InvalidFeature {
        /// The token that was skipped.
        token: String,
        /// The detailed token parsing error.
        #[source]
        cause: FeatureParseError,
    },
}

/// Errors that occur when parsing messages.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageParseError {
    /// The message was empty.
    #[error("empty message")]
    EmptyMessage,

    /// The command was invalid (i.e. missing).
    #[error("invalid command")]
    InvalidCommand,
}

/// Errors that occur while parsing a single ISUPPORT token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeatureParseError {
    /// The token had no name before `=`.
    #[error("missing feature name")]
    MissingName,

    /// `PREFIX` did not have the `(modes)symbols` form.
    #[error("malformed PREFIX value")]
    MalformedPrefix,

    /// `PREFIX` listed a different number of modes and symbols.
    #[error("PREFIX lists {} modes but {} symbols", modes, symbols)]
    PrefixLengthMismatch {
        /// Number of mode letters.
        modes: usize,
        /// Number of prefix symbols.
        symbols: usize,
    },

    /// `PREFIX` had no operator group.
    #[error("PREFIX has no operator mode")]
    MissingOpMode,

    /// A mode letter or symbol appeared twice in `PREFIX`.
    #[error("PREFIX repeats {:?}", character)]
    DuplicatePrefix {
        /// The repeated character.
        character: char,
    },
}

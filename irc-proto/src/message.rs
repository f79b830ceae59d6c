//! A module providing a data structure for raw lines received from IRC servers.
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::error::{MessageParseError, ProtocolError};
use crate::prefix::Prefix;

/// A raw IRC line split into its tags, prefix, command and parameters.
///
/// No command-specific interpretation happens here; the trailing parameter (after ` :`) is simply
/// the last element of `args`. See [`Event`](../event/struct.Event.html) for the routed form.
#[derive(Clone, PartialEq, Debug)]
pub struct Message {
    /// Message tags as defined by [IRCv3.2](https://ircv3.net/specs/extensions/message-tags).
    pub tags: Option<Vec<Tag>>,
    /// The message prefix (or source) as defined by [RFC 2812](http://tools.ietf.org/html/rfc2812).
    pub prefix: Option<Prefix>,
    /// The command or three-digit numeric, exactly as received.
    pub command: String,
    /// The command parameters, trailing parameter included.
    pub args: Vec<String>,
}

/// A message tag. It consists of a tag key, and an optional, already unescaped value.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Tag(pub String, pub Option<String>);

impl Message {
    /// Gets the value of a tag, if the message carries it with a value.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .as_ref()?
            .iter()
            .find(|Tag(k, _)| k == key)
            .and_then(|Tag(_, v)| v.as_deref())
    }

    /// Gets the nickname of the message source, if it exists.
    pub fn source_nickname(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nickname)
    }
}

fn unescape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn invalid(s: &str, cause: MessageParseError) -> ProtocolError {
    ProtocolError::InvalidMessage {
        string: s.to_owned(),
        cause,
    }
}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Message, Self::Err> {
        let mut state = s.trim_end_matches(|c| c == '\r' || c == '\n');
        if state.trim().is_empty() {
            return Err(invalid(s, MessageParseError::EmptyMessage));
        }

        let tags = if let Some(rest) = state.strip_prefix('@') {
            let (raw, rest) = rest.split_once(' ').unwrap_or((rest, ""));
            state = rest.trim_start_matches(' ');
            Some(
                raw.split(';')
                    .filter(|t| !t.is_empty())
                    .map(|t| match t.split_once('=') {
                        Some((k, v)) => Tag(k.to_owned(), Some(unescape_tag_value(v))),
                        None => Tag(t.to_owned(), None),
                    })
                    .collect(),
            )
        } else {
            None
        };

        let prefix = if let Some(rest) = state.strip_prefix(':') {
            let (raw, rest) = rest.split_once(' ').unwrap_or((rest, ""));
            state = rest.trim_start_matches(' ');
            Some(Prefix::new_from_str(raw))
        } else {
            None
        };

        let (middle, trailing) = match state.find(" :") {
            Some(i) => (&state[..i], Some(&state[i + 2..])),
            None => (state, None),
        };
        let mut words = middle.split(' ').filter(|w| !w.is_empty());
        let command = match words.next() {
            Some(cmd) if !cmd.starts_with(':') => cmd.to_owned(),
            _ => return Err(invalid(s, MessageParseError::InvalidCommand)),
        };
        let mut args: Vec<String> = words.map(str::to_owned).collect();
        if let Some(trailing) = trailing {
            args.push(trailing.to_owned());
        }

        Ok(Message {
            tags,
            prefix,
            command,
            args,
        })
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        if let Some(tags) = &self.tags {
            f.write_str("@")?;
            for (i, Tag(key, value)) in tags.iter().enumerate() {
                if i > 0 {
                    f.write_str(";")?;
                }
                f.write_str(key)?;
                if let Some(value) = value {
                    write!(f, "={}", value)?;
                }
            }
            f.write_str(" ")?;
        }
        if let Some(prefix) = &self.prefix {
            write!(f, ":{} ", prefix)?;
        }
        f.write_str(&self.command)?;
        if let Some((last, init)) = self.args.split_last() {
            for arg in init {
                write!(f, " {}", arg)?;
            }
            if last.is_empty() || last.contains(' ') || last.starts_with(':') {
                write!(f, " :{}", last)?;
            } else {
                write!(f, " {}", last)?;
            }
        }
        Ok(())
    }
}

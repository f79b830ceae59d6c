//! The canonical, routed form of an inbound line.
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::ProtocolError;
use crate::message::{Message, Tag};
use crate::prefix::Prefix;
use crate::response::Response;

/// The origin of an event. For server-originated lines only `nick` is set, to the server name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Source {
    /// Nickname (or server name).
    pub nick: String,
    /// Username / ident.
    pub user: String,
    /// Hostname.
    pub host: String,
}

impl Source {
    /// `user@host`.
    pub fn userhost(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// `nick!user@host`.
    pub fn hostmask(&self) -> String {
        format!("{}!{}@{}", self.nick, self.user, self.host)
    }
}

impl From<Prefix> for Source {
    fn from(prefix: Prefix) -> Source {
        match prefix {
            Prefix::ServerName(name) => Source {
                nick: name,
                ..Source::default()
            },
            Prefix::Nickname(nick, user, host) => Source { nick, user, host },
        }
    }
}

/// An inbound event, keyed by its canonical verb.
///
/// Numerics are resolved through [`Response`](../response/enum.Response.html), so `353` arrives
/// as `NAMREPLY`. A `PRIVMSG` whose body is a CTCP request becomes `CTCP` (or `ACTION`), and
/// its arguments are the words of the request, `ACTION` itself included. For every other verb `target` is the first
/// parameter and `arguments` the remaining ones, except `PING`, `PONG`, `ERROR`, `QUIT` and
/// `AUTHENTICATE`, which have no target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    /// Canonical verb, e.g. `PRIVMSG`, `WELCOME`, `FEATURELIST`.
    pub verb: String,
    /// Where the event came from.
    pub source: Source,
    /// The first parameter, for verbs that have one.
    pub target: Option<String>,
    /// The remaining parameters, trailing parameter included.
    pub arguments: Vec<String>,
    /// IRCv3 tags. Tags sent without a value map to an empty string.
    pub tags: HashMap<String, String>,
}

fn ctcp_body(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('\u{1}')?;
    Some(inner.strip_suffix('\u{1}').unwrap_or(inner))
}

impl Event {
    /// Parses a raw line straight into an event.
    pub fn parse(line: &str) -> Result<Event, ProtocolError> {
        line.parse::<Message>().map(Event::from)
    }

    /// Gets the value of a tag.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// The target, or an empty string when the verb has none.
    pub fn target(&self) -> &str {
        self.target.as_deref().unwrap_or("")
    }
}

impl From<Message> for Event {
    fn from(msg: Message) -> Event {
        let Message {
            tags,
            prefix,
            command,
            mut args,
        } = msg;

        let tags = tags
            .unwrap_or_default()
            .into_iter()
            .map(|Tag(k, v)| (k, v.unwrap_or_default()))
            .collect();
        let source = prefix.map(Source::from).unwrap_or_default();

        let mut verb = match command.parse::<Response>() {
            Ok(resp) => resp.name().to_owned(),
            Err(_) => command.to_ascii_uppercase(),
        };

        if verb == "PRIVMSG" && args.len() == 2 {
            if let Some(body) = ctcp_body(&args[1]) {
                let words: Vec<String> = body.split_whitespace().map(str::to_owned).collect();
                verb = match words.first() {
                    Some(w) if w.eq_ignore_ascii_case("ACTION") => "ACTION".to_owned(),
                    _ => "CTCP".to_owned(),
                };
                args.truncate(1);
                args.extend(words);
            }
        }

        let target = match verb.as_str() {
            "PING" | "PONG" | "ERROR" | "QUIT" | "AUTHENTICATE" => None,
            _ if args.is_empty() => None,
            _ => Some(args.remove(0)),
        };

        Event {
            verb,
            source,
            target,
            arguments: args,
            tags,
        }
    }
}

impl FromStr for Event {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Event, Self::Err> {
        Event::parse(s)
    }
}

#[cfg(test)]
mod test {
    use super::Event;

    #[test]
    fn numeric_is_resolved() {
        let ev = Event::parse(":irc.test 353 bot = #athena :@op +voice plain").unwrap();
        assert_eq!(ev.verb, "NAMREPLY");
        assert_eq!(ev.target(), "bot");
        assert_eq!(ev.arguments, vec!["=", "#athena", "@op +voice plain"]);
        assert_eq!(ev.source.nick, "irc.test");
    }

    #[test]
    fn unknown_numeric_keeps_digits() {
        let ev = Event::parse(":irc.test 372 bot :- motd").unwrap();
        assert_eq!(ev.verb, "372");
    }

    #[test]
    fn ping_has_no_target() {
        let ev = Event::parse("PING :irc.test").unwrap();
        assert_eq!(ev.verb, "PING");
        assert_eq!(ev.target, None);
        assert_eq!(ev.arguments, vec!["irc.test"]);

        let ev = Event::parse("AUTHENTICATE +").unwrap();
        assert_eq!(ev.target, None);
        assert_eq!(ev.arguments, vec!["+"]);
    }

    #[test]
    fn ctcp_request() {
        let ev = Event::parse(":nick!u@h PRIVMSG bot :\u{1}VERSION\u{1}").unwrap();
        assert_eq!(ev.verb, "CTCP");
        assert_eq!(ev.target(), "bot");
        assert_eq!(ev.arguments, vec!["VERSION"]);

        let ev = Event::parse(":nick!u@h PRIVMSG #c :\u{1}ACTION waves  hi\u{1}").unwrap();
        assert_eq!(ev.verb, "ACTION");
        assert_eq!(ev.arguments, vec!["ACTION", "waves", "hi"]);
    }

    #[test]
    fn source_and_tags() {
        let ev = Event::parse("@time=2020-02-02T02:02:02Z;bot :nick!ident@host JOIN #c acct :Real Name")
            .unwrap();
        assert_eq!(ev.source.hostmask(), "nick!ident@host");
        assert_eq!(ev.source.userhost(), "ident@host");
        assert_eq!(ev.tag("time"), Some("2020-02-02T02:02:02Z"));
        assert_eq!(ev.tag("bot"), Some(""));
        assert_eq!(ev.target(), "#c");
        assert_eq!(ev.arguments, vec!["acct", "Real Name"]);
    }
}

//! The source prefix of an inbound message.
use std::fmt;
use std::str::FromStr;

/// The Prefix indicates "the true origin of the message", according to the server.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Prefix {
    /// servername, e.g. irc.libera.chat
    ServerName(String),
    /// nickname [ ["!" username] "@" hostname ]
    /// i.e. Nickname(nickname, username, hostname)
    /// Any of the strings may be ""
    Nickname(String, String, String),
}

impl Prefix {
    /// Creates a prefix by parsing a string.
    ///
    /// A bare word containing a `.` is taken as a server name; anything carrying `!` or `@` is
    /// always a user.
    ///
    /// # Example
    /// ```
    /// # use irc_proto::Prefix;
    /// assert_eq!(
    ///     Prefix::new_from_str("nick!ident@host"),
    ///     Prefix::Nickname("nick".into(), "ident".into(), "host".into())
    /// );
    /// assert_eq!(
    ///     Prefix::new_from_str("irc.example.com"),
    ///     Prefix::ServerName("irc.example.com".into())
    /// );
    /// ```
    pub fn new_from_str(s: &str) -> Prefix {
        let (head, host) = match s.split_once('@') {
            Some((head, host)) => (head, Some(host)),
            None => (s, None),
        };
        let (name, user) = match head.split_once('!') {
            Some((name, user)) => (name, Some(user)),
            None => (head, None),
        };

        if user.is_none() && host.is_none() && name.contains('.') {
            return Prefix::ServerName(name.to_owned());
        }

        Prefix::Nickname(
            name.to_owned(),
            user.unwrap_or("").to_owned(),
            host.unwrap_or("").to_owned(),
        )
    }

    /// Gets the nickname of a user prefix.
    pub fn nickname(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(nick, _, _) => Some(nick),
            Prefix::ServerName(_) => None,
        }
    }

    /// Gets the username (ident) of a user prefix, if one was present.
    pub fn username(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(_, user, _) if !user.is_empty() => Some(user),
            _ => None,
        }
    }

    /// Gets the hostname of a user prefix, if one was present.
    pub fn hostname(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(_, _, host) if !host.is_empty() => Some(host),
            _ => None,
        }
    }
}

/// This implementation never returns an error and is isomorphic with `Display`.
impl FromStr for Prefix {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Prefix::new_from_str(s))
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Prefix::ServerName(name) => f.write_str(name),
            Prefix::Nickname(name, user, host) => {
                f.write_str(name)?;
                if !user.is_empty() {
                    write!(f, "!{}", user)?;
                }
                if !host.is_empty() {
                    write!(f, "@{}", host)?;
                }
                Ok(())
            }
        }
    }
}

impl<'a> From<&'a str> for Prefix {
    fn from(s: &str) -> Self {
        Prefix::new_from_str(s)
    }
}

#[cfg(test)]
mod test {
    use super::Prefix::{self, Nickname, ServerName};

    #[test]
    fn parse_word() {
        assert_eq!(
            Prefix::new_from_str("athena"),
            Nickname("athena".into(), String::new(), String::new())
        );
    }

    #[test]
    fn parse_server() {
        assert_eq!(
            Prefix::new_from_str("irc.libera.chat"),
            ServerName("irc.libera.chat".into())
        );
    }

    #[test]
    fn parse_full_hostmask() {
        let prefix = Prefix::new_from_str("nick!~ident@user/cloak");
        assert_eq!(prefix.nickname(), Some("nick"));
        assert_eq!(prefix.username(), Some("~ident"));
        assert_eq!(prefix.hostname(), Some("user/cloak"));
        assert_eq!(prefix.to_string(), "nick!~ident@user/cloak");
    }

    #[test]
    fn dotted_nick_with_host_is_a_user() {
        assert_eq!(
            Prefix::new_from_str("test.net@something"),
            Nickname("test.net".into(), "".into(), "something".into())
        );
    }

    #[test]
    fn server_has_no_nickname() {
        assert_eq!(ServerName("irc.example.com".into()).nickname(), None);
    }
}

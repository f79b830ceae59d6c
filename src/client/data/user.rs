//! Data for tracking user information.
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::proto::{FormattedStringExt, Prefix};

/// How many recent messages are remembered per user.
pub const SEEN_LIMIT: usize = 5;

/// A message a user sent, with formatting stripped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeenEntry {
    /// When the message was sent (the `time` tag) or received.
    pub time: DateTime<Utc>,
    /// The message text.
    pub message: String,
}

/// One attribute of a user that the server can change after the fact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserAttr {
    /// `ACCOUNT`; `None` when logged out.
    Account(Option<String>),
    /// The ident half of `CHGHOST`.
    Ident(String),
    /// The host half of `CHGHOST`.
    Host(String),
    /// `SETNAME` or a WHOX reply.
    Realname(String),
}

/// IRC User data, scoped to one channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    nick: String,
    hostmask: String,
    ident: String,
    host: String,
    account: Option<String>,
    realname: Option<String>,
    modes: BTreeSet<char>,
    seen: Vec<SeenEntry>,
}

impl User {
    /// Creates a user known only by nickname.
    pub fn new(nick: &str) -> User {
        User {
            nick: nick.to_owned(),
            hostmask: String::new(),
            ident: String::new(),
            host: String::new(),
            account: None,
            realname: None,
            modes: BTreeSet::new(),
            seen: Vec::new(),
        }
    }

    /// Gets the nickname of the user.
    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Gets `nick!ident@host`, or an empty string while unknown.
    pub fn hostmask(&self) -> &str {
        &self.hostmask
    }

    /// Gets the ident (username) of the user.
    pub fn ident(&self) -> &str {
        &self.ident
    }

    /// Gets the hostname of the user.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Gets the services account, if logged in.
    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    /// Gets the real name, if known.
    pub fn realname(&self) -> Option<&str> {
        self.realname.as_deref()
    }

    /// Gets the mode letters applied to this user in the channel.
    pub fn modes(&self) -> &BTreeSet<char> {
        &self.modes
    }

    /// Whether a mode letter is applied.
    pub fn has_mode(&self, mode: char) -> bool {
        self.modes.contains(&mode)
    }

    /// Gets the recent messages, oldest first.
    pub fn seen(&self) -> &[SeenEntry] {
        &self.seen
    }

    pub(crate) fn set_nick(&mut self, nick: &str) {
        self.nick = nick.to_owned();
        if !self.hostmask.is_empty() {
            self.rebuild_hostmask();
        }
    }

    /// Takes ident and host from a full `nick!ident@host`.
    pub(crate) fn set_hostmask(&mut self, hostmask: &str) {
        if let Prefix::Nickname(_, ident, host) = Prefix::new_from_str(hostmask) {
            if !ident.is_empty() {
                self.ident = ident;
            }
            if !host.is_empty() {
                self.host = host;
            }
        }
        self.hostmask = hostmask.to_owned();
    }

    pub(crate) fn set_account(&mut self, account: Option<String>) {
        self.account = account;
    }

    pub(crate) fn set_realname(&mut self, realname: Option<String>) {
        if realname.is_some() {
            self.realname = realname;
        }
    }

    pub(crate) fn add_mode(&mut self, mode: char) {
        self.modes.insert(mode);
    }

    pub(crate) fn apply(&mut self, attr: UserAttr) {
        match attr {
            UserAttr::Account(account) => self.account = account,
            UserAttr::Ident(ident) => {
                self.ident = ident;
                self.rebuild_hostmask();
            }
            UserAttr::Host(host) => {
                self.host = host;
                self.rebuild_hostmask();
            }
            UserAttr::Realname(realname) => self.realname = Some(realname),
        }
    }

    /// Appends to the seen ledger, keeping it sorted and at most `SEEN_LIMIT` long.
    pub(crate) fn record_seen(&mut self, time: DateTime<Utc>, text: &str) {
        self.seen.push(SeenEntry {
            time,
            message: text.strip_formatting().into_owned(),
        });
        self.seen.sort_by_key(|e| e.time);
        if self.seen.len() > SEEN_LIMIT {
            let excess = self.seen.len() - SEEN_LIMIT;
            self.seen.drain(..excess);
        }
    }

    fn rebuild_hostmask(&mut self) {
        self.hostmask = format!("{}!{}@{}", self.nick, self.ident, self.host);
    }
}

#[cfg(test)]
mod test {
    use super::{User, UserAttr, SEEN_LIMIT};
    use chrono::{TimeZone, Utc};

    #[test]
    fn create_user() {
        let mut user = User::new("nick");
        user.set_hostmask("nick!ident@host.com");
        assert_eq!(user.nick(), "nick");
        assert_eq!(user.ident(), "ident");
        assert_eq!(user.host(), "host.com");
        assert_eq!(user.hostmask(), "nick!ident@host.com");
        assert_eq!(user.account(), None);
    }

    #[test]
    fn chghost_rebuilds_hostmask() {
        let mut user = User::new("nick");
        user.set_hostmask("nick!ident@host.com");
        user.apply(UserAttr::Host("cloak/nick".into()));
        assert_eq!(user.hostmask(), "nick!ident@cloak/nick");
        user.apply(UserAttr::Ident("~id".into()));
        assert_eq!(user.hostmask(), "nick!~id@cloak/nick");
        user.set_nick("other");
        assert_eq!(user.hostmask(), "other!~id@cloak/nick");
    }

    #[test]
    fn seen_ledger_is_capped_and_sorted() {
        let mut user = User::new("nick");
        for i in (0..8).rev() {
            user.record_seen(Utc.timestamp_opt(1_000 + i, 0).unwrap(), &format!("\x02msg\x02 {}", i));
        }
        let seen = user.seen();
        assert_eq!(seen.len(), SEEN_LIMIT);
        assert!(seen.windows(2).all(|w| w[0].time <= w[1].time));

        let mut user = User::new("nick");
        for i in 0..8 {
            user.record_seen(Utc.timestamp_opt(1_000 + i, 0).unwrap(), &format!("\x02msg\x02 {}", i));
        }
        let messages: Vec<_> = user.seen().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["msg 3", "msg 4", "msg 5", "msg 6", "msg 7"]);
    }
}

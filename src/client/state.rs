//! Channel and user membership, kept consistent under out-of-order directory replies.
use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use crate::client::data::{Channel, PrefixTable, User, UserAttr};
use crate::error::StateError;
use crate::proto::Command;

/// Every channel the client is in, plus an index of which channels each nick is in.
///
/// Channels only come into existence through [`ensure_channel`](#method.ensure_channel), which
/// the router calls on the client's own `JOIN`. Everything else that names an untracked channel
/// fails with `StateError::UnknownChannel`.
#[derive(Clone, Debug, Default)]
pub struct MembershipStore {
    channels: HashMap<String, Channel>,
    nicks: HashMap<String, BTreeSet<String>>,
}

fn unknown_channel(channel: &str) -> StateError {
    StateError::UnknownChannel {
        channel: channel.to_owned(),
    }
}

impl MembershipStore {
    /// Creates an empty store.
    pub fn new() -> MembershipStore {
        MembershipStore::default()
    }

    /// Gets a channel.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    /// Lists the tracked channel names, sorted.
    pub fn channel_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.channels.keys().map(|s| &s[..]).collect();
        names.sort_unstable();
        names
    }

    /// Gets a user in a channel.
    pub fn user(&self, channel: &str, nick: &str) -> Option<&User> {
        self.channels.get(channel).and_then(|c| c.user(nick))
    }

    /// Lists the channels a nick is known to be in.
    pub fn channels_of(&self, nick: &str) -> Vec<&str> {
        self.nicks
            .get(nick)
            .map_or(vec![], |set| set.iter().map(|s| &s[..]).collect())
    }

    /// Creates the channel if it is not tracked yet.
    pub fn ensure_channel(&mut self, name: &str) -> &mut Channel {
        self.channels.entry(name.to_owned()).or_insert_with(|| {
            debug!("created db for channel {}", name);
            Channel::new(name)
        })
    }

    fn index(&mut self, nick: &str, channel: &str) {
        self.nicks
            .entry(nick.to_owned())
            .or_insert_with(BTreeSet::new)
            .insert(channel.to_owned());
    }

    fn unindex(&mut self, nick: &str, channel: &str) {
        if let Some(set) = self.nicks.get_mut(nick) {
            set.remove(channel);
            if set.is_empty() {
                self.nicks.remove(nick);
            }
        }
    }

    /// Inserts or updates a user. Calling it again with the same values changes nothing.
    pub fn add_entry(
        &mut self,
        channel: &str,
        nick: &str,
        hostmask: &str,
        account: Option<String>,
        realname: Option<String>,
    ) -> Result<(), StateError> {
        let chan = self
            .channels
            .get_mut(channel)
            .ok_or_else(|| unknown_channel(channel))?;
        let user = chan.user_entry(nick);
        if !hostmask.is_empty() {
            user.set_hostmask(hostmask);
        }
        user.set_account(account);
        user.set_realname(realname);
        self.index(nick, channel);
        Ok(())
    }

    /// Adds one `NAMES` entry, such as `@+nick` or `%nick!ident@host`.
    pub fn add_name(
        &mut self,
        channel: &str,
        entry: &str,
        prefixes: &PrefixTable,
    ) -> Result<(), StateError> {
        let (modes, rest) = prefixes.strip(entry);
        if rest.is_empty() {
            return Ok(());
        }
        let nick = rest.split('!').next().unwrap_or(rest);

        let chan = self
            .channels
            .get_mut(channel)
            .ok_or_else(|| unknown_channel(channel))?;
        let user = chan.user_entry(nick);
        if rest.contains('!') {
            user.set_hostmask(rest);
        }
        for mode in modes {
            user.add_mode(mode);
        }
        self.index(nick, channel);
        Ok(())
    }

    /// Updates an attribute of `nick` in every channel it is in, returning how many records
    /// changed. Unknown nicks are ignored.
    pub fn change_attr(&mut self, nick: &str, attr: UserAttr) -> usize {
        let channels: Vec<String> = match self.nicks.get(nick) {
            Some(set) => set.iter().cloned().collect(),
            None => return 0,
        };
        let mut changed = 0;
        for channel in channels {
            if let Some(user) = self
                .channels
                .get_mut(&channel)
                .and_then(|c| c.user_mut(nick))
            {
                user.apply(attr.clone());
                changed += 1;
            }
        }
        changed
    }

    /// Records a channel message for a known user. For an unknown user nothing is recorded and
    /// a WHO query for the channel is returned so the caller can refresh the directory.
    pub fn record_seen(
        &mut self,
        channel: &str,
        nick: &str,
        time: DateTime<Utc>,
        text: &str,
    ) -> Result<Option<Command>, StateError> {
        let chan = self
            .channels
            .get_mut(channel)
            .ok_or_else(|| unknown_channel(channel))?;
        match chan.user_mut(nick) {
            Some(user) => {
                user.record_seen(time, text);
                Ok(None)
            }
            None => Ok(Some(Command::whox(channel))),
        }
    }

    /// Applies a ban/except/quiet list entry. An account mask (`$a:name`) is matched the same
    /// way as a plain mask once the prefix is dropped.
    pub fn set_list_mode(&mut self, channel: &str, mask: &str, mode: char) -> Result<(), StateError> {
        let target = mask.strip_prefix("$a:").unwrap_or(mask);
        let chan = self
            .channels
            .get_mut(channel)
            .ok_or_else(|| unknown_channel(channel))?;
        match chan.find_mut(target) {
            Some(user) => {
                user.add_mode(mode);
                Ok(())
            }
            None => Err(StateError::UnknownUser {
                channel: channel.to_owned(),
                mask: target.to_owned(),
            }),
        }
    }

    /// Records channel mode letters from a `+flags` string.
    pub fn set_channel_modes(&mut self, channel: &str, flags: &str) -> Result<(), StateError> {
        let chan = self
            .channels
            .get_mut(channel)
            .ok_or_else(|| unknown_channel(channel))?;
        chan.add_modes(flags.chars().filter(|c| *c != '+' && *c != '-'));
        Ok(())
    }

    /// Follows a nick change in every channel.
    pub fn rename(&mut self, old: &str, new: &str) {
        if old == new {
            return;
        }
        if let Some(channels) = self.nicks.remove(old) {
            for channel in &channels {
                if let Some(chan) = self.channels.get_mut(channel) {
                    chan.rename(old, new);
                }
            }
            self.nicks
                .entry(new.to_owned())
                .or_insert_with(BTreeSet::new)
                .extend(channels);
        }
    }

    /// Removes a user from one channel.
    pub fn remove_user(&mut self, channel: &str, nick: &str) -> bool {
        let removed = self
            .channels
            .get_mut(channel)
            .map_or(false, |c| c.remove(nick));
        self.unindex(nick, channel);
        removed
    }

    /// Removes a user from every channel, returning the channels it was in.
    pub fn remove_everywhere(&mut self, nick: &str) -> Vec<String> {
        let channels: Vec<String> = self
            .nicks
            .remove(nick)
            .map_or(vec![], |set| set.into_iter().collect());
        for channel in &channels {
            if let Some(chan) = self.channels.get_mut(channel) {
                chan.remove(nick);
            }
        }
        channels
    }

    /// Stops tracking a channel.
    pub fn remove_channel(&mut self, name: &str) -> Option<Channel> {
        let chan = self.channels.remove(name)?;
        for nick in chan.names() {
            self.unindex(nick, name);
        }
        Some(chan)
    }
}

#[cfg(test)]
mod test {
    use super::MembershipStore;
    use crate::client::data::{PrefixTable, UserAttr};
    use crate::error::StateError;
    use crate::proto::Command;
    use chrono::{TimeZone, Utc};

    fn store() -> MembershipStore {
        let mut store = MembershipStore::new();
        store.ensure_channel("#test");
        store.ensure_channel("#other");
        store
    }

    #[test]
    fn add_entry_requires_channel() {
        let mut store = MembershipStore::new();
        assert_eq!(
            store.add_entry("#nope", "nick", "nick!i@h", None, None),
            Err(StateError::UnknownChannel {
                channel: "#nope".into()
            })
        );
        assert!(store.channel("#nope").is_none());
    }

    #[test]
    fn add_entry_is_idempotent() {
        let mut store = store();
        for _ in 0..3 {
            store
                .add_entry("#test", "nick", "nick!i@h", Some("acct".into()), None)
                .unwrap();
        }
        let chan = store.channel("#test").unwrap();
        assert_eq!(chan.names(), &["nick".to_owned()][..]);
        let user = chan.user("nick").unwrap();
        assert_eq!(user.hostmask(), "nick!i@h");
        assert_eq!(user.account(), Some("acct"));

        store
            .add_entry("#test", "nick", "nick!i2@h2", None, Some("Real".into()))
            .unwrap();
        let user = store.user("#test", "nick").unwrap();
        assert_eq!(user.hostmask(), "nick!i2@h2");
        assert_eq!(user.account(), None);
        assert_eq!(user.realname(), Some("Real"));
        assert_eq!(store.channel("#test").unwrap().names().len(), 1);
    }

    #[test]
    fn names_strip_statuses() {
        let mut store = store();
        let prefixes = PrefixTable::parse("(ohv)@%+").unwrap();
        for entry in "@+op %half!h@host plain".split(' ') {
            store.add_name("#test", entry, &prefixes).unwrap();
        }
        let chan = store.channel("#test").unwrap();
        assert_eq!(
            chan.names(),
            &["op".to_owned(), "half".to_owned(), "plain".to_owned()][..]
        );
        assert!(chan.user("op").unwrap().has_mode('o'));
        assert!(chan.user("op").unwrap().has_mode('v'));
        assert_eq!(chan.user("half").unwrap().hostmask(), "half!h@host");
        assert!(chan.user("plain").unwrap().modes().is_empty());
    }

    #[test]
    fn change_attr_follows_index() {
        let mut store = store();
        store.add_entry("#test", "nick", "nick!i@h", None, None).unwrap();
        store.add_entry("#other", "nick", "nick!i@h", None, None).unwrap();

        assert_eq!(store.change_attr("nick", UserAttr::Account(Some("acct".into()))), 2);
        assert_eq!(store.change_attr("nick", UserAttr::Host("new.host".into())), 2);
        assert_eq!(store.change_attr("ghost", UserAttr::Account(None)), 0);

        for chan in &["#test", "#other"] {
            let user = store.user(chan, "nick").unwrap();
            assert_eq!(user.account(), Some("acct"));
            assert_eq!(user.hostmask(), "nick!i@new.host");
        }
    }

    #[test]
    fn record_seen_unknown_user_asks_who() {
        let mut store = store();
        let now = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
        assert_eq!(
            store.record_seen("#test", "stranger", now, "hi"),
            Ok(Some(Command::whox("#test")))
        );
        store.add_entry("#test", "nick", "", None, None).unwrap();
        assert_eq!(store.record_seen("#test", "nick", now, "hi"), Ok(None));
        assert_eq!(store.user("#test", "nick").unwrap().seen().len(), 1);
    }

    #[test]
    fn ledger_keeps_last_five() {
        let mut store = store();
        store.add_entry("#test", "nick", "", None, None).unwrap();
        for i in 0..7 {
            let t = Utc.timestamp_opt(1_600_000_000 + i, 0).unwrap();
            store
                .record_seen("#test", "nick", t, &format!("message {}", i))
                .unwrap();
        }
        let seen = store.user("#test", "nick").unwrap().seen();
        let messages: Vec<_> = seen.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["message 2", "message 3", "message 4", "message 5", "message 6"]
        );
        assert!(seen.windows(2).all(|w| w[0].time < w[1].time));
    }

    #[test]
    fn list_modes() {
        let mut store = store();
        store
            .add_entry("#test", "nick", "nick!i@h", None, None)
            .unwrap();
        store.set_list_mode("#test", "nick!i@h", 'b').unwrap();
        store.set_list_mode("#test", "$a:nick", 'q').unwrap();
        let user = store.user("#test", "nick").unwrap();
        assert!(user.has_mode('b'));
        assert!(user.has_mode('q'));
        assert_eq!(
            store.set_list_mode("#test", "*!*@spam", 'b'),
            Err(StateError::UnknownUser {
                channel: "#test".into(),
                mask: "*!*@spam".into()
            })
        );
    }

    #[test]
    fn channel_modes() {
        let mut store = store();
        store.set_channel_modes("#test", "+nt").unwrap();
        let modes: Vec<_> = store.channel("#test").unwrap().modes().iter().cloned().collect();
        assert_eq!(modes, vec!['n', 't']);
    }

    #[test]
    fn rename_and_remove() {
        let mut store = store();
        store.add_entry("#test", "old", "old!i@h", None, None).unwrap();
        store.add_entry("#other", "old", "old!i@h", None, None).unwrap();

        store.rename("old", "new");
        assert!(store.user("#test", "old").is_none());
        assert_eq!(store.user("#other", "new").unwrap().hostmask(), "new!i@h");
        assert_eq!(store.channels_of("new"), vec!["#other", "#test"]);

        assert!(store.remove_user("#test", "new"));
        assert_eq!(store.channels_of("new"), vec!["#other"]);

        assert_eq!(store.remove_everywhere("new"), vec!["#other".to_owned()]);
        assert!(store.channels_of("new").is_empty());
        assert!(store.channel("#other").unwrap().names().is_empty());

        store.add_entry("#test", "a", "", None, None).unwrap();
        assert!(store.remove_channel("#test").is_some());
        assert!(store.channels_of("a").is_empty());
        assert_eq!(store.channel_names(), vec!["#other"]);
    }

    #[test]
    fn rename_onto_known_nick_merges() {
        let mut store = store();
        store.add_entry("#test", "carol", "carol!c@old", None, None).unwrap();
        store.add_entry("#other", "carol", "carol!c@old", None, None).unwrap();
        store.add_entry("#test", "dave", "dave!d@h", None, None).unwrap();

        store.rename("dave", "carol");
        let names = store.channel("#test").unwrap().names();
        assert_eq!(names, &["carol".to_owned()][..]);
        assert_eq!(store.user("#test", "carol").unwrap().hostmask(), "carol!d@h");
        assert_eq!(store.channels_of("carol"), vec!["#other", "#test"]);
        assert!(store.channels_of("dave").is_empty());
    }
}

//! Data for tracking channel membership.
use std::collections::{BTreeSet, HashMap};

use crate::client::data::User;

/// A channel the client is in.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Channel {
    name: String,
    names: Vec<String>,
    users: HashMap<String, User>,
    modes: BTreeSet<char>,
    key: Option<String>,
}

impl Channel {
    /// Creates an empty channel record.
    pub fn new(name: &str) -> Channel {
        Channel {
            name: name.to_owned(),
            ..Channel::default()
        }
    }

    /// Gets the channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the nicknames present, in the order they were first seen.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Gets a user by nickname.
    pub fn user(&self, nick: &str) -> Option<&User> {
        self.users.get(nick)
    }

    /// Iterates over the known users in no particular order.
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// Gets the channel mode letters.
    pub fn modes(&self) -> &BTreeSet<char> {
        &self.modes
    }

    /// Gets the join key.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub(crate) fn set_key(&mut self, key: Option<String>) {
        self.key = key;
    }

    pub(crate) fn add_modes<I: IntoIterator<Item = char>>(&mut self, modes: I) {
        self.modes.extend(modes);
    }

    pub(crate) fn add_name(&mut self, nick: &str) {
        if !self.names.iter().any(|n| n == nick) {
            self.names.push(nick.to_owned());
        }
    }

    /// Gets or creates the user record for `nick`, listing the nick once.
    pub(crate) fn user_entry(&mut self, nick: &str) -> &mut User {
        self.add_name(nick);
        self.users
            .entry(nick.to_owned())
            .or_insert_with(|| User::new(nick))
    }

    pub(crate) fn user_mut(&mut self, nick: &str) -> Option<&mut User> {
        self.users.get_mut(nick)
    }

    /// Finds a user by nickname or by full hostmask.
    pub(crate) fn find_mut(&mut self, mask: &str) -> Option<&mut User> {
        if self.users.contains_key(mask) {
            return self.users.get_mut(mask);
        }
        self.users.values_mut().find(|u| u.hostmask() == mask)
    }

    pub(crate) fn remove(&mut self, nick: &str) -> bool {
        self.names.retain(|n| n != nick);
        self.users.remove(nick).is_some()
    }

    /// Renames `old` in place. A stale `new` entry is dropped first so the nick stays listed once.
    pub(crate) fn rename(&mut self, old: &str, new: &str) {
        if old != new && self.names.iter().any(|n| n == old) {
            self.remove(new);
        }
        if let Some(n) = self.names.iter_mut().find(|n| *n == old) {
            *n = new.to_owned();
        }
        if let Some(mut user) = self.users.remove(old) {
            user.set_nick(new);
            self.users.insert(new.to_owned(), user);
        }
    }
}

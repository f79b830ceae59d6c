//! The server's ISUPPORT (`005`) advertisement, parsed into a structured registry.
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::proto::chan::DEFAULT_CHANTYPES;
use crate::proto::error::{FeatureParseError, ProtocolError};
use crate::proto::ChannelExt;

/// Splits PREFIX mode letters into op, halfop and voice groups.
static PREFIX_GROUPS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*o)(.*h)?(.*)$").expect("static regex"));

/// The value recorded for one ISUPPORT name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IsupportValue {
    /// Advertised without a value.
    Present,
    /// `NAME=value`
    Scalar(String),
    /// `NAME=a,b,c`
    List(Vec<String>),
    /// Key/value pairs, e.g. the mode → symbol map of `PREFIX`.
    Map(BTreeMap<String, String>),
}

impl IsupportValue {
    /// Gets the scalar value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            IsupportValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Gets the list value.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            IsupportValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Gets the map value.
    pub fn as_map(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            IsupportValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

/// The rank a status prefix grants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrefixLevel {
    /// Voiced (`+v` and anything ranked below halfop).
    Voice,
    /// Half-operator (`+h`).
    HalfOp,
    /// Operator (`+o` and anything ranked above it).
    Op,
}

impl fmt::Display for PrefixLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            PrefixLevel::Op => "op",
            PrefixLevel::HalfOp => "halfop",
            PrefixLevel::Voice => "voice",
        })
    }
}

/// What a status symbol stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrefixMode {
    /// The channel mode letter, e.g. `o`.
    pub mode: char,
    /// The rank of that mode.
    pub level: PrefixLevel,
}

/// Status symbols in the order the server ranks them, each mapped to its mode letter and level.
///
/// Symbols and mode letters are both unique, so the table can be read in either direction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrefixTable {
    entries: Vec<(char, PrefixMode)>,
}

impl Default for PrefixTable {
    /// RFC 1459's `(ov)@+`, used until the server advertises `PREFIX`.
    fn default() -> PrefixTable {
        PrefixTable {
            entries: vec![
                ('@', PrefixMode { mode: 'o', level: PrefixLevel::Op }),
                ('+', PrefixMode { mode: 'v', level: PrefixLevel::Voice }),
            ],
        }
    }
}

impl PrefixTable {
    /// Parses a `PREFIX` value of the form `(modes)symbols`.
    pub fn parse(value: &str) -> Result<PrefixTable, FeatureParseError> {
        let (modes, symbols) = value
            .strip_prefix('(')
            .and_then(|rest| rest.split_once(')'))
            .ok_or(FeatureParseError::MalformedPrefix)?;

        let mode_count = modes.chars().count();
        let symbol_count = symbols.chars().count();
        if mode_count != symbol_count {
            return Err(FeatureParseError::PrefixLengthMismatch {
                modes: mode_count,
                symbols: symbol_count,
            });
        }

        let groups = PREFIX_GROUPS
            .captures(modes)
            .ok_or(FeatureParseError::MissingOpMode)?;
        let op = groups.get(1).map_or("", |m| m.as_str());
        let halfop = groups.get(2).map_or("", |m| m.as_str());

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(mode_count);
        for (mode, symbol) in modes.chars().zip(symbols.chars()) {
            for c in [mode, symbol].iter() {
                if !seen.insert(*c) {
                    return Err(FeatureParseError::DuplicatePrefix { character: *c });
                }
            }
            let level = if op.contains(mode) {
                PrefixLevel::Op
            } else if halfop.contains(mode) {
                PrefixLevel::HalfOp
            } else {
                PrefixLevel::Voice
            };
            entries.push((symbol, PrefixMode { mode, level }));
        }
        Ok(PrefixTable { entries })
    }

    /// Looks up a status symbol.
    pub fn get(&self, symbol: char) -> Option<&PrefixMode> {
        self.entries
            .iter()
            .find(|(s, _)| *s == symbol)
            .map(|(_, m)| m)
    }

    /// Gets the symbol for a mode letter.
    pub fn symbol_for(&self, mode: char) -> Option<char> {
        self.entries
            .iter()
            .find(|(_, m)| m.mode == mode)
            .map(|(s, _)| *s)
    }

    /// Iterates over `(symbol, mode)` in rank order.
    pub fn iter(&self) -> impl Iterator<Item = &(char, PrefixMode)> {
        self.entries.iter()
    }

    /// Number of known status symbols.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no status symbols are known.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Splits the leading status symbols off a NAMES entry, returning the mode letters they
    /// stand for and the remainder. With `multi-prefix` there may be several.
    pub fn strip<'a>(&self, entry: &'a str) -> (Vec<char>, &'a str) {
        let mut modes = Vec::new();
        let mut rest = entry;
        while let Some(c) = rest.chars().next() {
            match self.get(c) {
                Some(m) => {
                    modes.push(m.mode);
                    rest = &rest[c.len_utf8()..];
                }
                None => break,
            }
        }
        (modes, rest)
    }
}

/// Everything the server advertised through ISUPPORT.
///
/// The advertisement usually spans several `005` lines, so parsing merges into what is already
/// known. Feeding the same tokens twice leaves the registry unchanged.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CapabilityRegistry {
    features: BTreeMap<String, IsupportValue>,
    prefixes: PrefixTable,
}

fn invalid(token: &str, cause: FeatureParseError) -> ProtocolError {
    ProtocolError::InvalidFeature {
        token: token.to_owned(),
        cause,
    }
}

fn split_pair(item: &str) -> (String, String) {
    let (k, v) = item.split_once(':').unwrap_or((item, ""));
    (k.to_owned(), v.to_owned())
}

impl CapabilityRegistry {
    /// Creates an empty registry.
    pub fn new() -> CapabilityRegistry {
        CapabilityRegistry::default()
    }

    /// Parses a batch of `NAME` / `NAME=VALUE` / `-NAME` tokens. Malformed tokens are logged
    /// and skipped.
    pub fn parse<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for token in tokens {
            if let Err(ProtocolError::InvalidFeature { token, cause }) =
                self.parse_token(token.as_ref())
            {
                warn!("skipping ISUPPORT token {:?}: {}", token, cause);
            }
        }
    }

    /// Parses a single token.
    pub fn parse_token(&mut self, token: &str) -> Result<(), ProtocolError> {
        if let Some(name) = token.strip_prefix('-') {
            if name.is_empty() {
                return Err(invalid(token, FeatureParseError::MissingName));
            }
            if self.features.remove(name).is_some() {
                debug!("ISUPPORT {} withdrawn", name);
            }
            if name == "PREFIX" {
                self.prefixes = PrefixTable::default();
            }
            return Ok(());
        }

        let (name, value) = token.split_once('=').unwrap_or((token, ""));
        if name.is_empty() {
            return Err(invalid(token, FeatureParseError::MissingName));
        }

        if value.is_empty() {
            match self.features.get(name) {
                Some(IsupportValue::Map(m)) if !m.is_empty() => {}
                _ => {
                    self.features.insert(name.to_owned(), IsupportValue::Present);
                }
            }
        } else if value.contains(',') {
            if value.contains(')') {
                self.merge_map(name, value.split(',').map(split_pair));
            } else {
                let items = value.split(',').map(str::to_owned).collect();
                self.features
                    .insert(name.to_owned(), IsupportValue::List(items));
            }
        } else if name == "PREFIX" {
            let table = PrefixTable::parse(value).map_err(|e| invalid(token, e))?;
            let map = table
                .iter()
                .map(|(symbol, m)| (m.mode.to_string(), symbol.to_string()))
                .collect();
            debug!("prefix table rebuilt from {}", value);
            self.features
                .insert(name.to_owned(), IsupportValue::Map(map));
            self.prefixes = table;
        } else if value.contains(')') && value.contains(':') {
            self.merge_map(name, Some(split_pair(value)));
        } else {
            self.features
                .insert(name.to_owned(), IsupportValue::Scalar(value.to_owned()));
        }
        Ok(())
    }

    /// Merges pairs into the sub-map for `name`, replacing any non-map value.
    fn merge_map<I>(&mut self, name: &str, pairs: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut map = match self.features.remove(name) {
            Some(IsupportValue::Map(m)) => m,
            _ => BTreeMap::new(),
        };
        map.extend(pairs);
        self.features.insert(name.to_owned(), IsupportValue::Map(map));
    }

    /// Gets the value recorded for `name`.
    pub fn get(&self, name: &str) -> Option<&IsupportValue> {
        self.features.get(name)
    }

    /// Whether the server advertised `name` in any form.
    pub fn contains(&self, name: &str) -> bool {
        self.features.contains_key(name)
    }

    /// Iterates over every advertised name and value.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &IsupportValue)> {
        self.features.iter()
    }

    /// The table derived from the last `PREFIX` token.
    pub fn prefixes(&self) -> &PrefixTable {
        &self.prefixes
    }

    /// The network name (`NETWORK`).
    pub fn network(&self) -> Option<&str> {
        self.get("NETWORK").and_then(IsupportValue::as_str)
    }

    /// The channel prefixes (`CHANTYPES`), `#&` until advertised.
    pub fn chantypes(&self) -> &str {
        self.get("CHANTYPES")
            .and_then(IsupportValue::as_str)
            .unwrap_or(DEFAULT_CHANTYPES)
    }

    /// The case mapping (`CASEMAPPING`).
    pub fn casemapping(&self) -> Option<&str> {
        self.get("CASEMAPPING").and_then(IsupportValue::as_str)
    }

    /// The status prefixes usable in message targets (`STATUSMSG`).
    pub fn statusmsg(&self) -> Option<&str> {
        self.get("STATUSMSG").and_then(IsupportValue::as_str)
    }

    /// Whether `name` is a channel on this server.
    pub fn is_channel(&self, name: &str) -> bool {
        name.is_channel_name_in(self.chantypes())
    }
}

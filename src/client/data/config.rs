//! Configuration files using serde
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap},
    fs::File,
    io::prelude::*,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::error::Error::InvalidConfig;
use crate::error::{ConfigError, Result};
use crate::proto::Capability;

/// Configuration for the engine.
///
/// Like any ordinary struct with public fields, a `Config` can be built programmatically. Use
/// `..Config::default()` for the fields you do not care about.
///
/// ```
/// # extern crate irc_engine;
/// use irc_engine::client::prelude::Config;
///
/// # fn main() {
/// let config = Config {
///     nickname: Some("athena".to_owned()),
///     command_prefix: Some("!".to_owned()),
///     ..Config::default()
/// };
/// # }
/// ```
///
/// # Loading a configuration from a file
///
/// The format is picked from the file extension. TOML is enabled by default; JSON needs the
/// `json_config` feature.
///
/// ```toml
/// nickname = "athena"
/// command_prefix = "!"
/// admin_channel = "##athena"
///
/// [channels."#athena"]
/// key = "hunter2"
///
/// [sasl]
/// username = "athena"
/// password = "secret"
/// mechanism = "external"
/// ```
#[derive(Clone, Deserialize, Serialize, Default, PartialEq, Debug)]
pub struct Config {
    /// A list of the owners of the client by nickname.
    pub owners: Option<Vec<String>>,
    /// The client's nickname.
    pub nickname: Option<String>,
    /// The client's username.
    pub username: Option<String>,
    /// The client's real name.
    pub realname: Option<String>,
    /// Channels to join once the server welcomes the client.
    pub channels: Option<BTreeMap<String, ChannelConfig>>,
    /// The prefix that marks a channel message as a command, e.g. `!`.
    pub command_prefix: Option<String>,
    /// Where operational faults are reported.
    pub admin_channel: Option<String>,
    /// IRCv3 capabilities to request when the server offers them.
    pub capabilities: Option<Vec<String>>,
    /// SASL credentials. Authentication is only attempted when this is set.
    pub sasl: Option<SaslConfig>,
    /// Static replies to CTCP requests, keyed by the upper-cased request.
    pub ctcp: Option<HashMap<String, String>>,
    /// A map of additional options to be stored in config.
    pub options: Option<HashMap<String, String>>,

    /// The path that this configuration was loaded from.
    #[serde(skip_serializing)]
    #[doc(hidden)]
    pub path: Option<PathBuf>,
}

/// Per-channel settings.
#[derive(Clone, Deserialize, Serialize, Default, PartialEq, Debug)]
pub struct ChannelConfig {
    /// The channel key, if the channel is `+k`.
    pub key: Option<String>,
}

/// SASL settings.
#[derive(Clone, Deserialize, Serialize, Default, PartialEq, Debug)]
pub struct SaslConfig {
    /// The account name.
    pub username: Option<String>,
    /// The account password, used by `PLAIN`.
    pub password: Option<String>,
    /// `plain` or `external`. Defaults to `plain`.
    pub mechanism: Option<String>,
    /// Seconds to wait for each server reply before giving up. Defaults to 30.
    pub timeout_secs: Option<u64>,
}

impl SaslConfig {
    /// Gets the account name. This defaults to an empty string when not specified.
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or("")
    }

    /// Gets the password. This defaults to an empty string when not specified.
    pub fn password(&self) -> &str {
        self.password.as_deref().unwrap_or("")
    }

    /// Gets the configured mechanism, lower-cased.
    pub fn mechanism(&self) -> String {
        self.mechanism
            .as_deref()
            .unwrap_or("plain")
            .to_ascii_lowercase()
    }

    /// Gets the per-step deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(30))
    }
}

impl Config {
    fn with_path<P: AsRef<Path>>(mut self, path: P) -> Config {
        self.path = Some(path.as_ref().to_owned());
        self
    }

    fn path(&self) -> String {
        self.path
            .as_ref()
            .map(|buf| buf.to_string_lossy().into_owned())
            .unwrap_or_else(|| "<none>".to_owned())
    }

    /// Loads a configuration from the desired path. This will use the file extension to detect
    /// which format to parse the file as (json or toml). Using each format requires having its
    /// respective crate feature enabled. Only toml is available by default.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
        let mut file = File::open(&path)?;
        let mut data = String::new();
        file.read_to_string(&mut data)?;

        let res = match path.as_ref().extension().and_then(|s| s.to_str()) {
            Some("json") => Config::load_json(&path, &data),
            Some("toml") => Config::load_toml(&path, &data),
            Some(ext) => Err(InvalidConfig {
                path: path.as_ref().to_string_lossy().into_owned(),
                cause: ConfigError::UnknownConfigFormat {
                    format: ext.to_owned(),
                },
            }),
            None => Err(InvalidConfig {
                path: path.as_ref().to_string_lossy().into_owned(),
                cause: ConfigError::MissingExtension,
            }),
        };

        res.map(|config| config.with_path(path))
    }

    #[cfg(feature = "json_config")]
    fn load_json<P: AsRef<Path>>(path: P, data: &str) -> Result<Config> {
        serde_json::from_str(data).map_err(|e| InvalidConfig {
            path: path.as_ref().to_string_lossy().into_owned(),
            cause: ConfigError::InvalidJson(e),
        })
    }

    #[cfg(not(feature = "json_config"))]
    fn load_json<P: AsRef<Path>>(path: P, _: &str) -> Result<Config> {
        Err(InvalidConfig {
            path: path.as_ref().to_string_lossy().into_owned(),
            cause: ConfigError::ConfigFormatDisabled { format: "JSON" },
        })
    }

    #[cfg(feature = "toml_config")]
    fn load_toml<P: AsRef<Path>>(path: P, data: &str) -> Result<Config> {
        toml::from_str(data).map_err(|e| InvalidConfig {
            path: path.as_ref().to_string_lossy().into_owned(),
            cause: ConfigError::InvalidToml(e),
        })
    }

    #[cfg(not(feature = "toml_config"))]
    fn load_toml<P: AsRef<Path>>(path: P, _: &str) -> Result<Config> {
        Err(InvalidConfig {
            path: path.as_ref().to_string_lossy().into_owned(),
            cause: ConfigError::ConfigFormatDisabled { format: "TOML" },
        })
    }

    /// Determines whether or not the nickname provided is an owner of the client.
    pub fn is_owner(&self, nickname: &str) -> bool {
        self.owners
            .as_ref()
            .map_or(false, |o| o.iter().any(|owner| owner == nickname))
    }

    /// Gets the nickname specified in the configuration.
    pub fn nickname(&self) -> Result<&str> {
        self.nickname.as_deref().ok_or_else(|| InvalidConfig {
            path: self.path(),
            cause: ConfigError::MissingField { field: "nickname" },
        })
    }

    /// Gets the username specified in the configuration.
    /// This defaults to the user's nickname when not specified.
    pub fn username(&self) -> &str {
        self.username
            .as_deref()
            .unwrap_or_else(|| self.nickname().unwrap_or("user"))
    }

    /// Gets the real name specified in the configuration.
    /// This defaults to the user's nickname when not specified.
    pub fn real_name(&self) -> &str {
        self.realname
            .as_deref()
            .unwrap_or_else(|| self.nickname().unwrap_or("irc"))
    }

    /// Gets the channels to join, in name order, with their keys.
    pub fn channels(&self) -> Vec<(&str, Option<&str>)> {
        self.channels.as_ref().map_or(vec![], |m| {
            m.iter()
                .map(|(name, chan)| (&name[..], chan.key.as_deref()))
                .collect()
        })
    }

    /// Gets the key for the specified channel if it exists in the configuration.
    pub fn channel_key(&self, chan: &str) -> Option<&str> {
        self.channels
            .as_ref()
            .and_then(|m| m.get(chan))
            .and_then(|c| c.key.as_deref())
    }

    /// Gets the command prefix. An empty prefix disables prefixed commands.
    pub fn command_prefix(&self) -> &str {
        self.command_prefix.as_deref().unwrap_or("")
    }

    /// Gets the channel operational faults are reported to.
    pub fn admin_channel(&self) -> Option<&str> {
        self.admin_channel.as_deref().filter(|c| !c.is_empty())
    }

    /// Gets the capabilities to request. This defaults to
    /// [`Capability::defaults`](../../../proto/caps/enum.Capability.html#method.defaults).
    pub fn capabilities(&self) -> Vec<Capability> {
        match self.capabilities {
            Some(ref caps) => caps.iter().map(|c| Capability::from(&c[..])).collect(),
            None => Capability::defaults(),
        }
    }

    /// Gets the configured reply to a CTCP request.
    pub fn ctcp_reply(&self, request: &str) -> Option<&str> {
        self.ctcp
            .as_ref()
            .and_then(|m| m.get(request))
            .map(|s| &s[..])
    }

    /// Looks up the specified string in the options map.
    pub fn get_option(&self, option: &str) -> Option<&str> {
        self.options
            .as_ref()
            .and_then(|o| o.get(option))
            .map(|s| &s[..])
    }
}

#[cfg(test)]
mod test {
    use super::{ChannelConfig, Config, SaslConfig};
    use crate::error::{ConfigError, Error};
    use crate::proto::Capability;
    use std::collections::{BTreeMap, HashMap};
    use std::time::Duration;

    #[allow(unused)]
    fn test_config() -> Config {
        Config {
            owners: Some(vec![format!("test")]),
            nickname: Some(format!("test")),
            username: Some(format!("test")),
            realname: Some(format!("test")),
            channels: Some({
                let mut map = BTreeMap::new();
                map.insert(format!("#test"), ChannelConfig::default());
                map.insert(
                    format!("#test2"),
                    ChannelConfig {
                        key: Some(format!("password")),
                    },
                );
                map
            }),
            command_prefix: Some(format!("!")),
            admin_channel: Some(format!("##test")),
            sasl: Some(SaslConfig {
                username: Some(format!("test")),
                password: Some(format!("secret")),
                mechanism: Some(format!("EXTERNAL")),
                timeout_secs: None,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn is_owner() {
        let cfg = Config {
            owners: Some(vec![format!("test"), format!("test2")]),
            ..Default::default()
        };
        assert!(cfg.is_owner("test"));
        assert!(cfg.is_owner("test2"));
        assert!(!cfg.is_owner("test3"));
        assert!(!Config::default().is_owner("test"));
    }

    #[test]
    fn get_option() {
        let cfg = Config {
            options: {
                let mut map = HashMap::new();
                map.insert(format!("testing"), format!("test"));
                Some(map)
            },
            ..Default::default()
        };
        assert_eq!(cfg.get_option("testing"), Some("test"));
        assert_eq!(cfg.get_option("not"), None);
    }

    #[test]
    fn defaults() {
        let cfg = Config {
            nickname: Some(format!("athena")),
            ..Default::default()
        };
        assert_eq!(cfg.username(), "athena");
        assert_eq!(cfg.real_name(), "athena");
        assert_eq!(cfg.command_prefix(), "");
        assert_eq!(cfg.admin_channel(), None);
        assert_eq!(cfg.capabilities(), Capability::defaults());
        assert!(cfg.channels().is_empty());
    }

    #[test]
    fn missing_nickname() {
        match Config::default().nickname() {
            Err(Error::InvalidConfig {
                cause: ConfigError::MissingField { field },
                ..
            }) => assert_eq!(field, "nickname"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn channels_and_sasl() {
        let cfg = test_config();
        assert_eq!(
            cfg.channels(),
            vec![("#test", None), ("#test2", Some("password"))]
        );
        assert_eq!(cfg.channel_key("#test2"), Some("password"));
        let sasl = cfg.sasl.unwrap();
        assert_eq!(sasl.mechanism(), "external");
        assert_eq!(sasl.timeout(), Duration::from_secs(30));
    }

    #[test]
    #[cfg(feature = "toml_config")]
    fn load_from_toml() -> anyhow::Result<()> {
        const DATA: &str = r###"
owners = ["test"]
nickname = "test"
username = "test"
realname = "test"
command_prefix = "!"
admin_channel = "##test"

[channels."#test"]

[channels."#test2"]
key = "password"

[sasl]
username = "test"
password = "secret"
mechanism = "EXTERNAL"
"###;
        assert_eq!(
            Config::load_toml("client_config.toml", DATA)?.with_path("client_config.toml"),
            test_config().with_path("client_config.toml")
        );
        Ok(())
    }

    #[test]
    #[cfg(feature = "json_config")]
    fn load_from_json() -> anyhow::Result<()> {
        const DATA: &str = r###"{
            "owners": ["test"],
            "nickname": "test",
            "username": "test",
            "realname": "test",
            "channels": { "#test": {}, "#test2": { "key": "password" } },
            "command_prefix": "!",
            "admin_channel": "##test",
            "sasl": { "username": "test", "password": "secret", "mechanism": "EXTERNAL" }
        }"###;
        assert_eq!(
            Config::load_json("client_config.json", DATA)?.with_path("client_config.json"),
            test_config().with_path("client_config.json")
        );
        Ok(())
    }

    #[test]
    fn unknown_extension() {
        let path = std::env::temp_dir().join("irc-engine-config-test.yaml");
        std::fs::write(&path, "nickname: test").unwrap();
        match Config::load(&path) {
            Err(Error::InvalidConfig {
                cause: ConfigError::UnknownConfigFormat { format },
                ..
            }) => assert_eq!(format, "yaml"),
            other => panic!("unexpected {:?}", other),
        }
        let _ = std::fs::remove_file(&path);
    }
}

//! Names of the IRCv3 capabilities the engine knows how to use.

/// IRCv3 capability extensions from the [IRCv3 specifications](https://ircv3.net/irc/) that
/// change what the engine receives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Capability {
    /// [multi-prefix](https://ircv3.net/specs/extensions/multi-prefix)
    MultiPrefix,
    /// [sasl](https://ircv3.net/specs/extensions/sasl-3.2)
    Sasl,
    /// [account-notify](https://ircv3.net/specs/extensions/account-notify)
    AccountNotify,
    /// [extended-join](https://ircv3.net/specs/extensions/extended-join)
    ExtendedJoin,
    /// [chghost](https://ircv3.net/specs/extensions/chghost)
    ChgHost,
    /// [server-time](https://ircv3.net/specs/extensions/server-time)
    ServerTime,
    /// [userhost-in-names](https://ircv3.net/specs/extensions/userhost-in-names)
    UserhostInNames,
    /// Any other capability, by name.
    Custom(String),
}

impl Capability {
    /// The capabilities requested when the configuration does not list any.
    pub fn defaults() -> Vec<Capability> {
        vec![
            Capability::MultiPrefix,
            Capability::AccountNotify,
            Capability::ExtendedJoin,
            Capability::ChgHost,
            Capability::ServerTime,
            Capability::UserhostInNames,
        ]
    }
}

impl AsRef<str> for Capability {
    fn as_ref(&self) -> &str {
        match self {
            Capability::MultiPrefix => "multi-prefix",
            Capability::Sasl => "sasl",
            Capability::AccountNotify => "account-notify",
            Capability::ExtendedJoin => "extended-join",
            Capability::ChgHost => "chghost",
            Capability::ServerTime => "server-time",
            Capability::UserhostInNames => "userhost-in-names",
            Capability::Custom(s) => s,
        }
    }
}

impl From<&str> for Capability {
    fn from(name: &str) -> Capability {
        match name {
            "multi-prefix" => Capability::MultiPrefix,
            "sasl" => Capability::Sasl,
            "account-notify" => Capability::AccountNotify,
            "extended-join" => Capability::ExtendedJoin,
            "chghost" => Capability::ChgHost,
            "server-time" => Capability::ServerTime,
            "userhost-in-names" => Capability::UserhostInNames,
            other => Capability::Custom(other.to_owned()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::Capability::{self, *};

    #[test]
    fn names_round_trip() {
        for cap in Capability::defaults().into_iter().chain(vec![Sasl]) {
            assert_eq!(Capability::from(cap.as_ref()), cap);
        }
    }

    #[test]
    fn unknown_is_custom() {
        assert_eq!(
            Capability::from("draft/chathistory"),
            Custom("draft/chathistory".to_owned())
        );
    }
}

//! The outbound commands the engine emits.
use std::fmt::{Display, Formatter, Result as FmtResult};

/// The WHOX field selector used for every directory query. Servers reply with
/// `<channel> <ident> <host> <nick> <account> <realname>`.
pub const WHOX_FIELDS: &str = "nuhs%nhuacr";

/// An outbound IRC command, serialized without the line terminator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `CAP <subcommand> [param]`
    CAP(CapSubCommand, Option<String>),
    /// `AUTHENTICATE <mechanism|payload|+|*>`
    AUTHENTICATE(String),
    /// `PONG [token]`
    PONG(Option<String>),
    /// `NICK <nickname>`
    NICK(String),
    /// `USER <username> 0 * :<realname>`
    USER(String, String),
    /// `JOIN <channel> [key]`
    JOIN(String, Option<String>),
    /// `WHO <target> <fields>`
    WHO(String, String),
    /// `NAMES <channel>`
    NAMES(String),
    /// `MODE <target> [flags]`
    MODE(String, Option<String>),
    /// `PRIVMSG <target> :<text>`
    PRIVMSG(String, String),
    /// `NOTICE <target> :<text>`
    NOTICE(String, String),
}

impl Command {
    /// A WHOX directory query for `target` with the engine's field selector.
    pub fn whox<S: Into<String>>(target: S) -> Command {
        Command::WHO(target.into(), WHOX_FIELDS.to_owned())
    }

    /// A CTCP reply wrapped in a `NOTICE`.
    pub fn ctcp_reply<S: Into<String>>(target: S, body: &str) -> Command {
        Command::NOTICE(target.into(), format!("\u{1}{}\u{1}", body))
    }
}

/// Subcommands of the `CAP` command the client sends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapSubCommand {
    /// Requests the list of server capabilities.
    LS,
    /// Requests capabilities.
    REQ,
    /// Ends capability negotiation.
    END,
}

impl CapSubCommand {
    /// Gets the string that corresponds to this subcommand.
    pub fn to_str(self) -> &'static str {
        match self {
            CapSubCommand::LS => "LS",
            CapSubCommand::REQ => "REQ",
            CapSubCommand::END => "END",
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Command::CAP(CapSubCommand::REQ, Some(caps)) => write!(f, "CAP REQ :{}", caps),
            Command::CAP(sub, Some(param)) => write!(f, "CAP {} {}", sub.to_str(), param),
            Command::CAP(sub, None) => write!(f, "CAP {}", sub.to_str()),
            Command::AUTHENTICATE(data) => write!(f, "AUTHENTICATE {}", data),
            Command::PONG(Some(token)) => write!(f, "PONG :{}", token),
            Command::PONG(None) => f.write_str("PONG"),
            Command::NICK(nick) => write!(f, "NICK {}", nick),
            Command::USER(user, realname) => write!(f, "USER {} 0 * :{}", user, realname),
            Command::JOIN(chan, Some(key)) => write!(f, "JOIN {} {}", chan, key),
            Command::JOIN(chan, None) => write!(f, "JOIN {}", chan),
            Command::WHO(target, fields) => write!(f, "WHO {} {}", target, fields),
            Command::NAMES(chan) => write!(f, "NAMES {}", chan),
            Command::MODE(target, Some(flags)) if !flags.is_empty() => {
                write!(f, "MODE {} {}", target, flags)
            }
            Command::MODE(target, _) => write!(f, "MODE {}", target),
            Command::PRIVMSG(target, text) => write!(f, "PRIVMSG {} :{}", target, text),
            Command::NOTICE(target, text) => write!(f, "NOTICE {} :{}", target, text),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{CapSubCommand, Command};

    #[test]
    fn literal_forms() {
        assert_eq!(Command::AUTHENTICATE("PLAIN".into()).to_string(), "AUTHENTICATE PLAIN");
        assert_eq!(Command::AUTHENTICATE("*".into()).to_string(), "AUTHENTICATE *");
        assert_eq!(Command::CAP(CapSubCommand::END, None).to_string(), "CAP END");
        assert_eq!(
            Command::CAP(CapSubCommand::LS, Some("302".into())).to_string(),
            "CAP LS 302"
        );
        assert_eq!(
            Command::CAP(CapSubCommand::REQ, Some("sasl multi-prefix".into())).to_string(),
            "CAP REQ :sasl multi-prefix"
        );
        assert_eq!(Command::PONG(None).to_string(), "PONG");
        assert_eq!(Command::whox("#athena").to_string(), "WHO #athena nuhs%nhuacr");
        assert_eq!(Command::JOIN("#a".into(), Some("key".into())).to_string(), "JOIN #a key");
        assert_eq!(Command::JOIN("#a".into(), None).to_string(), "JOIN #a");
        assert_eq!(Command::MODE("#a".into(), Some(String::new())).to_string(), "MODE #a");
        assert_eq!(Command::MODE("#a".into(), Some("+b".into())).to_string(), "MODE #a +b");
        assert_eq!(Command::USER("bot".into(), "A bot".into()).to_string(), "USER bot 0 * :A bot");
    }

    #[test]
    fn ctcp_reply() {
        assert_eq!(
            Command::ctcp_reply("nick", "VERSION athena").to_string(),
            "NOTICE nick :\u{1}VERSION athena\u{1}"
        );
    }
}

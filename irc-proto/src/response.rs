//! The numeric replies the engine understands, and their canonical event names.
#![allow(non_camel_case_types)]
use std::str::FromStr;

macro_rules! make_response {
    ($($(#[$attr:meta])+ $variant:ident = $value:expr => $name:expr),+ $(,)?) => {
        /// Numeric server replies, each mapped to the canonical verb name the event router
        /// dispatches on (`001` becomes `WELCOME`, `005` becomes `FEATURELIST`, …).
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum Response {
            $($(#[$attr])+ $variant = $value),+
        }

        impl Response {
            /// Looks up a numeric reply code.
            pub fn from_u16(val: u16) -> Option<Response> {
                match val {
                    $($value => Some(Response::$variant),)+
                    _ => None
                }
            }

            /// The canonical verb name used for routing.
            pub fn name(self) -> &'static str {
                match self {
                    $(Response::$variant => $name,)+
                }
            }
        }
    }
}

make_response! {
    /// `001 <nick> :Welcome to the Internet Relay Network <nick>!<user>@<host>`
    RPL_WELCOME          =   1 => "WELCOME",
    /// `005 <nick> *(<feature>(=<value>)) :are supported by this server`
    RPL_ISUPPORT         =   5 => "FEATURELIST",
    /// `315 <nick> <mask> :End of WHO list`
    RPL_ENDOFWHO         = 315 => "ENDOFWHO",
    /// `324 <nick> <channel> <modes> <mode params>`
    RPL_CHANNELMODEIS    = 324 => "CHANNELMODEIS",
    /// `348 <nick> <channel> <mask> [<setter> <time>]`
    RPL_EXCEPTLIST       = 348 => "EXCEPTLIST",
    /// `353 <nick> <symbol> <channel> :[prefix]<nick>{ [prefix]<nick>}`
    RPL_NAMREPLY         = 353 => "NAMREPLY",
    /// `354 <nick> [token] <fields…>`, the WHOX reply.
    RPL_WHOSPCRPL        = 354 => "WHOSPCRPL",
    /// `366 <nick> <channel> :End of /NAMES list`
    RPL_ENDOFNAMES       = 366 => "ENDOFNAMES",
    /// `367 <nick> <channel> <mask> [<setter> <time>]`
    RPL_BANLIST          = 367 => "BANLIST",
    /// `376 <nick> :End of /MOTD command`
    RPL_ENDOFMOTD        = 376 => "ENDOFMOTD",
    /// `422 <nick> :MOTD File is missing`
    ERR_NOMOTD           = 422 => "NOMOTD",
    /// `432 <nick> <nick> :Erroneous nickname`
    ERR_ERRONEOUSNICKNAME = 432 => "ERRONEOUSNICKNAME",
    /// `433 <nick> <nick> :Nickname is already in use`
    ERR_NICKNAMEINUSE    = 433 => "NICKNAMEINUSE",
    /// `462 <nick> :You may not reregister`
    ERR_ALREADYREGISTRED = 462 => "ALREADYREGISTERED",
    /// `728 <nick> <channel> q <mask> [<setter> <time>]`
    RPL_QUIETLIST        = 728 => "QUIETLIST",
    /// `900 <nick> <nick>!<ident>@<host> <account> :You are now logged in as <user>`
    RPL_LOGGEDIN         = 900 => "LOGGEDIN",
    /// `901 <nick> <nick>!<ident>@<host> :You are now logged out`
    RPL_LOGGEDOUT        = 901 => "LOGGEDOUT",
    /// `903 <nick> :SASL authentication successful`
    RPL_SASLSUCCESS      = 903 => "SASLSUCCESS",
    /// `904 <nick> :SASL authentication failed`
    ERR_SASLFAIL         = 904 => "SASLFAILED",
    /// `905 <nick> :SASL message too long`
    ERR_SASLTOOLONG      = 905 => "SASLTOOLONG",
    /// `906 <nick> :SASL authentication aborted`
    ERR_SASLABORTED      = 906 => "SASLABORTED",
    /// `907 <nick> :You have already authenticated using SASL`
    ERR_SASLALREADY      = 907 => "SASLALREADY",
    /// `908 <nick> <mechanisms> :are available SASL mechanisms`
    RPL_SASLMECHS        = 908 => "SASLMECHS",
}

impl Response {
    /// Determines whether or not this response is an error response.
    pub fn is_error(self) -> bool {
        let code = self as u16;
        (400..600).contains(&code) || (904..=907).contains(&code)
    }
}

impl FromStr for Response {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<Response, &'static str> {
        if s.len() != 3 {
            return Err("Response codes are three digits.");
        }
        match s.parse() {
            Ok(rc) => Response::from_u16(rc).ok_or("Unknown response code."),
            Err(_) => Err("Failed to parse response code."),
        }
    }
}

//! Routing of inbound events to the handlers that keep the client's state.
//!
//! The verb table is built once from the registration list in [`Router::new`]. Each handler runs
//! to completion against the client before the next event is looked at.
use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::client::data::UserAttr;
use crate::client::plugins::CommandContext;
use crate::client::sasl::SaslSession;
use crate::client::transport::Transport;
use crate::client::Client;
use crate::error::Result;
use crate::proto::{CapSubCommand, Capability, Command, Event};

/// A handler for one verb.
pub type Handler<T> = fn(&mut Client<T>, &Event) -> Result<()>;

/// Mechanisms assumed when the server advertises `sasl` without a value.
const DEFAULT_SASL_MECHANISMS: &[&str] = &["EXTERNAL", "PLAIN"];

/// The verb → handler table.
pub struct Router<T: Transport> {
    table: HashMap<&'static str, Handler<T>>,
}

impl<T: Transport> Router<T> {
    /// Builds the table.
    pub fn new() -> Router<T> {
        let mut table: HashMap<&'static str, Handler<T>> = HashMap::new();
        table.insert("PING", on_ping);
        table.insert("WELCOME", on_welcome);
        table.insert("NICKNAMEINUSE", on_nickname_in_use);
        table.insert("JOIN", on_join);
        table.insert("PART", on_part);
        table.insert("KICK", on_kick);
        table.insert("QUIT", on_quit);
        table.insert("NAMREPLY", on_namreply);
        table.insert("WHOSPCRPL", on_whospcrpl);
        table.insert("CHANNELMODEIS", on_channelmodeis);
        table.insert("BANLIST", on_banlist);
        table.insert("EXCEPTLIST", on_exceptlist);
        table.insert("QUIETLIST", on_quietlist);
        table.insert("ACCOUNT", on_account);
        table.insert("CHGHOST", on_chghost);
        table.insert("CAP", on_cap);
        table.insert("AUTHENTICATE", on_authenticate);
        table.insert("SASLFAILED", on_sasl_failed);
        table.insert("SASLSUCCESS", on_sasl_success);
        table.insert("ALREADYREGISTERED", on_already_registered);
        table.insert("NICK", on_nick);
        table.insert("PRIVMSG", on_privmsg);
        table.insert("ACTION", on_action);
        table.insert("FEATURELIST", on_featurelist);
        table.insert("ERROR", on_error);
        #[cfg(feature = "ctcp")]
        table.insert("CTCP", on_ctcp);
        Router { table }
    }

    /// Looks up the handler for a verb.
    pub fn get(&self, verb: &str) -> Option<Handler<T>> {
        self.table.get(verb).copied()
    }

    /// Whether a verb has a handler.
    pub fn handles(&self, verb: &str) -> bool {
        self.table.contains_key(verb)
    }
}

impl<T: Transport> Default for Router<T> {
    fn default() -> Router<T> {
        Router::new()
    }
}

fn last_arg(event: &Event) -> &str {
    event.arguments.last().map_or("", String::as_str)
}

fn arg(event: &Event, i: usize) -> &str {
    event.arguments.get(i).map_or("", String::as_str)
}

/// The server-supplied `time` tag, or now.
fn event_time(event: &Event) -> DateTime<Utc> {
    event
        .tag("time")
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map_or_else(Utc::now, |t| t.with_timezone(&Utc))
}

/// `*` means "no account" in ACCOUNT and extended JOIN.
fn account(name: &str) -> Option<String> {
    match name {
        "" | "*" => None,
        name => Some(name.to_owned()),
    }
}

fn on_ping<T: Transport>(client: &mut Client<T>, event: &Event) -> Result<()> {
    client.send(Command::PONG(event.arguments.first().cloned()))
}

fn on_welcome<T: Transport>(client: &mut Client<T>, event: &Event) -> Result<()> {
    if !event.target().is_empty() {
        client.server.nickname = event.target().to_owned();
    }
    let joins: Vec<Command> = client
        .config
        .channels()
        .into_iter()
        .map(|(chan, key)| Command::JOIN(chan.to_owned(), key.map(str::to_owned)))
        .collect();
    for join in joins {
        client.send(join)?;
    }
    Ok(())
}

fn on_nickname_in_use<T: Transport>(client: &mut Client<T>, _: &Event) -> Result<()> {
    client.server.nickname.push('_');
    warn!("nickname in use, trying {}", client.server.nickname);
    let nick = client.server.nickname.clone();
    client.send(Command::NICK(nick))
}

fn on_join<T: Transport>(client: &mut Client<T>, event: &Event) -> Result<()> {
    let chan = event.target();
    let nick = &event.source.nick;
    if client.is_me(nick) {
        let key = client.config.channel_key(chan).map(str::to_owned);
        client.store.ensure_channel(chan).set_key(key);
        info!("joined {}", chan);
        client.send(Command::whox(chan))?;
        client.send(Command::NAMES(chan.to_owned()))?;
        client.send(Command::MODE(chan.to_owned(), None))
    } else {
        // extended-join: JOIN <channel> <account> :<realname>
        let acct = event.arguments.first().and_then(|a| account(a));
        let realname = event.arguments.get(1).cloned();
        client
            .store
            .add_entry(chan, nick, &event.source.hostmask(), acct, realname)?;
        client.pending_who.insert(nick.clone(), chan.to_owned());
        client.send(Command::whox(nick.as_str()))
    }
}

/// Drops WHO redirects into `chan`, for one nick or for everyone.
fn forget_pending<T: Transport>(client: &mut Client<T>, chan: &str, nick: Option<&str>) {
    client
        .pending_who
        .retain(|n, c| c.as_str() != chan || nick.map_or(false, |gone| n.as_str() != gone));
}

fn on_part<T: Transport>(client: &mut Client<T>, event: &Event) -> Result<()> {
    let chan = event.target();
    if client.is_me(&event.source.nick) {
        info!("left {}", chan);
        client.store.remove_channel(chan);
        forget_pending(client, chan, None);
    } else {
        client.store.remove_user(chan, &event.source.nick);
        forget_pending(client, chan, Some(event.source.nick.as_str()));
    }
    Ok(())
}

fn on_kick<T: Transport>(client: &mut Client<T>, event: &Event) -> Result<()> {
    let chan = event.target();
    let victim = arg(event, 0);
    if client.is_me(victim) {
        warn!("kicked from {} by {}", chan, event.source.nick);
        client.store.remove_channel(chan);
        forget_pending(client, chan, None);
    } else {
        client.store.remove_user(chan, victim);
        forget_pending(client, chan, Some(victim));
    }
    Ok(())
}

fn on_quit<T: Transport>(client: &mut Client<T>, event: &Event) -> Result<()> {
    let channels = client.store.remove_everywhere(&event.source.nick);
    debug!("{} quit from {:?}", event.source.nick, channels);
    client.pending_who.remove(&event.source.nick);
    Ok(())
}

fn on_namreply<T: Transport>(client: &mut Client<T>, event: &Event) -> Result<()> {
    // NAMREPLY <me> <symbol> <channel> :<names>
    let chan = arg(event, 1);
    let prefixes = client.server.registry.prefixes();
    for entry in last_arg(event).split_whitespace() {
        client.store.add_name(chan, entry, prefixes)?;
    }
    Ok(())
}

fn on_whospcrpl<T: Transport>(client: &mut Client<T>, event: &Event) -> Result<()> {
    let fields = &event.arguments;
    if fields.len() < 6 {
        debug!("short WHOX reply: {:?}", fields);
        return Ok(());
    }
    let (ident, host, nick) = (&fields[1], &fields[2], &fields[3]);
    let pending = client.pending_who.remove(nick);
    if nick == "ChanServ" {
        return Ok(());
    }
    let acct = match fields[4].as_str() {
        "0" => None,
        a => Some(a.to_owned()),
    };
    let chan = pending.unwrap_or_else(|| fields[0].clone());
    let hostmask = format!("{}!{}@{}", nick, ident, host);
    client
        .store
        .add_entry(&chan, nick, &hostmask, acct, Some(fields[5].clone()))?;
    Ok(())
}

fn on_channelmodeis<T: Transport>(client: &mut Client<T>, event: &Event) -> Result<()> {
    client
        .store
        .set_channel_modes(arg(event, 0), arg(event, 1))?;
    Ok(())
}

fn list_mode<T: Transport>(client: &mut Client<T>, chan: &str, mask: &str, mode: char) -> Result<()> {
    client.store.set_list_mode(chan, mask, mode)?;
    Ok(())
}

fn on_banlist<T: Transport>(client: &mut Client<T>, event: &Event) -> Result<()> {
    list_mode(client, arg(event, 0), arg(event, 1), 'b')
}

fn on_exceptlist<T: Transport>(client: &mut Client<T>, event: &Event) -> Result<()> {
    list_mode(client, arg(event, 0), arg(event, 1), 'e')
}

fn on_quietlist<T: Transport>(client: &mut Client<T>, event: &Event) -> Result<()> {
    // QUIETLIST <me> <channel> q <mask>
    list_mode(client, arg(event, 0), arg(event, 2), 'q')
}

fn on_account<T: Transport>(client: &mut Client<T>, event: &Event) -> Result<()> {
    let changed = client
        .store
        .change_attr(&event.source.nick, UserAttr::Account(account(event.target())));
    debug!("account of {} changed in {} channels", event.source.nick, changed);
    Ok(())
}

fn on_chghost<T: Transport>(client: &mut Client<T>, event: &Event) -> Result<()> {
    let nick = &event.source.nick;
    match event.arguments.first() {
        Some(host) => {
            client
                .store
                .change_attr(nick, UserAttr::Ident(event.target().to_owned()));
            client.store.change_attr(nick, UserAttr::Host(host.clone()));
        }
        None => {
            client
                .store
                .change_attr(nick, UserAttr::Host(event.target().to_owned()));
        }
    }
    Ok(())
}

fn on_cap<T: Transport>(client: &mut Client<T>, event: &Event) -> Result<()> {
    // CAP * <subcommand> [*] :<caps>
    let sub = arg(event, 0).to_ascii_uppercase();
    let caps = last_arg(event);
    match sub.as_str() {
        "LS" => {
            let more = event.arguments.len() > 2 && event.arguments[1] == "*";
            for cap in caps.split_whitespace() {
                let mut parts = cap.splitn(2, '=');
                let name = parts.next().unwrap_or(cap);
                let value = parts.next().map(str::to_owned);
                client.server.offered.insert(name.to_owned(), value);
            }
            if more {
                return Ok(());
            }
            request_caps(client)
        }
        "ACK" => {
            let acked = caps.split_whitespace().any(|c| c == "sasl");
            match client.config.sasl.clone() {
                Some(ref sasl) if acked => {
                    let offered: Vec<String> = match client.server.offered.get("sasl") {
                        Some(Some(mechs)) => mechs.split(',').map(str::to_owned).collect(),
                        _ => DEFAULT_SASL_MECHANISMS.iter().map(|&m| m.to_owned()).collect(),
                    };
                    let mut session = SaslSession::new(sasl);
                    session.start(&offered[..], &client.transport)?;
                    client.sasl = Some(session);
                    Ok(())
                }
                _ => client.send(Command::CAP(CapSubCommand::END, None)),
            }
        }
        "NAK" => {
            warn!("server refused capabilities: {}", caps);
            client.send(Command::CAP(CapSubCommand::END, None))
        }
        _ => {
            trace!("ignoring CAP {}", sub);
            Ok(())
        }
    }
}

/// Requests every wanted capability the server offers, or ends negotiation.
fn request_caps<T: Transport>(client: &mut Client<T>) -> Result<()> {
    let mut wanted = client.config.capabilities();
    if client.config.sasl.is_some() && !wanted.contains(&Capability::Sasl) {
        wanted.push(Capability::Sasl);
    }
    let request: Vec<&str> = wanted
        .iter()
        .map(|c| AsRef::<str>::as_ref(c))
        .filter(|c| client.server.offered.contains_key(*c))
        .collect();
    if request.is_empty() {
        return client.send(Command::CAP(CapSubCommand::END, None));
    }
    let request = request.join(" ");
    client.send(Command::CAP(CapSubCommand::REQ, Some(request)))
}

fn on_authenticate<T: Transport>(client: &mut Client<T>, event: &Event) -> Result<()> {
    if arg(event, 0) != "+" {
        trace!("ignoring AUTHENTICATE {:?}", event.arguments);
        return Ok(());
    }
    match client.sasl {
        Some(ref mut session) => session.on_continuation(&client.transport),
        None => {
            debug!("AUTHENTICATE + without a SASL session");
            Ok(())
        }
    }
}

fn on_sasl_failed<T: Transport>(client: &mut Client<T>, _: &Event) -> Result<()> {
    match client.sasl {
        Some(ref mut session) => session.on_failure(&client.transport),
        None => Ok(()),
    }
}

fn on_sasl_success<T: Transport>(client: &mut Client<T>, _: &Event) -> Result<()> {
    match client.sasl {
        Some(ref mut session) => session.on_success(&client.transport),
        None => Ok(()),
    }
}

fn on_already_registered<T: Transport>(_: &mut Client<T>, event: &Event) -> Result<()> {
    error!("already registered: {}", last_arg(event));
    Ok(())
}

fn on_nick<T: Transport>(client: &mut Client<T>, event: &Event) -> Result<()> {
    let old = &event.source.nick;
    let new = event.target();
    if client.is_me(old) {
        info!("now known as {}", new);
        client.server.nickname = new.to_owned();
    }
    client.store.rename(old, new);
    if let Some(chan) = client.pending_who.remove(old) {
        client.pending_who.insert(new.to_owned(), chan);
    }
    Ok(())
}

/// The command text of a message, if it is addressed to the client: behind the command prefix,
/// behind `<nick>`, `<nick>:` or `<nick>,`, or anything sent privately.
fn command_text<'a>(text: &'a str, prefix: &str, nick: &str, is_channel: bool) -> Option<&'a str> {
    if !prefix.is_empty() && text.starts_with(prefix) {
        return Some(&text[prefix.len()..]);
    }
    let mut words = text.splitn(2, char::is_whitespace);
    let first = words.next().unwrap_or("");
    let addressed = first.trim_end_matches(|c| c == ':' || c == ',');
    if !nick.is_empty() && addressed.eq_ignore_ascii_case(nick) {
        return Some(words.next().unwrap_or("").trim_start());
    }
    if is_channel {
        None
    } else {
        Some(text)
    }
}

/// `/me` lines only feed the seen ledger; commands and hooks never fire on them.
fn on_action<T: Transport>(client: &mut Client<T>, event: &Event) -> Result<()> {
    let target = event.target();
    if !client.server.registry.is_channel(target) {
        return Ok(());
    }
    let text = event.arguments.get(1..).unwrap_or_default().join(" ");
    let seen = client
        .store
        .record_seen(target, &event.source.nick, event_time(event), &text)?;
    if let Some(refresh) = seen {
        client.send(refresh)?;
    }
    Ok(())
}

fn on_privmsg<T: Transport>(client: &mut Client<T>, event: &Event) -> Result<()> {
    let target = event.target();
    let text = last_arg(event);
    let is_channel = client.server.registry.is_channel(target);

    let mut results = vec![];
    if is_channel {
        match client
            .store
            .record_seen(target, &event.source.nick, event_time(event), text)
        {
            Ok(Some(refresh)) => client.send(refresh)?,
            Ok(None) => (),
            Err(e) => results.push(Err(e.into())),
        }
    }

    let ctx = CommandContext::new(
        event,
        &client.config,
        &client.server.nickname,
        &client.transport,
        is_channel,
    );
    let command = command_text(
        text,
        client.config.command_prefix(),
        &client.server.nickname,
        is_channel,
    );
    if let Some(command) = command {
        let args: Vec<String> = command.split_whitespace().map(str::to_owned).collect();
        if !args.is_empty() {
            results.push(client.plugins.call_command(&ctx, &args));
        }
    }
    results.push(client.plugins.call_regex_hooks(&ctx));
    results.push(client.plugins.call_privmsg_hooks(&ctx));
    results.push(client.plugins.call_includes_hooks(&ctx));

    for result in results {
        if let Err(e) = result {
            client.recover(&event.verb, e)?;
        }
    }
    Ok(())
}

#[cfg(feature = "ctcp")]
fn on_ctcp<T: Transport>(client: &mut Client<T>, event: &Event) -> Result<()> {
    let key = event.arguments.join(" ").to_uppercase();
    let body = match client.config.ctcp_reply(&key) {
        Some(value) => Some(format!("{} {}", key, value)),
        None => match event.arguments.first().map(|w| w.to_uppercase()).as_deref() {
            Some("PING") => Some(event.arguments.join(" ")),
            Some("TIME") => Some(format!("TIME {}", Utc::now().to_rfc2822())),
            Some("VERSION") => Some(format!("VERSION {}", crate::VERSION_STR)),
            _ => None,
        },
    };
    match body {
        Some(body) => client.send(Command::ctcp_reply(event.source.nick.as_str(), &body)),
        None => {
            debug!("no reply for CTCP {} from {}", key, event.source.nick);
            Ok(())
        }
    }
}

fn on_featurelist<T: Transport>(client: &mut Client<T>, event: &Event) -> Result<()> {
    // FEATURELIST <me> <tokens…> :are supported by this server
    if let Some((_, tokens)) = event.arguments.split_last() {
        client.server.registry.parse(tokens);
    }
    Ok(())
}

fn on_error<T: Transport>(client: &mut Client<T>, event: &Event) -> Result<()> {
    let text = last_arg(event);
    error!("server error: {}", text);
    if text.to_ascii_lowercase().contains("closing link") {
        return Ok(());
    }
    match client.config.admin_channel().map(str::to_owned) {
        Some(admin) => client.send(Command::PRIVMSG(admin, format!("ERROR: {}", text))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use super::{command_text, event_time, Router};
    use crate::client::data::Config;
    use crate::client::mock::MockTransport;
    use crate::client::Client;
    use crate::proto::Event;
    use chrono::{TimeZone, Utc};

    fn client() -> Client<MockTransport> {
        let config = Config {
            nickname: Some("athena".to_owned()),
            ..Config::default()
        };
        Client::new(config, MockTransport::new()).unwrap()
    }

    fn feed(client: &mut Client<MockTransport>, lines: &[&str]) {
        for line in lines {
            client.handle_event(&Event::parse(line).unwrap()).unwrap();
        }
    }

    #[test]
    fn table_covers_inbound_verbs() {
        let router: Router<MockTransport> = Router::new();
        for verb in &[
            "PING", "WELCOME", "NICKNAMEINUSE", "JOIN", "NAMREPLY", "WHOSPCRPL", "CHANNELMODEIS",
            "EXCEPTLIST", "BANLIST", "QUIETLIST", "ACCOUNT", "CHGHOST", "CAP", "AUTHENTICATE",
            "SASLFAILED", "SASLSUCCESS", "ALREADYREGISTERED", "NICK", "PRIVMSG", "FEATURELIST",
            "ERROR", "PART", "KICK", "QUIT", "ACTION",
        ] {
            assert!(router.handles(verb), "{} has no handler", verb);
        }
        assert!(!router.handles("TOPIC"));
    }

    #[test]
    #[cfg(feature = "ctcp")]
    fn ctcp_is_routed() {
        let router: Router<MockTransport> = Router::new();
        assert!(router.handles("CTCP"));
    }

    #[test]
    fn addressing() {
        assert_eq!(command_text("!help me", "!", "athena", true), Some("help me"));
        assert_eq!(command_text("athena: help", "!", "athena", true), Some("help"));
        assert_eq!(command_text("Athena, help", "!", "athena", true), Some("help"));
        assert_eq!(command_text("athena help", "", "athena", true), Some("help"));
        assert_eq!(command_text("athenaX help", "!", "athena", true), None);
        assert_eq!(command_text("just chatting", "!", "athena", true), None);
        assert_eq!(command_text("help", "!", "athena", false), Some("help"));
        assert_eq!(command_text("!help", "", "athena", true), None);
    }

    #[test]
    fn time_tag() {
        let ev = Event::parse("@time=2021-03-04T05:06:07.000Z :a!b@c PRIVMSG #x :hi").unwrap();
        assert_eq!(event_time(&ev), Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap());
    }

    #[test]
    fn late_who_reply_after_part_is_dropped() {
        let mut c = client();
        feed(
            &mut c,
            &[
                ":athena!a@h JOIN #test",
                ":carol!c@h JOIN #test * :Carol",
                ":carol!c@h PART #test",
                ":irc 354 athena * c h carol 0 :Carol",
            ],
        );
        assert!(c.store().user("#test", "carol").is_none());
        assert!(c.store().channels_of("carol").is_empty());
        assert!(c.pending_who.is_empty());
    }

    #[test]
    fn kicks_clear_pending_who() {
        let mut c = client();
        feed(
            &mut c,
            &[
                ":athena!a@h JOIN #test",
                ":athena!a@h JOIN #other",
                ":carol!c@h JOIN #test",
                ":dave!d@h JOIN #other",
                ":erin!e@h JOIN #other",
                ":op!o@h KICK #test carol :bye",
            ],
        );
        assert!(!c.pending_who.contains_key("carol"));
        assert_eq!(c.pending_who.len(), 2);

        feed(&mut c, &[":op!o@h KICK #other athena :out"]);
        assert!(c.pending_who.is_empty());
    }

    #[test]
    fn chanserv_reply_clears_pending_who() {
        let mut c = client();
        feed(
            &mut c,
            &[
                ":athena!a@h JOIN #test",
                ":ChanServ!cs@services JOIN #test",
                ":irc 354 athena #test cs services ChanServ ChanServ :Services",
            ],
        );
        assert!(c.pending_who.is_empty());
        assert!(c.store().user("#test", "ChanServ").is_some());
    }

    #[test]
    fn chghost_with_host_only() {
        let mut c = client();
        feed(
            &mut c,
            &[
                ":athena!a@h JOIN #test",
                ":carol!c@old.host JOIN #test",
                ":carol!c@old.host CHGHOST new.host",
            ],
        );
        let carol = c.store().user("#test", "carol").unwrap();
        assert_eq!(carol.ident(), "c");
        assert_eq!(carol.host(), "new.host");
        assert_eq!(carol.hostmask(), "carol!c@new.host");
    }

    #[test]
    fn actions_feed_the_seen_ledger() {
        let mut c = client();
        feed(
            &mut c,
            &[
                ":athena!a@h JOIN #test",
                ":carol!c@h JOIN #test",
                ":carol!c@h PRIVMSG #test :\u{1}ACTION waves hello\u{1}",
            ],
        );
        let seen = c.store().user("#test", "carol").unwrap().seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].message, "waves hello");
    }
}

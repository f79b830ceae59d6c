//! Commands and message hooks, supplied up front as a closed manifest.
//!
//! The router hands every `PRIVMSG` to a [`Plugins`] implementation: command text to
//! [`call_command`](trait.Plugins.html#tymethod.call_command) when the message is addressed to
//! the client, and the whole event to the three hook pipelines. [`PluginRegistry`] is the stock
//! implementation.
use std::fmt;

use regex::Regex;

use crate::client::data::Config;
use crate::client::transport::Transport;
use crate::error::{Error, Result};
use crate::proto::{Command, Event};

/// What a command or hook handler gets to work with.
pub struct CommandContext<'a> {
    /// The message that triggered the call.
    pub event: &'a Event,
    /// The client configuration.
    pub config: &'a Config,
    /// The client's current nickname.
    pub nickname: &'a str,
    transport: &'a dyn Transport,
    is_channel: bool,
}

impl<'a> CommandContext<'a> {
    /// Creates a context. `is_channel` says whether the event target is a channel.
    pub fn new(
        event: &'a Event,
        config: &'a Config,
        nickname: &'a str,
        transport: &'a dyn Transport,
        is_channel: bool,
    ) -> CommandContext<'a> {
        CommandContext {
            event,
            config,
            nickname,
            transport,
            is_channel,
        }
    }

    /// Where replies go: the channel for channel messages, the sender otherwise.
    pub fn reply_target(&self) -> &str {
        if self.is_channel {
            self.event.target()
        } else {
            &self.event.source.nick
        }
    }

    /// Sends a message to the reply target.
    pub fn reply(&self, text: &str) -> Result<()> {
        self.send(Command::PRIVMSG(self.reply_target().to_owned(), text.to_owned()))
    }

    /// Sends an arbitrary command.
    pub fn send(&self, command: Command) -> Result<()> {
        self.transport.send(command)
    }
}

/// The collaborator the router delegates user-facing behaviour to.
pub trait Plugins {
    /// Runs a command. `args[0]` is the command name, the rest its arguments.
    fn call_command(&self, ctx: &CommandContext, args: &[String]) -> Result<()>;

    /// Runs every regex hook whose pattern matches the message.
    fn call_regex_hooks(&self, ctx: &CommandContext) -> Result<()>;

    /// Runs every hook registered for exactly this message text.
    fn call_privmsg_hooks(&self, ctx: &CommandContext) -> Result<()>;

    /// Runs every hook whose text occurs in the message.
    fn call_includes_hooks(&self, ctx: &CommandContext) -> Result<()>;
}

/// Decides whether a caller may run a command.
pub trait Permissions {
    /// Whether `hostmask`, speaking in `target`, holds every permission in `required`.
    fn has_permission(&self, config: &Config, hostmask: &str, target: &str, required: &[String]) -> bool;
}

/// Commands with no requirements are open to everyone; anything else is reserved to the
/// configured owners.
#[derive(Clone, Copy, Debug, Default)]
pub struct OwnerPermissions;

impl Permissions for OwnerPermissions {
    fn has_permission(&self, config: &Config, hostmask: &str, _: &str, required: &[String]) -> bool {
        let nick = hostmask.split('!').next().unwrap_or(hostmask);
        required.is_empty() || config.is_owner(nick)
    }
}

/// A command or hook body. The slice holds the command arguments, the regex captures, or the
/// message text, depending on how the handler was registered.
pub type Handler = Box<dyn Fn(&CommandContext, &[String]) -> Result<()> + Send + Sync>;

/// A named command.
pub struct CommandDescriptor {
    /// The name the command is invoked by.
    pub name: String,
    /// Other names it answers to.
    pub aliases: Vec<String>,
    /// Permissions a caller must hold.
    pub permissions: Vec<String>,
    /// The command body.
    pub handler: Handler,
}

impl CommandDescriptor {
    /// Creates a command open to everyone.
    pub fn new<F>(name: &str, handler: F) -> CommandDescriptor
    where
        F: Fn(&CommandContext, &[String]) -> Result<()> + Send + Sync + 'static,
    {
        CommandDescriptor {
            name: name.to_owned(),
            aliases: vec![],
            permissions: vec![],
            handler: Box::new(handler),
        }
    }

    /// Adds an alias.
    pub fn alias(mut self, alias: &str) -> CommandDescriptor {
        self.aliases.push(alias.to_owned());
        self
    }

    /// Requires a permission.
    pub fn requires(mut self, permission: &str) -> CommandDescriptor {
        self.permissions.push(permission.to_owned());
        self
    }

    fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("permissions", &self.permissions)
            .finish()
    }
}

/// The stock [`Plugins`]: a fixed set of commands and hooks, with permission checks delegated
/// to a [`Permissions`] implementation.
///
/// ```
/// # extern crate irc_engine;
/// use irc_engine::client::plugins::{CommandDescriptor, OwnerPermissions, PluginRegistry};
///
/// # fn main() -> irc_engine::error::Result<()> {
/// let plugins = PluginRegistry::new(OwnerPermissions)
///     .command(CommandDescriptor::new("ping", |ctx, _| ctx.reply("pong")))
///     .regex_hook(r"^(?i)hello\b", |ctx, _| ctx.reply("hi!"))?;
/// # Ok(())
/// # }
/// ```
pub struct PluginRegistry {
    commands: Vec<CommandDescriptor>,
    regex_hooks: Vec<(Regex, Handler)>,
    privmsg_hooks: Vec<(String, Handler)>,
    includes_hooks: Vec<(String, Handler)>,
    permissions: Box<dyn Permissions + Send + Sync>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    pub fn new<P: Permissions + Send + Sync + 'static>(permissions: P) -> PluginRegistry {
        PluginRegistry {
            commands: vec![],
            regex_hooks: vec![],
            privmsg_hooks: vec![],
            includes_hooks: vec![],
            permissions: Box::new(permissions),
        }
    }

    /// Adds a command.
    pub fn command(mut self, descriptor: CommandDescriptor) -> PluginRegistry {
        self.commands.push(descriptor);
        self
    }

    /// Adds a hook run when `pattern` matches a message. The handler gets the capture groups.
    pub fn regex_hook<F>(mut self, pattern: &str, handler: F) -> Result<PluginRegistry>
    where
        F: Fn(&CommandContext, &[String]) -> Result<()> + Send + Sync + 'static,
    {
        let regex = Regex::new(pattern).map_err(|e| {
            Error::Configuration(format!("invalid hook pattern {:?}: {}", pattern, e))
        })?;
        self.regex_hooks.push((regex, Box::new(handler)));
        Ok(self)
    }

    /// Adds a hook run when a message is exactly `text`.
    pub fn privmsg_hook<F>(mut self, text: &str, handler: F) -> PluginRegistry
    where
        F: Fn(&CommandContext, &[String]) -> Result<()> + Send + Sync + 'static,
    {
        self.privmsg_hooks.push((text.to_owned(), Box::new(handler)));
        self
    }

    /// Adds a hook run when a message contains `text`.
    pub fn includes_hook<F>(mut self, text: &str, handler: F) -> PluginRegistry
    where
        F: Fn(&CommandContext, &[String]) -> Result<()> + Send + Sync + 'static,
    {
        self.includes_hooks.push((text.to_owned(), Box::new(handler)));
        self
    }

    /// Gets a command by name or alias.
    pub fn get(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.iter().find(|c| c.answers_to(name))
    }
}

fn message_text<'a>(ctx: &'a CommandContext) -> &'a str {
    ctx.event.arguments.last().map_or("", |s| &s[..])
}

/// Runs every handler, returning the first error after all have run.
fn run_all<'h, I>(ctx: &CommandContext, hooks: I) -> Result<()>
where
    I: IntoIterator<Item = (&'h Handler, Vec<String>)>,
{
    let mut first = None;
    for (handler, args) in hooks {
        if let Err(e) = handler(ctx, &args) {
            error!("hook failed: {}", e);
            first.get_or_insert(e);
        }
    }
    first.map_or(Ok(()), Err)
}

impl Plugins for PluginRegistry {
    fn call_command(&self, ctx: &CommandContext, args: &[String]) -> Result<()> {
        let name = match args.first() {
            Some(name) if !name.is_empty() => name,
            _ => return Ok(()),
        };
        let command = match self.get(name) {
            Some(command) => command,
            None => return ctx.reply(&format!("Invalid Command: {}", name)),
        };

        let hostmask = ctx.event.source.hostmask();
        if !self.permissions.has_permission(
            ctx.config,
            &hostmask,
            ctx.event.target(),
            &command.permissions,
        ) {
            ctx.reply(&format!("No permission to use command {}", name))?;
            return Err(Error::PermissionDenied {
                hostmask,
                command: name.clone(),
            });
        }

        debug!("{} runs {}", hostmask, command.name);
        (command.handler)(ctx, &args[1..])
    }

    fn call_regex_hooks(&self, ctx: &CommandContext) -> Result<()> {
        let text = message_text(ctx);
        run_all(
            ctx,
            self.regex_hooks.iter().filter_map(|(regex, handler)| {
                regex.captures(text).map(|caps| {
                    let groups: Vec<String> = caps
                        .iter()
                        .skip(1)
                        .map(|m| m.map_or(String::new(), |m| m.as_str().to_owned()))
                        .collect();
                    (handler, groups)
                })
            }),
        )
    }

    fn call_privmsg_hooks(&self, ctx: &CommandContext) -> Result<()> {
        let text = message_text(ctx);
        run_all(
            ctx,
            self.privmsg_hooks
                .iter()
                .filter(|(t, _)| t == text)
                .map(|(_, handler)| (handler, vec![text.to_owned()])),
        )
    }

    fn call_includes_hooks(&self, ctx: &CommandContext) -> Result<()> {
        let text = message_text(ctx);
        run_all(
            ctx,
            self.includes_hooks
                .iter()
                .filter(|(t, _)| text.contains(&t[..]))
                .map(|(_, handler)| (handler, vec![text.to_owned()])),
        )
    }
}

//! The Serenity crate we're using for the Discord API is designed around callbacks to handle
//! events.  However, this does not mesh well with our plugin framework here.  To resolve this,
//! `Handler` translates the callbacks into a distinct Event enum.

use crate::{
    command::{Command, CommandInvocation, Rejection},
    context::Context,
    log_error,
};
use serenity::all::{CommandInteraction, GuildId, Message, Ready, ShardStageUpdateEvent, UserId};

/// A Discord event
pub enum Event {
    Ready(Ready),
    Message(Message),
    Command(SlashCommand),
    GuildDelete {
        guild_id: GuildId,
        /// The guild is still ours but temporarily unreachable, e.g. a Discord outage
        unavailable: bool,
        name: Option<String>,
    },
    ShardStageUpdate(ShardStageUpdateEvent),
}

/// A slash command along with what it resolved to.  Resolution happens once, up front, so every
/// plugin sees the same answer.
pub struct SlashCommand {
    pub interaction: CommandInteraction,
    pub invocation: CommandInvocation,
    pub resolved: Result<Command, Rejection>,
}

impl SlashCommand {
    pub fn new(interaction: CommandInteraction, owner_id: UserId) -> Self {
        let invocation = CommandInvocation::from_interaction(&interaction);
        let resolved = Command::resolve(&invocation, owner_id);
        Self {
            interaction,
            invocation,
            resolved,
        }
    }
}

impl Event {
    // When an event occurs, iterate over all the plugins to see if any can/should handle it.
    pub async fn handle(self, ctx: Context<'_>) {
        for plugin in crate::plugin::plugins() {
            match plugin.handle(&ctx, &self).await {
                Ok(EventHandled::Yes) => return,
                Ok(EventHandled::No) => continue,
                Err(err) => log_error!("Error in plugin {}: {}", plugin.name(), err),
            }
        }
    }

    /// A slash command that passed every check.
    pub fn is_slash_cmd(&self) -> Option<(&CommandInteraction, &Command)> {
        match self {
            Event::Command(SlashCommand {
                interaction,
                resolved: Ok(command),
                ..
            }) => Some((interaction, command)),
            _ => None,
        }
    }

    /// A message posted in a guild by a human.
    pub fn is_guild_msg(&self) -> Option<(&Message, GuildId)> {
        match self {
            Event::Message(msg) if !msg.author.bot => msg.guild_id.map(|guild_id| (msg, guild_id)),
            _ => None,
        }
    }
}

pub enum EventHandled {
    Yes,
    No,
}

use crate::{event::*, log_event, logging::*, plugin::*};
use anyhow::Result;
use serenity::all::ConnectionStage;

/// Prints debug information about event to stdout
pub struct Debug;

#[serenity::async_trait]
impl Plugin for Debug {
    fn name(&self) -> &'static str {
        "debug"
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        match event {
            Event::Ready(ready) => {
                log_event!(
                    "Connected to {} server(s) as {}",
                    ready.guilds.len(),
                    ready.user.color(),
                );
            }
            Event::Message(msg) => {
                log_event!(
                    "{}{}{}{}{}{} {}",
                    msg.guild_id.color(ctx.cache),
                    Glue {}.color(),
                    msg.channel_id.color(ctx.http).await,
                    Glue {}.color(),
                    msg.author.color(),
                    Glue {}.color(),
                    msg.content,
                );
            }
            Event::Command(command) => {
                log_event!(
                    "{}{}{}{}{} used {}",
                    command.invocation.guild_id.color(ctx.cache),
                    Glue {}.color(),
                    command.interaction.channel_id.color(ctx.http).await,
                    Glue {}.color(),
                    command.interaction.user.color(),
                    command.invocation.color(),
                );
            }
            Event::GuildDelete {
                guild_id,
                unavailable: true,
                ..
            } => {
                log_event!("Server {} became unavailable", guild_id.color());
            }
            Event::GuildDelete { guild_id, name, .. } => {
                log_event!(
                    "Removed from server {} ({})",
                    name.as_deref().unwrap_or("<unknown-guild>"),
                    guild_id.color(),
                );
            }
            Event::ShardStageUpdate(update) => match update.new {
                ConnectionStage::Connected | ConnectionStage::Disconnected => log_event!(
                    "Shard {} went from {:?} to {:?}",
                    update.shard_id.0,
                    update.old,
                    update.new
                ),
                // Handshake steps in between aren't interesting
                _ => {}
            },
        }

        Ok(EventHandled::No)
    }
}

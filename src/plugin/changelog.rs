use crate::{
    command::Command, embed, event::*, helper::*, log_error, log_internal, plugin::*,
    routing::RemoveBindingOutcome,
};
use anyhow::{anyhow, Result};
use serenity::all::Mentionable;

/// `/bot changelogs set|remove`: where connection errors get reported
pub struct Changelog;

#[serenity::async_trait]
impl Plugin for Changelog {
    fn name(&self) -> &'static str {
        "changelog"
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((interaction, command)) = event.is_slash_cmd() else {
            return Ok(EventHandled::No);
        };
        let guild_id = interaction
            .guild_id
            .ok_or_else(|| anyhow!("Changelog command outside of a server"))?;

        let embed = match command {
            Command::ChangelogSet(channel_id) => {
                let result = ctx
                    .pstate
                    .write()
                    .await
                    .set_changelog(guild_id, *channel_id)
                    .await;
                match result {
                    Ok(()) => {
                        log_internal!(
                            "Changelog channel for guild {} is now {}",
                            guild_id,
                            channel_id
                        );
                        embed::success(
                            ctx.cfg,
                            "✅ Changelog Channel Set",
                            format!("Changelog channel has been set to {}", channel_id.mention()),
                        )
                    }
                    Err(e) => {
                        log_error!("Error saving changelog channels: {}", e);
                        embed::storage_failure(ctx.cfg)
                    }
                }
            }
            Command::ChangelogRemove(channel_id) => {
                let result = ctx
                    .pstate
                    .write()
                    .await
                    .remove_changelog(guild_id, *channel_id)
                    .await;
                match result {
                    Err(e) => {
                        log_error!("Error saving changelog channels: {}", e);
                        embed::storage_failure(ctx.cfg)
                    }
                    Ok(RemoveBindingOutcome::Removed) => embed::success(
                        ctx.cfg,
                        "✅ Changelog Channel Removed",
                        format!("Changelog channel {} has been removed", channel_id.mention()),
                    ),
                    Ok(RemoveBindingOutcome::NotFound) => embed::failure(
                        ctx.cfg,
                        "Not Found",
                        format!("{} is not set as a changelog channel.", channel_id.mention()),
                    ),
                }
            }
            _ => return Ok(EventHandled::No),
        };

        interaction.reply_embed(ctx, embed, true).await?;
        Ok(EventHandled::Yes)
    }
}

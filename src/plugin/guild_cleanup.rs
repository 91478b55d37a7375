use crate::{event::*, log_internal, logging::*, plugin::*};
use anyhow::Result;

/// Forgets a server's channels once the bot has been removed from it
pub struct GuildCleanup;

#[serenity::async_trait]
impl Plugin for GuildCleanup {
    fn name(&self) -> &'static str {
        "guild_cleanup"
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Event::GuildDelete {
            guild_id,
            unavailable,
            name,
        } = event
        else {
            return Ok(EventHandled::No);
        };
        // An outage, not a removal.  The server comes back on its own.
        if *unavailable {
            return Ok(EventHandled::Yes);
        }

        ctx.pstate.write().await.purge_guild(*guild_id).await?;
        log_internal!(
            "Cleaned up data for server {} ({})",
            name.as_deref().unwrap_or("<unknown-guild>"),
            guild_id.color(),
        );
        Ok(EventHandled::Yes)
    }
}

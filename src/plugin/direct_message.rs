use crate::{embed, event::*, helper::*, plugin::*};
use anyhow::Result;

/// Turns away messages sent to the bot directly
pub struct DirectMessage;

#[serenity::async_trait]
impl Plugin for DirectMessage {
    fn name(&self) -> &'static str {
        "direct_message"
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Event::Message(msg) = event else {
            return Ok(EventHandled::No);
        };
        if msg.guild_id.is_some() {
            return Ok(EventHandled::No);
        }

        let embed = embed::failure(
            ctx.cfg,
            "DM Not Supported",
            "This bot only works in servers, not in direct messages. Please use the bot in a \
             server where it has been added.",
        );
        msg.reply_embed(ctx, embed).await?;
        Ok(EventHandled::Yes)
    }
}

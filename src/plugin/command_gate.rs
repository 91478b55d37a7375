use crate::{embed, event::*, helper::*, plugin::*};
use anyhow::Result;

/// Answers slash commands that were refused during resolution.  Nothing downstream ever sees
/// them.
pub struct CommandGate;

#[serenity::async_trait]
impl Plugin for CommandGate {
    fn name(&self) -> &'static str {
        "command_gate"
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Event::Command(SlashCommand {
            interaction,
            resolved: Err(rejection),
            ..
        }) = event
        else {
            return Ok(EventHandled::No);
        };

        interaction
            .reply_embed(ctx, embed::rejection(ctx.cfg, rejection), true)
            .await?;
        Ok(EventHandled::Yes)
    }
}

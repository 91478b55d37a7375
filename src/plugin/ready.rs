use crate::{event::*, log_error, log_internal, plugin::*};
use anyhow::Result;
use serenity::all::{ActivityData, Command};

/// Announces presence and registers slash commands once the connection to Discord is ready.
pub struct Ready;

#[serenity::async_trait]
impl Plugin for Ready {
    fn name(&self) -> &'static str {
        "ready"
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Event::Ready(_) = event else {
            return Ok(EventHandled::No);
        };

        let general = &ctx.cfg.general;
        let activity = general.activity.as_deref().map(ActivityData::playing);
        ctx.cache_http.set_presence(activity, general.status);

        log_internal!("Registering slash commands... ");
        match Command::set_global_commands(ctx.cache_http, crate::command::definitions()).await {
            Ok(commands) => log_internal!(
                "Registering slash commands... done ({} commands)",
                commands.len()
            ),
            // Commands registered by an earlier run keep working, so stay up.
            Err(e) => log_error!("Error registering slash commands: {}", e),
        }

        Ok(EventHandled::Yes)
    }
}

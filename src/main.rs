mod command;
mod config;
mod context;
mod embed;
mod event;
mod handler;
mod helper;
mod image_api;
mod llm;
mod logging;
mod persistent_state;
mod plugin;
mod routing;
mod volatile_state;

use serenity::{all::GatewayIntents, Client};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = crate::config::Config::load().await?;
    let token = cfg.general.discord_token.clone();
    let pstate = crate::persistent_state::PersistentState::load().await?;
    let vstate = crate::volatile_state::VolatileState::new();
    let handler = Arc::new(handler::Handler::new(cfg, pstate, vstate));

    // Things we want discord to tell us about.  Direct messages are only received so they can be
    // turned away.
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&token, intents)
        .event_handler_arc(handler.clone())
        .await?;
    handler
        .attach_shard_manager(client.shard_manager.clone())
        .await;

    if let Err(err) = client.start().await {
        log_error!("Discord client stopped: {}", err);
        handler.report_fatal(&client.http, &err).await;
        return Err(err.into());
    }
    Ok(())
}

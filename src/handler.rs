use crate::{
    config::Config,
    context::Context,
    event::{Event, SlashCommand},
    persistent_state::PersistentState,
    plugin::connection_error,
    volatile_state::VolatileState,
};
use serenity::all::{
    Guild, Http, Interaction, Message, Ready, ShardManager, ShardStageUpdateEvent,
    UnavailableGuild,
};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Discord event handler
pub struct Handler {
    cfg: Config,
    pstate: RwLock<PersistentState>,
    vstate: RwLock<VolatileState>,
}

impl<'a> Handler {
    pub fn new(cfg: Config, pstate: PersistentState, vstate: VolatileState) -> Self {
        Self {
            cfg,
            pstate: RwLock::new(pstate),
            vstate: RwLock::new(vstate),
        }
    }

    fn ctx(&'a self, discord_ctx: &'a serenity::all::Context) -> Context<'a> {
        Context {
            cfg: &self.cfg,
            pstate: &self.pstate,
            vstate: &self.vstate,
            cache: &discord_ctx.cache,
            http: &discord_ctx.http,
            cache_http: discord_ctx,
            shard_id: discord_ctx.shard_id,
        }
    }

    pub async fn attach_shard_manager(&self, shard_manager: Arc<ShardManager>) {
        self.vstate.write().await.shard_manager = Some(shard_manager);
    }

    /// The client stopped for good.  Tell the changelog channels before going down.
    pub async fn report_fatal(&self, http: &Http, err: &serenity::Error) {
        let report = connection_error::ErrorReport::new(err.to_string(), format!("{:#?}", err));
        let channels = self.pstate.read().await.changelog_channels();
        connection_error::relay(http, &self.cfg, &channels, &report).await;
    }
}

#[serenity::async_trait]
impl serenity::all::EventHandler for Handler {
    async fn ready(&self, discord_ctx: serenity::all::Context, ready: Ready) {
        Event::Ready(ready).handle(self.ctx(&discord_ctx)).await;
    }

    async fn message(&self, discord_ctx: serenity::all::Context, msg: Message) {
        Event::Message(msg).handle(self.ctx(&discord_ctx)).await;
    }

    async fn interaction_create(&self, discord_ctx: serenity::all::Context, interaction: Interaction) {
        let Interaction::Command(interaction) = interaction else {
            return;
        };
        let command = SlashCommand::new(interaction, self.cfg.general.owner_id);
        Event::Command(command)
            .handle(self.ctx(&discord_ctx))
            .await;
    }

    async fn guild_delete(
        &self,
        discord_ctx: serenity::all::Context,
        incomplete: UnavailableGuild,
        full: Option<Guild>,
    ) {
        Event::GuildDelete {
            guild_id: incomplete.id,
            unavailable: incomplete.unavailable,
            name: full.map(|guild| guild.name),
        }
        .handle(self.ctx(&discord_ctx))
        .await;
    }

    async fn shard_stage_update(
        &self,
        discord_ctx: serenity::all::Context,
        event: ShardStageUpdateEvent,
    ) {
        Event::ShardStageUpdate(event)
            .handle(self.ctx(&discord_ctx))
            .await;
    }
}

use crate::{
    command::CHAT_PERMISSIONS,
    embed,
    event::*,
    helper::*,
    llm::ChatRequest,
    log_error, log_internal,
    logging::*,
    plugin::*,
    routing::ChannelKind,
};
use anyhow::Result;

/// Answers every message in an AI channel with the text generation API
pub struct AiChat;

#[serenity::async_trait]
impl Plugin for AiChat {
    fn name(&self) -> &'static str {
        "ai_chat"
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((msg, guild_id)) = event.is_guild_msg() else {
            return Ok(EventHandled::No);
        };
        let kind = ctx.pstate.read().await.classify(guild_id, msg.channel_id);
        if kind != Some(ChannelKind::Ai) {
            return Ok(EventHandled::No);
        }

        let permitted = bot_permissions_in(ctx, guild_id, msg.channel_id)
            .is_some_and(|held| held.contains(CHAT_PERMISSIONS));
        if !permitted {
            log_internal!("Missing permissions to chat here, ignoring");
            return Ok(EventHandled::Yes);
        }

        let target = ReplyTarget::Message(msg);
        let mut placeholder = target.placeholder(ctx, "Waiting...").await?;

        log_internal!("Answering {}", msg.author.color());
        let reply = match ChatRequest::new(&msg.content).post(&ctx.cfg.text_api).await {
            Ok(reply) => reply,
            Err(e) => {
                log_error!("Error getting AI response: {}", e);
                let embed =
                    embed::service_failure(ctx.cfg, "AI Error", "processing your request");
                placeholder.edit_embed(ctx, embed).await?;
                return Ok(EventHandled::Yes);
            }
        };

        let mut chunks = MessageChunks::new(&reply, MESSAGE_LIMIT);
        if let Some(first) = chunks.next() {
            placeholder.edit_content(ctx, first).await?;
        }
        for chunk in chunks {
            target.follow_up(ctx, chunk).await?;
        }

        Ok(EventHandled::Yes)
    }
}

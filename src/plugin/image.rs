use crate::{
    command::{Command, IMAGE_PERMISSIONS},
    config::Config,
    embed,
    event::*,
    helper::*,
    image_api::{self, ImageResponse},
    log_error, log_internal,
    logging::*,
    plugin::*,
    routing::ChannelKind,
};
use anyhow::Result;
use serenity::all::{CreateEmbed, CreateEmbedFooter, User};

/// Generates images from `/image generate` prompts and from every message in an imagine channel.
pub struct Image;

#[serenity::async_trait]
impl Plugin for Image {
    fn name(&self) -> &'static str {
        "image"
    }

    fn usage(&self) -> &'static [(&'static str, &'static str)] {
        &[(
            "/image generate <prompt>",
            "Generate an image from a text prompt",
        )]
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        if let Some((interaction, Command::ImageGenerate { prompt })) = event.is_slash_cmd() {
            generate(ctx, ReplyTarget::Interaction(interaction), prompt).await?;
            return Ok(EventHandled::Yes);
        }

        let Some((msg, guild_id)) = event.is_guild_msg() else {
            return Ok(EventHandled::No);
        };
        let kind = ctx.pstate.read().await.classify(guild_id, msg.channel_id);
        if kind != Some(ChannelKind::Imagine) {
            return Ok(EventHandled::No);
        }

        // Without these the reply would fail anyway.  Stay quiet.
        let permitted = bot_permissions_in(ctx, guild_id, msg.channel_id)
            .is_some_and(|held| held.contains(IMAGE_PERMISSIONS));
        if !permitted {
            log_internal!("Missing permissions to generate images here, ignoring");
            return Ok(EventHandled::Yes);
        }

        generate(ctx, ReplyTarget::Message(msg), &msg.content).await?;
        Ok(EventHandled::Yes)
    }
}

async fn generate(ctx: &Context<'_>, target: ReplyTarget<'_>, prompt: &str) -> Result<()> {
    // If even the placeholder can't be sent there is nowhere to report to.
    let mut placeholder = target.placeholder(ctx, "Generating image...").await?;

    log_internal!("Generating image for {}", target.requester().color());
    let embed = match image_api::generate(&ctx.cfg.image_api, prompt).await {
        Ok(response) => result_embed(ctx.cfg, prompt, &response, target.requester()),
        Err(e) => {
            log_error!("Error generating image: {}", e);
            embed::service_failure(ctx.cfg, "Image Generation Error", "generating the image")
        }
    };

    placeholder.edit_embed(ctx, embed).await
}

fn result_embed(cfg: &Config, prompt: &str, response: &ImageResponse, requester: &User) -> CreateEmbed {
    let footer = CreateEmbedFooter::new(format!("Requested by {}", requester.name))
        .icon_url(requester.face());

    let mut embed = embed::success(
        cfg,
        response.title(),
        format!(
            "**Prompt:** `{}`\n**Success:** `{}`",
            prompt,
            response.success_label()
        ),
    )
    .footer(footer);
    if let Some(image) = &response.image {
        embed = embed.image(image);
    }
    embed
}

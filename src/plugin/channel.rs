use crate::{
    command::Command,
    config::Config,
    embed,
    event::*,
    helper::*,
    log_error,
    plugin::*,
    routing::{ChannelKind, DisableOutcome, EnableOutcome},
};
use anyhow::{anyhow, Result};
use serenity::all::{ChannelId, CreateEmbed, Mentionable};

/// `/channel ...`: choose which channels the bot chats or draws in
pub struct Channel;

#[serenity::async_trait]
impl Plugin for Channel {
    fn name(&self) -> &'static str {
        "channel"
    }

    fn usage(&self) -> &'static [(&'static str, &'static str)] {
        &[
            (
                "/channel ai set/remove <channel>",
                "Set or remove AI chat channels",
            ),
            (
                "/channel imagine set/remove <channel>",
                "Set or remove image generation channels",
            ),
            (
                "/channel setting view",
                "View current channel settings",
            ),
        ]
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((interaction, command)) = event.is_slash_cmd() else {
            return Ok(EventHandled::No);
        };
        let guild_id = interaction
            .guild_id
            .ok_or_else(|| anyhow!("Channel command outside of a server"))?;

        // Write lock held across check, mutation and save so concurrent commands can't interleave.
        let (embed, ephemeral) = match command {
            Command::ChannelSet(kind, channel_id) => {
                let result = ctx
                    .pstate
                    .write()
                    .await
                    .enable(*kind, guild_id, *channel_id)
                    .await;
                match result {
                    Ok(outcome) => enabled_embed(ctx.cfg, *kind, *channel_id, outcome),
                    Err(e) => {
                        log_error!("Error saving channel settings: {}", e);
                        (embed::storage_failure(ctx.cfg), true)
                    }
                }
            }
            Command::ChannelRemove(kind, channel_id) => {
                let result = ctx
                    .pstate
                    .write()
                    .await
                    .disable(*kind, guild_id, *channel_id)
                    .await;
                match result {
                    Ok(outcome) => disabled_embed(ctx.cfg, *kind, *channel_id, outcome),
                    Err(e) => {
                        log_error!("Error saving channel settings: {}", e);
                        (embed::storage_failure(ctx.cfg), true)
                    }
                }
            }
            Command::ChannelList(kind) => {
                let pstate = ctx.pstate.read().await;
                let embed = list_embed(ctx.cfg, *kind, pstate.list(*kind, guild_id));
                (embed, false)
            }
            _ => return Ok(EventHandled::No),
        };

        interaction.reply_embed(ctx, embed, ephemeral).await?;
        Ok(EventHandled::Yes)
    }
}

fn enabled_embed(
    cfg: &Config,
    kind: ChannelKind,
    channel_id: ChannelId,
    outcome: EnableOutcome,
) -> (CreateEmbed, bool) {
    let channel = channel_id.mention();
    match outcome {
        EnableOutcome::Added => (
            embed::success(
                cfg,
                format!("✅ {} Channel Set", kind.title()),
                format!("Channel {} has been set for {}.", channel, kind.purpose()),
            ),
            false,
        ),
        EnableOutcome::AlreadyPresent => (
            embed::failure(
                cfg,
                "Already Set",
                format!("Channel {} is already set for {}.", channel, kind.purpose()),
            ),
            true,
        ),
        EnableOutcome::InOtherSet(other) => (
            embed::failure(
                cfg,
                "Already In Use",
                format!(
                    "Channel {} is already set for {}. Remove it from there first.",
                    channel,
                    other.purpose()
                ),
            ),
            true,
        ),
    }
}

fn disabled_embed(
    cfg: &Config,
    kind: ChannelKind,
    channel_id: ChannelId,
    outcome: DisableOutcome,
) -> (CreateEmbed, bool) {
    let channel = channel_id.mention();
    match outcome {
        DisableOutcome::Removed => (
            embed::success(
                cfg,
                format!("✅ {} Channel Removed", kind.title()),
                format!("Channel {} has been removed from {}.", channel, kind.purpose()),
            ),
            false,
        ),
        DisableOutcome::NotPresent => (
            embed::failure(
                cfg,
                "Not Found",
                format!("Channel {} is not set for {}.", channel, kind.purpose()),
            ),
            true,
        ),
    }
}

fn list_embed(cfg: &Config, kind: ChannelKind, channels: &[ChannelId]) -> CreateEmbed {
    let icon = match kind {
        ChannelKind::Ai => "🤖",
        ChannelKind::Imagine => "🎨",
    };
    let title = format!("{} {} Channel Settings", icon, kind.title());

    if channels.is_empty() {
        return embed::success(
            cfg,
            title,
            format!("No {} channels set in this server.", kind.title()),
        );
    }

    let lines: Vec<String> = channels
        .iter()
        .map(|channel_id| channel_id.mention().to_string())
        .collect();
    embed::success(
        cfg,
        title,
        format!("**{} Channels:**\n{}", kind.title(), lines.join("\n")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::tests::{as_json, test_config};

    #[test]
    fn list_shows_mentions_in_order() {
        let cfg = test_config();
        let channels = [ChannelId::new(20), ChannelId::new(10)];

        let json = as_json(&list_embed(&cfg, ChannelKind::Imagine, &channels));

        assert_eq!(json["title"], "🎨 Imagine Channel Settings");
        assert_eq!(
            json["description"],
            "**Imagine Channels:**\n<#20>\n<#10>"
        );
    }

    #[test]
    fn empty_list_says_so() {
        let cfg = test_config();
        let json = as_json(&list_embed(&cfg, ChannelKind::Ai, &[]));
        assert_eq!(json["description"], "No AI channels set in this server.");
    }

    #[test]
    fn outcomes_have_distinct_replies() {
        let cfg = test_config();
        let channel = ChannelId::new(7);
        let titles: Vec<serde_json::Value> = [
            enabled_embed(&cfg, ChannelKind::Ai, channel, EnableOutcome::Added),
            enabled_embed(&cfg, ChannelKind::Ai, channel, EnableOutcome::AlreadyPresent),
            enabled_embed(
                &cfg,
                ChannelKind::Ai,
                channel,
                EnableOutcome::InOtherSet(ChannelKind::Imagine),
            ),
            disabled_embed(&cfg, ChannelKind::Ai, channel, DisableOutcome::NotPresent),
        ]
        .iter()
        .map(|(embed, _)| as_json(embed)["title"].clone())
        .collect();

        assert_eq!(
            titles,
            [
                "✅ AI Channel Set",
                "❌ Already Set",
                "❌ Already In Use",
                "❌ Not Found"
            ]
        );
    }

    #[test]
    fn only_failures_are_ephemeral() {
        let cfg = test_config();
        let channel = ChannelId::new(7);
        let (_, ephemeral) =
            disabled_embed(&cfg, ChannelKind::Imagine, channel, DisableOutcome::Removed);
        assert!(!ephemeral);
        let (embed, ephemeral) =
            disabled_embed(&cfg, ChannelKind::Imagine, channel, DisableOutcome::NotPresent);
        assert!(ephemeral);
        assert_eq!(
            as_json(&embed)["description"],
            "Channel <#7> is not set for image generation."
        );
    }
}

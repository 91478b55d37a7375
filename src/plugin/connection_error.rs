//! Relays gateway failures to every changelog channel so server owners hear about outages.

use crate::{config::Config, event::*, log_error, log_internal, plugin::*};
use anyhow::Result;
use serenity::all::{
    ChannelId, ConnectionStage, CreateEmbed, CreateMessage, GuildId, Http, Timestamp,
};
use std::time::Duration;

/// Longest text kept per embed field, in characters
const FIELD_LIMIT: usize = 950;
const TRUNCATION_NOTE: &str = "... view console for details";
/// How long a disconnected shard gets to resume before the outage is reported
const RECONNECT_GRACE: Duration = Duration::from_secs(30);

pub struct ConnectionError;

#[serenity::async_trait]
impl Plugin for ConnectionError {
    fn name(&self) -> &'static str {
        "connection_error"
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Event::ShardStageUpdate(update) = event else {
            return Ok(EventHandled::No);
        };
        if update.new != ConnectionStage::Disconnected {
            return Ok(EventHandled::No);
        }

        log_error!("Shard {} lost its gateway connection", update.shard_id.0);
        // Each event runs on its own task, so waiting here holds up nothing else.
        tokio::time::sleep(RECONNECT_GRACE).await;
        let stage = ctx.vstate.read().await.shard_stage(update.shard_id).await;
        if !still_down(stage) {
            log_internal!("Shard {} reconnected, not reporting", update.shard_id.0);
            return Ok(EventHandled::Yes);
        }

        let report = ErrorReport::new(
            format!("Shard {} disconnected from the gateway", update.shard_id.0),
            format!("{:#?}", update),
        );
        let channels = ctx.pstate.read().await.changelog_channels();
        relay(ctx.http, ctx.cfg, &channels, &report).await;
        Ok(EventHandled::Yes)
    }
}

/// A shard without a runner never came back either.
fn still_down(stage: Option<ConnectionStage>) -> bool {
    stage != Some(ConnectionStage::Connected)
}

/// A failure as shown to changelog channels, trimmed to fit an embed
#[derive(Debug, PartialEq)]
pub struct ErrorReport {
    pub error: String,
    pub detail: String,
}

impl ErrorReport {
    pub fn new(error: String, detail: String) -> Self {
        Self {
            error: truncate(error),
            detail: truncate(detail),
        }
    }

    fn embed(&self, cfg: &Config) -> CreateEmbed {
        CreateEmbed::new()
            .title("🚨・A websocket connection encountered an error")
            .field("Error", format!("```{}```", self.error), false)
            .field("Details", format!("```{}```", self.detail), false)
            .color(cfg.embed.error_color)
            .timestamp(Timestamp::now())
    }
}

fn truncate(mut text: String) -> String {
    if let Some((cut, _)) = text.char_indices().nth(FIELD_LIMIT) {
        text.truncate(cut);
        text.push_str(TRUNCATION_NOTE);
    }
    text
}

/// Post the report to each channel.  Failures are logged and otherwise ignored; there is nobody
/// left to tell.
pub async fn relay(
    http: &Http,
    cfg: &Config,
    channels: &[(GuildId, ChannelId)],
    report: &ErrorReport,
) {
    if channels.is_empty() {
        return;
    }

    log_internal!("Relaying connection error to {} channel(s)", channels.len());
    let embed = report.embed(cfg);
    for (guild_id, channel_id) in channels {
        let message = CreateMessage::new().embed(embed.clone());
        if let Err(e) = channel_id.send_message(http, message).await {
            log_error!(
                "Failed to send error log to changelog channel in guild {}: {}",
                guild_id,
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::tests::{as_json, test_config};

    #[test]
    fn only_shards_that_stay_down_are_reported() {
        assert!(!still_down(Some(ConnectionStage::Connected)));
        assert!(still_down(Some(ConnectionStage::Disconnected)));
        assert!(still_down(Some(ConnectionStage::Connecting)));
        assert!(still_down(Some(ConnectionStage::Resuming)));
        assert!(still_down(None));
    }

    #[test]
    fn short_reports_are_kept_whole() {
        let report = ErrorReport::new("boom".to_owned(), "trace".to_owned());
        assert_eq!(report.error, "boom");
        assert_eq!(report.detail, "trace");
    }

    #[test]
    fn long_reports_are_truncated_with_a_note() {
        let report = ErrorReport::new("e".repeat(2000), "ü".repeat(FIELD_LIMIT + 1));

        assert_eq!(report.error, format!("{}{}", "e".repeat(FIELD_LIMIT), TRUNCATION_NOTE));
        assert!(report.detail.ends_with(TRUNCATION_NOTE));
        assert_eq!(
            report.detail.trim_end_matches(TRUNCATION_NOTE).chars().count(),
            FIELD_LIMIT
        );
    }

    #[test]
    fn exactly_the_limit_is_not_truncated() {
        let report = ErrorReport::new("x".repeat(FIELD_LIMIT), String::new());
        assert_eq!(report.error.len(), FIELD_LIMIT);
    }

    #[test]
    fn embed_has_error_and_details_fields() {
        let cfg = test_config();
        let report = ErrorReport::new("boom".to_owned(), "trace".to_owned());

        let json = as_json(&report.embed(&cfg));

        assert_eq!(json["color"], cfg.embed.error_color);
        assert_eq!(json["fields"][0]["name"], "Error");
        assert_eq!(json["fields"][0]["value"], "```boom```");
        assert_eq!(json["fields"][1]["name"], "Details");
        assert_eq!(json["fields"][1]["value"], "```trace```");
    }
}

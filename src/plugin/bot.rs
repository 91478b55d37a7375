use crate::{
    command::Command, config::Config, embed, event::*, helper::*, log_error, log_internal,
    plugin::*, routing::ChannelKind,
};
use anyhow::Result;
use serenity::all::{
    Cache, CommandInteraction, CreateEmbed, CreateEmbedFooter, CreateMessage, GuildId,
    InteractionId, MessageId, UserId,
};

/// Permissions requested by the invite link
const INVITE_PERMISSIONS: u64 = 388160;
/// How many servers `/bot serverlist` shows
const SERVER_LIST_LENGTH: usize = 10;

/// `/bot ...`: information about the bot and owner tools
pub struct Bot;

#[serenity::async_trait]
impl Plugin for Bot {
    fn name(&self) -> &'static str {
        "bot"
    }

    fn usage(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("/bot ping", "Check bot latency"),
            ("/bot uptime", "Show bot uptime"),
            ("/bot info", "Show bot information"),
            ("/bot stats", "Show bot statistics"),
            ("/bot invite", "Get bot invite link"),
            ("/bot support", "Get support server link"),
            ("/bot vote", "Vote for the bot"),
            ("/bot feedback <message>", "Send feedback to developers"),
        ]
    }

    async fn handle(&self, ctx: &Context, event: &Event) -> Result<EventHandled> {
        let Some((interaction, command)) = event.is_slash_cmd() else {
            return Ok(EventHandled::No);
        };

        let cfg = ctx.cfg;
        let bot_id = ctx.cache.current_user().id;
        let (embed, ephemeral) = match command {
            Command::BotPing => {
                ping(ctx, interaction).await?;
                return Ok(EventHandled::Yes);
            }
            Command::BotUptime => {
                let uptime = ctx.vstate.read().await.uptime();
                (
                    embed::success(cfg, "⏰ Bot Uptime", uptime.to_string()),
                    false,
                )
            }
            Command::BotInfo => (info(ctx), false),
            Command::BotStats => {
                let (ai, imagine) = {
                    let pstate = ctx.pstate.read().await;
                    (
                        pstate.total(ChannelKind::Ai),
                        pstate.total(ChannelKind::Imagine),
                    )
                };
                let memory = ctx.vstate.write().await.memory_usage();
                (
                    stats(cfg, CacheCounts::of(ctx.cache), ai, imagine, memory),
                    false,
                )
            }
            Command::BotHelp => (help(cfg, &crate::plugin::usage()), false),
            Command::BotInvite => (
                embed::success(
                    cfg,
                    "🔗 Invite Bot",
                    format!(
                        "[Click here to invite the bot to your server]({})",
                        invite_link(bot_id)
                    ),
                ),
                false,
            ),
            Command::BotSupport => (
                embed::success(
                    cfg,
                    "🆘 Support Server",
                    format!(
                        "Need help? Join our support server!\n\n[Click here to join]({})",
                        cfg.links.support_server
                    ),
                ),
                false,
            ),
            Command::BotVote => (
                embed::success(
                    cfg,
                    "🗳️ Vote for the Bot",
                    format!(
                        "Help support the bot by voting!\n\n[Click here to vote]({})",
                        vote_link(bot_id)
                    ),
                ),
                false,
            ),
            Command::BotLeave { server_id } => (leave(ctx, server_id).await, true),
            Command::BotServerList => {
                let servers = ServerSummary::all(ctx.cache);
                (server_list(cfg, &servers), true)
            }
            Command::BotFeedback { message } => (feedback(ctx, interaction, message).await, true),
            _ => return Ok(EventHandled::No),
        };

        interaction.reply_embed(ctx, embed, ephemeral).await?;
        Ok(EventHandled::Yes)
    }
}

async fn ping(ctx: &Context<'_>, interaction: &CommandInteraction) -> Result<()> {
    let mut placeholder = ReplyTarget::Interaction(interaction)
        .placeholder(ctx, "Pinging...")
        .await?;
    let sent = interaction.get_response(ctx.http).await?;

    let round_trip = latency_ms(interaction.id, sent.id);
    let gateway = match ctx.vstate.read().await.gateway_latency(ctx.shard_id).await {
        Some(latency) => format!("{}ms", latency.as_millis()),
        None => "N/A".to_owned(),
    };

    let embed = embed::info(ctx.cfg, "🏓 Pong!")
        .field("Bot Latency", format!("{}ms", round_trip), true)
        .field("API Latency", gateway, true);
    placeholder.edit_embed(ctx, embed).await
}

/// Milliseconds between the creation of two snowflakes
fn latency_ms(request: InteractionId, reply: MessageId) -> u64 {
    // The upper 42 bits of a snowflake are milliseconds since the Discord epoch.
    let created = |snowflake: u64| snowflake >> 22;
    created(reply.get()).saturating_sub(created(request.get()))
}

fn invite_link(bot_id: UserId) -> String {
    format!(
        "https://discord.com/api/oauth2/authorize?client_id={}&permissions={}&scope=bot%20applications.commands",
        bot_id, INVITE_PERMISSIONS
    )
}

fn vote_link(bot_id: UserId) -> String {
    format!("https://top.gg/bot/{}/vote", bot_id)
}

struct CacheCounts {
    servers: usize,
    users: usize,
    channels: usize,
}

impl CacheCounts {
    fn of(cache: &Cache) -> Self {
        let channels = cache
            .guilds()
            .into_iter()
            .filter_map(|guild_id| cache.guild(guild_id).map(|guild| guild.channels.len()))
            .sum();
        Self {
            servers: cache.guild_count(),
            users: cache.user_count(),
            channels,
        }
    }
}

fn info(ctx: &Context) -> CreateEmbed {
    let counts = CacheCounts::of(ctx.cache);
    let (tag, id, avatar) = {
        let me = ctx.cache.current_user();
        (me.tag(), me.id, me.face())
    };

    embed::info(ctx.cfg, "🤖 Bot Information")
        .field("Bot Name", tag, true)
        .field("Bot ID", id.to_string(), true)
        .field("Servers", counts.servers.to_string(), true)
        .field("Users", counts.users.to_string(), true)
        .field("Channels", counts.channels.to_string(), true)
        .field("Version", env!("CARGO_PKG_VERSION"), true)
        .thumbnail(avatar)
}

fn stats(
    cfg: &Config,
    counts: CacheCounts,
    ai: usize,
    imagine: usize,
    memory: Option<u64>,
) -> CreateEmbed {
    embed::info(cfg, "📊 Bot Statistics")
        .field("Total Servers", counts.servers.to_string(), true)
        .field("Total Users", counts.users.to_string(), true)
        .field("Total Channels", counts.channels.to_string(), true)
        .field("AI Channels", ai.to_string(), true)
        .field("Imagine Channels", imagine.to_string(), true)
        .field("Memory Usage", megabytes(memory), true)
}

/// Rounded to whole MiB
fn megabytes(bytes: Option<u64>) -> String {
    match bytes {
        Some(bytes) => format!("{} MB", (bytes as f64 / 1024.0 / 1024.0).round() as u64),
        None => "N/A".to_owned(),
    }
}

fn help(cfg: &Config, entries: &[(&str, &str)]) -> CreateEmbed {
    embed::success(cfg, "📖 Bot Help", "Here are all the available commands:").fields(
        entries
            .iter()
            .map(|(usage, description)| (*usage, *description, false)),
    )
}

/// Zero and garbage are both "no such server".
fn parse_server_id(server_id: &str) -> Option<GuildId> {
    server_id
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(GuildId::new)
}

async fn leave(ctx: &Context<'_>, server_id: &str) -> CreateEmbed {
    let found = parse_server_id(server_id).and_then(|guild_id| {
        ctx.cache
            .guild(guild_id)
            .map(|guild| (guild_id, guild.name.clone()))
    });
    let Some((guild_id, name)) = found else {
        return embed::failure(
            ctx.cfg,
            "Server Not Found",
            format!("Could not find server with ID: {}", server_id),
        );
    };

    match guild_id.leave(ctx.http).await {
        Ok(()) => {
            log_internal!("Left server {} ({})", name, guild_id);
            embed::success(
                ctx.cfg,
                "✅ Left Server",
                format!("Successfully left server: {} ({})", name, guild_id),
            )
        }
        Err(e) => {
            log_error!("Error leaving server {}: {}", guild_id, e);
            embed::failure(ctx.cfg, "Error", "Failed to leave the server.")
        }
    }
}

struct ServerSummary {
    id: GuildId,
    name: String,
    members: u64,
}

impl ServerSummary {
    /// Every cached server, ordered by id
    fn all(cache: &Cache) -> Vec<Self> {
        let mut servers: Vec<Self> = cache
            .guilds()
            .into_iter()
            .filter_map(|guild_id| {
                cache.guild(guild_id).map(|guild| ServerSummary {
                    id: guild_id,
                    name: guild.name.clone(),
                    members: guild.member_count,
                })
            })
            .collect();
        servers.sort_by_key(|server| server.id);
        servers
    }
}

fn server_list(cfg: &Config, servers: &[ServerSummary]) -> CreateEmbed {
    let lines: Vec<String> = servers
        .iter()
        .take(SERVER_LIST_LENGTH)
        .map(|server| {
            format!(
                "**{}** - {} members - ID: {}",
                server.name, server.members, server.id
            )
        })
        .collect();
    let description = if lines.is_empty() {
        "No servers found".to_owned()
    } else {
        lines.join("\n")
    };

    embed::success(cfg, "📋 Server List", description)
        .footer(CreateEmbedFooter::new(format!("Total: {} servers", servers.len())))
}

async fn feedback(ctx: &Context<'_>, interaction: &CommandInteraction, message: &str) -> CreateEmbed {
    let Some(channel_id) = ctx.cfg.feedback.channel_id else {
        return embed::failure(
            ctx.cfg,
            "Configuration Error",
            "Feedback channel is not properly configured. Please contact the bot owner.",
        );
    };

    let user = &interaction.user;
    let server = match interaction.guild_id {
        Some(guild_id) => format!(
            "{} ({})",
            guild_id.name(ctx.cache).unwrap_or_else(|| "unknown".to_owned()),
            guild_id
        ),
        None => "none".to_owned(),
    };
    let channel_name = interaction
        .channel_id
        .name(ctx.cache_http)
        .await
        .unwrap_or_else(|_| "unknown".to_owned());

    let report = embed::success(ctx.cfg, "📝 New Feedback", message)
        .field("User", format!("{} ({})", user.tag(), user.id), true)
        .field("Server", server, true)
        .field(
            "Channel",
            format!("{} ({})", channel_name, interaction.channel_id),
            true,
        )
        .thumbnail(user.face());

    match channel_id
        .send_message(ctx.cache_http, CreateMessage::new().embed(report))
        .await
    {
        Ok(_) => {
            log_internal!("Forwarded feedback from {}", user.name);
            embed::success(
                ctx.cfg,
                "✅ Feedback Sent",
                "Thank you for your feedback! It has been sent to our development team.",
            )
        }
        Err(e) => {
            log_error!("Error sending feedback: {}", e);
            embed::failure(ctx.cfg, "Error", "Failed to send feedback. Please try again later.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::tests::{as_json, test_config};

    #[test]
    fn latency_is_the_snowflake_time_difference() {
        let request = InteractionId::new(1_000 << 22);
        let reply = MessageId::new((1_250 << 22) | 0x3ff);
        assert_eq!(latency_ms(request, reply), 250);
        // Clock skew never goes negative
        assert_eq!(latency_ms(InteractionId::new(2_000 << 22), reply), 0);
    }

    #[test]
    fn links_embed_the_bot_id() {
        let bot = UserId::new(42);
        assert_eq!(
            invite_link(bot),
            "https://discord.com/api/oauth2/authorize?client_id=42&permissions=388160&scope=bot%20applications.commands"
        );
        assert_eq!(vote_link(bot), "https://top.gg/bot/42/vote");
    }

    #[test]
    fn server_ids_must_be_nonzero_numbers() {
        assert_eq!(parse_server_id(" 123 "), Some(GuildId::new(123)));
        assert_eq!(parse_server_id("0"), None);
        assert_eq!(parse_server_id("abc"), None);
        assert_eq!(parse_server_id(""), None);
    }

    #[test]
    fn server_list_shows_first_ten_and_total() {
        let cfg = test_config();
        let servers: Vec<ServerSummary> = (1..=12)
            .map(|i| ServerSummary {
                id: GuildId::new(i),
                name: format!("Server {}", i),
                members: i * 10,
            })
            .collect();

        let json = as_json(&server_list(&cfg, &servers));
        let description = json["description"].as_str().unwrap();

        assert_eq!(description.lines().count(), 10);
        assert_eq!(
            description.lines().next(),
            Some("**Server 1** - 10 members - ID: 1")
        );
        assert_eq!(json["footer"]["text"], "Total: 12 servers");
    }

    #[test]
    fn empty_server_list() {
        let cfg = test_config();
        let json = as_json(&server_list(&cfg, &[]));
        assert_eq!(json["description"], "No servers found");
        assert_eq!(json["footer"]["text"], "Total: 0 servers");
    }

    #[test]
    fn help_has_one_field_per_entry() {
        let cfg = test_config();
        let entries = [("/bot ping", "Check bot latency"), ("/bot vote", "Vote")];

        let json = as_json(&help(&cfg, &entries));

        assert_eq!(json["fields"].as_array().map(Vec::len), Some(2));
        assert_eq!(json["fields"][1]["name"], "/bot vote");
        assert_eq!(json["fields"][1]["inline"], false);
    }

    #[test]
    fn stats_include_channel_totals() {
        let cfg = test_config();
        let counts = CacheCounts {
            servers: 3,
            users: 40,
            channels: 12,
        };

        let json = as_json(&stats(&cfg, counts, 5, 2, Some(48 * 1024 * 1024)));

        assert_eq!(json["fields"][3]["name"], "AI Channels");
        assert_eq!(json["fields"][3]["value"], "5");
        assert_eq!(json["fields"][4]["value"], "2");
        assert_eq!(json["fields"][5]["name"], "Memory Usage");
        assert_eq!(json["fields"][5]["value"], "48 MB");
    }

    #[test]
    fn memory_is_rounded_to_megabytes() {
        assert_eq!(megabytes(Some(1024 * 1024 * 3 / 2)), "2 MB");
        assert_eq!(megabytes(Some(1024 * 1024 + 1)), "1 MB");
        assert_eq!(megabytes(None), "N/A");
    }
}

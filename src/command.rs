//! Slash commands.
//!
//! Serenity hands us a nested tree of options (command → group → subcommand → arguments).  We
//! flatten that into a [`CommandInvocation`] and resolve it to exactly one [`Command`], rejecting
//! it if the invoker (or the bot itself) lacks what the command needs.

use crate::routing::ChannelKind;
use serenity::all::{
    ChannelId, CommandDataOption, CommandDataOptionValue, CommandInteraction, CommandOptionType,
    CreateCommand, CreateCommandOption, GuildId, Permissions, UserId,
};
use std::collections::HashMap;

/// What a member needs to configure channels
pub const MANAGE_PERMISSIONS: Permissions = Permissions::MANAGE_CHANNELS
    .union(Permissions::VIEW_CHANNEL)
    .union(Permissions::SEND_MESSAGES);

/// What the bot needs to post generated images
pub const IMAGE_PERMISSIONS: Permissions = Permissions::VIEW_CHANNEL
    .union(Permissions::SEND_MESSAGES)
    .union(Permissions::ATTACH_FILES)
    .union(Permissions::EMBED_LINKS);

/// What the bot needs to chat
pub const CHAT_PERMISSIONS: Permissions =
    Permissions::VIEW_CHANNEL.union(Permissions::SEND_MESSAGES);

#[derive(Clone, Debug, PartialEq)]
pub enum OptionValue {
    String(String),
    Channel(ChannelId),
}

/// A single slash command use, flattened
#[derive(Clone, Debug)]
pub struct CommandInvocation {
    pub name: String,
    pub group: Option<String>,
    pub subcommand: Option<String>,
    pub options: HashMap<String, OptionValue>,
    pub user_id: UserId,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    /// Invoking member's permissions in the channel.  None outside of guilds.
    pub member_permissions: Option<Permissions>,
    /// The bot's own permissions in the channel
    pub app_permissions: Option<Permissions>,
}

impl CommandInvocation {
    pub fn from_interaction(interaction: &CommandInteraction) -> Self {
        let mut group = None;
        let mut subcommand = None;
        let mut arguments: &[CommandDataOption] = &interaction.data.options;

        if let [first] = arguments {
            if let CommandDataOptionValue::SubCommandGroup(inner) = &first.value {
                group = Some(first.name.clone());
                arguments = inner;
            }
        }
        if let [first] = arguments {
            if let CommandDataOptionValue::SubCommand(inner) = &first.value {
                subcommand = Some(first.name.clone());
                arguments = inner;
            }
        }

        let options = arguments
            .iter()
            .filter_map(|option| {
                let value = match &option.value {
                    CommandDataOptionValue::String(s) => OptionValue::String(s.clone()),
                    CommandDataOptionValue::Channel(id) => OptionValue::Channel(*id),
                    _ => return None,
                };
                Some((option.name.clone(), value))
            })
            .collect();

        Self {
            name: interaction.data.name.clone(),
            group,
            subcommand,
            options,
            user_id: interaction.user.id,
            guild_id: interaction.guild_id,
            channel_id: interaction.channel_id,
            member_permissions: interaction.member.as_ref().and_then(|m| m.permissions),
            app_permissions: interaction.app_permissions,
        }
    }

    /// e.g. `/channel ai set`
    pub fn path(&self) -> String {
        let mut path = format!("/{}", self.name);
        for part in [&self.group, &self.subcommand].into_iter().flatten() {
            path.push(' ');
            path.push_str(part);
        }
        path
    }

    fn string(&self, name: &'static str) -> Result<String, Rejection> {
        match self.options.get(name) {
            Some(OptionValue::String(s)) => Ok(s.clone()),
            _ => Err(Rejection::Unrecognized(format!("missing `{}`", name))),
        }
    }

    fn channel(&self, name: &'static str) -> Result<ChannelId, Rejection> {
        match self.options.get(name) {
            Some(OptionValue::Channel(id)) => Ok(*id),
            _ => Err(Rejection::Unrecognized(format!("missing `{}`", name))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    ImageGenerate { prompt: String },
    ChannelSet(ChannelKind, ChannelId),
    ChannelRemove(ChannelKind, ChannelId),
    ChannelList(ChannelKind),
    BotPing,
    BotUptime,
    BotInfo,
    BotStats,
    BotHelp,
    BotInvite,
    BotSupport,
    BotVote,
    BotLeave { server_id: String },
    BotServerList,
    BotFeedback { message: String },
    ChangelogSet(ChannelId),
    ChangelogRemove(ChannelId),
}

/// Why a command was refused before running
#[derive(Clone, Debug, PartialEq)]
pub enum Rejection {
    DirectMessage,
    MemberMissingPermissions,
    BotMissingPermissions,
    NotOwner,
    Unrecognized(String),
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Requirement {
    Nothing,
    Member(Permissions),
    Bot(Permissions),
    Owner,
}

impl Command {
    /// Commands only work in guilds; that is checked before anything else.
    pub fn resolve(invocation: &CommandInvocation, owner_id: UserId) -> Result<Self, Rejection> {
        if invocation.guild_id.is_none() {
            return Err(Rejection::DirectMessage);
        }
        let command = Self::parse(invocation)?;
        command.authorize(invocation, owner_id)?;
        Ok(command)
    }

    fn parse(inv: &CommandInvocation) -> Result<Self, Rejection> {
        use ChannelKind::*;

        let command = match (
            inv.name.as_str(),
            inv.group.as_deref(),
            inv.subcommand.as_deref(),
        ) {
            ("image", None, Some("generate")) => Command::ImageGenerate {
                prompt: inv.string("prompt")?,
            },
            ("channel", Some("ai"), Some("set")) => Command::ChannelSet(Ai, inv.channel("channel")?),
            ("channel", Some("ai"), Some("remove")) => {
                Command::ChannelRemove(Ai, inv.channel("channel")?)
            }
            ("channel", Some("imagine"), Some("set")) => {
                Command::ChannelSet(Imagine, inv.channel("channel")?)
            }
            ("channel", Some("imagine"), Some("remove")) => {
                Command::ChannelRemove(Imagine, inv.channel("channel")?)
            }
            ("channel", Some("imagine"), Some("setting")) => Command::ChannelList(Imagine),
            ("channel", Some("setting"), Some("view")) => Command::ChannelList(Ai),
            ("bot", None, Some("ping")) => Command::BotPing,
            ("bot", None, Some("uptime")) => Command::BotUptime,
            ("bot", None, Some("info")) => Command::BotInfo,
            ("bot", None, Some("stats")) => Command::BotStats,
            ("bot", None, Some("help")) => Command::BotHelp,
            ("bot", None, Some("invite")) => Command::BotInvite,
            ("bot", None, Some("support")) => Command::BotSupport,
            ("bot", None, Some("vote")) => Command::BotVote,
            ("bot", None, Some("leave")) => Command::BotLeave {
                server_id: inv.string("serverid")?,
            },
            ("bot", None, Some("serverlist")) => Command::BotServerList,
            ("bot", None, Some("feedback")) => Command::BotFeedback {
                message: inv.string("message")?,
            },
            ("bot", Some("changelogs"), Some("set")) => {
                Command::ChangelogSet(inv.channel("channel")?)
            }
            ("bot", Some("changelogs"), Some("remove")) => {
                Command::ChangelogRemove(inv.channel("channel")?)
            }
            _ => return Err(Rejection::Unrecognized(inv.path())),
        };
        Ok(command)
    }

    fn requirement(&self) -> Requirement {
        match self {
            Command::ImageGenerate { .. } => Requirement::Bot(IMAGE_PERMISSIONS),
            Command::ChannelSet(..) | Command::ChannelRemove(..) | Command::ChannelList(_) => {
                Requirement::Member(MANAGE_PERMISSIONS)
            }
            Command::BotLeave { .. }
            | Command::BotServerList
            | Command::ChangelogSet(_)
            | Command::ChangelogRemove(_) => Requirement::Owner,
            _ => Requirement::Nothing,
        }
    }

    fn authorize(&self, inv: &CommandInvocation, owner_id: UserId) -> Result<(), Rejection> {
        match self.requirement() {
            Requirement::Nothing => Ok(()),
            Requirement::Member(needed) => match inv.member_permissions {
                Some(held) if held.contains(needed) => Ok(()),
                _ => Err(Rejection::MemberMissingPermissions),
            },
            Requirement::Bot(needed) => match inv.app_permissions {
                Some(held) if held.contains(needed) => Ok(()),
                _ => Err(Rejection::BotMissingPermissions),
            },
            Requirement::Owner if inv.user_id == owner_id => Ok(()),
            Requirement::Owner => Err(Rejection::NotOwner),
        }
    }
}

fn channel_option(description: &str) -> CreateCommandOption {
    CreateCommandOption::new(CommandOptionType::Channel, "channel", description).required(true)
}

fn string_option(name: &str, description: &str) -> CreateCommandOption {
    CreateCommandOption::new(CommandOptionType::String, name, description).required(true)
}

fn subcommand(name: &str, description: &str) -> CreateCommandOption {
    CreateCommandOption::new(CommandOptionType::SubCommand, name, description)
}

fn group(name: &str, description: &str) -> CreateCommandOption {
    CreateCommandOption::new(CommandOptionType::SubCommandGroup, name, description)
}

/// Every command registered with Discord
pub fn definitions() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new("image")
            .description("Generate images")
            .add_option(
                subcommand("generate", "Generate an image from a prompt").add_sub_option(
                    string_option("prompt", "The prompt to generate an image from"),
                ),
            ),
        CreateCommand::new("channel")
            .description("Manage AI channels")
            .default_member_permissions(Permissions::MANAGE_CHANNELS)
            .add_option(
                group("ai", "AI channel management")
                    .add_sub_option(
                        subcommand("set", "Set a channel for AI chat")
                            .add_sub_option(channel_option("The channel to set for AI chat")),
                    )
                    .add_sub_option(
                        subcommand("remove", "Remove AI chat from a channel").add_sub_option(
                            channel_option("The channel to remove AI chat from"),
                        ),
                    ),
            )
            .add_option(
                group("imagine", "Imagine (image generation) channel management")
                    .add_sub_option(
                        subcommand("set", "Set a channel for image generation").add_sub_option(
                            channel_option("The channel to set for image generation"),
                        ),
                    )
                    .add_sub_option(
                        subcommand("remove", "Remove image generation from a channel")
                            .add_sub_option(channel_option(
                                "The channel to remove image generation from",
                            )),
                    )
                    .add_sub_option(subcommand(
                        "setting",
                        "View current imagine channel settings",
                    )),
            )
            .add_option(
                group("setting", "View settings")
                    .add_sub_option(subcommand("view", "View current AI channel settings")),
            ),
        CreateCommand::new("bot")
            .description("Bot management commands")
            .add_option(subcommand("uptime", "Show bot uptime"))
            .add_option(subcommand("ping", "Show bot ping"))
            .add_option(subcommand("info", "Show bot information"))
            .add_option(subcommand("stats", "Show bot statistics"))
            .add_option(subcommand("help", "Show bot help"))
            .add_option(subcommand("invite", "Get bot invite link"))
            .add_option(
                subcommand("leave", "Make bot leave a server (Owner only)")
                    .add_sub_option(string_option("serverid", "Server ID to leave")),
            )
            .add_option(subcommand("serverlist", "Show server list (Owner only)"))
            .add_option(subcommand("support", "Get support server link"))
            .add_option(subcommand("vote", "Vote for the bot"))
            .add_option(
                subcommand("feedback", "Send feedback to the developers")
                    .add_sub_option(string_option("message", "Your feedback message")),
            )
            .add_option(
                group("changelogs", "Changelog channel management (Owner only)")
                    .add_sub_option(
                        subcommand("set", "Set changelog channel (Owner only)")
                            .add_sub_option(channel_option("Channel to send changelogs to")),
                    )
                    .add_sub_option(
                        subcommand("remove", "Remove changelog channel (Owner only)")
                            .add_sub_option(channel_option("Channel to remove from changelogs")),
                    ),
            ),
    ]
}

//! Embed builders shared by the plugins

use crate::{command::Rejection, config::Config};
use serenity::all::{CreateEmbed, Timestamp};

/// Neutral embed in the configured color, stamped with the current time
pub fn info(cfg: &Config, title: impl Into<String>) -> CreateEmbed {
    CreateEmbed::new()
        .color(cfg.embed.color)
        .title(title)
        .timestamp(Timestamp::now())
}

pub fn success(
    cfg: &Config,
    title: impl Into<String>,
    description: impl Into<String>,
) -> CreateEmbed {
    info(cfg, title).description(description)
}

pub fn failure(
    cfg: &Config,
    title: impl Into<String>,
    description: impl Into<String>,
) -> CreateEmbed {
    CreateEmbed::new()
        .color(cfg.embed.error_color)
        .title(format!("❌ {}", title.into()))
        .description(description)
        .timestamp(Timestamp::now())
}

/// Generic "try again later" for failed calls to the image or text API.  Never includes the
/// underlying error.
pub fn service_failure(cfg: &Config, title: &str, doing: &str) -> CreateEmbed {
    failure(
        cfg,
        title,
        format!(
            "Sorry, I encountered an error while {}. Please try again later.",
            doing
        ),
    )
}

/// A settings change that could not be saved.  Nothing was changed.
pub fn storage_failure(cfg: &Config) -> CreateEmbed {
    failure(
        cfg,
        "Error",
        "Sorry, I couldn't save that change. Please try again later.",
    )
}

pub fn rejection(cfg: &Config, rejection: &Rejection) -> CreateEmbed {
    match rejection {
        Rejection::DirectMessage => failure(
            cfg,
            "DM Not Supported",
            "Cannot use command in DM. This bot only works in servers.",
        ),
        Rejection::MemberMissingPermissions => failure(
            cfg,
            "Permission Error",
            "You need **Manage Channels**, **View Channel**, and **Send Messages** permissions to \
             use this command.",
        ),
        Rejection::BotMissingPermissions => failure(
            cfg,
            "Permission Error",
            "I need **View Channel**, **Send Messages**, **Attach Files**, and **Embed Links** \
             permissions to generate images.",
        ),
        Rejection::NotOwner => failure(
            cfg,
            "Access Denied",
            "This command is only available to the bot owner.",
        ),
        Rejection::Unrecognized(what) => failure(
            cfg,
            "Unknown Command",
            format!("I don't know how to handle `{}`.", what),
        ),
    }
}

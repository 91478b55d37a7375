//! Miscellaneous convenience methods

use crate::context::Context;
use anyhow::Result;
use serenity::all::{
    ChannelId, CommandInteraction, CreateEmbed, CreateInteractionResponse,
    CreateInteractionResponseFollowup, CreateInteractionResponseMessage, CreateMessage,
    EditInteractionResponse, EditMessage, GuildId, Message, Permissions, User,
};

/// Discord's maximum message length
pub const MESSAGE_LIMIT: usize = 2000;

#[serenity::async_trait]
pub trait InteractionHelper {
    async fn reply_embed(&self, ctx: &Context, embed: CreateEmbed, ephemeral: bool) -> Result<()>;
}

#[serenity::async_trait]
impl InteractionHelper for CommandInteraction {
    async fn reply_embed(&self, ctx: &Context, embed: CreateEmbed, ephemeral: bool) -> Result<()> {
        let message = CreateInteractionResponseMessage::new()
            .embed(embed)
            .ephemeral(ephemeral);
        self.create_response(ctx.cache_http, CreateInteractionResponse::Message(message))
            .await?;
        Ok(())
    }
}

#[serenity::async_trait]
pub trait MessageHelper {
    async fn reply_embed(&self, ctx: &Context, embed: CreateEmbed) -> Result<Message>;
}

#[serenity::async_trait]
impl MessageHelper for Message {
    async fn reply_embed(&self, ctx: &Context, embed: CreateEmbed) -> Result<Message> {
        let builder = CreateMessage::new().embed(embed).reference_message(self);
        Ok(self.channel_id.send_message(ctx.cache_http, builder).await?)
    }
}

/// The bot's permissions in a guild channel (or thread), computed from the cache.
pub fn bot_permissions_in(
    ctx: &Context,
    guild_id: GuildId,
    channel_id: ChannelId,
) -> Option<Permissions> {
    let bot_id = ctx.cache.current_user().id;
    let guild = ctx.cache.guild(guild_id)?;
    let member = guild.members.get(&bot_id)?;
    let channel = guild
        .channels
        .get(&channel_id)
        .or_else(|| guild.threads.iter().find(|thread| thread.id == channel_id))?;
    Some(guild.user_permissions_in(channel, member))
}

/// Something a long-running handler answers: a slash command or a plain message
#[derive(Clone, Copy)]
pub enum ReplyTarget<'a> {
    Interaction(&'a CommandInteraction),
    Message(&'a Message),
}

/// The "working on it" reply that is later edited in place
pub enum Placeholder<'a> {
    Interaction(&'a CommandInteraction),
    Message(Message),
}

impl<'a> ReplyTarget<'a> {
    pub fn requester(&self) -> &'a User {
        match *self {
            ReplyTarget::Interaction(interaction) => &interaction.user,
            ReplyTarget::Message(msg) => &msg.author,
        }
    }

    pub async fn placeholder(&self, ctx: &Context<'_>, content: &str) -> Result<Placeholder<'a>> {
        match *self {
            ReplyTarget::Interaction(interaction) => {
                let message = CreateInteractionResponseMessage::new().content(content);
                interaction
                    .create_response(ctx.cache_http, CreateInteractionResponse::Message(message))
                    .await?;
                Ok(Placeholder::Interaction(interaction))
            }
            ReplyTarget::Message(msg) => {
                Ok(Placeholder::Message(msg.reply(ctx.cache_http, content).await?))
            }
        }
    }

    /// Additional reply after the placeholder, e.g. overflow of a long answer
    pub async fn follow_up(&self, ctx: &Context<'_>, content: &str) -> Result<()> {
        match *self {
            ReplyTarget::Interaction(interaction) => {
                let followup = CreateInteractionResponseFollowup::new().content(content);
                interaction
                    .create_followup(ctx.cache_http, followup)
                    .await?;
            }
            ReplyTarget::Message(msg) => {
                msg.reply(ctx.cache_http, content).await?;
            }
        }
        Ok(())
    }
}

impl Placeholder<'_> {
    pub async fn edit_content(&mut self, ctx: &Context<'_>, content: &str) -> Result<()> {
        match self {
            Placeholder::Interaction(interaction) => {
                let edit = EditInteractionResponse::new().content(content);
                interaction.edit_response(ctx.cache_http, edit).await?;
            }
            Placeholder::Message(msg) => {
                msg.edit(ctx.cache_http, EditMessage::new().content(content))
                    .await?;
            }
        }
        Ok(())
    }

    /// Replaces the placeholder text with an embed
    pub async fn edit_embed(&mut self, ctx: &Context<'_>, embed: CreateEmbed) -> Result<()> {
        match self {
            Placeholder::Interaction(interaction) => {
                let edit = EditInteractionResponse::new().content("").embed(embed);
                interaction.edit_response(ctx.cache_http, edit).await?;
            }
            Placeholder::Message(msg) => {
                let edit = EditMessage::new().content("").embed(embed);
                msg.edit(ctx.cache_http, edit).await?;
            }
        }
        Ok(())
    }
}

/// Splits text into pieces of at most `limit` characters, in order.
pub struct MessageChunks<'a> {
    rest: &'a str,
    limit: usize,
}

impl<'a> MessageChunks<'a> {
    pub fn new(text: &'a str, limit: usize) -> Self {
        Self { rest: text, limit }
    }
}

impl<'a> Iterator for MessageChunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            return None;
        }
        let split_at = self
            .rest
            .char_indices()
            .nth(self.limit)
            .map(|(index, _)| index)
            .unwrap_or(self.rest.len());
        let (chunk, rest) = self.rest.split_at(split_at);
        self.rest = rest;
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_text_splits_into_ordered_chunks() {
        let text: String = (0..4500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();

        let chunks: Vec<&str> = MessageChunks::new(&text, MESSAGE_LIMIT).collect();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 2000);
        assert_eq!(chunks[1].chars().count(), 2000);
        assert_eq!(chunks[2].chars().count(), 500);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks: Vec<&str> = MessageChunks::new("hello", MESSAGE_LIMIT).collect();
        assert_eq!(chunks, ["hello"]);
    }

    #[test]
    fn exact_limit_is_a_single_chunk() {
        let text = "x".repeat(MESSAGE_LIMIT);
        assert_eq!(MessageChunks::new(&text, MESSAGE_LIMIT).count(), 1);
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert_eq!(MessageChunks::new("", MESSAGE_LIMIT).count(), 0);
    }

    #[test]
    fn multibyte_characters_are_never_split() {
        let text = "é".repeat(5);
        let chunks: Vec<&str> = MessageChunks::new(&text, 2).collect();
        assert_eq!(chunks, ["éé", "éé", "é"]);
    }
}
